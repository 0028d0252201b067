use std::net::TcpListener;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokenward::configuration::get_configuration;
use tokenward::email_client::{EmailClient, SenderEmail};
use tokenward::service::AuthService;
use tokenward::startup::run;
use tokenward::store::PgStore;
use tokenward::telemetry::init_telemetry;

fn startup_error(message: &str, error: impl std::fmt::Display) -> std::io::Error {
    tracing::error!(error = %error, "{}", message);
    std::io::Error::new(std::io::ErrorKind::Other, message.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration =
        get_configuration().map_err(|e| startup_error("Failed to read configuration", e))?;
    tracing::info!("Configuration loaded successfully");

    tracing::info!("Attempting to connect to database");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| startup_error("Failed to create connection pool", e))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| startup_error("Failed to run database migrations", e))?;
    tracing::info!("Database ready");

    let sender = SenderEmail::parse(configuration.email_client.sender_email.clone())
        .map_err(|e| startup_error("Invalid sender email", e))?;
    let email_client = EmailClient::new(
        configuration.email_client.base_url.clone(),
        sender,
        configuration.email_client.timeout(),
    )
    .map_err(|e| startup_error("Failed to build email client", e))?;

    let service = AuthService::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(email_client),
        &configuration.jwt,
        &configuration.password,
        configuration.application.frontend_host.clone(),
    )
    .map_err(|e| startup_error("Failed to build authentication service", e))?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, service)?.await
}
