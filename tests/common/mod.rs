#![allow(dead_code)]

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use tokenward::configuration::{JwtSettings, PasswordSettings};
use tokenward::email_client::ResetNotifier;
use tokenward::error::EmailError;
use tokenward::service::AuthService;
use tokenward::startup::run;
use tokenward::store::{InMemoryStore, Store};

pub const FRONTEND_HOST: &str = "http://localhost:3000";

/// Captures reset links instead of sending email
pub struct RecordingNotifier {
    sender: mpsc::UnboundedSender<(String, String)>,
    delay: Duration,
}

#[async_trait]
impl ResetNotifier for RecordingNotifier {
    async fn send_password_reset(&self, recipient: &str, reset_link: &str) -> Result<(), EmailError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.sender
            .send((recipient.to_string(), reset_link.to_string()))
            .map_err(|e| EmailError::SendFailed(e.to_string()))
    }
}

pub struct Outbox {
    receiver: Mutex<mpsc::UnboundedReceiver<(String, String)>>,
}

impl Outbox {
    /// Wait for the next delivered reset link
    pub async fn next_link(&self) -> Option<(String, String)> {
        let mut receiver = self.receiver.lock().await;
        tokio::time::timeout(Duration::from_secs(2), receiver.recv())
            .await
            .ok()
            .flatten()
    }

    /// Returns true if nothing is delivered within a short grace period
    pub async fn stays_empty(&self) -> bool {
        let mut receiver = self.receiver.lock().await;
        tokio::time::timeout(Duration::from_millis(200), receiver.recv())
            .await
            .is_err()
    }
}

pub fn test_jwt_settings() -> JwtSettings {
    JwtSettings {
        secret: "integration-test-secret-with-enough-length".to_string(),
        issuer: "tokenward-test".to_string(),
        access_token_expiry: 900,
        refresh_token_expiry: 604800,
        reset_token_expiry: 900,
    }
}

pub struct TestService<S = InMemoryStore> {
    pub service: AuthService<S>,
    pub store: Arc<S>,
    pub outbox: Outbox,
}

pub fn build_service(jwt: JwtSettings) -> TestService {
    build_service_on(Arc::new(InMemoryStore::new()), jwt, Duration::ZERO)
}

/// Service over any store; reset mail takes `delivery_delay` to arrive
pub fn build_service_on<S: Store>(
    store: Arc<S>,
    jwt: JwtSettings,
    delivery_delay: Duration,
) -> TestService<S> {
    let (sender, receiver) = mpsc::unbounded_channel();
    let service = AuthService::new(
        Arc::clone(&store),
        Arc::new(RecordingNotifier {
            sender,
            delay: delivery_delay,
        }),
        &jwt,
        &PasswordSettings { bcrypt_cost: 4 },
        FRONTEND_HOST,
    )
    .expect("Failed to build service");

    TestService {
        service,
        store,
        outbox: Outbox {
            receiver: Mutex::new(receiver),
        },
    }
}

pub fn extract_reset_token(link: &str) -> String {
    let (_, token) = link.split_once("token=").expect("Link has no token");
    urlencoding::decode(token)
        .expect("Token is not valid UTF-8")
        .into_owned()
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<InMemoryStore>,
    pub outbox: Outbox,
}

pub fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let TestService {
        service,
        store,
        outbox,
    } = build_service(test_jwt_settings());
    let server = run(listener, service).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        store,
        outbox,
    }
}
