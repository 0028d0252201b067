use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;

use crate::middleware::JwtMiddleware;
use crate::routes::{
    get_current_user, health, health_check, login, logout, logout_all, recover_password, refresh,
    register, reset_password,
};
use crate::service::AuthService;
use crate::store::Store;

pub fn run<S: Store>(listener: TcpListener, service: AuthService<S>) -> Result<Server, std::io::Error> {
    let codec = service.codec().clone();
    let service = web::Data::new(service);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(service.clone())
            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/health", web::get().to(health::<S>))
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(register::<S>))
                    .route("/login", web::post().to(login::<S>))
                    .route("/refresh", web::post().to(refresh::<S>))
                    .route("/logout", web::post().to(logout::<S>))
                    .route("/recover-password", web::post().to(recover_password::<S>))
                    .route("/reset-password", web::post().to(reset_password::<S>)),
            )
            // Protected routes (require an access token)
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(codec.clone()))
                    .route("/me", web::get().to(get_current_user::<S>))
                    .route("/logout-all", web::post().to(logout_all::<S>)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
