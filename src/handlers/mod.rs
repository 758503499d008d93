// HTTP request handlers for the ceremony endpoints
pub mod ceremony;
pub mod health;

// Re-export the main handler functions
pub use ceremony::{
    assertion_finalize, assertion_initialize, attestation_finalize, attestation_initialize,
};
pub use health::health;

use actix_web::web;

/// Route table shared by the server binary and the integration tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Registration ceremony
        .route(
            "/attestation/initialize",
            web::post().to(attestation_initialize),
        )
        .route(
            "/attestation/finalize",
            web::post().to(attestation_finalize),
        )
        // Authentication ceremony
        .route(
            "/assertion/initialize",
            web::post().to(assertion_initialize),
        )
        .route("/assertion/finalize", web::post().to(assertion_finalize))
        // Health endpoint
        .route("/ping", web::get().to(health));
}
