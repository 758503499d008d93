#![warn(clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use passgate::{
    handlers, CeremonyService, MemoryCredentialStore, PassgateSettings,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also initializes the logger
    let settings = PassgateSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e}")))?;

    // The store collaborator; swap for a durable implementation behind the
    // same trait when credentials must outlive the process
    let store = Arc::new(MemoryCredentialStore::new());

    // Fails on bad relying-party config or a wrong-length session secret
    let service = CeremonyService::new(&settings, store)
        .map_err(|e| std::io::Error::other(format!("Failed to initialize ceremonies: {e}")))?;

    start_server(service, settings).await
}

/// Start the server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(service: CeremonyService, settings: PassgateSettings) -> std::io::Result<()> {
    let bind_address = settings.bind_address();
    print_startup_info(&bind_address, &settings);

    // Configure credentialed CORS so the login pages can call us cross-origin
    let cors_origins = settings.cors_origins();

    let service = web::Data::new(service);
    let settings = web::Data::new(settings);

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Authorization", "Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(service.clone())
            .app_data(settings.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .configure(handlers::configure)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &PassgateSettings) {
    println!("Starting passgate on http://{bind_address}");
    println!("Relying party: {} ({})", settings.relying_party.rp_id, settings.relying_party.rp_name);
    println!("Client origin: {}", settings.relying_party.rp_origin);
    println!();
    println!("Ceremony endpoints:");
    println!("  POST /attestation/initialize - Issue a registration challenge");
    println!("  POST /attestation/finalize   - Verify a new credential");
    println!("  POST /assertion/initialize   - Issue an authentication challenge");
    println!("  POST /assertion/finalize     - Verify an authentication response");
    println!();
    println!("System endpoints:");
    println!("  GET  /ping                   - Health check");
}
