use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tracing::info;

use crate::config::DirectoryConfig;
use crate::gate::OpenGate;
use crate::routes::{self, AppState};
use crate::service::DirectoryService;
use keydir_authority::SigningAuthority;
use keydir_store::KeyStore;

/// Build and run the directory server.
pub async fn run(config: DirectoryConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = KeyStore::open(&config.db_path).await?;
    let authority = Arc::new(SigningAuthority::from_pem_file(&config.authority_key_path)?);

    let state = Arc::new(AppState {
        service: DirectoryService::new(store, authority),
        gate: Arc::new(OpenGate),
        config: config.clone(),
    });

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("keydir listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router (exported for testing).
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/v1/k/{user_id}", get(routes::fetch_keys))
        .route("/v1/k/{user_id}/{device_id}", post(routes::register_key))
        .with_state(state)
}
