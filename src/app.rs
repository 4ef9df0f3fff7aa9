use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::conversion::Converter;
use crate::session::SessionStore;

/// Running HTTP server
///
/// Holds the server task handle so callers can wait on it or abort it.
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
}

impl Application {
    /// Build the converter, the session store and the router, then spawn the server
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let converter = Converter::with_decimal_convention(config.decimal()?);
        info!(
            "Using {} decimal convention",
            converter.normalizer().decimal_convention().name()
        );
        let sessions = SessionStore::new(config.session_capacity);

        let app_state = AppState {
            converter,
            sessions,
            items_per_page: config.items_per_page,
            max_upload_bytes: config.max_upload_bytes,
        };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        // Bind before spawning so address errors surface here
        let addr = config.server_addr();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!("Server listening on http://{}/api/v1", addr);

        let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

        info!("Application initialized successfully");
        Ok(Self { server_handle })
    }

    /// Run until the server stops
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        Ok(())
    }
}
