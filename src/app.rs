use std::time::Duration;

use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{cors_layer, create_router, AppState};
use crate::config::Config;
use crate::fetcher::StationFetcher;
use crate::services::ScrapeService;
use crate::table_parser::TableParser;

/// Running HTTP server
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
}

impl Application {
    /// Build the fetcher, parser and scrape service, then spawn the Axum server.
    ///
    /// Fails on a bad table selector in `TABLE_SELECTORS` or if the HTTP client
    /// cannot be constructed.
    pub async fn build(config: Config) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let fetcher = StationFetcher::from_config(&config)?;
        let parser = TableParser::new(&config.parser_config())?;
        info!(
            "Table parser ready: selectors {:?}, {:?} header policy",
            parser.selectors().collect::<Vec<_>>(),
            parser.header_policy()
        );

        let scrape_service = ScrapeService::new(
            fetcher,
            parser,
            Duration::from_secs(config.cache_ttl_seconds),
            config.station_concurrency,
        );

        if config.api_key.is_none() {
            info!("API_KEY not set, station routes are open");
        }

        let app_state = AppState {
            scrape_service,
            api_key: config.api_key.clone(),
        };
        info!("CORS allowed origins: {:?}", config.allowed_origins);
        let app = create_router(app_state)
            .layer(cors_layer(&config.allowed_origins))
            .layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);

        let server_handle = tokio::spawn(async move {
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        });

        info!("Application initialized successfully");

        Ok(Self { server_handle })
    }

    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        self.server_handle.await??;
        info!("Server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
