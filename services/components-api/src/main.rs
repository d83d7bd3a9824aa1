pub mod features;
pub mod utilities;

use axum::{
    http::{self, Method, StatusCode, header},
    response::IntoResponse,
};
use shared::{
    services::database::Database,
    utilities::{config::Config, observability::init_observability},
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::info;

use crate::utilities::app_state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    match dotenvy::dotenv() {
        Ok(path) => {
            println!("Loaded .env file from {}", path.display());
        }
        Err(dotenvy::Error::Io(ref err)) if err.kind() == std::io::ErrorKind::NotFound => {
            println!(".env file not found, continuing without it");
        }
        Err(e) => {
            println!("Couldn't load .env file: {}", e);
        }
    }

    let config = Config::init()?;
    let _otel_guard = init_observability(&config);

    let database = Database::new(&config).await?;

    let app_state = AppState {
        database: database.clone(),
        config: config.clone(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let tracing_layer = TraceLayer::new_for_http()
        .on_request(|request: &http::Request<_>, _span: &tracing::Span| {
            info!("{} {}", request.method(), request.uri().path());
        })
        .on_response(DefaultOnResponse::new().level(tracing::Level::INFO));

    let app = axum::Router::new()
        .merge(features::routes())
        .fallback(not_found_handler)
        .layer(cors)
        .layer(tracing_layer)
        .with_state(app_state);

    info!("🚀 Components API running on {:?}", config.server_address);
    let listener = tokio::net::TcpListener::bind(config.server_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    database.close().await;

    Ok(())
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "nothing to see here")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
