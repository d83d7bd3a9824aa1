use std::time::Instant;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use shared::services::database::Database;
use shared::utilities::{config::Config, errors::AppError};
use tracing::info;

use crate::features::implementations::ComponentUseCase;
use crate::features::schemas::{
    self, CompSearchResponse, CompVersionResponse, EchoResponse, StatusResponse,
    VersionedComponent,
};
use crate::utilities::metrics;

/// Sends back the same message received.
pub async fn echo(body: Bytes) -> Result<impl IntoResponse, AppError> {
    let request = schemas::parse_echo_input(&body)?;
    info!("Received echo message: {}", request.message);
    Ok(Json(EchoResponse {
        message: request.message,
    }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({"alive": true}))
}

/// Search the catalog for components matching the supplied search,
/// component and/or vendor names.
pub async fn search_components(
    State(database): State<Database>,
    State(config): State<Config>,
    body: Bytes,
) -> (StatusCode, Json<CompSearchResponse>) {
    let request_start = Instant::now();
    info!("Processing component search request...");

    let request = match schemas::parse_search_input(&body) {
        Ok(request) => request,
        Err(e) => return search_failure(e),
    };

    let use_case = ComponentUseCase::new(&database, &config);
    match use_case.search_components(&request).await {
        Ok(components) => {
            metrics::record_search_request_time(&config, request_start);
            (
                StatusCode::OK,
                Json(CompSearchResponse {
                    components,
                    status: StatusResponse::success(),
                }),
            )
        }
        Err(e) => search_failure(e),
    }
}

/// List all known versions of one component, with license metadata.
pub async fn get_component_versions(
    State(database): State<Database>,
    State(config): State<Config>,
    body: Bytes,
) -> (StatusCode, Json<CompVersionResponse>) {
    let request_start = Instant::now();
    info!("Processing component versions request...");

    let request = match schemas::parse_versions_input(&body) {
        Ok(request) => request,
        Err(e) => return versions_failure(e),
    };

    let use_case = ComponentUseCase::new(&database, &config);
    match use_case.get_component_versions(&request).await {
        Ok(component) => {
            metrics::record_version_request_time(&config, request_start);
            (
                StatusCode::OK,
                Json(CompVersionResponse {
                    component,
                    status: StatusResponse::success(),
                }),
            )
        }
        Err(e) => versions_failure(e),
    }
}

// Client mistakes answer 200 with a FAILED status in the body (the call
// itself succeeded); catalog failures surface as a transport-level error.
fn failure_status(error: AppError) -> (StatusCode, StatusResponse) {
    let status = StatusResponse::failed(error.client_message());
    let http_status = if error.is_client_error() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    (http_status, status)
}

fn search_failure(error: AppError) -> (StatusCode, Json<CompSearchResponse>) {
    let (http_status, status) = failure_status(error);
    (
        http_status,
        Json(CompSearchResponse {
            components: Vec::new(),
            status,
        }),
    )
}

fn versions_failure(error: AppError) -> (StatusCode, Json<CompVersionResponse>) {
    let (http_status, status) = failure_status(error);
    (
        http_status,
        Json(CompVersionResponse {
            component: VersionedComponent::default(),
            status,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::schemas::StatusCode as ResponseStatus;

    #[test]
    fn test_client_errors_keep_the_transport_clean() {
        let (http_status, status) = failure_status(AppError::BadRequest("No purl supplied".into()));
        assert_eq!(http_status, StatusCode::OK);
        assert_eq!(status.status, ResponseStatus::Failed);
        assert_eq!(status.message, "No purl supplied");
    }

    #[test]
    fn test_catalog_errors_surface_as_transport_errors() {
        let (http_status, status) = failure_status(AppError::QueryError("boom".into()));
        assert_eq!(http_status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status.status, ResponseStatus::Failed);
        // The driver message stays in the logs.
        assert!(!status.message.contains("boom"));
    }
}
