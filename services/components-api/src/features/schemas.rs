use serde::{Deserialize, Serialize};
use shared::utilities::errors::AppError;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusCode {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAILED")]
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: StatusCode,
    pub message: String,
}

impl StatusResponse {
    pub fn success() -> Self {
        Self {
            status: StatusCode::Success,
            message: "Success".to_string(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::Failed,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EchoResponse {
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompSearchRequest {
    pub search: String,
    pub component: String,
    pub vendor: String,
    pub package: String,
    pub limit: i32,
    pub offset: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchComponent {
    pub component: String,
    pub purl: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompSearchResponse {
    pub components: Vec<SearchComponent>,
    pub status: StatusResponse,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompVersionRequest {
    pub purl: String,
    pub limit: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionedComponent {
    pub component: String,
    pub purl: String,
    pub url: String,
    pub versions: Vec<ComponentVersion>,
}

/// A version appears once per license row returned by the store; multiple
/// license rows under the same version string are not coalesced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentVersion {
    pub version: String,
    pub licenses: Vec<ComponentLicense>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentLicense {
    pub name: String,
    pub spdx_id: String,
    pub is_spdx_approved: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompVersionResponse {
    pub component: VersionedComponent,
    pub status: StatusResponse,
}

pub fn parse_echo_input(input: &[u8]) -> Result<EchoRequest, AppError> {
    parse_input(input, "echo")
}

pub fn parse_search_input(input: &[u8]) -> Result<CompSearchRequest, AppError> {
    parse_input(input, "component search")
}

pub fn parse_versions_input(input: &[u8]) -> Result<CompVersionRequest, AppError> {
    parse_input(input, "component versions")
}

fn parse_input<T: serde::de::DeserializeOwned>(input: &[u8], what: &str) -> Result<T, AppError> {
    if input.is_empty() {
        return Err(AppError::BadRequest("no data supplied to parse".to_string()));
    }
    serde_json::from_slice(input).map_err(|e| {
        error!("Parse failure: {e}");
        AppError::BadRequest(format!("failed to parse {what} input data"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_input() {
        let data = r#"{"component": "angular", "package": "github", "limit": 20}"#;
        let request = parse_search_input(data.as_bytes()).unwrap();
        assert_eq!(request.component, "angular");
        assert_eq!(request.package, "github");
        assert_eq!(request.limit, 20);
        assert_eq!(request.search, "");
        assert_eq!(request.offset, 0);
    }

    #[test]
    fn test_parse_versions_input() {
        let data = r#"{"purl": "pkg:gem/tablestyle", "limit": 2}"#;
        let request = parse_versions_input(data.as_bytes()).unwrap();
        assert_eq!(request.purl, "pkg:gem/tablestyle");
        assert_eq!(request.limit, 2);
    }

    #[test]
    fn test_parse_empty_input_fails() {
        let err = parse_search_input(b"").unwrap_err();
        assert!(err.to_string().contains("no data"));
        let err = parse_versions_input(b"").unwrap_err();
        assert!(err.to_string().contains("no data"));
        let err = parse_echo_input(b"").unwrap_err();
        assert!(err.to_string().contains("no data"));
    }

    #[test]
    fn test_parse_garbage_input_fails() {
        assert!(parse_search_input(b"not json").is_err());
        assert!(parse_versions_input(b"{\"purl\": 5}").is_err());
    }

    #[test]
    fn test_status_round_trip() {
        let status = StatusResponse::success();
        let encoded = serde_json::to_string(&status).unwrap();
        assert!(encoded.contains("\"SUCCESS\""));
        let status = StatusResponse::failed("No data supplied");
        let encoded = serde_json::to_string(&status).unwrap();
        assert!(encoded.contains("\"FAILED\""));
    }
}
