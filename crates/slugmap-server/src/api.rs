//! Request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};
use slugmap_types::Identifier;

pub const GET_ID_PATH: &str = "/api/get-id";
pub const GET_SLUG_PATH: &str = "/api/get-slug/:identifier";
pub const HEALTH_PATH: &str = "/api/health";
pub const INFO_PATH: &str = "/api/info";

/// Body of `POST /api/get-id`.
///
/// Both fields are optional at the wire level so that a missing field is
/// reported with the same message as an empty one.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GetIdRequest {
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetIdResponse {
    pub uuid: Identifier,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthResponse {
    pub fn connected() -> Self {
        Self {
            status: "OK".into(),
            database: Some("Connected".into()),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "Error".into(),
            database: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_id_request_reads_type_field() {
        let req: GetIdRequest =
            serde_json::from_value(json!({"slug": "one-piece", "type": "manga"})).unwrap();
        assert_eq!(req.slug.as_deref(), Some("one-piece"));
        assert_eq!(req.kind.as_deref(), Some("manga"));

        let req: GetIdRequest = serde_json::from_value(json!({"slug": null})).unwrap();
        assert!(req.slug.is_none());
        assert!(req.kind.is_none());
    }

    #[test]
    fn health_bodies() {
        assert_eq!(
            serde_json::to_value(HealthResponse::connected()).unwrap(),
            json!({"status": "OK", "database": "Connected"})
        );
        assert_eq!(
            serde_json::to_value(HealthResponse::error("refused")).unwrap(),
            json!({"status": "Error", "message": "refused"})
        );
    }
}
