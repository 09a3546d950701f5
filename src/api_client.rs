use log::*;
use reqwest::{Method, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::AccessToken;
use crate::error::Error;
use crate::session::{RequestContext, Session};

pub const PROFILE_PATH: &str = "/api/users/me/profile/";

/// The account fields returned by the profile endpoint.
///
/// Only `phone` is interpreted; every other field is kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ProfileRecord {
    pub fn phone_or_empty(&self) -> &str {
        self.phone.as_deref().unwrap_or("")
    }

    /// The `message` an update echo may carry.
    pub fn message(&self) -> Option<&str> {
        self.other.get("message").and_then(Value::as_str)
    }
}

/// Partial update body. Absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn phone(phone: &str) -> Self {
        Self {
            phone: Some(phone.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub expected: String,
    pub actual: Option<String>,
}

impl Verification {
    pub fn passed(&self) -> bool {
        self.actual.as_deref() == Some(self.expected.as_str())
    }
}

pub struct ApiClient<'a> {
    context: RequestContext<'a>,
}

impl<'a> ApiClient<'a> {
    pub fn new(session: &'a Session, token: Option<&'a AccessToken>) -> Self {
        Self {
            context: session.context(token),
        }
    }

    pub async fn get_profile(&self) -> Result<ProfileRecord, Error> {
        if self.context.token().is_none() {
            debug!("No access token, relying on session cookies for GET {PROFILE_PATH}");
        }

        let response = self
            .context
            .request(Method::GET, PROFILE_PATH)
            .send()
            .await?;

        let response = ensure_ok("Get profile", response, false).await?;
        decode("Get profile", response).await
    }

    /// Sends the update and returns the server's echo. The echo is not re-read.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<ProfileRecord, Error> {
        debug!("PUT {} with {:?}", PROFILE_PATH, update);

        let response = self
            .context
            .request(Method::PUT, PROFILE_PATH)
            .json(update)
            .send()
            .await?;

        let response = ensure_ok("Update profile", response, true).await?;
        decode("Update profile", response).await
    }

    /// Re-reads the profile and compares its phone against `expected_phone`.
    pub async fn verify(&self, expected_phone: &str) -> Result<Verification, Error> {
        let profile = self.get_profile().await?;
        let verification = Verification {
            expected: expected_phone.to_string(),
            actual: profile.phone,
        };

        if verification.passed() {
            info!("Phone verified: {}", expected_phone);
        } else {
            warn!(
                "Phone mismatch. Expected: {}, Actual: {}",
                verification.expected,
                verification.actual.as_deref().unwrap_or("<none>")
            );
        }

        Ok(verification)
    }
}

async fn ensure_ok(
    operation: &'static str,
    response: Response,
    parse_details: bool,
) -> Result<Response, Error> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    let details = if parse_details {
        error_details(&body)
    } else {
        None
    };

    warn!("{} failed: {}", operation, status);
    Err(Error::Status {
        operation,
        status,
        body,
        details,
    })
}

/// Best-effort JSON parse of an error body.
pub fn error_details(body: &str) -> Option<Value> {
    match serde_json::from_str(body) {
        Ok(details) => Some(details),
        Err(e) => {
            debug!("Error body is not JSON ({}): {}", e, body);
            None
        }
    }
}

async fn decode(operation: &'static str, response: Response) -> Result<ProfileRecord, Error> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        error!("{} returned a body that is not a profile: {}", operation, e);
        Error::Decode {
            operation,
            message: e.to_string(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn test_profile_record_keeps_unknown_fields() {
        let record: ProfileRecord = serde_json::from_value(json!({
            "phone": "+34111222333",
            "first_name": "Sergio",
            "message": "Perfil actualizado"
        }))
        .unwrap();

        assert_eq!(record.phone.as_deref(), Some("+34111222333"));
        assert_eq!(record.other["first_name"], "Sergio");
        assert_eq!(record.message(), Some("Perfil actualizado"));
    }

    #[test]
    fn test_profile_record_null_or_missing_phone() {
        let null_phone: ProfileRecord = serde_json::from_str(r#"{"phone": null}"#).unwrap();
        let no_phone: ProfileRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(null_phone.phone_or_empty(), "");
        assert_eq!(no_phone.phone, None);
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        assert_eq!(
            serde_json::to_value(ProfileUpdate::phone("+1")).unwrap(),
            json!({"phone": "+1"})
        );
        assert_eq!(
            serde_json::to_value(ProfileUpdate::default()).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_verification_requires_exact_match() {
        let matched = Verification {
            expected: "+1".to_string(),
            actual: Some("+1".to_string()),
        };
        let stale = Verification {
            expected: "+1".to_string(),
            actual: Some("+2".to_string()),
        };
        let missing = Verification {
            expected: "+1".to_string(),
            actual: None,
        };
        assert!(matched.passed());
        assert!(!stale.passed());
        assert!(!missing.passed());
    }

    #[test]
    fn test_error_details_tolerates_malformed_json() {
        assert_eq!(
            error_details(r#"{"detail": "bad phone"}"#),
            Some(json!({"detail": "bad phone"}))
        );
        assert_eq!(error_details("<html>502 Bad Gateway</html>"), None);
        assert_eq!(error_details(r#"{"detail": "#), None);
    }

    #[tokio::test]
    async fn test_get_profile_sends_bearer_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", PROFILE_PATH)
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_body(r#"{"phone": "+34600000000", "email": "a@b.c"}"#)
            .create_async()
            .await;

        let session = Session::new(&server.url()).unwrap();
        let token = AccessToken::new("tok-1");
        let profile = ApiClient::new(&session, Some(&token))
            .get_profile()
            .await
            .unwrap();

        assert_eq!(profile.phone.as_deref(), Some("+34600000000"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_profile_without_token_omits_authorization() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", PROFILE_PATH)
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(r#"{"phone": ""}"#)
            .create_async()
            .await;

        let session = Session::new(&server.url()).unwrap();
        let profile = ApiClient::new(&session, None).get_profile().await.unwrap();

        assert_eq!(profile.phone_or_empty(), "");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_profile_non_json_body_is_decode_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", PROFILE_PATH)
            .with_status(200)
            .with_body("<!DOCTYPE html>")
            .create_async()
            .await;

        let session = Session::new(&server.url()).unwrap();
        let err = ApiClient::new(&session, None)
            .get_profile()
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Decode { .. }));
    }

    #[tokio::test]
    async fn test_update_profile_returns_echo() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PUT", PROFILE_PATH)
            .match_header("authorization", "Bearer tok-1")
            .match_body(Matcher::Json(json!({"phone": "+34111222333"})))
            .with_status(200)
            .with_body(r#"{"phone": "+34111222333", "message": "updated"}"#)
            .create_async()
            .await;

        let session = Session::new(&server.url()).unwrap();
        let token = AccessToken::new("tok-1");
        let echo = ApiClient::new(&session, Some(&token))
            .update_profile(&ProfileUpdate::phone("+34111222333"))
            .await
            .unwrap();

        assert_eq!(echo.phone.as_deref(), Some("+34111222333"));
        assert_eq!(echo.message(), Some("updated"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_profile_error_parses_json_details() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", PROFILE_PATH)
            .with_status(400)
            .with_body(r#"{"phone": ["Enter a valid phone number."]}"#)
            .create_async()
            .await;

        let session = Session::new(&server.url()).unwrap();
        let err = ApiClient::new(&session, None)
            .update_profile(&ProfileUpdate::phone("nope"))
            .await
            .unwrap_err();

        match err {
            Error::Status {
                status, details, ..
            } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(
                    details,
                    Some(json!({"phone": ["Enter a valid phone number."]}))
                );
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_profile_malformed_error_body_degrades() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PUT", PROFILE_PATH)
            .with_status(500)
            .with_body("{ this is not json")
            .create_async()
            .await;

        let session = Session::new(&server.url()).unwrap();
        let err = ApiClient::new(&session, None)
            .update_profile(&ProfileUpdate::phone("+1"))
            .await
            .unwrap_err();

        match err {
            Error::Status { body, details, .. } => {
                assert_eq!(body, "{ this is not json");
                assert!(details.is_none());
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_reports_expected_and_actual() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", PROFILE_PATH)
            .with_status(200)
            .with_body(r#"{"phone": "+34000000000"}"#)
            .create_async()
            .await;

        let session = Session::new(&server.url()).unwrap();
        let verification = ApiClient::new(&session, None)
            .verify("+34111222333")
            .await
            .unwrap();

        assert!(!verification.passed());
        assert_eq!(verification.expected, "+34111222333");
        assert_eq!(verification.actual.as_deref(), Some("+34000000000"));
    }
}
