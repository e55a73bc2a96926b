//! Upload client for the remote verification service.
//!
//! JSON over HTTP, mirroring the service's endpoints:
//!
//! - `POST /upload_captured_images` — enrollment sample batch
//! - `POST /register_face`          — finalize enrollment from uploaded samples
//! - `POST /authenticate_face`      — single-probe verification
//! - `GET  /get_capture_status/<name>` — server-side sample buffer status
//! - `GET  /list_users`             — summary of enrolled identities
//!
//! Images travel as `data:image/jpeg;base64,...` URLs. The service reports
//! failures in-band (`{"success": false, "message": ...}`), so non-2xx
//! responses that still carry the JSON envelope are parsed normally.
//!
//! Policy: bounded waits (30s batch, 10s probe by default) surfacing
//! `UploadTimeout`, and zero automatic retries. Uploads carry irrevocable
//! enrollment side effects on the remote side; silent retries risk
//! duplicate registration, so resubmission is always a caller decision.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frame::{Batch, EncodedImage};

pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// A validated enrollment request: non-empty identity label plus a full
/// batch of samples.
pub struct EnrollmentRequest {
    identity_label: String,
    batch: Batch,
}

impl EnrollmentRequest {
    /// Fails `Validation` on an empty (or whitespace-only) label.
    pub fn new(identity_label: &str, batch: Batch) -> Result<Self> {
        let label = identity_label.trim();
        if label.is_empty() {
            return Err(Error::Validation("Name is required".to_string()));
        }
        Ok(Self {
            identity_label: label.to_string(),
            batch,
        })
    }

    pub fn identity_label(&self) -> &str {
        &self.identity_label
    }

    pub fn batch(&self) -> &Batch {
        &self.batch
    }
}

/// The single encoded frame submitted during authentication.
pub struct AuthProbe {
    pub image: EncodedImage,
}

/// Outcome of an upload, as reported by the service.
#[derive(Clone, Debug)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
    /// Display name of the matched identity, when authentication succeeds.
    pub matched_identity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceReply {
    success: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    user: Option<MatchedUser>,
}

#[derive(Debug, Deserialize)]
struct MatchedUser {
    name: String,
}

impl From<ServiceReply> for UploadResult {
    fn from(reply: ServiceReply) -> Self {
        UploadResult {
            success: reply.success,
            message: reply.message,
            matched_identity: reply.user.map(|user| user.name),
        }
    }
}

/// Server-side enrollment sample buffer status.
#[derive(Clone, Debug, Deserialize)]
pub struct CaptureStatus {
    pub images_captured: u32,
    pub total_needed: u32,
}

/// One enrolled identity, as reported by the service.
#[derive(Clone, Debug, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub face_count: u32,
}

#[derive(Debug, Deserialize)]
struct ListUsersReply {
    success: bool,
    #[serde(default)]
    users: Vec<UserSummary>,
}

#[derive(Serialize)]
struct UploadImagesBody<'a> {
    name: &'a str,
    images: Vec<String>,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
}

#[derive(Serialize)]
struct AuthBody {
    image: String,
}

/// The request/response surface the session controller drives. Implemented
/// by `UploadClient` for the real service; tests substitute an in-memory
/// fake.
pub trait VerificationApi {
    fn upload_batch(&self, request: &EnrollmentRequest) -> Result<UploadResult>;
    fn register(&self, identity_label: &str) -> Result<UploadResult>;
    fn upload_probe(&self, probe: &AuthProbe) -> Result<UploadResult>;
}

pub struct UploadClient {
    agent: ureq::Agent,
    base_url: url::Url,
    batch_timeout: Duration,
    probe_timeout: Duration,
}

impl UploadClient {
    pub fn new(base_url: &str, batch_timeout: Duration, probe_timeout: Duration) -> Result<Self> {
        let base_url = url::Url::parse(base_url)
            .map_err(|e| Error::Validation(format!("bad server url '{}': {}", base_url, e)))?;
        Ok(Self {
            agent: ureq::AgentBuilder::new().build(),
            base_url,
            batch_timeout,
            probe_timeout,
        })
    }

    /// Upload a full enrollment batch. Issued only once the batch is
    /// frozen; never called with a partially filled batch.
    pub fn upload_batch(&self, request: &EnrollmentRequest) -> Result<UploadResult> {
        let body = UploadImagesBody {
            name: request.identity_label(),
            images: request.batch().to_data_urls(),
        };
        log::info!(
            "uploading {} enrollment samples for '{}'",
            body.images.len(),
            body.name
        );
        self.post("upload_captured_images", &body, self.batch_timeout)
    }

    /// Finalize enrollment from the samples the service has buffered.
    pub fn register(&self, identity_label: &str) -> Result<UploadResult> {
        let body = RegisterBody {
            name: identity_label,
        };
        self.post("register_face", &body, self.probe_timeout)
    }

    /// Submit a single probe for verification.
    pub fn upload_probe(&self, probe: &AuthProbe) -> Result<UploadResult> {
        let body = AuthBody {
            image: probe.image.to_data_url(),
        };
        self.post("authenticate_face", &body, self.probe_timeout)
    }

    /// Query how many samples the service has buffered for a name.
    pub fn capture_status(&self, identity_label: &str) -> Result<CaptureStatus> {
        // The label goes into the path as a single segment; `push`
        // percent-encodes it, so a '/' or '?' in a name cannot change the
        // request target.
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Validation("server url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("get_capture_status")
            .push(identity_label);
        match self.agent.get(url.as_str()).timeout(self.probe_timeout).call() {
            Ok(response) => response.into_json().map_err(Error::network),
            Err(err) => Err(self.classify(err, self.probe_timeout)),
        }
    }

    /// List the identities the service has enrolled.
    pub fn list_users(&self) -> Result<Vec<UserSummary>> {
        let url = self.endpoint("list_users")?.to_string();
        match self.agent.get(&url).timeout(self.probe_timeout).call() {
            Ok(response) => {
                let reply: ListUsersReply = response.into_json().map_err(Error::network)?;
                if !reply.success {
                    log::warn!("service reported a failed user listing");
                }
                Ok(reply.users)
            }
            Err(err) => Err(self.classify(err, self.probe_timeout)),
        }
    }

    fn post(
        &self,
        path: &str,
        body: &impl Serialize,
        timeout: Duration,
    ) -> Result<UploadResult> {
        let url = self.endpoint(path)?.to_string();
        let reply: ServiceReply = match self.agent.post(&url).timeout(timeout).send_json(body) {
            Ok(response) => response.into_json().map_err(Error::network)?,
            // The service reports failures in-band; parse the envelope out
            // of error statuses too before giving up.
            Err(ureq::Error::Status(_, response)) => {
                response.into_json().map_err(Error::network)?
            }
            Err(err) => return Err(self.classify(err, timeout)),
        };
        Ok(reply.into())
    }

    fn endpoint(&self, path: &str) -> Result<url::Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Validation(format!("bad endpoint path '{}': {}", path, e)))
    }

    fn classify(&self, err: ureq::Error, timeout: Duration) -> Error {
        match err {
            ureq::Error::Transport(transport) if is_timeout(&transport) => {
                Error::UploadTimeout(timeout)
            }
            other => Error::network(other),
        }
    }
}

impl VerificationApi for UploadClient {
    fn upload_batch(&self, request: &EnrollmentRequest) -> Result<UploadResult> {
        UploadClient::upload_batch(self, request)
    }

    fn register(&self, identity_label: &str) -> Result<UploadResult> {
        UploadClient::register(self, identity_label)
    }

    fn upload_probe(&self, probe: &AuthProbe) -> Result<UploadResult> {
        UploadClient::upload_probe(self, probe)
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    transport.kind() == ureq::ErrorKind::Io
        && transport.to_string().to_lowercase().contains("timed out")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_body_matches_wire_format() {
        let body = UploadImagesBody {
            name: "alice",
            images: vec!["data:image/jpeg;base64,AAAA".to_string()],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["name"], "alice");
        assert_eq!(value["images"][0], "data:image/jpeg;base64,AAAA");
    }

    #[test]
    fn reply_without_user_parses() {
        let reply: ServiceReply =
            serde_json::from_str(r#"{"success": false, "message": "no match"}"#).unwrap();
        let result = UploadResult::from(reply);
        assert!(!result.success);
        assert_eq!(result.message, "no match");
        assert!(result.matched_identity.is_none());
    }

    #[test]
    fn reply_with_user_carries_identity() {
        let reply: ServiceReply = serde_json::from_str(
            r#"{"success": true, "message": "Welcome back, Bob!", "user": {"name": "Bob", "confidence": 0.93}}"#,
        )
        .unwrap();
        let result = UploadResult::from(reply);
        assert_eq!(result.matched_identity.as_deref(), Some("Bob"));
    }

    #[test]
    fn empty_label_is_rejected() {
        let batch = Batch::new(1);
        assert!(matches!(
            EnrollmentRequest::new("   ", batch),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn label_is_trimmed() {
        let request = EnrollmentRequest::new("  alice ", Batch::new(1)).unwrap();
        assert_eq!(request.identity_label(), "alice");
    }

    #[test]
    fn users_reply_parses_summaries() {
        let reply: ListUsersReply = serde_json::from_str(
            r#"{"success": true, "users": [{"id": 1, "name": "alice", "face_count": 50}]}"#,
        )
        .unwrap();
        assert!(reply.success);
        assert_eq!(reply.users.len(), 1);
        assert_eq!(reply.users[0].name, "alice");
        assert_eq!(reply.users[0].face_count, 50);
    }

    #[test]
    fn bad_server_url_is_validation_error() {
        assert!(matches!(
            UploadClient::new("not a url", DEFAULT_BATCH_TIMEOUT, DEFAULT_PROBE_TIMEOUT),
            Err(Error::Validation(_))
        ));
    }
}
