//! Certificate endpoints, independent of any HTTP framework.
//!
//! | Method | Path                   | Handler                    |
//! |--------|------------------------|----------------------------|
//! | GET    | `/certificate/check`   | [`CertificateApi::check`]  |
//! | POST   | `/certificate/enroll`  | [`CertificateApi::enroll`] |
//! | GET    | `/certificate/me`      | [`CertificateApi::me`]     |
//!
//! The caller's identity comes from the authentication layer in front of
//! these handlers. Every handler returns a status code and a JSON body.

use chrono::{DateTime, Utc};
use provenance_core::IdentityId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::error;

use crate::{EnrollError, EnrollmentService};

/// Body of `POST /certificate/enroll`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollCertificateRequest {
    /// PEM `PUBLIC KEY` block
    pub public_key: String,
    /// Base64 of the raw 64-byte `r || s` signature over the challenge
    pub challenge_signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollCertificateResponse {
    pub certificate_pem: String,
    /// Lowercase hex SHA-256 of the certificate DER
    pub fingerprint: String,
    pub public_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckCertificateResponse {
    pub has_certificate: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateResponse {
    pub certificate_pem: String,
    pub fingerprint: String,
    pub public_key: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// A status code and JSON body ready to be written by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn json<T: Serialize>(status: u16, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status, body },
            Err(e) => {
                error!(error = %e, "failed to serialize response body");
                Self::bad(500, "InternalError", "failed to serialize response")
            }
        }
    }

    fn bad(status: u16, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message.into(), "kind": kind }),
        }
    }

    fn from_error(err: &EnrollError) -> Self {
        if !err.is_client_error() {
            error!(error = %err, "certificate request failed");
        }
        Self::bad(err.status_code(), err.kind(), err.to_string())
    }

    /// Whether the status is 2xx.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Handlers for the certificate endpoints.
#[derive(Clone)]
pub struct CertificateApi {
    service: EnrollmentService,
}

impl CertificateApi {
    pub const fn new(service: EnrollmentService) -> Self {
        Self { service }
    }

    /// `GET /certificate/check`
    pub async fn check(&self, identity: IdentityId) -> ApiResponse {
        match self.service.check_enrolled(identity).await {
            Ok(has_certificate) => {
                ApiResponse::json(200, &CheckCertificateResponse { has_certificate })
            }
            Err(e) => ApiResponse::from_error(&e),
        }
    }

    /// `POST /certificate/enroll` with a raw JSON body.
    ///
    /// An identity that already holds a certificate is turned away before
    /// the body is looked at.
    pub async fn enroll(&self, identity: IdentityId, body: &[u8]) -> ApiResponse {
        match self.service.check_enrolled(identity).await {
            Ok(false) => {}
            Ok(true) => return ApiResponse::from_error(&EnrollError::AlreadyEnrolled(identity)),
            Err(e) => return ApiResponse::from_error(&e),
        }

        let request: EnrollCertificateRequest = match serde_json::from_slice(body) {
            Ok(request) => request,
            Err(e) => return ApiResponse::bad(400, "InvalidRequest", format!("invalid body: {e}")),
        };
        if request.public_key.is_empty() {
            return ApiResponse::bad(400, "InvalidRequest", "publicKey is required");
        }
        if request.challenge_signature.is_empty() {
            return ApiResponse::bad(400, "InvalidRequest", "challengeSignature is required");
        }

        match self
            .service
            .enroll(identity, &request.public_key, &request.challenge_signature)
            .await
        {
            Ok(enrollment) => ApiResponse::json(
                201,
                &EnrollCertificateResponse {
                    certificate_pem: enrollment.certificate_pem,
                    fingerprint: enrollment.fingerprint.to_hex(),
                    public_key: enrollment.public_key_pem,
                },
            ),
            Err(e) => ApiResponse::from_error(&e),
        }
    }

    /// `GET /certificate/me`
    pub async fn me(&self, identity: IdentityId) -> ApiResponse {
        match self.service.get_certificate(identity).await {
            Ok(cert) => ApiResponse::json(
                200,
                &CertificateResponse {
                    certificate_pem: cert.certificate_pem,
                    fingerprint: cert.fingerprint.to_hex(),
                    public_key: cert.public_key_pem,
                    active: cert.active,
                    created_at: cert.created_at,
                },
            ),
            Err(e) => ApiResponse::from_error(&e),
        }
    }
}
