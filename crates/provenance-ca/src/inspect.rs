//! Human-readable summaries of issued certificates.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use x509_parser::prelude::*;
use x509_parser::time::ASN1Time;

use crate::CaError;

/// Display fields extracted from a DER certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateSummary {
    /// Subject distinguished name
    pub subject: String,
    /// Issuer distinguished name
    pub issuer: String,
    /// Serial number (hex)
    pub serial: String,
    /// Not valid before
    pub not_before: DateTime<Utc>,
    /// Not valid after
    pub not_after: DateTime<Utc>,
}

/// Parse a DER certificate and extract its display fields.
///
/// Empty subject or issuer names are reported as `Unknown Subject` /
/// `Unknown Issuer`.
pub fn summarize(der: &[u8]) -> Result<CertificateSummary, CaError> {
    let (_, cert) =
        X509Certificate::from_der(der).map_err(|e| CaError::Parse(e.to_string()))?;

    let mut subject = cert.subject().to_string();
    if subject.is_empty() {
        subject = String::from("Unknown Subject");
    }
    let mut issuer = cert.issuer().to_string();
    if issuer.is_empty() {
        issuer = String::from("Unknown Issuer");
    }

    Ok(CertificateSummary {
        subject,
        issuer,
        serial: cert.raw_serial_as_string(),
        not_before: asn1_to_utc(cert.validity().not_before),
        not_after: asn1_to_utc(cert.validity().not_after),
    })
}

/// Convert an ASN.1 `GeneralizedTime` / `UTCTime` to `DateTime<Utc>`.
fn asn1_to_utc(t: ASN1Time) -> DateTime<Utc> {
    Utc.timestamp_opt(t.timestamp(), 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_rejects_garbage() {
        assert!(matches!(summarize(b"not a certificate"), Err(CaError::Parse(_))));
    }
}
