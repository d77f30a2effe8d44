//! CBOR manifest decoding.
//!
//! The wire shape is a CBOR map:
//!
//! ```text
//! {
//!   "claim":      { ... },                         // opaque key/value map
//!   "assertions": [ { "label": text, "data": map }, ... ],
//!   "signatures": [ ... ]                          // optional, not interpreted
//! }
//! ```
//!
//! Map entries with non-text keys are dropped, as are assertion entries
//! that are not maps. Presence rules (claim present, assertions non-empty)
//! belong to the validator, not the decoder.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use ciborium::Value;
use tracing::debug;

use crate::{ManifestError, Result};

/// A CBOR map keyed by text.
pub type CborMap = BTreeMap<String, Value>;

/// One entry of the `assertions` list.
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    /// `label`, or `None` when absent or not text
    pub label: Option<String>,
    /// `data`, kept raw
    pub data: Option<Value>,
}

/// A decoded manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentManifest {
    /// `None` when the manifest has no `claim` key
    pub claim: Option<CborMap>,
    /// In wire order; empty when the key is absent
    pub assertions: Vec<Assertion>,
    pub signatures: Option<Vec<Value>>,
}

/// Decode raw manifest bytes.
///
/// The input must be exactly one CBOR item, and that item must be a map.
pub fn decode_manifest(raw: &[u8]) -> Result<ContentManifest> {
    let mut reader = raw;
    let value: Value = ciborium::de::from_reader(&mut reader).map_err(|e| {
        ManifestError::ParseFailure(format!("invalid CBOR ({} bytes): {e:?}", raw.len()))
    })?;
    if !reader.is_empty() {
        return Err(ManifestError::ParseFailure(format!(
            "{} trailing bytes after manifest",
            reader.len()
        )));
    }

    let Value::Map(entries) = value else {
        return Err(ManifestError::ParseFailure(String::from(
            "manifest is not a map",
        )));
    };
    let mut top = text_keyed(entries);
    debug!(keys = ?top.keys().collect::<Vec<_>>(), "decoded manifest");

    let claim = match top.remove("claim") {
        None => None,
        Some(Value::Map(entries)) => Some(text_keyed(entries)),
        Some(_) => {
            return Err(ManifestError::ParseFailure(String::from(
                "claim is not a map",
            )))
        }
    };

    let assertions = match top.remove("assertions") {
        None => Vec::new(),
        Some(Value::Array(items)) => items.into_iter().filter_map(assertion).collect(),
        Some(_) => {
            return Err(ManifestError::ParseFailure(String::from(
                "assertions is not an array",
            )))
        }
    };

    let signatures = match top.remove("signatures") {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    };

    Ok(ContentManifest {
        claim,
        assertions,
        signatures,
    })
}

/// Keep only the text-keyed entries of a CBOR map.
pub(crate) fn text_keyed(entries: Vec<(Value, Value)>) -> CborMap {
    entries
        .into_iter()
        .filter_map(|(key, value)| match key {
            Value::Text(key) => Some((key, value)),
            _ => None,
        })
        .collect()
}

fn assertion(item: Value) -> Option<Assertion> {
    let Value::Map(entries) = item else {
        debug!("skipping non-map assertion entry");
        return None;
    };
    let mut fields = text_keyed(entries);
    let label = match fields.remove("label") {
        Some(Value::Text(label)) => Some(label),
        _ => None,
    };
    Some(Assertion {
        label,
        data: fields.remove("data"),
    })
}

impl ContentManifest {
    /// First assertion carrying `label`.
    #[must_use]
    pub fn find_assertion(&self, label: &str) -> Option<&Assertion> {
        self.assertions
            .iter()
            .find(|a| a.label.as_deref() == Some(label))
    }

    /// The claim's `created` timestamp.
    ///
    /// Accepts RFC 3339 text (or the same as a byte string) and integer or
    /// float Unix seconds. Returns `None` when the field is absent or null.
    pub fn created_at(&self) -> Result<Option<DateTime<Utc>>> {
        let claim = self
            .claim
            .as_ref()
            .ok_or_else(|| ManifestError::MalformedManifest(String::from("missing claim")))?;

        match claim.get("created") {
            None | Some(Value::Null) => Ok(None),
            Some(value) => parse_timestamp(value).map(Some),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>> {
    match value {
        // Tag 0 (date/time text) and tag 1 (epoch) wrap the plain forms.
        Value::Tag(_, inner) => parse_timestamp(inner),
        Value::Text(text) => parse_rfc3339(text),
        Value::Bytes(bytes) => {
            let text = std::str::from_utf8(bytes).map_err(|_| {
                ManifestError::MalformedManifest(String::from("created timestamp is not UTF-8"))
            })?;
            parse_rfc3339(text)
        }
        Value::Integer(int) => {
            let secs = i64::try_from(i128::from(*int)).map_err(|_| out_of_range())?;
            Utc.timestamp_opt(secs, 0).single().ok_or_else(out_of_range)
        }
        Value::Float(secs) => {
            if !secs.is_finite() || secs.abs() > i64::MAX as f64 {
                return Err(out_of_range());
            }
            let secs = secs.trunc() as i64;
            Utc.timestamp_opt(secs, 0).single().ok_or_else(out_of_range)
        }
        other => Err(ManifestError::MalformedManifest(format!(
            "unsupported created timestamp type: {}",
            type_name(other)
        ))),
    }
}

fn parse_rfc3339(text: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| {
            ManifestError::MalformedManifest(format!(
                "unsupported created timestamp format: {text:?}"
            ))
        })
}

fn out_of_range() -> ManifestError {
    ManifestError::MalformedManifest(String::from("created timestamp out of range"))
}

/// CBOR type name for error messages.
pub(crate) const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "bytes",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(..) => "tag",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown",
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use ciborium::Value;

    pub fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    pub fn map(entries: Vec<(&str, Value)>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (text(k), v)).collect())
    }

    pub fn encode(value: &Value) -> Vec<u8> {
        let mut out = Vec::new();
        ciborium::ser::into_writer(value, &mut out).unwrap();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn manifest_with_claim(claim: Vec<(&str, Value)>) -> ContentManifest {
        let raw = encode(&map(vec![
            ("claim", map(claim)),
            ("assertions", Value::Array(vec![])),
        ]));
        decode_manifest(&raw).unwrap()
    }

    #[test]
    fn test_decode_shape() {
        let raw = encode(&map(vec![
            ("claim", map(vec![("title", text("photo.jpg"))])),
            (
                "assertions",
                Value::Array(vec![
                    map(vec![("label", text("c2pa.actions")), ("data", map(vec![]))]),
                    Value::Integer(7.into()),
                    map(vec![("label", Value::Integer(1.into()))]),
                ]),
            ),
            ("signatures", Value::Array(vec![text("opaque")])),
        ]));

        let manifest = decode_manifest(&raw).unwrap();
        assert_eq!(
            manifest.claim.as_ref().unwrap().get("title"),
            Some(&text("photo.jpg"))
        );
        // The integer entry is skipped; the integer label reads as unlabeled.
        assert_eq!(manifest.assertions.len(), 2);
        assert_eq!(manifest.assertions[0].label.as_deref(), Some("c2pa.actions"));
        assert_eq!(manifest.assertions[1].label, None);
        assert_eq!(manifest.signatures.as_ref().map(Vec::len), Some(1));
        assert!(manifest.find_assertion("c2pa.actions").is_some());
    }

    #[test]
    fn test_decode_rejects_non_map() {
        let raw = encode(&Value::Array(vec![]));
        assert!(matches!(
            decode_manifest(&raw),
            Err(ManifestError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut raw = encode(&map(vec![("claim", map(vec![]))]));
        raw.push(0x00);
        let err = decode_manifest(&raw).unwrap_err();
        assert!(matches!(err, ManifestError::ParseFailure(ref m) if m.contains("trailing")));
    }

    #[test]
    fn test_decode_rejects_truncated_input() {
        let raw = encode(&map(vec![("claim", map(vec![("k", text("value"))]))]));
        assert!(matches!(
            decode_manifest(&raw[..raw.len() - 2]),
            Err(ManifestError::ParseFailure(_))
        ));
        assert!(matches!(
            decode_manifest(&[]),
            Err(ManifestError::ParseFailure(_))
        ));
    }

    /// `{"claim": <item>}` where the item header declares `len` with an
    /// 8-byte argument and no content follows.
    fn claim_with_declared_len(major_type: u8, len: u64) -> Vec<u8> {
        let mut raw = vec![0xa1, 0x65];
        raw.extend_from_slice(b"claim");
        raw.push((major_type << 5) | 27);
        raw.extend_from_slice(&len.to_be_bytes());
        raw
    }

    #[test]
    fn test_decode_rejects_oversized_declared_lengths() {
        for (what, major_type, len) in [
            ("byte string", 2, 1u64 << 62),
            ("text string", 3, 1u64 << 40),
            ("array", 4, 1u64 << 40),
        ] {
            let raw = claim_with_declared_len(major_type, len);
            assert!(
                matches!(decode_manifest(&raw), Err(ManifestError::ParseFailure(_))),
                "{what} declaring length {len} decoded"
            );
        }
    }

    #[test]
    fn test_decode_rejects_deep_nesting() {
        let mut raw = vec![0x81; 100_000];
        raw.push(0xa0);
        assert!(matches!(
            decode_manifest(&raw),
            Err(ManifestError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_decode_rejects_mistyped_sections() {
        let raw = encode(&map(vec![("claim", text("nope"))]));
        assert!(matches!(
            decode_manifest(&raw),
            Err(ManifestError::ParseFailure(_))
        ));

        let raw = encode(&map(vec![("claim", map(vec![])), ("assertions", map(vec![]))]));
        assert!(matches!(
            decode_manifest(&raw),
            Err(ManifestError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_missing_sections_decode_empty() {
        let manifest = decode_manifest(&encode(&map(vec![]))).unwrap();
        assert!(manifest.claim.is_none());
        assert!(manifest.assertions.is_empty());
        assert!(manifest.signatures.is_none());
    }

    #[test]
    fn test_created_at_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();

        for value in [
            text("2025-03-01T12:30:00Z"),
            text("2025-03-01T14:30:00+02:00"),
            Value::Bytes(b"2025-03-01T12:30:00Z".to_vec()),
            Value::Integer(expected.timestamp().into()),
            Value::Float(1_740_832_200.75),
            Value::Tag(1, Box::new(Value::Integer(expected.timestamp().into()))),
        ] {
            let manifest = manifest_with_claim(vec![("created", value)]);
            assert_eq!(manifest.created_at().unwrap(), Some(expected));
        }

        let manifest = manifest_with_claim(vec![("created", text("2025-03-01T12:30:00.250Z"))]);
        assert_eq!(
            manifest.created_at().unwrap().unwrap().timestamp_millis(),
            expected.timestamp_millis() + 250
        );
    }

    #[test]
    fn test_created_at_absent_and_invalid() {
        assert_eq!(manifest_with_claim(vec![]).created_at().unwrap(), None);
        assert_eq!(
            manifest_with_claim(vec![("created", Value::Null)])
                .created_at()
                .unwrap(),
            None
        );

        for value in [text("yesterday"), Value::Bool(true), Value::Array(vec![])] {
            let manifest = manifest_with_claim(vec![("created", value)]);
            assert!(matches!(
                manifest.created_at(),
                Err(ManifestError::MalformedManifest(_))
            ));
        }

        let manifest = decode_manifest(&encode(&map(vec![]))).unwrap();
        assert!(manifest.created_at().is_err());
    }
}
