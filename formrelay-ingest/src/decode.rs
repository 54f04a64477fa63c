//! Turns a relayed form body into a [`DecodedRecord`].
//!
//! The whole body is percent-decoded before it is split, so the separators
//! `&` and `=` are taken from the decoded text. A token must contain exactly
//! one `=`; anything else rejects the whole submission. An empty body is a
//! single empty token and is rejected the same way.

use chrono::{DateTime, Local};
use formrelay_core::{DecodedRecord, RecordError};
use percent_encoding::percent_decode_str;

/// Decode with the current local time as receipt time.
pub fn decode_payload(payload: &[u8]) -> Result<DecodedRecord, RecordError> {
    decode_payload_at(payload, Local::now())
}

pub fn decode_payload_at(
    payload: &[u8],
    received_at: DateTime<Local>,
) -> Result<DecodedRecord, RecordError> {
    let decoded = unquote_plus(payload);
    let mut record = DecodedRecord::new(received_at);

    for token in decoded.split('&') {
        let mut parts = token.split('=');
        let (key, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(value), None) => (key, value),
            _ => {
                return Err(RecordError::MalformedField {
                    token: token.to_string(),
                    decoded: decoded.clone(),
                })
            }
        };

        if !record.insert(key, value) {
            tracing::warn!(field = key, "Submitted field shadows the timestamp field, skipped");
        }
    }

    Ok(record)
}

/// Form decoding of raw bytes: invalid UTF-8 is replaced, `+` becomes a
/// space, then `%XX` escapes are resolved.
pub fn unquote_plus(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload).replace('+', " ");
    percent_decode_str(&text).decode_utf8_lossy().into_owned()
}
