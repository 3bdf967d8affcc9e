//! Classification response decoding.

use contextual_shared::{ClassificationRecord, ContextualError, DecodeFailure, ResponseFraming, Result};
use tracing::debug;

use crate::RawResponse;
use crate::framing::unframe;

/// Decode a raw classification response into a [`ClassificationRecord`].
///
/// Checks, in order: HTTP 200, the body reads to the end, the configured
/// framing is present, the payload is a classification record. Absent code
/// groups are not an error.
pub async fn decode(response: RawResponse, framing: &ResponseFraming) -> Result<ClassificationRecord> {
    let status = response.status();
    if status != 200 {
        return Err(ContextualError::decode(
            DecodeFailure::UnexpectedStatus(status),
            "classification service did not answer 200",
        ));
    }

    let body = response
        .into_bytes()
        .await
        .map_err(|e| ContextualError::decode(DecodeFailure::ReadFailure, e))?;

    debug!(body = %String::from_utf8_lossy(&body), "classification response");

    parse_record(&body, framing)
}

/// Unframe and parse an already-read body.
pub fn parse_record(body: &[u8], framing: &ResponseFraming) -> Result<ClassificationRecord> {
    let payload = unframe(body, framing)?;
    serde_json::from_slice(payload)
        .map_err(|e| ContextualError::decode(DecodeFailure::MalformedBody, e.to_string()))
}
