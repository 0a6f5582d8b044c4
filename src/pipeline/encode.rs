//! Image encoding: client `ImageInput` → provider `ImageData`.
//!
//! Clients already send base64, so nothing is re-encoded. The payload is
//! decoded once only to prove it is well-formed; a model call with an
//! undecodable image would fail upstream with a far less useful message.

use crate::bill::ImageInput;
use crate::error::GateError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use tracing::debug;

/// Wrap a validated client image for the multimodal request.
///
/// Browsers reading a file with `FileReader.readAsDataURL` produce
/// `data:image/jpeg;base64,<payload>`; that prefix is stripped so either form
/// is accepted.
pub fn encode_image(image: &ImageInput) -> Result<ImageData, GateError> {
    let payload = strip_data_uri(image.base64_data.trim());
    if payload.is_empty() {
        return Err(GateError::InvalidImageData);
    }

    let decoded = STANDARD
        .decode(payload)
        .map_err(|_| GateError::InvalidImageData)?;
    debug!(
        "Image payload {} bytes base64 → {} bytes ({})",
        payload.len(),
        decoded.len(),
        image.mime_type
    );

    Ok(ImageData::new(payload.to_string(), image.mime_type.as_str()).with_detail("high"))
}

fn strip_data_uri(data: &str) -> &str {
    match (data.strip_prefix("data:"), data.find(";base64,")) {
        (Some(_), Some(idx)) => &data[idx + ";base64,".len()..],
        _ => data,
    }
}
