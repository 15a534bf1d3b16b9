//! `data:` URL helpers for image and file outputs

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::percent_decode_str;

/// Build a base64 data URL
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// A decoded data URL
#[derive(Debug, Clone, PartialEq)]
pub struct DataUrl {
    pub mime: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum DataUrlError {
    #[error("Not a data URL")]
    NotDataUrl,

    #[error("Data URL has no payload")]
    MissingPayload,

    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

pub fn is_data_url(value: &str) -> bool {
    value.starts_with("data:")
}

/// Decode `data:[<mime>][;base64],<payload>`
pub fn decode(url: &str) -> Result<DataUrl, DataUrlError> {
    let rest = url.strip_prefix("data:").ok_or(DataUrlError::NotDataUrl)?;
    let (meta, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;

    let (mime, is_base64) = match meta.strip_suffix(";base64") {
        Some(mime) => (mime, true),
        None => (meta, false),
    };
    let mime = if mime.is_empty() { "text/plain" } else { mime };

    let bytes = if is_base64 {
        STANDARD.decode(payload.trim())?
    } else {
        percent_decode_str(payload).collect()
    };

    Ok(DataUrl { mime: mime.to_string(), bytes })
}
