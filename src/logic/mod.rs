//! Logic module registry
//!
//! Descriptors name their logic module by key. The mapping from key to
//! handler is a closed enum; unknown keys are rejected before anything runs.

pub mod compress_image;
pub mod text_counter;
pub mod url_encoder;

pub use compress_image::CompressImage;
pub use text_counter::TextCounter;
pub use url_encoder::UrlEncoder;

use crate::Logic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicKey {
    CompressImage,
    TextCounter,
    UrlEncoder,
}

impl LogicKey {
    pub const ALL: [LogicKey; 3] = [LogicKey::CompressImage, LogicKey::TextCounter, LogicKey::UrlEncoder];

    pub fn as_str(self) -> &'static str {
        match self {
            LogicKey::CompressImage => "compressImage",
            LogicKey::TextCounter => "textCounter",
            LogicKey::UrlEncoder => "urlEncoder",
        }
    }

    /// Instantiate the handler for this key
    pub fn load(self) -> Box<dyn Logic> {
        match self {
            LogicKey::CompressImage => Box::new(CompressImage),
            LogicKey::TextCounter => Box::new(TextCounter),
            LogicKey::UrlEncoder => Box::new(UrlEncoder),
        }
    }
}

impl std::fmt::Display for LogicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogicKey {
    type Err = DispatchError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogicKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownModule(s.to_string()))
    }
}

/// Dispatch errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Unknown logic module: {0}")]
    UnknownModule(String),
}

/// Logic runtime errors
#[derive(Debug, thiserror::Error)]
pub enum LogicError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    #[error("Image compression failed: {0}")]
    Encode(String),

    #[error("{0}")]
    Other(String),
}

/// All registered logic modules
pub fn all_logic() -> Vec<Box<dyn Logic>> {
    LogicKey::ALL.into_iter().map(LogicKey::load).collect()
}

/// Resolve a logic module by key
pub fn resolve(key: &str) -> Result<Box<dyn Logic>, DispatchError> {
    let key: LogicKey = key.parse()?;
    Ok(key.load())
}
