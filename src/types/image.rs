//! Receipt image payloads

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("image is not a data URI")]
    NotDataUri,
    #[error("data URI is missing a media type")]
    MissingMediaType,
    #[error("data URI is not base64 encoded")]
    NotBase64,
    #[error("invalid base64 payload: {0}")]
    Decode(String),
}

/// Receipt image as binary content plus its declared media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptImage {
    pub media_type: String,
    pub data: Vec<u8>,
}

impl ReceiptImage {
    pub fn new(media_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            media_type: media_type.into(),
            data,
        }
    }

    /// Parse a `data:<mimetype>;base64,<encoded_data>` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self, ImageError> {
        let rest = uri.trim().strip_prefix("data:").ok_or(ImageError::NotDataUri)?;
        let (header, payload) = rest.split_once(',').ok_or(ImageError::NotDataUri)?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or(ImageError::NotBase64)?;
        if media_type.is_empty() {
            return Err(ImageError::MissingMediaType);
        }

        let data = STANDARD
            .decode(payload)
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        Ok(Self::new(media_type, data))
    }

    /// Base64 payload without the URI header
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }

    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}
