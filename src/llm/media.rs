use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    if data.len() > 12 {
        let ftyp = &data[4..12];
        if ftyp.starts_with(b"ftyp") {
            let brand = &ftyp[4..8];
            if brand == b"heic" || brand == b"heif" || brand == b"hevc" {
                return Some("image/heic".to_string());
            }
        }
    }

    infer::get(data).map(|kind| kind.mime_type().to_string())
}

/// An image payload as it travels between the studio, the history store and
/// the inference gateway: a `data:` URL or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageData(String);

impl ImageData {
    pub fn new(value: impl Into<String>) -> Self {
        ImageData(value.into())
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mime_type = detect_mime_type(bytes).unwrap_or_else(|| "image/png".to_string());
        let encoded = general_purpose::STANDARD.encode(bytes);
        ImageData(format!("data:{};base64,{}", mime_type, encoded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_data_url(&self) -> bool {
        self.0.starts_with("data:")
    }

    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.0.strip_prefix("data:")?;
        let header = rest.split(',').next()?;
        let mime = header.split(';').next()?.trim();
        if mime.is_empty() {
            None
        } else {
            Some(mime)
        }
    }

    /// Raw bytes of a base64 data URL. Remote URLs and malformed payloads yield `None`.
    pub fn decode(&self) -> Option<Vec<u8>> {
        let rest = self.0.strip_prefix("data:")?;
        let (header, payload) = rest.split_once(',')?;
        if !header.ends_with(";base64") {
            return None;
        }
        general_purpose::STANDARD.decode(payload.trim()).ok()
    }

    pub fn file_extension(&self) -> &'static str {
        match self.mime_type() {
            Some("image/jpeg") | Some("image/jpg") => "jpg",
            Some("image/webp") => "webp",
            Some("image/gif") => "gif",
            Some("image/heic") => "heic",
            _ => "png",
        }
    }
}

impl fmt::Display for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_data_url() {
            write!(
                f,
                "<{} data, {} chars>",
                self.mime_type().unwrap_or("unknown"),
                self.0.len()
            )
        } else {
            f.write_str(&self.0)
        }
    }
}

impl From<String> for ImageData {
    fn from(value: String) -> Self {
        ImageData(value)
    }
}

impl From<&str> for ImageData {
    fn from(value: &str) -> Self {
        ImageData(value.to_string())
    }
}
