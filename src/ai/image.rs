//! Image references exchanged with the remote model and the UI.
//!
//! Frames and generated images travel as base64 payloads ([`ImageData`]);
//! fallback placeholders are plain URLs until [`fetch`] brings them inline.
//! [`ImageRef`] covers both.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::gateway::AiError;

// ---------------------------------------------------------------------------
// AspectRatio
// ---------------------------------------------------------------------------

/// Aspect ratios accepted by the image model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "16:9")]
    Wide,
}

impl AspectRatio {
    /// Wire form, e.g. `"4:3"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "4:3",
            AspectRatio::Portrait => "3:4",
            AspectRatio::Wide => "16:9",
        }
    }

    /// Pixel size used for placeholder images.
    pub fn placeholder_size(&self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (600, 600),
            AspectRatio::Landscape => (800, 600),
            AspectRatio::Portrait => (600, 800),
            AspectRatio::Wide => (960, 540),
        }
    }
}

// ---------------------------------------------------------------------------
// ImageData
// ---------------------------------------------------------------------------

/// An encoded image carried inline as base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    /// e.g. `"image/jpeg"`.
    pub mime_type: String,
    /// Standard base64 (with padding) of the encoded image bytes.
    pub data: String,
}

impl ImageData {
    /// Encode raw image bytes.
    ///
    /// ```
    /// use asl_tutor::ai::ImageData;
    ///
    /// let img = ImageData::from_bytes("image/png", b"abc");
    /// assert_eq!(img.data, "YWJj");
    /// assert_eq!(img.data_uri(), "data:image/png;base64,YWJj");
    /// ```
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decoded size in bytes (approximate for malformed payloads).
    pub fn byte_len(&self) -> usize {
        self.data.len() / 4 * 3
    }

    /// The encoded image bytes.
    pub fn bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }

    /// Decode to 8-bit RGBA pixels.  `None` if the payload is not an image
    /// in a supported format.
    pub fn to_rgba(&self) -> Option<image::RgbaImage> {
        let bytes = match self.bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                log::debug!("image: bad base64 payload: {e}");
                return None;
            }
        };
        match image::load_from_memory(&bytes) {
            Ok(img) => Some(img.to_rgba8()),
            Err(e) => {
                log::debug!("image: cannot decode {}: {e}", self.mime_type);
                None
            }
        }
    }
}

/// Download `url` as inline image data.
pub async fn fetch(client: &reqwest::Client, url: &str) -> Result<ImageData, AiError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AiError::Status {
            status: status.as_u16(),
            body: String::new(),
        });
    }
    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
        .filter(|v| v.starts_with("image/"))
        .unwrap_or_else(|| "image/png".to_string());

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(AiError::NoImage);
    }
    Ok(ImageData::from_bytes(&mime_type, &bytes))
}

// ---------------------------------------------------------------------------
// ImageRef
// ---------------------------------------------------------------------------

/// A reference or correction image ready to display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Url(String),
    Inline(ImageData),
}

impl ImageRef {
    /// URL or `data:` URI.
    pub fn uri(&self) -> String {
        match self {
            ImageRef::Url(url) => url.clone(),
            ImageRef::Inline(img) => img.data_uri(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ImageRef::Url(_))
    }
}
