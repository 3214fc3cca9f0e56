//! Conversion of uploaded sketches into the format the model accepts

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};

/// Content type of every normalized image
pub const WEBP_MIME: &str = "image/webp";

/// Re-encoded image ready to be sent inline to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Base64 of the encoded bytes
    pub data: String,
    pub mime_type: &'static str,
}

/// Split a `data:<type>;base64,<payload>` string into header and payload
pub fn split_data_uri(uri: &str) -> Result<(&str, &str)> {
    uri.split_once(',')
        .ok_or_else(|| Error::InvalidImage("expected a data URI with a comma separator".into()))
}

/// Decode a base64 data URI and re-encode the image as WebP
pub fn normalize_data_uri(uri: &str) -> Result<NormalizedImage> {
    let (header, payload) = split_data_uri(uri)?;
    tracing::debug!("Decoding image payload ({}, {} chars)", header, payload.len());

    let bytes = BASE64.decode(payload.trim())?;
    normalize_bytes(&bytes)
}

/// Re-encode raw image bytes of any supported format as lossless WebP
pub fn normalize_bytes(bytes: &[u8]) -> Result<NormalizedImage> {
    let decoded = image::load_from_memory(bytes)?;

    // The WebP encoder only takes 8-bit channels
    let rgba = DynamicImage::ImageRgba8(decoded.to_rgba8());

    let mut webp = Vec::new();
    rgba.write_to(&mut Cursor::new(&mut webp), ImageFormat::WebP)?;

    tracing::debug!(
        "Re-encoded {}x{} image: {} -> {} bytes",
        rgba.width(),
        rgba.height(),
        bytes.len(),
        webp.len()
    );

    Ok(NormalizedImage {
        data: BASE64.encode(&webp),
        mime_type: WEBP_MIME,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_data_uri() -> String {
        let img = RgbImage::from_fn(6, 4, |x, y| Rgb([(x * 40) as u8, (y * 60) as u8, 200]));
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        format!("data:image/png;base64,{}", BASE64.encode(&png))
    }

    #[test]
    fn test_png_data_uri_becomes_webp() {
        let normalized = normalize_data_uri(&png_data_uri()).unwrap();
        assert_eq!(normalized.mime_type, "image/webp");

        let bytes = BASE64.decode(&normalized.data).unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::WebP);

        let roundtrip = image::load_from_memory(&bytes).unwrap();
        assert_eq!((roundtrip.width(), roundtrip.height()), (6, 4));
    }

    #[test]
    fn test_header_is_ignored() {
        let uri = png_data_uri();
        let (_, payload) = split_data_uri(&uri).unwrap();
        let relabeled = format!("data:application/octet-stream;base64,{payload}");
        assert!(normalize_data_uri(&relabeled).is_ok());
    }

    #[test]
    fn test_missing_comma_rejected() {
        let err = normalize_data_uri("iVBORw0KGgo").unwrap_err();
        assert!(matches!(err, Error::InvalidImage(_)));
    }

    #[test]
    fn test_bad_base64_rejected() {
        let err = normalize_data_uri("data:image/png;base64,@@not base64@@").unwrap_err();
        assert!(matches!(err, Error::Base64(_)));
    }

    #[test]
    fn test_non_image_bytes_rejected() {
        let uri = format!("data:image/png;base64,{}", BASE64.encode(b"plain text"));
        let err = normalize_data_uri(&uri).unwrap_err();
        assert!(matches!(err, Error::Image(_)));
    }
}
