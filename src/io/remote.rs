//! HTTP(S) image fetch: download bytes and decode them into an RGB tensor.
use tracing::debug;

use crate::error::{Error, Result};
use crate::io::source::SourceMetadata;
use crate::types::ImageTensor;

/// Fetch an image over HTTP(S) and decode it.
///
/// Connection failures, non-success statuses and undecodable bodies are all
/// reported as `SourceUnavailable`.
pub async fn fetch_image(url: &str) -> Result<(SourceMetadata, ImageTensor)> {
    debug!("Fetching image from {}", url);
    let response = reqwest::get(url)
        .await
        .map_err(|e| Error::source_unavailable(url, e))?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::source_unavailable(url, format!("HTTP status {}", status)));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::source_unavailable(url, e))?;
    debug!("Received {} bytes from {}", bytes.len(), url);
    let (metadata, image) = decode_image_bytes(url, &bytes)?;
    Ok((metadata, image))
}

/// Decode an encoded image (JPEG, PNG, ...) into an RGB tensor
pub fn decode_image_bytes(location: &str, bytes: &[u8]) -> Result<(SourceMetadata, ImageTensor)> {
    let decoded =
        image::load_from_memory(bytes).map_err(|e| Error::source_unavailable(location, e))?;
    let image = ImageTensor::from_rgb_image(decoded.to_rgb8());
    let metadata = SourceMetadata {
        location: location.to_string(),
        width: image.width,
        height: image.height,
        band_count: 3,
        feature_count: 1,
        ..Default::default()
    };
    Ok((metadata, image))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn decodes_png_bytes_into_rgb_tensor() {
        let img = image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let (meta, tensor) = decode_image_bytes("mem://test.png", &bytes).unwrap();
        assert_eq!((meta.width, meta.height), (3, 2));
        assert_eq!(tensor.shape(), [2, 3, 3]);
        assert_eq!(&tensor.data[..3], &[10, 20, 30]);
    }

    #[test]
    fn garbage_bytes_are_source_unavailable() {
        let err = decode_image_bytes("mem://junk", b"not an image").unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }
}
