use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::types::ImageTensor;

/// Largest size that fits inside `target_cols` x `target_rows` keeping the
/// aspect ratio, never enlarging the original.
pub fn calculate_contain_dimensions(
    original_cols: usize,
    original_rows: usize,
    target_cols: usize,
    target_rows: usize,
) -> (usize, usize) {
    if original_cols <= target_cols && original_rows <= target_rows {
        warn!(
            "Target {}x{} does not shrink original {}x{}. Keeping original dimensions",
            target_cols, target_rows, original_cols, original_rows
        );
        return (original_cols, original_rows);
    }

    let scale_factor = (target_cols as f64 / original_cols as f64)
        .min(target_rows as f64 / original_rows as f64);
    let new_cols = ((original_cols as f64 * scale_factor).round() as usize).clamp(1, target_cols);
    let new_rows = ((original_rows as f64 * scale_factor).round() as usize).clamp(1, target_rows);
    (new_cols, new_rows)
}

fn pixel_type(channels: usize) -> Result<PixelType> {
    match channels {
        1 => Ok(PixelType::U8),
        3 => Ok(PixelType::U8x3),
        other => Err(Error::InvalidArgument {
            arg: "channels",
            value: other.to_string(),
        }),
    }
}

/// Lanczos3 resize of interleaved 8-bit pixels with 1 or 3 channels
pub fn resize_u8_image(
    data: &[u8],
    channels: usize,
    original_cols: usize,
    original_rows: usize,
    target_cols: usize,
    target_rows: usize,
) -> Result<Vec<u8>> {
    if target_cols == 0 || target_rows == 0 {
        return Err(Error::InvalidArgument {
            arg: "size",
            value: format!("{}x{}", target_cols, target_rows),
        });
    }
    if original_cols == target_cols && original_rows == target_rows {
        return Ok(data.to_vec());
    }
    let pixel_type = pixel_type(channels)?;
    let resize_options =
        ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));
    let mut resizer = Resizer::new();

    let src_image = Image::from_vec_u8(
        original_cols as u32,
        original_rows as u32,
        data.to_vec(),
        pixel_type,
    )
    .map_err(Error::external)?;
    let mut dst_image = Image::new(target_cols as u32, target_rows as u32, pixel_type);
    resizer
        .resize(&src_image, &mut dst_image, &resize_options)
        .map_err(Error::external)?;

    Ok(dst_image.into_vec())
}

/// Resize an RGB tensor to exactly `cols` x `rows` (aspect ratio not kept)
pub fn resize_tensor(image: &ImageTensor, cols: usize, rows: usize) -> Result<ImageTensor> {
    info!(
        "Resizing tensor {}x{} -> {}x{}",
        image.width, image.height, cols, rows
    );
    let data = resize_u8_image(&image.data, 3, image.width, image.height, cols, rows)?;
    ImageTensor::new(rows, cols, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contain_keeps_aspect_ratio() {
        assert_eq!(calculate_contain_dimensions(400, 200, 100, 100), (100, 50));
        assert_eq!(calculate_contain_dimensions(200, 400, 100, 100), (50, 100));
        assert_eq!(calculate_contain_dimensions(1000, 10, 100, 100), (100, 1));
    }

    #[test]
    fn contain_never_enlarges() {
        assert_eq!(calculate_contain_dimensions(60, 40, 100, 100), (60, 40));
        assert_eq!(calculate_contain_dimensions(100, 100, 100, 100), (100, 100));
    }

    #[test]
    fn contain_shrinks_when_only_one_side_exceeds() {
        assert_eq!(calculate_contain_dimensions(150, 50, 100, 100), (100, 33));
    }

    #[test]
    fn tensor_resize_produces_requested_shape() {
        let image = ImageTensor::new(4, 6, vec![200; 4 * 6 * 3]).unwrap();
        let resized = resize_tensor(&image, 3, 2).unwrap();
        assert_eq!(resized.shape(), [2, 3, 3]);
        assert!(resized.data.iter().all(|&v| (195..=205).contains(&v)));
    }

    #[test]
    fn unsupported_channel_count_is_rejected() {
        assert!(resize_u8_image(&[0; 8], 2, 2, 2, 1, 1).is_err());
    }
}
