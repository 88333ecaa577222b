use std::path::Path;

use image::DynamicImage;
use serde::Serialize;
use tracing::info;

use crate::core::params::ResizeParams;
use crate::core::processing::resize::{calculate_contain_dimensions, resize_u8_image};
use crate::error::{Error, Result};
use crate::io::writers::jpeg::{encoder_quality, write_gray_jpeg, write_rgb_jpeg};

/// Dimensions before and after a resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResizeOutcome {
    pub original_width: usize,
    pub original_height: usize,
    pub width: usize,
    pub height: usize,
}

fn is_grayscale(img: &DynamicImage) -> bool {
    !img.color().has_color()
}

/// Decode `input`, fit it inside the requested box without enlarging, and
/// re-encode it as JPEG at `output`. Grayscale inputs stay single-channel.
pub fn save_resized_jpeg(input: &Path, output: &Path, params: &ResizeParams) -> Result<ResizeOutcome> {
    if params.width == 0 || params.height == 0 {
        return Err(Error::InvalidArgument {
            arg: "size",
            value: format!("{}x{}", params.width, params.height),
        });
    }
    encoder_quality(params.quality)?;
    if !input.exists() {
        return Err(Error::source_unavailable(
            input.display().to_string(),
            "no such file",
        ));
    }
    let img = image::open(input)
        .map_err(|e| Error::source_unavailable(input.display().to_string(), e))?;
    let (cols, rows) = (img.width() as usize, img.height() as usize);
    let (new_cols, new_rows) =
        calculate_contain_dimensions(cols, rows, params.width, params.height);
    info!(
        "Original size: {}x{}, New size: {}x{}, quality {}",
        cols, rows, new_cols, new_rows, params.quality
    );

    if is_grayscale(&img) {
        let gray = img.to_luma8().into_raw();
        let resized = resize_u8_image(&gray, 1, cols, rows, new_cols, new_rows)?;
        write_gray_jpeg(output, new_cols, new_rows, &resized, params.quality)?;
    } else {
        let rgb = img.to_rgb8().into_raw();
        let resized = resize_u8_image(&rgb, 3, cols, rows, new_cols, new_rows)?;
        write_rgb_jpeg(output, new_cols, new_rows, &resized, params.quality)?;
    }
    info!("Wrote {:?}", output);

    Ok(ResizeOutcome {
        original_width: cols,
        original_height: rows,
        width: new_cols,
        height: new_rows,
    })
}
