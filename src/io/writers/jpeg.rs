use jpeg_encoder::{ColorType, Encoder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::error::{Error, Result};

/// Map a 0-100 quality to the encoder's accepted 1-100 range
pub fn encoder_quality(quality: u8) -> Result<u8> {
    if quality > 100 {
        return Err(Error::InvalidArgument {
            arg: "quality",
            value: quality.to_string(),
        });
    }
    Ok(quality.max(1))
}

fn dimension(value: usize, arg: &'static str) -> Result<u16> {
    u16::try_from(value).map_err(|_| Error::InvalidArgument {
        arg,
        value: value.to_string(),
    })
}

/// Arguments are validated before `output` is created
fn write_jpeg(
    output: &Path,
    cols: usize,
    rows: usize,
    data: &[u8],
    quality: u8,
    color: ColorType,
) -> Result<()> {
    let width = dimension(cols, "width")?;
    let height = dimension(rows, "height")?;
    let quality = encoder_quality(quality)?;
    let file = File::create(output)?;
    let mut writer = BufWriter::new(file);
    let encoder = Encoder::new(&mut writer, quality);
    encoder
        .encode(data, width, height, color)
        .map_err(Error::external)?;
    Ok(())
}

pub fn write_gray_jpeg(output: &Path, cols: usize, rows: usize, data: &[u8], quality: u8) -> Result<()> {
    write_jpeg(output, cols, rows, data, quality, ColorType::Luma)
}

pub fn write_rgb_jpeg(output: &Path, cols: usize, rows: usize, rgb_data: &[u8], quality: u8) -> Result<()> {
    write_jpeg(output, cols, rows, rgb_data, quality, ColorType::Rgb)
}
