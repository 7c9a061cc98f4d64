//! Decoded image to pixel jobs.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use thiserror::Error;

use crate::color::Rgb;
use crate::types::PixelJob;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Error opening image file: {0}")]
    Open(#[from] std::io::Error),
    #[error("Error decoding image: {0}")]
    Decode(#[from] image::ImageError),
}

pub fn decode_image(path: impl AsRef<Path>) -> Result<DynamicImage, SourceError> {
    let bytes = std::fs::read(path)?;
    Ok(image::load_from_memory(&bytes)?)
}

/// Every pixel in raster scan order: rows top to bottom, left to right.
pub fn pixel_jobs(img: &DynamicImage) -> impl Iterator<Item = PixelJob> + '_ {
    let (width, height) = img.dimensions();
    (0..height).flat_map(move |y| {
        (0..width).map(move |x| {
            let [r, g, b, a] = pixel_rgba16(img, x, y);
            PixelJob { x, y, color: Rgb::from_rgba16(r, g, b, a) }
        })
    })
}

/// Straight (non-premultiplied) RGBA widened to 16 bits per channel.
fn pixel_rgba16(img: &DynamicImage, x: u32, y: u32) -> [u16; 4] {
    match img {
        DynamicImage::ImageRgba16(buf) => buf.get_pixel(x, y).0,
        DynamicImage::ImageRgb16(buf) => {
            let [r, g, b] = buf.get_pixel(x, y).0;
            [r, g, b, u16::MAX]
        }
        _ => img.get_pixel(x, y).0.map(|c| u16::from(c) * 257),
    }
}
