//! Label scaling.
//!
//! Brings an uploaded image to the exact pixel height a tape requires and
//! reduces it to the two-level pixels the thermal head can print.

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, Luma};
use log::info;

/// Luma below this value prints as a black dot.
pub const DEFAULT_THRESHOLD: u8 = 128;

/// Width of an image of `width`x`height` once scaled to `target_height`.
///
/// The scale factor is computed in `f32` and the product is truncated toward
/// zero, so 100x30 scaled to 64 px is 213 px wide, not 214. The result is at
/// least 1 px.
pub fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    let scale = target_height as f32 / height as f32;
    ((width as f32 * scale) as u32).max(1)
}

/// Scale `image` to `target_height` keeping its aspect ratio, then convert it
/// to binary pixels.
///
/// `image` must not be empty.
pub fn scale_label(image: &DynamicImage, target_height: u32, threshold: u8) -> DynamicImage {
    let target_width = scaled_width(image.width(), image.height(), target_height);

    info!(
        "Need to scale image. original: {}x{} scaled: {}x{}",
        image.width(),
        image.height(),
        target_width,
        target_height
    );

    let resized = image.resize_exact(target_width, target_height, FilterType::Triangle);
    to_binary(&resized, threshold)
}

/// Reduce `image` to pure black (0) and white (255) luma pixels.
///
/// Transparent areas are composited over white, i.e. left unprinted, where
/// drawing onto a fresh binary canvas would have turned them black.
pub fn to_binary(image: &DynamicImage, threshold: u8) -> DynamicImage {
    let source = image.to_luma_alpha8();
    let (width, height) = source.dimensions();
    let mut binary = GrayImage::new(width, height);

    for (x, y, pixel) in source.enumerate_pixels() {
        let [luma, alpha] = pixel.0;
        let (luma, alpha) = (u32::from(luma), u32::from(alpha));
        let composited = (luma * alpha + 255 * (255 - alpha)) / 255;
        let value = if composited < u32::from(threshold) { 0 } else { 255 };
        binary.put_pixel(x, y, Luma([value]));
    }

    DynamicImage::ImageLuma8(binary)
}
