//! Convert a label image into print head lines.

use image::GrayImage;

use crate::Matrix;

/// Pack `image` into one head line per image column.
///
/// The label runs along the tape, so each image column becomes one line of
/// `head_dots / 8` bytes. The image is centered on the head, the top row lands
/// on the most significant bit of the first byte, and pixels darker than
/// `threshold` become set (burned) bits.
pub fn pack_columns(image: &GrayImage, head_dots: u32, threshold: u8) -> Matrix {
    let (width, height) = image.dimensions();
    let bytes_per_line = (head_dots / 8) as usize;
    let offset = head_dots.saturating_sub(height) / 2;

    let mut lines: Matrix = Vec::with_capacity(width as usize);

    for x in 0..width {
        let mut line = vec![0u8; bytes_per_line];
        for y in 0..height.min(head_dots) {
            let pixel = image.get_pixel(x, y).0[0];
            if pixel < threshold {
                let dot = (offset + y) as usize;
                line[dot / 8] |= 0x80 >> (dot % 8);
            }
        }
        lines.push(line);
    }

    lines
}
