//! Label print request handling.
//!
//! [`LabelService`] resolves the printer, checks the tape, decodes and scales
//! the upload, optionally dispatches it and always returns a PNG preview of
//! the label.

use image::{DynamicImage, ImageFormat};
use log::{debug, info};
use std::io::Cursor;
use std::sync::Arc;

use crate::{
    error::LabelError,
    printer::{Printer, PrinterService},
    scale,
    tape::TapeKind,
};

/// Formats accepted for upload.
const SUPPORTED_FORMATS: [ImageFormat; 4] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::Gif,
];

pub const PNG_CONTENT_TYPE: &str = "image/png";

#[derive(Debug, Clone, Copy)]
pub struct LabelOptions {
    pub threshold: u8,
    /// Also convert images to binary when they already have the tape height.
    /// Off by default: such images are printed and previewed unchanged.
    pub binarize_passthrough: bool,
}

impl Default for LabelOptions {
    fn default() -> Self {
        LabelOptions {
            threshold: scale::DEFAULT_THRESHOLD,
            binarize_passthrough: false,
        }
    }
}

/// A single print (or preview) request.
#[derive(Debug, Clone)]
pub struct PrintRequest {
    pub serial_number: String,
    pub tape: TapeKind,
    pub image: Vec<u8>,
    pub preview: bool,
}

/// PNG rendering of the label that was (or would have been) printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    png: Vec<u8>,
}

impl Preview {
    pub fn content_type(&self) -> &'static str {
        PNG_CONTENT_TYPE
    }

    pub fn content_length(&self) -> usize {
        self.png.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.png
    }
}

pub struct LabelService {
    printers: Arc<dyn PrinterService>,
    options: LabelOptions,
}

impl LabelService {
    pub fn new(printers: Arc<dyn PrinterService>, options: LabelOptions) -> Self {
        LabelService { printers, options }
    }

    pub fn list_printers(&self) -> Result<Vec<Printer>, LabelError> {
        Ok(self.printers.list_available_printers()?)
    }

    /// Look the printer up in a fresh enumeration.
    pub fn find_printer(&self, serial_number: &str) -> Result<Printer, LabelError> {
        self.list_printers()?
            .into_iter()
            .find(|printer| printer.serial_number() == serial_number)
            .ok_or(LabelError::NotFound)
    }

    pub fn print_label(&self, request: &PrintRequest) -> Result<Preview, LabelError> {
        let printer = self.find_printer(&request.serial_number)?;
        let label_height = printer
            .label_height(request.tape)
            .ok_or_else(|| LabelError::unsupported_tape(request.tape))?;

        let image = decode(&request.image)?;
        let label = self.prepare(image, label_height);

        if request.preview {
            debug!(
                "preview only, {}x{} label not sent to {}",
                label.width(),
                label.height(),
                printer.serial_number()
            );
        } else {
            info!(
                "printing {}x{} label on {} ({})",
                label.width(),
                label.height(),
                printer.serial_number(),
                request.tape
            );
            self.printers
                .print_label(printer.serial_number(), request.tape, &label)?;
        }

        Ok(Preview {
            png: encode_png(&label)?,
        })
    }

    fn prepare(&self, image: DynamicImage, label_height: u32) -> DynamicImage {
        if image.height() != label_height {
            scale::scale_label(&image, label_height, self.options.threshold)
        } else if self.options.binarize_passthrough {
            scale::to_binary(&image, self.options.threshold)
        } else {
            image
        }
    }
}

/// Decode an uploaded image. Unknown, corrupt or empty images are a bad
/// request.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, LabelError> {
    let format = image::guess_format(bytes).map_err(|_| LabelError::unsupported_image())?;
    if !SUPPORTED_FORMATS.contains(&format) {
        return Err(LabelError::unsupported_image());
    }

    let image = image::load_from_memory_with_format(bytes, format).map_err(|err| {
        debug!("image decode failed: {}", err);
        LabelError::unsupported_image()
    })?;

    if image.width() == 0 || image.height() == 0 {
        return Err(LabelError::unsupported_image());
    }
    Ok(image)
}

pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, LabelError> {
    let mut png = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|err| LabelError::InternalError(err.to_string()))?;
    Ok(png)
}
