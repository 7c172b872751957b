//! DYMO label print service
//!
//! This crate discovers DYMO LabelManager printers on USB and prints
//! user-supplied raster images on them. Uploaded images are decoded, scaled to
//! the exact pixel height of the selected tape and reduced to binary pixels.
//! Every request returns a PNG preview of the label.
//!
//! # Example
//!
//! ```rust,no_run
//! use dymo_label::{LabelOptions, LabelService, PrintRequest, TapeKind, UsbPrinterService};
//! use std::sync::Arc;
//!
//! let printers = Arc::new(UsbPrinterService::new(128).unwrap());
//! let service = LabelService::new(printers, LabelOptions::default());
//! let request = PrintRequest {
//!     serial_number: "012345678901".to_string(),
//!     tape: TapeKind::D1_12_MM,
//!     image: std::fs::read("label.png").unwrap(),
//!     preview: true,
//! };
//! let preview = service.print_label(&request).unwrap();
//! ```

mod config;
mod error;
mod handler;
mod model;
mod printer;
mod raster;
mod scale;
mod server;
mod tape;
mod usb;

pub use crate::{
    config::Config,
    error::{ConfigError, DispatchError, Error, LabelError},
    handler::{decode, encode_png, LabelOptions, LabelService, PrintRequest, Preview},
    model::Model,
    printer::{DryRunPrinterService, PrintJob, Printer, PrinterService},
    raster::pack_columns,
    scale::{scale_label, scaled_width, to_binary, DEFAULT_THRESHOLD},
    server::{create_router, ApiError, IMAGE_PART},
    tape::{TapeGeometry, TapeKind, UnknownTape},
    usb::UsbPrinterService,
};

/// Print head lines: one `Vec<u8>` per line, 8 dots packed into each byte.
pub type Matrix = Vec<Vec<u8>>;
