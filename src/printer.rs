use image::DynamicImage;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{error::DispatchError, error::Error, tape::TapeGeometry, tape::TapeKind};

/// An attached label printer, as seen at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Printer {
    serial_number: String,
    label_height: BTreeMap<TapeKind, u32>,
}

impl Printer {
    pub fn new(serial_number: impl Into<String>, geometry: &TapeGeometry) -> Self {
        Printer {
            serial_number: serial_number.into(),
            label_height: geometry.heights().clone(),
        }
    }

    pub fn serial_number(&self) -> &str {
        &self.serial_number
    }

    /// Required image height for `tape`, or `None` if the printer does not
    /// take that cassette.
    pub fn label_height(&self, tape: TapeKind) -> Option<u32> {
        self.label_height.get(&tape).copied()
    }
}

/// Printer directory and print dispatcher.
///
/// Implementations enumerate live device state on every call. `print_label`
/// may be called concurrently; serializing access to one physical device is
/// the implementation's job.
pub trait PrinterService: Send + Sync {
    fn list_available_printers(&self) -> Result<Vec<Printer>, Error>;

    fn print_label(
        &self,
        serial_number: &str,
        tape: TapeKind,
        image: &DynamicImage,
    ) -> Result<(), DispatchError>;
}

/// A label accepted by [`DryRunPrinterService`].
#[derive(Debug, Clone)]
pub struct PrintJob {
    pub serial_number: String,
    pub tape: TapeKind,
    pub width: u32,
    pub height: u32,
}

/// Virtual printers that log and record jobs instead of printing.
pub struct DryRunPrinterService {
    printers: Vec<Printer>,
    jobs: Mutex<Vec<PrintJob>>,
}

impl DryRunPrinterService {
    pub fn new(printers: Vec<Printer>) -> Self {
        DryRunPrinterService {
            printers,
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// Jobs dispatched so far, oldest first.
    pub fn jobs(&self) -> Vec<PrintJob> {
        match self.jobs.lock() {
            Ok(jobs) => jobs.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl PrinterService for DryRunPrinterService {
    fn list_available_printers(&self) -> Result<Vec<Printer>, Error> {
        Ok(self.printers.clone())
    }

    fn print_label(
        &self,
        serial_number: &str,
        tape: TapeKind,
        image: &DynamicImage,
    ) -> Result<(), DispatchError> {
        let printer = self
            .printers
            .iter()
            .find(|p| p.serial_number() == serial_number)
            .ok_or_else(|| DispatchError::PrinterNotFound(serial_number.to_string()))?;

        match printer.label_height(tape) {
            Some(height) if height == image.height() => {}
            Some(height) => {
                return Err(DispatchError::InvalidParameter(format!(
                    "Image height {} does not match tape {} ({} px)",
                    image.height(),
                    tape,
                    height
                )))
            }
            None => {
                return Err(DispatchError::InvalidParameter(format!(
                    "Unsupported tape! {}",
                    tape
                )))
            }
        }

        info!(
            "dry run: {} label {}x{} for printer {}",
            tape,
            image.width(),
            image.height(),
            serial_number
        );

        let job = PrintJob {
            serial_number: serial_number.to_string(),
            tape,
            width: image.width(),
            height: image.height(),
        };
        match self.jobs.lock() {
            Ok(mut jobs) => jobs.push(job),
            Err(poisoned) => poisoned.into_inner().push(job),
        }
        Ok(())
    }
}
