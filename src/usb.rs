use image::DynamicImage;
use log::{debug, info};
use rusb::{Context, Device, DeviceDescriptor, DeviceHandle, Direction, TransferType, UsbContext};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{
    error::{DispatchError, Error},
    model::{Model, DYMO_VID},
    printer::{Printer, PrinterService},
    raster, scale,
    tape::{TapeGeometry, TapeKind},
    Matrix,
};

const ESC: u8 = 0x1B;
const SYN: u8 = 0x16;

/// Blank lines fed after the label so it clears the cutter.
const TRAILING_FEED: usize = 56;

type OpenDevice = (Model, Device<Context>, DeviceDescriptor, DeviceHandle<Context>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Endpoint {
    iface: u8,
    address: u8,
}

#[derive(Debug, Clone, Copy)]
struct EndpointInfo {
    endpoint: Endpoint,
    direction: Direction,
    transfer_type: TransferType,
}

/// The printer takes raster data on its first bulk OUT endpoint.
fn raster_endpoint(endpoints: &[EndpointInfo]) -> Option<Endpoint> {
    endpoints
        .iter()
        .find(|info| info.direction == Direction::Out && info.transfer_type == TransferType::Bulk)
        .map(|info| info.endpoint)
}

/// Printer directory and dispatcher backed by libusb.
pub struct UsbPrinterService {
    context: Context,
    geometry: HashMap<Model, TapeGeometry>,
    threshold: u8,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl UsbPrinterService {
    pub fn new(threshold: u8) -> Result<Self, Error> {
        let context = Context::new()?;
        let geometry = Model::ALL
            .iter()
            .map(|model| (*model, model.tape_geometry()))
            .collect();

        Ok(UsbPrinterService {
            context,
            geometry,
            threshold,
            locks: Mutex::new(HashMap::new()),
        })
    }

    fn devices(&self) -> Result<Vec<(Model, Device<Context>, DeviceDescriptor)>, Error> {
        let devices = self.context.devices()?;
        let mut found = Vec::new();

        for device in devices.iter() {
            let device_desc = match device.device_descriptor() {
                Ok(d) => d,
                Err(err) => {
                    debug!("{:?}", err);
                    continue;
                }
            };
            if device_desc.vendor_id() != DYMO_VID {
                continue;
            }
            match Model::from_pid(device_desc.product_id()) {
                Some(model) => found.push((model, device, device_desc)),
                None => debug!(
                    "Ignoring DYMO device with product id {:04x}",
                    device_desc.product_id()
                ),
            }
        }
        Ok(found)
    }

    fn read_serial(
        device: &Device<Context>,
        device_desc: &DeviceDescriptor,
    ) -> Result<(String, DeviceHandle<Context>), Error> {
        let handle = device.open()?;
        let timeout = Duration::from_secs(1);
        let languages = handle.read_languages(timeout)?;
        let language = languages.first().copied().ok_or(Error::DeviceOffline)?;
        let serial = handle.read_serial_number_string(language, device_desc, timeout)?;
        Ok((serial, handle))
    }

    fn open_device(&self, serial: &str) -> Result<Option<OpenDevice>, Error> {
        for (model, device, device_desc) in self.devices()? {
            match Self::read_serial(&device, &device_desc) {
                Ok((s, handle)) if s == serial => {
                    return Ok(Some((model, device, device_desc, handle)))
                }
                Ok(_) => continue,
                Err(err) => {
                    debug!("Failed to read serial number string: {:?}", err);
                    continue;
                }
            }
        }
        debug!("No device match with this serial: {:?}", serial);
        Ok(None)
    }

    /// Every endpoint the device advertises, across all configurations.
    fn endpoints(device: &Device<Context>, device_desc: &DeviceDescriptor) -> Vec<EndpointInfo> {
        (0..device_desc.num_configurations())
            .filter_map(|n| device.config_descriptor(n).ok())
            .flat_map(|config_desc| {
                config_desc
                    .interfaces()
                    .flat_map(|interface| interface.descriptors().collect::<Vec<_>>())
                    .flat_map(|interface_desc| {
                        let iface = interface_desc.interface_number();
                        interface_desc
                            .endpoint_descriptors()
                            .map(move |endpoint_desc| EndpointInfo {
                                endpoint: Endpoint {
                                    iface,
                                    address: endpoint_desc.address(),
                                },
                                direction: endpoint_desc.direction(),
                                transfer_type: endpoint_desc.transfer_type(),
                            })
                            .collect::<Vec<_>>()
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn device_lock(&self, serial: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(serial.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn write(
        handle: &DeviceHandle<Context>,
        endpoint: Endpoint,
        buf: &[u8],
    ) -> Result<usize, Error> {
        let timeout = Duration::from_secs(10);
        let n = handle.write_bulk(endpoint.address, buf, timeout)?;
        if n == buf.len() {
            Ok(n)
        } else {
            debug!(
                "write error: bytes wrote {} != bytes supplied {}, possibly timeout ?",
                n,
                buf.len()
            );
            Err(Error::ShortWrite {
                written: n,
                expected: buf.len(),
            })
        }
    }
}

impl PrinterService for UsbPrinterService {
    fn list_available_printers(&self) -> Result<Vec<Printer>, Error> {
        let mut printers = Vec::new();

        for (model, device, device_desc) in self.devices()? {
            match Self::read_serial(&device, &device_desc) {
                Ok((serial, _)) => {
                    if let Some(geometry) = self.geometry.get(&model) {
                        printers.push(Printer::new(serial, geometry));
                    }
                }
                Err(err) => debug!("Skipping {:?}: {:?}", model, err),
            }
        }

        debug!("{} printer(s) attached", printers.len());
        Ok(printers)
    }

    fn print_label(
        &self,
        serial_number: &str,
        tape: TapeKind,
        image: &DynamicImage,
    ) -> Result<(), DispatchError> {
        let lock = self.device_lock(serial_number);
        let _guard = match lock.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let (model, device, device_desc, handle) = self
            .open_device(serial_number)?
            .ok_or_else(|| DispatchError::PrinterNotFound(serial_number.to_string()))?;

        let height = self
            .geometry
            .get(&model)
            .and_then(|geometry| geometry.height(tape))
            .ok_or_else(|| {
                DispatchError::InvalidParameter(format!("Unsupported tape! {}", tape))
            })?;
        if image.height() != height {
            return Err(DispatchError::InvalidParameter(format!(
                "Image height {} does not match tape {} ({} px)",
                image.height(),
                tape,
                height
            )));
        }

        let endpoint = raster_endpoint(&Self::endpoints(&device, &device_desc))
            .ok_or(Error::MissingEndpoint)?;

        // not supported outside Linux
        if let Err(err) = handle.set_auto_detach_kernel_driver(true) {
            debug!("auto detach kernel driver: {:?}", err);
        }
        handle.claim_interface(endpoint.iface).map_err(Error::from)?;

        let binary = scale::to_binary(image, self.threshold).to_luma8();
        let lines = raster::pack_columns(&binary, model.head_dots(), self.threshold);
        let job = label_job(&lines, model.head_dots());
        info!(
            "Sending {} lines ({} bytes) to {}",
            lines.len(),
            job.len(),
            serial_number
        );

        let result = Self::write(&handle, endpoint, &job);
        handle.release_interface(endpoint.iface).ok();
        result?;
        Ok(())
    }
}

/// Frame raster lines for the LabelManager line transfer.
fn label_job(lines: &Matrix, head_dots: u32) -> Vec<u8> {
    let bytes_per_line = (head_dots / 8) as u8;
    let mut buf: Vec<u8> = Vec::new();

    buf.extend_from_slice(&[ESC, b'C', 0x00]); // tape type
    buf.extend_from_slice(&[ESC, b'B', 0x00]); // dot tab
    buf.extend_from_slice(&[ESC, b'D', bytes_per_line]);
    for line in lines {
        buf.push(SYN);
        buf.extend_from_slice(line);
    }

    buf.extend_from_slice(&[ESC, b'D', 0x00]);
    buf.extend(std::iter::repeat(SYN).take(TRAILING_FEED));
    buf.extend_from_slice(&[ESC, b'A']); // status request
    buf
}
