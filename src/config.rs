//! Process configuration from environment variables.

use std::net::SocketAddr;

use crate::{error::ConfigError, handler::LabelOptions, scale::DEFAULT_THRESHOLD};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD: usize = 10 * 1024 * 1024;
pub const DEFAULT_DRY_RUN_SERIAL: &str = "DRYRUN0001";

#[derive(Debug, Clone)]
pub struct Config {
    pub listen: SocketAddr,
    pub max_upload: usize,
    pub threshold: u8,
    pub binarize_passthrough: bool,
    pub dry_run: bool,
    pub dry_run_serials: Vec<String>,
}

impl Config {
    /// Read `DYMO_LABEL_*` variables from the process environment.
    pub fn from_env() -> Result<Config, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let listen = parse(&lookup, "DYMO_LABEL_LISTEN", DEFAULT_LISTEN.to_string(), |v| {
            v.parse::<SocketAddr>().map_err(|e| e.to_string())
        })?;
        let max_upload = parse(&lookup, "DYMO_LABEL_MAX_UPLOAD", DEFAULT_MAX_UPLOAD.to_string(), |v| {
            v.parse::<usize>().map_err(|e| e.to_string())
        })?;
        let threshold = parse(&lookup, "DYMO_LABEL_THRESHOLD", DEFAULT_THRESHOLD.to_string(), |v| {
            v.parse::<u8>().map_err(|e| e.to_string())
        })?;
        let binarize_passthrough =
            parse(&lookup, "DYMO_LABEL_BINARIZE_PASSTHROUGH", "false".to_string(), parse_bool)?;
        let dry_run = parse(&lookup, "DYMO_LABEL_DRY_RUN", "false".to_string(), parse_bool)?;
        let dry_run_serials = parse(
            &lookup,
            "DYMO_LABEL_DRY_RUN_SERIALS",
            DEFAULT_DRY_RUN_SERIAL.to_string(),
            |v| {
                let serials: Vec<String> = v
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect();
                if serials.is_empty() {
                    Err("at least one serial number is required".to_string())
                } else {
                    Ok(serials)
                }
            },
        )?;

        Ok(Config {
            listen,
            max_upload,
            threshold,
            binarize_passthrough,
            dry_run,
            dry_run_serials,
        })
    }

    pub fn label_options(&self) -> LabelOptions {
        LabelOptions {
            threshold: self.threshold,
            binarize_passthrough: self.binarize_passthrough,
        }
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: String,
    convert: impl Fn(&str) -> Result<T, String>,
) -> Result<T, ConfigError> {
    let value = lookup(key).unwrap_or(default);
    convert(value.trim()).map_err(|reason| ConfigError::InvalidValue { key, value, reason })
}

pub(crate) fn parse_bool(value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err("expected true or false".to_string()),
    }
}
