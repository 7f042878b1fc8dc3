//! Driver registry and driver-string parsing

use std::collections::HashMap;
use std::sync::Arc;

use aseq_core::Driver;

/// Information about an available driver
pub struct DriverInfo {
    /// Primary name used on the command line
    pub name: &'static str,
    /// Alternative names
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Drivers compiled into this binary
pub fn available_drivers() -> Vec<DriverInfo> {
    #[allow(unused_mut)]
    let mut drivers = Vec::new();

    #[cfg(feature = "dummy")]
    drivers.push(DriverInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "In-memory spectrometer emulator",
    });

    #[cfg(feature = "native")]
    drivers.push(DriverInfo {
        name: "native",
        aliases: &["libspectrometer"],
        description: "ASEQ spectrometers over libspectrometer",
    });

    drivers
}

/// Comma-separated list of driver names for CLI help
pub fn driver_names_short() -> String {
    let names: Vec<&str> = available_drivers().iter().map(|d| d.name).collect();
    names.join(", ")
}

/// Parsed driver string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverParams {
    /// Driver name
    pub name: String,
    /// `key=value` options
    pub params: HashMap<String, String>,
}

impl DriverParams {
    /// Numeric option, `None` when absent
    pub fn number<T: std::str::FromStr>(
        &self,
        key: &str,
    ) -> Result<Option<T>, Box<dyn std::error::Error>> {
        match self.params.get(key) {
            None => Ok(None),
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_| format!("Invalid value for '{}': '{}'", key, value).into()),
        }
    }
}

/// Parse `name[:key=value,...]`
pub fn parse_driver_params(s: &str) -> Result<DriverParams, Box<dyn std::error::Error>> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(
                    format!("Invalid parameter format: '{}' (expected key=value)", opt).into(),
                );
            }
        }
    }

    Ok(DriverParams {
        name: name.to_string(),
        params,
    })
}

/// Open the driver named by a driver string
///
/// # Example
/// ```ignore
/// let driver = open_driver("dummy:devices=3")?;
/// assert_eq!(driver.devices_count(), 3);
/// ```
pub fn open_driver(driver_str: &str) -> Result<Arc<dyn Driver>, Box<dyn std::error::Error>> {
    let params = parse_driver_params(driver_str)?;
    log::debug!("Opening driver '{}' with {:?}", params.name, params.params);

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" | "emulator" => open_dummy(&params),
        #[cfg(feature = "native")]
        "native" | "libspectrometer" => {
            if !params.params.is_empty() {
                log::warn!("native driver takes no parameters, ignoring them");
            }
            Ok(Arc::new(aseq_native::NativeDriver::new()))
        }
        other => Err(format!(
            "Unknown driver '{}' [available: {}]",
            other,
            driver_names_short()
        )
        .into()),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(params: &DriverParams) -> Result<Arc<dyn Driver>, Box<dyn std::error::Error>> {
    use aseq_dummy::{DummyConfig, DummyDriver};

    let mut config = match params.number::<usize>("devices")? {
        Some(devices) => DummyConfig::with_devices(devices),
        None => DummyConfig::default(),
    };
    if let Some(frames) = params.number::<u16>("memory")? {
        config.memory_frames = frames;
    }
    if let Some(limit) = params.number::<usize>("read_limit")? {
        config.flash_read_limit = Some(limit);
    }

    log::info!("Emulating {} device(s)", config.serials.len());
    Ok(Arc::new(DummyDriver::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_name() {
        let params = parse_driver_params("native").unwrap();
        assert_eq!(params.name, "native");
        assert!(params.params.is_empty());
    }

    #[test]
    fn parses_options() {
        let params = parse_driver_params("dummy:devices=3,memory=16").unwrap();
        assert_eq!(params.name, "dummy");
        assert_eq!(params.number::<usize>("devices").unwrap(), Some(3));
        assert_eq!(params.number::<u16>("memory").unwrap(), Some(16));
        assert_eq!(params.number::<u16>("read_limit").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_options() {
        assert!(parse_driver_params("dummy:devices").is_err());
        let params = parse_driver_params("dummy:devices=many").unwrap();
        assert!(params.number::<usize>("devices").is_err());
    }

    #[test]
    fn unknown_driver() {
        assert!(open_driver("nonexistent").is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn opens_dummy_with_device_count() {
        let driver = open_driver("dummy:devices=3").unwrap();
        assert_eq!(driver.devices_count(), 3);
    }
}
