//! Configuration for GigE detectors.

use std::path::Path;

use anyhow::Result;
use serde::Deserialize;

use crate::controller::SUPPORTED_GPIO;
use crate::error::GigeError;

/// Settings for one GigE detector, usually an `[instruments.<name>]`
/// table inside a beamline configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct GigeDetectorConfig {
    /// Device name used in describe keys and emitted documents.
    pub name: String,

    /// PV prefix shared by the camera and its file plugin, e.g. `GIGE:`.
    pub prefix: String,

    /// GPIO line external triggers use (default: 1)
    #[serde(default = "default_gpio")]
    pub gpio_number: u16,

    /// Connect signals in mock mode instead of to live IOCs (default: false)
    #[serde(default)]
    pub mock: bool,
}

fn default_gpio() -> u16 {
    1
}

impl GigeDetectorConfig {
    /// Loads and validates a configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deserializes and validates an embedded TOML table.
    pub fn from_toml_value(value: &toml::Value) -> Result<Self> {
        let cfg: Self = value.clone().try_into()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects settings the detector cannot be built from.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            anyhow::bail!("Detector name must not be empty");
        }
        if self.prefix.is_empty() {
            anyhow::bail!("PV prefix must not be empty");
        }
        if !SUPPORTED_GPIO.contains(&self.gpio_number) {
            return Err(GigeError::UnsupportedTriggerGpio { requested: self.gpio_number }.into());
        }
        Ok(())
    }
}
