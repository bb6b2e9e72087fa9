//! Register-level signal block for a GigE Vision camera IOC.
//!
//! Field names mirror the IOC's process variables under the camera
//! prefix (e.g. `GIGE:cam1:`). The block carries the full value
//! vocabulary each record accepts; the controller decides which values
//! to write.

use std::fmt;

use anyhow::Result;
use areadaq_core::{Connectable, DatasetDescriber, Signal};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source feeding the camera's frame trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GigeTriggerSource {
    /// Camera free-runs on its internal clock.
    Freerun,
    /// GPIO trigger line 1.
    Line1,
    /// GPIO trigger line 2.
    Line2,
    /// GPIO trigger line 3.
    Line3,
    /// GPIO trigger line 4.
    Line4,
}

impl GigeTriggerSource {
    /// Maps a GPIO index to its trigger line, if the camera has one.
    pub fn from_gpio(gpio: u16) -> Option<Self> {
        match gpio {
            1 => Some(Self::Line1),
            2 => Some(Self::Line2),
            3 => Some(Self::Line3),
            4 => Some(Self::Line4),
            _ => None,
        }
    }
}

impl fmt::Display for GigeTriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Freerun => "Freerun",
            Self::Line1 => "Line1",
            Self::Line2 => "Line2",
            Self::Line3 => "Line3",
            Self::Line4 => "Line4",
        };
        f.write_str(name)
    }
}

/// Whether exposures wait for the trigger source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GigeTriggerMode {
    /// Exposures start on the camera's own schedule.
    Off,
    /// Exposures wait for the selected trigger source.
    On,
}

/// How many frames one acquire command takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageMode {
    /// One frame per acquire.
    Single,
    /// `num_images` frames per acquire.
    Multiple,
    /// Frames until acquisition is stopped.
    Continuous,
}

/// Pixel data type reported by the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdDataType {
    /// Signed 8-bit pixels.
    Int8,
    /// Unsigned 8-bit pixels.
    UInt8,
    /// Signed 16-bit pixels.
    Int16,
    /// Unsigned 16-bit pixels.
    UInt16,
    /// Signed 32-bit pixels.
    Int32,
    /// Unsigned 32-bit pixels.
    UInt32,
    /// Signed 64-bit pixels.
    Int64,
    /// Unsigned 64-bit pixels.
    UInt64,
    /// 32-bit float pixels.
    Float32,
    /// 64-bit float pixels.
    Float64,
}

impl AdDataType {
    /// Numpy dtype string for one pixel of this type.
    pub fn as_numpy_str(self) -> &'static str {
        match self {
            Self::Int8 => "|i1",
            Self::UInt8 => "|u1",
            Self::Int16 => "<i2",
            Self::UInt16 => "<u2",
            Self::Int32 => "<i4",
            Self::UInt32 => "<u4",
            Self::Int64 => "<i8",
            Self::UInt64 => "<u8",
            Self::Float32 => "<f4",
            Self::Float64 => "<f8",
        }
    }
}

/// Signals exposed by the camera driver under its prefix.
///
/// `_RBV` readbacks are read-only; mock connections drive them with
/// [`Signal::set_mock_value`].
#[derive(Debug, Clone)]
pub struct GigeDriverIo {
    /// Acquisition running flag.
    pub acquire: Signal<bool>,
    /// Exposure time per frame, in seconds.
    pub acquire_time: Signal<f64>,
    /// Frames per acquire in [`ImageMode::Multiple`].
    pub num_images: Signal<i64>,
    /// Frames-per-acquire mode.
    pub image_mode: Signal<ImageMode>,
    /// Whether exposures wait for the trigger source.
    pub trigger_mode: Signal<GigeTriggerMode>,
    /// Source feeding the frame trigger.
    pub trigger_source: Signal<GigeTriggerSource>,
    /// Pixel data type of produced frames.
    pub data_type: Signal<AdDataType>,
    /// Frame width in pixels.
    pub array_size_x: Signal<i64>,
    /// Frame height in pixels.
    pub array_size_y: Signal<i64>,
}

impl GigeDriverIo {
    /// Creates the signal block for the camera under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            acquire: Signal::new(format!("{prefix}Acquire"), false),
            acquire_time: Signal::new(format!("{prefix}AcquireTime"), 0.0),
            num_images: Signal::new(format!("{prefix}NumImages"), 0),
            image_mode: Signal::new(format!("{prefix}ImageMode"), ImageMode::Single),
            trigger_mode: Signal::new(format!("{prefix}TriggerMode"), GigeTriggerMode::Off),
            trigger_source: Signal::new(
                format!("{prefix}TriggerSource"),
                GigeTriggerSource::Freerun,
            ),
            data_type: Signal::new_read_only(format!("{prefix}DataType_RBV"), AdDataType::Int8),
            array_size_x: Signal::new_read_only(format!("{prefix}ArraySizeX_RBV"), 0),
            array_size_y: Signal::new_read_only(format!("{prefix}ArraySizeY_RBV"), 0),
        }
    }
}

#[async_trait]
impl Connectable for GigeDriverIo {
    async fn connect(&self, mock: bool) -> Result<()> {
        self.acquire.connect(mock)?;
        self.acquire_time.connect(mock)?;
        self.num_images.connect(mock)?;
        self.image_mode.connect(mock)?;
        self.trigger_mode.connect(mock)?;
        self.trigger_source.connect(mock)?;
        self.data_type.connect(mock)?;
        self.array_size_x.connect(mock)?;
        self.array_size_y.connect(mock)?;
        Ok(())
    }
}

#[async_trait]
impl DatasetDescriber for GigeDriverIo {
    async fn shape(&self) -> Result<(u32, u32)> {
        let height = self.array_size_y.get_value().await?;
        let width = self.array_size_x.get_value().await?;
        Ok((height.max(0) as u32, width.max(0) as u32))
    }

    async fn np_datatype(&self) -> Result<String> {
        Ok(self.data_type.get_value().await?.as_numpy_str().to_string())
    }
}
