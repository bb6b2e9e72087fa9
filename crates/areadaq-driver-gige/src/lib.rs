//! GigE Vision area-detector adapter for areadaq.
//!
//! Drives a GenICam/GigE Vision camera through its areaDetector register
//! block (`cam1:`) and HDF file-writing plugin (`HDF1:`), exposing the
//! stage/prepare/trigger/collect lifecycle from `areadaq-core`.
//!
//! # Assembling a detector
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use areadaq_core::{Connectable, DetectorTrigger, StaticPathProvider, TriggerInfo};
//! use areadaq_driver_gige::GigeDetector;
//!
//! let provider = Arc::new(StaticPathProvider::new("/data"));
//! let detector = GigeDetector::new("gige1", "GIGE:", provider);
//! detector.connect(true).await?;
//! detector.stage().await?;
//! detector.prepare(TriggerInfo::new(10, DetectorTrigger::Internal)).await?;
//! let docs = detector.collect_asset_docs(10).await?;
//! detector.unstage().await?;
//! ```
//!
//! Signals connect in mock mode for tests and demos; live Channel Access
//! transports plug in through the hooks on `areadaq_core::Signal`.

pub mod config;
pub mod controller;
pub mod detector;
pub mod driver;
pub mod error;

pub use config::GigeDetectorConfig;
pub use controller::{DEADTIME_S, GigeController, SUPPORTED_GPIO};
pub use detector::GigeDetector;
pub use driver::{AdDataType, GigeDriverIo, GigeTriggerMode, GigeTriggerSource, ImageMode};
pub use error::GigeError;
