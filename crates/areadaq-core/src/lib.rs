//! `areadaq-core`
//!
//! Core abstractions for area-detector acquisition adapters.
//!
//! This crate provides the framework pieces a hardware adapter composes:
//! process-variable style signals with a mock-override affordance, the
//! trigger model, stream documents, output-path providers, and the
//! controller/writer traits glued together by [`StandardDetector`].
//!
//! ## Layered design
//!
//! - [`Signal`]: one named, observable value on a device (mock or live)
//! - [`DetectorController`] / [`DetectorWriter`]: the two halves of a
//!   detector, exposure control and frame landing
//! - [`StandardDetector`]: the stage/read/describe/collect lifecycle an
//!   orchestration engine drives
//!
//! ## Key Types
//!
//! - [`TriggerInfo`]: one acquisition request (count, trigger kind, timing)
//! - [`Document`]: stream-resource/stream-datum pair for out-of-band frames
//! - [`DetectorError`]: typed failures callers can match on
//!
//! ## Example
//!
//! ```rust,no_run
//! use areadaq_core::{DetectorTrigger, TriggerInfo};
//!
//! // Acquisitions follow a standard lifecycle:
//! // connect -> stage -> prepare/trigger -> collect -> unstage
//! let info = TriggerInfo::new(1, DetectorTrigger::EdgeTrigger).with_deadtime(2e-3);
//! ```

pub mod detector;
pub mod document;
pub mod error;
pub mod hdf;
pub mod path;
pub mod signal;
pub mod trigger;

pub use detector::{
    Connectable, DatasetDescriber, DetectorController, DetectorWriter, StandardDetector,
};
pub use document::{
    DataKey, Document, Hints, Reading, StreamAsset, StreamDatumDoc, StreamRange,
    StreamResourceDoc, StreamResourceParameters,
};
pub use error::{AppResult, DetectorError};
pub use hdf::{HdfDataset, HdfWriter, NdFileHdfIo};
pub use path::{PathInfo, PathProvider, StaticPathProvider, YmdPathProvider};
pub use signal::{Signal, SignalMode, DEFAULT_TIMEOUT};
pub use trigger::{DetectorTrigger, TriggerInfo};
