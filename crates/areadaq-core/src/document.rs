//! Stream documents emitted during acquisition.
//!
//! Frame data never travels through events; the writer describes the
//! backing file once per staged acquisition with a stream-resource
//! document, then reports written index ranges with stream-datum
//! documents. Documents are serde-serializable for handoff to an external
//! aggregation engine and are transported as `(kind, document)` pairs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a unique identifier for documents.
pub fn new_uid() -> String {
    Uuid::new_v4().to_string()
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
pub fn now_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or(0)
}

/// Half-open index range `[start, stop)` within a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamRange {
    /// First index covered.
    pub start: u64,
    /// One past the last index covered.
    pub stop: u64,
}

/// Reader-side parameters for locating frames inside the resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamResourceParameters {
    /// Dataset path inside the file, e.g. `/entry/data/data`.
    pub dataset: String,
    /// Whether readers must use single-writer-multiple-reader mode.
    pub swmr: bool,
    /// Frames per acquisition step stored in the dataset.
    pub multiplier: u32,
}

/// Describes one backing data file for a stream of frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamResourceDoc {
    /// Unique identifier other documents reference.
    pub uid: String,
    /// Data key this resource backs, normally the device name.
    pub data_key: String,
    /// Media type of the backing file.
    pub mimetype: String,
    /// Locator for the file, e.g. `file://localhost/data/foo.h5`.
    pub uri: String,
    /// Reader-side access parameters.
    pub parameters: StreamResourceParameters,
}

impl StreamResourceDoc {
    /// Creates a resource with a fresh uid.
    pub fn new(
        mimetype: impl Into<String>,
        data_key: impl Into<String>,
        uri: impl Into<String>,
        parameters: StreamResourceParameters,
    ) -> Self {
        Self {
            uid: new_uid(),
            data_key: data_key.into(),
            mimetype: mimetype.into(),
            uri: uri.into(),
            parameters,
        }
    }
}

/// Reports a range of frame indices written to a stream resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDatumDoc {
    /// Unique identifier of this datum.
    pub uid: String,
    /// Uid of the [`StreamResourceDoc`] the indices refer to.
    pub stream_resource: String,
    /// Descriptor uid, filled in by the orchestration engine downstream.
    #[serde(default)]
    pub descriptor: String,
    /// Event sequence numbers covered; numbering is the orchestrator's
    /// concern, so the writer always emits an empty range.
    pub seq_nums: StreamRange,
    /// Frame indices this datum covers within the resource.
    pub indices: StreamRange,
}

impl StreamDatumDoc {
    /// Creates a datum with a fresh uid referencing `stream_resource`.
    pub fn new(
        stream_resource: impl Into<String>,
        seq_nums: StreamRange,
        indices: StreamRange,
    ) -> Self {
        Self {
            uid: new_uid(),
            stream_resource: stream_resource.into(),
            descriptor: String::new(),
            seq_nums,
            indices,
        }
    }
}

/// Any document the acquisition layer emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Document {
    /// Backing-file description, once per staged acquisition.
    StreamResource(StreamResourceDoc),
    /// Written-index report, one per collection.
    StreamDatum(StreamDatumDoc),
}

impl Document {
    /// Document kind name used in `(kind, document)` pairs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StreamResource(_) => "stream_resource",
            Self::StreamDatum(_) => "stream_datum",
        }
    }

    /// Unique identifier of the wrapped document.
    pub fn uid(&self) -> &str {
        match self {
            Self::StreamResource(doc) => &doc.uid,
            Self::StreamDatum(doc) => &doc.uid,
        }
    }
}

/// Kind-tagged document pair handed to the aggregation engine.
pub type StreamAsset = (&'static str, Document);

/// Descriptor for one field a staged device will produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataKey {
    /// Where the value comes from, e.g. a signal source string.
    pub source: String,
    /// Shape of one entry; frame height and width for area detectors.
    pub shape: Vec<i32>,
    /// Descriptor data type, `"array"` for streamed frames.
    pub dtype: String,
    /// Numpy dtype string, e.g. `"|i1"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dtype_numpy: Option<String>,
    /// Marker telling the engine the data arrives out of band.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external: Option<String>,
}

impl DataKey {
    /// Creates an `"array"`-typed key for streamed frame data.
    pub fn array(source: impl Into<String>, shape: Vec<i32>) -> Self {
        Self {
            source: source.into(),
            shape,
            dtype: "array".to_string(),
            dtype_numpy: None,
            external: None,
        }
    }

    /// Sets the numpy dtype string.
    #[must_use]
    pub fn with_dtype_numpy(mut self, dtype_numpy: impl Into<String>) -> Self {
        self.dtype_numpy = Some(dtype_numpy.into());
        self
    }

    /// Marks the field as arriving through an external stream.
    #[must_use]
    pub fn with_external(mut self, external: impl Into<String>) -> Self {
        self.external = Some(external.into());
        self
    }
}

/// One in-band value read from a device field.
///
/// Streamed detectors deliver frames out of band, so their `read()` maps
/// stay empty; the type exists for the fields of devices that do report
/// values through events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// The value read.
    pub value: serde_json::Value,
    /// When it was read, nanoseconds since the Unix epoch.
    pub timestamp_ns: u64,
}

impl Reading {
    /// Creates a reading stamped with the current time.
    pub fn new(value: serde_json::Value) -> Self {
        Self { value, timestamp_ns: now_ns() }
    }
}

/// Plotting hints a device offers the orchestration layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hints {
    /// Field names worth plotting, normally just the device name.
    pub fields: Vec<String>,
}
