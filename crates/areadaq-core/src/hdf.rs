//! HDF file-writer plugin front-end.
//!
//! Area-detector IOCs ship a file-writer plugin that lands frames in an
//! HDF5 file out of band; the adapter only drives the plugin's signals and
//! reports what was written. [`NdFileHdfIo`] is the signal block for that
//! plugin, and [`HdfWriter`] implements [`DetectorWriter`] on top of it:
//! point the plugin at a [`PathProvider`] location, arm capture, describe
//! the dataset, then translate the plugin's captured-frame counter into
//! stream-resource/stream-datum documents.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::detector::{Connectable, DatasetDescriber, DetectorWriter};
use crate::document::{
    DataKey, Document, Hints, StreamAsset, StreamDatumDoc, StreamRange, StreamResourceDoc,
    StreamResourceParameters,
};
use crate::error::DetectorError;
use crate::path::PathProvider;
use crate::signal::Signal;

/// Dataset path the plugin writes frames to inside the file.
pub const FRAME_DATASET: &str = "/entry/data/data";

/// Plugin file template combining directory and filename.
pub const FILE_TEMPLATE: &str = "%s/%s.h5";

/// Media type of the files the plugin produces.
pub const HDF_MIMETYPE: &str = "application/x-hdf5";

/// Signals exposed by an areaDetector `NDFileHDF5` plugin instance.
///
/// Field names mirror the plugin's process variables under the given
/// prefix (e.g. `GIGE:HDF1:`). `_RBV` readbacks are read-only; mock
/// connections drive them with [`Signal::set_mock_value`].
#[derive(Debug, Clone)]
pub struct NdFileHdfIo {
    /// Directory the plugin writes into.
    pub file_path: Signal<String>,
    /// Filename without extension.
    pub file_name: Signal<String>,
    /// Template combining path and name into the full file name.
    pub file_template: Signal<String>,
    /// Full path of the file being written, composed by the plugin.
    pub full_file_name: Signal<String>,
    /// Whether the plugin host can see the configured directory.
    pub file_path_exists: Signal<bool>,
    /// Capture armed flag.
    pub capture: Signal<bool>,
    /// Number of frames to capture; 0 captures until stopped.
    pub num_capture: Signal<i64>,
    /// Frames captured so far in this acquisition.
    pub num_captured: Signal<i64>,
    /// Single-writer-multiple-reader mode for the file being written.
    pub swmr_mode: Signal<bool>,
    /// Defer file creation until the first frame arrives.
    pub lazy_open: Signal<bool>,
    /// Extra leading dimensions beyond the frame index.
    pub num_extra_dims: Signal<i64>,
}

impl NdFileHdfIo {
    /// Creates the signal block for the plugin under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            file_path: Signal::new(format!("{prefix}FilePath"), String::new()),
            file_name: Signal::new(format!("{prefix}FileName"), String::new()),
            file_template: Signal::new(format!("{prefix}FileTemplate"), String::new()),
            full_file_name: Signal::new_read_only(
                format!("{prefix}FullFileName_RBV"),
                String::new(),
            ),
            file_path_exists: Signal::new_read_only(format!("{prefix}FilePathExists_RBV"), false),
            capture: Signal::new(format!("{prefix}Capture"), false),
            num_capture: Signal::new(format!("{prefix}NumCapture"), 0),
            num_captured: Signal::new_read_only(format!("{prefix}NumCaptured_RBV"), 0),
            swmr_mode: Signal::new(format!("{prefix}SWMRMode"), false),
            lazy_open: Signal::new(format!("{prefix}LazyOpen"), false),
            num_extra_dims: Signal::new(format!("{prefix}NumExtraDims"), 0),
        }
    }
}

#[async_trait]
impl Connectable for NdFileHdfIo {
    async fn connect(&self, mock: bool) -> Result<()> {
        self.file_path.connect(mock)?;
        self.file_name.connect(mock)?;
        self.file_template.connect(mock)?;
        self.full_file_name.connect(mock)?;
        self.file_path_exists.connect(mock)?;
        self.capture.connect(mock)?;
        self.num_capture.connect(mock)?;
        self.num_captured.connect(mock)?;
        self.swmr_mode.connect(mock)?;
        self.lazy_open.connect(mock)?;
        self.num_extra_dims.connect(mock)?;
        Ok(())
    }
}

/// One dataset the plugin is writing during an acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct HdfDataset {
    /// Data key the dataset backs, normally the device name.
    pub data_key: String,
    /// Dataset path inside the file.
    pub dataset: String,
    /// Frame shape as (height, width).
    pub shape: (u32, u32),
    /// Numpy dtype string for one pixel.
    pub dtype_numpy: String,
    /// Frames stored per acquisition step.
    pub multiplier: u32,
    /// Whether readers must open the file in SWMR mode.
    pub swmr: bool,
}

struct WriterState {
    dataset: Option<HdfDataset>,
    resource_uid: Option<String>,
    last_emitted: u64,
    multiplier: u32,
}

impl Default for WriterState {
    fn default() -> Self {
        Self { dataset: None, resource_uid: None, last_emitted: 0, multiplier: 1 }
    }
}

/// [`DetectorWriter`] driving an [`NdFileHdfIo`] plugin.
///
/// `open` points the plugin at the path provider's location and arms
/// capture; `collect_stream_docs` describes the backing file once per
/// acquisition and then reports written index ranges against it.
pub struct HdfWriter {
    hdf: NdFileHdfIo,
    path_provider: Arc<dyn PathProvider>,
    device_name: String,
    dataset_describer: Arc<dyn DatasetDescriber>,
    state: Mutex<WriterState>,
}

impl HdfWriter {
    /// Creates a writer for `device_name` over the given plugin signals.
    pub fn new(
        hdf: NdFileHdfIo,
        path_provider: Arc<dyn PathProvider>,
        device_name: impl Into<String>,
        dataset_describer: Arc<dyn DatasetDescriber>,
    ) -> Self {
        Self {
            hdf,
            path_provider,
            device_name: device_name.into(),
            dataset_describer,
            state: Mutex::new(WriterState::default()),
        }
    }

    /// The plugin signal block this writer drives.
    pub fn hdf(&self) -> &NdFileHdfIo {
        &self.hdf
    }

    /// Composes the stream-resource document once the backing file name is
    /// known; later calls return only new datum ranges.
    fn compose_docs(&self, full_file_name: &str, indices_written: u64) -> Vec<StreamAsset> {
        let mut docs = Vec::new();
        let mut state = self.state.lock();
        if state.resource_uid.is_none() {
            let Some(dataset) = state.dataset.as_ref() else {
                return docs;
            };
            let resource = StreamResourceDoc::new(
                HDF_MIMETYPE,
                dataset.data_key.clone(),
                format!("file://localhost{full_file_name}"),
                StreamResourceParameters {
                    dataset: dataset.dataset.clone(),
                    swmr: dataset.swmr,
                    multiplier: dataset.multiplier,
                },
            );
            state.resource_uid = Some(resource.uid.clone());
            docs.push(("stream_resource", Document::StreamResource(resource)));
        }
        if indices_written > state.last_emitted {
            if let Some(uid) = state.resource_uid.clone() {
                let datum = StreamDatumDoc::new(
                    uid,
                    // Event numbering is the orchestrator's concern.
                    StreamRange { start: 0, stop: 0 },
                    StreamRange { start: state.last_emitted, stop: indices_written },
                );
                state.last_emitted = indices_written;
                docs.push(("stream_datum", Document::StreamDatum(datum)));
            }
        }
        docs
    }
}

#[async_trait]
impl DetectorWriter for HdfWriter {
    async fn open(&self, multiplier: u32) -> Result<HashMap<String, DataKey>> {
        let info = self.path_provider.path_info(&self.device_name);
        self.hdf.num_extra_dims.set(0).await?;
        self.hdf.lazy_open.set(true).await?;
        self.hdf.swmr_mode.set(false).await?;
        self.hdf
            .file_path
            .set(info.directory_path.to_string_lossy().into_owned())
            .await?;
        self.hdf.file_name.set(info.filename.clone()).await?;
        self.hdf.file_template.set(FILE_TEMPLATE.to_string()).await?;

        if !self.hdf.file_path_exists.get_value().await? {
            return Err(DetectorError::FilePathMissing { path: info.directory_path }.into());
        }

        // Capture until close; frame counting is the controller's job.
        self.hdf.num_capture.set(0).await?;
        self.hdf.capture.set_and_wait(true, None).await?;

        let (height, width) = self.dataset_describer.shape().await?;
        let dtype_numpy = self.dataset_describer.np_datatype().await?;

        {
            let mut state = self.state.lock();
            state.dataset = Some(HdfDataset {
                data_key: self.device_name.clone(),
                dataset: FRAME_DATASET.to_string(),
                shape: (height, width),
                dtype_numpy: dtype_numpy.clone(),
                multiplier,
                swmr: false,
            });
            state.resource_uid = None;
            state.last_emitted = 0;
            state.multiplier = multiplier.max(1);
        }

        info!(
            device = %self.device_name,
            directory = %info.directory_path.display(),
            filename = %info.filename,
            "HDF capture armed"
        );

        let data_key = DataKey::array(
            self.hdf.full_file_name.source(),
            vec![height as i32, width as i32],
        )
        .with_dtype_numpy(dtype_numpy)
        .with_external("STREAM:");
        Ok(HashMap::from([(self.device_name.clone(), data_key)]))
    }

    async fn get_indices_written(&self) -> Result<u64> {
        let captured = self.hdf.num_captured.get_value().await?;
        let multiplier = u64::from(self.state.lock().multiplier.max(1));
        Ok(captured.max(0) as u64 / multiplier)
    }

    async fn wait_for_index(&self, index: u64, timeout: Option<Duration>) -> Result<()> {
        let multiplier = u64::from(self.state.lock().multiplier.max(1));
        self.hdf
            .num_captured
            .wait_for_value(
                move |captured| (*captured).max(0) as u64 / multiplier >= index,
                timeout,
            )
            .await?;
        Ok(())
    }

    async fn collect_stream_docs(&self, indices_written: u64) -> Result<Vec<StreamAsset>> {
        if indices_written == 0 {
            return Ok(Vec::new());
        }
        // The file name only becomes valid once the plugin is capturing.
        let full_file_name = self.hdf.full_file_name.get_value().await?;
        let docs = self.compose_docs(&full_file_name, indices_written);
        debug!(device = %self.device_name, count = docs.len(), "collected stream documents");
        Ok(docs)
    }

    async fn close(&self) -> Result<()> {
        self.hdf.capture.set_and_wait(false, None).await?;
        *self.state.lock() = WriterState::default();
        debug!(device = %self.device_name, "HDF capture stopped");
        Ok(())
    }

    fn hints(&self) -> Hints {
        Hints { fields: vec![self.device_name.clone()] }
    }
}
