//! Detector capability traits and the staged-acquisition assembly.
//!
//! A detector splits into a controller (starts and stops exposures on the
//! camera driver) and a writer (lands frames in their backing store and
//! reports progress). [`StandardDetector`] glues one of each into the
//! stage/read/describe/collect lifecycle the orchestration layer drives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::document::{DataKey, Hints, Reading, StreamAsset};
use crate::signal::DEFAULT_TIMEOUT;
use crate::trigger::{DetectorTrigger, TriggerInfo};

/// Devices whose signals can be connected as a group.
#[async_trait]
pub trait Connectable: Send + Sync {
    /// Connects every signal of the device, mock or live.
    async fn connect(&self, mock: bool) -> Result<()>;
}

/// Sensor-side description of the frames a detector will produce.
#[async_trait]
pub trait DatasetDescriber: Send + Sync {
    /// Frame shape as (height, width).
    async fn shape(&self) -> Result<(u32, u32)>;

    /// Numpy dtype string for one pixel, e.g. `"|i1"`.
    async fn np_datatype(&self) -> Result<String>;
}

/// Starts and stops frame acquisition on the camera driver.
#[async_trait]
pub trait DetectorController: Send + Sync {
    /// Minimum gap the detector needs between exposures, in seconds.
    ///
    /// # Contract
    /// - Must be safe to call at any time, armed or not.
    fn get_deadtime(&self, exposure: Option<f64>) -> f64;

    /// Arms the detector for `num` frames (`0` means run until disarmed).
    ///
    /// # Contract
    /// - An unsupported `trigger` kind fails before any driver write.
    /// - Resolves once the driver confirms acquisition has started.
    async fn arm(&self, num: u32, trigger: DetectorTrigger, exposure: Option<f64>) -> Result<()>;

    /// Stops any running acquisition.
    async fn disarm(&self) -> Result<()>;
}

/// Writes frames to their backing store and reports progress.
#[async_trait]
pub trait DetectorWriter: Send + Sync {
    /// Prepares the backing store for an acquisition storing `multiplier`
    /// frames per step; returns descriptors keyed by data key.
    async fn open(&self, multiplier: u32) -> Result<HashMap<String, DataKey>>;

    /// Frames fully written so far.
    async fn get_indices_written(&self) -> Result<u64>;

    /// Waits until at least `index` frames are written.
    async fn wait_for_index(&self, index: u64, timeout: Option<Duration>) -> Result<()>;

    /// Documents describing progress up to `indices_written`; the backing
    /// resource is described once, then datum ranges reference it.
    async fn collect_stream_docs(&self, indices_written: u64) -> Result<Vec<StreamAsset>>;

    /// Stops writing and resets per-acquisition state.
    async fn close(&self) -> Result<()>;

    /// Plotting hints for the fields this writer produces.
    fn hints(&self) -> Hints;
}

/// A controller/writer pair with the staged-acquisition lifecycle.
///
/// Callers serialize the flow: connect, stage, prepare or trigger, collect,
/// unstage. Descriptors are only valid between stage and unstage.
pub struct StandardDetector<C, W> {
    name: String,
    controller: C,
    writer: W,
    describe: RwLock<HashMap<String, DataKey>>,
    trigger_info: RwLock<Option<TriggerInfo>>,
    staged: AtomicBool,
}

impl<C: DetectorController, W: DetectorWriter> StandardDetector<C, W> {
    /// Assembles a detector from its parts.
    pub fn new(name: impl Into<String>, controller: C, writer: W) -> Self {
        Self {
            name: name.into(),
            controller,
            writer,
            describe: RwLock::new(HashMap::new()),
            trigger_info: RwLock::new(None),
            staged: AtomicBool::new(false),
        }
    }

    /// Device name, used as the data key for produced frames.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The acquisition controller.
    pub fn controller(&self) -> &C {
        &self.controller
    }

    /// The frame writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Whether the detector is currently staged.
    pub fn is_staged(&self) -> bool {
        self.staged.load(Ordering::SeqCst)
    }

    /// Brackets the start of an acquisition: stops any leftover capture,
    /// disarms, opens the writer, and caches the descriptors.
    pub async fn stage(&self) -> Result<()> {
        self.writer.close().await?;
        self.controller.disarm().await?;
        let describe = self.writer.open(1).await?;
        *self.describe.write() = describe;
        self.staged.store(true, Ordering::SeqCst);
        info!(detector = %self.name, "staged");
        Ok(())
    }

    /// Closes the acquisition bracket and invalidates descriptors.
    pub async fn unstage(&self) -> Result<()> {
        self.writer.close().await?;
        self.controller.disarm().await?;
        self.describe.write().clear();
        self.trigger_info.write().take();
        self.staged.store(false, Ordering::SeqCst);
        info!(detector = %self.name, "unstaged");
        Ok(())
    }

    /// Descriptors for the fields this detector produces; empty unless
    /// staged.
    pub async fn describe(&self) -> Result<HashMap<String, DataKey>> {
        Ok(self.describe.read().clone())
    }

    /// In-band readings. Frames travel in stream documents, never through
    /// events, so this is always empty.
    pub async fn read(&self) -> Result<HashMap<String, Reading>> {
        Ok(HashMap::new())
    }

    /// Descriptors for collected (streamed) data; same map as
    /// [`StandardDetector::describe`].
    pub async fn describe_collect(&self) -> Result<HashMap<String, DataKey>> {
        Ok(self.describe.read().clone())
    }

    /// Stream documents covering frames up to `index`.
    pub async fn collect_asset_docs(&self, index: u64) -> Result<Vec<StreamAsset>> {
        self.writer.collect_stream_docs(index).await
    }

    /// Validates an acquisition request and arms the controller with it.
    ///
    /// Externally triggered kinds must supply a deadtime at least as large
    /// as the controller requires. The request is remembered only once the
    /// controller accepts it.
    pub async fn prepare(&self, value: TriggerInfo) -> Result<()> {
        if value.trigger != DetectorTrigger::Internal {
            let Some(provided) = value.deadtime else {
                anyhow::bail!("Deadtime must be supplied when in externally triggered mode");
            };
            let required = self.controller.get_deadtime(value.livetime);
            if required > provided {
                anyhow::bail!(
                    "Detector {} needs at least {required}s deadtime, \
                     but trigger logic provides only {provided}s",
                    self.name
                );
            }
        }
        debug!(detector = %self.name, trigger = %value.trigger, frames = value.number, "preparing");
        self.controller.arm(value.number, value.trigger, value.livetime).await?;
        *self.trigger_info.write() = Some(value);
        Ok(())
    }

    /// Acquires one internally triggered frame and waits for the writer to
    /// land it.
    pub async fn trigger(&self) -> Result<()> {
        let before = self.writer.get_indices_written().await?;
        self.controller.arm(1, DetectorTrigger::Internal, None).await?;
        let bound = self
            .trigger_info
            .read()
            .as_ref()
            .and_then(|info| info.frame_timeout)
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs_f64);
        self.writer.wait_for_index(before + 1, Some(bound)).await
    }

    /// Plotting hints, delegated to the writer.
    pub fn hints(&self) -> Hints {
        self.writer.hints()
    }
}
