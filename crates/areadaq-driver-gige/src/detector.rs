//! GigE Vision area detector assembled from the camera and file-plugin blocks.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use areadaq_core::{
    Connectable, DataKey, HdfWriter, Hints, NdFileHdfIo, PathProvider, Reading, StandardDetector,
    StreamAsset, TriggerInfo,
};
use async_trait::async_trait;

use crate::config::GigeDetectorConfig;
use crate::controller::GigeController;
use crate::driver::GigeDriverIo;
use crate::error::GigeError;

/// PV suffix of the camera register block.
const DRV_SUFFIX: &str = "cam1:";
/// PV suffix of the HDF file-writing plugin.
const HDF_SUFFIX: &str = "HDF1:";

/// A GenICam/GigE Vision area camera that streams frames through an HDF
/// file-writing plugin.
///
/// The camera registers live under `<prefix>cam1:` and the plugin under
/// `<prefix>HDF1:`. Acquisition runs stage → prepare/trigger → collect →
/// unstage; frame data never travels through [`read`](Self::read), only
/// through the stream documents returned by
/// [`collect_asset_docs`](Self::collect_asset_docs).
pub struct GigeDetector {
    driver: GigeDriverIo,
    hdf: NdFileHdfIo,
    inner: StandardDetector<GigeController, HdfWriter>,
}

impl GigeDetector {
    /// Assembles a detector named `name` under `prefix` (e.g. `GIGE:`),
    /// writing frames where `path_provider` points.
    pub fn new(
        name: impl Into<String>,
        prefix: &str,
        path_provider: Arc<dyn PathProvider>,
    ) -> Self {
        let name = name.into();
        let driver = GigeDriverIo::new(format!("{prefix}{DRV_SUFFIX}"));
        let hdf = NdFileHdfIo::new(format!("{prefix}{HDF_SUFFIX}"));
        let controller = GigeController::new(driver.clone());
        let writer =
            HdfWriter::new(hdf.clone(), path_provider, name.clone(), Arc::new(driver.clone()));
        Self { driver, hdf, inner: StandardDetector::new(name, controller, writer) }
    }

    /// Builds a detector from validated configuration and applies its GPIO
    /// selection.
    pub fn from_config(
        cfg: &GigeDetectorConfig,
        path_provider: Arc<dyn PathProvider>,
    ) -> Result<Self> {
        cfg.validate()?;
        let detector = Self::new(cfg.name.clone(), &cfg.prefix, path_provider);
        detector.set_external_trigger_gpio(cfg.gpio_number)?;
        Ok(detector)
    }

    /// Device name used in describe keys and emitted documents.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Camera register block.
    pub fn driver(&self) -> &GigeDriverIo {
        &self.driver
    }

    /// File-plugin signal block.
    pub fn hdf(&self) -> &NdFileHdfIo {
        &self.hdf
    }

    /// Acquisition controller.
    pub fn controller(&self) -> &GigeController {
        self.inner.controller()
    }

    /// Frame writer.
    pub fn writer(&self) -> &HdfWriter {
        self.inner.writer()
    }

    /// GPIO line external triggers use.
    pub fn get_external_trigger_gpio(&self) -> u16 {
        self.inner.controller().gpio_number()
    }

    /// Selects the GPIO line external triggers use; committed to the camera
    /// on the next arm.
    pub fn set_external_trigger_gpio(&self, gpio: u16) -> Result<(), GigeError> {
        self.inner.controller().set_gpio_number(gpio)
    }

    /// Whether the detector is currently staged.
    pub fn is_staged(&self) -> bool {
        self.inner.is_staged()
    }

    /// Opens a fresh capture and caches the describe map.
    pub async fn stage(&self) -> Result<()> {
        self.inner.stage().await
    }

    /// Stops capture and clears everything staging cached.
    pub async fn unstage(&self) -> Result<()> {
        self.inner.unstage().await
    }

    /// Data keys for the staged acquisition; empty when unstaged.
    pub async fn describe(&self) -> Result<HashMap<String, DataKey>> {
        self.inner.describe().await
    }

    /// In-band readings; always empty for an area detector.
    pub async fn read(&self) -> Result<HashMap<String, Reading>> {
        self.inner.read().await
    }

    /// Data keys for streamed frames; same map as [`describe`](Self::describe).
    pub async fn describe_collect(&self) -> Result<HashMap<String, DataKey>> {
        self.inner.describe_collect().await
    }

    /// Stream documents covering frames up to `index`.
    pub async fn collect_asset_docs(&self, index: u64) -> Result<Vec<StreamAsset>> {
        self.inner.collect_asset_docs(index).await
    }

    /// Validates a trigger request and arms the camera with it.
    pub async fn prepare(&self, info: TriggerInfo) -> Result<()> {
        self.inner.prepare(info).await
    }

    /// Acquires one internally triggered frame and waits for it to land.
    pub async fn trigger(&self) -> Result<()> {
        self.inner.trigger().await
    }

    /// Plotting hints for downstream consumers.
    pub fn hints(&self) -> Hints {
        self.inner.hints()
    }
}

#[async_trait]
impl Connectable for GigeDetector {
    async fn connect(&self, mock: bool) -> Result<()> {
        self.driver.connect(mock).await?;
        self.hdf.connect(mock).await?;
        Ok(())
    }
}
