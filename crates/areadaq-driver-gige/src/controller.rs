//! Acquisition controller for GigE Vision cameras.

use std::sync::atomic::{AtomicU16, Ordering};

use anyhow::Result;
use areadaq_core::{DetectorController, DetectorTrigger};
use async_trait::async_trait;
use tracing::debug;

use crate::driver::{GigeDriverIo, GigeTriggerMode, GigeTriggerSource, ImageMode};
use crate::error::GigeError;

/// Highest deadtime of the supported camera models, in seconds.
///
/// Reported for every exposure time; the trigger source must leave at
/// least this gap between frames.
pub const DEADTIME_S: f64 = 1961e-6;

/// GPIO trigger lines the camera exposes.
pub const SUPPORTED_GPIO: [u16; 4] = [1, 2, 3, 4];

/// Frame count written when the caller asks to run until disarmed.
const CONTINUOUS_FRAMES: i64 = 999_999;

/// Translates abstract trigger requests into camera register writes.
///
/// The controller owns the GPIO line selection. Selecting a line never
/// touches the camera; only [`arm`](DetectorController::arm) commits it
/// to the trigger-source register.
pub struct GigeController {
    driver: GigeDriverIo,
    gpio_number: AtomicU16,
}

impl GigeController {
    /// Creates a controller over the camera registers, on GPIO line 1.
    pub fn new(driver: GigeDriverIo) -> Self {
        Self { driver, gpio_number: AtomicU16::new(1) }
    }

    /// Currently selected GPIO trigger line.
    pub fn gpio_number(&self) -> u16 {
        self.gpio_number.load(Ordering::SeqCst)
    }

    /// Selects the GPIO line external triggers use.
    ///
    /// Rejects indices outside [`SUPPORTED_GPIO`] before any state
    /// change; the camera's trigger-source register is untouched either
    /// way.
    pub fn set_gpio_number(&self, gpio: u16) -> Result<(), GigeError> {
        if !SUPPORTED_GPIO.contains(&gpio) {
            return Err(GigeError::UnsupportedTriggerGpio { requested: gpio });
        }
        self.gpio_number.store(gpio, Ordering::SeqCst);
        Ok(())
    }

    /// Register values for a trigger kind, or the rejection for kinds the
    /// camera cannot produce.
    fn trigger_registers(
        &self,
        trigger: DetectorTrigger,
    ) -> Result<(GigeTriggerMode, GigeTriggerSource), GigeError> {
        let source = match trigger {
            DetectorTrigger::Internal => {
                return Ok((GigeTriggerMode::Off, GigeTriggerSource::Freerun));
            }
            DetectorTrigger::EdgeTrigger | DetectorTrigger::ConstantGate => {
                GigeTriggerSource::from_gpio(self.gpio_number())
            }
            DetectorTrigger::VariableGate => None,
        };
        match source {
            Some(source) => Ok((GigeTriggerMode::On, source)),
            None => Err(GigeError::UnsupportedTrigger { requested: trigger }),
        }
    }
}

#[async_trait]
impl DetectorController for GigeController {
    fn get_deadtime(&self, _exposure: Option<f64>) -> f64 {
        DEADTIME_S
    }

    async fn arm(&self, num: u32, trigger: DetectorTrigger, exposure: Option<f64>) -> Result<()> {
        let (mode, source) = self.trigger_registers(trigger)?;
        if let Some(exposure) = exposure {
            self.driver.acquire_time.set(exposure).await?;
        }
        // The trigger mode must settle before the source is selected.
        self.driver.trigger_mode.set(mode).await?;
        self.driver.trigger_source.set(source).await?;
        self.driver.image_mode.set(ImageMode::Multiple).await?;
        let frames = if num == 0 { CONTINUOUS_FRAMES } else { i64::from(num) };
        self.driver.num_images.set(frames).await?;
        self.driver.acquire.set_and_wait(true, None).await?;
        debug!(%trigger, %source, frames, "camera armed");
        Ok(())
    }

    async fn disarm(&self) -> Result<()> {
        self.driver.acquire.set_and_wait(false, None).await?;
        debug!("camera disarmed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn controller() -> GigeController {
        let driver = GigeDriverIo::new("GIGE:cam1:");
        areadaq_core::Connectable::connect(&driver, true).await.unwrap();
        GigeController::new(driver)
    }

    #[tokio::test]
    async fn deadtime_is_constant_for_any_exposure() {
        let ctrl = controller().await;
        for exposure in [0.0, 0.1, 1.0, 10.0, 100.0] {
            assert_eq!(ctrl.get_deadtime(Some(exposure)), 1961e-6);
        }
        assert_eq!(ctrl.get_deadtime(None), 1961e-6);
    }

    #[tokio::test]
    async fn gpio_selection_is_validated_before_storing() {
        let ctrl = controller().await;
        assert_eq!(ctrl.gpio_number(), 1);
        ctrl.set_gpio_number(4).unwrap();
        assert_eq!(ctrl.gpio_number(), 4);

        let err = ctrl.set_gpio_number(55).unwrap_err();
        assert!(matches!(err, GigeError::UnsupportedTriggerGpio { requested: 55 }));
        assert_eq!(ctrl.gpio_number(), 4, "rejected selection leaves state unchanged");
    }

    #[tokio::test]
    async fn internal_arm_free_runs() {
        let ctrl = controller().await;
        ctrl.arm(3, DetectorTrigger::Internal, Some(0.01)).await.unwrap();
        let drv = &ctrl.driver;
        assert_eq!(drv.trigger_mode.get_value().await.unwrap(), GigeTriggerMode::Off);
        assert_eq!(drv.trigger_source.get_value().await.unwrap(), GigeTriggerSource::Freerun);
        assert_eq!(drv.image_mode.get_value().await.unwrap(), ImageMode::Multiple);
        assert_eq!(drv.num_images.get_value().await.unwrap(), 3);
        assert!((drv.acquire_time.get_value().await.unwrap() - 0.01).abs() < f64::EPSILON);
        assert!(drv.acquire.get_value().await.unwrap());
    }

    #[tokio::test]
    async fn external_arm_commits_the_selected_line() {
        let ctrl = controller().await;
        ctrl.set_gpio_number(2).unwrap();
        ctrl.arm(1, DetectorTrigger::EdgeTrigger, None).await.unwrap();
        let drv = &ctrl.driver;
        assert_eq!(drv.trigger_mode.get_value().await.unwrap(), GigeTriggerMode::On);
        assert_eq!(drv.trigger_source.get_value().await.unwrap(), GigeTriggerSource::Line2);
    }

    #[tokio::test]
    async fn zero_frames_means_run_until_disarmed() {
        let ctrl = controller().await;
        ctrl.arm(0, DetectorTrigger::Internal, None).await.unwrap();
        assert_eq!(ctrl.driver.num_images.get_value().await.unwrap(), CONTINUOUS_FRAMES);

        ctrl.disarm().await.unwrap();
        assert!(!ctrl.driver.acquire.get_value().await.unwrap());
    }

    #[tokio::test]
    async fn unsupported_trigger_fails_before_any_write() {
        let ctrl = controller().await;
        let err = ctrl.arm(1, DetectorTrigger::VariableGate, Some(0.5)).await.unwrap_err();
        assert!(err.to_string().contains("only supports the following trigger types"));
        let drv = &ctrl.driver;
        assert_eq!(drv.trigger_source.get_value().await.unwrap(), GigeTriggerSource::Freerun);
        assert_eq!(drv.acquire_time.get_value().await.unwrap(), 0.0);
        assert!(!drv.acquire.get_value().await.unwrap());
    }
}
