//! Trigger model shared by detector controllers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// How an exposure is initiated.
///
/// Controllers advertise the subset they support and reject the rest at
/// arm time, before any driver signal is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorTrigger {
    /// Detector generates its own internal trigger (free run).
    Internal,
    /// One exposure per rising edge on the selected trigger line.
    EdgeTrigger,
    /// Expose while the gate line is held, with a fixed exposure window.
    ConstantGate,
    /// Expose while the gate line is held, window length set by the gate.
    VariableGate,
}

impl fmt::Display for DetectorTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Internal => "internal",
            Self::EdgeTrigger => "edge_trigger",
            Self::ConstantGate => "constant_gate",
            Self::VariableGate => "variable_gate",
        };
        f.write_str(name)
    }
}

/// One acquisition request handed to [`prepare`].
///
/// [`prepare`]: crate::detector::StandardDetector::prepare
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerInfo {
    /// Number of frames to acquire; 0 means run until disarmed.
    pub number: u32,
    /// Trigger kind the acquisition uses.
    pub trigger: DetectorTrigger,
    /// Gap the trigger source guarantees between exposures, in seconds.
    /// Required for externally triggered kinds.
    pub deadtime: Option<f64>,
    /// Exposure time per frame, in seconds.
    pub livetime: Option<f64>,
    /// Bound on how long one frame may take to arrive, in seconds.
    pub frame_timeout: Option<f64>,
}

impl TriggerInfo {
    /// Creates a request with no timing constraints attached.
    pub fn new(number: u32, trigger: DetectorTrigger) -> Self {
        Self { number, trigger, deadtime: None, livetime: None, frame_timeout: None }
    }

    /// Sets the guaranteed deadtime in seconds.
    #[must_use]
    pub fn with_deadtime(mut self, seconds: f64) -> Self {
        self.deadtime = Some(seconds);
        self
    }

    /// Sets the exposure time per frame in seconds.
    #[must_use]
    pub fn with_livetime(mut self, seconds: f64) -> Self {
        self.livetime = Some(seconds);
        self
    }

    /// Sets the per-frame arrival bound in seconds.
    #[must_use]
    pub fn with_frame_timeout(mut self, seconds: f64) -> Self {
        self.frame_timeout = Some(seconds);
        self
    }
}
