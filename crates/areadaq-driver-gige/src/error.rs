//! Error types for the GigE adapter.

use areadaq_core::DetectorTrigger;
use thiserror::Error;

/// User-facing failures raised by the adapter before any signal write.
#[derive(Error, Debug)]
pub enum GigeError {
    /// A trigger line outside the camera's GPIO bank was requested.
    #[error(
        "GigeDetector only supports the following GPIO indices: \
         (1, 2, 3, 4) but was asked to use {requested}"
    )]
    UnsupportedTriggerGpio {
        /// The rejected GPIO index.
        requested: u16,
    },

    /// A trigger kind the camera cannot produce was requested.
    #[error(
        "GigeController only supports the following trigger types: \
         (internal, edge_trigger, constant_gate) but was asked to use {requested}"
    )]
    UnsupportedTrigger {
        /// The rejected trigger kind.
        requested: DetectorTrigger,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpio_error_enumerates_the_allowed_indices() {
        let err = GigeError::UnsupportedTriggerGpio { requested: 55 };
        assert_eq!(
            err.to_string(),
            "GigeDetector only supports the following GPIO indices: \
             (1, 2, 3, 4) but was asked to use 55"
        );
    }

    #[test]
    fn trigger_error_enumerates_the_allowed_kinds() {
        let err = GigeError::UnsupportedTrigger { requested: DetectorTrigger::VariableGate };
        assert_eq!(
            err.to_string(),
            "GigeController only supports the following trigger types: \
             (internal, edge_trigger, constant_gate) but was asked to use variable_gate"
        );
    }
}
