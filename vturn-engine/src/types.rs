// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The error type shared by the engine and the models.

use std::fmt;

use vturn_track::tracker::TrackConfigError;

/// Return a [`SimError`] built from anything that can be turned into a
/// string.
#[macro_export]
macro_rules! sim_error {
    ($msg:expr) => {
        Err($crate::types::SimError($msg.to_string()))
    };
}

/// A condition that stops the simulation, such as an invalid fault or a
/// reference to a switch that is not in the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SimError(pub String);

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Error: {}", self.0)
    }
}

impl std::error::Error for SimError {}

impl From<TrackConfigError> for SimError {
    fn from(e: TrackConfigError) -> Self {
        SimError(e.to_string())
    }
}

/// Result of an operation that only reports failure.
pub type SimResult = Result<(), SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown_switch(label: &str) -> SimResult {
        sim_error!(format!("Unknown switch {label}"))
    }

    #[test]
    fn display_adds_prefix() {
        let err = unknown_switch("4.0.0").unwrap_err();
        assert_eq!(err.to_string(), "Error: Unknown switch 4.0.0");
    }

    #[test]
    fn from_tracker_config() {
        let err: SimError = TrackConfigError("bad regex".to_string()).into();
        assert_eq!(err.0, "Tracker config error: bad regex");
    }
}
