// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Scheduled link failures.
//!
//! Faults are written as `pod.switch.level:port@time_ns` to fail a switch
//! port, or `clear@time_ns` to repair every port and forget every detour.

use std::fmt;
use std::str::FromStr;

use vturn_engine::engine::Engine;
use vturn_engine::types::{SimError, SimResult};
use vturn_routing::label::PositionLabel;

use crate::network::NetEvent;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FaultAction {
    /// Fail one output port of a switch.
    Set { node: PositionLabel, port: usize },

    /// Repair all ports and clear every reroute cache.
    Clear,
}

impl fmt::Display for FaultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultAction::Set { node, port } => write!(f, "{node}:{port}"),
            FaultAction::Clear => write!(f, "clear"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fault {
    pub time_ns: u64,
    pub action: FaultAction,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.action, self.time_ns)
    }
}

impl FromStr for Fault {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((action, time)) = s.trim().split_once('@') else {
            return Err(SimError(format!("Fault '{s}' is missing '@time_ns'")));
        };
        let time_ns = time
            .parse::<u64>()
            .map_err(|e| SimError(format!("Fault '{s}' has a bad time: {e}")))?;

        let action = if action == "clear" {
            FaultAction::Clear
        } else {
            let Some((node, port)) = action.split_once(':') else {
                return Err(SimError(format!(
                    "Fault '{s}' should be pod.switch.level:port@time_ns or clear@time_ns"
                )));
            };
            let node: PositionLabel = node.parse()?;
            let port = port
                .parse::<usize>()
                .map_err(|e| SimError(format!("Fault '{s}' has a bad port: {e}")))?;
            FaultAction::Set { node, port }
        };
        Ok(Self { time_ns, action })
    }
}

/// Faults to inject during a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaultSchedule {
    faults: Vec<Fault>,
}

impl FaultSchedule {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    #[must_use]
    pub fn set_failure(mut self, time_ns: u64, node: PositionLabel, port: usize) -> Self {
        self.add(Fault {
            time_ns,
            action: FaultAction::Set { node, port },
        });
        self
    }

    #[must_use]
    pub fn clear_failure(mut self, time_ns: u64) -> Self {
        self.add(Fault {
            time_ns,
            action: FaultAction::Clear,
        });
        self
    }

    /// Parse a list of faults written as strings.
    pub fn parse<S: AsRef<str>>(faults: &[S]) -> Result<Self, SimError> {
        let faults = faults
            .iter()
            .map(|f| f.as_ref().parse())
            .collect::<Result<Vec<Fault>, _>>()?;
        Ok(Self { faults })
    }

    #[must_use]
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.faults.is_empty()
    }

    /// Add every fault to the engine's event queue.
    pub fn schedule(&self, engine: &mut Engine<NetEvent>) -> SimResult {
        for fault in &self.faults {
            engine.schedule_at(fault.time_ns, NetEvent::Fault(fault.action))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_set() {
        let fault: Fault = "0.0.1:5@2000".parse().unwrap();
        assert_eq!(fault.time_ns, 2000);
        assert_eq!(
            fault.action,
            FaultAction::Set {
                node: PositionLabel::aggregation(0, 0),
                port: 5
            }
        );
        assert_eq!(fault.to_string(), "0.0.1:5@2000");
    }

    #[test]
    fn parse_clear() {
        let fault: Fault = " clear@10 ".parse().unwrap();
        assert_eq!(
            fault,
            Fault {
                time_ns: 10,
                action: FaultAction::Clear
            }
        );
    }

    #[test]
    fn parse_errors() {
        for bad in ["0.0.1:5", "0.0.1@5", "0.0:5@5", "0.0.1:x@5", "0.0.1:5@-1", "open@3"] {
            assert!(bad.parse::<Fault>().is_err(), "{bad}");
        }
    }

    #[test]
    fn schedule_list() {
        let schedule = FaultSchedule::parse(&["1.0.1:1@100", "clear@500"]).unwrap();
        assert_eq!(schedule.faults().len(), 2);
        assert_eq!(
            schedule,
            FaultSchedule::new()
                .set_failure(100, PositionLabel::aggregation(1, 0), 1)
                .clear_failure(500)
        );
        assert!(FaultSchedule::parse(&["bad"]).is_err());
    }
}
