//! One-shot arrival notification gate
//!
//! The gate fires once when the ETA enters the notification window and stays
//! quiet for as long as the ETA dwells inside it. Only a tick with the ETA
//! outside the window (above, below or unavailable) arms it again.

use serde::Deserialize;
use tracing::{debug, info};

/// Open interval `(lower_seconds, upper_seconds)` of ETAs that notify
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct EtaWindow {
    pub lower_seconds: f64,
    pub upper_seconds: f64,
}

impl Default for EtaWindow {
    fn default() -> Self {
        Self {
            lower_seconds: 100.0,
            upper_seconds: 300.0,
        }
    }
}

impl EtaWindow {
    pub fn new(lower_seconds: f64, upper_seconds: f64) -> Self {
        Self {
            lower_seconds,
            upper_seconds,
        }
    }

    /// Strictly inside, bounds excluded
    pub fn contains(&self, eta_seconds: f64) -> bool {
        self.lower_seconds < eta_seconds && eta_seconds < self.upper_seconds
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Armed,
    Fired,
}

/// What the caller must do after feeding an ETA to the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// ETA just entered the window: publish one notification
    Notify,
    /// Nothing to publish
    Hold,
    /// ETA left the window, the next entry will notify again
    Rearmed,
}

#[derive(Debug, Clone)]
pub struct NotificationGate {
    window: EtaWindow,
    state: GateState,
}

impl NotificationGate {
    pub fn new(window: EtaWindow) -> Self {
        Self {
            window,
            state: GateState::Armed,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn window(&self) -> EtaWindow {
        self.window
    }

    /// Feed the ETA of a tick, `None` when no ETA could be computed.
    ///
    /// The transition to `Fired` happens on [`GateDecision::Notify`]
    /// regardless of whether the publish that follows succeeds.
    pub fn observe(&mut self, eta_seconds: Option<f64>) -> GateDecision {
        let inside = eta_seconds.map_or(false, |eta| self.window.contains(eta));

        match (self.state, inside) {
            (GateState::Armed, true) => {
                self.state = GateState::Fired;
                info!(eta_seconds = ?eta_seconds, "ETA entered the notification window");
                GateDecision::Notify
            }
            (GateState::Fired, false) => {
                self.state = GateState::Armed;
                debug!(eta_seconds = ?eta_seconds, "ETA left the notification window, gate re-armed");
                GateDecision::Rearmed
            }
            _ => GateDecision::Hold,
        }
    }
}
