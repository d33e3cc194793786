//! Escape/regeneration round state machine

use log::{debug, info};

/// Externally visible round status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundStatus {
    Active,
    Escaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Round in progress. `reported` is set once this client has announced its own escape.
    Active { reported: bool },
    Escaped,
}

/// Drives `Active -> Escaped -> Active` for the lifetime of a session.
#[derive(Debug)]
pub struct RoundController {
    phase: Phase,
    round: u32,
    last_contact: bool,
}

impl RoundController {
    pub fn new() -> Self {
        Self {
            phase: Phase::Active { reported: false },
            round: 1,
            last_contact: false,
        }
    }

    pub fn status(&self) -> RoundStatus {
        match self.phase {
            Phase::Active { .. } => RoundStatus::Active,
            Phase::Escaped => RoundStatus::Escaped,
        }
    }

    /// Current round number, starting at 1.
    pub fn round(&self) -> u32 {
        self.round
    }

    /// Records that somebody escaped. Returns false if the round was already over.
    pub fn mark_escaped(&mut self) -> bool {
        if self.phase == Phase::Escaped {
            debug!("Round {} already escaped", self.round);
            return false;
        }
        self.phase = Phase::Escaped;
        info!("Round {} escaped", self.round);
        true
    }

    /// Starts a new round regardless of the current phase.
    pub fn reset(&mut self) {
        self.phase = Phase::Active { reported: false };
        self.round += 1;
        self.last_contact = false;
        info!("Round {} started", self.round);
    }

    /// Feeds one tick of gate contact for the local player.
    ///
    /// Returns true exactly once per round: on the first rising edge seen
    /// while the round is active and unreported.
    pub fn observe_gate_contact(&mut self, contact: bool) -> bool {
        let rising = contact && !self.last_contact;
        self.last_contact = contact;

        match self.phase {
            Phase::Active { reported: false } if rising => {
                self.phase = Phase::Active { reported: true };
                true
            }
            _ => false,
        }
    }

    pub fn escape_reported(&self) -> bool {
        matches!(self.phase, Phase::Active { reported: true })
    }
}

impl Default for RoundController {
    fn default() -> Self {
        Self::new()
    }
}
