//! Debug output gate and sink.
//!
//! The gate decides, once per emission attempt, whether a diagnostic is shown:
//!
//! | pending     | silent by default | result                     |
//! |-------------|-------------------|----------------------------|
//! | `MuteOnce`  | any               | suppressed, pending reset  |
//! | `TalkOnce`  | any               | emitted, pending reset     |
//! | `None`      | yes               | suppressed                 |
//! | `None`      | no                | emitted                    |
//!
//! A gate belongs to one call; only the silent-by-default flag is shared.

use std::sync::Arc;

/// One-shot override on top of the default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Override {
    #[default]
    None,
    /// Show the next emission even when silent by default
    TalkOnce,
    /// Suppress the next emission even when talkative by default
    MuteOnce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugGate {
    silent_by_default: bool,
    pending: Override,
}

impl DebugGate {
    pub fn new(silent_by_default: bool) -> Self {
        Self {
            silent_by_default,
            pending: Override::None,
        }
    }

    pub fn pending(&self) -> Override {
        self.pending
    }

    /// Show the next emission regardless of the default
    pub fn speak(&mut self) {
        self.pending = Override::TalkOnce;
    }

    /// Suppress the next emission regardless of the default
    pub fn quiet(&mut self) {
        self.pending = Override::MuteOnce;
    }

    /// Consume one emission attempt, returning whether it may be shown
    pub fn admit(&mut self) -> bool {
        match self.pending {
            Override::MuteOnce => {
                self.pending = Override::None;
                false
            }
            Override::None if self.silent_by_default => false,
            Override::None | Override::TalkOnce => {
                self.pending = Override::None;
                true
            }
        }
    }

    /// Errors speak up unless a mute-once is pending
    pub fn admit_error(&mut self) -> bool {
        if self.pending != Override::MuteOnce {
            self.speak();
        }
        self.admit()
    }
}

/// Flavor of a diagnostic line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Statement dump (raw template, inputs, prepared statement)
    Statement,
    Success,
    Error,
}

/// Where admitted diagnostics go
pub trait DebugSink: Send + Sync {
    fn emit(&self, tone: Tone, message: &str);
}

/// Default sink: forwards to `tracing` under the `dbkit::statement` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DebugSink for TracingSink {
    fn emit(&self, tone: Tone, message: &str) {
        match tone {
            Tone::Statement => tracing::debug!(target: "dbkit::statement", "{message}"),
            Tone::Success => tracing::info!(target: "dbkit::statement", "{message}"),
            Tone::Error => tracing::error!(target: "dbkit::statement", "{message}"),
        }
    }
}

impl<T: DebugSink + ?Sized> DebugSink for Arc<T> {
    fn emit(&self, tone: Tone, message: &str) {
        (**self).emit(tone, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn talkative_default_emits_every_time() {
        let mut gate = DebugGate::new(false);
        assert!(gate.admit());
        assert!(gate.admit());
    }

    #[test]
    fn silent_default_suppresses() {
        let mut gate = DebugGate::new(true);
        assert!(!gate.admit());
    }

    #[test]
    fn talk_once_overrides_silence_for_one_emission() {
        let mut gate = DebugGate::new(true);
        gate.speak();
        assert!(gate.admit());
        assert_eq!(gate.pending(), Override::None);
        assert!(!gate.admit());
    }

    #[test]
    fn mute_once_overrides_talkative_for_one_emission() {
        let mut gate = DebugGate::new(false);
        gate.quiet();
        assert!(!gate.admit());
        assert!(gate.admit());
    }

    #[test]
    fn mute_once_is_consumed_even_when_silent() {
        let mut gate = DebugGate::new(true);
        gate.quiet();
        assert!(!gate.admit());
        assert_eq!(gate.pending(), Override::None);
    }

    #[test]
    fn latest_override_wins() {
        let mut gate = DebugGate::new(true);
        gate.quiet();
        gate.speak();
        assert!(gate.admit());
    }

    #[test]
    fn errors_speak_through_silence_but_not_mute() {
        let mut gate = DebugGate::new(true);
        assert!(gate.admit_error());

        gate.quiet();
        assert!(!gate.admit_error());
        assert!(gate.admit_error());
    }
}
