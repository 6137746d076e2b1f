//! # Reaction Timing
//!
//! A meter needs a minimum reaction time between receiving a message and
//! being ready for the next one: 200 ms normally, 20 ms when the last letter
//! of its manufacturer code is lowercase. The client rests `1.25` times that
//! after the request and after the option-select acknowledgement.
//!
//! Waiting goes through the [`Delay`] capability so the session engine can be
//! driven in tests without real elapsed time.

use crate::constants::{REACTION_TIME, SHORT_REACTION_TIME};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Blocking wait primitive. A wait either completes in full or not at all;
/// there is no cooperative cancellation.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Production delay backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// True when the manufacturer code announces the short reaction time. Only
/// the last character matters.
pub fn uses_short_reaction_time(manufacturer: &str) -> bool {
    manufacturer
        .chars()
        .last()
        .map_or(false, |c| c.is_lowercase())
}

/// Per-session reaction-time state plus the delay used to honour it.
#[derive(Clone)]
pub struct ReactionTimer {
    short: bool,
    delay: Arc<dyn Delay>,
}

impl ReactionTimer {
    pub fn new(delay: Arc<dyn Delay>) -> Self {
        ReactionTimer {
            short: false,
            delay,
        }
    }

    /// Selects the reaction time from an identification's manufacturer code.
    pub fn select_for_manufacturer(&mut self, manufacturer: &str) {
        self.short = uses_short_reaction_time(manufacturer);
    }

    pub fn uses_short_reaction_time(&self) -> bool {
        self.short
    }

    pub fn reaction_time(&self) -> Duration {
        if self.short {
            SHORT_REACTION_TIME
        } else {
            REACTION_TIME
        }
    }

    /// `reaction_time * 1.25`
    pub fn default_rest(&self) -> Duration {
        self.reaction_time() * 5 / 4
    }

    /// Waits `duration`, or the default rest when `None`. Returns the time
    /// waited.
    pub async fn rest(&self, duration: Option<Duration>) -> Duration {
        let duration = duration.unwrap_or_else(|| self.default_rest());
        self.delay.wait(duration).await;
        duration
    }
}

impl std::fmt::Debug for ReactionTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactionTimer")
            .field("short", &self.short)
            .finish()
    }
}
