//! Spawn immunity window.
//!
//! Armed as the last step of entry processing and expires by tick comparison
//! alone. The caller always passes the current tick in, so nothing here reads
//! a clock.

use crate::config::BlockPolicy;
use crate::damage::DamageEvent;
use crate::Tick;
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    /// Damage, knockback and side effects are dropped before they apply.
    Block,
}

/// Receives the fading cue while the window is active.
pub trait ImmunityCue {
    fn glow(&mut self, intensity: f32);
}

/// Cue that only traces the intensity; used by the headless client.
pub struct LogCue;

impl ImmunityCue for LogCue {
    fn glow(&mut self, intensity: f32) {
        log::trace!("Spawn immunity glow {:.2}", intensity);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImmunityWindow {
    expires_at: Tick,
    total: Tick,
}

impl ImmunityWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Duration is clamped to one tick so a hit in the arming tick is covered.
    pub fn arm(&mut self, now: Tick, duration: Tick) {
        let duration = duration.max(1);
        self.expires_at = now.saturating_add(duration);
        self.total = duration;
        debug!("Spawn immunity armed until tick {}", self.expires_at);
    }

    pub fn is_active(&self, now: Tick) -> bool {
        now < self.expires_at
    }

    pub fn expires_at(&self) -> Tick {
        self.expires_at
    }

    pub fn remaining(&self, now: Tick) -> Tick {
        self.expires_at.saturating_sub(now)
    }

    /// Fraction of the window left, 0.0 when inactive.
    pub fn intensity(&self, now: Tick) -> f32 {
        if self.total == 0 || !self.is_active(now) {
            return 0.0;
        }
        (self.remaining(now) as f32 / self.total as f32).min(1.0)
    }

    /// Ends the window immediately. Not part of the normal entry flow.
    pub fn cancel(&mut self, now: Tick) {
        self.expires_at = self.expires_at.min(now);
    }

    pub fn emit_cue(&self, now: Tick, cue: &mut dyn ImmunityCue) {
        if self.is_active(now) {
            cue.glow(self.intensity(now));
        }
    }

    pub fn intercept(&self, now: Tick, event: &DamageEvent, policy: &BlockPolicy) -> Verdict {
        if !self.is_active(now) {
            return Verdict::Allow;
        }

        let category = event.category();
        if policy.blocks(category) {
            debug!(
                "Spawn immunity blocked {:?} damage ({} remaining ticks)",
                category,
                self.remaining(now)
            );
            Verdict::Block
        } else {
            Verdict::Allow
        }
    }
}
