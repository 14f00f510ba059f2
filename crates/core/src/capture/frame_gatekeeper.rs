use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::capture::domain::sample_buffer::SampleBuffer;
use crate::shared::constants::DEFAULT_COOLDOWN;
use crate::shared::frame::Frame;

/// How the gatekeeper updates its last-accepted timestamp.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CooldownMode {
    /// Re-arm the cooldown every time a frame is produced.
    #[default]
    Rearm,
    /// Never re-arm: after initialization every frame passes the cooldown.
    Literal,
}

/// Result of offering one sample to the gatekeeper.
#[derive(Debug)]
pub enum Admission {
    Accepted(Frame),
    /// Arrived before the cooldown elapsed.
    Throttled,
    /// Passed the cooldown but carried no convertible pixels.
    Unconvertible,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GatekeeperStats {
    pub accepted: u64,
    pub throttled: u64,
    pub unconvertible: u64,
}

/// Rate-limits a frame stream and converts accepted samples into frames.
///
/// Assumes a single producer delivering samples serially.
pub struct FrameGatekeeper {
    cooldown: Duration,
    mode: CooldownMode,
    last_accepted: Option<Duration>,
    stats: GatekeeperStats,
}

impl FrameGatekeeper {
    pub fn new(cooldown: Duration, mode: CooldownMode) -> Self {
        Self {
            cooldown,
            mode,
            last_accepted: None,
            stats: GatekeeperStats::default(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn mode(&self) -> CooldownMode {
        self.mode
    }

    pub fn stats(&self) -> GatekeeperStats {
        self.stats
    }

    /// Returns a frame when the cooldown has elapsed and the sample converts.
    ///
    /// A timestamp earlier than the last accepted one counts as zero elapsed
    /// time. Conversion failures are dropped silently and do not re-arm.
    pub fn on_frame(&mut self, sample: &SampleBuffer, timestamp: Duration) -> Option<Frame> {
        match self.admit(sample, timestamp) {
            Admission::Accepted(frame) => Some(frame),
            Admission::Throttled | Admission::Unconvertible => None,
        }
    }

    /// Like [`FrameGatekeeper::on_frame`], but says why a sample was dropped.
    pub fn admit(&mut self, sample: &SampleBuffer, timestamp: Duration) -> Admission {
        if !self.cooldown_elapsed(timestamp) {
            self.stats.throttled += 1;
            return Admission::Throttled;
        }

        let Some(frame) = sample.pixel_buffer().and_then(|pb| pb.to_frame(timestamp)) else {
            self.stats.unconvertible += 1;
            return Admission::Unconvertible;
        };

        if self.mode == CooldownMode::Rearm {
            self.last_accepted = Some(timestamp);
        }
        self.stats.accepted += 1;
        Admission::Accepted(frame)
    }

    fn cooldown_elapsed(&self, timestamp: Duration) -> bool {
        match self.last_accepted {
            None => true,
            Some(last) => timestamp.saturating_sub(last) >= self.cooldown,
        }
    }
}

impl Default for FrameGatekeeper {
    fn default() -> Self {
        Self::new(DEFAULT_COOLDOWN, CooldownMode::default())
    }
}
