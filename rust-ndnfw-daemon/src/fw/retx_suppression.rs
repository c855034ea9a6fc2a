//! Exponential suppression of Interest retransmissions.
//!
//! Forwarding the same pending Interest to the same upstream is allowed
//! again only after a per-upstream window has passed; each allowed
//! retransmission doubles the window up to a cap. The window state rides on
//! the PIT entry as strategy info.

use crate::face::FaceId;
use crate::fw::strategy::{RetxSuppressionInfo, StrategyInfo};
use crate::table::pit::PitEntry;
use std::time::{Duration, Instant};

pub const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(10);
pub const DEFAULT_MULTIPLIER: u32 = 2;
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetxSuppressionResult {
    /// First transmission toward this upstream.
    New,
    /// A retransmission outside the window; forwarding is allowed.
    Forward,
    /// Within the window; do not forward.
    Suppress,
}

#[derive(Debug, Clone)]
pub struct RetxSuppressionExponential {
    initial_interval: Duration,
    multiplier: u32,
    max_interval: Duration,
}

impl RetxSuppressionExponential {
    pub fn new() -> Self {
        Self {
            initial_interval: DEFAULT_INITIAL_INTERVAL,
            multiplier: DEFAULT_MULTIPLIER,
            max_interval: DEFAULT_MAX_INTERVAL,
        }
    }

    pub fn with_parameters(
        initial_interval: Duration,
        multiplier: u32,
        max_interval: Duration,
    ) -> Self {
        Self {
            initial_interval,
            multiplier,
            max_interval,
        }
    }

    /// Decides whether the entry may be forwarded to `egress` at `now`,
    /// updating the window state on the entry.
    pub fn decide(&self, now: Instant, entry: &mut PitEntry, egress: FaceId) -> RetxSuppressionResult {
        let last_sent = match entry.out_record_of(egress) {
            Some(record) => record.last_renewed,
            None => return RetxSuppressionResult::New,
        };

        let info = match entry
            .strategy_info
            .get_or_insert_with(|| StrategyInfo::RetxSuppression(RetxSuppressionInfo::default()))
        {
            StrategyInfo::RetxSuppression(info) => info,
        };
        let interval = info
            .intervals
            .entry(egress)
            .or_insert(self.initial_interval);

        if now < last_sent + *interval {
            return RetxSuppressionResult::Suppress;
        }

        *interval = (*interval * self.multiplier).min(self.max_interval);
        RetxSuppressionResult::Forward
    }
}

impl Default for RetxSuppressionExponential {
    fn default() -> Self {
        Self::new()
    }
}
