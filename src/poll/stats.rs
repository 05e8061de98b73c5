// src/poll/stats.rs
//! Poll statistics events and the synthetic throughput signal.

use serde::Serialize;
use std::time::Duration;

pub const SIGNAL_FLOOR: u32 = 7;
pub const SIGNAL_CEILING: u32 = 59;

/// Statistics event emitted on a fixed cadence, independent of call cadence.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsEvent {
    pub attempts: u64,
    /// Synthetic liveness indicator, see [`throughput_signal`]
    pub throughput_signal: u32,
}

/// UI-facing liveness indicator in `[SIGNAL_FLOOR, SIGNAL_CEILING]`.
///
/// This is a sine wave over elapsed wall-clock time with a little jitter,
/// not a measured query rate. It only tells an observer that the loop is
/// alive and how long it has been running, so do not tune anything against
/// it.
pub fn throughput_signal(elapsed: Duration) -> u32 {
    let t = elapsed.as_secs_f64();
    let wave = (t / 9.0).sin();
    let base = 33.0 + 24.0 * wave;
    let jitter = fastrand::i32(-2..=2);
    ((base.round() as i32) + jitter).clamp(SIGNAL_FLOOR as i32, SIGNAL_CEILING as i32) as u32
}
