//! Timeline duration reconciliation.
//!
//! Duration is never stored authoritatively. It is derived from the
//! current clip set whenever it is read, so the edit engine and the
//! graph compiler always see the same value for the same clips.

use crate::timeline::Clip;

/// Duration reported for a timeline with no clips.
pub const DEFAULT_TIMELINE_DURATION: f64 = 150.0;

/// Floor applied to any non-empty timeline.
pub const MIN_TIMELINE_DURATION: f64 = 5.0;

/// Round to the nearest tenth of a second.
pub fn round_to_tenth(secs: f64) -> f64 {
    (secs * 10.0).round() / 10.0
}

/// `max(5, round10(max end_time))`, or the default span when empty.
pub fn reconcile_duration<'a>(clips: impl IntoIterator<Item = &'a Clip>) -> f64 {
    let max_end = clips
        .into_iter()
        .map(|clip| clip.end_time)
        .fold(None, |acc: Option<f64>, end| {
            Some(acc.map_or(end, |current| current.max(end)))
        });

    match max_end {
        Some(end) => round_to_tenth(end).max(MIN_TIMELINE_DURATION),
        None => DEFAULT_TIMELINE_DURATION,
    }
}
