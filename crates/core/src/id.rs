//! Object id generation
//!
//! Ids are millisecond-timestamp strings with a process-wide atomic
//! increment suffix, so ids generated within the same millisecond by
//! concurrent threads never collide (up to 1000 per millisecond, after
//! which the suffix wraps and uniqueness relies on the clock advancing).
//!
//! The result is monotonic-ish: ids sort roughly by creation time, which
//! several callers exploit for default ordering. That property is
//! best-effort, not a guarantee.

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide sequence for the id suffix
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a new object id
///
/// Format: `<millis since epoch><3-digit sequence>`.
pub fn time_millis_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed) % 1000;
    format!("{millis}{seq:03}")
}
