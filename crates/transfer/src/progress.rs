//! Progress percentage computation and emission.

use std::sync::atomic::{AtomicI16, Ordering};

use crate::range::ByteRange;

/// Callback invoked with whole-number upload percentages in `[0, 100]`.
pub type ProgressFn<'a> = dyn Fn(u8) + Send + Sync + 'a;

/// Emits a strictly increasing percentage sequence for one upload.
///
/// The strategies feed raw values (completed ranges, read offsets); the
/// reporter scales and rounds them and suppresses duplicates, so an
/// observer always sees a monotonic sequence ending at 100 on success.
pub struct ProgressReporter<'a> {
    callback: Option<&'a ProgressFn<'a>>,
    total: u64,
    last: AtomicI16,
}

impl<'a> ProgressReporter<'a> {
    /// Creates a reporter for a payload of `total` bytes.
    pub fn new(callback: Option<&'a ProgressFn<'a>>, total: u64) -> Self {
        Self {
            callback,
            total,
            last: AtomicI16::new(-1),
        }
    }

    /// Marks the start of an upload (0%).
    pub fn started(&self) {
        self.emit(0);
    }

    /// Reports a completed range: `round(max / total * 100)`, with the
    /// range's inclusive max offset.
    pub fn range_complete(&self, range: ByteRange) {
        self.emit(percent(range.max, self.total, 100.0));
    }

    /// Reports buffering progress, scaled into the `[0, 50]` band.
    pub fn read_progress(&self, loaded: u64) {
        self.emit(percent(loaded, self.total, 50.0));
    }

    /// Emits the terminal 100% unless it has already been reported.
    pub fn finished(&self) {
        self.emit(100);
    }

    fn emit(&self, value: u8) {
        let Some(callback) = self.callback else {
            return;
        };
        let value = value.min(100);
        if self.last.fetch_max(i16::from(value), Ordering::Relaxed) < i16::from(value) {
            callback(value);
        }
    }
}

fn percent(part: u64, total: u64, scale: f64) -> u8 {
    if total == 0 {
        return 0;
    }
    (part as f64 / total as f64 * scale).round().min(100.0) as u8
}
