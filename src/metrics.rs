use std::{sync::Once, time::Instant};

use metrics::{describe_counter, Histogram};

/// Describe a timer. Shorthand for `describe_histogram!(name, Unit::Seconds,
/// description)` so you don't have to remember what units timers are in.
macro_rules! describe_timer {
    ($name:expr, $description:expr $(,)?) => {{
        ::metrics::describe_histogram!($name, ::metrics::Unit::Seconds, $description)
    }};
}

/// Creates a timer that runs until it goes out of scope. Timed values are
/// tracked with a metrics histogram and assumes that durations are recorded as
/// an f64 number of seconds.
macro_rules! scoped_timer {
    ($name:expr $(, $label_key:expr $(=> $label_value:expr)?)* $(,)?) => {{
        let hist = ::metrics::histogram!($name $(, $label_key $(=> $label_value)?)*);
        crate::metrics::TimerGuard::new_at(hist, std::time::Instant::now())
    }};
}
pub(crate) use scoped_timer;

/// Describe every metric this crate emits. Safe to call more than once.
///
/// Nothing here installs a recorder. Services that embed the decoder install
/// their own exporter, and without one every metric is a no-op.
pub fn describe_metrics() {
    static DESCRIBED: Once = Once::new();

    DESCRIBED.call_once(|| {
        describe_timer!("decode_time", "Time to decode a config dump (seconds)");
        describe_counter!(
            "decode.skipped",
            "The number of resources dropped because they failed to decode",
        );
        describe_counter!(
            "decode.unknown_sections",
            "The number of config dump sections with an unrecognized type",
        );
    });
}

/// An RAII timer guard that records its duration on drop.
///
/// Created with [scoped_timer].
pub(crate) struct TimerGuard {
    hist: Histogram,
    started_at: Instant,
}

impl TimerGuard {
    pub(crate) fn new_at(hist: Histogram, started_at: Instant) -> Self {
        Self { hist, started_at }
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.hist.record(self.started_at.elapsed().as_secs_f64());
    }
}
