// Progress reporting - bounded gauge forwarded to a host-shell sink
//
// The emulation core reports discrete ticks; this module normalizes them
// into a clamped (value, limit) gauge and forwards it to a pluggable sink.
// On platforms without host-shell integration the sink is a no-op.

/// Destination for normalized progress updates
///
/// One implementation forwards (value, limit) raw; another converts to a
/// debounced 0-100 percentage; the null sink silently degrades when no
/// platform integration exists.
pub trait ProgressSink {
    /// Publish the current gauge
    fn publish(&mut self, value: u32, limit: u32);

    /// Hide/clear the gauge after a reset
    fn clear(&mut self) {}
}

/// Silent degradation for platforms without a progress API
#[derive(Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn publish(&mut self, _value: u32, _limit: u32) {}
}

/// Forwards (value, limit) pairs unmodified to a callback
///
/// The callback is the seam to the concrete host-shell integration, which
/// is an external collaborator.
pub struct CallbackSink<F: FnMut(u32, u32)> {
    callback: F,
}

impl<F: FnMut(u32, u32)> CallbackSink<F> {
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F: FnMut(u32, u32)> ProgressSink for CallbackSink<F> {
    fn publish(&mut self, value: u32, limit: u32) {
        (self.callback)(value, limit);
    }
}

/// Converts updates to a 0-100 percentage and forwards only on change
///
/// Debounces the stream so a chatty emulation core cannot flood the host
/// shell with updates.
pub struct PercentSink<S: ProgressSink> {
    inner: S,
    last_percent: Option<u32>,
}

impl<S: ProgressSink> PercentSink<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            last_percent: None,
        }
    }
}

impl<S: ProgressSink> ProgressSink for PercentSink<S> {
    fn publish(&mut self, value: u32, limit: u32) {
        let percent = (u64::from(value) * 100 / u64::from(limit.max(1))) as u32;
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            self.inner.publish(percent, 100);
        }
    }

    fn clear(&mut self) {
        self.last_percent = None;
        self.inner.clear();
    }
}

/// Normalizes discrete progress ticks into a bounded gauge
///
/// Maintains the invariant 0 ≤ value ≤ limit, limit ≥ 1; every mutation
/// clamps and then forwards to the sink.
pub struct ProgressReporter {
    value: u32,
    limit: u32,
    default_limit: u32,
    sink: Box<dyn ProgressSink>,
}

impl ProgressReporter {
    /// Create a reporter with the given default maximum (the configurable
    /// gauge max, 100 by default) and sink
    pub fn new(default_limit: u32, sink: Box<dyn ProgressSink>) -> Self {
        let default_limit = default_limit.max(1);
        Self {
            value: 0,
            limit: default_limit,
            default_limit,
            sink,
        }
    }

    /// Current (value, limit) pair
    pub fn progress(&self) -> (u32, u32) {
        (self.value, self.limit)
    }

    /// Zero the gauge; with `reset_limit` also restore the default maximum
    pub fn progress_reset(&mut self, reset_limit: bool) {
        self.value = 0;
        if reset_limit {
            self.limit = self.default_limit;
        }
        self.sink.clear();
    }

    /// Rescale the valid range, re-clamping the current value
    pub fn progress_set_limit(&mut self, limit: u32) {
        self.limit = limit.max(1);
        self.value = self.value.min(self.limit);
        self.sink.publish(self.value, self.limit);
    }

    /// Set the gauge to an absolute value, clamped into [0, limit]
    pub fn progress_set_value(&mut self, value: u32) {
        self.value = value.min(self.limit);
        self.sink.publish(self.value, self.limit);
    }

    /// Advance the gauge by a signed delta, clamped into [0, limit]
    pub fn progress_increment(&mut self, delta: i32) {
        let value = i64::from(self.value) + i64::from(delta);
        self.value = value.clamp(0, i64::from(self.limit)) as u32;
        self.sink.publish(self.value, self.limit);
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("value", &self.value)
            .field("limit", &self.limit)
            .field("default_limit", &self.default_limit)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_reporter(default_limit: u32) -> (ProgressReporter, Rc<RefCell<Vec<(u32, u32)>>>) {
        let published = Rc::new(RefCell::new(Vec::new()));
        let sink_log = Rc::clone(&published);
        let reporter = ProgressReporter::new(
            default_limit,
            Box::new(CallbackSink::new(move |value, limit| {
                sink_log.borrow_mut().push((value, limit));
            })),
        );
        (reporter, published)
    }

    #[test]
    fn test_value_always_clamped() {
        let (mut reporter, published) = recording_reporter(100);

        reporter.progress_set_value(250);
        assert_eq!(reporter.progress(), (100, 100));

        reporter.progress_increment(-500);
        assert_eq!(reporter.progress(), (0, 100));

        reporter.progress_increment(42);
        assert_eq!(reporter.progress(), (42, 100));

        for &(value, limit) in published.borrow().iter() {
            assert!(value <= limit);
        }
    }

    #[test]
    fn test_reset_semantics() {
        let (mut reporter, _published) = recording_reporter(100);

        reporter.progress_set_limit(500);
        reporter.progress_set_value(300);

        // reset(false) zeroes the value but keeps the limit
        reporter.progress_reset(false);
        assert_eq!(reporter.progress(), (0, 500));

        // reset(true) also restores the default limit
        reporter.progress_set_value(123);
        reporter.progress_reset(true);
        assert_eq!(reporter.progress(), (0, 100));
    }

    #[test]
    fn test_shrinking_limit_reclamps_value() {
        let (mut reporter, _published) = recording_reporter(100);
        reporter.progress_set_value(80);
        reporter.progress_set_limit(50);
        assert_eq!(reporter.progress(), (50, 50));
    }

    #[test]
    fn test_limit_zero_is_raised_to_one() {
        let (mut reporter, _published) = recording_reporter(0);
        assert_eq!(reporter.progress(), (0, 1));
        reporter.progress_set_limit(0);
        assert_eq!(reporter.progress(), (0, 1));
    }

    #[test]
    fn test_percent_sink_debounces() {
        let published = Rc::new(RefCell::new(Vec::new()));
        let sink_log = Rc::clone(&published);
        let mut sink = PercentSink::new(CallbackSink::new(move |value, limit| {
            sink_log.borrow_mut().push((value, limit));
        }));

        // 1000-step job: many updates collapse to one per percent
        for step in 0..=1000u32 {
            sink.publish(step, 1000);
        }

        let seen = published.borrow();
        assert_eq!(seen.len(), 101);
        assert_eq!(seen.first(), Some(&(0, 100)));
        assert_eq!(seen.last(), Some(&(100, 100)));
    }

    #[test]
    fn test_percent_sink_clear_republishes() {
        let published = Rc::new(RefCell::new(Vec::new()));
        let sink_log = Rc::clone(&published);
        let mut sink = PercentSink::new(CallbackSink::new(move |value, limit| {
            sink_log.borrow_mut().push((value, limit));
        }));

        sink.publish(50, 100);
        sink.publish(50, 100);
        assert_eq!(published.borrow().len(), 1);

        sink.clear();
        sink.publish(50, 100);
        assert_eq!(published.borrow().len(), 2);
    }

    #[test]
    fn test_null_sink_reporter_still_clamps() {
        let mut reporter = ProgressReporter::new(100, Box::new(NullSink));
        reporter.progress_increment(1000);
        assert_eq!(reporter.progress(), (100, 100));
    }
}
