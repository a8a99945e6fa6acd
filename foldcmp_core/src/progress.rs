use foldcmp_common::ComparisonEvent;

/// Receives comparison events as they happen.
///
/// Called from verification workers while the progress lock is held, so
/// implementations should return quickly.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: &ComparisonEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ComparisonEvent) + Send + Sync,
{
    fn on_event(&self, event: &ComparisonEvent) {
        self(event)
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn on_event(&self, _event: &ComparisonEvent) {}
}
