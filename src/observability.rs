use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("coporties.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("coporties.client.request_errors");
pub(crate) static CLIENT_REQUEST_DURATION: Moments =
    Moments::new("coporties.client.request_duration_seconds");

pub(crate) static STREAM_CHUNKS: Counter = Counter::new("coporties.stream.chunks");
pub(crate) static STREAM_ERRORS: Counter = Counter::new("coporties.stream.errors");
pub(crate) static STREAM_BYTES: Counter = Counter::new("coporties.stream.bytes");
pub(crate) static STREAM_TTFB: Moments = Moments::new("coporties.stream.ttfb_seconds");
pub(crate) static STREAM_DURATION: Moments = Moments::new("coporties.stream.duration_seconds");

pub(crate) static TURNS_COMPLETED: Counter = Counter::new("coporties.turn.completed");
pub(crate) static TURNS_FAILED: Counter = Counter::new("coporties.turn.failed");

pub(crate) static ATTACHMENTS_INGESTED: Counter =
    Counter::new("coporties.attachments.ingested");
pub(crate) static ATTACHMENTS_FAILED: Counter = Counter::new("coporties.attachments.failed");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);
    collector.register_moments(&CLIENT_REQUEST_DURATION);

    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&STREAM_ERRORS);
    collector.register_counter(&STREAM_BYTES);
    collector.register_moments(&STREAM_TTFB);
    collector.register_moments(&STREAM_DURATION);

    collector.register_counter(&TURNS_COMPLETED);
    collector.register_counter(&TURNS_FAILED);

    collector.register_counter(&ATTACHMENTS_INGESTED);
    collector.register_counter(&ATTACHMENTS_FAILED);
}
