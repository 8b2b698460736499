use biometrics::{Collector, Counter, Moments};

pub(crate) static CLIENT_REQUESTS: Counter = Counter::new("loquax.client.requests");
pub(crate) static CLIENT_REQUEST_ERRORS: Counter = Counter::new("loquax.client.request_errors");

pub(crate) static TURNS: Counter = Counter::new("loquax.session.turns");
pub(crate) static TURN_ERRORS: Counter = Counter::new("loquax.session.turn_errors");
pub(crate) static TURN_DURATION: Moments = Moments::new("loquax.session.turn_duration_seconds");
pub(crate) static STREAM_CHUNKS: Counter = Counter::new("loquax.session.stream_chunks");
pub(crate) static CALLBACK_ERRORS: Counter = Counter::new("loquax.session.callback_errors");
pub(crate) static ERROR_HOOK_FAILURES: Counter =
    Counter::new("loquax.session.error_hook_failures");

pub(crate) static LOOP_POLLS: Counter = Counter::new("loquax.continuous.polls");
pub(crate) static LOOP_TURNS: Counter = Counter::new("loquax.continuous.turns");
pub(crate) static LOOP_LISTEN_ERRORS: Counter = Counter::new("loquax.continuous.listen_errors");

pub(crate) static PROXY_REQUESTS: Counter = Counter::new("loquax.proxy.requests");
pub(crate) static PROXY_REJECTED_MODELS: Counter = Counter::new("loquax.proxy.rejected_models");
pub(crate) static PROXY_BACKEND_ERRORS: Counter = Counter::new("loquax.proxy.backend_errors");
pub(crate) static PROXY_CHUNKS: Counter = Counter::new("loquax.proxy.chunks");

/// Register this crate's biometrics with the provided collector.
pub fn register_biometrics(collector: Collector) {
    collector.register_counter(&CLIENT_REQUESTS);
    collector.register_counter(&CLIENT_REQUEST_ERRORS);

    collector.register_counter(&TURNS);
    collector.register_counter(&TURN_ERRORS);
    collector.register_moments(&TURN_DURATION);
    collector.register_counter(&STREAM_CHUNKS);
    collector.register_counter(&CALLBACK_ERRORS);
    collector.register_counter(&ERROR_HOOK_FAILURES);

    collector.register_counter(&LOOP_POLLS);
    collector.register_counter(&LOOP_TURNS);
    collector.register_counter(&LOOP_LISTEN_ERRORS);

    collector.register_counter(&PROXY_REQUESTS);
    collector.register_counter(&PROXY_REJECTED_MODELS);
    collector.register_counter(&PROXY_BACKEND_ERRORS);
    collector.register_counter(&PROXY_CHUNKS);
}
