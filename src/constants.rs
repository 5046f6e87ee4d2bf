/// Default capacity of a table subscriber's event channel (§4.1).
/// Overridable per [`crate::config::RealtimeConfig`] (§10.2).
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Capacity of an auth subscriber's one-shot result channel (§4.1, §3).
/// Fixed, not configurable, per spec.
pub const AUTH_CHANNEL_CAPACITY: usize = 1;

/// Prefix joined with the monotonic counter to form subscriber ids.
pub const SUBSCRIBER_ID_PREFIX: &str = "c";

/// Path this subsystem mounts its streaming endpoint at.
pub const REALTIME_API_PATH: &str = "api/realtime";

/// Path this subsystem mounts its liveness check at (§10.5).
pub const HEALTHCHECK_API_PATH: &str = "api/healthcheck";

pub const HEADER_PROXY_BUFFERING: &str = "X-Accel-Buffering";

pub const DOC_URL_BASE: &str = "https://docs.example.com/errors";
