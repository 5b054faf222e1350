// Prometheus metrics definitions for the darts backend.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Games currently in progress.
    pub static ref ACTIVE_GAMES: IntGauge =
        IntGauge::new("darts_active_games", "Games currently in progress").unwrap();

    /// Entries in the per-game lock registry.
    pub static ref LOCK_REGISTRY_SIZE: IntGauge =
        IntGauge::new("darts_lock_registry_size", "Per-game locks currently registered").unwrap();

    /// Live WebSocket connections.
    pub static ref CONNECTED_WEBSOCKETS: IntGauge =
        IntGauge::new("darts_connected_websockets", "Live WebSocket connections").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Total games started, by game type.
    pub static ref GAMES_STARTED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("darts_games_started_total", "Total games started"),
        &["game_type"],
    )
    .unwrap();

    /// Total games won, by game type.
    pub static ref GAMES_COMPLETED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("darts_games_completed_total", "Total games completed"),
        &["game_type"],
    )
    .unwrap();

    /// Total games ended without a winner, by game type.
    pub static ref GAMES_ABANDONED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("darts_games_abandoned_total", "Total games abandoned"),
        &["game_type"],
    )
    .unwrap();

    /// Throws accepted, by player type.
    pub static ref THROWS_REGISTERED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("darts_throws_registered_total", "Throws accepted"),
        &["player_type"],
    )
    .unwrap();

    /// Throws refused, by error kind.
    pub static ref THROWS_REJECTED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("darts_throws_rejected_total", "Throws rejected"),
        &["kind"],
    )
    .unwrap();

    /// Darts produced by the bot simulator.
    pub static ref BOT_DARTS_SIMULATED_TOTAL: IntCounter = IntCounter::new(
        "darts_bot_darts_simulated_total",
        "Darts produced by the bot simulator",
    )
    .unwrap();

    /// Total API requests, by method/endpoint/status.
    pub static ref API_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("darts_api_requests_total", "Total API requests"),
        &["method", "endpoint", "status"],
    )
    .unwrap();

    /// Total WebSocket messages sent to clients.
    pub static ref WEBSOCKET_MESSAGES_SENT_TOTAL: IntCounter = IntCounter::new(
        "darts_websocket_messages_sent_total",
        "Total WebSocket messages sent",
    )
    .unwrap();

    // ── Histograms ───────────────────────────────────────────────────

    /// Time to replay a throw log into engine state, in milliseconds.
    pub static ref REPLAY_DURATION_MS: Histogram = Histogram::with_opts(
        HistogramOpts::new("darts_replay_duration_ms", "Engine replay time in ms")
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 25.0]),
    )
    .unwrap();

    /// Time spent waiting for a per-game lock, in milliseconds.
    pub static ref LOCK_WAIT_MS: Histogram = Histogram::with_opts(
        HistogramOpts::new("darts_lock_wait_ms", "Per-game lock wait time in ms")
            .buckets(vec![0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0]),
    )
    .unwrap();
}

/// Register all metrics with the custom registry. Safe to call more than
/// once; later registrations of the same collector are ignored.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ACTIVE_GAMES.clone()),
        Box::new(LOCK_REGISTRY_SIZE.clone()),
        Box::new(CONNECTED_WEBSOCKETS.clone()),
        Box::new(GAMES_STARTED_TOTAL.clone()),
        Box::new(GAMES_COMPLETED_TOTAL.clone()),
        Box::new(GAMES_ABANDONED_TOTAL.clone()),
        Box::new(THROWS_REGISTERED_TOTAL.clone()),
        Box::new(THROWS_REJECTED_TOTAL.clone()),
        Box::new(BOT_DARTS_SIMULATED_TOTAL.clone()),
        Box::new(API_REQUESTS_TOTAL.clone()),
        Box::new(WEBSOCKET_MESSAGES_SENT_TOTAL.clone()),
        Box::new(REPLAY_DURATION_MS.clone()),
        Box::new(LOCK_WAIT_MS.clone()),
    ];

    for c in collectors {
        if let Err(e) = REGISTRY.register(c) {
            tracing::debug!("metric not registered: {e}");
        }
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {e}");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Normalize a URL path for metric labels: replace numeric and UUID path
/// segments with `:id` to prevent cardinality explosion.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if segment.parse::<i64>().is_ok() || uuid::Uuid::parse_str(segment).is_ok() {
                ":id"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
