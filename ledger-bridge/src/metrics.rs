//! Prometheus metrics for ledger operations

use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, HistogramVec, IntCounter, IntGauge,
};

lazy_static::lazy_static! {
    /// Network round-trips by operation and outcome
    pub static ref LEDGER_REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "ledger_bridge_requests_total",
        "Total ledger network requests",
        &["operation", "status"]
    )
    .unwrap();

    /// Network round-trip latency
    pub static ref LEDGER_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "ledger_bridge_request_duration_seconds",
        "Ledger network request duration in seconds",
        &["operation"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap();

    /// Connections opened since process start
    pub static ref CONNECTIONS_OPENED: IntCounter = register_int_counter!(
        "ledger_bridge_connections_opened_total",
        "Ledger connections opened"
    )
    .unwrap();

    /// 1 while a connection is cached
    pub static ref CONNECTION_ACTIVE: IntGauge = register_int_gauge!(
        "ledger_bridge_connection_active",
        "Whether a ledger connection is currently cached"
    )
    .unwrap();

    /// Topics created by this process
    pub static ref TOPICS_CREATED: IntCounter = register_int_counter!(
        "ledger_bridge_topics_created_total",
        "Consensus topics created on demand"
    )
    .unwrap();

    /// File chunks written (creation chunk included)
    pub static ref FILE_CHUNKS_WRITTEN: IntCounter = register_int_counter!(
        "ledger_bridge_file_chunks_written_total",
        "File chunks written to file storage"
    )
    .unwrap();

    /// Reward tokens transferred
    pub static ref REWARD_UNITS_TRANSFERRED: IntCounter = register_int_counter!(
        "ledger_bridge_reward_units_transferred_total",
        "Reward token units transferred to responders"
    )
    .unwrap();
}
