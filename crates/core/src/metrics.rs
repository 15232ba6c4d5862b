//! Metrics emitted by the streamer.

/// Container for streamer metric names and recorders.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const SEQUENCE_NUMBER: &'static str = "streamer_sequence_number";
    pub(crate) const SEQUENCE_NUMBER_IN_BLOCK: &'static str = "streamer_sequence_number_in_block";

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_gauge!(
            Self::SEQUENCE_NUMBER,
            metrics::Unit::Count,
            "Total number of messages committed to the streamer's log",
        );

        metrics::describe_gauge!(
            Self::SEQUENCE_NUMBER_IN_BLOCK,
            metrics::Unit::Count,
            "Number of messages materialized into blocks",
        );
    }

    fn zero() {
        metrics::gauge!(Self::SEQUENCE_NUMBER).set(0.0);
        metrics::gauge!(Self::SEQUENCE_NUMBER_IN_BLOCK).set(0.0);
    }

    /// Records the committed message count after a successful batch.
    pub(crate) fn record_message_count(count: u64) {
        metrics::gauge!(Self::SEQUENCE_NUMBER).set(count as f64);
    }

    /// Records the message position most recently materialized into a block.
    pub(crate) fn record_message_in_block(pos: u64) {
        metrics::gauge!(Self::SEQUENCE_NUMBER_IN_BLOCK).set(pos as f64);
    }
}
