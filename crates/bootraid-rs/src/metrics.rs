use std::sync::{Arc, OnceLock};

use crate::assembly::RaidType;

/// A transfer against a leaf device.
#[derive(Clone, Debug)]
pub struct LeafRead {
    pub path: String,
    pub offset: u64,
    pub bytes: u64,
    pub error: bool,
}

/// A read served by a mirror, stripe or concat set.
#[derive(Copy, Clone, Debug)]
pub struct SetRead {
    pub raid_type: RaidType,
    pub bytes: u64,
    pub error: bool,
}

pub trait MetricsSink: Send + Sync + 'static {
    fn record_leaf_read(&self, op: LeafRead);
    fn record_set_read(&self, op: SetRead);
}

static METRICS_SINK: OnceLock<Arc<dyn MetricsSink>> = OnceLock::new();

pub fn install_metrics_sink(sink: Arc<dyn MetricsSink>) -> bool {
    METRICS_SINK.set(sink).is_ok()
}

pub fn is_enabled() -> bool {
    METRICS_SINK.get().is_some()
}

pub fn record_leaf_read(op: LeafRead) {
    if let Some(sink) = METRICS_SINK.get() {
        sink.record_leaf_read(op);
    }
}

pub fn record_set_read(op: SetRead) {
    if let Some(sink) = METRICS_SINK.get() {
        sink.record_set_read(op);
    }
}
