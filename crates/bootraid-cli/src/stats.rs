use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bootraid_rs::RaidType;
use bootraid_rs::metrics::{LeafRead, MetricsSink, SetRead};

#[derive(Default)]
struct Counter {
    ops: AtomicU64,
    bytes: AtomicU64,
    errors: AtomicU64,
}

impl Counter {
    fn record(&self, bytes: u64, error: bool) {
        self.ops.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        if error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ops={} bytes={} errors={}",
            self.ops.load(Ordering::Relaxed),
            self.bytes.load(Ordering::Relaxed),
            self.errors.load(Ordering::Relaxed)
        )
    }
}

/// Metrics sink that totals transfers for `read --stats`.
#[derive(Default)]
pub struct ReadStats {
    leaf: Counter,
    mirror: Counter,
    stripe: Counter,
    concat: Counter,
}

impl MetricsSink for ReadStats {
    fn record_leaf_read(&self, op: LeafRead) {
        self.leaf.record(op.bytes, op.error);
    }

    fn record_set_read(&self, op: SetRead) {
        let counter = match op.raid_type {
            RaidType::Mirror => &self.mirror,
            RaidType::Stripe => &self.stripe,
            RaidType::Concat => &self.concat,
        };
        counter.record(op.bytes, op.error);
    }
}

impl fmt::Display for ReadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "leaf reads: {}", self.leaf)?;
        writeln!(f, "mirror reads: {}", self.mirror)?;
        writeln!(f, "stripe reads: {}", self.stripe)?;
        writeln!(f, "concat reads: {}", self.concat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_by_kind() {
        let stats = ReadStats::default();
        stats.record_leaf_read(LeafRead {
            path: "hd:3".to_string(),
            offset: 0,
            bytes: 512,
            error: false,
        });
        stats.record_leaf_read(LeafRead {
            path: "hd:4".to_string(),
            offset: 0,
            bytes: 0,
            error: true,
        });
        stats.record_set_read(SetRead {
            raid_type: RaidType::Stripe,
            bytes: 512,
            error: false,
        });

        let text = stats.to_string();
        assert!(text.contains("leaf reads: ops=2 bytes=512 errors=1"));
        assert!(text.contains("stripe reads: ops=1 bytes=512 errors=0"));
        assert!(text.contains("mirror reads: ops=0 bytes=0 errors=0"));
    }
}
