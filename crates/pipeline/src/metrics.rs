use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Counters for one pipeline; safe to share across tasks.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicUsize,
    documents_failed: AtomicUsize,
    entities_extracted: AtomicUsize,
    relations_extracted: AtomicUsize,

    // Timing (in microseconds)
    total_extract_time_us: AtomicU64,
    total_insert_time_us: AtomicU64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_extract(&self, duration: Duration, entities: usize, relations: usize) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.entities_extracted.fetch_add(entities, Ordering::Relaxed);
        self.relations_extracted.fetch_add(relations, Ordering::Relaxed);
        self.total_extract_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_insert(&self, duration: Duration) {
        self.total_insert_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents = self.documents_processed.load(Ordering::Relaxed);
        MetricsSnapshot {
            documents_processed: documents,
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            entities_extracted: self.entities_extracted.load(Ordering::Relaxed),
            relations_extracted: self.relations_extracted.load(Ordering::Relaxed),
            avg_extract_time_ms: avg_time_ms(&self.total_extract_time_us, documents),
            avg_insert_time_ms: avg_time_ms(&self.total_insert_time_us, documents),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    total_us.load(Ordering::Relaxed) as f64 / count as f64 / 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub documents_processed: usize,
    pub documents_failed: usize,
    pub entities_extracted: usize,
    pub relations_extracted: usize,
    pub avg_extract_time_ms: f64,
    pub avg_insert_time_ms: f64,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_averages() {
        let metrics = PipelineMetrics::new();
        metrics.record_extract(Duration::from_millis(4), 10, 3);
        metrics.record_extract(Duration::from_millis(2), 5, 1);
        metrics.record_insert(Duration::from_millis(1));
        metrics.record_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.documents_processed, 2);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(snapshot.entities_extracted, 15);
        assert_eq!(snapshot.relations_extracted, 4);
        assert!((snapshot.avg_extract_time_ms - 3.0).abs() < 1e-9);
        assert!((snapshot.avg_insert_time_ms - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(PipelineMetrics::new().snapshot().avg_extract_time_ms, 0.0);
    }
}
