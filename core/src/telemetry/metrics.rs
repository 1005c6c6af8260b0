/// Counters accumulated over one run of the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunMetrics {
    pub blocks: u64,
    pub unrecognized: u64,
    pub lost_data: u64,
    pub acquisitions: u64,
    pub samples: u64,
    pub records: u64,
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_block(&mut self) {
        self.blocks += 1;
    }

    pub fn record_unrecognized(&mut self) {
        self.unrecognized += 1;
    }

    pub fn record_lost_data(&mut self) {
        self.lost_data += 1;
    }

    pub fn record_acquisition(&mut self) {
        self.acquisitions += 1;
    }

    pub fn record_samples(&mut self, count: usize) {
        self.samples += count as u64;
    }

    pub fn record_emission(&mut self) {
        self.records += 1;
    }

    pub fn snapshot(&self) -> RunMetrics {
        *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let mut metrics = RunMetrics::new();
        metrics.record_block();
        metrics.record_samples(512);
        metrics.record_samples(512);
        metrics.record_emission();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.blocks, 1);
        assert_eq!(snapshot.samples, 1024);
        assert_eq!(snapshot.records, 1);
        assert_eq!(snapshot.lost_data, 0);
    }
}
