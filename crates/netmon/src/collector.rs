//! Data collectors run by the monitoring loop

use netmon_core::{constants::BYTES_PER_MB, Error, Result};
use netmon_logs::RotatingWriter;
use sysinfo::{Networks, System};

/// A source of records, invoked once per collection cycle
pub trait Collector: Send {
    /// Name used as the record source
    fn name(&self) -> &str;

    /// Gather data and write it to `logger`
    fn collect(&mut self, logger: &RotatingWriter) -> Result<()>;
}

/// Memory usage and network packet counters for the whole host
pub struct SystemMetricsCollector {
    system: System,
    networks: Networks,
    memory_warning_percent: u8,
}

impl SystemMetricsCollector {
    pub const NAME: &'static str = "SystemMetricsCollector";

    pub fn new(memory_warning_percent: u8) -> Self {
        Self {
            system: System::new(),
            networks: Networks::new_with_refreshed_list(),
            memory_warning_percent,
        }
    }
}

impl Collector for SystemMetricsCollector {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn collect(&mut self, logger: &RotatingWriter) -> Result<()> {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return Err(Error::collector(Self::NAME, "memory statistics unavailable"));
        }
        let used = self.system.used_memory();
        let available = self.system.available_memory();

        logger.info(
            format!(
                "Memory Usage: Used={} MB, Free={} MB, Total={} MB",
                used / BYTES_PER_MB,
                available / BYTES_PER_MB,
                total / BYTES_PER_MB
            ),
            Self::NAME,
        );

        self.networks.refresh();
        let (received, transmitted) = packet_totals(
            self.networks
                .iter()
                .map(|(_, data)| (data.total_packets_received(), data.total_packets_transmitted())),
        );
        logger.debug(
            format!(
                "Network packets: received={}, transmitted={} across {} interfaces",
                received,
                transmitted,
                self.networks.iter().count()
            ),
            Self::NAME,
        );

        let percent = memory_percent(used, total);
        if percent >= u64::from(self.memory_warning_percent) {
            logger.warn(
                format!(
                    "High memory usage: {}% of {} MB in use",
                    percent,
                    total / BYTES_PER_MB
                ),
                Self::NAME,
            );
        }

        Ok(())
    }
}

/// Whole-percent share of `used` in `total`
fn memory_percent(used: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    ((u128::from(used) * 100) / u128::from(total)) as u64
}

/// Sum `(received, transmitted)` packet counters over all interfaces
fn packet_totals(counters: impl Iterator<Item = (u64, u64)>) -> (u64, u64) {
    counters.fold((0, 0), |(rx, tx), (r, t)| {
        (rx.saturating_add(r), tx.saturating_add(t))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use netmon_logs::{Level, Record, RotationPolicy};
    use tempfile::TempDir;

    #[test]
    fn test_memory_percent() {
        assert_eq!(memory_percent(50, 100), 50);
        assert_eq!(memory_percent(999, 1000), 99);
        assert_eq!(memory_percent(u64::MAX, u64::MAX), 100);
        assert_eq!(memory_percent(10, 0), 0);
    }

    #[test]
    fn test_packet_totals() {
        let totals = packet_totals(vec![(10, 1), (5, 2), (u64::MAX, 0)].into_iter());
        assert_eq!(totals, (u64::MAX, 3));
        assert_eq!(packet_totals(std::iter::empty()), (0, 0));
    }

    #[test]
    fn test_system_metrics_collect_writes_records() {
        let dir = TempDir::new().unwrap();
        let policy = RotationPolicy::new("metrics.log", 1024 * 1024, 1, dir.path());
        let logger = RotatingWriter::initialize(policy.clone());

        let mut collector = SystemMetricsCollector::new(100);
        collector.collect(&logger).unwrap();
        logger.close();

        let records: Vec<Record> = std::fs::read_to_string(policy.active_path())
            .unwrap()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect();

        assert!(records
            .iter()
            .all(|r| r.source() == SystemMetricsCollector::NAME));
        assert!(records
            .iter()
            .any(|r| r.level() == Level::Info && r.message().starts_with("Memory Usage: Used=")));
        assert!(records
            .iter()
            .any(|r| r.level() == Level::Debug && r.message().starts_with("Network packets:")));
    }
}
