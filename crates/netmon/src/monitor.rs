//! Periodic collection loop

use netmon_core::constants;
use netmon_logs::RotatingWriter;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, warn};

use crate::collector::Collector;

const SOURCE: &str = "NetworkMonitor";

/// Runs registered collectors at a fixed rate and writes their output
/// to a shared [`RotatingWriter`].
///
/// The collectors stay owned by the monitor and are shared with the
/// collection task, so `collect_once` and a later restart see the same set.
pub struct NetworkMonitor {
    logger: Arc<RotatingWriter>,
    collectors: Arc<Mutex<Vec<Box<dyn Collector>>>>,
    shutdown_tx: broadcast::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl NetworkMonitor {
    pub fn new(logger: Arc<RotatingWriter>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            logger,
            collectors: Arc::new(Mutex::new(Vec::new())),
            shutdown_tx,
            task: None,
        }
    }

    /// Register a collector. A running loop picks it up on its next cycle.
    pub fn add_collector(&mut self, collector: Box<dyn Collector>) {
        self.logger.info(
            format!("Registered data collector: {}", collector.name()),
            SOURCE,
        );
        self.collectors.lock().push(collector);
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Run every registered collector once, outside the schedule
    pub fn collect_once(&self) {
        run_cycle(&self.logger, &mut self.collectors.lock());
    }

    /// Start collecting after `initial_delay`, then every `period`.
    ///
    /// Returns false (and schedules nothing) when no collectors are
    /// registered or the loop is already running.
    pub fn start(&mut self, initial_delay: Duration, period: Duration) -> bool {
        if self.collectors.lock().is_empty() {
            self.logger.warn(
                "No data collectors registered. Monitoring will not start.",
                SOURCE,
            );
            return false;
        }
        if self.task.is_some() {
            warn!("Monitoring already started");
            return false;
        }

        let period = if period.is_zero() {
            Duration::from_secs(constants::DEFAULT_COLLECTION_INTERVAL_SECS)
        } else {
            period
        };

        let logger = Arc::clone(&self.logger);
        let collectors = Arc::clone(&self.collectors);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        self.task = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + initial_delay, period);

            loop {
                tokio::select! {
                    _ = interval.tick() => run_cycle(&logger, &mut collectors.lock()),
                    _ = shutdown_rx.recv() => {
                        debug!("Collection loop received shutdown");
                        break;
                    }
                }
            }
        }));

        self.logger.info(
            format!(
                "Network monitoring started. Collection interval: {} seconds.",
                period.as_secs()
            ),
            SOURCE,
        );
        true
    }

    /// Stop the loop, waiting briefly for an in-flight cycle to finish
    pub async fn stop(&mut self) {
        self.logger
            .info("Attempting to stop network monitoring...", SOURCE);

        if let Some(mut task) = self.task.take() {
            let _ = self.shutdown_tx.send(());
            let timeout = Duration::from_secs(constants::SHUTDOWN_TIMEOUT_SECS);

            match tokio::time::timeout(timeout, &mut task).await {
                Ok(Ok(())) => {
                    self.logger
                        .info("Scheduler terminated gracefully.", SOURCE);
                }
                Ok(Err(e)) => {
                    self.logger
                        .error(format!("Collection loop failed: {}", e), SOURCE);
                }
                Err(_) => {
                    task.abort();
                    self.logger.warn(
                        "Scheduler did not terminate gracefully, forcing shutdown.",
                        SOURCE,
                    );
                }
            }
        }

        self.logger.info("Network monitoring stopped.", SOURCE);
    }
}

/// One collection cycle. A failing collector is logged and skipped.
fn run_cycle(logger: &RotatingWriter, collectors: &mut [Box<dyn Collector>]) {
    logger.debug("Starting data collection cycle.", SOURCE);
    for collector in collectors.iter_mut() {
        if let Err(e) = collector.collect(logger) {
            logger.error(
                format!(
                    "Error during data collection from {}: {}",
                    collector.name(),
                    e
                ),
                SOURCE,
            );
        }
    }
    logger.debug("Data collection cycle finished.", SOURCE);
}
