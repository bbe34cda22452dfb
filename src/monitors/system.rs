//! Host metrics through `sysinfo`

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use sysinfo::{Disks, System};
use tracing::{instrument, trace};

use crate::{MetricReading, error::MetricSourceError};

use super::MetricSource;

/// Reads cpu, memory and disk utilisation of the local machine
///
/// CPU usage is computed between two refreshes, so the `System` handle is kept
/// across calls. The first call waits one `MINIMUM_CPU_UPDATE_INTERVAL` to get
/// a meaningful value.
#[derive(Debug, Clone)]
pub struct SystemMetricSource {
    system: Arc<Mutex<System>>,
    primed: Arc<AtomicBool>,
}

impl Default for SystemMetricSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemMetricSource {
    pub fn new() -> Self {
        Self {
            system: Arc::new(Mutex::new(System::new())),
            primed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn refresh(system: &Mutex<System>) -> Result<MetricReading, MetricSourceError> {
        let mut sys = system
            .lock()
            .map_err(|_| MetricSourceError::Unavailable("system handle poisoned".to_string()))?;
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        let cpu = sys.global_cpu_usage() as f64;
        let memory = percentage(sys.used_memory(), sys.total_memory());

        let disks = Disks::new_with_refreshed_list();
        let (total, available) = disks.iter().fold((0u64, 0u64), |(total, available), disk| {
            (total + disk.total_space(), available + disk.available_space())
        });
        let disk = percentage(total.saturating_sub(available), total);

        Ok(MetricReading::new(cpu.clamp(0.0, 100.0), memory, disk))
    }
}

fn percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (used as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}

#[async_trait]
impl MetricSource for SystemMetricSource {
    #[instrument(skip(self))]
    async fn get_readings(&self) -> Result<MetricReading, MetricSourceError> {
        if !self.primed.swap(true, Ordering::SeqCst) {
            trace!("priming cpu usage baseline");
            let system = self.system.clone();
            tokio::task::spawn_blocking(move || {
                if let Ok(mut sys) = system.lock() {
                    sys.refresh_cpu_usage();
                }
            })
            .await
            .map_err(|e| MetricSourceError::Unavailable(e.to_string()))?;
            tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
        }

        let system = self.system.clone();
        let reading = tokio::task::spawn_blocking(move || Self::refresh(&system))
            .await
            .map_err(|e| MetricSourceError::Unavailable(e.to_string()))??;

        trace!("read {reading:?}");
        Ok(reading)
    }
}
