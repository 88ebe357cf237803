use crate::disk::containing_mount;
use crate::network::NetworkSample;
use crate::snapshot::{CpuStats, DiskStats, FileStats, MemoryStats, NetworkStats, StatsSnapshot, percent, round_one};
use parcel_library::{format_bytes, format_speed, format_uptime};
use parcel_metadata::{Database, Repository};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use sysinfo::{Disks, MINIMUM_CPU_UPDATE_INTERVAL, Networks, System};

/// How long to watch the CPU for a utilization reading.
const CPU_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Host counters that need refreshing before they can be read.
struct HostSampler {
    system: System,
    disks: Disks,
    networks: Networks,
}

impl HostSampler {
    fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a difference between two refreshes; start the clock.
        system.refresh_cpu();
        Self {
            system,
            disks: Disks::new_with_refreshed_list(),
            networks: Networks::new_with_refreshed_list(),
        }
    }

    /// Cumulative `(sent, received)` bytes over all interfaces.
    fn network_totals(&mut self) -> (u64, u64) {
        self.networks.refresh();
        self.networks.list().values().fold((0u64, 0u64), |(sent, received), data| {
            (sent.saturating_add(data.total_transmitted()), received.saturating_add(data.total_received()))
        })
    }

    fn memory(&mut self) -> MemoryStats {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        let used = self.system.used_memory();
        MemoryStats {
            total: format_bytes(total),
            used: format_bytes(used),
            percent: percent(used, total),
        }
    }

    async fn cpu(&mut self) -> CpuStats {
        self.system.refresh_cpu();
        tokio::time::sleep(CPU_SAMPLE_INTERVAL.max(MINIMUM_CPU_UPDATE_INTERVAL)).await;
        self.system.refresh_cpu();
        CpuStats {
            percent: round_one(f64::from(self.system.global_cpu_info().cpu_usage())),
        }
    }

    fn disk(&mut self, target: &Path) -> DiskStats {
        // Mounts come and go; re-list rather than just refresh.
        self.disks.refresh_list();
        let disks = self.disks.list();
        let Some(index) = containing_mount(disks.iter().map(|disk| disk.mount_point()), target) else {
            tracing::warn!(path = %target.display(), "No mounted disk holds the blob directory");
            return DiskStats::default();
        };
        let disk = &disks[index];
        let total = disk.total_space();
        let free = disk.available_space();
        let used = total.saturating_sub(free);
        DiskStats {
            total: format_bytes(total),
            used: format_bytes(used),
            free: format_bytes(free),
            percent: percent(used, total),
        }
    }
}

/// Samples host and metadata store statistics on demand.
///
/// Owns the [`NetworkSample`] that throughput is measured against; it
/// starts at the counters seen on construction and moves forward with every
/// [`sample`](Self::sample).
pub struct StatsAggregator {
    blob_root: PathBuf,
    database: Database,
    repo: Repository,
    /// Concurrent samples queue here rather than refreshing in parallel.
    host: tokio::sync::Mutex<HostSampler>,
    network: Mutex<NetworkSample>,
}

impl StatsAggregator {
    /// `blob_root` is the blob store directory; disk usage is reported for
    /// the filesystem it lives on.
    pub fn new(blob_root: impl Into<PathBuf>, database: Database) -> Self {
        let mut host = HostSampler::new();
        let (sent, received) = host.network_totals();
        Self {
            blob_root: blob_root.into(),
            repo: Repository::from(&database),
            database,
            host: tokio::sync::Mutex::new(host),
            network: Mutex::new(NetworkSample::new(sent, received, Instant::now())),
        }
    }

    /// Take a reading.
    ///
    /// Never fails: anything that can't be read is logged and reported as
    /// zero or empty.
    pub async fn sample(&self) -> StatsSnapshot {
        let blob_root = match tokio::fs::canonicalize(&self.blob_root).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(path = %self.blob_root.display(), error = %e, "Could not resolve blob directory");
                self.blob_root.clone()
            },
        };

        let mut host = self.host.lock().await;
        let memory = host.memory();
        let cpu = host.cpu().await;
        let disk = host.disk(&blob_root);
        let (sent, received) = host.network_totals();
        drop(host);

        let speed = self
            .network
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance(sent, received, Instant::now());

        let count = self.repo.count().await.unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "Could not count file records");
            0
        });

        StatsSnapshot {
            disk,
            memory,
            cpu,
            network: NetworkStats {
                sent: format_bytes(sent),
                received: format_bytes(received),
                upload_speed: format_speed(speed.upload),
                download_speed: format_speed(speed.download),
            },
            files: FileStats {
                count,
                database_size: format_bytes(self.database.size_on_disk().await),
            },
            uptime: format_uptime(System::uptime()),
        }
    }
}
