use serde::Serialize;

/// One reading of everything the stats endpoint reports.
///
/// Byte amounts are pre-formatted strings; percentages are rounded to one
/// decimal place.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    pub disk: DiskStats,
    pub memory: MemoryStats,
    pub cpu: CpuStats,
    pub network: NetworkStats,
    pub files: FileStats,
    /// Host uptime.
    pub uptime: String,
}

/// Usage of the filesystem holding the blob store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiskStats {
    pub total: String,
    pub used: String,
    pub free: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MemoryStats {
    pub total: String,
    pub used: String,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CpuStats {
    pub percent: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    /// Total sent since the interfaces came up.
    pub sent: String,
    pub received: String,
    pub upload_speed: String,
    pub download_speed: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FileStats {
    pub count: u64,
    pub database_size: String,
}

/// `part` as a percentage of `whole`, to one decimal place.
pub(crate) fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round_one(part as f64 / whole as f64 * 100.0)
}

pub(crate) fn round_one(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
