//! Host resource and file store statistics.
//!
//! A [`StatsAggregator`] samples disk, memory, CPU and network usage of the
//! host, plus the size of the metadata store, into a [`StatsSnapshot`] whose
//! byte figures are already formatted for display. Network throughput is
//! the change in the host's cumulative counters since the previous sample.

mod aggregator;
mod disk;
mod network;
mod snapshot;

pub use crate::aggregator::StatsAggregator;
pub use crate::network::{NetworkSample, NetworkSpeed};
pub use crate::snapshot::{CpuStats, DiskStats, FileStats, MemoryStats, NetworkStats, StatsSnapshot};
