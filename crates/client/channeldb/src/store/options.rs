#![allow(clippy::identity_op)] // allow 1 * MiB
#![allow(non_upper_case_globals)] // allow KiB/MiB names

use super::Bucket;
use rocksdb::{DBCompressionType, Options};
use serde::{Deserialize, Serialize};

const KiB: usize = 1024;
const MiB: usize = 1024 * KiB;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RocksDbConfig {
    /// Enable statistics. Statistics will be put in the `LOG` file in the db folder. This can have an effect on performance.
    pub enable_statistics: bool,
    /// Dump statistics every `statistics_period_sec`.
    pub statistics_period_sec: u32,
    /// Memtable memory budget per bucket.
    pub memtable_budget_bytes: usize,
    /// Fsync the write-ahead log on every commit.
    pub sync_writes: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self { enable_statistics: false, statistics_period_sec: 60, memtable_budget_bytes: 64 * MiB, sync_writes: true }
    }
}

pub fn rocksdb_global_options(config: &RocksDbConfig) -> Options {
    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    let cores = std::thread::available_parallelism().map(|e| e.get() as i32).unwrap_or(1);
    options.increase_parallelism(cores);
    options.set_max_background_jobs(cores);

    options.set_atomic_flush(true);

    options.set_max_log_file_size(10 * MiB);
    options.set_keep_log_file_num(3);
    options.set_log_level(rocksdb::LogLevel::Warn);

    if config.enable_statistics {
        options.enable_statistics();
    }
    options.set_stats_dump_period_sec(config.statistics_period_sec);

    options
}

impl Bucket {
    /// Per bucket rocksdb options.
    pub(crate) fn rocksdb_options(&self, config: &RocksDbConfig) -> Options {
        let mut options = Options::default();
        options.set_compression_type(DBCompressionType::Zstd);
        options.optimize_universal_style_compaction(config.memtable_budget_bytes);

        if self.point_lookup {
            options.optimize_for_point_lookup(1); // 1 MiB block cache
        }

        options
    }
}
