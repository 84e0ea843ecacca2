//! Database migration system for the channel database.
//!
//! This module provides a migration framework for upgrading the on-disk schema
//! between versions. It handles:
//!
//! - Version detection and comparison
//! - Sequential migration execution, one transaction per migration
//! - Dry runs that apply every pending migration and discard the result
//! - Progress reporting for long-running migrations
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MigrationRunner                            │
//! │  - Checks current vs required version                           │
//! │  - Determines which migrations to run                           │
//! │  - Executes migrations sequentially                             │
//! │  - Bumps the version in the migration's own transaction         │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Migration Registry                         │
//! │  - Maps version numbers to migration functions                  │
//! │  - Validates migration chain                                    │
//! └─────────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      Individual Migrations                      │
//! │  - revision_0001.rs: v0 -> v1 (invoice expiry and CLTV delta)   │
//! │  - ...                                                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Crash safety
//!
//! The schema version lives in the `metadata` bucket and is written by the same transaction as the
//! records a migration rewrites. A crash or an error before commit leaves both untouched, and the
//! next run starts over from the same version.
//!
//! # Adding a New Migration
//!
//! See the documentation in [`revisions`] module for instructions.

mod context;
mod error;
mod registry;
pub mod revisions;

pub use context::{MigrationContext, MigrationProgress, ProgressCallback};
pub use error::MigrationError;
pub use registry::{get_migrations, get_migrations_for_range, latest_version, validate_registry, Migration, MigrationFn};

use crate::meta;
use crate::store::{Store, StoreTransaction};
use lp_invoice::{NetworkParams, PaymentRequestDecoder};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Apply pending migrations in a transaction that is never committed.
    pub dry_run: bool,
    /// Networks payment requests are decoded against, in order.
    pub networks: Vec<NetworkParams>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self { dry_run: false, networks: NetworkParams::all_known() }
    }
}

/// Result of checking migration status.
#[derive(Debug, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Database is already at the required version.
    NoMigrationNeeded,

    /// Migrations need to be applied.
    MigrationRequired {
        /// Current database version
        current_version: u32,
        /// Target version
        target_version: u32,
        /// Number of migrations to apply
        migration_count: usize,
    },

    /// Database version is newer than the binary supports.
    DatabaseNewer {
        /// Database version
        db_version: u32,
        /// Binary's expected version
        binary_version: u32,
    },
}

/// Outcome of a successful [`MigrationRunner::run_migrations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    /// Names of the migrations applied, in order.
    pub applied: Vec<&'static str>,
    /// Nothing was committed.
    pub dry_run: bool,
}

enum RunnerState {
    Idle,
    Running,
    Committed { version: u32 },
    Aborted(MigrationError),
}

/// Main migration orchestrator.
pub struct MigrationRunner<'a> {
    migrations: Vec<Migration>,
    payment_requests: &'a dyn PaymentRequestDecoder,
    config: MigrationConfig,
    /// Flag for graceful abort
    abort_flag: Arc<AtomicBool>,
}

impl<'a> MigrationRunner<'a> {
    /// Runner for every migration known to this binary.
    pub fn new(payment_requests: &'a dyn PaymentRequestDecoder, config: MigrationConfig) -> Self {
        Self {
            migrations: get_migrations().to_vec(),
            payment_requests,
            config,
            abort_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Replaces the migration registry.
    pub fn with_migrations(mut self, migrations: Vec<Migration>) -> Self {
        self.migrations = migrations;
        self
    }

    /// Version required by the binary.
    pub fn required_version(&self) -> u32 {
        latest_version(&self.migrations)
    }

    /// Set the abort flag to signal migration should stop.
    pub fn abort(&self) {
        self.abort_flag.store(true, Ordering::Relaxed);
    }

    /// Shared abort flag, for aborting from another thread.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort_flag)
    }

    /// Check migration status without running anything.
    pub fn check_status<S: Store>(&self, store: &S) -> Result<MigrationStatus, MigrationError> {
        let current_version = store.view(|tx| meta::get_version(tx))?;
        let target_version = self.required_version();

        if current_version == target_version {
            return Ok(MigrationStatus::NoMigrationNeeded);
        }
        if current_version > target_version {
            return Ok(MigrationStatus::DatabaseNewer { db_version: current_version, binary_version: target_version });
        }

        let migrations = get_migrations_for_range(&self.migrations, current_version, target_version)?;
        Ok(MigrationStatus::MigrationRequired {
            current_version,
            target_version,
            migration_count: migrations.len(),
        })
    }

    /// Run migrations if needed.
    ///
    /// Each migration runs in its own transaction, which also bumps the stored version. The first
    /// failure stops the run: its transaction is discarded and the database stays at the version
    /// the previous migration left it at.
    pub fn run_migrations<S: Store>(&self, store: &S) -> Result<MigrationReport, MigrationError> {
        validate_registry(&self.migrations)?;
        let target_version = self.required_version();

        let from_version = store.view(|tx| meta::get_version(tx))?;
        if from_version > target_version {
            return Err(MigrationError::DatabaseNewerThanBinary {
                db_version: from_version,
                binary_version: target_version,
            });
        }
        if self.config.dry_run {
            return self.dry_run(store, from_version, target_version);
        }

        let mut applied = vec![];
        let mut state = RunnerState::Idle;
        loop {
            state = match state {
                RunnerState::Idle => {
                    if from_version == target_version {
                        tracing::debug!("✅ Database version {} matches binary, no migration needed", target_version);
                        RunnerState::Committed { version: from_version }
                    } else {
                        tracing::info!(
                            "🔄 Starting database migration from v{} to v{} ({} migration(s))",
                            from_version,
                            target_version,
                            target_version - from_version
                        );
                        RunnerState::Running
                    }
                }
                RunnerState::Running => match self.step(store, target_version) {
                    Ok(Some(migration)) => {
                        applied.push(migration.name);
                        RunnerState::Running
                    }
                    Ok(None) => RunnerState::Committed { version: target_version },
                    Err(err) => RunnerState::Aborted(err),
                },
                RunnerState::Committed { version } => {
                    if !applied.is_empty() {
                        tracing::info!("🎉 Database migration completed successfully! Now at version {}", version);
                    }
                    return Ok(MigrationReport { from_version, to_version: version, applied, dry_run: false });
                }
                RunnerState::Aborted(err) => return Err(err),
            };
        }
    }

    /// Applies the migration for the current stored version, or returns `None` once the database
    /// is at `target_version`.
    fn step<S: Store>(&self, store: &S, target_version: u32) -> Result<Option<Migration>, MigrationError> {
        let version = store.view(|tx| meta::get_version(tx))?;
        if version == target_version {
            return Ok(None);
        }
        if self.abort_flag.load(Ordering::Relaxed) {
            tracing::warn!("⚠️  Migration aborted by user");
            return Err(MigrationError::Aborted);
        }

        let [migration] = get_migrations_for_range(&self.migrations, version, version.saturating_add(1))? else {
            return Err(MigrationError::NoMigrationPath { from: version, to: target_version });
        };

        tracing::info!(
            "📦 Running migration '{}' (v{} -> v{})",
            migration.name,
            migration.from_version,
            migration.to_version
        );
        let start_time = Instant::now();

        store.with_transaction(|tx| self.apply(tx, migration)).map_err(|e| {
            tracing::error!("❌ Migration '{}' failed: {}", migration.name, e);
            step_failed(migration, e)
        })?;

        tracing::info!("✅ Migration '{}' completed in {:.2}s", migration.name, start_time.elapsed().as_secs_f64());
        Ok(Some(*migration))
    }

    /// Runs `migration` inside `tx` and records its target version there.
    fn apply<T: StoreTransaction>(&self, tx: &mut T, migration: &Migration) -> Result<(), MigrationError> {
        let found = meta::get_version(tx)?;
        if found != migration.from_version {
            return Err(MigrationError::VersionMismatch {
                name: migration.name,
                expected: migration.from_version,
                found,
            });
        }

        {
            let mut ctx =
                MigrationContext::new(tx, self.payment_requests, &self.config.networks, Arc::clone(&self.abort_flag))
                    .with_progress_callback(Box::new(|progress: MigrationProgress| {
                        if progress.total_steps > 0 {
                            tracing::info!(
                                "   Progress: [{}/{}] {}",
                                progress.current_step,
                                progress.total_steps,
                                progress.message
                            );
                        } else {
                            tracing::info!("   Progress: [{}] {}", progress.current_step, progress.message);
                        }
                    }));
            (migration.migrate)(&mut ctx)?;
        }

        meta::set_version(tx, migration.to_version)?;
        Ok(())
    }

    /// Applies every pending migration in a single transaction, then drops it.
    fn dry_run<S: Store>(
        &self,
        store: &S,
        from_version: u32,
        to_version: u32,
    ) -> Result<MigrationReport, MigrationError> {
        let pending = get_migrations_for_range(&self.migrations, from_version, to_version)?;
        tracing::info!(
            "🧪 Dry run: applying {} migration(s) from v{} to v{} without committing",
            pending.len(),
            from_version,
            to_version
        );

        let mut tx = store.begin()?;
        let mut applied = vec![];
        for migration in pending {
            if self.abort_flag.load(Ordering::Relaxed) {
                tracing::warn!("⚠️  Migration aborted by user");
                return Err(MigrationError::Aborted);
            }
            self.apply(&mut tx, migration).map_err(|e| step_failed(migration, e))?;
            applied.push(migration.name);
        }
        drop(tx);

        tracing::info!("🧪 Dry run succeeded, database left at v{}", from_version);
        Ok(MigrationReport { from_version, to_version, applied, dry_run: true })
    }
}

fn step_failed(migration: &Migration, err: MigrationError) -> MigrationError {
    MigrationError::StepFailed {
        name: migration.name,
        from_version: migration.from_version,
        to_version: migration.to_version,
        source: Box::new(err),
    }
}
