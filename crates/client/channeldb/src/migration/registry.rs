//! Ordered list of every schema migration known to this binary.

use super::revisions;
use super::{MigrationContext, MigrationError};
use std::fmt;

pub type MigrationFn = fn(&mut MigrationContext<'_>) -> Result<(), MigrationError>;

/// One schema migration, taking the database from `from_version` to `to_version`.
#[derive(Clone, Copy)]
pub struct Migration {
    pub name: &'static str,
    pub from_version: u32,
    pub to_version: u32,
    pub migrate: MigrationFn,
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("name", &self.name)
            .field("from_version", &self.from_version)
            .field("to_version", &self.to_version)
            .finish_non_exhaustive()
    }
}

/// Append only. Entry `i` migrates version `i` to `i + 1`.
static MIGRATIONS: &[Migration] =
    &[Migration { name: "invoices", from_version: 0, to_version: 1, migrate: revisions::revision_0001::migrate }];

pub fn get_migrations() -> &'static [Migration] {
    MIGRATIONS
}

/// Schema version a database reaches once every migration of `migrations` is applied.
pub fn latest_version(migrations: &[Migration]) -> u32 {
    migrations.last().map_or(0, |m| m.to_version)
}

/// Migrations taking version `from` to version `to`, in application order.
pub fn get_migrations_for_range(
    migrations: &[Migration],
    from: u32,
    to: u32,
) -> Result<&[Migration], MigrationError> {
    let start = usize::try_from(from).map_err(|_| MigrationError::NoMigrationPath { from, to })?;
    let end = usize::try_from(to).map_err(|_| MigrationError::NoMigrationPath { from, to })?;
    if start > end {
        return Err(MigrationError::NoMigrationPath { from, to });
    }
    migrations.get(start..end).ok_or(MigrationError::NoMigrationPath { from, to })
}

/// Checks that `migrations` form a contiguous chain starting at version 0.
pub fn validate_registry(migrations: &[Migration]) -> Result<(), MigrationError> {
    for (index, migration) in migrations.iter().enumerate() {
        if usize::try_from(migration.from_version).ok() != Some(index) {
            return Err(MigrationError::InvalidRegistry(format!(
                "migration '{}' at position {index} starts from v{}",
                migration.name, migration.from_version
            )));
        }
        if migration.from_version.checked_add(1) != Some(migration.to_version) {
            return Err(MigrationError::InvalidRegistry(format!(
                "migration '{}' goes from v{} to v{}",
                migration.name, migration.from_version, migration.to_version
            )));
        }
    }
    Ok(())
}
