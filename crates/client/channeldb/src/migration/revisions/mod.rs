//! Database schema revisions.
//!
//! Files: `revision_XXXX.rs` where XXXX is target version (e.g., `revision_0001.rs` = v0→v1).
//!
//! To add a new revision:
//! 1. Create `revision_XXXX.rs` with `pub fn migrate(ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError>`
//! 2. Export module here
//! 3. Append it to `MIGRATIONS` in the registry
//!
//! A revision only touches the store through `ctx.tx_mut()`. The runner commits that transaction
//! together with the new version, so returning an error discards everything the revision wrote.

pub mod revision_0001;
