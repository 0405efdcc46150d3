//! Unlock command implementation

use anyhow::{Context, Result};
use schemata_engine::MigrationLock;

use crate::cli::GlobalArgs;
use crate::context::RuntimeContext;

/// Execute the unlock command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let ctx = RuntimeContext::new(global)?;
    let lock = &ctx.config.lock;

    let holder = ctx
        .db
        .lock_holder(&lock.table, &lock.name)
        .context("Failed to read migration lock")?;
    let released = MigrationLock::force_release(&*ctx.db, lock)
        .context("Failed to release migration lock")?;

    if released {
        println!(
            "Released lock '{}' held by {}",
            lock.name,
            holder.as_deref().unwrap_or("unknown")
        );
    } else {
        println!("Lock '{}' is not held", lock.name);
    }
    Ok(())
}
