//! Advisory lock held for the duration of a sweep.

use crate::error::{EngineError, EngineResult};
use schemata_core::LockConfig;
use schemata_db::Database;
use std::rc::Rc;

/// Guard for the named migration lock; released on drop.
pub struct MigrationLock {
    db: Rc<dyn Database>,
    table: String,
    name: String,
    holder: String,
}

impl MigrationLock {
    /// Take the lock or fail with [`EngineError::LockHeld`].
    pub fn acquire(db: Rc<dyn Database>, config: &LockConfig) -> EngineResult<Self> {
        let holder = uuid::Uuid::new_v4().to_string();
        if !db.try_acquire_lock(&config.table, &config.name, &holder)? {
            let current = db
                .lock_holder(&config.table, &config.name)?
                .unwrap_or_else(|| "an unknown holder".to_string());
            return Err(EngineError::LockHeld {
                name: config.name.clone(),
                holder: current,
            });
        }
        log::debug!("Acquired migration lock '{}' as {holder}", config.name);
        Ok(Self {
            db,
            table: config.table.clone(),
            name: config.name.clone(),
            holder,
        })
    }

    /// Remove the lock regardless of who holds it. Returns whether a lock was removed.
    pub fn force_release(db: &dyn Database, config: &LockConfig) -> EngineResult<bool> {
        Ok(db.release_lock(&config.table, &config.name, None)?)
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }
}

impl Drop for MigrationLock {
    fn drop(&mut self) {
        match self
            .db
            .release_lock(&self.table, &self.name, Some(&self.holder))
        {
            Ok(true) => log::debug!("Released migration lock '{}'", self.name),
            Ok(false) => log::warn!("Migration lock '{}' was already released", self.name),
            Err(e) => log::warn!("Failed to release migration lock '{}': {e}", self.name),
        }
    }
}

#[cfg(test)]
#[path = "lock_test.rs"]
mod tests;
