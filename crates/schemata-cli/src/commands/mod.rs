//! Command implementations

pub(crate) mod common;
pub(crate) mod status;
pub(crate) mod unlock;
pub(crate) mod update;
pub(crate) mod update_rows;
