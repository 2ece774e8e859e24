//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod serve;
pub(crate) mod sync;

pub(crate) use check::CheckArgs;
pub(crate) use serve::ServeArgs;
pub(crate) use sync::SyncArgs;
