pub mod batch;
pub mod cache;
pub mod lookup;

// Re-export command functions for convenience
pub use batch::{batch, BatchParams};
pub use cache::{cache, CacheAction};
pub use lookup::{detail, lookup, search};

use masothue::error::{Error, MasothueErrorTrait};

/// Turn a library error into the message shown to the user
pub(crate) fn user_error(err: Error) -> anyhow::Error {
    tracing::debug!(error = ?err, kind = %err.kind(), "Command failed");
    anyhow::anyhow!(err.localized_desc())
}
