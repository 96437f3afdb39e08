//! Tokio runtime used to drive `object_store` from blocking callers

use crate::{CloudError, Result};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};

/// Worker threads for the client runtime; requests are issued one at a time
/// per caller, so a small pool is enough
const WORKER_THREADS: usize = 2;

/// Build the runtime a `CloudClient` blocks on
pub(crate) fn build_runtime() -> Result<Arc<Runtime>> {
    let runtime = Builder::new_multi_thread()
        .worker_threads(WORKER_THREADS)
        .enable_all()
        .thread_name("bucketfs-worker")
        .build()
        .map_err(|e| CloudError::Runtime(format!("Failed to create Tokio runtime: {}", e)))?;

    Ok(Arc::new(runtime))
}
