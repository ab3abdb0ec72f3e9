//! Launch sequencing.
//!
//! Every router is spawned on its own task at once, with no ordering between
//! them. A router that fails to bind or serve logs its error and ends; its
//! siblings keep running. The returned handles are the only completion
//! signal.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::{JoinError, JoinHandle};

use crate::net::TlsIdentity;
use crate::observability::metrics;
use crate::routing::Router;
use crate::transport::{ServeError, Transport};

/// Why a router task ended.
#[derive(Debug, Error)]
pub enum RouterFailure {
    #[error(transparent)]
    Serve(#[from] ServeError),

    #[error("router task aborted: {0}")]
    Join(#[from] JoinError),
}

/// Completion signal of one launched router.
#[derive(Debug)]
pub struct RouterHandle {
    name: String,
    task: JoinHandle<Result<(), ServeError>>,
}

impl RouterHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the router to end.
    pub async fn join(self) -> Result<(), RouterFailure> {
        self.task.await??;
        Ok(())
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Spawn one serving task per router. Must run inside a tokio runtime.
pub fn launch(
    routers: Vec<Router>,
    transport: &dyn Transport,
    tls: Arc<TlsIdentity>,
) -> Vec<RouterHandle> {
    tracing::info!(routers = routers.len(), "Launching routers");

    routers
        .into_iter()
        .map(|router| {
            let name = router.name().to_string();
            tracing::info!(router = %router, scheme = %router.scheme(), "Starting router");

            let serve = transport.serve(router, Arc::clone(&tls));
            let task_name = name.clone();
            let task = tokio::spawn(async move {
                metrics::record_router_started();
                let result = serve.await;
                match &result {
                    Ok(()) => {
                        tracing::info!(router = %task_name, "Router stopped");
                        metrics::record_router_stopped("completed");
                    }
                    Err(e) => {
                        tracing::error!(router = %task_name, error = %e, "Router failed");
                        metrics::record_router_stopped(e.kind());
                    }
                }
                result
            });

            RouterHandle { name, task }
        })
        .collect()
}
