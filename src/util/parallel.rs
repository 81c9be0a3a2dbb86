use std::future::Future;

use anyhow::Result;
use tokio::task::JoinSet;

/// Run independent operations concurrently and collect every error.
///
/// Unlike `try_join_all` this never short-circuits: all operations run to
/// completion (or cancellation of the surrounding task) and the caller gets
/// the full error list.
pub(crate) async fn run_parallel<F>(operations: Vec<F>) -> Vec<anyhow::Error>
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    if operations.is_empty() {
        return Vec::new();
    }

    let mut set = JoinSet::new();
    for operation in operations {
        set.spawn(operation);
    }

    let mut errors = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(error)) => errors.push(error),
            Err(join_error) => errors.push(anyhow::anyhow!("task panicked: {join_error}")),
        }
    }

    errors
}
