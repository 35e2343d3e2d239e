use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct Cancelled;

/// A spawned future that is cancelled when the handle is dropped.
pub struct Task<T> {
    handle: Option<JoinHandle<Result<T, Cancelled>>>,
    cancellation_token: CancellationToken,
}

impl<T> Task<T>
where
    T: Send + 'static,
{
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = T> + Send + 'static,
    {
        let cancellation_token = CancellationToken::new();
        let cancellation_token_clone = cancellation_token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                result = future => Ok(result),
                _ = cancellation_token_clone.cancelled() => Err(Cancelled)
            }
        });

        Self {
            handle: Some(handle),
            cancellation_token,
        }
    }

    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the task to finish on its own.
    pub async fn join(mut self) -> Result<Result<T, Cancelled>, tokio::task::JoinError> {
        match self.handle.take() {
            Some(handle) => handle.await,
            None => Ok(Err(Cancelled)),
        }
    }
}

impl<T> Drop for Task<T> {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        time::Duration,
    };

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_cancels_the_future() {
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = Arc::clone(&ran);
        let task = Task::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            ran_clone.store(true, Ordering::SeqCst);
        });

        drop(task);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn join_returns_the_output() {
        let task = Task::spawn(async { 7 });
        let output = task.join().await.expect("task should not panic");
        assert!(matches!(output, Ok(7)));
    }
}
