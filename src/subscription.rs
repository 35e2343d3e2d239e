/// Handle returned by every subscribe operation.
///
/// The listener stays registered while the handle is alive. Dropping it, or
/// calling [`Subscription::dispose`], unregisters the listener exactly once.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    disposer: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new<F>(disposer: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            disposer: Some(Box::new(disposer)),
        }
    }

    pub fn dispose(mut self) {
        self.run_disposer();
    }

    fn run_disposer(&mut self) {
        if let Some(disposer) = self.disposer.take() {
            disposer();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_disposer();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.disposer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    #[test]
    fn disposer_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = Arc::clone(&calls);
        let subscription = Subscription::new(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        subscription.dispose();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drop_disposes() {
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls_clone = Arc::clone(&calls);
            let _subscription = Subscription::new(move || {
                calls_clone.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
