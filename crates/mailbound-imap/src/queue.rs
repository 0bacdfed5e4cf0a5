//! Command serialization queue.
//!
//! IMAP allows one in-flight command per connection (IDLE aside), so every
//! user operation funnels through this queue: a lightweight async mutex
//! whose guard is held for the full write-command/await-completion cycle.
//! Multiple independent connections each carry their own queue and run in
//! parallel; within one connection, effects are observed in submission
//! order. The one-shot greeting reader during connection establishment is
//! the only path that bypasses the queue.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serializes command execution on a single connection.
#[derive(Clone)]
pub struct CommandQueue<T> {
    inner: Arc<Mutex<T>>,
}

/// Exclusive access to the queued state for one command's lifetime.
pub type QueueGuard<T> = OwnedMutexGuard<T>;

impl<T: Send + 'static> CommandQueue<T> {
    /// Creates a queue owning the given state.
    pub fn new(state: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Waits for the queue and returns exclusive access.
    ///
    /// Waiters are served in FIFO order by the underlying mutex, which is
    /// what gives a single connection its submission-order guarantee.
    pub async fn acquire(&self) -> QueueGuard<T> {
        Arc::clone(&self.inner).lock_owned().await
    }

    /// Runs one closure with exclusive access, releasing the queue when
    /// it completes.
    pub async fn run<R, F, Fut>(&self, f: F) -> R
    where
        F: FnOnce(QueueGuard<T>) -> Fut,
        Fut: Future<Output = R>,
    {
        let guard = self.acquire().await;
        f(guard).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn runs_closures_one_at_a_time() {
        let queue = CommandQueue::new(Vec::<usize>::new());
        let running = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..8 {
            let queue = queue.clone();
            let running = Arc::clone(&running);
            handles.push(tokio::spawn(async move {
                queue
                    .run(|mut state| async move {
                        assert_eq!(running.fetch_add(1, Ordering::SeqCst), 0);
                        tokio::task::yield_now().await;
                        state.push(i);
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let guard = queue.acquire().await;
        assert_eq!(guard.len(), 8);
    }

    #[tokio::test]
    async fn guard_holds_until_dropped() {
        let queue = CommandQueue::new(0u32);
        let guard = queue.acquire().await;

        let queue2 = queue.clone();
        let waiter = tokio::spawn(async move {
            let mut g = queue2.acquire().await;
            *g += 1;
        });

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
        assert_eq!(*queue.acquire().await, 1);
    }
}
