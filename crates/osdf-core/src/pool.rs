//! Bounded pool of request tasks.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Runs each request on its own tokio task, with at most `capacity` running
/// at once. Tasks beyond that wait for a permit.
#[derive(Clone)]
pub struct WorkerPool {
	permits: Arc<Semaphore>,
	capacity: usize,
}

impl WorkerPool {
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			permits: Arc::new(Semaphore::new(capacity)),
			capacity,
		}
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Permits not currently held by a running task.
	pub fn available(&self) -> usize {
		self.permits.available_permits()
	}

	pub fn spawn<F>(&self, task: F) -> JoinHandle<Option<F::Output>>
	where
		F: Future + Send + 'static,
		F::Output: Send + 'static,
	{
		let permits = self.permits.clone();
		tokio::spawn(async move {
			// Acquire only fails once the semaphore is closed.
			let _permit = permits.acquire_owned().await.ok()?;
			Some(task.await)
		})
	}

	/// Stops admitting queued tasks; running tasks finish normally.
	pub fn close(&self) {
		self.permits.close();
	}
}
