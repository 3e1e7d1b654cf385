//! Bounded queue for fire-and-forget background work.
//!
//! Notifications, document generation and post-upload row updates run here
//! so the caller never waits on them. A fixed number of workers drain the
//! queue; a failing or panicking task is logged and never reaches the
//! submitter.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type TaskResult = Result<(), String>;

struct Task {
  name: String,
  run: BoxFuture<'static, TaskResult>,
}

pub struct TaskQueue {
  sender: Mutex<Option<mpsc::Sender<Task>>>,
  workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskQueue {
  /// Start `workers` workers over a queue holding at most `capacity` tasks.
  ///
  /// Must be called from within a Tokio runtime.
  pub fn new(workers: usize, capacity: usize) -> Self {
    let (sender, receiver) = mpsc::channel::<Task>(capacity.max(1));
    let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

    let handles: Vec<JoinHandle<()>> = (0..workers.max(1))
      .map(|id| {
        let receiver = Arc::clone(&receiver);
        tokio::spawn(async move {
          loop {
            let next = receiver.lock().await.recv().await;
            let Some(task) = next else { break };
            run_task(id, task).await;
          }
          debug!(worker = id, "Task worker stopped");
        })
      })
      .collect();

    Self {
      sender: Mutex::new(Some(sender)),
      workers: Mutex::new(handles),
    }
  }

  /// Queue `task` without waiting.
  ///
  /// Returns false when the task was dropped because the queue is full or
  /// already shut down.
  pub fn submit<F>(&self, name: impl Into<String>, task: F) -> bool
  where
    F: Future<Output = TaskResult> + Send + 'static,
  {
    let name = name.into();
    let Some(sender) = self.sender.lock().clone() else {
      warn!(task = %name, "Task queue is shut down, dropping task");
      return false;
    };

    match sender.try_send(Task {
      name,
      run: Box::pin(task),
    }) {
      Ok(()) => true,
      Err(mpsc::error::TrySendError::Full(task)) => {
        warn!(task = %task.name, "Task queue is full, dropping task");
        false
      }
      Err(mpsc::error::TrySendError::Closed(task)) => {
        warn!(task = %task.name, "Task queue is closed, dropping task");
        false
      }
    }
  }

  /// Stop accepting tasks and wait until every queued and running task has
  /// finished.
  pub async fn shutdown(&self) {
    drop(self.sender.lock().take());
    let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
    let count = workers.len();
    for worker in workers {
      if let Err(e) = worker.await {
        warn!(error = %e, "Task worker ended abnormally");
      }
    }
    if count > 0 {
      info!(workers = count, "Task queue drained");
    }
  }
}

async fn run_task(worker: usize, task: Task) {
  debug!(worker, task = %task.name, "Running background task");
  // Spawned so a panic stays inside the task.
  match tokio::spawn(task.run).await {
    Ok(Ok(())) => debug!(worker, task = %task.name, "Background task finished"),
    Ok(Err(e)) => warn!(worker, task = %task.name, error = %e, "Background task failed"),
    Err(e) => warn!(worker, task = %task.name, error = %e, "Background task panicked"),
  }
}
