//! # Task Management System
//!
//! Runs streaming work on a pool of worker threads.
//!
//! ## Architecture Overview
//! - `TaskManager`: Central coordinator for task distribution and worker management
//! - `Task`: A unit of work that can be executed on a worker
//! - `TaskResult`: The result of a completed task, which can spawn additional tasks
//! - `TaskChannel`: Communication channel between the driving thread and one worker
//!
//! ## Task Lifecycle
//! 1. Tasks are published via `TaskManager::publish_task()`
//! 2. The manager distributes tasks to available worker channels using round-robin
//! 3. Workers process tasks and send back results; a panicking task sends
//!    back its failure result instead
//! 4. Results are handled on the driving thread in `process_completed_tasks()`
//! 5. Results can spawn new tasks or report stream events
//! 6. The cycle continues until all work is complete
//!
//! Each worker has at most [`MAX_TASKS_IN_FLIGHT`] task at a time. Everything
//! else waits in a FIFO queue until a worker frees up.

pub mod task;

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info};

use task::{Task, TaskResult};

use crate::error::{panic_message, TerrainError};

use super::{StreamEvent, StreamingContext};

/// A communication channel between the driving thread and a worker thread.
///
/// # Fields
/// - `task_sender`: Sends tasks to the worker
/// - `result_receiver`: Receives task results from the worker
/// - `num_tasks_in_flight`: Tracks number of tasks currently being processed
/// - `alive`: Cleared once the worker hangs up
/// - `_worker`: Handle to the worker thread
#[derive(Debug)]
pub struct TaskChannel {
    task_sender: Sender<Box<dyn Task>>,
    result_receiver: Receiver<Box<dyn TaskResult>>,
    num_tasks_in_flight: usize,
    alive: bool,
    _worker: JoinHandle<()>,
}

/// Manages a pool of worker threads and coordinates task execution.
///
/// The `TaskManager` is responsible for:
/// - Creating and managing worker threads
/// - Distributing tasks across available workers
/// - Collecting and processing task results
/// - Queuing tasks when all workers are busy
pub struct TaskManager {
    channels: Vec<TaskChannel>,
    queued_tasks: VecDeque<Box<dyn Task>>,
    current_channel: usize,
}

/// Maximum number of tasks that can be in flight per worker channel.
///
/// Set to 1 so a long extraction on one worker never delays a queued task
/// that another idle worker could take.
pub const MAX_TASKS_IN_FLIGHT: usize = 1;

/// Runs a task, turning a panic into the task's failure result so the worker
/// survives and the request is still reported.
fn run_task(task: &dyn Task) -> Box<dyn TaskResult> {
    match panic::catch_unwind(AssertUnwindSafe(|| task.process())) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Streaming task panicked: {}", message);
            task.fail(TerrainError::TaskPanicked(message))
        }
    }
}

impl TaskManager {
    /// Creates a new `TaskManager` with `num_workers` worker threads.
    pub fn new(num_workers: usize) -> Self {
        let mut channels = Vec::with_capacity(num_workers);

        info!(
            "Starting {} streaming workers, available parallelism: {:?}",
            num_workers,
            thread::available_parallelism()
        );

        for worker_index in 0..num_workers {
            let (task_tx, task_rx) = channel::<Box<dyn Task>>();
            let (result_tx, result_rx) = channel::<Box<dyn TaskResult>>();

            let worker = thread::Builder::new()
                .name(format!("terrain-worker-{worker_index}"))
                .spawn(move || {
                    while let Ok(task) = task_rx.recv() {
                        let result = run_task(task.as_ref());
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                });

            match worker {
                Ok(worker) => channels.push(TaskChannel {
                    task_sender: task_tx,
                    result_receiver: result_rx,
                    num_tasks_in_flight: 0,
                    alive: true,
                    _worker: worker,
                }),
                Err(e) => error!("Failed to spawn streaming worker {}: {}", worker_index, e),
            }
        }

        TaskManager {
            channels,
            queued_tasks: VecDeque::new(),
            current_channel: 0,
        }
    }

    /// Attempts to send a task to a specific worker channel.
    ///
    /// Returns the task on failure so it can be requeued.
    fn try_send_task(&mut self, task: Box<dyn Task>, channel_idx: usize) -> Result<(), Box<dyn Task>> {
        let channel = &mut self.channels[channel_idx];
        match channel.task_sender.send(task) {
            Ok(_) => {
                channel.num_tasks_in_flight += 1;
                Ok(())
            }
            Err(task) => {
                error!("Streaming worker {} hung up", channel_idx);
                channel.alive = false;
                Err(task.0)
            }
        }
    }

    /// Finds a live worker channel that can accept a new task, round-robin
    /// from the last used channel.
    fn find_available_channel(&self) -> Option<usize> {
        let len = self.channels.len();
        (0..len)
            .map(|offset| (self.current_channel + offset) % len)
            .find(|&idx| {
                let channel = &self.channels[idx];
                channel.alive && channel.num_tasks_in_flight < MAX_TASKS_IN_FLIGHT
            })
    }

    /// Publishes a new task for execution.
    ///
    /// # Returns
    /// - `true` if the task was immediately scheduled on an available worker
    /// - `false` if the task was queued because all workers are busy
    pub fn publish_task(&mut self, task: Box<dyn Task>) -> bool {
        if !self.queued_tasks.is_empty() {
            self.queued_tasks.push_back(task);
            self.process_queued_tasks();
            return false;
        }

        match self.find_available_channel() {
            Some(channel_idx) => match self.try_send_task(task, channel_idx) {
                Ok(_) => {
                    self.current_channel = (channel_idx + 1) % self.channels.len();
                    true
                }
                Err(task) => {
                    self.queued_tasks.push_back(task);
                    false
                }
            },
            None => {
                self.queued_tasks.push_back(task);
                false
            }
        }
    }

    /// Moves queued tasks, oldest first, onto workers until the queue is
    /// empty or every worker is busy.
    pub fn process_queued_tasks(&mut self) {
        while let Some(channel_idx) = self.find_available_channel() {
            let Some(task) = self.queued_tasks.pop_front() else {
                break;
            };
            match self.try_send_task(task, channel_idx) {
                Ok(_) => self.current_channel = (channel_idx + 1) % self.channels.len(),
                Err(task) => self.queued_tasks.push_front(task),
            }
        }
    }

    /// Handles every result that is already available without blocking.
    ///
    /// Follow-up tasks are published and the reported events are returned in
    /// the order they were produced.
    pub fn process_completed_tasks(&mut self, context: &Arc<StreamingContext>) -> Vec<StreamEvent> {
        let mut results = Vec::new();
        for (idx, channel) in self.channels.iter_mut().enumerate() {
            loop {
                match channel.result_receiver.try_recv() {
                    Ok(result) => {
                        channel.num_tasks_in_flight -= 1;
                        results.push(result);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        Self::mark_dead(idx, channel);
                        break;
                    }
                }
            }
        }
        self.handle_results(results, context)
    }

    /// Blocks up to `timeout` for the next result of a busy worker and
    /// handles it.
    pub fn wait_for_completed_task(
        &mut self,
        context: &Arc<StreamingContext>,
        timeout: Duration,
    ) -> Vec<StreamEvent> {
        let Some(idx) = self
            .channels
            .iter()
            .position(|channel| channel.alive && channel.num_tasks_in_flight > 0)
        else {
            return Vec::new();
        };

        let channel = &mut self.channels[idx];
        match channel.result_receiver.recv_timeout(timeout) {
            Ok(result) => {
                channel.num_tasks_in_flight -= 1;
                self.handle_results(vec![result], context)
            }
            Err(RecvTimeoutError::Timeout) => Vec::new(),
            Err(RecvTimeoutError::Disconnected) => {
                Self::mark_dead(idx, channel);
                Vec::new()
            }
        }
    }

    fn handle_results(
        &mut self,
        results: Vec<Box<dyn TaskResult>>,
        context: &Arc<StreamingContext>,
    ) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        let mut tasks_to_queue = Vec::new();
        for result in results {
            let (new_tasks, new_events) = result.handle_result(context);
            tasks_to_queue.extend(new_tasks);
            events.extend(new_events);
        }
        for task in tasks_to_queue {
            self.publish_task(task);
        }
        events
    }

    fn mark_dead(idx: usize, channel: &mut TaskChannel) {
        if channel.alive {
            error!(
                "Streaming worker {} disconnected with {} tasks in flight",
                idx, channel.num_tasks_in_flight
            );
        }
        channel.alive = false;
        channel.num_tasks_in_flight = 0;
    }

    /// Returns `true` when nothing is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.queued_tasks.is_empty() && self.tasks_in_flight() == 0
    }

    /// Number of tasks currently running on workers.
    pub fn tasks_in_flight(&self) -> usize {
        self.channels.iter().map(|channel| channel.num_tasks_in_flight).sum()
    }

    /// Number of tasks waiting for a worker.
    pub fn queued_tasks(&self) -> usize {
        self.queued_tasks.len()
    }

    /// Returns `true` if at least one worker can still take tasks.
    pub fn has_live_workers(&self) -> bool {
        self.channels.iter().any(|channel| channel.alive)
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        debug!(
            "Stopping {} streaming workers, dropping {} queued tasks",
            self.channels.len(),
            self.queued_tasks.len()
        );
    }
}
