//! In-memory conversion task registry.
//!
//! Front ends submit a [`ConversionRequest`] and get back a task id; the
//! batch itself runs on a blocking thread via [`tokio::task::spawn_blocking`]
//! so the async runtime stays responsive. Callers poll [`TaskRegistry::snapshot`]
//! for progress and request cancellation by id. Tasks live for the life of
//! the registry; nothing is persisted.

use crate::descriptor::{validate_file, validate_output_dir, FileDescriptor};
use crate::engine::ConversionEngine;
use crate::error::{ConvertError, Failure};
use crate::format::Format;
use crate::progress::CancelToken;
use chrono::Local;
use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use tracing::{info, warn};

/// Lifecycle of one submitted batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

/// Observable state of one batch, safe to serialize for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionTask {
    pub id: String,
    pub status: TaskStatus,
    /// 0..=100, monotone while running.
    pub progress: u8,
    /// Last human-readable progress message from the engine.
    pub message: String,
    pub output_files: Vec<PathBuf>,
    pub failures: Vec<Failure>,
    /// Outputs produced by a degraded handler, a subset of `output_files`.
    pub degraded_files: Vec<PathBuf>,
}

impl ConversionTask {
    fn new(id: String) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            progress: 0,
            message: String::new(),
            output_files: Vec::new(),
            failures: Vec::new(),
            degraded_files: Vec::new(),
        }
    }
}

/// Parameters of one batch submission.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub files: Vec<PathBuf>,
    pub target_format: Format,
    pub output_directory: PathBuf,
    pub dpi: u32,
}

struct TaskEntry {
    task: Arc<RwLock<ConversionTask>>,
    cancel: CancelToken,
}

pub struct TaskRegistry {
    engine: Arc<ConversionEngine>,
    tasks: RwLock<HashMap<String, TaskEntry>>,
}

impl TaskRegistry {
    pub fn new(engine: Arc<ConversionEngine>) -> Self {
        Self {
            engine,
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Validate and launch a batch. Returns the task id immediately; the
    /// conversion itself runs on a blocking thread.
    ///
    /// Must be called from within a Tokio runtime. Validation errors (a
    /// missing input, an unwritable output directory) are returned here
    /// rather than recorded on a task: a batch that cannot start never
    /// gets an id.
    pub fn start(&self, request: ConversionRequest) -> Result<String, ConvertError> {
        let mut descriptors: Vec<FileDescriptor> = Vec::with_capacity(request.files.len());
        for path in &request.files {
            descriptors.push(validate_file(path)?);
        }
        validate_output_dir(&request.output_directory)?;

        let id = next_task_id();
        let task = Arc::new(RwLock::new(ConversionTask::new(id.clone())));
        let cancel = CancelToken::new();
        {
            let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
            tasks.insert(
                id.clone(),
                TaskEntry {
                    task: Arc::clone(&task),
                    cancel: cancel.clone(),
                },
            );
        }
        info!(task = %id, files = descriptors.len(), target = %request.target_format, "task submitted");

        let engine = Arc::clone(&self.engine);
        let worker_task = Arc::clone(&task);
        let worker_cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let progress_task = Arc::clone(&worker_task);
            let sink = move |message: &str, percent: u8| {
                let mut t = progress_task.write().unwrap_or_else(|e| e.into_inner());
                if t.status == TaskStatus::Pending {
                    t.status = TaskStatus::Processing;
                }
                if !t.status.is_terminal() {
                    t.progress = percent;
                    t.message = message.to_string();
                }
            };

            let outcome = engine.convert(
                &descriptors,
                request.target_format,
                &request.output_directory,
                request.dpi,
                &sink,
                &worker_cancel,
            );

            let mut t = worker_task.write().unwrap_or_else(|e| e.into_inner());
            t.output_files = outcome.success_paths;
            t.degraded_files = outcome.degraded_paths;
            t.failures = outcome.failures;
            t.status = if worker_cancel.is_cancelled() {
                TaskStatus::Cancelled
            } else if t.output_files.is_empty() && !t.failures.is_empty() {
                TaskStatus::Failed
            } else {
                t.progress = 100;
                TaskStatus::Completed
            };
            info!(task = %t.id, status = ?t.status, outputs = t.output_files.len(), failures = t.failures.len(), "task finished");
        });

        Ok(id)
    }

    /// Current state of a task, by value.
    pub fn snapshot(&self, id: &str) -> Result<ConversionTask, ConvertError> {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        match tasks.get(id) {
            Some(entry) => Ok(entry.task.read().unwrap_or_else(|e| e.into_inner()).clone()),
            None => Err(ConvertError::TaskNotFound { id: id.to_string() }),
        }
    }

    /// Request cooperative cancellation. The task reaches `Cancelled` once
    /// its worker observes the flag at the next unit boundary; a task that
    /// already finished keeps its terminal status.
    pub fn cancel(&self, id: &str) -> Result<(), ConvertError> {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        match tasks.get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                warn!(task = %id, "cancellation requested");
                Ok(())
            }
            None => Err(ConvertError::TaskNotFound { id: id.to_string() }),
        }
    }

    /// Snapshots of every known task, in no particular order.
    pub fn list(&self) -> Vec<ConversionTask> {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        tasks
            .values()
            .map(|entry| entry.task.read().unwrap_or_else(|e| e.into_inner()).clone())
            .collect()
    }
}

fn next_task_id() -> String {
    format!("task_{}", Local::now().format("%Y%m%d_%H%M%S_%6f"))
}
