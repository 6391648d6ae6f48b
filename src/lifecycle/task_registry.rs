use crate::error::{CoreError, CoreResult};
use crate::events::EventBus;
use crate::models::events::{Event, EventData, EventOrigin};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::{AbortHandle, JoinHandle};

/// Logical grouping of tracked tasks. API/HARDWARE/RENDER/INPUT failures are
/// treated as critical by the shutdown coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskCategory {
    Api,
    Hardware,
    Render,
    Animation,
    Input,
    EventBus,
    Transition,
    System,
    Background,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

/// Immutable metadata captured at spawn time.
#[derive(Debug, Clone, Serialize)]
pub struct TaskInfo {
    pub id: u64,
    pub category: TaskCategory,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
    pub parent_task_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub info: TaskInfo,
    pub status: TaskStatus,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

struct TrackedEntry {
    record: TaskRecord,
    abort: AbortHandle,
}

/// Handle returned to the spawner; aborting through the registry keeps the
/// record's status accurate.
pub struct TaskHandle {
    pub id: u64,
    join: JoinHandle<()>,
}

impl TaskHandle {
    pub fn abort_handle(&self) -> AbortHandle {
        self.join.abort_handle()
    }

    pub async fn join(self) {
        let _ = self.join.await;
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Central registry of every long-lived task the application spawns.
/// Provides introspection for the API and the drain step of shutdown.
pub struct TaskRegistry {
    entries: Mutex<HashMap<u64, TrackedEntry>>,
    next_id: AtomicU64,
    event_bus: OnceCell<Arc<EventBus>>,
}

impl TaskRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            event_bus: OnceCell::new(),
        })
    }

    /// Wire the bus used for task state broadcasts. Optional; without it
    /// the registry is silent.
    pub fn set_event_bus(&self, bus: Arc<EventBus>) {
        let _ = self.event_bus.set(bus);
    }

    /// Spawn `future` and register it atomically. The record flips to
    /// completed/failed when the future resolves and to cancelled when it is
    /// aborted through [`cancel`](Self::cancel) or
    /// [`cancel_all`](Self::cancel_all).
    pub fn create_tracked_task<F>(
        self: &Arc<Self>,
        category: TaskCategory,
        description: &str,
        future: F,
    ) -> TaskHandle
    where
        F: Future<Output = CoreResult<()>> + Send + 'static,
    {
        self.create_child_task(category, description, None, future)
    }

    pub fn create_child_task<F>(
        self: &Arc<Self>,
        category: TaskCategory,
        description: &str,
        parent_task_id: Option<u64>,
        future: F,
    ) -> TaskHandle
    where
        F: Future<Output = CoreResult<()>> + Send + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let registry = Arc::clone(self);
        let join = tokio::spawn(async move {
            let result = future.await;
            registry.finish(id, result).await;
        });

        let record = TaskRecord {
            info: TaskInfo {
                id,
                category,
                description: description.to_string(),
                created_at: Utc::now(),
                created_by: None,
                parent_task_id,
            },
            status: TaskStatus::Running,
            finished_at: None,
            error: None,
        };

        self.entries.lock().unwrap().insert(
            id,
            TrackedEntry {
                record,
                abort: join.abort_handle(),
            },
        );

        debug!("Task {} registered: {:?} '{}'", id, category, description);
        TaskHandle { id, join }
    }

    async fn finish(&self, id: u64, result: CoreResult<()>) {
        let status = {
            let mut entries = self.entries.lock().unwrap();
            let Some(entry) = entries.get_mut(&id) else {
                return;
            };
            if entry.record.status != TaskStatus::Running {
                // Already marked cancelled; keep that verdict.
                return;
            }

            entry.record.finished_at = Some(Utc::now());
            match result {
                Ok(()) => entry.record.status = TaskStatus::Completed,
                Err(CoreError::Cancelled) => entry.record.status = TaskStatus::Cancelled,
                Err(e) => {
                    warn!(
                        "Task {} '{}' failed: {}",
                        id, entry.record.info.description, e
                    );
                    entry.record.status = TaskStatus::Failed;
                    entry.record.error = Some(e.to_string());
                }
            }
            entry.record.status
        };

        self.broadcast(id, status).await;
    }

    async fn broadcast(&self, id: u64, status: TaskStatus) {
        if let Some(bus) = self.event_bus.get() {
            bus.publish(Event::new(
                EventOrigin::Lifecycle,
                EventData::TaskStateChanged {
                    task_id: id,
                    status: status.as_str().to_string(),
                },
            ))
            .await;
        }
    }

    /// Mark a task cancelled and abort it.
    pub fn cancel(&self, id: u64) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(&id) {
            if entry.record.status == TaskStatus::Running {
                entry.record.status = TaskStatus::Cancelled;
                entry.record.finished_at = Some(Utc::now());
                entry.abort.abort();
                debug!("Task {} cancelled", id);
            }
        }
    }

    /// Cancel every live task except the given ids. Returns how many tasks
    /// were signalled.
    pub fn cancel_all(&self, exclude: &[u64]) -> usize {
        let ids = self.tasks_for_shutdown(exclude);
        let count = ids.len();
        for id in ids {
            self.cancel(id);
        }
        if count > 0 {
            info!("Cancelled {} tracked task(s)", count);
        }
        count
    }

    /// Live tasks eligible for the shutdown drain.
    pub fn tasks_for_shutdown(&self, exclude: &[u64]) -> Vec<u64> {
        let entries = self.entries.lock().unwrap();
        entries
            .values()
            .filter(|e| e.record.status == TaskStatus::Running && !exclude.contains(&e.record.info.id))
            .map(|e| e.record.info.id)
            .collect()
    }

    // === Introspection ===

    pub fn get(&self, id: u64) -> Option<TaskRecord> {
        self.entries
            .lock()
            .unwrap()
            .get(&id)
            .map(|e| e.record.clone())
    }

    pub fn active(&self) -> Vec<TaskRecord> {
        self.by_status(TaskStatus::Running)
    }

    pub fn failed(&self) -> Vec<TaskRecord> {
        self.by_status(TaskStatus::Failed)
    }

    pub fn cancelled(&self) -> Vec<TaskRecord> {
        self.by_status(TaskStatus::Cancelled)
    }

    fn by_status(&self, status: TaskStatus) -> Vec<TaskRecord> {
        let entries = self.entries.lock().unwrap();
        let mut records: Vec<TaskRecord> = entries
            .values()
            .filter(|e| e.record.status == status)
            .map(|e| e.record.clone())
            .collect();
        records.sort_by_key(|r| r.info.id);
        records
    }

    /// Counts per status, for logs and /api/status.
    pub fn summary(&self) -> HashMap<&'static str, usize> {
        let entries = self.entries.lock().unwrap();
        let mut summary = HashMap::new();
        for entry in entries.values() {
            *summary.entry(entry.record.status.as_str()).or_insert(0) += 1;
        }
        summary
    }

    /// Counts per category of live tasks.
    pub fn get_stats(&self) -> HashMap<TaskCategory, usize> {
        let entries = self.entries.lock().unwrap();
        let mut stats = HashMap::new();
        for entry in entries.values() {
            if entry.record.status == TaskStatus::Running {
                *stats.entry(entry.record.info.category).or_insert(0) += 1;
            }
        }
        stats
    }

    /// Records grouped by parent task, roots first.
    pub fn get_task_tree(&self) -> Vec<(TaskRecord, Vec<TaskRecord>)> {
        let entries = self.entries.lock().unwrap();
        let mut roots: Vec<TaskRecord> = entries
            .values()
            .filter(|e| e.record.info.parent_task_id.is_none())
            .map(|e| e.record.clone())
            .collect();
        roots.sort_by_key(|r| r.info.id);

        roots
            .into_iter()
            .map(|root| {
                let mut children: Vec<TaskRecord> = entries
                    .values()
                    .filter(|e| e.record.info.parent_task_id == Some(root.info.id))
                    .map(|e| e.record.clone())
                    .collect();
                children.sort_by_key(|r| r.info.id);
                (root, children)
            })
            .collect()
    }
}
