use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use plaint_core::error::{PlaintError, Result};
use plaint_core::types::{
    task_channel, MetadataHandle, TaskId, TaskMetadata, TaskReceiver, TaskSender,
};

struct TaskEntry {
    // Held only while a placeholder waits for its producer
    sender: Option<TaskSender>,
    // Held only until the consumer attaches
    receiver: Option<TaskReceiver>,
    metadata: MetadataHandle,
    has_producer: bool,
}

/// Maps task ids to their output queue and metadata.
///
/// Either side may arrive first. Whoever creates the entry creates the
/// queue; the other side picks up its half. One lock serializes every
/// lookup-or-create, so a task id never ends up with two queues.
pub struct TaskRegistry {
    tasks: Mutex<HashMap<TaskId, TaskEntry>>,
}

/// What a producer gets back from [`TaskRegistry::register_producer`].
pub struct ProducerSlot {
    pub task_id: TaskId,
    pub sender: TaskSender,
    pub metadata: MetadataHandle,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, TaskEntry>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the producer of a task, generating an id if none is given.
    ///
    /// A placeholder left by an early consumer is adopted: its metadata is
    /// overwritten in place and its queue is handed to the producer. Fails
    /// with `DuplicateTask` if the id already has a producer.
    pub fn register_producer(
        &self,
        task_id: Option<TaskId>,
        metadata: TaskMetadata,
    ) -> Result<ProducerSlot> {
        let task_id = task_id.unwrap_or_default();
        let mut tasks = self.lock();

        if let Some(entry) = tasks.get_mut(&task_id) {
            if entry.has_producer {
                return Err(PlaintError::DuplicateTask(task_id.to_string()));
            }
            let sender = entry
                .sender
                .take()
                .ok_or_else(|| PlaintError::DuplicateTask(task_id.to_string()))?;
            entry.metadata.replace(metadata);
            entry.has_producer = true;
            debug!(task_id = %task_id, "Producer adopted waiting stream");
            return Ok(ProducerSlot {
                metadata: entry.metadata.clone(),
                task_id,
                sender,
            });
        }

        let (sender, receiver) = task_channel();
        let handle = MetadataHandle::new(metadata);
        tasks.insert(
            task_id.clone(),
            TaskEntry {
                sender: None,
                receiver: Some(receiver),
                metadata: handle.clone(),
                has_producer: true,
            },
        );
        debug!(task_id = %task_id, "Task registered");
        Ok(ProducerSlot {
            task_id,
            sender,
            metadata: handle,
        })
    }

    /// Attach the consumer of a task.
    ///
    /// An unknown id gets a placeholder entry with empty metadata, so a
    /// consumer may arrive before the producer. Fails with `StreamAttached`
    /// if a consumer already holds the queue.
    pub fn attach(&self, task_id: &TaskId) -> Result<(TaskReceiver, MetadataHandle)> {
        let mut tasks = self.lock();

        if let Some(entry) = tasks.get_mut(task_id) {
            let receiver = entry
                .receiver
                .take()
                .ok_or_else(|| PlaintError::StreamAttached(task_id.to_string()))?;
            debug!(task_id = %task_id, "Stream attached");
            return Ok((receiver, entry.metadata.clone()));
        }

        let (sender, receiver) = task_channel();
        let handle = MetadataHandle::default();
        tasks.insert(
            task_id.clone(),
            TaskEntry {
                sender: Some(sender),
                receiver: None,
                metadata: handle.clone(),
                has_producer: false,
            },
        );
        debug!(task_id = %task_id, "Stream attached before its task, waiting");
        Ok((receiver, handle))
    }

    /// Drop a task's entry. Runs already in flight are unaffected.
    pub fn remove(&self, task_id: &TaskId) -> bool {
        let removed = self.lock().remove(task_id).is_some();
        if removed {
            debug!(task_id = %task_id, "Task entry cleaned up");
        }
        removed
    }

    pub fn contains(&self, task_id: &TaskId) -> bool {
        self.lock().contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
