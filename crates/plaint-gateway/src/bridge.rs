use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tracing::debug;

use plaint_core::types::{MetadataHandle, StreamItem, TaskId, TaskReceiver};

use crate::protocol::StreamEvent;
use crate::registry::TaskRegistry;

/// Removes a task's registry entry when the stream goes away, whether it
/// finished or the client disconnected.
struct Cleanup {
    registry: Arc<TaskRegistry>,
    task_id: TaskId,
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        self.registry.remove(&self.task_id);
    }
}

struct Bridge {
    receiver: TaskReceiver,
    metadata: MetadataHandle,
    pending: VecDeque<StreamEvent>,
    ended: bool,
    cleanup: Cleanup,
}

/// Turn a task's output queue into client events.
///
/// Chunks become `content` events and a failure becomes an `error` event.
/// Once the sentinel arrives (or every producer is gone) the stream reads
/// the task metadata, emits it, then emits `done` and ends. Metadata is
/// read only at that point, after the run has written it.
pub fn task_events(
    registry: Arc<TaskRegistry>,
    task_id: TaskId,
    receiver: TaskReceiver,
    metadata: MetadataHandle,
) -> impl Stream<Item = StreamEvent> + Send + 'static {
    let bridge = Bridge {
        receiver,
        metadata,
        pending: VecDeque::new(),
        ended: false,
        cleanup: Cleanup { registry, task_id },
    };

    stream::unfold(bridge, |mut bridge| async move {
        loop {
            if let Some(event) = bridge.pending.pop_front() {
                return Some((event, bridge));
            }
            if bridge.ended {
                return None;
            }

            match bridge.receiver.recv().await {
                Some(StreamItem::Chunk(content)) => {
                    return Some((StreamEvent::Content { content }, bridge));
                }
                Some(StreamItem::Error(error)) => {
                    return Some((StreamEvent::Error { error }, bridge));
                }
                Some(StreamItem::End) | None => {
                    debug!(task_id = %bridge.cleanup.task_id, "End of stream");
                    bridge.ended = true;
                    let metadata = bridge.metadata.snapshot();
                    bridge.pending.push_back(StreamEvent::metadata(metadata));
                    bridge.pending.push_back(StreamEvent::done());
                }
            }
        }
    })
}
