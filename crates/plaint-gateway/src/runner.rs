use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info};

use plaint_core::types::TaskSender;
use plaint_flow::{run_complaint, ComplaintFlow, SharedState};

/// Shown to the client when a run fails without a message of its own.
pub const RUN_FAILED_MESSAGE: &str =
    "Sorry, something went wrong while processing your complaint. Please try again.";

/// Run the complaint flow in the background.
///
/// The run itself executes in an inner task so a panic is caught as a join
/// error. Whatever happens, the task's stream ends: the sentinel after a
/// clean run, an error item and the sentinel otherwise. A node that already
/// ended the stream wins; the later terminator is dropped.
pub fn spawn_run(
    flow: Arc<ComplaintFlow>,
    mut state: SharedState,
    sender: TaskSender,
) -> JoinHandle<()> {
    let task_id = state
        .task_id
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    tokio::spawn(async move {
        info!(task_id = %task_id, "Flow run started");

        let run = tokio::spawn(async move {
            let outcome = run_complaint(&flow, &mut state).await?;
            Ok::<_, plaint_core::PlaintError>((outcome, state.status))
        });

        match run.await {
            Ok(Ok((outcome, status))) => {
                info!(
                    task_id = %task_id,
                    path = ?outcome.path,
                    status = ?status,
                    "Flow run complete"
                );
                sender.finish();
            }
            Ok(Err(e)) => {
                error!(task_id = %task_id, error = %e, "Flow run failed");
                sender.fail(RUN_FAILED_MESSAGE);
            }
            Err(e) => {
                error!(task_id = %task_id, error = %e, "Flow run panicked");
                sender.fail(RUN_FAILED_MESSAGE);
            }
        }
    })
}
