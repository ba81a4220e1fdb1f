mod bridge;
mod protocol;
mod registry;
mod routes;
mod runner;
mod server;
mod state;

pub use bridge::task_events;
pub use protocol::{ChatRequest, ChatResponse, StreamEvent, ThreadMetadata};
pub use registry::{ProducerSlot, TaskRegistry};
pub use runner::{spawn_run, RUN_FAILED_MESSAGE};
pub use server::{router, GatewayServer};
pub use state::AppState;
