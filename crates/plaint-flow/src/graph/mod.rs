//! Flow Engine: a directed graph of three-phase nodes joined by action labels.
//!
//! A `Flow` starts at one node, runs it against a shared state value, and
//! follows the outgoing edge whose label matches the action the node
//! returned. A label with no matching edge ends the run. Graphs may contain
//! cycles; an optional step cap guards against runaway loops.

pub mod edge;
pub mod executor;
pub mod node;

pub use edge::Action;
pub use executor::{Flow, FlowOutcome};
pub use node::{Node, Step};
