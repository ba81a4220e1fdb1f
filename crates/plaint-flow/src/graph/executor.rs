use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Instant;

use tracing::{debug, info, warn};

use plaint_core::error::{PlaintError, Result};

use super::edge::Action;
use super::node::Step;

/// How a flow run ended.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOutcome<K> {
    /// Nodes executed, in order.
    pub path: Vec<K>,
    /// Action returned by the last node (the one with no matching edge).
    pub last_action: Action,
}

impl<K: Copy> FlowOutcome<K> {
    pub fn last_node(&self) -> Option<K> {
        self.path.last().copied()
    }
}

/// Executes a graph of nodes keyed by `K` against a shared state `S`.
///
/// Strictly sequential: one node runs at a time. Each node owns an edge
/// table from action label to successor; a lookup miss ends the run
/// normally.
pub struct Flow<K, S> {
    start: K,
    nodes: HashMap<K, Box<dyn Step<S>>>,
    edges: HashMap<K, HashMap<Action, K>>,
    max_steps: Option<usize>,
}

impl<K, S> Flow<K, S>
where
    K: Copy + Eq + Hash + Debug + Send + Sync,
    S: Send + Sync,
{
    pub fn new(start: K) -> Self {
        Self {
            start,
            nodes: HashMap::new(),
            edges: HashMap::new(),
            max_steps: None,
        }
    }

    /// Register the node that runs for `key`.
    pub fn node(mut self, key: K, node: impl Step<S> + 'static) -> Self {
        self.nodes.insert(key, Box::new(node));
        self
    }

    /// Route `action` returned by `from` to `to`.
    pub fn edge(mut self, from: K, action: impl Into<Action>, to: K) -> Self {
        self.edges.entry(from).or_default().insert(action.into(), to);
        self
    }

    /// Abort with an error after this many node executions.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn start(&self) -> K {
        self.start
    }

    /// Successor of `from` for `action`, if an edge exists.
    pub fn successor(&self, from: K, action: &Action) -> Option<K> {
        self.edges.get(&from).and_then(|out| out.get(action)).copied()
    }

    /// Run from the start node until a node returns an unrouted action.
    pub async fn run(&self, state: &mut S) -> Result<FlowOutcome<K>> {
        let started = Instant::now();
        let mut current = self.start;
        let mut path = Vec::new();

        loop {
            if let Some(max) = self.max_steps {
                if path.len() >= max {
                    warn!(node = ?current, max_steps = max, "Flow exceeded step limit");
                    return Err(PlaintError::StepLimitExceeded(max));
                }
            }

            let node = self
                .nodes
                .get(&current)
                .ok_or_else(|| PlaintError::UnknownNode(format!("{:?}", current)))?;

            debug!(node = ?current, name = node.name(), "Running flow node");
            path.push(current);
            let action = node.run(state).await?;

            match self.successor(current, &action) {
                Some(next) => {
                    debug!(from = ?current, action = %action, to = ?next, "Following edge");
                    current = next;
                }
                None => {
                    info!(
                        node = ?current,
                        action = %action,
                        steps = path.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Flow complete"
                    );
                    return Ok(FlowOutcome {
                        path,
                        last_action: action,
                    });
                }
            }
        }
    }
}
