use futures::future::BoxFuture;

use plaint_core::error::Result;

use super::edge::Action;

/// A unit of work with a three-phase contract.
///
/// - `prepare` reads the shared state into a local working value. It gets a
///   shared borrow, so it cannot mutate the state, but it may do read-only I/O.
/// - `execute` does the substantive work (LLM calls, persistence). It never
///   sees the shared state; it communicates through its return value and any
///   side channel captured during `prepare`.
/// - `finalize` is the only phase with mutable access. It folds the result
///   into the state and returns the action label for the next hop.
///
/// Recoverable problems (say, an unparseable model reply) should be absorbed
/// into `Exec`. An `Err` from any phase aborts the whole run.
pub trait Node<S>: Send + Sync {
    type Prep: Send + Sync;
    type Exec: Send;

    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn prepare<'a>(&'a self, state: &'a S) -> BoxFuture<'a, Result<Self::Prep>>;

    fn execute<'a>(&'a self, prep: &'a Self::Prep) -> BoxFuture<'a, Result<Self::Exec>>;

    fn finalize(&self, state: &mut S, prep: Self::Prep, exec: Self::Exec) -> Result<Action>;
}

/// Object-safe view of a node: one full prepare/execute/finalize cycle.
///
/// Implemented for every `Node`, so a flow can hold heterogeneous nodes.
pub trait Step<S>: Send + Sync {
    fn name(&self) -> &'static str;

    fn run<'a>(&'a self, state: &'a mut S) -> BoxFuture<'a, Result<Action>>;
}

impl<S, N> Step<S> for N
where
    S: Send + Sync,
    N: Node<S>,
{
    fn name(&self) -> &'static str {
        <N as Node<S>>::name(self)
    }

    fn run<'a>(&'a self, state: &'a mut S) -> BoxFuture<'a, Result<Action>> {
        Box::pin(async move {
            let prep = self.prepare(state).await?;
            let exec = self.execute(&prep).await?;
            self.finalize(state, prep, exec)
        })
    }
}
