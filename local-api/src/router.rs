use crate::completion::ControlFlow;
use crate::event::Event;

/// Receives the event of every request together with the control flow to complete it with.
///
/// `route` must return without waiting for the outcome. The implementation reports the outcome
/// later, from wherever it likes, by calling `ControlFlow::done` exactly once.
/// If that never happens the client is left waiting.
pub trait Router: Send + Sync {
    fn route(&self, event: Event, control_flow: ControlFlow);
}

/// Any closure with the right signature is a router, handy for tests and in-process handlers.
impl<F> Router for F
where
    F: Fn(Event, ControlFlow) + Send + Sync,
{
    fn route(&self, event: Event, control_flow: ControlFlow) {
        self(event, control_flow)
    }
}
