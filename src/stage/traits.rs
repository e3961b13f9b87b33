//! The stage contract.

use super::UpdateContext;
use crate::memory::PayloadAllocator;
use std::sync::Arc;

/// A processing node in the engine's graph.
///
/// Stages do not own their ports. The engine keeps inputs, outputs and the
/// scheduling flags in the stage's arena node and hands the stage an
/// [`UpdateContext`] when it runs. A stage only holds its own processing
/// state.
///
/// # Update
///
/// [`update`](Self::update) is called whenever the stage is popped from the
/// supply backlog (an input received a packet) or the demand backlog (demand
/// on one of its outputs changed, or a downstream stage freed its slot). It
/// must be safe to call repeatedly and must not assume why it was called;
/// inspect the ports instead.
///
/// Update is synchronous. Blocking work belongs outside it; feed results back
/// through an [`UpdateRequester`](crate::engine::UpdateRequester).
///
/// # Preparation and teardown
///
/// The remaining methods default to sensible no-ops. The `upstream` and
/// `downstream` callbacks take a port index on *this* stage and tell the
/// engine to continue the walk through that port.
pub trait Stage: Send {
    /// Number of inputs. Must not change after the stage is added.
    fn input_count(&self) -> usize;

    /// Number of outputs. Must not change after the stage is added.
    fn output_count(&self) -> usize;

    /// Consume from inputs, produce into outputs, adjust demand.
    fn update(&mut self, ctx: &mut UpdateContext<'_>);

    /// Prepare input `index`.
    ///
    /// Returns the allocator upstream producers should draw payloads from,
    /// if this stage needs one.
    fn prepare_input(&mut self, index: usize) -> Option<Arc<dyn PayloadAllocator>> {
        let _ = index;
        None
    }

    /// Prepare output `index`.
    ///
    /// `allocator` is what the downstream input asked for. Return `true` if
    /// this stage will draw its payloads from it; otherwise the engine copies
    /// supplied packets into it. Call `upstream` for each input that must be
    /// prepared in turn; the default prepares all of them.
    fn prepare_output(
        &mut self,
        index: usize,
        allocator: Option<&Arc<dyn PayloadAllocator>>,
        upstream: &mut dyn FnMut(usize),
    ) -> bool {
        let _ = (index, allocator);
        for input in 0..self.input_count() {
            upstream(input);
        }
        false
    }

    /// Release resources held for input `index`.
    fn unprepare_input(&mut self, index: usize) {
        let _ = index;
    }

    /// Release resources held for output `index`.
    ///
    /// Call `upstream` for each input whose teardown must propagate to the
    /// stage above before this one lets go of its resources.
    fn unprepare_output(&mut self, index: usize, upstream: &mut dyn FnMut(usize)) {
        let _ = (index, upstream);
    }

    /// Drop state tied to input `index` after its pending packet was flushed.
    ///
    /// Call `downstream` for each output the flush must continue through; the
    /// default flushes all of them.
    fn flush_input(&mut self, index: usize, downstream: &mut dyn FnMut(usize)) {
        let _ = index;
        for output in 0..self.output_count() {
            downstream(output);
        }
    }

    /// Drop state tied to output `index` (cached packets, requests in
    /// flight).
    fn flush_output(&mut self, index: usize) {
        let _ = index;
    }

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Scheduling state of a stage. This is not media state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchedulingState {
    /// Not queued and not running.
    #[default]
    Idle,
    /// Waiting in the supply backlog.
    QueuedForSupply,
    /// Waiting in the demand backlog.
    QueuedForDemand,
    /// Waiting in both backlogs.
    QueuedForBoth,
    /// Update is executing.
    Running,
}

impl SchedulingState {
    pub(crate) fn from_flags(running: bool, supply: bool, demand: bool) -> Self {
        match (running, supply, demand) {
            (true, _, _) => Self::Running,
            (false, true, true) => Self::QueuedForBoth,
            (false, true, false) => Self::QueuedForSupply,
            (false, false, true) => Self::QueuedForDemand,
            (false, false, false) => Self::Idle,
        }
    }

    /// Check if the stage waits in at least one backlog.
    pub fn is_queued(&self) -> bool {
        matches!(
            self,
            Self::QueuedForSupply | Self::QueuedForDemand | Self::QueuedForBoth
        )
    }
}
