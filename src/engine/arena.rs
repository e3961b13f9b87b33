//! Generational arena holding the stage graph.
//!
//! Stages live in slots addressed by [`StageId`]. Removing a stage bumps the
//! slot's generation, so every id and port reference issued for the old
//! occupant stops resolving. Freed slots are reused.

use crate::stage::{Input, InputRef, Output, OutputRef, SchedulingState, Stage, StageId};
use smallvec::SmallVec;

/// Port storage; most stages have one or two ports per side.
pub(crate) type Ports<T> = SmallVec<[T; 2]>;

/// A stage plus the state the engine keeps on its behalf.
pub(crate) struct StageNode {
    pub(crate) name: String,
    /// `None` while the stage's update is running.
    pub(crate) stage: Option<Box<dyn Stage>>,
    pub(crate) inputs: Ports<Input>,
    pub(crate) outputs: Ports<Output>,
    pub(crate) in_supply_backlog: bool,
    pub(crate) in_demand_backlog: bool,
    pub(crate) running: bool,
    pub(crate) updates: u64,
}

impl StageNode {
    pub(crate) fn new(name: String, stage: Box<dyn Stage>) -> Self {
        let inputs = (0..stage.input_count()).map(|_| Input::new()).collect();
        let outputs = (0..stage.output_count()).map(|_| Output::new()).collect();

        Self {
            name,
            stage: Some(stage),
            inputs,
            outputs,
            in_supply_backlog: false,
            in_demand_backlog: false,
            running: false,
            updates: 0,
        }
    }

    pub(crate) fn scheduling_state(&self) -> SchedulingState {
        SchedulingState::from_flags(self.running, self.in_supply_backlog, self.in_demand_backlog)
    }
}

impl std::fmt::Debug for StageNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageNode")
            .field("name", &self.name)
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("state", &self.scheduling_state())
            .finish()
    }
}

struct Slot {
    generation: u32,
    node: Option<StageNode>,
}

/// Slot storage for stage nodes.
#[derive(Default)]
pub(crate) struct Arena {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize,
}

impl Arena {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn insert(&mut self, node: StageNode) -> StageId {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.node.is_none());
            slot.node = Some(node);
            return StageId::new(index, slot.generation);
        }

        let index = u32::try_from(self.slots.len()).expect("stage arena exceeds u32::MAX slots");
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        StageId::new(index, 0)
    }

    /// Remove the node, invalidating `id` and every reference derived from it.
    pub(crate) fn remove(&mut self, id: StageId) -> Option<StageNode> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation || slot.node.is_none() {
            return None;
        }

        let node = slot.node.take();
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        node
    }

    pub(crate) fn contains(&self, id: StageId) -> bool {
        self.get(id).is_some()
    }

    pub(crate) fn get(&self, id: StageId) -> Option<&StageNode> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: StageId) -> Option<&mut StageNode> {
        self.slots
            .get_mut(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// # Panics
    ///
    /// Panics if `id` does not name a live stage.
    pub(crate) fn node(&self, id: StageId) -> &StageNode {
        self.get(id)
            .unwrap_or_else(|| panic!("invalid stage reference {}", id))
    }

    /// # Panics
    ///
    /// Panics if `id` does not name a live stage.
    pub(crate) fn node_mut(&mut self, id: StageId) -> &mut StageNode {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("invalid stage reference {}", id))
    }

    pub(crate) fn is_valid_input(&self, input: InputRef) -> bool {
        self.get(input.stage)
            .is_some_and(|node| input.index < node.inputs.len())
    }

    pub(crate) fn is_valid_output(&self, output: OutputRef) -> bool {
        self.get(output.stage)
            .is_some_and(|node| output.index < node.outputs.len())
    }

    /// # Panics
    ///
    /// Panics if the reference is stale or out of range.
    pub(crate) fn input(&self, input: InputRef) -> &Input {
        self.node(input.stage)
            .inputs
            .get(input.index)
            .unwrap_or_else(|| panic!("invalid input reference {}:{}", input.stage, input.index))
    }

    /// # Panics
    ///
    /// Panics if the reference is stale or out of range.
    pub(crate) fn input_mut(&mut self, input: InputRef) -> &mut Input {
        self.node_mut(input.stage)
            .inputs
            .get_mut(input.index)
            .unwrap_or_else(|| panic!("invalid input reference {}:{}", input.stage, input.index))
    }

    /// # Panics
    ///
    /// Panics if the reference is stale or out of range.
    pub(crate) fn output(&self, output: OutputRef) -> &Output {
        self.node(output.stage)
            .outputs
            .get(output.index)
            .unwrap_or_else(|| {
                panic!("invalid output reference {}:{}", output.stage, output.index)
            })
    }

    /// # Panics
    ///
    /// Panics if the reference is stale or out of range.
    pub(crate) fn output_mut(&mut self, output: OutputRef) -> &mut Output {
        self.node_mut(output.stage)
            .outputs
            .get_mut(output.index)
            .unwrap_or_else(|| {
                panic!("invalid output reference {}:{}", output.stage, output.index)
            })
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (StageId, &StageNode)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node
                .as_ref()
                .map(|node| (StageId::new(index as u32, slot.generation), node))
        })
    }
}
