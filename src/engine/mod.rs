//! The engine: owner of the stage graph and its two backlogs.
//!
//! # Scheduling Model
//!
//! ```text
//!            supply backlog (FIFO)              demand backlog (LIFO)
//!   ┌──────────────────────────────┐     ┌──────────────────────────────┐
//!   │ stages whose input just got  │     │ stages whose output demand   │
//!   │ a packet                     │     │ changed or slot freed        │
//!   └──────────────┬───────────────┘     └───────────────┬──────────────┘
//!                  └─────────────┐         ┌─────────────┘
//!                                ▼         ▼
//!                             pop one (DrainOrder)
//!                                    │
//!                                    ▼
//!                           Stage::update(ctx) ──► may push more entries
//! ```
//!
//! [`Engine::drain`] pops one entry at a time and updates the stage, until
//! both backlogs are empty (quiescence). Each backlog holds a stage at most
//! once. Updates run on the calling thread; the engine is `Send` but not
//! shared.
//!
//! # Example
//!
//! ```rust
//! use demandflow::demand::Demand;
//! use demandflow::engine::Engine;
//! use demandflow::packet::Packet;
//! use demandflow::stages::{FrameSink, PacketSource, SinkStage, SourceStage};
//!
//! struct Counter(u64);
//!
//! impl PacketSource for Counter {
//!     fn next_packet(&mut self) -> Option<Packet> {
//!         self.0 += 1;
//!         let packet = Packet::new(self.0 as i64, b"x".as_slice());
//!         Some(if self.0 == 3 { packet.with_end_of_stream() } else { packet })
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Collect(Vec<i64>);
//!
//! impl FrameSink for Collect {
//!     fn accept(&mut self, packet: Packet) {
//!         self.0.push(packet.pts());
//!     }
//!
//!     fn demand(&self) -> Demand {
//!         Demand::Positive
//!     }
//! }
//!
//! let mut engine = Engine::new();
//! let src = engine.add_stage("src", SourceStage::new(Counter(0)));
//! let sink = engine.add_stage("sink", SinkStage::new(Collect::default()));
//! engine.connect(src.output(0), sink.input(0));
//! engine.validate().unwrap();
//!
//! engine.request_update(sink);
//! engine.drain();
//! assert!(engine.is_quiescent());
//! ```

pub(crate) mod arena;
pub(crate) mod backlog;
mod config;
mod handoff;
pub(crate) mod ops;
mod stats;

pub use backlog::BacklogKind;
pub use config::{DrainOrder, EngineConfig};
pub use handoff::UpdateRequester;
pub use stats::{DrainReport, EngineStats};

use crate::demand::Demand;
use crate::error::{Error, Result};
use crate::observability;
use crate::packet::Packet;
use crate::stage::{
    Input, InputRef, Output, OutputRef, PortDirection, SchedulingState, Stage, StageId,
    UpdateContext,
};
use arena::{Arena, StageNode};
use backlog::Backlogs;
use daggy::Dag;
use handoff::RequestQueue;
use std::collections::HashMap;
use std::time::Instant;

/// Owns the stage graph and drains its backlogs.
pub struct Engine {
    config: EngineConfig,
    arena: Arena,
    backlogs: Backlogs,
    requests: RequestQueue,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::from_valid_config(EngineConfig::default())
    }

    /// Create an engine with a custom configuration.
    pub fn with_config(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: EngineConfig) -> Self {
        observability::init_metrics();
        Self {
            config,
            arena: Arena::new(),
            backlogs: Backlogs::new(),
            requests: RequestQueue::new(),
        }
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine's name.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    // ========================================================================
    // Graph
    // ========================================================================

    /// Add a stage. Its ports are created from its input and output counts.
    pub fn add_stage(&mut self, name: impl Into<String>, stage: impl Stage + 'static) -> StageId {
        self.add_boxed_stage(name, Box::new(stage))
    }

    /// Add an already boxed stage.
    pub fn add_boxed_stage(&mut self, name: impl Into<String>, stage: Box<dyn Stage>) -> StageId {
        let name = name.into();
        tracing::debug!(
            "adding stage '{}' ({} inputs, {} outputs)",
            name,
            stage.input_count(),
            stage.output_count()
        );
        self.arena.insert(StageNode::new(name, stage))
    }

    /// Remove a stage and return it.
    ///
    /// Every port is disconnected and every held packet flushed first, and
    /// the stage's backlog entries are dropped. Afterwards `id` and every
    /// port reference derived from it are invalid. Returns `None` if `id`
    /// was already invalid.
    pub fn remove_stage(&mut self, id: StageId) -> Option<Box<dyn Stage>> {
        let node = self.arena.get(id)?;
        let input_count = node.inputs.len();
        let downstream: Vec<InputRef> = node.outputs.iter().filter_map(Output::mate).collect();

        for index in 0..input_count {
            self.disconnect_input(id.input(index));
        }
        for input in downstream {
            self.disconnect_input(input);
        }

        self.backlogs.purge(id);
        let node = self.arena.remove(id)?;
        tracing::debug!("removed stage '{}'", node.name);
        node.stage
    }

    /// Connect `output` to `input`.
    ///
    /// # Panics
    ///
    /// Panics if either reference is invalid, if the input is already
    /// connected, or if the output is already connected.
    pub fn connect(&mut self, output: OutputRef, input: InputRef) {
        assert!(
            self.arena.is_valid_output(output),
            "invalid output reference {}:{}",
            output.stage,
            output.index
        );
        assert!(
            self.arena.is_valid_input(input),
            "invalid input reference {}:{}",
            input.stage,
            input.index
        );
        assert!(
            !self.arena.output(output).is_connected(),
            "output is already connected to an input"
        );

        self.arena.input_mut(input).connect(output);
        self.arena.output_mut(output).connect(input);

        tracing::debug!(
            "connected '{}' output {} -> '{}' input {}",
            self.arena.node(output.stage).name,
            output.index,
            self.arena.node(input.stage).name,
            input.index
        );
    }

    /// Flush and disconnect `input` from its mate. No-op if unconnected.
    ///
    /// # Panics
    ///
    /// Panics if `input` is invalid.
    pub fn disconnect_input(&mut self, input: InputRef) {
        let port = self.arena.input_mut(input);
        port.flush();
        port.set_prepared(false);
        let Some(mate) = port.disconnect() else {
            return;
        };

        if self.arena.is_valid_output(mate) {
            self.arena.output_mut(mate).disconnect();
        }
        tracing::debug!(
            "disconnected input {} of '{}'",
            input.index,
            self.arena.node(input.stage).name
        );
    }

    /// Check if `id` names a live stage.
    pub fn contains_stage(&self, id: StageId) -> bool {
        self.arena.contains(id)
    }

    /// Check if `input` names an existing port on a live stage.
    pub fn is_valid_input(&self, input: InputRef) -> bool {
        self.arena.is_valid_input(input)
    }

    /// Check if `output` names an existing port on a live stage.
    pub fn is_valid_output(&self, output: OutputRef) -> bool {
        self.arena.is_valid_output(output)
    }

    /// The input named by `input`.
    ///
    /// # Panics
    ///
    /// Panics if the reference is invalid.
    pub fn input(&self, input: InputRef) -> &Input {
        self.arena.input(input)
    }

    /// The output named by `output`.
    ///
    /// # Panics
    ///
    /// Panics if the reference is invalid.
    pub fn output(&self, output: OutputRef) -> &Output {
        self.arena.output(output)
    }

    /// Name a stage was added with.
    pub fn stage_name(&self, id: StageId) -> Option<&str> {
        self.arena.get(id).map(|node| node.name.as_str())
    }

    /// Find a stage by name.
    pub fn find_stage(&self, name: &str) -> Option<StageId> {
        self.arena
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// Number of live stages.
    pub fn stage_count(&self) -> usize {
        self.arena.len()
    }

    /// Number of times the stage's update has run.
    pub fn stage_updates(&self, id: StageId) -> Option<u64> {
        self.arena.get(id).map(|node| node.updates)
    }

    /// Scheduling state of a stage.
    pub fn scheduling_state(&self, id: StageId) -> Option<SchedulingState> {
        self.arena.get(id).map(StageNode::scheduling_state)
    }

    /// Validate the graph structure.
    ///
    /// Checks that:
    /// - Every input and output is connected
    /// - The graph is acyclic
    pub fn validate(&self) -> Result<()> {
        let mut dag: Dag<StageId, ()> = Dag::new();
        let indices: HashMap<StageId, _> = self
            .arena
            .iter()
            .map(|(id, _)| (id, dag.add_node(id)))
            .collect();

        for (id, node) in self.arena.iter() {
            if let Some(index) = node.inputs.iter().position(|i| !i.is_connected()) {
                return Err(Error::UnconnectedPort {
                    stage: node.name.clone(),
                    direction: PortDirection::Input,
                    index,
                });
            }

            for (index, output) in node.outputs.iter().enumerate() {
                let Some(mate) = output.mate() else {
                    return Err(Error::UnconnectedPort {
                        stage: node.name.clone(),
                        direction: PortDirection::Output,
                        index,
                    });
                };

                dag.add_edge(indices[&id], indices[&mate.stage], ())
                    .map_err(|_| Error::Cycle {
                        from: node.name.clone(),
                        to: self.arena.node(mate.stage).name.clone(),
                    })?;
            }
        }

        Ok(())
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Queue `id` for supply. Returns `false` if it was already queued.
    ///
    /// # Panics
    ///
    /// Panics if `id` is invalid.
    pub fn push_to_supply_backlog(&mut self, id: StageId) -> bool {
        self.backlogs.push_supply(&mut self.arena, id)
    }

    /// Queue `id` for demand. Returns `false` if it was already queued.
    ///
    /// # Panics
    ///
    /// Panics if `id` is invalid.
    pub fn push_to_demand_backlog(&mut self, id: StageId) -> bool {
        self.backlogs.push_demand(&mut self.arena, id)
    }

    /// Ask for `id` to be updated on the next drain.
    ///
    /// # Panics
    ///
    /// Panics if `id` is invalid.
    pub fn request_update(&mut self, id: StageId) {
        self.push_to_supply_backlog(id);
    }

    /// A handle other threads can use to request updates.
    pub fn update_requester(&self) -> UpdateRequester {
        self.requests.requester()
    }

    /// Set the demand on `input` from outside any update.
    ///
    /// If the value stored on the mate output changed, the upstream stage is
    /// queued for demand.
    ///
    /// # Panics
    ///
    /// Panics if `input` is invalid.
    pub fn set_demand(&mut self, input: InputRef, demand: Demand) {
        ops::set_demand(
            &mut self.arena,
            &mut self.backlogs,
            &self.config.name,
            input,
            demand,
        );
    }

    /// Supply `packet` on `output` from outside any update.
    ///
    /// # Panics
    ///
    /// Panics if `output` is invalid or unconnected, or if the downstream
    /// slot is occupied.
    pub fn supply_packet(&mut self, output: OutputRef, packet: Packet) {
        ops::supply_packet(
            &mut self.arena,
            &mut self.backlogs,
            &self.config.name,
            output,
            packet,
        );
    }

    /// Take the packet pending on `input` from outside any update.
    ///
    /// # Panics
    ///
    /// Panics if `input` is invalid.
    pub fn take_packet(&mut self, input: InputRef, request_another: bool) -> Option<Packet> {
        ops::take_packet(&mut self.arena, &mut self.backlogs, input, request_another)
    }

    /// Check if both backlogs are empty.
    pub fn is_quiescent(&self) -> bool {
        self.backlogs.is_empty()
    }

    /// Current backlog lengths as `(supply, demand)`.
    pub fn backlog_len(&self) -> (usize, usize) {
        (self.backlogs.supply_len(), self.backlogs.demand_len())
    }

    /// Lifetime statistics.
    pub fn stats(&self) -> &EngineStats {
        &self.backlogs.stats
    }

    /// Update stages until both backlogs are empty.
    ///
    /// Pending cross-thread requests are moved into the supply backlog first.
    /// If [`EngineConfig::max_updates_per_drain`] is set, the drain stops
    /// once that many updates ran and reports `saturated` if work remains.
    pub fn drain(&mut self) -> DrainReport {
        let span = self
            .config
            .tracing
            .drain_spans
            .then(|| observability::span_drain(&self.config.name, self.config.tracing.level));
        let _guard = span.as_ref().map(|span| span.enter());

        let started = Instant::now();
        self.collect_requests();

        let mut report = DrainReport::default();
        loop {
            if let Some(limit) = self.config.max_updates_per_drain {
                if report.updates() >= limit {
                    report.saturated = !self.backlogs.is_empty();
                    break;
                }
            }

            let Some((id, kind)) = self.backlogs.pop(&mut self.arena, self.config.drain_order)
            else {
                break;
            };

            if !self.update_stage(id) {
                continue;
            }

            match kind {
                BacklogKind::Supply => {
                    report.supply_updates += 1;
                    self.backlogs.stats.supply_updates += 1;
                }
                BacklogKind::Demand => {
                    report.demand_updates += 1;
                    self.backlogs.stats.demand_updates += 1;
                }
            }
        }

        let elapsed = started.elapsed();
        let stats = &mut self.backlogs.stats;
        stats.drains += 1;
        stats.last_drain_time = elapsed;
        if report.saturated {
            stats.saturated_drains += 1;
            tracing::warn!(
                "engine '{}' hit its update limit with {} supply / {} demand entries left",
                self.config.name,
                self.backlogs.supply_len(),
                self.backlogs.demand_len()
            );
        }

        observability::record_drain_time(&self.config.name, elapsed);
        self.backlogs.record_depth(&self.config.name);
        tracing::trace!(
            "engine '{}' drained: {} supply, {} demand updates in {:?}",
            self.config.name,
            report.supply_updates,
            report.demand_updates,
            elapsed
        );

        report
    }

    fn collect_requests(&mut self) {
        for id in self.requests.drain() {
            if self.arena.contains(id) {
                self.backlogs.push_supply(&mut self.arena, id);
            } else {
                tracing::debug!("dropping update request for removed stage {}", id);
            }
        }
    }

    /// Run one stage's update. Returns `false` if the stage is gone.
    fn update_stage(&mut self, id: StageId) -> bool {
        let Some(node) = self.arena.get_mut(id) else {
            return false;
        };
        let Some(mut stage) = node.stage.take() else {
            return false;
        };
        node.running = true;

        let span = self
            .config
            .tracing
            .stage_spans
            .then(|| {
                observability::span_stage(&self.config.name, &node.name, self.config.tracing.level)
            });
        let _guard = span.as_ref().map(|span| span.enter());

        {
            let mut ctx =
                UpdateContext::new(id, &self.config.name, &mut self.arena, &mut self.backlogs);
            stage.update(&mut ctx);
        }

        let node = self.arena.node_mut(id);
        node.stage = Some(stage);
        node.running = false;
        node.updates += 1;
        observability::record_stage_update(&self.config.name, &node.name);
        true
    }

    // ========================================================================
    // Preparation and flushing
    // ========================================================================

    /// Prepare `input` and everything upstream of it.
    ///
    /// The input's stage is asked for an allocator; the mate output's stage
    /// is then prepared with it and names which of its own inputs to prepare
    /// next. Outputs whose stage does not adopt the allocator copy supplied
    /// packets into it.
    ///
    /// # Panics
    ///
    /// Panics if any reference on the walk is invalid.
    pub fn prepare_input(&mut self, input: InputRef) {
        let mut pending = vec![input];

        while let Some(input) = pending.pop() {
            let allocator = self
                .arena
                .node_mut(input.stage)
                .stage
                .as_mut()
                .and_then(|stage| stage.prepare_input(input.index));

            let port = self.arena.input_mut(input);
            port.set_prepared(true);
            let Some(mate) = port.mate() else {
                tracing::debug!("prepared unconnected input {}:{}", input.stage, input.index);
                continue;
            };

            let mut upstream = Vec::new();
            let adopted = match self.arena.node_mut(mate.stage).stage.as_mut() {
                Some(stage) => stage.prepare_output(mate.index, allocator.as_ref(), &mut |i| {
                    upstream.push(i)
                }),
                None => false,
            };

            let copy_allocator = if adopted { None } else { allocator };
            self.arena
                .output_mut(mate)
                .set_copy_allocator(copy_allocator);

            pending.extend(upstream.into_iter().map(|i| mate.stage.input(i)));
        }
    }

    /// Unprepare `input` and, as far as stages propagate it, everything
    /// upstream of it.
    ///
    /// # Panics
    ///
    /// Panics if any reference on the walk is invalid.
    pub fn unprepare_input(&mut self, input: InputRef) {
        let mut pending = vec![input];

        while let Some(input) = pending.pop() {
            if let Some(stage) = self.arena.node_mut(input.stage).stage.as_mut() {
                stage.unprepare_input(input.index);
            }

            let port = self.arena.input_mut(input);
            port.set_prepared(false);
            let Some(mate) = port.mate() else {
                continue;
            };

            let mut upstream = Vec::new();
            if let Some(stage) = self.arena.node_mut(mate.stage).stage.as_mut() {
                stage.unprepare_output(mate.index, &mut |i| upstream.push(i));
            }
            self.arena.output_mut(mate).set_copy_allocator(None);

            pending.extend(upstream.into_iter().map(|i| mate.stage.input(i)));
        }
    }

    /// Flush `output` and everything downstream of it.
    ///
    /// # Panics
    ///
    /// Panics if any reference on the walk is invalid.
    pub fn flush_output(&mut self, output: OutputRef) {
        self.flush_walk(vec![output], Vec::new());
    }

    /// Flush `input` and everything downstream of it.
    ///
    /// # Panics
    ///
    /// Panics if any reference on the walk is invalid.
    pub fn flush_input(&mut self, input: InputRef) {
        self.flush_walk(Vec::new(), vec![input]);
    }

    fn flush_walk(&mut self, mut outputs: Vec<OutputRef>, mut inputs: Vec<InputRef>) {
        loop {
            if let Some(input) = inputs.pop() {
                self.arena.input_mut(input).flush();

                let mut downstream = Vec::new();
                if let Some(stage) = self.arena.node_mut(input.stage).stage.as_mut() {
                    stage.flush_input(input.index, &mut |o| downstream.push(o));
                }
                outputs.extend(downstream.into_iter().map(|o| input.stage.output(o)));
            } else if let Some(output) = outputs.pop() {
                let mate = self.arena.output(output).mate();
                if let Some(stage) = self.arena.node_mut(output.stage).stage.as_mut() {
                    stage.flush_output(output.index);
                }
                inputs.extend(mate);
            } else {
                break;
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("name", &self.config.name)
            .field("stages", &self.arena.len())
            .field("supply_backlog", &self.backlogs.supply_len())
            .field("demand_backlog", &self.backlogs.demand_len())
            .finish()
    }
}
