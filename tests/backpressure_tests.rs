//! Integration tests for backpressure and demand propagation.
//!
//! These tests verify that:
//! - Demand changes enqueue the producer once, however often they are set
//! - Negative demand stops production until demand returns
//! - A stalled consumer bounds buffering to one packet per input
//! - Demand mirrors through a chain of transforms in a single drain

use demandflow::demand::Demand;
use demandflow::engine::Engine;
use demandflow::packet::Packet;
use demandflow::stage::{SchedulingState, Stage, UpdateContext};
use demandflow::stages::{FrameSink, IterSource, SinkStage, SourceStage, TransformStage};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

fn numbered(n: i64) -> IterSource<impl Iterator<Item = Packet> + Send> {
    IterSource::new((0..n).map(move |i| {
        let packet = Packet::new(i, b"frame".as_slice());
        if i == n - 1 {
            packet.with_end_of_stream()
        } else {
            packet
        }
    }))
}

/// Accepts packets until `pause_after` arrived, then reports negative demand
/// until reopened.
#[derive(Clone)]
struct Gate {
    accepted: Arc<Mutex<Vec<i64>>>,
    open: Arc<AtomicBool>,
    pause_after: usize,
}

impl Gate {
    fn new(pause_after: usize) -> Self {
        Self {
            accepted: Arc::new(Mutex::new(Vec::new())),
            open: Arc::new(AtomicBool::new(true)),
            pause_after,
        }
    }

    fn accepted(&self) -> Vec<i64> {
        self.accepted.lock().unwrap().clone()
    }
}

impl FrameSink for Gate {
    fn accept(&mut self, packet: Packet) {
        let mut accepted = self.accepted.lock().unwrap();
        accepted.push(packet.pts());
        if accepted.len() == self.pause_after {
            self.open.store(false, Ordering::SeqCst);
        }
    }

    fn demand(&self) -> Demand {
        if self.open.load(Ordering::SeqCst) {
            Demand::Positive
        } else {
            Demand::Negative
        }
    }
}

/// Wants packets but never takes them.
struct Stall;

impl Stage for Stall {
    fn input_count(&self) -> usize {
        1
    }

    fn output_count(&self) -> usize {
        0
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) {
        ctx.set_demand(0, Demand::Positive);
    }
}

/// Output-only stage driven from the test.
struct Feeder;

impl Stage for Feeder {
    fn input_count(&self) -> usize {
        0
    }

    fn output_count(&self) -> usize {
        1
    }

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}
}

#[test]
fn test_repeated_demand_enqueues_once() {
    let mut engine = Engine::new();
    let feeder = engine.add_stage("feeder", Feeder);
    let stall = engine.add_stage("stall", Stall);
    engine.connect(feeder.output(0), stall.input(0));

    for _ in 0..5 {
        engine.set_demand(stall.input(0), Demand::Positive);
    }

    assert_eq!(engine.backlog_len(), (0, 1));
    assert_eq!(engine.stats().demand_changes, 1);
    assert_eq!(engine.stats().demand_pushes, 1);
    assert!(!engine.push_to_demand_backlog(feeder));
    assert_eq!(
        engine.scheduling_state(feeder),
        Some(SchedulingState::QueuedForDemand)
    );

    engine.drain();
    assert_eq!(engine.scheduling_state(feeder), Some(SchedulingState::Idle));
}

#[test]
fn test_negative_demand_stops_production() {
    let gate = Gate::new(3);
    let mut engine = Engine::new();
    let src = engine.add_stage("src", SourceStage::new(numbered(8)));
    let sink = engine.add_stage("sink", SinkStage::new(gate.clone()));
    engine.connect(src.output(0), sink.input(0));

    engine.request_update(sink);
    engine.drain();

    assert_eq!(gate.accepted(), vec![0, 1, 2]);
    assert_eq!(engine.output(src.output(0)).demand(), Demand::Negative);
    assert!(!engine.input(sink.input(0)).has_packet());

    // Poking the source while demand is negative does nothing.
    engine.request_update(src);
    engine.drain();
    assert_eq!(gate.accepted(), vec![0, 1, 2]);

    gate.open.store(true, Ordering::SeqCst);
    engine.request_update(sink);
    engine.drain();
    assert_eq!(gate.accepted(), (0..8).collect::<Vec<_>>());
}

#[test]
fn test_stalled_consumer_bounds_buffering() {
    let mut engine = Engine::new();
    let src = engine.add_stage("src", SourceStage::new(numbered(100)));
    let pass = engine.add_stage("pass", TransformStage::new(Some::<Packet>));
    let stall = engine.add_stage("stall", Stall);
    engine.connect(src.output(0), pass.input(0));
    engine.connect(pass.output(0), stall.input(0));

    engine.request_update(stall);
    engine.drain();

    // One packet parked in front of each consumer, nothing more.
    assert!(engine.input(stall.input(0)).has_packet());
    assert!(engine.input(pass.input(0)).has_packet());
    assert_eq!(engine.output(src.output(0)).demand(), Demand::Negative);
    assert_eq!(engine.stats().packets_supplied, 2);

    for _ in 0..3 {
        engine.request_update(src);
        engine.request_update(pass);
        engine.drain();
    }
    assert_eq!(engine.stats().packets_supplied, 2);
    assert_eq!(engine.input(stall.input(0)).packet().map(Packet::pts), Some(0));
    assert_eq!(engine.input(pass.input(0)).packet().map(Packet::pts), Some(1));
}

#[test]
fn test_demand_mirrors_through_chain() {
    let mut engine = Engine::new();
    let feeder = engine.add_stage("feeder", Feeder);
    let a = engine.add_stage("a", TransformStage::new(Some::<Packet>));
    let b = engine.add_stage("b", TransformStage::new(Some::<Packet>));
    let c = engine.add_stage("c", TransformStage::new(Some::<Packet>));
    let stall = engine.add_stage("stall", Stall);
    engine.connect(feeder.output(0), a.input(0));
    engine.connect(a.output(0), b.input(0));
    engine.connect(b.output(0), c.input(0));
    engine.connect(c.output(0), stall.input(0));
    engine.validate().unwrap();

    engine.request_update(stall);
    let report = engine.drain();

    assert_eq!(engine.output(feeder.output(0)).demand(), Demand::Positive);
    assert_eq!(report.supply_updates, 1);
    assert_eq!(report.demand_updates, 4);
    assert!(engine.is_quiescent());

    // A packet pushed in at the top travels the whole chain in one drain.
    engine.supply_packet(feeder.output(0), Packet::new(9, b"x".as_slice()));
    engine.drain();
    assert_eq!(engine.input(stall.input(0)).packet().map(Packet::pts), Some(9));
    for stage in [a, b, c] {
        assert!(!engine.input(stage.input(0)).has_packet());
    }
}
