//! Integration tests for graph building and draining.
//!
//! These tests verify that:
//! - Packets flow through source, transform and sink stages in order
//! - Structural misuse panics with a descriptive message
//! - Removed stages invalidate their references
//! - Allocator preparation and pooled payloads work end to end
//! - Update requests from other threads are picked up by the next drain

use demandflow::demand::Demand;
use demandflow::engine::{DrainOrder, Engine, EngineConfig};
use demandflow::error::Error;
use demandflow::memory::{PayloadAllocator, PoolAllocator};
use demandflow::observability::TracingConfig;
use demandflow::packet::Packet;
use demandflow::stage::{Stage, UpdateContext};
use demandflow::stages::{
    FrameSink, IterSource, PacketSource, SinkStage, SourceStage, TransformStage,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

// ============================================================================
// Helpers
// ============================================================================

/// `n` packets with pts `0..n`, the last one flagged end of stream.
fn numbered(n: i64) -> IterSource<impl Iterator<Item = Packet> + Send> {
    IterSource::new((0..n).map(move |i| {
        let packet = Packet::new(i, [i as u8; 4].as_slice()).with_sequence(i as u64);
        if i == n - 1 {
            packet.with_end_of_stream()
        } else {
            packet
        }
    }))
}

/// Records `(pts, end_of_stream)` of every accepted packet.
#[derive(Clone, Default)]
struct Collector {
    seen: Arc<Mutex<Vec<(i64, bool)>>>,
}

impl Collector {
    fn pts(&self) -> Vec<i64> {
        self.seen.lock().unwrap().iter().map(|(pts, _)| *pts).collect()
    }

    fn last_is_eos(&self) -> bool {
        self.seen.lock().unwrap().last().is_some_and(|(_, eos)| *eos)
    }
}

impl FrameSink for Collector {
    fn accept(&mut self, packet: Packet) {
        self.seen
            .lock()
            .unwrap()
            .push((packet.pts(), packet.is_end_of_stream()));
    }
}

/// Does nothing; used to probe port bookkeeping.
struct Inert {
    inputs: usize,
    outputs: usize,
}

impl Stage for Inert {
    fn input_count(&self) -> usize {
        self.inputs
    }

    fn output_count(&self) -> usize {
        self.outputs
    }

    fn update(&mut self, _ctx: &mut UpdateContext<'_>) {}
}

fn run_pipeline(config: EngineConfig, n: i64) -> Collector {
    let collector = Collector::default();
    let mut engine = Engine::with_config(config).unwrap();

    let src = engine.add_stage("src", SourceStage::new(numbered(n)));
    let filter = engine.add_stage("identity", TransformStage::new(Some::<Packet>));
    let sink = engine.add_stage("sink", SinkStage::new(collector.clone()));
    engine.connect(src.output(0), filter.input(0));
    engine.connect(filter.output(0), sink.input(0));
    engine.validate().unwrap();

    engine.request_update(sink);
    let report = engine.drain();
    assert!(!report.saturated);
    assert!(engine.is_quiescent());

    collector
}

// ============================================================================
// Data flow
// ============================================================================

#[test]
fn test_three_stage_identity_pipeline() {
    let collector = run_pipeline(EngineConfig::named("identity"), 10);

    assert_eq!(collector.pts(), (0..10).collect::<Vec<_>>());
    assert!(collector.last_is_eos());
}

#[test]
fn test_three_stage_update_counts_per_packet() {
    for n in [1_i64, 5, 10] {
        let collector = Collector::default();
        let mut engine = Engine::new();

        let src = engine.add_stage("src", SourceStage::new(numbered(n)));
        let filter = engine.add_stage("identity", TransformStage::new(Some::<Packet>));
        let sink = engine.add_stage("sink", SinkStage::new(collector.clone()));
        engine.connect(src.output(0), filter.input(0));
        engine.connect(filter.output(0), sink.input(0));

        engine.request_update(sink);
        let report = engine.drain();
        assert_eq!(collector.pts().len() as i64, n);

        // Per packet: one update each for source and sink, two for the
        // filter (the supply that forwards it, then the demand entry the
        // sink's take pushes). Plus the sink's start, the filter's first
        // demand update and the source's final wake after end of stream.
        let n = n as u64;
        assert_eq!(engine.stage_updates(src), Some(n + 1));
        assert_eq!(engine.stage_updates(filter), Some(2 * n + 1));
        assert_eq!(engine.stage_updates(sink), Some(n + 1));
        assert_eq!(report.supply_updates as u64, 2 * n + 1);
        assert_eq!(report.demand_updates as u64, 2 * n + 2);
    }
}

#[test]
fn test_alternate_drain_order_delivers_same_stream() {
    let config = EngineConfig::named("alternate")
        .with_drain_order(DrainOrder::Alternate)
        .with_tracing(TracingConfig::all());
    let collector = run_pipeline(config, 10);

    assert_eq!(collector.pts(), (0..10).collect::<Vec<_>>());
    assert!(collector.last_is_eos());
}

#[test]
fn test_update_limit_spreads_work_over_drains() {
    let collector = Collector::default();
    let config = EngineConfig::named("bounded").with_max_updates_per_drain(3);
    let mut engine = Engine::with_config(config).unwrap();

    let src = engine.add_stage("src", SourceStage::new(numbered(5)));
    let sink = engine.add_stage("sink", SinkStage::new(collector.clone()));
    engine.connect(src.output(0), sink.input(0));
    engine.request_update(sink);

    let mut drains = 0;
    loop {
        let report = engine.drain();
        drains += 1;
        assert!(report.updates() <= 3);
        if !report.saturated {
            break;
        }
    }

    assert!(drains > 1);
    assert_eq!(collector.pts(), vec![0, 1, 2, 3, 4]);
    assert_eq!(engine.stats().drains, drains);
    assert!(engine.stats().saturated_drains >= 1);
}

#[test]
fn test_stats_track_supplies() {
    let collector = Collector::default();
    let mut engine = Engine::new();
    let src = engine.add_stage("src", SourceStage::new(numbered(4)));
    let sink = engine.add_stage("sink", SinkStage::new(collector.clone()));
    engine.connect(src.output(0), sink.input(0));

    engine.request_update(sink);
    engine.drain();

    let stats = engine.stats();
    assert_eq!(stats.packets_supplied, 4);
    assert!(stats.demand_changes >= 2); // Positive, then Negative after EOS
    assert_eq!(stats.updates(), stats.supply_updates + stats.demand_updates);
    assert!(engine.stage_updates(sink).unwrap() >= 5);
}

// ============================================================================
// Structural misuse
// ============================================================================

#[test]
#[should_panic(expected = "input is already connected")]
fn test_connect_input_twice_panics() {
    let mut engine = Engine::new();
    let a = engine.add_stage("a", Inert { inputs: 0, outputs: 1 });
    let b = engine.add_stage("b", Inert { inputs: 0, outputs: 1 });
    let sink = engine.add_stage("sink", Inert { inputs: 1, outputs: 0 });

    engine.connect(a.output(0), sink.input(0));
    engine.connect(b.output(0), sink.input(0));
}

#[test]
#[should_panic(expected = "output is already connected to an input")]
fn test_connect_output_twice_panics() {
    let mut engine = Engine::new();
    let src = engine.add_stage("src", Inert { inputs: 0, outputs: 1 });
    let a = engine.add_stage("a", Inert { inputs: 1, outputs: 0 });
    let b = engine.add_stage("b", Inert { inputs: 1, outputs: 0 });

    engine.connect(src.output(0), a.input(0));
    engine.connect(src.output(0), b.input(0));
}

#[test]
#[should_panic(expected = "slot is occupied")]
fn test_supply_into_occupied_slot_panics() {
    let mut engine = Engine::new();
    let src = engine.add_stage("src", Inert { inputs: 0, outputs: 1 });
    let sink = engine.add_stage("sink", Inert { inputs: 1, outputs: 0 });
    engine.connect(src.output(0), sink.input(0));

    engine.supply_packet(src.output(0), Packet::new(0, b"a".as_slice()));
    engine.supply_packet(src.output(0), Packet::new(1, b"b".as_slice()));
}

#[test]
#[should_panic(expected = "packet supplied to unconnected output")]
fn test_supply_unconnected_output_panics() {
    let mut engine = Engine::new();
    let src = engine.add_stage("src", Inert { inputs: 0, outputs: 1 });
    engine.supply_packet(src.output(0), Packet::new(0, b"a".as_slice()));
}

#[test]
#[should_panic(expected = "invalid input reference")]
fn test_stale_input_reference_panics() {
    let mut engine = Engine::new();
    let sink = engine.add_stage("sink", Inert { inputs: 1, outputs: 0 });
    engine.remove_stage(sink);
    let _ = engine.input(sink.input(0));
}

#[test]
fn test_removed_slot_reuse_keeps_old_ids_invalid() {
    let mut engine = Engine::new();
    let old = engine.add_stage("old", Inert { inputs: 1, outputs: 1 });
    engine.remove_stage(old);
    let new = engine.add_stage("new", Inert { inputs: 1, outputs: 1 });

    assert_eq!(old.index(), new.index());
    assert_ne!(old.generation(), new.generation());
    assert!(!engine.contains_stage(old));
    assert!(!engine.is_valid_input(old.input(0)));
    assert!(!engine.is_valid_output(old.output(0)));
    assert!(engine.is_valid_input(new.input(0)));
    assert!(!engine.is_valid_input(new.input(1)));
    assert_eq!(engine.stage_name(new), Some("new"));
    assert_eq!(engine.find_stage("new"), Some(new));
    assert_eq!(engine.stage_count(), 1);
}

#[test]
fn test_remove_middle_stage_disconnects_neighbours() {
    let mut engine = Engine::new();
    let src = engine.add_stage("src", Inert { inputs: 0, outputs: 1 });
    let mid = engine.add_stage("mid", Inert { inputs: 1, outputs: 1 });
    let sink = engine.add_stage("sink", Inert { inputs: 1, outputs: 0 });
    engine.connect(src.output(0), mid.input(0));
    engine.connect(mid.output(0), sink.input(0));
    engine.supply_packet(mid.output(0), Packet::new(0, b"held".as_slice()));

    assert!(engine.remove_stage(mid).is_some());

    assert!(!engine.output(src.output(0)).is_connected());
    assert!(!engine.input(sink.input(0)).is_connected());
    assert!(!engine.input(sink.input(0)).has_packet());

    // The freed ports can be rewired.
    engine.connect(src.output(0), sink.input(0));
    assert!(engine.validate().is_ok());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validate_rejects_cycle() {
    let mut engine = Engine::new();
    let a = engine.add_stage("a", Inert { inputs: 1, outputs: 1 });
    let b = engine.add_stage("b", Inert { inputs: 1, outputs: 1 });
    let c = engine.add_stage("c", Inert { inputs: 1, outputs: 1 });
    engine.connect(a.output(0), b.input(0));
    engine.connect(b.output(0), c.input(0));
    engine.connect(c.output(0), a.input(0));

    let err = engine.validate().unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));
    assert!(err.to_string().contains("cycle"));
}

#[test]
fn test_validate_rejects_self_loop() {
    let mut engine = Engine::new();
    let a = engine.add_stage("a", Inert { inputs: 1, outputs: 1 });
    engine.connect(a.output(0), a.input(0));

    assert!(matches!(engine.validate(), Err(Error::Cycle { .. })));
}

#[test]
fn test_validate_rejects_dangling_output() {
    let mut engine = Engine::new();
    engine.add_stage("src", Inert { inputs: 0, outputs: 1 });

    assert!(matches!(
        engine.validate(),
        Err(Error::UnconnectedPort { index: 0, .. })
    ));
}

// ============================================================================
// Allocators
// ============================================================================

/// Allocates from the downstream allocator when offered one.
struct PooledSource {
    allocator: Option<Arc<dyn PayloadAllocator>>,
    next: i64,
    count: i64,
}

impl PacketSource for PooledSource {
    fn next_packet(&mut self) -> Option<Packet> {
        if self.next >= self.count {
            return None;
        }
        let allocator = self.allocator.clone()?;
        let payload = allocator.allocate(8).ok()?;
        let packet = Packet::with_allocator(self.next, payload, allocator);
        self.next += 1;
        Some(packet)
    }

    fn use_allocator(&mut self, allocator: Arc<dyn PayloadAllocator>) -> bool {
        self.allocator = Some(allocator);
        true
    }
}

#[test]
fn test_adopted_pool_allocator_recycles_payloads() {
    let pool = Arc::new(PoolAllocator::new(64, 2).unwrap());
    let collector = Collector::default();
    let mut engine = Engine::new();

    let src = engine.add_stage(
        "src",
        SourceStage::new(PooledSource {
            allocator: None,
            next: 0,
            count: 6,
        }),
    );
    let sink = engine.add_stage(
        "sink",
        SinkStage::new(collector.clone()).with_allocator(pool.clone()),
    );
    engine.connect(src.output(0), sink.input(0));

    engine.prepare_input(sink.input(0));
    assert!(engine.input(sink.input(0)).is_prepared());
    assert!(engine.output(src.output(0)).copy_allocator().is_none());

    engine.request_update(sink);
    engine.drain();

    assert_eq!(collector.pts(), vec![0, 1, 2, 3, 4, 5]);
    let stats = pool.stats();
    assert_eq!(stats.allocations, 6);
    assert_eq!(stats.available, 2);
    assert_eq!(stats.exhausted, 0);
}

#[test]
fn test_copy_allocator_used_when_not_adopted() {
    let pool = Arc::new(PoolAllocator::new(64, 1).unwrap());
    let collector = Collector::default();
    let mut engine = Engine::new();

    let src = engine.add_stage("src", SourceStage::new(numbered(3)));
    let sink = engine.add_stage(
        "sink",
        SinkStage::new(collector.clone()).with_allocator(pool.clone()),
    );
    engine.connect(src.output(0), sink.input(0));

    engine.prepare_input(sink.input(0));
    assert!(engine.output(src.output(0)).copy_allocator().is_some());

    engine.request_update(sink);
    engine.drain();

    assert_eq!(collector.pts(), vec![0, 1, 2]);
    assert_eq!(pool.stats().allocations, 3);
    assert_eq!(pool.available(), 1);

    engine.unprepare_input(sink.input(0));
    assert!(!engine.input(sink.input(0)).is_prepared());
    assert!(engine.output(src.output(0)).copy_allocator().is_none());
}

#[test]
fn test_flush_drops_pooled_packets_back_to_pool() {
    let pool = Arc::new(PoolAllocator::new(16, 1).unwrap());
    let mut engine = Engine::new();
    let src = engine.add_stage("src", Inert { inputs: 0, outputs: 1 });
    let sink = engine.add_stage("sink", Inert { inputs: 1, outputs: 0 });
    engine.connect(src.output(0), sink.input(0));

    let payload = pool.allocate(16).unwrap();
    let allocator: Arc<dyn PayloadAllocator> = pool.clone();
    engine.supply_packet(src.output(0), Packet::with_allocator(0, payload, allocator));
    assert_eq!(pool.available(), 0);

    engine.flush_output(src.output(0));
    assert!(!engine.input(sink.input(0)).has_packet());
    assert_eq!(pool.available(), 1);
}

// ============================================================================
// Cross-thread requests
// ============================================================================

/// Hands out packets another thread deposits.
#[derive(Clone, Default)]
struct Mailbox {
    packets: Arc<Mutex<VecDeque<Packet>>>,
}

impl PacketSource for Mailbox {
    fn next_packet(&mut self) -> Option<Packet> {
        self.packets.lock().unwrap().pop_front()
    }
}

#[test]
fn test_update_requested_from_another_thread() {
    let mailbox = Mailbox::default();
    let collector = Collector::default();
    let mut engine = Engine::new();

    let src = engine.add_stage("src", SourceStage::new(mailbox.clone()));
    let sink = engine.add_stage("sink", SinkStage::new(collector.clone()));
    engine.connect(src.output(0), sink.input(0));

    engine.request_update(sink);
    engine.drain();
    assert!(collector.pts().is_empty());
    assert_eq!(engine.output(src.output(0)).demand(), Demand::Positive);

    let requester = engine.update_requester();
    let producer = std::thread::spawn(move || {
        mailbox
            .packets
            .lock()
            .unwrap()
            .push_back(Packet::new(42, b"late".as_slice()));
        requester.request_update(src).unwrap();
    });
    producer.join().unwrap();

    engine.drain();
    assert_eq!(collector.pts(), vec![42]);
    assert!(engine.is_quiescent());
}

#[test]
fn test_with_config_rejects_zero_update_limit() {
    let config = EngineConfig::named("zero").with_max_updates_per_drain(0);
    assert!(matches!(
        Engine::with_config(config),
        Err(Error::InvalidConfig(_))
    ));
}
