//! Port operations that touch more than one stage.
//!
//! These are shared by the engine's public API and by [`UpdateContext`]
//! (crate::stage::UpdateContext). Side effects are confined to the ports
//! named and, where stated, one backlog entry for the stage on the other
//! end.

use super::arena::Arena;
use super::backlog::Backlogs;
use crate::demand::Demand;
use crate::observability;
use crate::packet::Packet;
use crate::stage::{InputRef, OutputRef};

/// Set the demand on `input`.
///
/// The value is stored on the mate output. If it changed, the mate's stage
/// is pushed onto the demand backlog. Unconnected inputs are ignored.
pub(crate) fn set_demand(
    arena: &mut Arena,
    backlogs: &mut Backlogs,
    engine: &str,
    input: InputRef,
    demand: Demand,
) {
    let Some(mate) = arena.input(input).mate() else {
        tracing::trace!("demand set on unconnected input {}:{}", input.stage, input.index);
        return;
    };

    if !arena.output_mut(mate).update_demand(demand) {
        return;
    }

    backlogs.stats.demand_changes += 1;
    observability::record_demand_change(engine, demand);
    tracing::trace!(
        "demand on '{}' output {} is now {}",
        arena.node(mate.stage).name,
        mate.index,
        demand
    );
    backlogs.push_demand(arena, mate.stage);
}

/// Move `packet` from `output` into its mate input and queue the mate's stage
/// for supply.
///
/// # Panics
///
/// Panics if `output` is unconnected or the mate input already holds a
/// packet.
pub(crate) fn supply_packet(
    arena: &mut Arena,
    backlogs: &mut Backlogs,
    engine: &str,
    output: OutputRef,
    packet: Packet,
) {
    let port = arena.output(output);
    let mate = port.mate().unwrap_or_else(|| {
        panic!(
            "packet supplied to unconnected output {}:{}",
            output.stage, output.index
        )
    });

    let packet = match port.copy_allocator() {
        Some(allocator) => match packet.copy_into(allocator) {
            Ok(copy) => copy,
            Err(e) => {
                tracing::warn!(
                    "copy into '{}' allocator failed, supplying original payload: {}",
                    allocator.name(),
                    e
                );
                packet
            }
        },
        None => packet,
    };

    let size = packet.size();
    arena.input_mut(mate).supply_packet_from_output(packet);

    backlogs.stats.packets_supplied += 1;
    observability::record_packet_supplied(engine, &arena.node(output.stage).name, size);
    backlogs.push_supply(arena, mate.stage);
}

/// Take the pending packet from `input`.
///
/// With `request_another`, the mate's stage is pushed onto the demand backlog
/// even if the demand value is unchanged: the slot just freed, so the
/// producer may be able to supply again. Nothing is pushed when the slot was
/// already empty.
pub(crate) fn take_packet(
    arena: &mut Arena,
    backlogs: &mut Backlogs,
    input: InputRef,
    request_another: bool,
) -> Option<Packet> {
    let port = arena.input_mut(input);
    let packet = port.take_packet();
    let mate = port.mate();

    if request_another && packet.is_some() {
        if let Some(mate) = mate {
            backlogs.push_demand(arena, mate.stage);
        }
    }
    packet
}

/// Check if `output` is connected and its mate slot is empty.
pub(crate) fn can_supply(arena: &Arena, output: OutputRef) -> bool {
    arena
        .output(output)
        .mate()
        .is_some_and(|mate| !arena.input(mate).has_packet())
}
