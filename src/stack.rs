//! Multi-round circuit stacks with classical and quantum feedforward.
//!
//! A [`TileStack`] owns a sequence of [`Tile`]s plus the two bookkeeping
//! structures that make measurement-dependent corrections work across rounds:
//!
//! - `prop`: a directed graph over spacetime events; an edge A→B means "if
//!   A's eventual result is true, flip B's recorded result". Pure classical
//!   bookkeeping, applied after simulation in topological order.
//! - `feed`: pending Pauli corrections keyed by a controlling event, to be
//!   applied as physical gates if that event measures true.
//!
//! The load-bearing step is [`TileStack::measure`]: at the moment a target
//! qubit is measured it leaves the quantum system, so every pending quantum
//! correction on it either becomes a classical XOR of two measured bits (when
//! the stored operator would flip the outcome) or evaporates. After that
//! conversion, `feed` never holds a correction on an already-measured target.

use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

use crate::coords::{Axis, NEIGHBOR_OFFSETS, XY, XYT};
use crate::error::Result;
use crate::feedforward::ControlledPauliMaps;
use crate::graph::DirectedGraph;
use crate::pauli::{X_MASK, Z_MASK};
use crate::surface::{Measurement, Surface};
use crate::tile::Tile;

/// A sequence of rounds plus the propagation graph and pending feedforward.
#[derive(Debug, Clone)]
pub struct TileStack {
    tiles: Vec<Tile>,
    prop: DirectedGraph<XYT>,
    feed: ControlledPauliMaps,
}

// Manual impl so the default stack carries its single empty round.
impl Default for TileStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TileStack {
    /// A stack with a single empty round.
    pub fn new() -> Self {
        TileStack {
            tiles: vec![Tile::new()],
            prop: DirectedGraph::new(),
            feed: ControlledPauliMaps::new(),
        }
    }

    pub fn num_tiles(&self) -> usize {
        self.tiles.len()
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn prop(&self) -> &DirectedGraph<XYT> {
        &self.prop
    }

    pub fn feed(&self) -> &ControlledPauliMaps {
        &self.feed
    }

    /// Round index the next operations land in.
    pub fn current_t(&self) -> i32 {
        (self.tiles.len() - 1) as i32
    }

    fn current_tile(&mut self) -> &mut Tile {
        self.tiles.last_mut().expect("stack always holds at least one tile")
    }

    /// Close the current round and start the next one.
    pub fn start_new_tile(&mut self) {
        self.tiles.push(Tile::new());
    }

    /// Hadamard, mirrored into the symbolic tracker and the schedule.
    pub fn hadamard(&mut self, target: XY) {
        self.feed.hadamard(target.plain());
        self.current_tile().hadamard(target);
    }

    /// CNOT, mirrored into the symbolic tracker and the schedule.
    pub fn cnot(&mut self, control: XY, target: XY) -> Result<()> {
        self.feed.cnot(control.plain(), target.plain());
        self.current_tile().cnot(control, target)
    }

    pub fn pauli_x(&mut self, target: XY) {
        self.current_tile().pauli_x(target);
    }

    pub fn pauli_z(&mut self, target: XY) {
        self.current_tile().pauli_z(target);
    }

    /// Register "if `control` measures true, X on `target`".
    pub fn feedforward_x(&mut self, control: XYT, target: XY) {
        self.feed.feedforward_x(control, target.plain());
    }

    /// Register "if `control` measures true, Z on `target`".
    pub fn feedforward_z(&mut self, control: XYT, target: XY) {
        self.feed.feedforward_z(control, target.plain());
    }

    /// Initialize `target` this round. A fresh qubit has no meaningful prior
    /// correction, so pending quantum effects on it are dropped outright.
    pub fn init(&mut self, target: XY, axis: Axis) -> Result<()> {
        let plain = target.plain();
        for control in self.feed.controls_affecting([plain]) {
            self.feed.remove_target(control, plain);
        }
        self.current_tile().init(target, axis)
    }

    /// Measure `target` this round, converting its pending quantum
    /// feedforward into classical propagation edges.
    pub fn measure(&mut self, target: XY, axis: Axis) -> Result<()> {
        let plain = target.plain();
        let event = XYT::new(target.x, target.y, self.current_t());
        for control in self.feed.controls_affecting([plain]) {
            if self.feed.flips(control, plain, axis) {
                self.prop.include_edge(control, event);
            }
            self.feed.remove_target(control, plain);
        }
        self.current_tile().measure(target, axis)
    }

    /// Schedule the four-CNOT stabilizer-extraction circuit on the current
    /// round: initialize enabled ancillas in their basis, run four direction
    /// groups of neighbor CNOTs (X-type ancillas as control, Z-type as
    /// target), padding the schedule between groups, then measure the
    /// ancillas. The two check types walk their neighbors in transposed
    /// orders; with a shared order, an X check and a diagonal Z check would
    /// interleave inconsistently on their two shared data qubits and the Z
    /// ancilla would come out entangled instead of reading the plaquette
    /// parity. Neighbors rejected by `is_enabled` drop out of the product;
    /// all ancilla and neighbor addressing is active-only, so holes are
    /// skipped at simulation time as well.
    pub fn measure_stabilizers(
        &mut self,
        x_targets: &[XY],
        z_targets: &[XY],
        is_enabled: &dyn Fn(XY) -> bool,
    ) -> Result<()> {
        let x_ancillas: Vec<XY> = x_targets
            .iter()
            .filter(|&&xy| is_enabled(xy.plain()))
            .map(|&xy| XY::must_be_active(xy.x, xy.y))
            .collect();
        let z_ancillas: Vec<XY> = z_targets
            .iter()
            .filter(|&&xy| is_enabled(xy.plain()))
            .map(|&xy| XY::must_be_active(xy.x, xy.y))
            .collect();

        for &ancilla in &x_ancillas {
            self.init(ancilla, Axis::X)?;
        }
        for &ancilla in &z_ancillas {
            self.init(ancilla, Axis::Z)?;
        }

        let x_order = NEIGHBOR_OFFSETS;
        let z_order = [(0, -1), (0, 1), (-1, 0), (1, 0)];
        for group in 0..4 {
            let (dx, dy) = x_order[group];
            for &ancilla in &x_ancillas {
                let neighbor = XY::must_be_active(ancilla.x + dx, ancilla.y + dy);
                if is_enabled(neighbor.plain()) {
                    self.cnot(ancilla, neighbor)?;
                }
            }
            let (dx, dy) = z_order[group];
            for &ancilla in &z_ancillas {
                let neighbor = XY::must_be_active(ancilla.x + dx, ancilla.y + dy);
                if is_enabled(neighbor.plain()) {
                    self.cnot(neighbor, ancilla)?;
                }
            }
            self.current_tile().synchronize();
        }

        for &ancilla in &x_ancillas {
            self.measure(ancilla, Axis::X)?;
        }
        for &ancilla in &z_ancillas {
            self.measure(ancilla, Axis::Z)?;
        }
        Ok(())
    }

    /// Horizontal composition: `next`'s rounds run after this stack's, with
    /// all of its event times shifted by this stack's tile count.
    pub fn then(&self, next: &TileStack) -> TileStack {
        let dt = self.tiles.len() as i32;
        let mut result = self.clone();
        result.tiles.extend(next.tiles.iter().cloned());
        result
            .prop
            .inline_union(&next.prop.map_keys(|event| event.shifted_t(dt)));
        result
            .feed
            .inline_union(&next.feed.map_controls(|event| event.shifted_t(dt)));
        result
    }

    /// Simulate every round against `surface`, recording outcomes into
    /// `results` with round indices offset by `base_t`, then resolve the
    /// bookkeeping: classical propagation edges flip recorded results in
    /// topological order, and pending corrections whose controlling event
    /// measured true are applied as physical gates.
    pub fn simulate_on<R: Rng + ?Sized>(
        &self,
        surface: &mut Surface,
        base_t: i32,
        results: &mut BTreeMap<XYT, Measurement>,
        rng: &mut R,
    ) -> Result<()> {
        for (i, tile) in self.tiles.iter().enumerate() {
            tile.simulate_on(surface, base_t + i as i32, results, rng);
        }

        for event in self.prop.topological_order()? {
            let triggered = results
                .get(&event.shifted_t(base_t))
                .map(|m| m.result)
                .unwrap_or(false);
            if triggered {
                for dependent in self.prop.successors(event).collect::<BTreeSet<_>>() {
                    if let Some(m) = results.get_mut(&dependent.shifted_t(base_t)) {
                        m.result = !m.result;
                    }
                }
            }
        }

        for (control, pmap) in self.feed.iter() {
            let triggered = results
                .get(&control.shifted_t(base_t))
                .map(|m| m.result)
                .unwrap_or(false);
            if triggered {
                for (target, mask) in pmap.iter() {
                    if mask & X_MASK != 0 {
                        surface.pauli_x(target);
                    }
                    if mask & Z_MASK != 0 {
                        surface.pauli_z(target);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg64;

    fn rng() -> Pcg64 {
        Pcg64::seed_from_u64(0x57ac)
    }

    #[test]
    fn test_default_stack_holds_one_empty_round() {
        let stack = TileStack::default();
        assert_eq!(stack.num_tiles(), 1);
        assert_eq!(stack.current_t(), 0);
    }

    #[test]
    fn test_lockstep_mirroring() {
        let mut stack = TileStack::new();
        let a = XY::new(0, 0);
        let b = XY::new(1, 0);
        let event = XYT::new(5, 5, 0);
        stack.feedforward_x(event, a);
        stack.cnot(a, b).unwrap();
        // The schedule saw the gate...
        assert!(stack.tiles()[0].column_at(a).is_some());
        // ...and so did the tracker: the pending X spread onto b.
        assert_eq!(stack.feed().pauli_map_for(event).get(b), X_MASK);
        assert!(stack.feed().reverse_index_is_consistent());
    }

    #[test]
    fn test_measure_converts_quantum_to_classical() {
        let mut stack = TileStack::new();
        let a = XY::new(0, 0);
        let b = XY::new(1, 0);
        let a_event = XYT::new(0, 0, 0);
        let b_event = XYT::new(1, 0, 0);

        stack.init(a, Axis::X).unwrap();
        stack.measure(a, Axis::Z).unwrap();
        stack.feedforward_x(a_event, b);
        stack.measure(b, Axis::Z).unwrap();

        // A pending X flips a Z measurement, so a classical edge appears...
        assert!(stack.prop().has_edge(a_event, b_event));
        // ...and the pending correction on the measured target is consumed.
        assert!(stack.feed().controls_affecting([b]).is_empty());
        assert!(stack.feed().is_empty());
    }

    #[test]
    fn test_measure_drops_commuting_feedforward_without_edge() {
        let mut stack = TileStack::new();
        let b = XY::new(1, 0);
        let control = XYT::new(0, 0, 0);
        stack.feedforward_z(control, b);
        stack.measure(b, Axis::Z).unwrap();
        // A Z correction cannot flip a Z measurement: consumed, no edge.
        assert!(stack.prop().is_empty());
        assert!(stack.feed().is_empty());
    }

    #[test]
    fn test_init_drops_pending_feedforward() {
        let mut stack = TileStack::new();
        let b = XY::new(1, 0);
        let control = XYT::new(0, 0, 0);
        stack.feedforward_x(control, b);
        stack.init(b, Axis::Z).unwrap();
        assert!(stack.feed().is_empty(), "fresh qubits carry no prior correction");
        assert!(stack.prop().is_empty(), "dropping is not conversion");
    }

    #[test]
    fn test_classical_propagation_flips_dependent_result() {
        // A measured in Z after an X-basis init is a coin flip; the converted
        // classical edge makes B's recorded result track A's exactly.
        let mut rng = rng();
        for _ in 0..10 {
            let mut stack = TileStack::new();
            let a = XY::new(0, 0);
            let b = XY::new(1, 0);
            stack.init(a, Axis::X).unwrap();
            stack.measure(a, Axis::Z).unwrap();
            stack.feedforward_x(XYT::new(0, 0, 0), b);
            stack.measure(b, Axis::Z).unwrap();

            let mut surface = Surface::new(2, 1);
            let mut results = BTreeMap::new();
            stack.simulate_on(&mut surface, 0, &mut results, &mut rng).unwrap();
            let ma = results[&XYT::new(0, 0, 0)];
            let mb = results[&XYT::new(1, 0, 0)];
            assert!(ma.random, "X-init then Z-measure is a coin flip");
            assert_eq!(
                mb.result, ma.result,
                "recorded B must be raw-false XORed with A"
            );
        }
    }

    #[test]
    fn test_feed_applies_physical_correction_to_open_target() {
        // The control measures deterministically true; the pending X on an
        // unmeasured qubit must be applied as a real gate afterwards.
        let mut rng = rng();
        let mut stack = TileStack::new();
        let a = XY::new(0, 0);
        let b = XY::new(1, 0);
        stack.pauli_x(a);
        stack.measure(a, Axis::Z).unwrap();
        stack.feedforward_x(XYT::new(0, 0, 0), b);

        let mut surface = Surface::new(2, 1);
        let mut results = BTreeMap::new();
        stack.simulate_on(&mut surface, 0, &mut results, &mut rng).unwrap();
        assert_eq!(results[&XYT::new(0, 0, 0)], Measurement::new(true, false));
        assert_eq!(
            surface.measure(b, &mut rng),
            Measurement::new(true, false),
            "the conditional X must have been applied to b"
        );
    }

    #[test]
    fn test_then_shifts_times_and_unions_bookkeeping() {
        let mut first = TileStack::new();
        first.start_new_tile(); // 2 tiles
        let mut second = TileStack::new();
        let b = XY::new(1, 0);
        second.feedforward_x(XYT::new(0, 0, 0), b);
        second.measure(b, Axis::Z).unwrap();

        let combined = first.then(&second);
        assert_eq!(combined.num_tiles(), 3);
        assert!(
            combined.prop().has_edge(XYT::new(0, 0, 2), XYT::new(1, 0, 2)),
            "second stack's round 0 becomes round 2"
        );
    }

    #[test]
    fn test_measure_stabilizers_schedules_and_repeats() {
        let mut rng = rng();
        for _ in 0..5 {
            let mut stack = TileStack::new();
            let ancilla = XY::new(1, 1);
            stack
                .measure_stabilizers(&[ancilla], &[], &|_| true)
                .unwrap();
            stack.start_new_tile();
            stack
                .measure_stabilizers(&[ancilla], &[], &|_| true)
                .unwrap();

            let mut surface = Surface::new(3, 3);
            let mut results = BTreeMap::new();
            stack.simulate_on(&mut surface, 0, &mut results, &mut rng).unwrap();
            let first = results[&XYT::new(1, 1, 0)];
            let second = results[&XYT::new(1, 1, 1)];
            assert!(first.random);
            assert_eq!(second, Measurement::new(first.result, false));
        }
    }

    #[test]
    fn test_measure_stabilizers_skips_disabled_ancilla() {
        let mut rng = rng();
        let mut stack = TileStack::new();
        stack
            .measure_stabilizers(&[XY::new(1, 1)], &[], &|_| true)
            .unwrap();
        let mut surface = Surface::new(3, 3);
        surface.set_disabled(XY::new(1, 1), true);
        let mut results = BTreeMap::new();
        stack.simulate_on(&mut surface, 0, &mut results, &mut rng).unwrap();
        assert!(
            results.is_empty(),
            "a hole's own stabilizer must record nothing"
        );
    }

    #[test]
    fn test_disabled_mask_excludes_stabilizer_from_schedule() {
        let mut stack = TileStack::new();
        let blocked = XY::new(1, 1);
        stack
            .measure_stabilizers(&[blocked, XY::new(3, 1)], &[], &|xy| xy != blocked)
            .unwrap();
        assert!(stack.tiles()[0].measurement_at(XY::must_be_active(1, 1)).is_none());
        assert!(stack.tiles()[0].measurement_at(XY::must_be_active(3, 1)).is_some());
    }
}
