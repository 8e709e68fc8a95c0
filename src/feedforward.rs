//! Pending measurement-controlled Pauli corrections.
//!
//! While a circuit is being compiled, a correction may be known to depend on
//! a measurement that has not happened yet: "if event E measures true, apply
//! X to qubit Q". [`ControlledPauliMaps`] stores those pending corrections
//! keyed by the controlling event, together with a reverse index from target
//! qubit to controlling events.
//!
//! The reverse index is the performance-critical structure: applying a
//! Clifford gate to a qubit must update every pending correction that touches
//! it, and scanning all controls per gate would be quadratic. The index is
//! maintained transactionally with every mutation; tests compare it against a
//! from-scratch recomputation.

use std::collections::{BTreeMap, BTreeSet};

use crate::coords::{Axis, XY, XYT};
use crate::pauli::PauliMap;

/// A map from controlling event to the Pauli corrections it would trigger,
/// with a reverse target→controls index kept incrementally consistent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlledPauliMaps {
    controls: BTreeMap<XYT, PauliMap<XY>>,
    target_to_controls: BTreeMap<XY, BTreeSet<XYT>>,
}

impl ControlledPauliMaps {
    pub fn new() -> Self {
        ControlledPauliMaps::default()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// The pending corrections controlled by `control` (empty map if none).
    pub fn pauli_map_for(&self, control: XYT) -> PauliMap<XY> {
        self.controls.get(&control).cloned().unwrap_or_default()
    }

    /// Iterate (control, corrections) pairs in event order.
    pub fn iter(&self) -> impl Iterator<Item = (XYT, &PauliMap<XY>)> + '_ {
        self.controls.iter().map(|(&c, p)| (c, p))
    }

    /// All controlling events with a pending effect on any of `targets`,
    /// deduplicated, in event order.
    pub fn controls_affecting(
        &self,
        targets: impl IntoIterator<Item = XY>,
    ) -> BTreeSet<XYT> {
        let mut found = BTreeSet::new();
        for target in targets {
            if let Some(controls) = self.target_to_controls.get(&target) {
                found.extend(controls.iter().copied());
            }
        }
        found
    }

    /// Register "if `control` measures true, apply X to `target`".
    pub fn feedforward_x(&mut self, control: XYT, target: XY) {
        self.controls.entry(control).or_default().x(target);
        self.resync(control, target);
    }

    /// Register "if `control` measures true, apply Z to `target`".
    pub fn feedforward_z(&mut self, control: XYT, target: XY) {
        self.controls.entry(control).or_default().z(target);
        self.resync(control, target);
    }

    /// Conjugate every pending correction touching either endpoint by
    /// CNOT(control_qubit → target_qubit).
    pub fn cnot(&mut self, control_qubit: XY, target_qubit: XY) {
        let affected = self.controls_affecting([control_qubit, target_qubit]);
        for control in affected {
            if let Some(pmap) = self.controls.get_mut(&control) {
                pmap.cnot(control_qubit, target_qubit);
            }
            self.resync(control, control_qubit);
            self.resync(control, target_qubit);
        }
    }

    /// Conjugate every pending correction touching `target` by a Hadamard.
    pub fn hadamard(&mut self, target: XY) {
        let affected = self.controls_affecting([target]);
        for control in affected {
            if let Some(pmap) = self.controls.get_mut(&control) {
                pmap.hadamard(target);
            }
            self.resync(control, target);
        }
    }

    /// Whether `control`'s pending effect would flip a measurement of
    /// `target` along `axis`.
    pub fn flips(&self, control: XYT, target: XY, axis: Axis) -> bool {
        self.controls
            .get(&control)
            .is_some_and(|pmap| pmap.flips(target, axis))
    }

    /// Drop `control`'s pending effect on `target` (it has been consumed, by
    /// conversion into a classical edge or by re-initialization).
    pub fn remove_target(&mut self, control: XYT, target: XY) {
        if let Some(pmap) = self.controls.get_mut(&control) {
            pmap.set(target, 0);
        }
        self.resync(control, target);
    }

    /// Relabel every controlling event through `f` (used when composing
    /// stacks; `f` must be injective over the stored events).
    pub fn map_controls(&self, f: impl Fn(XYT) -> XYT) -> ControlledPauliMaps {
        let mut result = ControlledPauliMaps::new();
        for (&control, pmap) in &self.controls {
            let key = f(control);
            for (target, mask) in pmap.iter() {
                result.controls.entry(key).or_default().set(target, mask);
                result
                    .target_to_controls
                    .entry(target)
                    .or_default()
                    .insert(key);
            }
        }
        result
    }

    /// Edge-set union in place (controls merge by Pauli product).
    pub fn inline_union(&mut self, other: &ControlledPauliMaps) {
        for (control, pmap) in other.iter() {
            for (target, mask) in pmap.iter() {
                let entry = self.controls.entry(control).or_default();
                entry.set(target, entry.get(target) ^ mask);
                self.resync(control, target);
            }
        }
    }

    /// Recompute the reverse index from the forward map and compare; exposed
    /// so tests can assert transactional consistency after op sequences.
    pub fn reverse_index_is_consistent(&self) -> bool {
        let mut recomputed: BTreeMap<XY, BTreeSet<XYT>> = BTreeMap::new();
        for (&control, pmap) in &self.controls {
            for target in pmap.targets() {
                recomputed.entry(target).or_default().insert(control);
            }
        }
        recomputed == self.target_to_controls
    }

    /// Bring the reverse index in line with the forward map for one
    /// (control, target) cell, dropping empty rows on both sides.
    fn resync(&mut self, control: XYT, target: XY) {
        let present = self
            .controls
            .get(&control)
            .map(|pmap| pmap.get(target) != 0)
            .unwrap_or(false);
        if present {
            self.target_to_controls.entry(target).or_default().insert(control);
        } else {
            if let Some(controls) = self.target_to_controls.get_mut(&target) {
                controls.remove(&control);
                if controls.is_empty() {
                    self.target_to_controls.remove(&target);
                }
            }
            if self.controls.get(&control).is_some_and(|p| p.is_empty()) {
                self.controls.remove(&control);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pauli::{X_MASK, Z_MASK};

    fn ev(t: i32) -> XYT {
        XYT::new(0, 0, t)
    }

    #[test]
    fn test_feedforward_registers_and_indexes() {
        let mut maps = ControlledPauliMaps::new();
        let q = XY::new(2, 3);
        maps.feedforward_x(ev(0), q);
        assert_eq!(maps.pauli_map_for(ev(0)).get(q), X_MASK);
        assert_eq!(maps.controls_affecting([q]).len(), 1);
        assert!(maps.reverse_index_is_consistent());
    }

    #[test]
    fn test_cancelling_feedforward_clears_index() {
        let mut maps = ControlledPauliMaps::new();
        let q = XY::new(1, 1);
        maps.feedforward_x(ev(0), q);
        maps.feedforward_x(ev(0), q);
        assert!(maps.is_empty(), "X·X = I must drop the control entirely");
        assert!(maps.controls_affecting([q]).is_empty());
        assert!(maps.reverse_index_is_consistent());
    }

    #[test]
    fn test_hadamard_rotates_pending_corrections() {
        let mut maps = ControlledPauliMaps::new();
        let q = XY::new(0, 1);
        maps.feedforward_x(ev(2), q);
        maps.hadamard(q);
        assert_eq!(maps.pauli_map_for(ev(2)).get(q), Z_MASK);
        assert!(maps.reverse_index_is_consistent());
    }

    #[test]
    fn test_cnot_spreads_pending_corrections() {
        let mut maps = ControlledPauliMaps::new();
        let c = XY::new(0, 0);
        let t = XY::new(1, 0);
        maps.feedforward_x(ev(1), c);
        maps.cnot(c, t);
        // The pending X on the cnot's control now also covers the target.
        assert_eq!(maps.pauli_map_for(ev(1)).get(c), X_MASK);
        assert_eq!(maps.pauli_map_for(ev(1)).get(t), X_MASK);
        assert_eq!(maps.controls_affecting([t]).len(), 1);
        assert!(maps.reverse_index_is_consistent());
    }

    #[test]
    fn test_remove_target_consumes_effect() {
        let mut maps = ControlledPauliMaps::new();
        let a = XY::new(0, 0);
        let b = XY::new(0, 1);
        maps.feedforward_x(ev(0), a);
        maps.feedforward_z(ev(0), b);
        maps.remove_target(ev(0), a);
        assert!(maps.controls_affecting([a]).is_empty());
        assert_eq!(maps.pauli_map_for(ev(0)).get(b), Z_MASK);
        maps.remove_target(ev(0), b);
        assert!(maps.is_empty());
        assert!(maps.reverse_index_is_consistent());
    }

    #[test]
    fn test_reverse_index_consistency_after_mixed_sequence() {
        let mut maps = ControlledPauliMaps::new();
        let cells: Vec<XY> = (0..4).map(|i| XY::new(i, i % 2)).collect();
        maps.feedforward_x(ev(0), cells[0]);
        maps.feedforward_z(ev(1), cells[1]);
        maps.feedforward_x(ev(1), cells[2]);
        maps.hadamard(cells[0]);
        maps.cnot(cells[1], cells[2]);
        maps.cnot(cells[2], cells[3]);
        maps.hadamard(cells[3]);
        maps.feedforward_z(ev(2), cells[3]);
        maps.remove_target(ev(1), cells[1]);
        assert!(
            maps.reverse_index_is_consistent(),
            "reverse index must equal a from-scratch recomputation"
        );
    }

    #[test]
    fn test_map_controls_shifts_events() {
        let mut maps = ControlledPauliMaps::new();
        let q = XY::new(3, 3);
        maps.feedforward_x(ev(0), q);
        let shifted = maps.map_controls(|e| e.shifted_t(5));
        assert_eq!(shifted.pauli_map_for(ev(5)).get(q), X_MASK);
        assert!(shifted.pauli_map_for(ev(0)).is_empty());
        assert!(shifted.reverse_index_is_consistent());
    }

    #[test]
    fn test_inline_union_merges_by_product() {
        let mut a = ControlledPauliMaps::new();
        let q = XY::new(1, 2);
        a.feedforward_x(ev(0), q);
        let mut b = ControlledPauliMaps::new();
        b.feedforward_x(ev(0), q);
        b.feedforward_z(ev(1), q);
        a.inline_union(&b);
        assert!(a.pauli_map_for(ev(0)).is_empty(), "X·X cancels in the union");
        assert_eq!(a.pauli_map_for(ev(1)).get(q), Z_MASK);
        assert!(a.reverse_index_is_consistent());
    }
}
