//! Sparse Pauli operators and their Clifford conjugation.
//!
//! A [`PauliMap`] maps targets to a 2-bit Pauli mask: bit 0 for an X
//! component, bit 1 for a Z component (so I=0, X=1, Z=2, Y=3). Absent entries
//! are identity; zero masks are never stored.
//!
//! Phases are not modeled. The group product is the abelian, sign-free
//! product: each axis component combines by XOR. That is exactly what is
//! needed for Pauli-frame bookkeeping, where only the presence of each factor
//! mod 2 decides whether a recorded measurement flips.

use std::collections::BTreeMap;

use crate::coords::Axis;
use crate::error::{Error, Result};

/// Bitmask for an X component.
pub const X_MASK: u8 = 1;
/// Bitmask for a Z component.
pub const Z_MASK: u8 = 2;

/// The mask carrying the given axis's own component.
pub fn axis_mask(axis: Axis) -> u8 {
    match axis {
        Axis::X => X_MASK,
        Axis::Z => Z_MASK,
    }
}

/// A sparse mapping from target to nonzero Pauli mask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauliMap<T: Ord + Copy> {
    masks: BTreeMap<T, u8>,
}

// Manual impl so targets without `Default` (lattice coordinates) still work.
impl<T: Ord + Copy> Default for PauliMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord + Copy> PauliMap<T> {
    pub fn new() -> Self {
        PauliMap { masks: BTreeMap::new() }
    }

    /// The stored mask for a target (0 when absent).
    pub fn get(&self, target: T) -> u8 {
        self.masks.get(&target).copied().unwrap_or(0)
    }

    /// Store a mask for a target; a zero mask deletes the entry.
    pub fn set(&mut self, target: T, mask: u8) {
        debug_assert!(mask <= 3, "Pauli mask out of range");
        if mask == 0 {
            self.masks.remove(&target);
        } else {
            self.masks.insert(target, mask);
        }
    }

    /// XOR an X factor onto a target.
    pub fn x(&mut self, target: T) {
        self.set(target, self.get(target) ^ X_MASK);
    }

    /// XOR a Z factor onto a target.
    pub fn z(&mut self, target: T) {
        self.set(target, self.get(target) ^ Z_MASK);
    }

    /// XOR a Y factor (both components) onto a target.
    pub fn y(&mut self, target: T) {
        self.set(target, self.get(target) ^ (X_MASK | Z_MASK));
    }

    /// True when no factor is stored anywhere.
    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    /// Number of targets with a nonzero factor.
    pub fn len(&self) -> usize {
        self.masks.len()
    }

    /// Iterate (target, mask) pairs in target order.
    pub fn iter(&self) -> impl Iterator<Item = (T, u8)> + '_ {
        self.masks.iter().map(|(&t, &m)| (t, m))
    }

    /// Targets with a nonzero factor, in order.
    pub fn targets(&self) -> impl Iterator<Item = T> + '_ {
        self.masks.keys().copied()
    }

    /// Conjugate by a Hadamard on `target`: X and Z swap, so the mask flips
    /// between 1 and 2; Y (= 3) and I (= 0) are fixed points.
    pub fn hadamard(&mut self, target: T) {
        let m = self.get(target);
        if m == X_MASK || m == Z_MASK {
            self.set(target, m ^ (X_MASK | Z_MASK));
        }
    }

    /// Conjugate by CNOT(control → target): an X component on the control
    /// propagates forward onto the target, a Z component on the target
    /// propagates backward onto the control.
    pub fn cnot(&mut self, control: T, target: T) {
        if self.get(control) & X_MASK != 0 {
            self.set(target, self.get(target) ^ X_MASK);
        }
        if self.get(target) & Z_MASK != 0 {
            self.set(control, self.get(control) ^ Z_MASK);
        }
    }

    /// Account for a measurement of `target` along `axis`.
    ///
    /// The component along the measurement axis commutes with the measurement
    /// and becomes unobservable, so its bit is cleared. The orthogonal
    /// component survives; it is the one that would flip the recorded result
    /// and still needs a classical correction (see [`PauliMap::flips`]).
    pub fn measure(&mut self, target: T, axis: Axis) {
        self.set(target, self.get(target) & !axis_mask(axis));
    }

    /// Whether this operator flips the outcome of measuring `target` along
    /// `axis`: true iff a component on the orthogonal axis is present.
    pub fn flips(&self, target: T, axis: Axis) -> bool {
        self.get(target) & axis_mask(axis.opposite()) != 0
    }

    /// In-place sign-free group product with `other`.
    pub fn inline_times(&mut self, other: &PauliMap<T>) {
        for (target, mask) in other.iter() {
            if mask & X_MASK != 0 {
                self.x(target);
            }
            if mask & Z_MASK != 0 {
                self.z(target);
            }
        }
    }

    /// Sign-free group product, leaving both operands untouched.
    pub fn times(&self, other: &PauliMap<T>) -> PauliMap<T> {
        let mut result = self.clone();
        result.inline_times(other);
        result
    }

    /// Relabel every target through `f`. Fails if `f` is not injective on the
    /// stored targets.
    pub fn map_targets<U: Ord + Copy>(&self, f: impl Fn(T) -> U) -> Result<PauliMap<U>> {
        let mut result = PauliMap::new();
        for (target, mask) in self.iter() {
            let key = f(target);
            if result.get(key) != 0 {
                return Err(Error::TargetCollision);
            }
            result.set(key, mask);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_works_for_coordinate_targets() {
        let p: PauliMap<crate::coords::XY> = PauliMap::default();
        assert!(p.is_empty(), "default map starts empty");
    }

    #[test]
    fn test_zero_masks_never_stored() {
        let mut p: PauliMap<u32> = PauliMap::new();
        p.x(5);
        p.x(5);
        assert!(p.is_empty(), "X·X = I must delete the entry");
        p.set(7, X_MASK);
        p.set(7, 0);
        assert_eq!(p.get(7), 0);
        assert!(p.is_empty());
    }

    #[test]
    fn test_x_z_compose_to_y() {
        let mut p: PauliMap<u32> = PauliMap::new();
        p.x(1);
        p.z(1);
        assert_eq!(p.get(1), X_MASK | Z_MASK);
        p.y(1);
        assert!(p.is_empty(), "Y·Y = I");
    }

    #[test]
    fn test_hadamard_swaps_x_and_z_only() {
        let mut p: PauliMap<u32> = PauliMap::new();
        p.x(0);
        p.hadamard(0);
        assert_eq!(p.get(0), Z_MASK);
        p.hadamard(0);
        assert_eq!(p.get(0), X_MASK);

        p.z(0); // now Y
        p.hadamard(0);
        assert_eq!(p.get(0), X_MASK | Z_MASK, "Y is a Hadamard fixed point");
        p.hadamard(1);
        assert_eq!(p.get(1), 0, "I is a Hadamard fixed point");
    }

    #[test]
    fn test_hadamard_twice_is_identity() {
        for mask in 0..4u8 {
            let mut p: PauliMap<u32> = PauliMap::new();
            p.set(3, mask);
            p.hadamard(3);
            p.hadamard(3);
            assert_eq!(p.get(3), mask);
        }
    }

    #[test]
    fn test_cnot_propagation() {
        // X on control propagates to target.
        let mut p: PauliMap<u32> = PauliMap::new();
        p.x(0);
        p.cnot(0, 1);
        assert_eq!(p.get(0), X_MASK);
        assert_eq!(p.get(1), X_MASK);

        // Z on target propagates to control.
        let mut q: PauliMap<u32> = PauliMap::new();
        q.z(1);
        q.cnot(0, 1);
        assert_eq!(q.get(0), Z_MASK);
        assert_eq!(q.get(1), Z_MASK);
    }

    #[test]
    fn test_cnot_twice_is_identity() {
        for control_mask in 0..4u8 {
            for target_mask in 0..4u8 {
                let mut p: PauliMap<u32> = PauliMap::new();
                p.set(0, control_mask);
                p.set(1, target_mask);
                p.cnot(0, 1);
                p.cnot(0, 1);
                assert_eq!(p.get(0), control_mask, "c={control_mask} t={target_mask}");
                assert_eq!(p.get(1), target_mask, "c={control_mask} t={target_mask}");
            }
        }
    }

    #[test]
    fn test_measure_clears_own_axis_component() {
        let mut p: PauliMap<u32> = PauliMap::new();
        p.y(0);
        p.measure(0, Axis::X);
        assert_eq!(p.get(0), Z_MASK, "X measurement keeps the Z component");
        let mut q: PauliMap<u32> = PauliMap::new();
        q.y(0);
        q.measure(0, Axis::Z);
        assert_eq!(q.get(0), X_MASK, "Z measurement keeps the X component");
    }

    #[test]
    fn test_measure_is_idempotent() {
        for mask in 0..4u8 {
            let mut p: PauliMap<u32> = PauliMap::new();
            p.set(0, mask);
            p.measure(0, Axis::X);
            let once = p.get(0);
            p.measure(0, Axis::X);
            assert_eq!(p.get(0), once);
        }
    }

    #[test]
    fn test_flips_reports_orthogonal_component() {
        let mut p: PauliMap<u32> = PauliMap::new();
        p.x(0);
        assert!(p.flips(0, Axis::Z), "an X factor flips a Z measurement");
        assert!(!p.flips(0, Axis::X));
        p.y(0); // now Z
        assert!(p.flips(0, Axis::X), "a Z factor flips an X measurement");
        assert!(!p.flips(0, Axis::Z));
    }

    #[test]
    fn test_times_is_elementwise_xor() {
        let mut a: PauliMap<u32> = PauliMap::new();
        a.x(0);
        a.z(1);
        let mut b: PauliMap<u32> = PauliMap::new();
        b.z(0);
        b.z(1);
        let c = a.times(&b);
        assert_eq!(c.get(0), X_MASK | Z_MASK);
        assert_eq!(c.get(1), 0);
        // Self-product is identity.
        assert!(a.times(&a).is_empty());
    }

    #[test]
    fn test_map_targets_rejects_collisions() {
        let mut p: PauliMap<u32> = PauliMap::new();
        p.x(0);
        p.z(3);
        let shifted = p.map_targets(|t| t + 10).unwrap();
        assert_eq!(shifted.get(10), X_MASK);
        assert_eq!(shifted.get(13), Z_MASK);
        let collided = p.map_targets(|_| 0u32);
        assert_eq!(collided.unwrap_err(), Error::TargetCollision);
    }
}
