//! Grid-of-qubits facade over the tableau simulator.
//!
//! A [`Surface`] owns one simulated qubit per cell of a width×height grid and
//! exposes the Clifford primitives plus the two derived operations the whole
//! engine leans on:
//!
//! - [`Surface::measure_and_reset`]: every measurement is immediately followed
//!   by a deterministic re-preparation to |0⟩, so later logic never reasons
//!   about which branch of a random outcome occurred.
//! - [`Surface::measure_local_stabilizer`]: the canonical four-neighbor
//!   ancilla-based stabilizer readout.
//!
//! Addressing a cell outside the grid, or a disabled cell through an
//! active-only coordinate, is a silent no-op rather than an error; the
//! compiler legitimately schedules operations on a uniform padded lattice.

use rand::Rng;

use crate::chp::ChpState;
use crate::coords::{Axis, NEIGHBOR_OFFSETS, XY};

/// One recorded measurement outcome.
///
/// `random` distinguishes a fresh coin flip from an outcome forced by the
/// stabilizer group. The default value is the "no measurement happened"
/// sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Measurement {
    pub result: bool,
    pub random: bool,
}

impl Measurement {
    pub fn new(result: bool, random: bool) -> Self {
        Measurement { result, random }
    }
}

/// A width×height lattice of simulated qubits.
///
/// `Clone` deep-copies the underlying tableau; the original and the copy
/// never share state.
#[derive(Debug, Clone)]
pub struct Surface {
    width: usize,
    height: usize,
    state: ChpState,
    last_measures: Vec<Measurement>,
    disabled: Vec<bool>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Surface {
            width,
            height,
            state: ChpState::new(width * height),
            last_measures: vec![Measurement::default(); width * height],
            disabled: vec![false; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Linear qubit index for a cell, or None when the cell is out of range
    /// or fails its `must_be_active` requirement.
    fn qubit_at(&self, xy: XY) -> Option<usize> {
        if xy.x < 0 || xy.y < 0 || xy.x >= self.width as i32 || xy.y >= self.height as i32 {
            return None;
        }
        let index = xy.y as usize * self.width + xy.x as usize;
        if xy.must_be_active && self.disabled[index] {
            return None;
        }
        Some(index)
    }

    /// Whether the cell maps to a live qubit under its activity requirement.
    pub fn has_qubit(&self, xy: XY) -> bool {
        self.qubit_at(xy).is_some()
    }

    /// Mark or unmark a cell as a hole. Out-of-range cells are ignored.
    pub fn set_disabled(&mut self, xy: XY, disabled: bool) {
        if let Some(index) = self.qubit_at(xy.plain()) {
            self.disabled[index] = disabled;
        }
    }

    pub fn is_disabled(&self, xy: XY) -> bool {
        self.qubit_at(xy.plain())
            .map(|index| self.disabled[index])
            .unwrap_or(false)
    }

    /// Most recent measurement recorded at a cell.
    pub fn last_measure(&self, xy: XY) -> Measurement {
        self.qubit_at(xy.plain())
            .map(|index| self.last_measures[index])
            .unwrap_or_default()
    }

    pub fn hadamard(&mut self, xy: XY) {
        if let Some(k) = self.qubit_at(xy) {
            self.state.hadamard(k);
        }
    }

    pub fn phase(&mut self, xy: XY) {
        if let Some(k) = self.qubit_at(xy) {
            self.state.phase(k);
        }
    }

    pub fn pauli_x(&mut self, xy: XY) {
        if let Some(k) = self.qubit_at(xy) {
            self.state.pauli_x(k);
        }
    }

    pub fn pauli_z(&mut self, xy: XY) {
        if let Some(k) = self.qubit_at(xy) {
            self.state.pauli_z(k);
        }
    }

    /// CNOT between two cells; silently skipped unless both endpoints map to
    /// live qubits.
    pub fn cnot(&mut self, control: XY, target: XY) {
        if let (Some(c), Some(t)) = (self.qubit_at(control), self.qubit_at(target)) {
            self.state.cnot(c, t);
        }
    }

    /// Measure a cell in the Z basis. Missing qubits yield the sentinel.
    pub fn measure<R: Rng + ?Sized>(&mut self, xy: XY, rng: &mut R) -> Measurement {
        match self.qubit_at(xy) {
            Some(k) => {
                let (result, random) = self.state.measure(k, rng);
                let m = Measurement::new(result, random);
                self.last_measures[k] = m;
                m
            }
            None => Measurement::default(),
        }
    }

    /// Measure a cell and restore it to |0⟩ by conditionally flipping.
    pub fn measure_and_reset<R: Rng + ?Sized>(&mut self, xy: XY, rng: &mut R) -> Measurement {
        match self.qubit_at(xy) {
            Some(k) => {
                let (result, random) = self.state.measure_and_reset(k, rng);
                let m = Measurement::new(result, random);
                self.last_measures[k] = m;
                m
            }
            None => Measurement::default(),
        }
    }

    /// Four-neighbor ancilla-based stabilizer readout centered on `xy`.
    ///
    /// Resets the ancilla, conjugates the active neighbors by Hadamard when
    /// the stabilizer is X-type, folds their parity into the ancilla with
    /// CNOTs, undoes the conjugation, then measures and resets the ancilla.
    /// Disabled neighbors drop out of the product.
    pub fn measure_local_stabilizer<R: Rng + ?Sized>(
        &mut self,
        xy: XY,
        axis: Axis,
        rng: &mut R,
    ) -> Measurement {
        if !self.has_qubit(xy) {
            return Measurement::default();
        }
        self.measure_and_reset(xy, rng);

        let neighbors: Vec<XY> = NEIGHBOR_OFFSETS
            .iter()
            .map(|&(dx, dy)| XY::must_be_active(xy.x + dx, xy.y + dy))
            .collect();

        if axis.is_x() {
            for &neighbor in &neighbors {
                self.hadamard(neighbor);
            }
        }
        for &neighbor in &neighbors {
            self.cnot(neighbor, xy);
        }
        if axis.is_x() {
            for &neighbor in &neighbors {
                self.hadamard(neighbor);
            }
        }
        self.measure_and_reset(xy, rng)
    }
}
