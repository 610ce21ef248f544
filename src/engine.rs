// SPDX-License-Identifier: AGPL-3.0-only

//! Boundary to the external compute engine.
//!
//! The solver, Dirac operator, and gauge smearing live outside this crate.
//! Our obligation ends at handing over a correctly laid-out, checkerboard
//! ordered, locally sliced buffer plus a descriptor of its shape and
//! precision; how the engine consumes them is its business. Engines are
//! injected explicitly — a gauge field never constructs one on demand.

use crate::error::ConfluenceError;
use crate::field::FieldDescriptor;

/// Gauge observables an engine can be asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObservableKind {
    /// Average plaquette.
    Plaquette,
    /// Polyakov loop modulus.
    PolyakovLoop,
    /// Field-strength energy.
    Energy,
    /// Topological charge.
    TopologicalCharge,
}

/// Contract of the external compute engine.
///
/// `bytes` is always the field's canonical checkerboard-ordered buffer as
/// raw bytes; `descriptor` tells the engine its kind, shape, and precision.
pub trait ComputeEngine {
    /// Hand a field to the engine.
    ///
    /// # Errors
    ///
    /// Engine-specific failure (device, shape negotiation).
    fn load_field(
        &mut self,
        bytes: &[u8],
        descriptor: &FieldDescriptor,
    ) -> Result<(), ConfluenceError>;

    /// Read a field back from the engine into `bytes`.
    ///
    /// # Errors
    ///
    /// Engine-specific failure.
    fn save_field(
        &mut self,
        bytes: &mut [u8],
        descriptor: &FieldDescriptor,
    ) -> Result<(), ConfluenceError>;

    /// Compute a scalar observable over the currently loaded gauge field.
    ///
    /// # Errors
    ///
    /// Engine-specific failure, including no field loaded.
    fn compute_observable(&mut self, kind: ObservableKind) -> Result<f64, ConfluenceError>;
}
