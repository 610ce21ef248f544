// SPDX-License-Identifier: AGPL-3.0-only

//! Typed lattice field containers over the checkerboard layout.
//!
//! Every field couples a shared [`LatticeTopology`] with one contiguous
//! owned buffer shaped
//!
//!   `[outer…, 2, Lt, Lz, Ly, Lx/2, inner…]`
//!
//! where the outer/inner tensor axes depend on the field kind:
//!
//! | Kind | outer | inner | element |
//! |------|-------|-------|---------|
//! | Gauge | direction (4) | 3×3 color | complex f64 |
//! | Colorvector | — | color (3) | complex f64 |
//! | Fermion | — | spin (4) × color (3) | complex f64 |
//! | Propagator | — | spin² × color² | complex f64 |
//! | StaggeredFermion | — | color (3) | complex f64 |
//! | StaggeredPropagator | — | color² | complex f64 |
//! | Clover | — | (2, 36) | real f64 |
//!
//! Parity slot 0 is the even sublattice, slot 1 the odd, by global
//! `(t+z+y+x) % 2`. A buffer has exactly one logical owner; `even`/`odd`
//! are borrow-checked windows over the parity halves, and `set_data` always
//! takes a defensive copy, so no caller ever aliases a field's storage.

use std::sync::Arc;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::backend::{DeviceSlot, FieldBackend};
use crate::checkerboard::lexico;
use crate::engine::{ComputeEngine, ObservableKind};
use crate::error::ConfluenceError;
use crate::topology::LatticeTopology;

/// Spacetime dimensions.
pub const ND: usize = 4;
/// Spin components per site.
pub const NS: usize = 4;
/// Colors.
pub const NC: usize = 3;

/// Real-component width of a field element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    /// 4-byte floats (`"S"` in QIO metadata).
    Single,
    /// 8-byte floats (`"D"` in QIO metadata).
    Double,
}

impl Precision {
    /// Bytes per real component.
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::Single => 4,
            Self::Double => 8,
        }
    }
}

/// Field kind tag; fixes the tensor axes around the lattice axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    Gauge,
    Colorvector,
    Fermion,
    Propagator,
    StaggeredFermion,
    StaggeredPropagator,
    Clover,
}

impl FieldKind {
    /// Tensor axes in front of the lattice axes (batch dimensions).
    #[must_use]
    pub const fn outer_dims(self) -> &'static [usize] {
        match self {
            Self::Gauge => &[ND],
            _ => &[],
        }
    }

    /// Tensor axes behind the lattice axes (site-local dimensions).
    #[must_use]
    pub const fn inner_dims(self) -> &'static [usize] {
        match self {
            Self::Gauge | Self::StaggeredPropagator => &[NC, NC],
            Self::Colorvector | Self::StaggeredFermion => &[NC],
            Self::Fermion => &[NS, NC],
            Self::Propagator => &[NS, NS, NC, NC],
            // (Ns/2 * Nc)^2 real components per chirality block.
            Self::Clover => &[2, (NS / 2 * NC) * (NS / 2 * NC)],
        }
    }

    /// Full checkerboard buffer shape for this kind on `topo`.
    #[must_use]
    pub fn shape(self, topo: &LatticeTopology) -> Vec<usize> {
        let [lx, ly, lz, lt] = topo.size;
        let mut shape = Vec::with_capacity(self.outer_dims().len() + 5 + self.inner_dims().len());
        shape.extend_from_slice(self.outer_dims());
        shape.extend_from_slice(&[2, lt, lz, ly, lx / 2]);
        shape.extend_from_slice(self.inner_dims());
        shape
    }

    /// Element count of the full buffer: `2 * volume_cb2 * tensor dims`.
    #[must_use]
    pub fn element_count(self, topo: &LatticeTopology) -> usize {
        self.shape(topo).iter().product()
    }
}

/// Shape/precision descriptor handed to the external compute engine along
/// with the raw buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field kind tag.
    pub kind: FieldKind,
    /// Full checkerboard buffer shape.
    pub shape: Vec<usize>,
    /// Real-component width of the canonical in-memory element.
    pub precision: Precision,
}

/// Shared storage core of every concrete field type.
#[derive(Debug)]
struct FieldBuf<T> {
    info: Arc<LatticeTopology>,
    kind: FieldKind,
    shape: Vec<usize>,
    data: Vec<T>,
    slot: DeviceSlot,
}

impl<T: Copy + Default + bytemuck::Pod> FieldBuf<T> {
    fn zeros(info: Arc<LatticeTopology>, kind: FieldKind) -> Self {
        let shape = kind.shape(&info);
        let len = shape.iter().product();
        Self {
            info,
            kind,
            shape,
            data: vec![T::default(); len],
            slot: DeviceSlot::default(),
        }
    }

    fn from_vec(
        info: Arc<LatticeTopology>,
        kind: FieldKind,
        data: Vec<T>,
    ) -> Result<Self, ConfluenceError> {
        let shape = kind.shape(&info);
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(ConfluenceError::ShapeError(format!(
                "{kind:?} buffer holds {} elements, shape {shape:?} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            info,
            kind,
            shape,
            data,
            slot: DeviceSlot::default(),
        })
    }

    /// Defensive copy: the caller's slice is checked and duplicated, never
    /// aliased.
    fn set_data(&mut self, data: &[T]) -> Result<(), ConfluenceError> {
        let expected: usize = self.shape.iter().product();
        if data.len() != expected {
            return Err(ConfluenceError::ShapeError(format!(
                "{:?} buffer holds {} elements, shape {:?} needs {expected}",
                self.kind,
                data.len(),
                self.shape
            )));
        }
        self.data.copy_from_slice(data);
        Ok(())
    }

    /// Independent deep copy of the host buffer (device residency is not
    /// duplicated).
    fn backup(&self) -> Self {
        Self {
            info: Arc::clone(&self.info),
            kind: self.kind,
            shape: self.shape.clone(),
            data: self.data.clone(),
            slot: DeviceSlot::default(),
        }
    }

    fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            kind: self.kind,
            shape: self.shape.clone(),
            precision: Precision::Double,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    fn to_device(&mut self, backend: &dyn FieldBackend) -> Result<(), ConfluenceError> {
        let Self { slot, data, .. } = self;
        backend.to_device(slot, bytemuck::cast_slice(data))
    }

    fn to_host(&mut self, backend: &dyn FieldBackend) -> Result<(), ConfluenceError> {
        let Self { slot, data, .. } = self;
        backend.to_host(slot, bytemuck::cast_slice_mut(data))
    }

    fn even(&self) -> &[T] {
        &self.data[..self.data.len() / 2]
    }

    fn odd(&self) -> &[T] {
        &self.data[self.data.len() / 2..]
    }

    fn even_mut(&mut self) -> &mut [T] {
        let half = self.data.len() / 2;
        &mut self.data[..half]
    }

    fn odd_mut(&mut self) -> &mut [T] {
        let half = self.data.len() / 2;
        &mut self.data[half..]
    }
}

/// Expands the storage plumbing every concrete field type shares.
macro_rules! field_common {
    ($elem:ty) => {
        /// Install a buffer after verifying shape compatibility. Always a
        /// defensive copy; the caller's slice is never aliased.
        ///
        /// # Errors
        ///
        /// [`ConfluenceError::ShapeError`] on an element-count mismatch.
        pub fn set_data(&mut self, data: &[$elem]) -> Result<(), ConfluenceError> {
            self.buf.set_data(data)
        }

        /// Independent deep copy.
        #[must_use]
        pub fn backup(&self) -> Self {
            Self { buf: self.buf.backup() }
        }

        /// Canonical checkerboard-ordered buffer.
        #[must_use]
        pub fn data(&self) -> &[$elem] {
            &self.buf.data
        }

        /// Mutable canonical buffer.
        pub fn data_mut(&mut self) -> &mut [$elem] {
            &mut self.buf.data
        }

        /// Full buffer shape `[outer…, 2, Lt, Lz, Ly, Lx/2, inner…]`.
        #[must_use]
        pub fn shape(&self) -> &[usize] {
            &self.buf.shape
        }

        /// Topology this field lives on.
        #[must_use]
        pub fn info(&self) -> &Arc<LatticeTopology> {
            &self.buf.info
        }

        /// Shape/precision descriptor for engine hand-off.
        #[must_use]
        pub fn descriptor(&self) -> FieldDescriptor {
            self.buf.descriptor()
        }

        /// Raw canonical bytes for engine hand-off.
        #[must_use]
        pub fn as_bytes(&self) -> &[u8] {
            self.buf.as_bytes()
        }

        /// Ensure a device mirror exists (no-op on [`crate::backend::HostBackend`]).
        ///
        /// # Errors
        ///
        /// Backend-specific transfer failure.
        pub fn to_device(&mut self, backend: &dyn FieldBackend) -> Result<(), ConfluenceError> {
            self.buf.to_device(backend)
        }

        /// Ensure the host buffer is current (no-op on [`crate::backend::HostBackend`]).
        ///
        /// # Errors
        ///
        /// Backend-specific transfer failure.
        pub fn to_host(&mut self, backend: &dyn FieldBackend) -> Result<(), ConfluenceError> {
            self.buf.to_host(backend)
        }
    };
}

/// Parity-half views for kinds whose parity axis is outermost.
macro_rules! field_parity_views {
    ($elem:ty) => {
        /// Even-sublattice window (parity slot 0).
        #[must_use]
        pub fn even(&self) -> &[$elem] {
            self.buf.even()
        }

        /// Odd-sublattice window (parity slot 1).
        #[must_use]
        pub fn odd(&self) -> &[$elem] {
            self.buf.odd()
        }

        /// Mutable even window; writes land in the parent buffer.
        pub fn even_mut(&mut self) -> &mut [$elem] {
            self.buf.even_mut()
        }

        /// Mutable odd window; writes land in the parent buffer.
        pub fn odd_mut(&mut self) -> &mut [$elem] {
            self.buf.odd_mut()
        }
    };
}

/// SU(3) link variables, one 3×3 matrix per site and direction.
///
/// Shape `[4, 2, Lt, Lz, Ly, Lx/2, 3, 3]`; a fresh gauge field holds the
/// identity on every link (the ordered configuration).
#[derive(Debug)]
pub struct LatticeGauge {
    buf: FieldBuf<Complex64>,
}

impl LatticeGauge {
    /// New identity-link gauge field.
    #[must_use]
    pub fn new(info: Arc<LatticeTopology>) -> Self {
        let mut buf = FieldBuf::zeros(info, FieldKind::Gauge);
        for link in buf.data.chunks_exact_mut(NC * NC) {
            for c in 0..NC {
                link[c * NC + c] = Complex64::new(1.0, 0.0);
            }
        }
        Self { buf }
    }

    /// Wrap an already checkerboard-ordered buffer.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] on an element-count mismatch.
    pub fn from_data(
        info: Arc<LatticeTopology>,
        data: Vec<Complex64>,
    ) -> Result<Self, ConfluenceError> {
        Ok(Self {
            buf: FieldBuf::from_vec(info, FieldKind::Gauge, data)?,
        })
    }

    field_common!(Complex64);

    /// Links of one direction `mu`, all sites.
    #[must_use]
    pub fn direction(&self, mu: usize) -> &[Complex64] {
        let stride = self.buf.data.len() / ND;
        &self.buf.data[mu * stride..(mu + 1) * stride]
    }

    /// Mutable links of one direction `mu`.
    pub fn direction_mut(&mut self, mu: usize) -> &mut [Complex64] {
        let stride = self.buf.data.len() / ND;
        &mut self.buf.data[mu * stride..(mu + 1) * stride]
    }

    /// Negate time-direction links on the last local time slice when this
    /// process owns the global time boundary (anti-periodic fermion
    /// convention).
    pub fn set_anti_periodic_t(&mut self) {
        if !self.buf.info.owns_t_boundary() {
            return;
        }
        let lt = self.buf.info.size[3];
        let slice = self.buf.info.volume_cb2 / lt * NC * NC;
        let t_dir = self.direction_mut(ND - 1);
        let parity_stride = t_dir.len() / 2;
        for parity in 0..2 {
            let start = parity * parity_stride + (lt - 1) * slice;
            for v in &mut t_dir[start..start + slice] {
                *v = -*v;
            }
        }
    }

    /// Divide spatial-direction links by the bare anisotropy.
    pub fn set_anisotropy(&mut self, anisotropy: f64) {
        let inv = 1.0 / anisotropy;
        let stride = self.buf.data.len() / ND;
        for v in &mut self.buf.data[..stride * (ND - 1)] {
            *v *= inv;
        }
    }

    /// Natural-order copy of the buffer: `[4, Lt, Lz, Ly, Lx, 3, 3]`.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] (cannot occur for a well-formed
    /// field; kept for the shared codec contract).
    pub fn lexico(&self) -> Result<Vec<Complex64>, ConfluenceError> {
        lexico(&self.buf.data, &self.buf.shape, [1, 2, 3, 4, 5])
    }

    /// Average plaquette via the injected engine.
    ///
    /// # Errors
    ///
    /// Engine-specific failure.
    pub fn plaquette(&self, engine: &mut dyn ComputeEngine) -> Result<f64, ConfluenceError> {
        self.observable(engine, ObservableKind::Plaquette)
    }

    /// Polyakov loop modulus via the injected engine.
    ///
    /// # Errors
    ///
    /// Engine-specific failure.
    pub fn polyakov_loop(&self, engine: &mut dyn ComputeEngine) -> Result<f64, ConfluenceError> {
        self.observable(engine, ObservableKind::PolyakovLoop)
    }

    /// Field-strength energy via the injected engine.
    ///
    /// # Errors
    ///
    /// Engine-specific failure.
    pub fn energy(&self, engine: &mut dyn ComputeEngine) -> Result<f64, ConfluenceError> {
        self.observable(engine, ObservableKind::Energy)
    }

    /// Topological charge via the injected engine.
    ///
    /// # Errors
    ///
    /// Engine-specific failure.
    pub fn topological_charge(
        &self,
        engine: &mut dyn ComputeEngine,
    ) -> Result<f64, ConfluenceError> {
        self.observable(engine, ObservableKind::TopologicalCharge)
    }

    fn observable(
        &self,
        engine: &mut dyn ComputeEngine,
        kind: ObservableKind,
    ) -> Result<f64, ConfluenceError> {
        engine.load_field(self.as_bytes(), &self.descriptor())?;
        engine.compute_observable(kind)
    }
}

/// Single color vector per site. Shape `[2, Lt, Lz, Ly, Lx/2, 3]`.
#[derive(Debug)]
pub struct LatticeColorvector {
    buf: FieldBuf<Complex64>,
}

impl LatticeColorvector {
    /// New zero-filled color vector field.
    #[must_use]
    pub fn new(info: Arc<LatticeTopology>) -> Self {
        Self {
            buf: FieldBuf::zeros(info, FieldKind::Colorvector),
        }
    }

    /// Wrap an already checkerboard-ordered buffer.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] on an element-count mismatch.
    pub fn from_data(
        info: Arc<LatticeTopology>,
        data: Vec<Complex64>,
    ) -> Result<Self, ConfluenceError> {
        Ok(Self {
            buf: FieldBuf::from_vec(info, FieldKind::Colorvector, data)?,
        })
    }

    field_common!(Complex64);
    field_parity_views!(Complex64);

    /// Natural-order copy: `[Lt, Lz, Ly, Lx, 3]`.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] (cannot occur for a well-formed field).
    pub fn lexico(&self) -> Result<Vec<Complex64>, ConfluenceError> {
        lexico(&self.buf.data, &self.buf.shape, [0, 1, 2, 3, 4])
    }
}

/// Wilson fermion vector: spin × color per site.
/// Shape `[2, Lt, Lz, Ly, Lx/2, 4, 3]`.
#[derive(Debug)]
pub struct LatticeFermion {
    buf: FieldBuf<Complex64>,
}

impl LatticeFermion {
    /// New zero-filled fermion field.
    #[must_use]
    pub fn new(info: Arc<LatticeTopology>) -> Self {
        Self {
            buf: FieldBuf::zeros(info, FieldKind::Fermion),
        }
    }

    /// Wrap an already checkerboard-ordered buffer.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] on an element-count mismatch.
    pub fn from_data(
        info: Arc<LatticeTopology>,
        data: Vec<Complex64>,
    ) -> Result<Self, ConfluenceError> {
        Ok(Self {
            buf: FieldBuf::from_vec(info, FieldKind::Fermion, data)?,
        })
    }

    field_common!(Complex64);
    field_parity_views!(Complex64);

    /// Natural-order copy: `[Lt, Lz, Ly, Lx, 4, 3]`.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] (cannot occur for a well-formed field).
    pub fn lexico(&self) -> Result<Vec<Complex64>, ConfluenceError> {
        lexico(&self.buf.data, &self.buf.shape, [0, 1, 2, 3, 4])
    }
}

/// Full propagator: spin and color indices at sink and source.
/// Shape `[2, Lt, Lz, Ly, Lx/2, 4, 4, 3, 3]`.
#[derive(Debug)]
pub struct LatticePropagator {
    buf: FieldBuf<Complex64>,
}

impl LatticePropagator {
    /// New zero-filled propagator.
    #[must_use]
    pub fn new(info: Arc<LatticeTopology>) -> Self {
        Self {
            buf: FieldBuf::zeros(info, FieldKind::Propagator),
        }
    }

    /// Wrap an already checkerboard-ordered buffer.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] on an element-count mismatch.
    pub fn from_data(
        info: Arc<LatticeTopology>,
        data: Vec<Complex64>,
    ) -> Result<Self, ConfluenceError> {
        Ok(Self {
            buf: FieldBuf::from_vec(info, FieldKind::Propagator, data)?,
        })
    }

    field_common!(Complex64);

    /// Natural-order copy: `[Lt, Lz, Ly, Lx, 4, 4, 3, 3]`.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] (cannot occur for a well-formed field).
    pub fn lexico(&self) -> Result<Vec<Complex64>, ConfluenceError> {
        lexico(&self.buf.data, &self.buf.shape, [0, 1, 2, 3, 4])
    }

    /// New propagator with the two spin axes and the two color axes swapped
    /// simultaneously (site axes untouched).
    ///
    /// The result matches the "transposed" storage convention where the
    /// sink spin/color indices run slower than the source indices — the
    /// layout some external analysis tools expect.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let sites = self.buf.data.len() / (NS * NS * NC * NC);
        let mut out = vec![Complex64::default(); self.buf.data.len()];
        for site in 0..sites {
            let base = site * NS * NS * NC * NC;
            for s1 in 0..NS {
                for s2 in 0..NS {
                    for c1 in 0..NC {
                        for c2 in 0..NC {
                            let src = base + ((s1 * NS + s2) * NC + c1) * NC + c2;
                            let dst = base + ((s2 * NS + s1) * NC + c2) * NC + c1;
                            out[dst] = self.buf.data[src];
                        }
                    }
                }
            }
        }
        Self {
            buf: FieldBuf {
                info: Arc::clone(&self.buf.info),
                kind: self.buf.kind,
                shape: self.buf.shape.clone(),
                data: out,
                slot: DeviceSlot::default(),
            },
        }
    }
}

/// Staggered fermion vector: color only, no spin axis.
/// Shape `[2, Lt, Lz, Ly, Lx/2, 3]`.
#[derive(Debug)]
pub struct LatticeStaggeredFermion {
    buf: FieldBuf<Complex64>,
}

impl LatticeStaggeredFermion {
    /// New zero-filled staggered fermion field.
    #[must_use]
    pub fn new(info: Arc<LatticeTopology>) -> Self {
        Self {
            buf: FieldBuf::zeros(info, FieldKind::StaggeredFermion),
        }
    }

    /// Wrap an already checkerboard-ordered buffer.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] on an element-count mismatch.
    pub fn from_data(
        info: Arc<LatticeTopology>,
        data: Vec<Complex64>,
    ) -> Result<Self, ConfluenceError> {
        Ok(Self {
            buf: FieldBuf::from_vec(info, FieldKind::StaggeredFermion, data)?,
        })
    }

    field_common!(Complex64);
    field_parity_views!(Complex64);

    /// Natural-order copy: `[Lt, Lz, Ly, Lx, 3]`.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] (cannot occur for a well-formed field).
    pub fn lexico(&self) -> Result<Vec<Complex64>, ConfluenceError> {
        lexico(&self.buf.data, &self.buf.shape, [0, 1, 2, 3, 4])
    }
}

/// Staggered propagator: color indices at both ends, no spin.
/// Shape `[2, Lt, Lz, Ly, Lx/2, 3, 3]`.
#[derive(Debug)]
pub struct LatticeStaggeredPropagator {
    buf: FieldBuf<Complex64>,
}

impl LatticeStaggeredPropagator {
    /// New zero-filled staggered propagator.
    #[must_use]
    pub fn new(info: Arc<LatticeTopology>) -> Self {
        Self {
            buf: FieldBuf::zeros(info, FieldKind::StaggeredPropagator),
        }
    }

    /// Wrap an already checkerboard-ordered buffer.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] on an element-count mismatch.
    pub fn from_data(
        info: Arc<LatticeTopology>,
        data: Vec<Complex64>,
    ) -> Result<Self, ConfluenceError> {
        Ok(Self {
            buf: FieldBuf::from_vec(info, FieldKind::StaggeredPropagator, data)?,
        })
    }

    field_common!(Complex64);

    /// Natural-order copy: `[Lt, Lz, Ly, Lx, 3, 3]`.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] (cannot occur for a well-formed field).
    pub fn lexico(&self) -> Result<Vec<Complex64>, ConfluenceError> {
        lexico(&self.buf.data, &self.buf.shape, [0, 1, 2, 3, 4])
    }

    /// New staggered propagator with the two color axes swapped.
    ///
    /// Same convention as [`LatticePropagator::transpose`], minus the spin
    /// axes.
    #[must_use]
    pub fn transpose(&self) -> Self {
        let sites = self.buf.data.len() / (NC * NC);
        let mut out = vec![Complex64::default(); self.buf.data.len()];
        for site in 0..sites {
            let base = site * NC * NC;
            for c1 in 0..NC {
                for c2 in 0..NC {
                    out[base + c2 * NC + c1] = self.buf.data[base + c1 * NC + c2];
                }
            }
        }
        Self {
            buf: FieldBuf {
                info: Arc::clone(&self.buf.info),
                kind: self.buf.kind,
                shape: self.buf.shape.clone(),
                data: out,
                slot: DeviceSlot::default(),
            },
        }
    }
}

/// Clover term: per-site real components, two chirality blocks of 36.
/// Shape `[2, Lt, Lz, Ly, Lx/2, 2, 36]`, element type `f64`.
#[derive(Debug)]
pub struct LatticeClover {
    buf: FieldBuf<f64>,
}

impl LatticeClover {
    /// New zero-filled clover field.
    #[must_use]
    pub fn new(info: Arc<LatticeTopology>) -> Self {
        Self {
            buf: FieldBuf::zeros(info, FieldKind::Clover),
        }
    }

    /// Wrap an already checkerboard-ordered buffer.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::ShapeError`] on an element-count mismatch.
    pub fn from_data(
        info: Arc<LatticeTopology>,
        data: Vec<f64>,
    ) -> Result<Self, ConfluenceError> {
        Ok(Self {
            buf: FieldBuf::from_vec(info, FieldKind::Clover, data)?,
        })
    }

    field_common!(f64);
}
