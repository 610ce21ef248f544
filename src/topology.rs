// SPDX-License-Identifier: AGPL-3.0-only

//! Global lattice partitioning across a 4-D process grid.
//!
//! A global lattice `[Lx, Ly, Lz, Lt]` is cut into equal blocks, one per
//! process, arranged in a grid `[Gx, Gy, Gz, Gt]`. Each process derives its
//! local geometry once and treats it as an immutable pure value for the rest
//! of the run. Even-odd preconditioning (see [`crate::checkerboard`]) halves
//! the x extent in storage, so every *local* x extent must be even and the
//! time dimension may only be cut along process boundaries:
//!
//!   `Lx % 2Gx == 0`, `Ly % 2Gy == 0`, `Lz % 2Gz == 0`, `Lt % Gt == 0`
//!
//! The process-bootstrap values (rank, size, grid shape, grid coordinate)
//! arrive as an explicit [`GridContext`] threaded into construction and into
//! loader entry points — there is no ambient process-wide state here.

use crate::error::ConfluenceError;

/// Temporal boundary condition carried alongside the geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TBoundary {
    /// Periodic in time (`+1`).
    #[default]
    Periodic,
    /// Anti-periodic in time (`-1`), the fermionic convention.
    AntiPeriodic,
}

impl TBoundary {
    /// Sign applied to time-direction links crossing the boundary.
    #[must_use]
    pub const fn sign(self) -> f64 {
        match self {
            Self::Periodic => 1.0,
            Self::AntiPeriodic => -1.0,
        }
    }
}

/// Resolved process-bootstrap values: this process's place in the grid.
///
/// An external bootstrap collaborator (MPI or equivalent) is responsible for
/// making every process agree on these integers before any field is read;
/// this crate only consumes them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridContext {
    /// This process's rank in `[0, mpi_size)`.
    pub mpi_rank: usize,
    /// Total process count; must equal the product of `grid_size`.
    pub mpi_size: usize,
    /// Process-grid extents `[Gx, Gy, Gz, Gt]`.
    pub grid_size: [usize; 4],
    /// This process's grid coordinate `[gx, gy, gz, gt]`.
    pub grid_coord: [usize; 4],
}

impl GridContext {
    /// Validate and build a grid context.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::DimensionMismatch`] if any grid extent is zero,
    /// the extents' product differs from `mpi_size`, or a coordinate falls
    /// outside its extent.
    pub fn new(
        mpi_rank: usize,
        mpi_size: usize,
        grid_size: [usize; 4],
        grid_coord: [usize; 4],
    ) -> Result<Self, ConfluenceError> {
        if grid_size.contains(&0) {
            return Err(ConfluenceError::DimensionMismatch(format!(
                "process grid extents must be positive, got {grid_size:?}"
            )));
        }
        let product: usize = grid_size.iter().product();
        if product != mpi_size {
            return Err(ConfluenceError::DimensionMismatch(format!(
                "process grid {grid_size:?} covers {product} processes, mpi_size is {mpi_size}"
            )));
        }
        for d in 0..4 {
            if grid_coord[d] >= grid_size[d] {
                return Err(ConfluenceError::DimensionMismatch(format!(
                    "grid coordinate {grid_coord:?} outside grid {grid_size:?} in dimension {d}"
                )));
            }
        }
        if mpi_rank >= mpi_size {
            return Err(ConfluenceError::DimensionMismatch(format!(
                "rank {mpi_rank} outside mpi_size {mpi_size}"
            )));
        }
        Ok(Self {
            mpi_rank,
            mpi_size,
            grid_size,
            grid_coord,
        })
    }

    /// The single-process context: grid `[1,1,1,1]`, coordinate `[0,0,0,0]`.
    #[must_use]
    pub const fn single() -> Self {
        Self {
            mpi_rank: 0,
            mpi_size: 1,
            grid_size: [1, 1, 1, 1],
            grid_coord: [0, 0, 0, 0],
        }
    }
}

/// Immutable per-process lattice geometry.
///
/// Constructed once per distinct lattice shape; referenced (via `Arc`) by
/// every lattice-aware component. All extents follow the `[x, y, z, t]`
/// axis order; stored buffers use `[t, z, y, x]` index order (t slowest).
#[derive(Clone, Debug, PartialEq)]
pub struct LatticeTopology {
    /// Process-grid extents `[Gx, Gy, Gz, Gt]`.
    pub grid_size: [usize; 4],
    /// This process's grid coordinate `[gx, gy, gz, gt]`.
    pub grid_coord: [usize; 4],
    /// Global lattice extents `[Lx, Ly, Lz, Lt]`.
    pub global_size: [usize; 4],
    /// Product of the global extents.
    pub global_volume: usize,
    /// Local extents `[Lx/Gx, Ly/Gy, Lz/Gz, Lt/Gt]`.
    pub size: [usize; 4],
    /// Product of the local extents.
    pub volume: usize,
    /// Local extents in checkerboard storage `[Lx/2, Ly, Lz, Lt]`.
    pub size_cb2: [usize; 4],
    /// Sites per parity sublattice, `volume / 2`.
    pub volume_cb2: usize,
    /// Gauge-padding value used by consumers for buffer over-allocation:
    /// `volume / min(local extent) / 2`.
    pub ga_pad: usize,
    /// Temporal boundary condition.
    pub t_boundary: TBoundary,
    /// Bare anisotropy applied to spatial links on load.
    pub anisotropy: f64,
}

impl LatticeTopology {
    /// Derive the local geometry of `grid.grid_coord`'s block of the global
    /// lattice. Pure function of its inputs; no side effects.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::DimensionMismatch`] on a zero global extent;
    /// [`ConfluenceError::IndivisibleLattice`] when the even-odd
    /// divisibility invariants fail.
    pub fn build(
        global_size: [usize; 4],
        grid: &GridContext,
    ) -> Result<Self, ConfluenceError> {
        if global_size.contains(&0) {
            return Err(ConfluenceError::DimensionMismatch(format!(
                "global lattice extents must be positive, got {global_size:?}"
            )));
        }
        let [gx, gy, gz, gt] = grid.grid_size;
        let [lx, ly, lz, lt] = global_size;
        // x, y, z must split into an even number of sites per process so a
        // stored x-pair never straddles a process boundary; t splits only
        // along process boundaries.
        if lx % (2 * gx) != 0 || ly % (2 * gy) != 0 || lz % (2 * gz) != 0 || lt % gt != 0 {
            return Err(ConfluenceError::IndivisibleLattice(format!(
                "global {global_size:?} not partitionable over grid {:?} \
                 with consistent even-odd preconditioning",
                grid.grid_size
            )));
        }
        let size = [lx / gx, ly / gy, lz / gz, lt / gt];
        let volume = size.iter().product::<usize>();
        let min_extent = *size.iter().min().unwrap_or(&1);
        Ok(Self {
            grid_size: grid.grid_size,
            grid_coord: grid.grid_coord,
            global_size,
            global_volume: global_size.iter().product(),
            size,
            volume,
            size_cb2: [size[0] / 2, size[1], size[2], size[3]],
            volume_cb2: volume / 2,
            ga_pad: volume / min_extent / 2,
            t_boundary: TBoundary::Periodic,
            anisotropy: 1.0,
        })
    }

    /// [`Self::build`] from a runtime-sized extents slice (as parsed from
    /// file metadata).
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::DimensionMismatch`] if `dims` is not length 4,
    /// plus everything [`Self::build`] reports.
    pub fn build_from_slice(
        dims: &[usize],
        grid: &GridContext,
    ) -> Result<Self, ConfluenceError> {
        let global: [usize; 4] = dims.try_into().map_err(|_| {
            ConfluenceError::DimensionMismatch(format!(
                "expected 4 lattice extents, got {}",
                dims.len()
            ))
        })?;
        Self::build(global, grid)
    }

    /// Single-process topology for the whole global lattice.
    ///
    /// # Errors
    ///
    /// See [`Self::build`].
    pub fn single_process(global_size: [usize; 4]) -> Result<Self, ConfluenceError> {
        Self::build(global_size, &GridContext::single())
    }

    /// Set the temporal boundary condition (builder style).
    #[must_use]
    pub const fn with_t_boundary(mut self, t_boundary: TBoundary) -> Self {
        self.t_boundary = t_boundary;
        self
    }

    /// Set the bare anisotropy (builder style).
    #[must_use]
    pub const fn with_anisotropy(mut self, anisotropy: f64) -> Self {
        self.anisotropy = anisotropy;
        self
    }

    /// First global coordinate of this process's block in dimension `d`.
    #[must_use]
    pub const fn local_origin(&self, d: usize) -> usize {
        self.grid_coord[d] * self.size[d]
    }

    /// Whether this process holds the last time-slab of the global lattice.
    #[must_use]
    pub const fn owns_t_boundary(&self) -> bool {
        self.grid_coord[3] == self.grid_size[3] - 1
    }
}
