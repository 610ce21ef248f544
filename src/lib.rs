// SPDX-License-Identifier: AGPL-3.0-only

//! hotSpring Confluence — lattice QCD field containers and gauge I/O
//!
//! Even-odd preconditioned field storage over a 4-D process grid, with
//! readers for the two on-disk formats lattice collaborations exchange:
//! MILC fixed-header gauge configurations and SCIDAC/QIO (LIME-framed)
//! propagators.
//!
//! ## Active modules
//!   - `topology` — process grid, local/global extents, boundary phases
//!   - `checkerboard` — lexicographic <-> even/odd order conversion
//!   - `field` — typed lattice containers (gauge, fermion, propagator, clover)
//!   - `backend` — host/device transfer seam (`gpu` feature adds wgpu)
//!   - `engine` — compute-engine trait for gauge observables
//!   - `lime` — LIME record framing and QIO private-XML metadata
//!   - `milc` — MILC gauge configuration reader
//!   - `qio` — SCIDAC/QIO propagator reader
//!
//! ## Binaries
//!   - `lattice_file_info` — sniff a file and print its header/record table

pub mod backend;
pub mod checkerboard;
pub mod engine;
pub mod error;
pub mod field;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod lime;
pub mod milc;
pub mod qio;
pub mod topology;

pub use num_complex::Complex64;
