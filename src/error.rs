// SPDX-License-Identifier: AGPL-3.0-only

//! Typed errors for lattice decomposition and configuration file I/O.
//!
//! Replaces `Result<_, String>` in public APIs with a proper enum so callers
//! can pattern-match on failure modes (indivisible lattice, broken magic,
//! missing metadata) rather than parsing opaque strings. Every variant is
//! detected eagerly at parse or construction time; a corrupt file is a
//! terminal condition for that read, surfaced to the caller.

use std::fmt;

/// Errors arising from topology construction, layout conversion, or
/// configuration file parsing.
#[derive(Debug)]
pub enum ConfluenceError {
    /// Extents array has the wrong arity or contains a non-positive value.
    DimensionMismatch(String),

    /// A divisibility invariant required for even-odd preconditioning fails
    /// (`Lx % 2Gx`, `Ly % 2Gy`, `Lz % 2Gz`, or `Lt % Gt`).
    IndivisibleLattice(String),

    /// Buffer or axis shape does not match the expected field layout.
    ShapeError(String),

    /// A LIME record does not start with the `45 67 89 AB 00 01` marker
    /// (byte offset of the offending record header).
    MalformedMagic(usize),

    /// A LIME record required by the loader is absent (record name).
    MissingRecord(String),

    /// A required XML metadata tag is absent (tag name).
    MissingMetadata(String),

    /// XML metadata is present but unreadable (bad UTF-8, non-integer text).
    MalformedMetadata(String),

    /// QIO `typesize` matches neither the spin-color nor the color-only
    /// element size for the declared precision.
    UnsupportedTypesize(usize),

    /// QIO `datacount` is not 1.
    UnsupportedDataCount(usize),

    /// QIO `precision` code is neither `"D"` nor `"S"`.
    UnsupportedPrecision(String),

    /// A MILC gauge file magic word equals 20103 in neither byte order.
    UnrecognizedMagic([u8; 4]),

    /// A MILC gauge file order flag is non-zero (site-major order required).
    UnsupportedOrderFlag(i32),

    /// The file ended inside a record header or payload.
    UnexpectedEof(String),

    /// Underlying filesystem failure.
    Io(std::io::Error),

    /// No compatible GPU adapter was found by wgpu.
    NoAdapter,

    /// GPU lacks the `SHADER_F64` feature required for f64 field storage.
    NoShaderF64,

    /// GPU device creation or buffer mapping failed.
    DeviceCreation(String),
}

impl fmt::Display for ConfluenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch(msg) => write!(f, "Dimension mismatch: {msg}"),
            Self::IndivisibleLattice(msg) => write!(f, "Indivisible lattice: {msg}"),
            Self::ShapeError(msg) => write!(f, "Shape error: {msg}"),
            Self::MalformedMagic(offset) => {
                write!(f, "Malformed LIME magic at byte offset {offset}")
            }
            Self::MissingRecord(name) => write!(f, "Missing LIME record '{name}'"),
            Self::MissingMetadata(tag) => write!(f, "Missing XML metadata tag <{tag}>"),
            Self::MalformedMetadata(msg) => write!(f, "Malformed XML metadata: {msg}"),
            Self::UnsupportedTypesize(n) => {
                write!(f, "Unsupported typesize={n} in QIO record metadata")
            }
            Self::UnsupportedDataCount(n) => {
                write!(f, "Unsupported datacount={n} in QIO record metadata (must be 1)")
            }
            Self::UnsupportedPrecision(code) => {
                write!(f, "Unsupported precision code '{code}' (expected 'D' or 'S')")
            }
            Self::UnrecognizedMagic(bytes) => {
                write!(f, "Unrecognized MILC magic {bytes:02x?} (20103 in neither byte order)")
            }
            Self::UnsupportedOrderFlag(flag) => {
                write!(f, "Unsupported MILC order flag {flag} (must be 0)")
            }
            Self::UnexpectedEof(msg) => write!(f, "Unexpected end of file: {msg}"),
            Self::Io(e) => write!(f, "I/O failure: {e}"),
            Self::NoAdapter => write!(f, "No GPU adapter found"),
            Self::NoShaderF64 => {
                write!(f, "GPU does not support SHADER_F64 — cannot hold f64 fields")
            }
            Self::DeviceCreation(e) => write!(f, "Failed to create GPU device: {e}"),
        }
    }
}

impl std::error::Error for ConfluenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfluenceError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_indivisible_lattice() {
        let err = ConfluenceError::IndivisibleLattice("Lx=6 with Gx=2".into());
        assert_eq!(err.to_string(), "Indivisible lattice: Lx=6 with Gx=2");
    }

    #[test]
    fn display_unrecognized_magic() {
        let err = ConfluenceError::UnrecognizedMagic([0xde, 0xad, 0xbe, 0xef]);
        assert!(err.to_string().contains("de"));
        assert!(err.to_string().contains("20103"));
    }

    #[test]
    fn display_unsupported_typesize() {
        let err = ConfluenceError::UnsupportedTypesize(97);
        assert!(err.to_string().contains("typesize=97"));
    }

    #[test]
    fn io_error_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ConfluenceError::from(io);
        let dyn_err: &dyn std::error::Error = &err;
        assert!(dyn_err.source().is_some());
    }

    #[test]
    fn error_trait_works() {
        let err = ConfluenceError::MissingMetadata("typesize".into());
        let dyn_err: &dyn std::error::Error = &err;
        assert_eq!(dyn_err.to_string(), "Missing XML metadata tag <typesize>");
    }
}
