// SPDX-License-Identifier: AGPL-3.0-only

//! Host/device transfer seam for field buffers.
//!
//! The storage backend is chosen once at startup and passed to fields
//! explicitly; nothing branches on a backend name per call. The default
//! build configures only [`HostBackend`], where every buffer is already
//! host-addressable and both transfer directions are no-ops. With the `gpu`
//! cargo feature, [`crate::gpu::WgpuBackend`] performs real wgpu buffer
//! uploads and staged readbacks.
//!
//! Transfers never change a field's logical shape: after `to_host` the
//! buffer is guaranteed host-addressable, after `to_device` a device mirror
//! of the same bytes exists in the field's [`DeviceSlot`].

use crate::error::ConfluenceError;

/// Per-field device residency handle.
///
/// Opaque to field code; the active backend stores whatever it needs here.
/// In a host-only build it is an empty marker.
#[derive(Debug, Default)]
pub struct DeviceSlot {
    #[cfg(feature = "gpu")]
    pub(crate) buffer: Option<wgpu::Buffer>,
}

impl DeviceSlot {
    /// Whether a device mirror currently exists.
    #[must_use]
    pub fn is_resident(&self) -> bool {
        #[cfg(feature = "gpu")]
        {
            self.buffer.is_some()
        }
        #[cfg(not(feature = "gpu"))]
        {
            false
        }
    }
}

/// One capability set over field storage: move bytes to the device, bring
/// them back. Implementations must treat `host` as the canonical length;
/// a device mirror always holds exactly `host.len()` bytes.
pub trait FieldBackend {
    /// Ensure a device mirror of `host` exists in `slot`.
    ///
    /// # Errors
    ///
    /// Backend-specific allocation or upload failure.
    fn to_device(&self, slot: &mut DeviceSlot, host: &[u8]) -> Result<(), ConfluenceError>;

    /// Ensure `host` holds the current field bytes; reads back the device
    /// mirror when one exists.
    ///
    /// # Errors
    ///
    /// Backend-specific readback failure.
    fn to_host(&self, slot: &mut DeviceSlot, host: &mut [u8]) -> Result<(), ConfluenceError>;
}

/// Host-only backend: buffers already live in host memory, so both
/// directions succeed without touching anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostBackend;

impl FieldBackend for HostBackend {
    fn to_device(&self, _slot: &mut DeviceSlot, _host: &[u8]) -> Result<(), ConfluenceError> {
        Ok(())
    }

    fn to_host(&self, _slot: &mut DeviceSlot, _host: &mut [u8]) -> Result<(), ConfluenceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_backend_is_noop() {
        let backend = HostBackend;
        let mut slot = DeviceSlot::default();
        let data = vec![1u8, 2, 3, 4];
        backend.to_device(&mut slot, &data).unwrap();
        let mut back = data.clone();
        backend.to_host(&mut slot, &mut back).unwrap();
        assert_eq!(back, data);
        assert!(!slot.is_resident());
    }
}
