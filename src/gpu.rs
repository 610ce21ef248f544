// SPDX-License-Identifier: AGPL-3.0-only

//! wgpu storage backend for field buffers (feature `gpu`).
//!
//! Creates a wgpu device with `SHADER_F64` enabled so complex-f64 field
//! data can be consumed by fp64 compute shaders on any Vulkan GPU
//! (NVIDIA proprietary, NVK/nouveau, RADV, etc.).
//!
//! ## Adapter selection
//!
//! Set `CONFLUENCE_GPU_ADAPTER` to target a specific GPU:
//!
//! | Value | Behavior |
//! |-------|----------|
//! | `auto` | prefer discrete GPU with `SHADER_F64`, then any with it |
//! | `0`, `1`, … | select adapter by enumeration index |
//! | substring | case-insensitive name match (e.g. `"titan"`, `"4070"`) |
//! | *(unset)* | same as `auto` |
//!
//! Transfers move raw field bytes: upload writes the host buffer into a
//! storage buffer held in the field's [`DeviceSlot`], readback goes through
//! a `MAP_READ` staging buffer with a blocking `map_async` wait.

use std::sync::Arc;

use crate::backend::{DeviceSlot, FieldBackend};
use crate::error::ConfluenceError;

/// Summary of a discovered GPU adapter.
#[derive(Debug, Clone)]
pub struct AdapterInfo {
    /// Enumeration index (stable within a single run).
    pub index: usize,
    /// Adapter name as reported by the driver.
    pub name: String,
    /// Vulkan driver name (e.g. `"NVIDIA"`, `"NVK"`, `"radv"`).
    pub driver: String,
    /// Whether `SHADER_F64` is supported.
    pub has_f64: bool,
    /// Adapter device type (discrete, integrated, software, etc.).
    pub device_type: wgpu::DeviceType,
}

impl std::fmt::Display for AdapterInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let f64_tag = if self.has_f64 { "f64" } else { "f32" };
        let kind = match self.device_type {
            wgpu::DeviceType::DiscreteGpu => "discrete",
            wgpu::DeviceType::IntegratedGpu => "integrated",
            wgpu::DeviceType::VirtualGpu => "virtual",
            wgpu::DeviceType::Cpu => "cpu",
            wgpu::DeviceType::Other => "other",
        };
        write!(
            f,
            "[{}] {} ({}, {}, {})",
            self.index, self.name, self.driver, kind, f64_tag
        )
    }
}

/// wgpu-backed storage backend with FP64 support.
pub struct WgpuBackend {
    pub adapter_name: String,
    pub has_f64: bool,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
}

impl WgpuBackend {
    fn create_instance() -> wgpu::Instance {
        let backends = match std::env::var("CONFLUENCE_WGPU_BACKEND").as_deref() {
            Ok("vulkan") => wgpu::Backends::VULKAN,
            Ok("metal") => wgpu::Backends::METAL,
            Ok("dx12") => wgpu::Backends::DX12,
            _ => wgpu::Backends::all(),
        };
        wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        })
    }

    /// Enumerate all available GPU adapters.
    ///
    /// Use the `index` field with `CONFLUENCE_GPU_ADAPTER=<index>` to target
    /// a specific GPU.
    pub fn enumerate_adapters() -> Vec<AdapterInfo> {
        let instance = Self::create_instance();
        instance
            .enumerate_adapters(wgpu::Backends::all())
            .into_iter()
            .enumerate()
            .map(|(i, adapter)| {
                let info = adapter.get_info();
                let features = adapter.features();
                AdapterInfo {
                    index: i,
                    name: info.name.clone(),
                    driver: info.driver.clone(),
                    has_f64: features.contains(wgpu::Features::SHADER_F64),
                    device_type: info.device_type,
                }
            })
            .collect()
    }

    /// Create the backend, requesting `SHADER_F64`.
    ///
    /// # Errors
    ///
    /// [`ConfluenceError::NoAdapter`] when no adapter exists or none matches
    /// the selector, [`ConfluenceError::NoShaderF64`] when the chosen adapter
    /// lacks fp64 shaders, [`ConfluenceError::DeviceCreation`] on device
    /// request failure.
    pub async fn new() -> Result<Self, ConfluenceError> {
        let selector = std::env::var("CONFLUENCE_GPU_ADAPTER")
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        let instance = Self::create_instance();
        let adapters: Vec<wgpu::Adapter> = instance.enumerate_adapters(wgpu::Backends::all());
        if adapters.is_empty() {
            return Err(ConfluenceError::NoAdapter);
        }

        let adapter = if selector.is_empty() || selector == "auto" {
            // Prefer a discrete GPU with SHADER_F64, then any with it.
            let mut chosen: Option<wgpu::Adapter> = None;
            let mut fallback: Option<wgpu::Adapter> = None;
            for a in adapters {
                if a.features().contains(wgpu::Features::SHADER_F64) {
                    if a.get_info().device_type == wgpu::DeviceType::DiscreteGpu && chosen.is_none()
                    {
                        chosen = Some(a);
                    } else if fallback.is_none() {
                        fallback = Some(a);
                    }
                }
            }
            chosen.or(fallback).ok_or(ConfluenceError::NoAdapter)?
        } else if let Ok(idx) = selector.parse::<usize>() {
            adapters
                .into_iter()
                .nth(idx)
                .ok_or(ConfluenceError::NoAdapter)?
        } else {
            adapters
                .into_iter()
                .find(|a| a.get_info().name.to_ascii_lowercase().contains(&selector))
                .ok_or(ConfluenceError::NoAdapter)?
        };

        let adapter_info = adapter.get_info();
        if !adapter.features().contains(wgpu::Features::SHADER_F64) {
            return Err(ConfluenceError::NoShaderF64);
        }

        // Gauge fields are large: one double-precision SU(3) configuration
        // at 64^3 x 128 is ~12 GiB globally, so per-rank buffers need
        // generous storage limits.
        let required_limits = wgpu::Limits {
            max_storage_buffer_binding_size: 512 * 1024 * 1024,
            max_buffer_size: 1024 * 1024 * 1024,
            ..wgpu::Limits::default()
        };

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("confluence field device"),
                    required_features: wgpu::Features::SHADER_F64,
                    required_limits,
                    memory_hints: wgpu::MemoryHints::default(),
                },
                None,
            )
            .await
            .map_err(|e| ConfluenceError::DeviceCreation(e.to_string()))?;

        Ok(Self {
            adapter_name: adapter_info.name,
            has_f64: true,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// Blocking constructor for callers without an async runtime.
    ///
    /// # Errors
    ///
    /// Everything [`WgpuBackend::new`] reports.
    pub fn new_blocking() -> Result<Self, ConfluenceError> {
        pollster::block_on(Self::new())
    }

    /// Access the underlying wgpu device.
    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Access the underlying wgpu queue.
    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Print device capabilities.
    pub fn print_info(&self) {
        println!("  GPU: {}", self.adapter_name);
        println!("  SHADER_F64: {}", if self.has_f64 { "YES" } else { "NO" });
    }

    /// Print all available adapters to stdout.
    pub fn print_available_adapters() {
        let adapters = Self::enumerate_adapters();
        println!("  Available GPU adapters:");
        for info in &adapters {
            let marker = if info.has_f64 { "+" } else { "-" };
            println!("    {marker} {info}");
        }
        if adapters.is_empty() {
            println!("    (none found)");
        }
    }

    fn create_storage_buffer(&self, size: u64) -> wgpu::Buffer {
        self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field storage"),
            size,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_SRC
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }
}

impl FieldBackend for WgpuBackend {
    fn to_device(&self, slot: &mut DeviceSlot, host: &[u8]) -> Result<(), ConfluenceError> {
        let needs_alloc = match &slot.buffer {
            Some(buf) => buf.size() != host.len() as u64,
            None => true,
        };
        if needs_alloc {
            slot.buffer = Some(self.create_storage_buffer(host.len() as u64));
        }
        if let Some(buf) = &slot.buffer {
            self.queue.write_buffer(buf, 0, host);
        }
        self.queue.submit(std::iter::empty());
        Ok(())
    }

    fn to_host(&self, slot: &mut DeviceSlot, host: &mut [u8]) -> Result<(), ConfluenceError> {
        let Some(buf) = &slot.buffer else {
            // Nothing resident: host bytes are already current.
            return Ok(());
        };

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field readback"),
            size: host.len() as u64,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("field readback"),
            });
        encoder.copy_buffer_to_buffer(buf, 0, &staging, 0, host.len() as u64);
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|_| {
                ConfluenceError::DeviceCreation("GPU map callback: channel recv failed".into())
            })?
            .map_err(|e| ConfluenceError::DeviceCreation(format!("GPU buffer mapping: {e}")))?;

        let mapped = slice.get_mapped_range();
        host.copy_from_slice(&mapped);
        drop(mapped);
        staging.unmap();
        Ok(())
    }
}
