// SPDX-License-Identifier: GPL-3.0-only

//! Device registry
//!
//! Holds the last enumeration result. A refresh replaces the list
//! wholesale; entries are never patched in place.

use super::CameraBackend;
use super::types::CameraDevice;
use crate::errors::BackendResult;
use std::sync::Arc;
use tracing::info;

pub struct DeviceRegistry {
    backend: Arc<dyn CameraBackend>,
    devices: Vec<CameraDevice>,
}

impl DeviceRegistry {
    /// Create a registry and enumerate once
    pub fn new(backend: Arc<dyn CameraBackend>) -> BackendResult<Self> {
        let mut registry = Self {
            backend,
            devices: Vec::new(),
        };
        registry.refresh()?;
        Ok(registry)
    }

    /// Re-enumerate devices through the backend
    ///
    /// The first device becomes the default. Devices are re-classified
    /// from their names on every refresh.
    pub fn refresh(&mut self) -> BackendResult<&[CameraDevice]> {
        let devices = self
            .backend
            .enumerate_cameras()?
            .into_iter()
            .enumerate()
            .map(|(index, device)| CameraDevice {
                is_default: index == 0,
                ..CameraDevice::new(device.id, device.name)
            })
            .collect();
        self.devices = devices;

        info!(count = self.devices.len(), "Device registry refreshed");
        Ok(&self.devices)
    }

    pub fn devices(&self) -> &[CameraDevice] {
        &self.devices
    }

    pub fn find(&self, id: &str) -> Option<&CameraDevice> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn default_device(&self) -> Option<&CameraDevice> {
        self.devices.iter().find(|d| d.is_default)
    }

    pub fn backend(&self) -> &Arc<dyn CameraBackend> {
        &self.backend
    }
}
