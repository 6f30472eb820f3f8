// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for camera capture
//!
//! - [`camera`]: device enumeration, capture sessions and frame retrieval

pub mod camera;
