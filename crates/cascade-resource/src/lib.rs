//! # cascade-resource
//!
//! Hardware backend detection and unified memory/thermal pressure
//! monitoring for the Cascade orchestrator.
//!
//! Two independent concerns live here:
//!
//! - [`hardware`]: one-shot detection of the best available compute backend
//!   (CUDA → ROCm → Vulkan → CPU) and the static shape of the machine.
//! - [`monitor`]: a running [`ResourceMonitor`] that samples memory/thermal
//!   state over time, derives a pressure level, and raises alerts.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cascade_resource::{HardwareInfo, ResourceMonitor};
//!
//! let hw = HardwareInfo::detect();
//! let monitor = ResourceMonitor::new();
//! let snapshot = monitor.sample();
//! let decision = monitor.can_load(4.0);
//! println!("backend={} pressure_ok={}", hw.backend, decision.ok);
//! ```

pub mod hardware;
pub mod monitor;

pub use hardware::{ComputeBackend, HardwareInfo};
pub use monitor::{
    AlertHandler, AlertSeverity, LoadDecision, MemoryPressure, ResourceAlert, ResourceMonitor,
    ResourceSnapshot, ThermalLevel, Trend,
};
