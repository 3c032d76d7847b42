//! # Modus Compute
//!
//! Compute backend abstraction for stepping modal state-space models. This
//! crate provides a [`ComputeBackend`](backend::ComputeBackend) trait that
//! builds a device-resident [`ModalStepper`](backend::ModalStepper) from a
//! host-side [`ModalSystem`](system::ModalSystem), isolating the model
//! construction in `modus-core` from device-specific execution details.
//!
//! ## Available backends
//!
//! | Backend | Feature flag | Precision |
//! |---------|-------------|-----------|
//! | CPU (Rayon) | `cpu` (default) | f64 |
//! | GPU (wgpu) | `gpu` | f32 |
//!
//! ## Step semantics
//!
//! Every backend advances all the modes by one sample with
//!
//! ```text
//! f = B u
//! y = C x₀ + D u
//! x ← Φ x + Γ f
//! ```
//!
//! where `Φ` and `Γ` are the per-mode 2×2 transition matrix and 2×1 input
//! vector held in [`ModeStateSpace`](system::ModeStateSpace), and `D` is the
//! optional DC-gain compensator.

pub mod backend;
pub mod system;

#[cfg(feature = "cpu")]
pub mod cpu;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use backend::{BackendType, ComputeBackend, ComputeError, DeviceInfo, ModalStepper};
pub use system::{ModalSystem, ModeStateSpace};

#[cfg(feature = "cpu")]
pub use cpu::{CpuBackend, CpuStateSpace};

#[cfg(feature = "gpu")]
pub use gpu::{GpuBackend, GpuStateSpace};
