//! Compute backend trait and device abstraction.
//!
//! A [`ComputeBackend`] owns whatever accelerated library handle the device
//! needs (a Rayon pool, a wgpu device and queue) and turns a [`ModalSystem`]
//! into a [`ModalStepper`] whose buffers live on that device. Dropping the
//! stepper releases them.

use thiserror::Error;

use crate::system::ModalSystem;

/// Errors originating from compute backends.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Backend not available: {0}")]
    Unavailable(String),

    #[error("Device error: {0}")]
    DeviceError(String),

    #[error("Dimension mismatch for {what}: expected {expected}, got {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("Invalid modal system: {0}")]
    InvalidSystem(String),

    #[error("Out of memory: requested {requested} bytes, available {available}")]
    OutOfMemory { requested: usize, available: usize },
}

/// Describes the capabilities of a compute backend.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub memory_bytes: Option<usize>,
    pub compute_units: Option<usize>,
}

/// The type of compute backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    Cpu,
    Gpu,
}

/// Abstraction over compute backends.
pub trait ComputeBackend: Send + Sync {
    /// Return information about the device.
    fn device_info(&self) -> DeviceInfo;

    /// Allocate the device buffers for `system` and seed the modal states
    /// with its initial conditions.
    fn build(&self, system: &ModalSystem) -> Result<Box<dyn ModalStepper>, ComputeError>;
}

/// A modal state-space model resident on a compute device.
pub trait ModalStepper: Send {
    fn n_mode(&self) -> usize;
    fn n_input(&self) -> usize;
    fn n_output(&self) -> usize;

    /// Advance every mode by one sample.
    ///
    /// `y` receives the outputs of the current state (plus the DC-gain
    /// feedthrough of `u` when a compensator is set) before the states are
    /// updated with `u`.
    fn step(&mut self, u: &[f64], y: &mut [f64]) -> Result<(), ComputeError>;

    /// Set the `n_output × n_input` row-major static gain compensator.
    fn set_dc_gain_compensator(&mut self, dcg: &[f64]) -> Result<(), ComputeError>;

    /// Restore the initial modal states.
    fn reset(&mut self) -> Result<(), ComputeError>;

    /// Information about the device the buffers live on.
    fn device_info(&self) -> DeviceInfo;
}

/// Check that a buffer has the length the model dimensions require.
pub(crate) fn check_len(what: &'static str, expected: usize, found: usize) -> Result<(), ComputeError> {
    if expected == found {
        Ok(())
    } else {
        Err(ComputeError::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}
