use std::fmt;

use modus_compute::{DeviceInfo, ModalStepper};

use super::{describe, ModalSolver, SolverError};
use crate::types::IoRange;

/// Modal state-space model whose modes live on a compute backend.
///
/// Built with [`DiscreteModalSolver::with_backend`](super::DiscreteModalSolver::with_backend).
/// Dropping it releases the device buffers.
pub struct AcceleratedModalSolver {
    u: Vec<f64>,
    y: Vec<f64>,
    ins: Vec<IoRange>,
    outs: Vec<IoRange>,
    stepper: Box<dyn ModalStepper>,
}

impl AcceleratedModalSolver {
    pub(crate) fn new(ins: Vec<IoRange>, outs: Vec<IoRange>, stepper: Box<dyn ModalStepper>) -> Self {
        Self {
            u: vec![0.0; stepper.n_input()],
            y: vec![0.0; stepper.n_output()],
            ins,
            outs,
            stepper,
        }
    }

    /// Restore the modal states the solver was built with and clear the
    /// inputs and outputs.
    pub fn reset(&mut self) -> Result<(), SolverError> {
        self.stepper.reset()?;
        self.u.iter_mut().for_each(|u| *u = 0.0);
        self.y.iter_mut().for_each(|y| *y = 0.0);
        Ok(())
    }

    /// Replace the DC-gain compensator, `n_outputs × n_inputs` row-major.
    pub fn set_dc_gain_compensator(&mut self, psi: &[f64]) -> Result<(), SolverError> {
        Ok(self.stepper.set_dc_gain_compensator(psi)?)
    }

    pub fn device_info(&self) -> DeviceInfo {
        self.stepper.device_info()
    }
}

impl ModalSolver for AcceleratedModalSolver {
    fn inputs(&self) -> &[IoRange] {
        &self.ins
    }
    fn outputs(&self) -> &[IoRange] {
        &self.outs
    }
    fn u_mut(&mut self) -> &mut [f64] {
        &mut self.u
    }
    fn y(&self) -> &[f64] {
        &self.y
    }
    fn step(&mut self) -> Result<(), SolverError> {
        Ok(self.stepper.step(&self.u, &mut self.y)?)
    }
    fn n_modes(&self) -> usize {
        self.stepper.n_mode()
    }
    fn method_name(&self) -> String {
        self.stepper.device_info().name
    }
}

impl fmt::Display for AcceleratedModalSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        describe(
            f,
            &format!("AcceleratedModalSolver on {}", self.stepper.device_info().name),
            self.u.len(),
            &self.ins,
            self.y.len(),
            &self.outs,
            self.stepper.n_mode(),
        )
    }
}
