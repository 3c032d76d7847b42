use std::fmt;
use std::path::Path;
use std::sync::Arc;

use modus_compute::{ComputeBackend, ModalSystem};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;

use super::{describe, AcceleratedModalSolver, ModalSolver, SolverError};
use crate::builder::{DiscreteStateSpace, StateSpaceError};
use crate::discretise::{ModalCoefficients, ModeSolver};
use crate::model::ModalModel;
use crate::types::IoRange;

/// Modal state-space model stepped on the host.
///
/// The model is a collection of independent 2nd order mode solvers, all
/// stepped concurrently. Each mode contributes `c · x0` to the outputs; the
/// contributions are summed with a Rayon fold/reduce.
#[derive(Debug, Clone)]
pub struct DiscreteModalSolver<S: ModeSolver> {
    /// Model input vector.
    pub u: Vec<f64>,
    /// Model output vector.
    pub y: Vec<f64>,
    /// One solver per retained mode.
    pub state_space: Vec<S>,
    /// Static gain correction matrix, `n_outputs × n_inputs`.
    pub psi_dcg: Option<Array2<f64>>,
    pub ins: Vec<IoRange>,
    pub outs: Vec<IoRange>,
}

impl<S: ModeSolver> DiscreteModalSolver<S> {
    /// Returns the state space builder of the model.
    pub fn from_model(model: ModalModel) -> DiscreteStateSpace<S> {
        DiscreteStateSpace::new(model)
    }

    /// Loads a JSON model and returns its state space builder.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<DiscreteStateSpace<S>, StateSpaceError> {
        Ok(DiscreteStateSpace::new(ModalModel::from_path(path)?))
    }

    pub fn n_inputs(&self) -> usize {
        self.u.len()
    }
    pub fn n_outputs(&self) -> usize {
        self.y.len()
    }

    fn advance(&mut self) {
        let n = self.y.len();
        let u = &self.u;
        self.y = self
            .state_space
            .par_iter_mut()
            .fold(
                || vec![0f64; n],
                |mut a, m| {
                    a.iter_mut().zip(m.solve(u)).for_each(|(a, y)| *a += y);
                    a
                },
            )
            .reduce(
                || vec![0f64; n],
                |mut a, b| {
                    a.iter_mut().zip(&b).for_each(|(a, b)| *a += b);
                    a
                },
            );
        if let Some(psi) = &self.psi_dcg {
            let psi_u: Array1<f64> = psi.dot(&ArrayView1::from(&self.u[..]));
            self.y.iter_mut().zip(psi_u.iter()).for_each(|(y, v)| *y += v);
        }
    }
}

impl<S: ModeSolver + ModalCoefficients> DiscreteModalSolver<S> {
    /// The model as a device-ready [`ModalSystem`].
    pub fn modal_system(&self) -> Result<ModalSystem, StateSpaceError> {
        let system = ModalSystem::from_modes(self.state_space.iter().map(|m| {
            (
                m.mode_state_space(),
                (m.get_b().to_vec(), m.get_c().to_vec()),
            )
        }))?;
        Ok(match &self.psi_dcg {
            Some(psi) => system.with_dc_gain_compensator(psi.iter().copied().collect())?,
            None => system,
        })
    }

    /// Move the model onto a compute backend.
    ///
    /// The current modal states become the device's initial state.
    pub fn with_backend(
        self,
        backend: Arc<dyn ComputeBackend>,
    ) -> Result<AcceleratedModalSolver, StateSpaceError> {
        let system = self.modal_system()?;
        let stepper = backend.build(&system)?;
        log::info!(
            "{} modes uploaded to {}",
            system.n_mode(),
            stepper.device_info().name
        );
        Ok(AcceleratedModalSolver::new(self.ins, self.outs, stepper))
    }
}

impl<S: ModeSolver> ModalSolver for DiscreteModalSolver<S> {
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
        self.advance();
        Ok(())
    }
    fn n_modes(&self) -> usize {
        self.state_space.len()
    }
    fn method_name(&self) -> String {
        format!("host ({} threads)", rayon::current_num_threads())
    }
}

impl<S: ModeSolver> Iterator for DiscreteModalSolver<S> {
    type Item = ();
    fn next(&mut self) -> Option<Self::Item> {
        self.advance();
        Some(())
    }
}

impl<S: ModeSolver> fmt::Display for DiscreteModalSolver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        describe(
            f,
            "DiscreteModalSolver",
            self.u.len(),
            &self.ins,
            self.y.len(),
            &self.outs,
            self.state_space.len(),
        )
    }
}
