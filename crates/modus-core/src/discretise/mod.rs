//! Discretisation of single 2nd order modes.
//!
//! Each mode of the FEM obeys
//!
//! $$
//! \ddot{q} + 2\zeta\omega\dot{q} + \omega^2 q = \mathbf{b}^T\mathbf{u},
//! \qquad \mathbf{y} = \mathbf{c}\, q
//! $$
//!
//! which, with the state $x = (q, \dot{q})$, is the continuous system
//! $\dot{x} = A x + [0, 1]^T f$ with $A = [[0, 1], [-\omega^2, -2\zeta\omega]]$.
//! A [`ModeSolver`] turns it into a discrete recurrence at the sampling
//! period $\tau$ and steps it.
//!
//! - [`Exponential`]: zero-order hold, exact for piecewise constant inputs.
//! - [`Bilinear`]: Tustin transform, with an input feedthrough.

mod bilinear;
mod exponential;

pub use bilinear::Bilinear;
pub use exponential::Exponential;

use modus_compute::ModeStateSpace;

/// Natural frequencies (rad/s) up to this value are treated as rigid body modes.
pub const RIGID_BODY_OMEGA: f64 = 1e-9;

/// Whether a mode of natural frequency `omega` (rad/s) is a rigid body mode.
#[inline]
pub fn is_rigid_body(omega: f64) -> bool {
    omega <= RIGID_BODY_OMEGA
}

/// A discrete-time solver for one 2nd order mode.
pub trait ModeSolver: Send + Sync {
    /// Discretise the mode of natural frequency `omega` (rad/s) and damping
    /// `zeta` at the sampling period `tau` (s). `continuous_bb` is the row of
    /// the input to modal forces matrix, `continuous_cc` the column of the
    /// modal displacements to outputs matrix.
    fn from_second_order(
        tau: f64,
        omega: f64,
        zeta: f64,
        continuous_bb: Vec<f64>,
        continuous_cc: Vec<f64>,
    ) -> Self;

    /// Advance the mode by one sample and return its contribution to the
    /// outputs.
    fn solve(&mut self, u: &[f64]) -> &[f64];

    fn n_input(&self) -> usize {
        self.get_b().len()
    }
    fn n_output(&self) -> usize {
        self.get_c().len()
    }
    fn get_b(&self) -> &[f64];
    fn get_c(&self) -> &[f64];
}

/// Solvers whose recurrence fits the device coefficient record, and can
/// therefore be stepped by a [`modus_compute::ComputeBackend`].
pub trait ModalCoefficients {
    /// Coefficients and current state of the mode.
    fn mode_state_space(&self) -> ModeStateSpace;
}

#[inline]
pub(crate) fn dot(b: &[f64], u: &[f64]) -> f64 {
    b.iter().zip(u).map(|(b, u)| b * u).sum()
}
