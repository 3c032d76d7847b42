//! Bilinear (Tustin) discretisation.
//!
//! With $M = (I - A\tau/2)^{-1}$:
//!
//! $$
//! \Phi = M (I + A\tau/2), \quad \Gamma = M\tau\,[0, 1]^T, \quad
//! q_k = (M x_k)_1 + \frac{\tau}{2}\Gamma_1 f_k
//! $$
//!
//! The output carries a feedthrough of the current input, which the device
//! coefficient record has no room for, so this solver only runs on the host.

use serde::{Deserialize, Serialize};

use super::{dot, ModeSolver};

/// Tustin solver of a 2nd order mode.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Bilinear {
    pub tau: f64,
    /// Row-major state transition matrix.
    pub phi: [f64; 4],
    pub gamma: [f64; 2],
    /// First row of `M`.
    pub m: [f64; 2],
    /// Feedthrough of the modal force into the modal displacement.
    pub d: f64,
    pub b: Vec<f64>,
    pub c: Vec<f64>,
    pub y: Vec<f64>,
    pub x: (f64, f64),
}

impl ModeSolver for Bilinear {
    fn from_second_order(
        tau: f64,
        omega: f64,
        zeta: f64,
        continuous_bb: Vec<f64>,
        continuous_cc: Vec<f64>,
    ) -> Self {
        let sigma = zeta * omega;
        let w2t2 = 0.25 * omega * omega * tau * tau;
        let det = 1.0 + sigma * tau + w2t2;
        let phi = [
            (1.0 + sigma * tau - w2t2) / det,
            tau / det,
            -omega * omega * tau / det,
            (1.0 - sigma * tau - w2t2) / det,
        ];
        let gamma = [0.5 * tau * tau / det, tau / det];
        Self {
            tau,
            phi,
            gamma,
            m: [(1.0 + sigma * tau) / det, 0.5 * tau / det],
            d: 0.25 * tau * tau / det,
            y: vec![0.0; continuous_cc.len()],
            b: continuous_bb,
            c: continuous_cc,
            x: (0.0, 0.0),
        }
    }

    fn solve(&mut self, u: &[f64]) -> &[f64] {
        let (x0, x1) = self.x;
        let f = dot(&self.b, u);
        let q = self.m[0] * x0 + self.m[1] * x1 + self.d * f;
        self.y.iter_mut().zip(&self.c).for_each(|(y, c)| *y = c * q);
        self.x = (
            self.phi[0] * x0 + self.phi[1] * x1 + self.gamma[0] * f,
            self.phi[2] * x0 + self.phi[3] * x1 + self.gamma[1] * f,
        );
        self.y.as_slice()
    }

    fn get_b(&self) -> &[f64] {
        &self.b
    }
    fn get_c(&self) -> &[f64] {
        &self.c
    }
}
