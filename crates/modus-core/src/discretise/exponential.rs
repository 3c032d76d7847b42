//! Zero-order hold discretisation.
//!
//! With $\sigma = \zeta\omega$ the transition matrix is
//!
//! $$
//! \Phi = e^{A\tau} = e^{-\sigma\tau}\left[(C + \sigma S) I + S A\right]
//! $$
//!
//! where, depending on the damping regime,
//!
//! | regime | $C$ | $S$ |
//! |--------|-----|-----|
//! | $\zeta < 1$ | $\cos\omega_d\tau$ | $\sin(\omega_d\tau)/\omega_d$, $\omega_d = \omega\sqrt{1-\zeta^2}$ |
//! | $\zeta = 1$ | $1$ | $\tau$ |
//! | $\zeta > 1$ | $\cosh s\tau$ | $\sinh(s\tau)/s$, $s = \omega\sqrt{\zeta^2-1}$ |
//!
//! and the input vector $\Gamma = \int_0^\tau e^{As}ds\,[0, 1]^T$, whose first
//! entry is $\Gamma_1 = (1 - \Phi_{11})/\omega^2$.
//! Rigid body modes ($\omega = 0$) give $\Phi = [[1, \tau], [0, 1]]$ and
//! $\Gamma = [\tau^2/2, \tau]$.
//!
//! The closed form cancels badly when $\omega\tau$ is small (near-rigid modes),
//! so below `SERIES_RADIUS` $\Phi$ and $\Gamma$ are summed from their Taylor
//! series instead. Overdamped modes are evaluated from the decaying
//! exponentials $e^{-(\sigma \mp s)\tau}$ so that large $s\tau$ neither
//! overflows nor loses the slow pole.

use modus_compute::ModeStateSpace;
use serde::{Deserialize, Serialize};

use super::{dot, is_rigid_body, ModalCoefficients, ModeSolver};

/// Largest $\max(1, 2\zeta)\,\omega\tau$ discretised by series expansion.
const SERIES_RADIUS: f64 = 0.5;

/// Zero-order hold solver of a 2nd order mode.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Exponential {
    /// Sampling period (s).
    pub tau: f64,
    /// Row-major state transition matrix.
    pub phi: [f64; 4],
    pub gamma: [f64; 2],
    pub b: Vec<f64>,
    pub c: Vec<f64>,
    pub y: Vec<f64>,
    /// Modal displacement and velocity.
    pub x: (f64, f64),
}

impl Exponential {
    /// Zero-order hold transition matrix and input vector of the mode.
    pub fn transition(tau: f64, omega: f64, zeta: f64) -> ([f64; 4], [f64; 2]) {
        if is_rigid_body(omega) {
            return ([1.0, tau, 0.0, 1.0], [0.5 * tau * tau, tau]);
        }
        if omega * tau * (2.0 * zeta).max(1.0) <= SERIES_RADIUS {
            return Self::series(tau, omega, zeta);
        }
        let w2 = omega * omega;
        let sigma = zeta * omega;
        // e^{-στ}C and e^{-στ}S
        let (ec, es, gamma0) = if zeta < 1.0 {
            let wd = omega * (1.0 - zeta * zeta).sqrt();
            let e = (-sigma * tau).exp();
            (e * (wd * tau).cos(), e * (wd * tau).sin() / wd, None)
        } else if zeta > 1.0 {
            let sd = omega * (zeta * zeta - 1.0).sqrt();
            let fast = sigma + sd;
            let slow = w2 / fast;
            let e_slow = (-slow * tau).exp();
            // 1 - e^{-2sτ}
            let d = -(-2.0 * sd * tau).exp_m1();
            // Γ₁ = ∫ (e^{-slow t} - e^{-fast t}) / 2s dt, away from critical damping
            let gamma0 = (sd > 0.5 * sigma).then(|| {
                let integral = |p: f64| -(-p * tau).exp_m1() / p;
                (integral(slow) - integral(fast)) / (2.0 * sd)
            });
            (e_slow * (2.0 - d) * 0.5, e_slow * d / (2.0 * sd), gamma0)
        } else {
            let e = (-sigma * tau).exp();
            (e, e * tau, None)
        };
        let phi = [ec + sigma * es, es, -w2 * es, ec - sigma * es];
        let gamma = [gamma0.unwrap_or((1.0 - phi[0]) / w2), es];
        (phi, gamma)
    }

    /// Taylor series of Φ and Γ, for small ωτ and ζωτ.
    fn series(tau: f64, omega: f64, zeta: f64) -> ([f64; 4], [f64; 2]) {
        let w2 = omega * omega;
        let two_sigma = 2.0 * zeta * omega;
        // (Aτ)^k e₂ / k!
        let mut term = [0.0, 1.0];
        let mut phi_e2 = [0.0, 0.0];
        let mut gamma = [0.0, 0.0];
        for k in 0..64 {
            let fk = k as f64;
            phi_e2[0] += term[0];
            phi_e2[1] += term[1];
            gamma[0] += term[0] * tau / (fk + 1.0);
            gamma[1] += term[1] * tau / (fk + 1.0);
            term = [
                tau * term[1] / (fk + 1.0),
                -tau * (w2 * term[0] + two_sigma * term[1]) / (fk + 1.0),
            ];
            if term[0].abs() <= f64::EPSILON * phi_e2[0].abs()
                && term[1].abs() <= f64::EPSILON * phi_e2[1].abs()
            {
                break;
            }
        }
        // A e₁ = -ω² e₂, so Φ e₁ = e₁ - ω² Γ
        let phi = [1.0 - w2 * gamma[0], phi_e2[0], -w2 * gamma[1], phi_e2[1]];
        (phi, gamma)
    }
}

impl ModeSolver for Exponential {
    fn from_second_order(
        tau: f64,
        omega: f64,
        zeta: f64,
        continuous_bb: Vec<f64>,
        continuous_cc: Vec<f64>,
    ) -> Self {
        let (phi, gamma) = Self::transition(tau, omega, zeta);
        Self {
            tau,
            phi,
            gamma,
            y: vec![0.0; continuous_cc.len()],
            b: continuous_bb,
            c: continuous_cc,
            x: (0.0, 0.0),
        }
    }

    fn solve(&mut self, u: &[f64]) -> &[f64] {
        let (x0, x1) = self.x;
        let f = dot(&self.b, u);
        self.y
            .iter_mut()
            .zip(&self.c)
            .for_each(|(y, c)| *y = c * x0);
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

impl ModalCoefficients for Exponential {
    fn mode_state_space(&self) -> ModeStateSpace {
        ModeStateSpace::new(self.phi, self.gamma).with_state(self.x.0, self.x.1)
    }
}
