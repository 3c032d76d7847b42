//! Host-side layout of a modal state-space model.
//!
//! This is the representation every backend consumes: one
//! [`ModeStateSpace`] coefficient record per mode, the input-to-modal map
//! stored as one row per mode and the modal-to-output map stored as one
//! column per mode.

use serde::{Deserialize, Serialize};

use crate::backend::{check_len, ComputeError};

/// Discrete-time coefficients of a single 2nd order mode.
///
/// The state is `(x0, x1)`, the modal displacement and velocity. For a scalar
/// modal force `f` the update is
///
/// ```text
/// x0' = a0 x0 + a1 x1 + b2 f
/// x1' = a2 x0 + a3 x1 + b3 f
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeStateSpace {
    pub x0: f64,
    pub x1: f64,
    pub a0: f64,
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub b2: f64,
    pub b3: f64,
}

impl ModeStateSpace {
    /// Build a record from a row-major transition matrix `phi` and an input
    /// vector `gamma`, with a zero initial state.
    pub fn new(phi: [f64; 4], gamma: [f64; 2]) -> Self {
        Self {
            x0: 0.0,
            x1: 0.0,
            a0: phi[0],
            a1: phi[1],
            a2: phi[2],
            a3: phi[3],
            b2: gamma[0],
            b3: gamma[1],
        }
    }

    /// Set the initial state.
    pub fn with_state(self, x0: f64, x1: f64) -> Self {
        Self { x0, x1, ..self }
    }

    /// Apply one update to `state` under the modal force `f`.
    #[inline]
    pub fn advance(&self, state: [f64; 2], f: f64) -> [f64; 2] {
        [
            self.a0 * state[0] + self.a1 * state[1] + self.b2 * f,
            self.a2 * state[0] + self.a3 * state[1] + self.b3 * f,
        ]
    }
}

/// A complete modal state-space model, ready to be uploaded to a device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalSystem {
    n_mode: usize,
    n_input: usize,
    n_output: usize,
    modes: Vec<ModeStateSpace>,
    /// `n_mode` rows of length `n_input`.
    i2m_rows: Vec<f64>,
    /// `n_mode` columns of length `n_output`.
    m2o_cols: Vec<f64>,
    /// `n_output × n_input`, row-major.
    dc_gain_compensator: Option<Vec<f64>>,
}

impl ModalSystem {
    /// Assemble a modal system, checking that the maps agree with the number
    /// of modes and with each other.
    pub fn new(
        modes: Vec<ModeStateSpace>,
        n_input: usize,
        i2m_rows: Vec<f64>,
        n_output: usize,
        m2o_cols: Vec<f64>,
    ) -> Result<Self, ComputeError> {
        let n_mode = modes.len();
        if n_mode == 0 {
            return Err(ComputeError::InvalidSystem("no modes".into()));
        }
        if n_input == 0 || n_output == 0 {
            return Err(ComputeError::InvalidSystem(format!(
                "{} inputs and {} outputs, both must be non-zero",
                n_input, n_output
            )));
        }
        check_len("input to modes map", n_mode * n_input, i2m_rows.len())?;
        check_len("modes to output map", n_mode * n_output, m2o_cols.len())?;
        Ok(Self {
            n_mode,
            n_input,
            n_output,
            modes,
            i2m_rows,
            m2o_cols,
            dc_gain_compensator: None,
        })
    }

    /// Assemble a modal system from per-mode `(coefficients, (b, c))` triplets.
    ///
    /// All the `b` vectors must share one length, and all the `c` vectors
    /// must share another.
    pub fn from_modes<I>(modes: I) -> Result<Self, ComputeError>
    where
        I: IntoIterator<Item = (ModeStateSpace, (Vec<f64>, Vec<f64>))>,
    {
        let (modes, (b, c)): (Vec<_>, (Vec<_>, Vec<_>)) = modes.into_iter().unzip();
        let n_input = b.first().map_or(0, Vec::len);
        let n_output = c.first().map_or(0, Vec::len);
        if let Some(bad) = b.iter().find(|b| b.len() != n_input) {
            return Err(ComputeError::DimensionMismatch {
                what: "mode input vector",
                expected: n_input,
                found: bad.len(),
            });
        }
        if let Some(bad) = c.iter().find(|c| c.len() != n_output) {
            return Err(ComputeError::DimensionMismatch {
                what: "mode output vector",
                expected: n_output,
                found: bad.len(),
            });
        }
        Self::new(
            modes,
            n_input,
            b.into_iter().flatten().collect(),
            n_output,
            c.into_iter().flatten().collect(),
        )
    }

    /// Attach a `n_output × n_input` row-major DC-gain compensator.
    pub fn with_dc_gain_compensator(mut self, dcg: Vec<f64>) -> Result<Self, ComputeError> {
        check_len("DC gain compensator", self.n_output * self.n_input, dcg.len())?;
        self.dc_gain_compensator = Some(dcg);
        Ok(self)
    }

    pub fn n_mode(&self) -> usize {
        self.n_mode
    }
    pub fn n_input(&self) -> usize {
        self.n_input
    }
    pub fn n_output(&self) -> usize {
        self.n_output
    }
    pub fn modes(&self) -> &[ModeStateSpace] {
        &self.modes
    }
    pub fn i2m_rows(&self) -> &[f64] {
        &self.i2m_rows
    }
    pub fn m2o_cols(&self) -> &[f64] {
        &self.m2o_cols
    }
    pub fn dc_gain_compensator(&self) -> Option<&[f64]> {
        self.dc_gain_compensator.as_deref()
    }

    /// Initial modal states, one `(x0, x1)` pair per mode.
    pub fn initial_state(&self) -> Vec<[f64; 2]> {
        self.modes.iter().map(|m| [m.x0, m.x1]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(b: Vec<f64>, c: Vec<f64>) -> (ModeStateSpace, (Vec<f64>, Vec<f64>)) {
        (ModeStateSpace::new([1.0, 0.0, 0.0, 1.0], [0.0, 0.0]), (b, c))
    }

    #[test]
    fn test_from_modes_flattens_maps() {
        let system = ModalSystem::from_modes(vec![
            mode(vec![1.0, 2.0], vec![3.0, 4.0, 5.0]),
            mode(vec![6.0, 7.0], vec![8.0, 9.0, 10.0]),
        ])
        .unwrap();
        assert_eq!(system.n_mode(), 2);
        assert_eq!(system.n_input(), 2);
        assert_eq!(system.n_output(), 3);
        assert_eq!(system.i2m_rows(), &[1.0, 2.0, 6.0, 7.0]);
        assert_eq!(system.m2o_cols(), &[3.0, 4.0, 5.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_from_modes_rejects_ragged_inputs() {
        let err = ModalSystem::from_modes(vec![
            mode(vec![1.0, 2.0], vec![3.0]),
            mode(vec![6.0], vec![8.0]),
        ])
        .unwrap_err();
        assert!(matches!(
            err,
            ComputeError::DimensionMismatch { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn test_empty_system_is_invalid() {
        let err = ModalSystem::from_modes(Vec::<(ModeStateSpace, (Vec<f64>, Vec<f64>))>::new())
            .unwrap_err();
        assert!(matches!(err, ComputeError::InvalidSystem(_)));
    }

    #[test]
    fn test_compensator_shape_is_checked() {
        let system = ModalSystem::from_modes(vec![mode(vec![1.0, 2.0], vec![3.0])]).unwrap();
        assert!(system.clone().with_dc_gain_compensator(vec![0.0; 3]).is_err());
        let system = system.with_dc_gain_compensator(vec![0.5, 0.25]).unwrap();
        assert_eq!(system.dc_gain_compensator(), Some(&[0.5, 0.25][..]));
    }

    #[test]
    fn test_advance_applies_row_major_transition() {
        let m = ModeStateSpace::new([1.0, 2.0, 3.0, 4.0], [5.0, 6.0]);
        assert_eq!(m.advance([1.0, 1.0], 1.0), [8.0, 13.0]);
    }
}
