//! Discrete state-space model builder.
//!
//! [`DiscreteStateSpace`] collects the sampling rate, the damping, the mode
//! truncation rules and the inputs and outputs to keep, then
//! [`build`](DiscreteStateSpace::build)s a [`DiscreteModalSolver`].
//!
//! ```no_run
//! use modus_core::{discretise::Exponential, DiscreteModalSolver};
//!
//! let solver = DiscreteModalSolver::<Exponential>::from_path("model.json")?
//!     .sampling(1e3)
//!     .proportional_damping(2e-2)
//!     .max_eigen_frequency(75.0)
//!     .ins("wind_loads")
//!     .outs("mirror_rbm")
//!     .build()?;
//! # Ok::<(), modus_core::StateSpaceError>(())
//! ```

mod dcg;

use std::f64::consts::PI;
use std::marker::PhantomData;

use modus_compute::ComputeError;
use ndarray::{concatenate, s, Array2, ArrayView2, Axis};
use rayon::prelude::*;
use thiserror::Error;

use crate::discretise::ModeSolver;
use crate::model::{ModalModel, ModelError};
use crate::solver::DiscreteModalSolver;
use crate::types::IoRange;

/// Errors from building a discrete state-space model.
#[derive(Debug, Error)]
pub enum StateSpaceError {
    #[error("argument {0} is missing")]
    MissingArguments(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Compute(#[from] ComputeError),

    #[error("{0}")]
    Matrix(String),

    #[error("mode #{index} is out of range, the model has {n_modes} modes")]
    ModeIndex { index: usize, n_modes: usize },

    #[error("'{0}' is not one of the selected inputs or outputs")]
    NotSelected(String),

    #[error("no mode left after truncation")]
    NoModes,
}

type Result<T> = std::result::Result<T, StateSpaceError>;

/// An input or output block and an optional transform applied to it.
///
/// An input transform (`size × m`) right-multiplies the `n_modes × size`
/// input block, an output transform (`m × size`) left-multiplies the
/// `size × n_modes` output block. Either way the block gets `m` channels.
#[derive(Debug, Clone)]
pub struct IoSelection {
    pub name: String,
    pub transform: Option<Array2<f64>>,
}

/// Builder of a [`DiscreteModalSolver`].
#[derive(Debug, Clone)]
pub struct DiscreteStateSpace<S: ModeSolver> {
    model: ModalModel,
    sampling: Option<f64>,
    zeta: Option<f64>,
    eigen_frequencies: Option<Vec<(usize, f64)>>,
    max_eigen_frequency: Option<f64>,
    hankel_singular_values_threshold: Option<f64>,
    hankel_frequency_lower_bound: Option<f64>,
    use_static_gain: bool,
    rigid_body_modes: Option<usize>,
    static_gain_exclusions: (Vec<String>, Vec<String>),
    ins: Vec<IoSelection>,
    outs: Vec<IoSelection>,
    phantom: PhantomData<S>,
}

impl<S: ModeSolver> From<ModalModel> for DiscreteStateSpace<S> {
    fn from(model: ModalModel) -> Self {
        Self::new(model)
    }
}

impl<S: ModeSolver> DiscreteStateSpace<S> {
    pub fn new(model: ModalModel) -> Self {
        Self {
            model,
            sampling: None,
            zeta: None,
            eigen_frequencies: None,
            max_eigen_frequency: None,
            hankel_singular_values_threshold: None,
            hankel_frequency_lower_bound: None,
            use_static_gain: false,
            rigid_body_modes: None,
            static_gain_exclusions: (Vec::new(), Vec::new()),
            ins: Vec::new(),
            outs: Vec::new(),
            phantom: PhantomData,
        }
    }

    pub fn model(&self) -> &ModalModel {
        &self.model
    }

    /// Set the sampling rate in Hz of the discrete state space model
    pub fn sampling(self, sampling: f64) -> Self {
        Self {
            sampling: Some(sampling),
            ..self
        }
    }
    /// Set the same proportional damping coefficient to all the modes
    pub fn proportional_damping(self, zeta: f64) -> Self {
        Self {
            zeta: Some(zeta),
            ..self
        }
    }
    /// Overwrites some eigen frequencies
    ///
    /// The overwritten frequencies are given as `(index, value)` where index
    /// is the eigen mode index and value the new eigen frequency in Hz.
    pub fn eigen_frequencies(self, eigen_frequencies: Vec<(usize, f64)>) -> Self {
        Self {
            eigen_frequencies: Some(eigen_frequencies),
            ..self
        }
    }
    /// Keeps only the modes with an eigen frequency lower or equal to `max_eigen_frequency`
    pub fn max_eigen_frequency(self, max_eigen_frequency: f64) -> Self {
        Self {
            max_eigen_frequency: Some(max_eigen_frequency),
            ..self
        }
    }
    /// Removes the modes with a Hankel singular value lower or equal to the threshold
    pub fn truncate_hankel_singular_values(self, threshold: f64) -> Self {
        Self {
            hankel_singular_values_threshold: Some(threshold),
            ..self
        }
    }
    /// Modes below this frequency (Hz) are never removed by the Hankel singular value truncation (default: 0Hz)
    pub fn hankel_frequency_lower_bound(self, hankel_frequency_lower_bound: f64) -> Self {
        Self {
            hankel_frequency_lower_bound: Some(hankel_frequency_lower_bound),
            ..self
        }
    }
    /// Adds a static feedthrough that restores the model static gain
    ///
    /// The model must come with a static gain.
    pub fn use_static_gain_compensation(self) -> Self {
        Self {
            use_static_gain: true,
            ..self
        }
    }
    /// Treats the first `n` retained modes as rigid body modes in the static gain compensation
    ///
    /// By default, a mode is rigid if its eigen frequency is zero.
    pub fn rigid_body_modes(self, n: usize) -> Self {
        Self {
            rigid_body_modes: Some(n),
            ..self
        }
    }
    /// Removes the static gain compensation from the given inputs and outputs
    pub fn exclude_from_static_gain<T: Into<String>>(self, ins: Vec<T>, outs: Vec<T>) -> Self {
        Self {
            static_gain_exclusions: (
                ins.into_iter().map(Into::into).collect(),
                outs.into_iter().map(Into::into).collect(),
            ),
            ..self
        }
    }

    /// Adds an input block
    pub fn ins<T: Into<String>>(mut self, name: T) -> Self {
        self.ins.push(IoSelection {
            name: name.into(),
            transform: None,
        });
        self
    }
    /// Adds an input block, right-multiplied by `transform`
    pub fn ins_with<T: Into<String>>(mut self, name: T, transform: Array2<f64>) -> Self {
        self.ins.push(IoSelection {
            name: name.into(),
            transform: Some(transform),
        });
        self
    }
    /// Adds input blocks, checking that the model has them
    pub fn ins_by_name<T: Into<String>>(self, names: Vec<T>) -> Result<Self> {
        names.into_iter().try_fold(self, |this, name| {
            let name = name.into();
            this.model
                .input_range(&name)
                .ok_or_else(|| ModelError::UnknownInput(name.clone()))?;
            Ok(this.ins(name))
        })
    }
    /// Adds an output block
    pub fn outs<T: Into<String>>(mut self, name: T) -> Self {
        self.outs.push(IoSelection {
            name: name.into(),
            transform: None,
        });
        self
    }
    /// Adds an output block, left-multiplied by `transform`
    pub fn outs_with<T: Into<String>>(mut self, name: T, transform: Array2<f64>) -> Self {
        self.outs.push(IoSelection {
            name: name.into(),
            transform: Some(transform),
        });
        self
    }
    /// Adds output blocks, checking that the model has them
    pub fn outs_by_name<T: Into<String>>(self, names: Vec<T>) -> Result<Self> {
        names.into_iter().try_fold(self, |this, name| {
            let name = name.into();
            this.model
                .output_range(&name)
                .ok_or_else(|| ModelError::UnknownOutput(name.clone()))?;
            Ok(this.outs(name))
        })
    }

    /// Returns the Hankel singular value for a given eigen mode
    pub fn hankel_singular_value(w: f64, z: f64, b: &[f64], c: &[f64]) -> f64 {
        let norm_x = |x: &[f64]| x.iter().map(|x| x * x).sum::<f64>().sqrt();
        0.25 * norm_x(b) * norm_x(c) / (w * z)
    }

    /// Computes the Hankel singular values of every mode, for all the model inputs and outputs
    pub fn hankel_singular_values(&self) -> Result<Vec<f64>> {
        let (w, zeta) = self.modal_properties()?;
        let forces_2_modes = self.model.forces_to_modes()?;
        let modes_2_nodes = self.model.modes_to_outputs()?;
        Ok((0..self.model.n_modes())
            .into_par_iter()
            .map(|k| {
                let b = forces_2_modes.row(k).to_vec();
                let c = modes_2_nodes.column(k).to_vec();
                Self::hankel_singular_value(w[k], zeta[k], &b, &c)
            })
            .collect())
    }

    /// Computes the Hankel singular values of the modes below the maximum
    /// eigen frequency, for the selected inputs and outputs
    pub fn reduced_hankel_singular_values(&self) -> Result<Vec<f64>> {
        let (w, zeta) = self.modal_properties()?;
        let modes = self.candidate_modes(&w);
        let (forces_2_modes, _) = self.in2mode()?;
        let (modes_2_nodes, _) = self.mode2out()?;
        Ok(modes
            .into_par_iter()
            .map(|k| {
                let b = forces_2_modes.row(k).to_vec();
                let c = modes_2_nodes.column(k).to_vec();
                Self::hankel_singular_value(w[k], zeta[k], &b, &c)
            })
            .collect())
    }

    /// Returns the largest finite Hankel singular value of the reduced model
    pub fn max_hankel_singular_value(&self) -> Option<f64> {
        self.reduced_hankel_singular_values()
            .ok()?
            .into_iter()
            .filter(|x| x.is_finite())
            .reduce(f64::max)
    }

    /// Returns the model static gain reduced to the selected inputs and outputs
    pub fn static_gain(&self) -> Result<Array2<f64>> {
        let gain = self.model.static_gain_matrix()?;
        let cols = self
            .ins
            .iter()
            .map(|io| {
                let range = self
                    .model
                    .input_range(&io.name)
                    .ok_or_else(|| ModelError::UnknownInput(io.name.clone()))?;
                let block = gain.slice(s![.., range]);
                match &io.transform {
                    Some(t) => right_multiply(&io.name, block, t),
                    None => Ok(block.to_owned()),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        let gain = stack(Axis(1), &cols)?;
        let rows = self
            .outs
            .iter()
            .map(|io| {
                let range = self
                    .model
                    .output_range(&io.name)
                    .ok_or_else(|| ModelError::UnknownOutput(io.name.clone()))?;
                let block = gain.slice(s![range, ..]);
                match &io.transform {
                    Some(t) => left_multiply(&io.name, t, block),
                    None => Ok(block.to_owned()),
                }
            })
            .collect::<Result<Vec<_>>>()?;
        stack(Axis(0), &rows)
    }

    /// Eigen frequencies in rad/s, with the overrides applied, and damping coefficients
    fn modal_properties(&self) -> Result<(Vec<f64>, Vec<f64>)> {
        let n_modes = self.model.n_modes();
        let mut w = self.model.eigen_frequencies_to_radians();
        if let Some(eigen_frequencies) = &self.eigen_frequencies {
            log::info!("Eigen values modified");
            for &(index, value) in eigen_frequencies {
                if index >= n_modes {
                    return Err(StateSpaceError::ModeIndex { index, n_modes });
                }
                if !value.is_finite() || value < 0.0 {
                    return Err(StateSpaceError::InvalidArgument(format!(
                        "eigen frequency override of mode #{}: {}",
                        index, value
                    )));
                }
                w[index] = 2. * PI * value;
            }
        }
        let zeta = match self.zeta {
            Some(zeta) => {
                if !zeta.is_finite() || zeta < 0.0 {
                    return Err(StateSpaceError::InvalidArgument(format!(
                        "proportional damping: {}",
                        zeta
                    )));
                }
                log::info!("Proportional coefficients modified, new value: {:.4}", zeta);
                vec![zeta; n_modes]
            }
            None => self.model.proportional_damping.clone(),
        };
        Ok((w, zeta))
    }

    /// Indices of the modes with an eigen frequency lower or equal to the maximum eigen frequency
    fn candidate_modes(&self, w: &[f64]) -> Vec<usize> {
        match self.max_eigen_frequency {
            Some(max_ef) => {
                let max_w = 2. * PI * max_ef;
                let modes: Vec<_> = (0..w.len()).filter(|&k| w[k] <= max_w).collect();
                log::info!(
                    "Eigen frequencies truncated to {:.3}Hz, hence reducing the number of modes from {} down to {}",
                    max_ef,
                    w.len(),
                    modes.len()
                );
                modes
            }
            None => (0..w.len()).collect(),
        }
    }

    /// The `n_modes × n_inputs` matrix of the selected inputs, and their ranges
    fn in2mode(&self) -> Result<(Array2<f64>, Vec<IoRange>)> {
        let mut start = 0;
        let mut ranges = Vec::with_capacity(self.ins.len());
        let blocks = self
            .ins
            .iter()
            .map(|io| {
                let block = self.model.input_block(&io.name)?;
                let block = match &io.transform {
                    Some(t) => right_multiply(&io.name, block.view(), t)?,
                    None => block,
                };
                let l = block.ncols();
                ranges.push(IoRange::new(io.name.clone(), start..start + l));
                start += l;
                Ok(block)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((stack(Axis(1), &blocks)?, ranges))
    }

    /// The `n_outputs × n_modes` matrix of the selected outputs, and their ranges
    fn mode2out(&self) -> Result<(Array2<f64>, Vec<IoRange>)> {
        let mut start = 0;
        let mut ranges = Vec::with_capacity(self.outs.len());
        let blocks = self
            .outs
            .iter()
            .map(|io| {
                let block = self.model.output_block(&io.name)?;
                let block = match &io.transform {
                    Some(t) => left_multiply(&io.name, t, block.view())?,
                    None => block,
                };
                let l = block.nrows();
                ranges.push(IoRange::new(io.name.clone(), start..start + l));
                start += l;
                Ok(block)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((stack(Axis(0), &blocks)?, ranges))
    }

    /// Builds the state space model
    pub fn build(self) -> Result<DiscreteModalSolver<S>> {
        let tau = match self.sampling {
            Some(x) if x.is_finite() && x > 0.0 => 1f64 / x,
            Some(x) => {
                return Err(StateSpaceError::InvalidArgument(format!(
                    "sampling frequency: {}",
                    x
                )))
            }
            None => return Err(StateSpaceError::MissingArguments("sampling".to_owned())),
        };
        if self.ins.is_empty() {
            return Err(StateSpaceError::MissingArguments("inputs".to_owned()));
        }
        if self.outs.is_empty() {
            return Err(StateSpaceError::MissingArguments("outputs".to_owned()));
        }

        let (w, zeta) = self.modal_properties()?;
        let candidates = self.candidate_modes(&w);
        let (forces_2_modes, ins) = self.in2mode()?;
        let (modes_2_nodes, outs) = self.mode2out()?;
        log::info!("forces 2 modes: {:?}", forces_2_modes.shape());
        log::info!("modes 2 nodes: {:?}", modes_2_nodes.shape());

        let n_candidates = candidates.len();
        let modes: Vec<usize> = match self.hankel_singular_values_threshold {
            Some(hsv_t) => {
                let lower_bound = self
                    .hankel_frequency_lower_bound
                    .map(|x| 2. * PI * x)
                    .unwrap_or_default();
                candidates
                    .into_iter()
                    .filter(|&k| {
                        if w[k] < lower_bound {
                            return true;
                        }
                        let b = forces_2_modes.row(k).to_vec();
                        let c = modes_2_nodes.column(k).to_vec();
                        Self::hankel_singular_value(w[k], zeta[k], &b, &c) > hsv_t
                    })
                    .collect()
            }
            None => candidates,
        };
        if modes.is_empty() {
            return Err(StateSpaceError::NoModes);
        }
        if modes.len() < n_candidates {
            log::info!(
                "Hankel singular values truncation: {} modes out of {} retained",
                modes.len(),
                n_candidates
            );
        }

        let state_space: Vec<S> = modes
            .iter()
            .map(|&k| {
                S::from_second_order(
                    tau,
                    w[k],
                    zeta[k],
                    forces_2_modes.row(k).to_vec(),
                    modes_2_nodes.column(k).to_vec(),
                )
            })
            .collect();

        let psi_dcg = if self.use_static_gain {
            let w_ss: Vec<f64> = modes.iter().map(|&k| w[k]).collect();
            let forces_2_modes = forces_2_modes.select(Axis(0), &modes);
            let modes_2_nodes = modes_2_nodes.select(Axis(1), &modes);
            Some(self.dc_gain_compensator(&w_ss, &forces_2_modes, &modes_2_nodes, &ins, &outs)?)
        } else {
            None
        };

        Ok(DiscreteModalSolver {
            u: vec![0f64; forces_2_modes.ncols()],
            y: vec![0f64; modes_2_nodes.nrows()],
            state_space,
            psi_dcg,
            ins,
            outs,
        })
    }
}

impl<S: ModeSolver> TryFrom<DiscreteStateSpace<S>> for DiscreteModalSolver<S> {
    type Error = StateSpaceError;

    fn try_from(dss: DiscreteStateSpace<S>) -> Result<Self> {
        dss.build()
    }
}

fn right_multiply(name: &str, block: ArrayView2<'_, f64>, t: &Array2<f64>) -> Result<Array2<f64>> {
    if t.nrows() != block.ncols() {
        return Err(StateSpaceError::Matrix(format!(
            "input transform of '{}' is {:?}, expected {} rows",
            name,
            t.shape(),
            block.ncols()
        )));
    }
    Ok(block.dot(t))
}

fn left_multiply(name: &str, t: &Array2<f64>, block: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
    if t.ncols() != block.nrows() {
        return Err(StateSpaceError::Matrix(format!(
            "output transform of '{}' is {:?}, expected {} columns",
            name,
            t.shape(),
            block.nrows()
        )));
    }
    Ok(t.dot(&block))
}

fn stack(axis: Axis, blocks: &[Array2<f64>]) -> Result<Array2<f64>> {
    let views: Vec<_> = blocks.iter().map(|b| b.view()).collect();
    concatenate(axis, &views).map_err(|e| StateSpaceError::Matrix(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretise::Exponential;
    use crate::model::IoGroup;
    use approx::assert_relative_eq;
    use ndarray::array;

    // 3 modes: rigid, 1Hz, 10Hz; inputs a(1), b(2); outputs y(2), z(1)
    fn model() -> ModalModel {
        ModalModel {
            description: String::new(),
            eigen_frequencies: vec![0.0, 1.0, 10.0],
            proportional_damping: vec![0.02; 3],
            inputs: vec![IoGroup::new("a", 1), IoGroup::new("b", 2)],
            outputs: vec![IoGroup::new("y", 2), IoGroup::new("z", 1)],
            inputs_to_modal_forces: vec![
                1.0, 0.0, 0.0, //
                0.5, 1.0, 0.0, //
                0.0, 0.2, 1.0,
            ],
            modal_disp_to_outputs: vec![
                1.0, 1.0, 0.0, //
                0.0, 1.0, 1.0, //
                1.0, 0.0, 1.0,
            ],
            static_gain: Some(vec![
                1.0, 2.0, 3.0, //
                4.0, 5.0, 6.0, //
                7.0, 8.0, 9.0,
            ]),
        }
    }

    fn builder() -> DiscreteStateSpace<Exponential> {
        DiscreteStateSpace::new(model())
    }

    #[test]
    fn test_build_requires_sampling() {
        let err = builder().ins("a").outs("y").build().unwrap_err();
        assert!(matches!(err, StateSpaceError::MissingArguments(ref s) if s == "sampling"));
    }

    #[test]
    fn test_build_requires_io() {
        let err = builder().sampling(1e3).outs("y").build().unwrap_err();
        assert!(matches!(err, StateSpaceError::MissingArguments(ref s) if s == "inputs"));
    }

    #[test]
    fn test_io_ranges_follow_selection_order() {
        let dms = builder().sampling(1e3).ins("b").ins("a").outs("z").build().unwrap();
        assert_eq!(dms.ins[0], IoRange::new("b", 0..2));
        assert_eq!(dms.ins[1], IoRange::new("a", 2..3));
        assert_eq!(dms.u.len(), 3);
        assert_eq!(dms.y.len(), 1);
        assert_eq!(dms.state_space[1].b, vec![1.0, 0.0, 0.5]);
    }

    #[test]
    fn test_max_eigen_frequency_drops_modes() {
        let dms = builder()
            .sampling(1e3)
            .max_eigen_frequency(5.0)
            .ins("a")
            .outs("y")
            .build()
            .unwrap();
        assert_eq!(dms.state_space.len(), 2);
    }

    #[test]
    fn test_eigen_frequency_override() {
        let dms = builder()
            .sampling(1e3)
            .eigen_frequencies(vec![(2, 3.0)])
            .max_eigen_frequency(5.0)
            .ins("a")
            .outs("y")
            .build()
            .unwrap();
        assert_eq!(dms.state_space.len(), 3);
        let err = builder()
            .sampling(1e3)
            .eigen_frequencies(vec![(3, 3.0)])
            .ins("a")
            .outs("y")
            .build()
            .unwrap_err();
        assert!(matches!(err, StateSpaceError::ModeIndex { index: 3, n_modes: 3 }));
    }

    #[test]
    fn test_transforms_reshape_blocks() {
        let dms = builder()
            .sampling(1e3)
            .ins_with("b", array![[1.0], [1.0]])
            .outs_with("y", array![[1.0, -1.0]])
            .build()
            .unwrap();
        assert_eq!(dms.u.len(), 1);
        assert_eq!(dms.y.len(), 1);
        // mode #2: b = [0.2, 1.0]·[1, 1]ᵀ, c = [1, -1]·[0, 1]ᵀ
        assert_relative_eq!(dms.state_space[2].b[0], 1.2);
        assert_relative_eq!(dms.state_space[2].c[0], -1.0);

        let err = builder()
            .sampling(1e3)
            .ins_with("b", array![[1.0]])
            .outs("y")
            .build()
            .unwrap_err();
        assert!(matches!(err, StateSpaceError::Matrix(_)));
    }

    #[test]
    fn test_unknown_names() {
        let err = builder().ins_by_name(vec!["a", "nope"]).unwrap_err();
        assert!(matches!(err, StateSpaceError::Model(ModelError::UnknownInput(_))));
        let err = builder().sampling(1e3).ins("a").outs("nope").build().unwrap_err();
        assert!(matches!(err, StateSpaceError::Model(ModelError::UnknownOutput(_))));
    }

    #[test]
    fn test_hankel_singular_value() {
        let hsv = DiscreteStateSpace::<Exponential>::hankel_singular_value(
            2.0,
            0.5,
            &[3.0, 4.0],
            &[1.0],
        );
        assert_relative_eq!(hsv, 1.25);
    }

    #[test]
    fn test_hankel_truncation_keeps_low_frequencies() {
        let b = builder().sampling(1e3).ins("b").outs("y");
        let hsv = b.reduced_hankel_singular_values().unwrap();
        assert_eq!(hsv.len(), 3);
        // mode #0 has no input from "b"
        assert!(hsv[0].is_nan());
        assert!(hsv[1] > hsv[2]);
        let threshold = 0.5 * (hsv[1] + hsv[2]);
        let dms = b.clone().truncate_hankel_singular_values(threshold).build().unwrap();
        assert_eq!(dms.state_space.len(), 1);
        let dms = b
            .truncate_hankel_singular_values(threshold)
            .hankel_frequency_lower_bound(20.0)
            .build()
            .unwrap();
        assert_eq!(dms.state_space.len(), 3);
    }

    #[test]
    fn test_max_hankel_singular_value_ignores_rigid_modes() {
        let b = builder().sampling(1e3).ins("a").outs("y");
        let max = b.max_hankel_singular_value().unwrap();
        let hsv = b.reduced_hankel_singular_values().unwrap();
        assert!(hsv[0].is_infinite());
        assert_relative_eq!(max, hsv[1].max(hsv[2]));
    }

    #[test]
    fn test_static_gain_reduction() {
        let g = builder()
            .ins("b")
            .outs("z")
            .outs_with("y", array![[1.0, 1.0]])
            .static_gain()
            .unwrap();
        assert_eq!(g, array![[8.0, 9.0], [7.0, 9.0]]);
    }

    #[test]
    fn test_truncation_to_nothing_is_an_error() {
        let err = builder()
            .sampling(1e3)
            .max_eigen_frequency(-1.0)
            .ins("a")
            .outs("y")
            .build()
            .unwrap_err();
        assert!(matches!(err, StateSpaceError::NoModes));
    }
}
