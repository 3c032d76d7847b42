//! Finite element model in second-order modal form.
//!
//! A [`ModalModel`] is the FEM after modal decomposition: one eigen frequency
//! and one damping coefficient per mode, plus the two maps that connect the
//! physical inputs to the modal forces and the modal displacements to the
//! physical outputs. Inputs and outputs are grouped into named blocks, e.g.
//! all the actuator forces of a mirror segment.
//!
//! Models are stored as JSON.

use std::fmt;
use std::ops::Range;
use std::path::Path;

use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading or querying a modal model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Inconsistent model: {0}")]
    Inconsistent(String),

    #[error("Unknown input '{0}'")]
    UnknownInput(String),

    #[error("Unknown output '{0}'")]
    UnknownOutput(String),

    #[error("Model has no static gain")]
    MissingStaticGain,
}

/// A named block of contiguous inputs or outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoGroup {
    pub name: String,
    pub size: usize,
}

impl IoGroup {
    pub fn new<S: Into<String>>(name: S, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Second-order modal form of a FEM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModalModel {
    /// Free-form description of the model's origin.
    #[serde(default)]
    pub description: String,
    /// Eigen frequencies (Hz), one per mode.
    pub eigen_frequencies: Vec<f64>,
    /// Proportional damping coefficients, one per mode.
    pub proportional_damping: Vec<f64>,
    pub inputs: Vec<IoGroup>,
    pub outputs: Vec<IoGroup>,
    /// `n_modes × n_inputs`, row-major.
    pub inputs_to_modal_forces: Vec<f64>,
    /// `n_outputs × n_modes`, row-major.
    pub modal_disp_to_outputs: Vec<f64>,
    /// `n_outputs × n_inputs`, row-major.
    #[serde(default)]
    pub static_gain: Option<Vec<f64>>,
}

impl ModalModel {
    /// Load a model from a JSON file and check its consistency.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        log::info!("loading modal model from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        let model: Self = serde_json::from_str(&content)?;
        model.validate()?;
        Ok(model)
    }

    /// Save the model to a JSON file.
    pub fn to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        log::info!("saving modal model to {}", path.display());
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check that every array agrees with the mode and IO counts.
    pub fn validate(&self) -> Result<(), ModelError> {
        let n_modes = self.n_modes();
        let (n_inputs, n_outputs) = (self.n_inputs(), self.n_outputs());
        let expect = |what: &str, expected: usize, found: usize| {
            if expected == found {
                Ok(())
            } else {
                Err(ModelError::Inconsistent(format!(
                    "{} has {} entries, expected {}",
                    what, found, expected
                )))
            }
        };
        if n_modes == 0 {
            return Err(ModelError::Inconsistent("no modes".into()));
        }
        expect("proportional_damping", n_modes, self.proportional_damping.len())?;
        expect(
            "inputs_to_modal_forces",
            n_modes * n_inputs,
            self.inputs_to_modal_forces.len(),
        )?;
        expect(
            "modal_disp_to_outputs",
            n_outputs * n_modes,
            self.modal_disp_to_outputs.len(),
        )?;
        if let Some(g) = &self.static_gain {
            expect("static_gain", n_outputs * n_inputs, g.len())?;
        }
        if let Some(f) = self.eigen_frequencies.iter().find(|f| !f.is_finite() || **f < 0.0) {
            return Err(ModelError::Inconsistent(format!(
                "eigen frequency {} is not a finite non-negative value",
                f
            )));
        }
        Ok(())
    }

    pub fn n_modes(&self) -> usize {
        self.eigen_frequencies.len()
    }
    pub fn n_inputs(&self) -> usize {
        self.inputs.iter().map(|g| g.size).sum()
    }
    pub fn n_outputs(&self) -> usize {
        self.outputs.iter().map(|g| g.size).sum()
    }

    /// Eigen frequencies in rad/s.
    pub fn eigen_frequencies_to_radians(&self) -> Vec<f64> {
        self.eigen_frequencies
            .iter()
            .map(|x| 2.0 * std::f64::consts::PI * x)
            .collect()
    }

    /// Position of the named input block in the full input vector.
    pub fn input_range(&self, name: &str) -> Option<Range<usize>> {
        group_range(&self.inputs, name)
    }

    /// Position of the named output block in the full output vector.
    pub fn output_range(&self, name: &str) -> Option<Range<usize>> {
        group_range(&self.outputs, name)
    }

    /// The full `n_modes × n_inputs` input to modal forces matrix.
    pub fn forces_to_modes(&self) -> Result<ArrayView2<'_, f64>, ModelError> {
        ArrayView2::from_shape(
            (self.n_modes(), self.n_inputs()),
            &self.inputs_to_modal_forces,
        )
        .map_err(|e| ModelError::Inconsistent(e.to_string()))
    }

    /// The full `n_outputs × n_modes` modal displacements to outputs matrix.
    pub fn modes_to_outputs(&self) -> Result<ArrayView2<'_, f64>, ModelError> {
        ArrayView2::from_shape(
            (self.n_outputs(), self.n_modes()),
            &self.modal_disp_to_outputs,
        )
        .map_err(|e| ModelError::Inconsistent(e.to_string()))
    }

    /// The full `n_outputs × n_inputs` static gain matrix.
    pub fn static_gain_matrix(&self) -> Result<ArrayView2<'_, f64>, ModelError> {
        let g = self.static_gain.as_ref().ok_or(ModelError::MissingStaticGain)?;
        ArrayView2::from_shape((self.n_outputs(), self.n_inputs()), g)
            .map_err(|e| ModelError::Inconsistent(e.to_string()))
    }

    /// The `n_modes × size` block of the input to modal forces matrix.
    pub fn input_block(&self, name: &str) -> Result<Array2<f64>, ModelError> {
        let range = self
            .input_range(name)
            .ok_or_else(|| ModelError::UnknownInput(name.to_string()))?;
        Ok(self.forces_to_modes()?.slice(s![.., range]).to_owned())
    }

    /// The `size × n_modes` block of the modal displacements to outputs matrix.
    pub fn output_block(&self, name: &str) -> Result<Array2<f64>, ModelError> {
        let range = self
            .output_range(name)
            .ok_or_else(|| ModelError::UnknownOutput(name.to_string()))?;
        Ok(self.modes_to_outputs()?.slice(s![range, ..]).to_owned())
    }

    /// The block of the static gain from input `input` to output `output`.
    pub fn static_gain_block(&self, input: &str, output: &str) -> Result<Array2<f64>, ModelError> {
        let cols = self
            .input_range(input)
            .ok_or_else(|| ModelError::UnknownInput(input.to_string()))?;
        let rows = self
            .output_range(output)
            .ok_or_else(|| ModelError::UnknownOutput(output.to_string()))?;
        Ok(self.static_gain_matrix()?.slice(s![rows, cols]).to_owned())
    }
}

fn group_range(groups: &[IoGroup], name: &str) -> Option<Range<usize>> {
    let mut start = 0;
    for g in groups {
        if g.name == name {
            return Some(start..start + g.size);
        }
        start += g.size;
    }
    None
}

impl fmt::Display for ModalModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        let (lo, hi) = self
            .eigen_frequencies
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| {
                (lo.min(x), hi.max(x))
            });
        writeln!(
            f,
            " - # of modes: {} ({:.3}Hz .. {:.3}Hz)",
            self.n_modes(),
            lo,
            hi
        )?;
        writeln!(f, " - inputs ({}):", self.n_inputs())?;
        for g in &self.inputs {
            writeln!(f, "   . {:<32} {:>6}", g.name, g.size)?;
        }
        writeln!(f, " - outputs ({}):", self.n_outputs())?;
        for g in &self.outputs {
            writeln!(f, "   . {:<32} {:>6}", g.name, g.size)?;
        }
        write!(
            f,
            " - static gain: {}",
            if self.static_gain.is_some() { "yes" } else { "no" }
        )
    }
}
