//! Modal state-space solvers.
//!
//! The [`ModalSolver`] trait defines the interface the CLI drives: write the
//! inputs by name, step, read the outputs by name. Two implementations:
//!
//! - [`DiscreteModalSolver`]: the modes are [`ModeSolver`](crate::discretise::ModeSolver)
//!   values stepped on the host, in parallel with Rayon.
//! - [`AcceleratedModalSolver`]: the modes live on a
//!   [`ComputeBackend`](modus_compute::ComputeBackend) device.

mod accelerated;
mod discrete;

pub use accelerated::AcceleratedModalSolver;
pub use discrete::DiscreteModalSolver;

use modus_compute::ComputeError;
use thiserror::Error;

use crate::types::{find_io, IoRange};

/// Errors that can occur while stepping a modal solver.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Unknown input '{0}'")]
    UnknownInput(String),

    #[error("Unknown output '{0}'")]
    UnknownOutput(String),

    #[error("Input '{name}' has {expected} channels, got {found} values")]
    DimensionMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Compute backend error: {0}")]
    Compute(#[from] ComputeError),
}

/// A discrete modal state-space model driven by named inputs.
pub trait ModalSolver: Send {
    /// Input blocks, in the order they appear in the input vector.
    fn inputs(&self) -> &[IoRange];

    /// Output blocks, in the order they appear in the output vector.
    fn outputs(&self) -> &[IoRange];

    /// The full input vector.
    fn u_mut(&mut self) -> &mut [f64];

    /// The full output vector of the last step.
    fn y(&self) -> &[f64];

    /// Advance the model by one sample.
    fn step(&mut self) -> Result<(), SolverError>;

    /// Number of modes in the model.
    fn n_modes(&self) -> usize;

    /// Human-readable name of the execution method.
    fn method_name(&self) -> String;

    /// Write the values of the named input block.
    fn set_input(&mut self, name: &str, values: &[f64]) -> Result<(), SolverError> {
        let range = find_io(self.inputs(), name)
            .ok_or_else(|| SolverError::UnknownInput(name.to_string()))?
            .range
            .clone();
        if range.len() != values.len() {
            return Err(SolverError::DimensionMismatch {
                name: name.to_string(),
                expected: range.len(),
                found: values.len(),
            });
        }
        self.u_mut()[range].copy_from_slice(values);
        Ok(())
    }

    /// Mutable access to the named input block.
    fn input_mut(&mut self, name: &str) -> Option<&mut [f64]> {
        let range = find_io(self.inputs(), name)?.range.clone();
        Some(&mut self.u_mut()[range])
    }

    /// The named output block from the last step.
    fn output(&self, name: &str) -> Option<&[f64]> {
        find_io(self.outputs(), name).map(|io| &self.y()[io.range.clone()])
    }
}

/// Multi-line summary shared by the solvers' `Display` implementations.
pub(crate) fn describe(
    f: &mut std::fmt::Formatter<'_>,
    title: &str,
    n_input: usize,
    ins: &[IoRange],
    n_output: usize,
    outs: &[IoRange],
    n_modes: usize,
) -> std::fmt::Result {
    writeln!(f, "{}:", title)?;
    writeln!(f, " - inputs ({}):", n_input)?;
    for io in ins {
        writeln!(f, "   . {} [{:?}]", io.name, io.range)?;
    }
    writeln!(f, " - outputs ({}):", n_output)?;
    for io in outs {
        writeln!(f, "   . {} [{:?}]", io.name, io.range)?;
    }
    write!(f, " - {} 2x2 state space models", n_modes)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feedthrough of the input vector, reversed.
    struct Mirror {
        ins: Vec<IoRange>,
        outs: Vec<IoRange>,
        u: Vec<f64>,
        y: Vec<f64>,
    }

    impl Mirror {
        fn new() -> Self {
            Self {
                ins: vec![IoRange::new("a", 0..1), IoRange::new("b", 1..3)],
                outs: vec![IoRange::new("z", 0..3)],
                u: vec![0.0; 3],
                y: vec![0.0; 3],
            }
        }
    }

    impl ModalSolver for Mirror {
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
            self.y = self.u.iter().rev().copied().collect();
            Ok(())
        }
        fn n_modes(&self) -> usize {
            0
        }
        fn method_name(&self) -> String {
            "mirror".into()
        }
    }

    #[test]
    fn test_set_input_writes_the_named_block() {
        let mut solver = Mirror::new();
        solver.set_input("b", &[2.0, 3.0]).unwrap();
        solver.set_input("a", &[1.0]).unwrap();
        solver.step().unwrap();
        assert_eq!(solver.output("z"), Some(&[3.0, 2.0, 1.0][..]));
        assert!(solver.output("a").is_none());
    }

    #[test]
    fn test_set_input_rejects_a_wrong_length() {
        let mut solver = Mirror::new();
        match solver.set_input("b", &[1.0, 2.0, 3.0]) {
            Err(SolverError::DimensionMismatch {
                name,
                expected,
                found,
            }) => {
                assert_eq!(name, "b");
                assert_eq!((expected, found), (2, 3));
            }
            other => panic!("expected a dimension mismatch, got {:?}", other),
        }
        assert_eq!(solver.u, vec![0.0; 3]);
        assert!(matches!(
            solver.set_input("c", &[1.0]),
            Err(SolverError::UnknownInput(name)) if name == "c"
        ));
    }
}
