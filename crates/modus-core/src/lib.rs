//! # Modus Core
//!
//! Discrete-time modal state-space models of finite element models. The FEM
//! comes in its second-order modal form ([`model::ModalModel`]); every mode
//! is discretised on its own ([`discretise`]) and the modes are stepped
//! together, on the host or on a [`modus_compute`] backend.
//!
//! ## Architecture
//!
//! ```text
//! ModalModel ──► DiscreteStateSpace ──build──► DiscreteModalSolver<S>
//!  (JSON)          (builder)                        │ with_backend
//!                                                   ▼
//!                                        AcceleratedModalSolver
//! ```
//!
//! Both solvers implement [`ModalSolver`]: write the inputs by name, step,
//! read the outputs by name.
//!
//! ## Modules
//!
//! - [`model`]: FEM modal data and its JSON representation.
//! - [`discretise`]: per-mode solvers (zero-order hold and Tustin).
//! - [`builder`]: mode truncation, IO selection and static gain compensation.
//! - [`solver`]: the host and accelerated modal solvers.
//! - [`types`]: IO bookkeeping.

pub mod builder;
pub mod discretise;
pub mod model;
pub mod solver;
pub mod types;

pub use builder::{DiscreteStateSpace, IoSelection, StateSpaceError};
pub use model::{IoGroup, ModalModel, ModelError};
pub use solver::{AcceleratedModalSolver, DiscreteModalSolver, ModalSolver, SolverError};
pub use types::IoRange;
