//! CPU compute backend using Rayon for shared-memory parallelism.

use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::backend::{check_len, BackendType, ComputeBackend, ComputeError, DeviceInfo, ModalStepper};
use crate::system::{ModalSystem, ModeStateSpace};

/// CPU backend that parallelises the modes across threads via Rayon.
///
/// [`CpuBackend::new`] runs on the global Rayon pool,
/// [`CpuBackend::with_threads`] on a pool of its own shared by every
/// stepper it builds.
pub struct CpuBackend {
    pool: Option<Arc<ThreadPool>>,
}

impl CpuBackend {
    /// Create a new CPU backend using all available threads.
    pub fn new() -> Self {
        Self { pool: None }
    }

    /// Create a CPU backend with a specified thread count.
    pub fn with_threads(num_threads: usize) -> Result<Self, ComputeError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("modus-cpu-{}", i))
            .build()
            .map_err(|e| ComputeError::Unavailable(format!("CPU thread pool: {}", e)))?;
        Ok(Self {
            pool: Some(Arc::new(pool)),
        })
    }

    fn info(pool: Option<&ThreadPool>) -> DeviceInfo {
        let num_threads =
            pool.map_or_else(rayon::current_num_threads, ThreadPool::current_num_threads);
        DeviceInfo {
            name: format!("CPU ({} threads)", num_threads),
            backend_type: BackendType::Cpu,
            memory_bytes: None,
            compute_units: Some(num_threads),
        }
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeBackend for CpuBackend {
    fn device_info(&self) -> DeviceInfo {
        Self::info(self.pool.as_deref())
    }

    fn build(&self, system: &ModalSystem) -> Result<Box<dyn ModalStepper>, ComputeError> {
        let mut stepper = CpuStateSpace::new(system)?;
        stepper.pool = self.pool.clone();
        Ok(Box::new(stepper))
    }
}

/// Host memory rendition of a modal state-space model.
#[derive(Debug, Clone)]
pub struct CpuStateSpace {
    n_mode: usize,
    n_input: usize,
    n_output: usize,
    modes: Vec<ModeStateSpace>,
    i2m_rows: Vec<f64>,
    m2o_cols: Vec<f64>,
    dc_gain_compensator: Option<Vec<f64>>,
    /// Modal forces `B u` of the current step.
    forces: Vec<f64>,
    state: Vec<[f64; 2]>,
    /// `None` runs on the global pool.
    pool: Option<Arc<ThreadPool>>,
}

impl CpuStateSpace {
    /// Copy `system` into host buffers owned by the stepper.
    pub fn new(system: &ModalSystem) -> Result<Self, ComputeError> {
        log::debug!(
            "allocating CPU state space: {} modes, {} inputs, {} outputs",
            system.n_mode(),
            system.n_input(),
            system.n_output()
        );
        Ok(Self {
            n_mode: system.n_mode(),
            n_input: system.n_input(),
            n_output: system.n_output(),
            modes: system.modes().to_vec(),
            i2m_rows: system.i2m_rows().to_vec(),
            m2o_cols: system.m2o_cols().to_vec(),
            dc_gain_compensator: system.dc_gain_compensator().map(<[f64]>::to_vec),
            forces: vec![0.0; system.n_mode()],
            state: system.initial_state(),
            pool: None,
        })
    }

    /// Current `(x0, x1)` state of every mode.
    pub fn state(&self) -> &[[f64; 2]] {
        &self.state
    }

    fn advance(&mut self, u: &[f64], y: &mut [f64]) {
        let n_input = self.n_input;
        let n_output = self.n_output;

        self.forces
            .par_iter_mut()
            .zip(self.i2m_rows.par_chunks(n_input))
            .for_each(|(f, b)| {
                *f = b.iter().zip(u).map(|(b, u)| b * u).sum();
            });

        let state = &self.state;
        let m2o_cols = &self.m2o_cols;
        let dcg = self.dc_gain_compensator.as_deref();
        y.par_iter_mut().enumerate().for_each(|(i, yi)| {
            let modal: f64 = state
                .iter()
                .zip(m2o_cols.chunks(n_output))
                .map(|(x, c)| c[i] * x[0])
                .sum();
            let static_part: f64 = dcg.map_or(0.0, |d| {
                d[i * n_input..(i + 1) * n_input]
                    .iter()
                    .zip(u)
                    .map(|(d, u)| d * u)
                    .sum()
            });
            *yi = modal + static_part;
        });

        self.state
            .par_iter_mut()
            .zip(self.modes.par_iter())
            .zip(self.forces.par_iter())
            .for_each(|((x, m), &f)| *x = m.advance(*x, f));
    }
}

impl ModalStepper for CpuStateSpace {
    fn n_mode(&self) -> usize {
        self.n_mode
    }
    fn n_input(&self) -> usize {
        self.n_input
    }
    fn n_output(&self) -> usize {
        self.n_output
    }

    fn step(&mut self, u: &[f64], y: &mut [f64]) -> Result<(), ComputeError> {
        check_len("input vector", self.n_input, u.len())?;
        check_len("output vector", self.n_output, y.len())?;
        match self.pool.clone() {
            Some(pool) => pool.install(|| self.advance(u, y)),
            None => self.advance(u, y),
        }
        Ok(())
    }

    fn set_dc_gain_compensator(&mut self, dcg: &[f64]) -> Result<(), ComputeError> {
        check_len("DC gain compensator", self.n_output * self.n_input, dcg.len())?;
        self.dc_gain_compensator = Some(dcg.to_vec());
        Ok(())
    }

    fn reset(&mut self) -> Result<(), ComputeError> {
        self.state
            .iter_mut()
            .zip(&self.modes)
            .for_each(|(x, m)| *x = [m.x0, m.x1]);
        self.forces.iter_mut().for_each(|f| *f = 0.0);
        Ok(())
    }

    fn device_info(&self) -> DeviceInfo {
        CpuBackend::info(self.pool.as_deref())
    }
}
