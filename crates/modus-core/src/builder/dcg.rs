use ndarray::{s, Array1, Array2};

use super::{DiscreteStateSpace, Result, StateSpaceError};
use crate::discretise::{is_rigid_body, ModeSolver};
use crate::types::{find_io, IoRange};

impl<S: ModeSolver> DiscreteStateSpace<S> {
    /// Static gain correction matrix of the retained modes
    ///
    /// `Ψ = G − Σₖ cₖ bₖᵀ / ωₖ²` where `G` is the static gain reduced to the
    /// selected inputs and outputs and the sum runs over the elastic modes.
    /// The columns of the excluded inputs and the rows of the excluded
    /// outputs are zeroed.
    pub(super) fn dc_gain_compensator(
        &self,
        w: &[f64],
        forces_2_modes: &Array2<f64>,
        modes_2_nodes: &Array2<f64>,
        ins: &[IoRange],
        outs: &[IoRange],
    ) -> Result<Array2<f64>> {
        let static_gain = self.static_gain()?;
        let n_rigid = self.rigid_body_modes;
        let inv_w2: Array1<f64> = w
            .iter()
            .enumerate()
            .map(|(k, &w)| {
                let rigid = match n_rigid {
                    Some(n) => k < n,
                    None => is_rigid_body(w),
                };
                if rigid {
                    0.0
                } else {
                    (w * w).recip()
                }
            })
            .collect();
        log::info!(
            "static gain compensation of {} elastic modes",
            inv_w2.iter().filter(|x| **x != 0.0).count()
        );
        let dyn_static_gain = (modes_2_nodes * &inv_w2).dot(forces_2_modes);
        if dyn_static_gain.shape() != static_gain.shape() {
            return Err(StateSpaceError::Matrix(format!(
                "static gain is {:?} but the modal static gain is {:?}",
                static_gain.shape(),
                dyn_static_gain.shape()
            )));
        }
        let mut psi_dcg = static_gain - dyn_static_gain;

        let (excluded_ins, excluded_outs) = &self.static_gain_exclusions;
        for name in excluded_ins {
            let io = find_io(ins, name).ok_or_else(|| StateSpaceError::NotSelected(name.clone()))?;
            log::info!("Removing static gain compensation from input {}", name);
            psi_dcg.slice_mut(s![.., io.range.clone()]).fill(0.0);
        }
        for name in excluded_outs {
            let io = find_io(outs, name).ok_or_else(|| StateSpaceError::NotSelected(name.clone()))?;
            log::info!("Removing static gain compensation from output {}", name);
            psi_dcg.slice_mut(s![io.range.clone(), ..]).fill(0.0);
        }
        Ok(psi_dcg)
    }
}
