//! Model summary with Hankel singular value model reduction statistics.

use std::path::Path;

use anyhow::Result;

use modus_core::discretise::Exponential;
use modus_core::{DiscreteStateSpace, ModalModel};

/// Options of the `inspect` subcommand.
#[derive(Debug, Default)]
pub struct InspectOptions {
    /// Extra Hankel singular value threshold, relative to the largest one.
    pub hsv: Option<f64>,
    /// log10 of the first relative threshold of the reduction sweep.
    pub hsv_log_threshold: i32,
    pub damping: Option<f64>,
    /// Frequency (Hz) below which the modes are never truncated.
    pub frequency_lower_bound: Option<f64>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

/// Number of modes per frequency bin, the bins being `[0, 2)`, `[2, 4)`,
/// `[4, 8)`, ... up to the bin that contains `max_nu`.
pub fn frequency_base2_histogram(nu: &[f64], max_nu: f64) -> Vec<usize> {
    (0..)
        .map_while(|i| {
            let upper = 2u64 << i;
            let lower = if i == 0 { 0 } else { upper >> 1 };
            if lower as f64 > max_nu {
                None
            } else {
                Some(
                    nu.iter()
                        .filter(|&&nu| nu >= lower as f64 && nu < upper as f64)
                        .count(),
                )
            }
        })
        .collect()
}

/// A model reduced by a Hankel singular value threshold.
#[derive(Debug)]
pub struct ReducedModel {
    /// Absolute threshold.
    pub threshold: f64,
    /// Threshold relative to the largest Hankel singular value.
    pub relative_threshold: f64,
    /// Eigen frequencies (Hz) of the retained modes.
    pub eigen_frequencies: Vec<f64>,
}

impl ReducedModel {
    /// Keep the modes below the lower bound, and above it those whose
    /// Hankel singular value exceeds `relative_threshold × max_hsv`.
    pub fn new(
        nu_hsv: &[(f64, f64)],
        relative_threshold: f64,
        max_hsv: f64,
        nu_lower_bound: Option<f64>,
    ) -> Self {
        let lower_bound = nu_lower_bound.unwrap_or_default();
        let threshold = max_hsv * relative_threshold;
        let eigen_frequencies = nu_hsv
            .iter()
            .filter(|(nu, hsv)| *nu <= lower_bound || *hsv > threshold)
            .map(|(nu, _)| *nu)
            .collect();
        Self {
            threshold,
            relative_threshold,
            eigen_frequencies,
        }
    }

    pub fn n_modes(&self) -> usize {
        self.eigen_frequencies.len()
    }

    pub fn frequency_range(&self) -> (f64, f64) {
        self.eigen_frequencies
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &nu| {
                (lo.min(nu), hi.max(nu))
            })
    }
}

/// Print the model summary, the reduction statistics and the frequency histograms.
pub fn inspect(path: &Path, options: &InspectOptions) -> Result<()> {
    let model = ModalModel::from_path(path)?;
    println!("{}", model);

    let nu = model.eigen_frequencies.clone();
    let max_nu = nu.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let mut nu_hist = vec![frequency_base2_histogram(&nu, max_nu)];

    let mut state_space = DiscreteStateSpace::<Exponential>::new(model);
    if let Some(zeta) = options.damping {
        state_space = state_space.proportional_damping(zeta);
    }
    let hsv = if options.inputs.is_empty() && options.outputs.is_empty() {
        state_space.hankel_singular_values()?
    } else {
        let model = state_space.model();
        let inputs = if options.inputs.is_empty() {
            model.inputs.iter().map(|g| g.name.clone()).collect()
        } else {
            options.inputs.clone()
        };
        let outputs = if options.outputs.is_empty() {
            model.outputs.iter().map(|g| g.name.clone()).collect()
        } else {
            options.outputs.clone()
        };
        state_space = state_space.ins_by_name(inputs)?.outs_by_name(outputs)?;
        state_space.reduced_hankel_singular_values()?
    };
    let max_hsv = hsv
        .iter()
        .cloned()
        .filter(|x| x.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let nu_hsv: Vec<(f64, f64)> = nu.iter().cloned().zip(hsv).collect();
    let n_mode = nu_hsv.len();

    print!(
        r#"
HANKEL SINGULAR VALUES MODEL REDUCTION
^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^
"#
    );

    let thresholds = (0..4)
        .map(|i| 10f64.powi(options.hsv_log_threshold + i))
        .chain(options.hsv);
    for (k, relative_threshold) in thresholds.enumerate() {
        let reduced = ReducedModel::new(
            &nu_hsv,
            relative_threshold,
            max_hsv,
            options.frequency_lower_bound,
        );
        println!(
            r#"
{}. reduced model:
 . hankel singular value threshold: {:.3e} ({:e})
 . # of modes: {} ({:.1})%
 . eigen frequencies range: {:.3?}Hz"#,
            k + 1,
            reduced.threshold,
            reduced.relative_threshold,
            reduced.n_modes(),
            100. * reduced.n_modes() as f64 / n_mode as f64,
            reduced.frequency_range()
        );
        nu_hist.push(frequency_base2_histogram(&reduced.eigen_frequencies, max_nu));
    }
    println!();

    let width = 7 * (1 + nu_hist.len()) - 1;
    println!(" {}", "-".repeat(width));
    println!(" |{:^w$}|", "Models Frequency Histograms", w = width - 2);
    println!(" |{}|", "-".repeat(width - 2));
    print!(" |{:^6}", "Hz");
    for i in 0..nu_hist.len() {
        print!("|{:^6}", i);
    }
    println!("|");
    println!(" {}|", "|------".repeat(1 + nu_hist.len()));
    for i in 0..nu_hist[0].len() {
        print!(" |{:>5} ", 2u64 << i);
        for hist in &nu_hist {
            print!("|{:>5} ", hist[i]);
        }
        println!("|");
    }
    println!(" {}", "-".repeat(width));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_bins() {
        let nu = [0.0, 1.5, 2.0, 3.9, 4.0, 9.0, 17.0];
        assert_eq!(frequency_base2_histogram(&nu, 17.0), vec![2, 2, 1, 1, 1]);
        assert!(frequency_base2_histogram(&[], 1.0).iter().all(|n| *n == 0));
    }

    #[test]
    fn test_reduction_keeps_low_frequencies() {
        let nu_hsv = [(0.0, f64::INFINITY), (1.0, 1e-9), (10.0, 0.5), (20.0, 1e-3)];
        let reduced = ReducedModel::new(&nu_hsv, 1e-2, 1.0, Some(1.0));
        assert_eq!(reduced.eigen_frequencies, vec![0.0, 1.0, 10.0]);
        assert_eq!(reduced.frequency_range(), (0.0, 10.0));
        let reduced = ReducedModel::new(&nu_hsv, 1e-4, 1.0, None);
        assert_eq!(reduced.n_modes(), 3);
    }
}
