//! Parametric empirical-Bayes batch correction (ComBat)
//!
//! Johnson, Li & Rabinovic (2007), without biological covariates: each gene
//! is standardized against its pooled within-batch variance, per-batch
//! location (gamma) and scale (delta) shifts are shrunk towards priors
//! estimated across genes, and the shifts are removed before the gene's
//! grand mean and pooled scale are restored.
//!
//! Missing cells (NaN) are ignored in every moment and stay NaN in the
//! output. Genes with zero pooled variance, or with a batch lacking enough
//! observations, are passed through unadjusted.

use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;

use crate::error::{CohortError, Result};
use crate::stats::{finite_mean, finite_variance};

/// ComBat tuning
#[derive(Debug, Clone)]
pub struct CombatParams {
    /// Relative change at which the per-gene EB iteration stops
    pub tolerance: f64,
    /// Iteration cap for the per-gene EB iteration
    pub max_iter: usize,
    /// Adjust location only; scale shifts are left in place
    pub mean_only: bool,
}

impl Default for CombatParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-4,
            max_iter: 1000,
            mean_only: false,
        }
    }
}

/// Per-gene moments of the standardized data
#[derive(Debug, Clone)]
struct GeneMoments {
    grand_mean: f64,
    pooled_sd: f64,
    /// Per-batch mean of standardized values
    gamma_hat: Vec<f64>,
    /// Per-batch variance of standardized values
    delta_hat: Vec<f64>,
    /// Per-batch finite observation counts
    n_obs: Vec<usize>,
    usable: bool,
}

/// Priors for one batch, estimated across genes
#[derive(Debug, Clone, Copy)]
struct BatchPrior {
    gamma_bar: f64,
    tau2: f64,
    a: f64,
    b: f64,
}

fn gene_moments(row: &[f64], members: &[Vec<usize>], mean_only: bool) -> GeneMoments {
    let n_batches = members.len();
    let batch_values: Vec<Vec<f64>> = members
        .iter()
        .map(|idx| idx.iter().map(|&j| row[j]).filter(|v| v.is_finite()).collect())
        .collect();
    let n_obs: Vec<usize> = batch_values.iter().map(|v| v.len()).collect();
    let batch_means: Vec<f64> = batch_values.iter().map(|v| finite_mean(v)).collect();

    let grand_mean = finite_mean(row);
    let n_total: usize = n_obs.iter().sum();
    let ss: f64 = batch_values
        .iter()
        .zip(&batch_means)
        .map(|(vals, &m)| vals.iter().map(|v| (v - m).powi(2)).sum::<f64>())
        .sum();
    let pooled_sd = if n_total > 0 { (ss / n_total as f64).sqrt() } else { f64::NAN };

    let min_obs = if mean_only { 1 } else { 2 };
    let mut usable = pooled_sd.is_finite() && pooled_sd > 0.0 && n_obs.iter().all(|&n| n >= min_obs);

    let mut gamma_hat = vec![f64::NAN; n_batches];
    let mut delta_hat = vec![f64::NAN; n_batches];
    if usable {
        for (b, vals) in batch_values.iter().enumerate() {
            let standardized: Vec<f64> = vals.iter().map(|v| (v - grand_mean) / pooled_sd).collect();
            gamma_hat[b] = finite_mean(&standardized);
            delta_hat[b] = if mean_only { 1.0 } else { finite_variance(&standardized) };
        }
        usable = delta_hat.iter().all(|d| d.is_finite() && *d > 0.0);
    }

    GeneMoments {
        grand_mean,
        pooled_sd,
        gamma_hat,
        delta_hat,
        n_obs,
        usable,
    }
}

fn estimate_priors(moments: &[GeneMoments], n_batches: usize, mean_only: bool) -> Result<Vec<BatchPrior>> {
    let usable: Vec<&GeneMoments> = moments.iter().filter(|m| m.usable).collect();
    if usable.len() < 2 {
        return Err(CohortError::CorrectionFailure {
            reason: format!("only {} genes with estimable batch moments", usable.len()),
        });
    }

    (0..n_batches)
        .map(|b| {
            let gammas: Vec<f64> = usable.iter().map(|m| m.gamma_hat[b]).collect();
            let gamma_bar = finite_mean(&gammas);
            let tau2 = finite_variance(&gammas);

            let (a, bb) = if mean_only {
                (f64::NAN, f64::NAN)
            } else {
                let deltas: Vec<f64> = usable.iter().map(|m| m.delta_hat[b]).collect();
                let m = finite_mean(&deltas);
                let s2 = finite_variance(&deltas);
                if !(s2.is_finite() && s2 > 0.0) {
                    return Err(CohortError::CorrectionFailure {
                        reason: format!("degenerate scale prior for batch {}", b),
                    });
                }
                ((2.0 * s2 + m * m) / s2, (m * s2 + m * m * m) / s2)
            };

            if !tau2.is_finite() {
                return Err(CohortError::CorrectionFailure {
                    reason: format!("degenerate location prior for batch {}", b),
                });
            }

            Ok(BatchPrior {
                gamma_bar,
                tau2,
                a,
                b: bb,
            })
        })
        .collect()
}

fn posterior_mean(gamma_hat: f64, gamma_bar: f64, n: f64, delta: f64, tau2: f64) -> f64 {
    (tau2 * n * gamma_hat + delta * gamma_bar) / (tau2 * n + delta)
}

fn relative_change(new: f64, old: f64) -> f64 {
    if old == 0.0 {
        (new - old).abs()
    } else {
        ((new - old) / old).abs()
    }
}

/// Iterate the joint posterior of (gamma, delta) for one gene in one batch
fn solve_batch(standardized: &[f64], gamma_hat: f64, delta_hat: f64, prior: &BatchPrior, params: &CombatParams) -> (f64, f64) {
    let n = standardized.len() as f64;
    let mut g_old = gamma_hat;
    let mut d_old = delta_hat;

    for _ in 0..params.max_iter {
        let g_new = posterior_mean(gamma_hat, prior.gamma_bar, n, d_old, prior.tau2);
        let sum2: f64 = standardized.iter().map(|s| (s - g_new).powi(2)).sum();
        let d_new = (0.5 * sum2 + prior.b) / (n / 2.0 + prior.a - 1.0);

        let change = relative_change(g_new, g_old).max(relative_change(d_new, d_old));
        g_old = g_new;
        d_old = d_new;
        if change < params.tolerance {
            break;
        }
    }

    (g_old, d_old)
}

/// Remove batch effects from a genes x samples matrix
///
/// `batch` carries one batch id per sample (column); ids need not be
/// contiguous. Fails with `CorrectionFailure` on a length mismatch, fewer
/// than two batches, a batch with a single sample (unless `mean_only`), or
/// priors that cannot be estimated.
pub fn combat(data: ArrayView2<'_, f64>, batch: &[usize], params: &CombatParams) -> Result<Array2<f64>> {
    let (n_genes, n_samples) = data.dim();

    if batch.len() != n_samples {
        return Err(CohortError::CorrectionFailure {
            reason: format!("batch vector has {} entries for {} samples", batch.len(), n_samples),
        });
    }

    let mut levels: Vec<usize> = batch.to_vec();
    levels.sort_unstable();
    levels.dedup();
    if levels.len() < 2 {
        return Err(CohortError::CorrectionFailure {
            reason: "fewer than two batches".to_string(),
        });
    }

    let members: Vec<Vec<usize>> = levels
        .iter()
        .map(|level| (0..n_samples).filter(|&j| batch[j] == *level).collect())
        .collect();
    if !params.mean_only {
        if let Some(pos) = members.iter().position(|m| m.len() < 2) {
            return Err(CohortError::CorrectionFailure {
                reason: format!("batch {} has a single sample", levels[pos]),
            });
        }
    }

    let rows: Vec<Vec<f64>> = data.outer_iter().map(|r| r.to_vec()).collect();

    let moments: Vec<GeneMoments> = rows
        .par_iter()
        .map(|row| gene_moments(row, &members, params.mean_only))
        .collect();

    let priors = estimate_priors(&moments, levels.len(), params.mean_only)?;

    let n_skipped = moments.iter().filter(|m| !m.usable).count();
    if n_skipped > 0 {
        log::warn!("ComBat: {} of {} genes left unadjusted (no estimable batch moments)", n_skipped, n_genes);
    }

    let adjusted: Vec<Vec<f64>> = rows
        .par_iter()
        .zip(moments.par_iter())
        .map(|(row, m)| {
            if !m.usable {
                return row.clone();
            }
            let mut out = row.clone();
            for (b, idx) in members.iter().enumerate() {
                let standardized: Vec<f64> = idx
                    .iter()
                    .map(|&j| (row[j] - m.grand_mean) / m.pooled_sd)
                    .filter(|s| s.is_finite())
                    .collect();

                let (gamma_star, delta_star) = if params.mean_only {
                    let g = posterior_mean(m.gamma_hat[b], priors[b].gamma_bar, 1.0, 1.0, priors[b].tau2);
                    (g, 1.0)
                } else {
                    solve_batch(&standardized, m.gamma_hat[b], m.delta_hat[b], &priors[b], params)
                };
                debug_assert_eq!(standardized.len(), m.n_obs[b]);

                for &j in idx {
                    let v = row[j];
                    if v.is_finite() {
                        let s = (v - m.grand_mean) / m.pooled_sd;
                        out[j] = (s - gamma_star) / delta_star.sqrt() * m.pooled_sd + m.grand_mean;
                    }
                }
            }
            out
        })
        .collect();

    let flat: Vec<f64> = adjusted.into_iter().flatten().collect();
    Array2::from_shape_vec((n_genes, n_samples), flat).map_err(|e| CohortError::CorrectionFailure {
        reason: e.to_string(),
    })
}
