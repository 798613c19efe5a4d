//! IRLS fitting of log-link GLMs
//!
//! The iteration is the textbook scheme: at each step compute the linear
//! predictor and mean, form the working weights and working response for
//! the chosen family, and solve the weighted normal equations for the next
//! coefficient vector. Convergence is declared on a small relative change
//! in deviance.

use nalgebra::{Cholesky, DMatrix, DVector};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::diagnostics::{aic, bic, holdout_metrics, wald_p_value};
use super::Family;
use crate::dataset::{Dataset, Value};
use crate::error::AnalyticsError;

/// Minimum usable rows a fit will accept
pub const MIN_USABLE_ROWS: usize = 100;

/// Linear predictor clamp; exp(30) ~ 1e13 keeps means finite
const MAX_LINEAR_PREDICTOR: f64 = 30.0;

/// Diagonal ridge added when the weighted normal equations are not SPD
const RIDGE: f64 = 1e-8;

/// One fitting request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSpec {
    /// Predictor columns; categorical ones must be label-encoded first
    pub predictors: Vec<String>,

    /// Target column; rows with non-positive target are excluded
    pub target: String,

    pub family: Family,

    /// Fraction of usable rows held out for evaluation
    pub test_fraction: f64,

    /// Seed for the train/test shuffle; the whole fit is reproducible from it
    pub seed: u64,

    pub max_iterations: usize,

    /// Relative deviance-change threshold declaring convergence
    pub tolerance: f64,
}

impl FitSpec {
    pub fn new(predictors: Vec<String>, target: impl Into<String>, family: Family) -> Self {
        Self {
            predictors,
            target: target.into(),
            family,
            test_fraction: 0.2,
            seed: 0,
            max_iterations: 25,
            tolerance: 1e-8,
        }
    }
}

/// One fitted term: the intercept or a predictor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoefficientEstimate {
    pub term: String,
    pub estimate: f64,
    /// From the inverse weighted information matrix, dispersion-scaled
    pub std_error: f64,
    pub z_value: f64,
    /// Two-sided Wald test against zero
    pub p_value: f64,
}

/// Immutable result of one fitting request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFit {
    pub family: Family,

    /// Intercept first, then predictors in request order
    pub coefficients: Vec<CoefficientEstimate>,

    /// Residual deviance on the training split
    pub deviance: f64,

    /// Family log-likelihood at the converged fit
    /// (deviance-based quasi-likelihood for Tweedie)
    pub log_likelihood: f64,

    pub aic: f64,
    pub bic: f64,

    /// Pearson dispersion estimate (fixed at 1 for Poisson)
    pub dispersion: f64,

    /// IRLS iterations until convergence
    pub iterations: usize,

    pub train_rows: usize,
    pub test_rows: usize,

    /// Held-out prediction error
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: f64,
}

impl ModelFit {
    /// Predicted mean for one row of predictor values (request order)
    pub fn predict(&self, predictors: &[f64]) -> f64 {
        let mut eta = self.coefficients[0].estimate;
        for (coefficient, x) in self.coefficients[1..].iter().zip(predictors) {
            eta += coefficient.estimate * x;
        }
        eta.clamp(-MAX_LINEAR_PREDICTOR, MAX_LINEAR_PREDICTOR).exp()
    }
}

/// Usable rows after exclusions, with the reason tally needed for errors
struct UsableRows {
    indices: Vec<usize>,
    excluded_by_target: usize,
}

fn usable_rows(
    target: &[Value],
    predictors: &[&[Value]],
    n_rows: usize,
) -> UsableRows {
    let mut indices = Vec::with_capacity(n_rows);
    let mut excluded_by_target = 0;

    'rows: for row in 0..n_rows {
        for column in predictors {
            if column[row].as_number().is_none() {
                continue 'rows;
            }
        }
        match target[row].as_number() {
            Some(y) if y > 0.0 => indices.push(row),
            _ => excluded_by_target += 1,
        }
    }

    UsableRows {
        indices,
        excluded_by_target,
    }
}

/// Deterministic shuffle-split of usable row indices
///
/// The held-out count is `floor(test_fraction * usable)`. Both halves are
/// re-sorted so downstream summation order is independent of the shuffle.
fn split_rows(mut indices: Vec<usize>, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = SmallRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let test_count = (indices.len() as f64 * test_fraction) as usize;
    let mut test: Vec<usize> = indices[..test_count].to_vec();
    let mut train: Vec<usize> = indices[test_count..].to_vec();
    test.sort_unstable();
    train.sort_unstable();
    (train, test)
}

/// Design matrix with a leading intercept column
fn design_matrix(rows: &[usize], predictors: &[&[Value]]) -> DMatrix<f64> {
    let k = predictors.len() + 1;
    DMatrix::from_fn(rows.len(), k, |i, j| {
        if j == 0 {
            1.0
        } else {
            // Usable-row filtering guarantees the cell is numeric
            predictors[j - 1][rows[i]].as_number().unwrap_or(0.0)
        }
    })
}

fn response(rows: &[usize], target: &[Value]) -> Vec<f64> {
    rows.iter()
        .map(|&row| target[row].as_number().unwrap_or(0.0))
        .collect()
}

/// Solve `(X'WX) beta = X'Wz`, retrying once with a small ridge
fn solve_weighted(
    x: &DMatrix<f64>,
    weights: &[f64],
    z: &DVector<f64>,
) -> Option<(DVector<f64>, DMatrix<f64>)> {
    let k = x.ncols();
    let mut xtwx = DMatrix::zeros(k, k);
    let mut xtwz = DVector::zeros(k);

    for i in 0..x.nrows() {
        let w = weights[i];
        for a in 0..k {
            let xa = x[(i, a)] * w;
            xtwz[a] += xa * z[i];
            for b in a..k {
                xtwx[(a, b)] += xa * x[(i, b)];
            }
        }
    }
    // Mirror the upper triangle
    for a in 0..k {
        for b in 0..a {
            xtwx[(a, b)] = xtwx[(b, a)];
        }
    }

    if let Some(cholesky) = Cholesky::new(xtwx.clone()) {
        return Some((cholesky.solve(&xtwz), xtwx));
    }

    let scale = 1.0 + xtwx.trace() / k as f64;
    for a in 0..k {
        xtwx[(a, a)] += RIDGE * scale;
    }
    Cholesky::new(xtwx.clone()).map(|cholesky| (cholesky.solve(&xtwz), xtwx))
}

/// Fit a log-link GLM described by a `FitSpec`
///
/// Pure function of the dataset, the request, and its seed; repeated calls
/// with the same inputs produce identical results.
pub fn fit(dataset: &Dataset, spec: &FitSpec) -> Result<ModelFit, AnalyticsError> {
    let target_cells = dataset.dimension(&spec.target)?;
    let predictor_cells: Vec<&[Value]> = spec
        .predictors
        .iter()
        .map(|name| dataset.dimension(name))
        .collect::<Result<_, _>>()?;

    let usable = usable_rows(target_cells, &predictor_cells, dataset.n_rows());
    if usable.indices.is_empty() && usable.excluded_by_target > 0 {
        return Err(AnalyticsError::InvalidTarget {
            column: spec.target.clone(),
        });
    }
    if usable.indices.len() < MIN_USABLE_ROWS {
        return Err(AnalyticsError::InsufficientData {
            usable: usable.indices.len(),
            required: MIN_USABLE_ROWS,
        });
    }

    let (train, test) = split_rows(usable.indices, spec.test_fraction, spec.seed);

    let x = design_matrix(&train, &predictor_cells);
    let y = response(&train, target_cells);
    let n = train.len();
    let k = x.ncols();

    // Mean initialization: shrink each observation halfway to the sample
    // mean so the first working response is finite for all rows.
    let y_mean = y.iter().sum::<f64>() / n as f64;
    let mut mu: Vec<f64> = y.iter().map(|&yi| (yi + y_mean) / 2.0).collect();
    let mut eta: Vec<f64> = mu.iter().map(|&m| m.ln()).collect();

    let mut deviance: f64 = y
        .iter()
        .zip(&mu)
        .map(|(&yi, &mui)| spec.family.unit_deviance(yi, mui))
        .sum();

    let mut beta = DVector::zeros(k);
    let mut information = DMatrix::zeros(k, k);
    let mut weights = vec![0.0; n];
    let mut converged_at = None;

    for iteration in 1..=spec.max_iterations {
        // Log link: dmu/deta = mu, so w = mu^2 / V(mu)
        for i in 0..n {
            weights[i] = mu[i] * mu[i] / spec.family.variance(mu[i]);
        }
        let z = DVector::from_fn(n, |i, _| eta[i] + (y[i] - mu[i]) / mu[i]);

        let (next_beta, xtwx) = solve_weighted(&x, &weights, &z).ok_or(
            AnalyticsError::NonConvergence {
                iterations: iteration,
            },
        )?;
        beta = next_beta;
        information = xtwx;

        let eta_vec = &x * &beta;
        for i in 0..n {
            eta[i] = eta_vec[i].clamp(-MAX_LINEAR_PREDICTOR, MAX_LINEAR_PREDICTOR);
            mu[i] = eta[i].exp();
        }

        let next_deviance: f64 = y
            .iter()
            .zip(&mu)
            .map(|(&yi, &mui)| spec.family.unit_deviance(yi, mui))
            .sum();

        let relative_change = (deviance - next_deviance).abs() / (deviance.abs() + 0.1);
        deviance = next_deviance;

        if relative_change < spec.tolerance {
            converged_at = Some(iteration);
            break;
        }
    }

    let iterations = converged_at.ok_or(AnalyticsError::NonConvergence {
        iterations: spec.max_iterations,
    })?;

    // ---- Dispersion and coefficient significance ----

    let pearson_chi2: f64 = y
        .iter()
        .zip(&mu)
        .map(|(&yi, &mui)| {
            let r = yi - mui;
            r * r / spec.family.variance(mui)
        })
        .sum();
    let dispersion = if spec.family.estimates_dispersion() && n > k {
        pearson_chi2 / (n - k) as f64
    } else {
        1.0
    };

    let covariance = Cholesky::new(information)
        .map(|cholesky| cholesky.inverse())
        .ok_or(AnalyticsError::NonConvergence { iterations })?;

    let coefficients = (0..k)
        .map(|j| {
            let term = if j == 0 {
                "intercept".to_string()
            } else {
                spec.predictors[j - 1].clone()
            };
            let estimate = beta[j];
            let std_error = (dispersion * covariance[(j, j)]).max(0.0).sqrt();
            let z_value = if std_error > 0.0 { estimate / std_error } else { 0.0 };
            CoefficientEstimate {
                term,
                estimate,
                std_error,
                z_value,
                p_value: wald_p_value(z_value),
            }
        })
        .collect();

    // ---- Likelihood diagnostics on the training split ----

    let log_likelihood = spec.family.log_likelihood(&y, &mu, dispersion, deviance);

    // ---- Held-out evaluation ----

    let x_test = design_matrix(&test, &predictor_cells);
    let y_test = response(&test, target_cells);
    let eta_test = &x_test * &beta;
    let predicted: Vec<f64> = (0..test.len())
        .map(|i| eta_test[i].clamp(-MAX_LINEAR_PREDICTOR, MAX_LINEAR_PREDICTOR).exp())
        .collect();
    let (rmse, mae, r_squared) = holdout_metrics(&y_test, &predicted);

    Ok(ModelFit {
        family: spec.family,
        coefficients,
        deviance,
        log_likelihood,
        aic: aic(log_likelihood, k),
        bic: bic(log_likelihood, k, n),
        dispersion,
        iterations,
        train_rows: n,
        test_rows: test.len(),
        rmse,
        mae,
        r_squared,
    })
}
