//! Fit diagnostics and the numeric kernels they need
//!
//! Holds the held-out prediction metrics plus local polynomial
//! approximations of the special functions the likelihood work needs
//! (standard normal CDF, log-gamma).

/// Log of the gamma function, Lanczos approximation (g = 7, n = 9)
///
/// Accurate to ~15 significant digits for positive arguments, which covers
/// every use here (factorials in the Poisson likelihood, Gamma shape terms).
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 8] = [
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_13,
        -176.615_029_162_140_59,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_571_6e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        // Reflection formula keeps the argument in the stable region
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut acc = 0.999_999_999_999_809_93;
    for (i, &c) in COEFFICIENTS.iter().enumerate() {
        acc += c / (x + i as f64 + 1.0);
    }
    let t = x + 7.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

/// Error function, Abramowitz–Stegun 7.1.26 (max abs error ~1.5e-7)
fn erf(x: f64) -> f64 {
    const P: f64 = 0.327_591_1;
    const A: [f64; 5] = [
        0.254_829_592,
        -0.284_496_736,
        1.421_413_741,
        -1.453_152_027,
        1.061_405_429,
    ];

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = t * (A[0] + t * (A[1] + t * (A[2] + t * (A[3] + t * A[4]))));
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal CDF
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Two-sided p-value for a Wald z statistic
pub fn wald_p_value(z: f64) -> f64 {
    2.0 * (1.0 - normal_cdf(z.abs()))
}

/// Akaike information criterion
pub fn aic(log_likelihood: f64, n_parameters: usize) -> f64 {
    2.0 * n_parameters as f64 - 2.0 * log_likelihood
}

/// Bayesian information criterion
pub fn bic(log_likelihood: f64, n_parameters: usize, n_observations: usize) -> f64 {
    n_parameters as f64 * (n_observations as f64).ln() - 2.0 * log_likelihood
}

/// Held-out RMSE, MAE, and R-squared
///
/// R-squared guards a zero total sum of squares (constant observed values)
/// by reporting 0.
pub fn holdout_metrics(observed: &[f64], predicted: &[f64]) -> (f64, f64, f64) {
    if observed.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let n = observed.len() as f64;

    let mut squared = 0.0;
    let mut absolute = 0.0;
    for (&y, &p) in observed.iter().zip(predicted) {
        let e = y - p;
        squared += e * e;
        absolute += e.abs();
    }

    let mean = observed.iter().sum::<f64>() / n;
    let total: f64 = observed.iter().map(|&y| (y - mean) * (y - mean)).sum();
    let r_squared = if total > 0.0 { 1.0 - squared / total } else { 0.0 };

    ((squared / n).sqrt(), absolute / n, r_squared)
}
