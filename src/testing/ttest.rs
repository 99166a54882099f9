//! Two-sample Student's t-test

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::stats::{finite_mean, finite_values, finite_variance};

/// Outcome of a two-sample t-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub pvalue: f64,
    pub df: f64,
}

impl TTest {
    fn undefined() -> Self {
        Self {
            statistic: f64::NAN,
            pvalue: f64::NAN,
            df: f64::NAN,
        }
    }
}

/// Two-sided p-value for a t-statistic with `df` degrees of freedom
pub fn calculate_pvalue_t(stat: f64, df: f64) -> f64 {
    if stat.is_nan() || !(df > 0.0) {
        return f64::NAN;
    }
    if stat.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df) {
        Ok(t_dist) => (2.0 * t_dist.cdf(-stat.abs())).min(1.0),
        Err(_) => f64::NAN,
    }
}

/// Equal-variance (pooled) two-sample t-test of `a` against `b`
///
/// The statistic is positive when `a` has the larger mean. Non-finite
/// entries are ignored. Each group needs at least two finite values;
/// otherwise every field is NaN. Two constant groups with different means
/// give an infinite statistic and a p-value of zero; identical constant
/// groups give NaN.
pub fn student_t_test(a: &[f64], b: &[f64]) -> TTest {
    let a = finite_values(a);
    let b = finite_values(b);
    let (n1, n2) = (a.len(), b.len());
    if n1 < 2 || n2 < 2 {
        return TTest::undefined();
    }

    let df = (n1 + n2 - 2) as f64;
    let pooled = ((n1 - 1) as f64 * finite_variance(&a) + (n2 - 1) as f64 * finite_variance(&b)) / df;
    let se = (pooled * (1.0 / n1 as f64 + 1.0 / n2 as f64)).sqrt();
    let diff = finite_mean(&a) - finite_mean(&b);

    let statistic = if se > 0.0 {
        diff / se
    } else if diff == 0.0 {
        f64::NAN
    } else {
        diff.signum() * f64::INFINITY
    };

    TTest {
        statistic,
        pvalue: calculate_pvalue_t(statistic, df),
        df,
    }
}
