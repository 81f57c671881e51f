//! Missing value imputation

use super::NumericStatistic;
use crate::error::{FraudError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Sentinel written into missing categorical cells
pub const MISSING_VALUE: &str = "MISSING_VALUE";

/// Record of one numerical column's imputation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericImputation {
    pub column: String,
    pub statistic: NumericStatistic,
    pub fill_value: f64,
    pub filled: usize,
}

/// Record of one categorical column's imputation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalImputation {
    pub column: String,
    pub filled: usize,
}

/// Compute `statistic` over the observed (non-null, non-NaN) values of a column
pub fn compute_statistic(name: &str, values: &Float64Chunked, statistic: NumericStatistic) -> Result<f64> {
    let mut observed: Vec<f64> = values.into_iter().flatten().filter(|v| !v.is_nan()).collect();

    if observed.is_empty() {
        return Err(FraudError::Schema(format!(
            "numerical column '{}' has no observed values to impute from",
            name
        )));
    }

    let value = match statistic {
        NumericStatistic::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
        NumericStatistic::Median => {
            observed.sort_by(|a, b| a.total_cmp(b));
            let mid = observed.len() / 2;
            if observed.len() % 2 == 0 {
                (observed[mid - 1] + observed[mid]) / 2.0
            } else {
                observed[mid]
            }
        }
        NumericStatistic::Mode => {
            observed.sort_by(|a, b| a.total_cmp(b));
            // Ascending runs, so the first longest run is the smallest modal value
            let mut best = observed[0];
            let mut best_count = 0usize;
            let mut i = 0;
            while i < observed.len() {
                let mut j = i + 1;
                while j < observed.len() && observed[j] == observed[i] {
                    j += 1;
                }
                if j - i > best_count {
                    best_count = j - i;
                    best = observed[i];
                }
                i = j;
            }
            best
        }
    };

    Ok(value)
}

/// Fill every missing cell of a numerical series with one value
pub fn fill_numeric(series: &Series, fill_value: f64) -> Result<(Series, usize)> {
    let ca = series.f64()?;
    let mut filled = 0usize;

    let out: Float64Chunked = ca
        .into_iter()
        .map(|opt| match opt {
            Some(v) if !v.is_nan() => Some(v),
            _ => {
                filled += 1;
                Some(fill_value)
            }
        })
        .collect();

    Ok((out.with_name(series.name().clone()).into_series(), filled))
}

/// Replace missing cells of a categorical series with [`MISSING_VALUE`]
pub fn fill_categorical(series: &Series) -> Result<(Series, usize)> {
    let ca = series.str()?;
    let filled = ca.null_count();

    let out: StringChunked = ca
        .into_iter()
        .map(|opt| Some(opt.unwrap_or(MISSING_VALUE)))
        .collect();

    Ok((out.with_name(series.name().clone()).into_series(), filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(values: &[Option<f64>]) -> Float64Chunked {
        values.iter().copied().collect()
    }

    #[test]
    fn test_mean() {
        let ca = chunked(&[Some(1.0), None, Some(3.0), Some(4.0)]);
        let mean = compute_statistic("a", &ca, NumericStatistic::Mean).unwrap();
        assert!((mean - 8.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_median_even_and_odd() {
        let even = chunked(&[Some(4.0), Some(1.0), None, Some(3.0), Some(2.0)]);
        assert_eq!(compute_statistic("a", &even, NumericStatistic::Median).unwrap(), 2.5);

        let odd = chunked(&[Some(9.0), Some(1.0), Some(5.0)]);
        assert_eq!(compute_statistic("a", &odd, NumericStatistic::Median).unwrap(), 5.0);
    }

    #[test]
    fn test_mode_tie_takes_smallest() {
        let ca = chunked(&[Some(7.0), Some(3.0), Some(7.0), Some(3.0), Some(5.0)]);
        assert_eq!(compute_statistic("a", &ca, NumericStatistic::Mode).unwrap(), 3.0);
    }

    #[test]
    fn test_nan_counts_as_missing() {
        let ca = chunked(&[Some(f64::NAN), Some(2.0), Some(4.0)]);
        assert_eq!(compute_statistic("a", &ca, NumericStatistic::Mean).unwrap(), 3.0);

        let series = ca.with_name("a".into()).into_series();
        let (out, filled) = fill_numeric(&series, 3.0).unwrap();
        assert_eq!(filled, 1);
        assert_eq!(out.f64().unwrap().get(0), Some(3.0));
    }

    #[test]
    fn test_all_missing_is_schema_error() {
        let ca = chunked(&[None, None]);
        let err = compute_statistic("a", &ca, NumericStatistic::Median).unwrap_err();
        assert!(matches!(err, FraudError::Schema(_)));
    }

    #[test]
    fn test_fill_categorical() {
        let series = Series::new("merchant".into(), &[Some("grocery"), None, Some("travel")]);
        let (out, filled) = fill_categorical(&series).unwrap();

        assert_eq!(filled, 1);
        assert_eq!(out.null_count(), 0);
        assert_eq!(out.str().unwrap().get(1), Some(MISSING_VALUE));
        assert_eq!(out.name().as_str(), "merchant");
    }
}
