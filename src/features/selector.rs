//! Feature selection over a clean dataset

use super::{CategoryEncoding, FeatureSet, ScoreMethod, SelectionConfig};
use crate::data::ColumnKind;
use crate::error::{FraudError, Result};
use crate::preprocessing::CleanDataset;
use ndarray::{Array1, Array2, ArrayView1};
use std::collections::HashSet;
use tracing::{debug, info};

/// One candidate column converted to numbers
struct EncodedColumn {
    name: String,
    values: Array1<f64>,
    encoding: Option<CategoryEncoding>,
}

/// Chooses model inputs and encodes them into a [`FeatureSet`]
#[derive(Debug, Clone)]
pub struct FeatureSelector {
    config: SelectionConfig,
}

impl FeatureSelector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SelectionConfig {
        &self.config
    }

    /// Select feature columns and build the numeric matrix
    pub fn select(&self, data: &CleanDataset) -> Result<FeatureSet> {
        let schema = data.schema();
        let label = schema.label().to_string();
        let y = label_vector(data)?;

        let chosen: Vec<EncodedColumn> = match &self.config {
            SelectionConfig::AllowList { columns } => {
                let mut seen = HashSet::new();
                let mut chosen = Vec::with_capacity(columns.len());
                for name in columns {
                    if !seen.insert(name.as_str()) {
                        return Err(FraudError::Config(format!(
                            "feature column '{}' is listed more than once",
                            name
                        )));
                    }
                    match schema.kind(name) {
                        None => {
                            return Err(FraudError::Config(format!(
                                "feature column '{}' does not exist in the dataset",
                                name
                            )))
                        }
                        Some(ColumnKind::Label) => {
                            return Err(FraudError::Config(format!(
                                "feature column '{}' is the label column",
                                name
                            )))
                        }
                        Some(ColumnKind::Identifier) => {
                            return Err(FraudError::Config(format!(
                                "feature column '{}' is the identifier column",
                                name
                            )))
                        }
                        Some(kind) => chosen.push(encode_column(data, name, kind)?),
                    }
                }
                chosen
            }
            SelectionConfig::Auto {
                method,
                threshold,
                max_features,
            } => {
                if !threshold.is_finite() {
                    return Err(FraudError::Config(format!(
                        "selection threshold must be finite, got {}",
                        threshold
                    )));
                }
                if *max_features == Some(0) {
                    return Err(FraudError::Config("max_features must be at least 1".to_string()));
                }

                let mut scored = Vec::new();
                for column in candidates(data)? {
                    let score = score_column(&column, y.view(), *method);
                    debug!(column = %column.name, ?method, score, "Scored feature candidate");
                    if score >= *threshold {
                        scored.push((column, score));
                    }
                }

                // Stable sort: equal scores keep table order
                scored.sort_by(|a, b| b.1.total_cmp(&a.1));
                if let Some(k) = max_features {
                    scored.truncate(*k);
                }
                scored.into_iter().map(|(column, _)| column).collect()
            }
        };

        if chosen.is_empty() {
            return Err(FraudError::Config(
                "feature selection produced no columns; lower the threshold or use an allow list".to_string(),
            ));
        }

        let n = y.len();
        let x = Array2::from_shape_fn((n, chosen.len()), |(i, j)| chosen[j].values[i]);
        let feature_names: Vec<String> = chosen.iter().map(|c| c.name.clone()).collect();
        let encodings: Vec<CategoryEncoding> = chosen.into_iter().filter_map(|c| c.encoding).collect();

        info!(
            n_features = feature_names.len(),
            n_samples = n,
            features = ?feature_names,
            "Feature selection complete"
        );

        FeatureSet::new(feature_names, label, x, y, encodings)
    }

    /// Score every candidate column with `method`, in table order
    pub fn score_columns(data: &CleanDataset, method: ScoreMethod) -> Result<Vec<(String, f64)>> {
        let y = label_vector(data)?;
        Ok(candidates(data)?
            .into_iter()
            .map(|column| {
                let score = score_column(&column, y.view(), method);
                (column.name, score)
            })
            .collect())
    }
}

fn label_vector(data: &CleanDataset) -> Result<Array1<f64>> {
    let label = data.schema().label();
    let values = data.frame().column(label)?.f64()?;
    if values.null_count() > 0 {
        return Err(FraudError::Schema(format!("label '{}' has missing values", label)));
    }
    Ok(values.into_no_null_iter().collect())
}

fn candidates(data: &CleanDataset) -> Result<Vec<EncodedColumn>> {
    data.schema()
        .columns()
        .filter(|c| c.kind.is_feature_candidate())
        .map(|c| encode_column(data, &c.name, c.kind))
        .collect()
}

fn encode_column(data: &CleanDataset, name: &str, kind: ColumnKind) -> Result<EncodedColumn> {
    let column = data.frame().column(name)?;

    match kind {
        ColumnKind::Categorical => {
            let ca = column.str()?;
            if ca.null_count() > 0 {
                return Err(FraudError::Schema(format!(
                    "categorical column '{}' still has missing values",
                    name
                )));
            }
            let encoding = CategoryEncoding::fit(name, ca.into_no_null_iter());
            let values: Array1<f64> = ca.into_no_null_iter().map(|v| encoding.encode(v)).collect();
            Ok(EncodedColumn {
                name: name.to_string(),
                values,
                encoding: Some(encoding),
            })
        }
        _ => {
            let ca = column.f64()?;
            if ca.null_count() > 0 {
                return Err(FraudError::Schema(format!(
                    "numerical column '{}' still has missing values",
                    name
                )));
            }
            Ok(EncodedColumn {
                name: name.to_string(),
                values: ca.into_no_null_iter().collect(),
                encoding: None,
            })
        }
    }
}

fn score_column(column: &EncodedColumn, y: ArrayView1<f64>, method: ScoreMethod) -> f64 {
    let x = column.values.view();
    match method {
        ScoreMethod::MutualInformation => {
            let x_bins = match &column.encoding {
                Some(_) => x.iter().map(|&v| v.max(0.0) as usize).collect(),
                None => discretize(x, n_bins(x.len())),
            };
            let y_bins: Vec<usize> = y.iter().map(|&v| v as usize).collect();
            mutual_information(&x_bins, &y_bins)
        }
        ScoreMethod::Correlation => correlation(x, y).abs(),
        ScoreMethod::Variance => variance(x),
    }
}

fn n_bins(n: usize) -> usize {
    ((n as f64).sqrt() as usize).clamp(2, 20)
}

/// Equal-width binning between the column's min and max
fn discretize(x: ArrayView1<f64>, n_bins: usize) -> Vec<usize> {
    let min_val = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_val = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let range = max_val - min_val;
    if !(range > 0.0) {
        return vec![0; x.len()];
    }

    let bin_width = range / n_bins as f64;
    x.iter()
        .map(|&v| (((v - min_val) / bin_width) as usize).min(n_bins - 1))
        .collect()
}

/// Mutual information (nats) between two discrete variables.
///
/// Counts live in dense tables so the summation order is fixed.
fn mutual_information(x_bins: &[usize], y_bins: &[usize]) -> f64 {
    let n = x_bins.len();
    if n < 2 {
        return 0.0;
    }

    let nx = x_bins.iter().copied().max().unwrap_or(0) + 1;
    let ny = y_bins.iter().copied().max().unwrap_or(0) + 1;

    let mut joint = vec![0usize; nx * ny];
    let mut x_counts = vec![0usize; nx];
    let mut y_counts = vec![0usize; ny];

    for (&xb, &yb) in x_bins.iter().zip(y_bins) {
        joint[xb * ny + yb] += 1;
        x_counts[xb] += 1;
        y_counts[yb] += 1;
    }

    let total = n as f64;
    let mut mi = 0.0;
    for xb in 0..nx {
        for yb in 0..ny {
            let count = joint[xb * ny + yb];
            if count == 0 {
                continue;
            }
            let p_xy = count as f64 / total;
            let p_x = x_counts[xb] as f64 / total;
            let p_y = y_counts[yb] as f64 / total;
            mi += p_xy * (p_xy / (p_x * p_y)).ln();
        }
    }

    mi.max(0.0)
}

/// Pearson correlation; 0.0 when either side is constant
fn correlation(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let x_mean = x.sum() / n;
    let y_mean = y.sum() / n;
    let x_std = (x.iter().map(|&v| (v - x_mean).powi(2)).sum::<f64>() / n).sqrt();
    let y_std = (y.iter().map(|&v| (v - y_mean).powi(2)).sum::<f64>() / n).sqrt();

    if x_std > 0.0 && y_std > 0.0 {
        let covariance = x
            .iter()
            .zip(y.iter())
            .map(|(&a, &b)| (a - x_mean) * (b - y_mean))
            .sum::<f64>()
            / n;
        covariance / (x_std * y_std)
    } else {
        0.0
    }
}

fn variance(x: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = x.sum() / n;
    x.iter().map(|&v| (v - mean).powi(2)).sum::<f64>() / n
}
