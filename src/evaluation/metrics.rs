//! Binary classification metrics over predicted probabilities

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Probabilities are clipped to `[EPS, 1 - EPS]` before taking logs
const LOG_LOSS_EPS: f64 = 1e-15;

/// Named evaluation metric, also used as the search objective
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricName {
    RocAuc,
    AveragePrecision,
    Precision,
    Recall,
    F1,
    Accuracy,
    BalancedAccuracy,
    LogLoss,
    BrierScore,
}

impl MetricName {
    /// Every metric, in report order
    pub const ALL: [MetricName; 9] = [
        MetricName::RocAuc,
        MetricName::AveragePrecision,
        MetricName::Precision,
        MetricName::Recall,
        MetricName::F1,
        MetricName::Accuracy,
        MetricName::BalancedAccuracy,
        MetricName::LogLoss,
        MetricName::BrierScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::RocAuc => "roc_auc",
            MetricName::AveragePrecision => "average_precision",
            MetricName::Precision => "precision",
            MetricName::Recall => "recall",
            MetricName::F1 => "f1",
            MetricName::Accuracy => "accuracy",
            MetricName::BalancedAccuracy => "balanced_accuracy",
            MetricName::LogLoss => "log_loss",
            MetricName::BrierScore => "brier_score",
        }
    }

    /// Whether a larger value is better
    pub fn greater_is_better(&self) -> bool {
        !matches!(self, MetricName::LogLoss | MetricName::BrierScore)
    }

    /// Compute this metric. `threshold` only matters for label-based metrics.
    pub fn compute(&self, y_true: ArrayView1<f64>, y_prob: ArrayView1<f64>, threshold: f64) -> f64 {
        match self {
            MetricName::RocAuc => roc_auc(y_true, y_prob),
            MetricName::AveragePrecision => average_precision(y_true, y_prob),
            MetricName::LogLoss => log_loss(y_true, y_prob),
            MetricName::BrierScore => brier_score(y_true, y_prob),
            label_based => {
                let cm = ConfusionMatrix::from_probabilities(y_true, y_prob, threshold);
                match label_based {
                    MetricName::Precision => cm.precision(),
                    MetricName::Recall => cm.recall(),
                    MetricName::F1 => cm.f1(),
                    MetricName::Accuracy => cm.accuracy(),
                    _ => cm.balanced_accuracy(),
                }
            }
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confusion counts at a decision threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
}

impl ConfusionMatrix {
    /// Predict positive when `p >= threshold`
    pub fn from_probabilities(y_true: ArrayView1<f64>, y_prob: ArrayView1<f64>, threshold: f64) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (&t, &p) in y_true.iter().zip(y_prob.iter()) {
            match (t > 0.5, p >= threshold) {
                (true, true) => cm.true_positives += 1,
                (false, true) => cm.false_positives += 1,
                (false, false) => cm.true_negatives += 1,
                (true, false) => cm.false_negatives += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    pub fn specificity(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    pub fn balanced_accuracy(&self) -> f64 {
        (self.recall() + self.specificity()) / 2.0
    }
}

/// `num / den`, or 0.0 when the denominator is zero
fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Indices sorted by descending score
fn descending_order(y_prob: ArrayView1<f64>) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..y_prob.len()).collect();
    indices.sort_by(|&a, &b| y_prob[b].total_cmp(&y_prob[a]));
    indices
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share
/// their average rank. Single-class input yields 0.5.
pub fn roc_auc(y_true: ArrayView1<f64>, y_prob: ArrayView1<f64>) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    let n_neg = n - n_pos;

    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let indices = descending_order(y_prob);
    let mut rank_sum_pos = 0.0f64;
    let mut i = 0;

    while i < n {
        let mut j = i + 1;
        while j < n && y_prob[indices[j]] == y_prob[indices[i]] {
            j += 1;
        }

        let avg_rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &indices[i..j] {
            if y_true[idx] > 0.5 {
                rank_sum_pos += avg_rank;
            }
        }

        i = j;
    }

    let n_pos_f = n_pos as f64;
    let n_neg_f = n_neg as f64;
    let sum_ascending_ranks = n_pos_f * (n as f64 + 1.0) - rank_sum_pos;

    (sum_ascending_ranks - n_pos_f * (n_pos_f + 1.0) / 2.0) / (n_pos_f * n_neg_f)
}

/// Average precision: precision at each distinct threshold weighted by the
/// recall gained there. No positives yields 0.0.
pub fn average_precision(y_true: ArrayView1<f64>, y_prob: ArrayView1<f64>) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t > 0.5).count();
    if n_pos == 0 {
        return 0.0;
    }

    let indices = descending_order(y_prob);
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut prev_recall = 0.0;
    let mut ap = 0.0;
    let mut i = 0;

    while i < n {
        let mut j = i;
        while j < n && y_prob[indices[j]] == y_prob[indices[i]] {
            if y_true[indices[j]] > 0.5 {
                tp += 1;
            } else {
                fp += 1;
            }
            j += 1;
        }

        let precision = tp as f64 / (tp + fp) as f64;
        let recall = tp as f64 / n_pos as f64;
        ap += (recall - prev_recall) * precision;
        prev_recall = recall;

        i = j;
    }

    ap
}

/// Mean binary cross-entropy
pub fn log_loss(y_true: ArrayView1<f64>, y_prob: ArrayView1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .zip(y_prob.iter())
        .map(|(&t, &p)| {
            let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln())
        })
        .sum();
    total / y_true.len() as f64
}

/// Mean squared difference between probability and outcome
pub fn brier_score(y_true: ArrayView1<f64>, y_prob: ArrayView1<f64>) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let total: f64 = y_true
        .iter()
        .zip(y_prob.iter())
        .map(|(&t, &p)| (p - t).powi(2))
        .sum();
    total / y_true.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(y.view(), array![0.1, 0.2, 0.8, 0.9].view()), 1.0);
        assert_eq!(roc_auc(y.view(), array![0.9, 0.8, 0.2, 0.1].view()), 0.0);
    }

    #[test]
    fn test_roc_auc_ties_averaged() {
        let y = array![0.0, 1.0];
        assert_eq!(roc_auc(y.view(), array![0.5, 0.5].view()), 0.5);

        // One positive ranked above both negatives, one tied with a negative
        let y = array![0.0, 0.0, 1.0, 1.0];
        let p = array![0.1, 0.5, 0.5, 0.9];
        assert!((roc_auc(y.view(), p.view()) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_average_precision() {
        let y = array![1.0, 0.0, 1.0, 0.0];
        let p = array![0.9, 0.8, 0.7, 0.1];
        // Recall 0.5 at precision 1, then recall 1.0 at precision 2/3
        let expected = 0.5 * 1.0 + 0.5 * (2.0 / 3.0);
        assert!((average_precision(y.view(), p.view()) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_confusion_and_zero_division() {
        let y = array![1.0, 1.0, 0.0, 0.0];
        let p = array![0.1, 0.2, 0.3, 0.4];
        let cm = ConfusionMatrix::from_probabilities(y.view(), p.view(), 0.5);

        assert_eq!(cm.true_negatives, 2);
        assert_eq!(cm.false_negatives, 2);
        assert_eq!(cm.precision(), 0.0);
        assert_eq!(cm.recall(), 0.0);
        assert_eq!(cm.f1(), 0.0);
        assert_eq!(cm.accuracy(), 0.5);
        assert_eq!(cm.balanced_accuracy(), 0.5);
    }

    #[test]
    fn test_log_loss_and_brier() {
        let y = array![1.0, 0.0];
        let p = array![0.5, 0.5];
        assert!((log_loss(y.view(), p.view()) - 2f64.ln()).abs() < 1e-12);
        assert!((brier_score(y.view(), p.view()) - 0.25).abs() < 1e-12);

        // Clipping keeps certain mistakes finite
        assert!(log_loss(array![1.0].view(), array![0.0].view()).is_finite());
    }

    #[test]
    fn test_metric_direction() {
        assert!(MetricName::RocAuc.greater_is_better());
        assert!(!MetricName::LogLoss.greater_is_better());
        assert_eq!(MetricName::F1.to_string(), "f1");
    }
}
