//! Ordinal encoding of categorical columns

use serde::{Deserialize, Serialize};

/// Code assigned to a category never seen when the encoding was built
pub const UNKNOWN_CATEGORY: f64 = -1.0;

/// Lexicographically ordered category vocabulary of one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoding {
    pub column: String,
    categories: Vec<String>,
}

impl CategoryEncoding {
    /// Build from observed values
    pub fn fit<'a, I>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut categories: Vec<String> = values.into_iter().map(str::to_string).collect();
        categories.sort();
        categories.dedup();
        Self {
            column: column.into(),
            categories,
        }
    }

    /// Code of `value`: its position in the sorted vocabulary
    pub fn encode(&self, value: &str) -> f64 {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .map(|idx| idx as f64)
            .unwrap_or(UNKNOWN_CATEGORY)
    }

    /// Sorted vocabulary
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of distinct categories
    pub fn n_categories(&self) -> usize {
        self.categories.len()
    }
}
