//! Fitted preprocessing: standardization and categorical code mapping.
//!
//! A [`Preprocessor`] is fitted once on the training slice and stored in the
//! model. Scoring applies exactly the same transform; unseen categories are
//! rejected rather than mapped to a fallback code.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::schema::{
    SafeFeatures, DEPARTMENT_COLUMN, LEVEL_COLUMN, N_CONTINUOUS, N_FEATURES, SAFE_FEATURES,
};
use crate::error::{DataError, InputError};
use crate::utils::mean_std;

// =============================================================================
// StandardScaler
// =============================================================================

/// Per-column mean/std standardization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub means: Vec<f64>,
    /// Standard deviations, with zero replaced by 1.
    pub scales: Vec<f64>,
}

impl StandardScaler {
    /// Fit on column-major values: `columns[c]` holds every row of column `c`.
    pub fn fit(columns: &[Vec<f64>]) -> Self {
        let (means, scales) = columns
            .iter()
            .map(|col| {
                let (m, s) = mean_std(col);
                (m, if s > 1e-12 { s } else { 1.0 })
            })
            .unzip();
        Self { means, scales }
    }

    #[inline]
    pub fn apply(&self, column: usize, value: f64) -> f64 {
        (value - self.means[column]) / self.scales[column]
    }
}

// =============================================================================
// CategoryEncoder
// =============================================================================

/// Sorted category → code mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    categories: Vec<String>,
}

impl CategoryEncoder {
    pub fn fit<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
        let mut categories: Vec<String> = values.into_iter().map(String::from).collect();
        categories.sort_unstable();
        categories.dedup();
        Self { categories }
    }

    /// Rebuild from stored categories. Sorts and deduplicates.
    pub fn from_categories(categories: Vec<String>) -> Self {
        Self::fit(categories.iter().map(String::as_str))
    }

    #[inline]
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

// =============================================================================
// Preprocessor
// =============================================================================

/// Training-time fitted transform from [`SafeFeatures`] to a model row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    pub scaler: StandardScaler,
    pub department: CategoryEncoder,
    pub level: CategoryEncoder,
}

impl Preprocessor {
    /// Fit on the training rows only.
    pub fn fit(rows: &[SafeFeatures]) -> Result<Self, DataError> {
        if rows.is_empty() {
            return Err(DataError::Empty);
        }
        let mut columns = vec![Vec::with_capacity(rows.len()); N_CONTINUOUS];
        for row in rows {
            for (col, value) in columns.iter_mut().zip(row.continuous()) {
                col.push(value);
            }
        }
        Ok(Self {
            scaler: StandardScaler::fit(&columns),
            department: CategoryEncoder::fit(rows.iter().map(|r| r.department.as_str())),
            level: CategoryEncoder::fit(rows.iter().map(|r| r.level.as_str())),
        })
    }

    /// Encoder for a categorical column.
    pub fn encoder(&self, column: usize) -> Option<&CategoryEncoder> {
        match column {
            DEPARTMENT_COLUMN => Some(&self.department),
            LEVEL_COLUMN => Some(&self.level),
            _ => None,
        }
    }

    fn encode_category(&self, column: usize, value: &str) -> Result<f64, InputError> {
        let feature = SAFE_FEATURES[column].name;
        let encoder = self
            .encoder(column)
            .ok_or_else(|| InputError::Malformed(format!("`{feature}` is not categorical")))?;
        encoder
            .encode(value)
            .map(|code| code as f64)
            .ok_or_else(|| InputError::UnseenCategory {
                feature,
                value: value.to_string(),
                known: encoder.categories().to_vec(),
            })
    }

    /// Encode without standardizing: raw continuous values, 0/1, codes.
    pub fn encode_unscaled(
        &self,
        features: &SafeFeatures,
    ) -> Result<[f64; N_FEATURES], InputError> {
        let mut row = [0.0; N_FEATURES];
        row[..N_CONTINUOUS].copy_from_slice(&features.continuous());
        row[N_CONTINUOUS] = if features.is_neurodivergent { 1.0 } else { 0.0 };
        row[DEPARTMENT_COLUMN] = self.encode_category(DEPARTMENT_COLUMN, &features.department)?;
        row[LEVEL_COLUMN] = self.encode_category(LEVEL_COLUMN, &features.level)?;
        Ok(row)
    }

    /// Full model transform of one row.
    pub fn transform_one(&self, features: &SafeFeatures) -> Result<[f64; N_FEATURES], InputError> {
        let mut row = self.encode_unscaled(features)?;
        for (c, value) in row[..N_CONTINUOUS].iter_mut().enumerate() {
            *value = self.scaler.apply(c, *value);
        }
        Ok(row)
    }

    /// Transform many rows into an `(n_rows, N_FEATURES)` matrix.
    pub fn transform(&self, rows: &[SafeFeatures]) -> Result<Array2<f64>, InputError> {
        self.to_matrix(rows, Self::transform_one)
    }

    /// Unscaled encoding of many rows, for leakage diagnostics.
    pub fn encode_unscaled_matrix(&self, rows: &[SafeFeatures]) -> Result<Array2<f64>, InputError> {
        self.to_matrix(rows, Self::encode_unscaled)
    }

    fn to_matrix(
        &self,
        rows: &[SafeFeatures],
        f: impl Fn(&Self, &SafeFeatures) -> Result<[f64; N_FEATURES], InputError>,
    ) -> Result<Array2<f64>, InputError> {
        let mut out = Array2::zeros((rows.len(), N_FEATURES));
        for (mut dst, row) in out.rows_mut().into_iter().zip(rows) {
            let encoded = f(self, row)?;
            for (d, v) in dst.iter_mut().zip(encoded) {
                *d = v;
            }
        }
        Ok(out)
    }
}
