//! Closed-form Ridge Regression
//!
//! Solves `β = (XᵀX + λR)⁻¹ Xᵀy` in one shot, where `X` carries a leading
//! bias column and `R` is the identity with its (0,0) entry zeroed so the
//! intercept is never penalised. The system is solved through a Cholesky
//! factorisation rather than an explicit inverse.

use serde::{Deserialize, Serialize};

use crate::error::{AlgoError, AlgoResult};
use crate::matrix::{cholesky_factor, dot_product, normal_equations, solve_cholesky};
use crate::sanitize::{ensure_all_finite, ensure_finite, has_invalid_values, mean, safe_ratio};

/// Name reported for the intercept in [`FitMetrics::feature_names`]
pub const INTERCEPT_NAME: &str = "intercept";

/// Training summary returned by [`RidgeRegression::fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitMetrics {
    pub mse: f64,
    /// Coefficient of determination, `0.0` when the targets have no variance
    pub r2: f64,
    /// Intercept first, then one weight per feature
    pub coefficients: Vec<f64>,
    /// `intercept` followed by the feature names
    pub feature_names: Vec<String>,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RidgeRegression {
    feature_names: Vec<String>,
    regularization: f64,
    coefficients: Option<Vec<f64>>,
}

impl RidgeRegression {
    pub fn new(feature_names: Vec<String>, regularization: f64) -> AlgoResult<Self> {
        if feature_names.is_empty() {
            return Err(AlgoError::validation("at least one feature is required"));
        }
        for (i, name) in feature_names.iter().enumerate() {
            if feature_names[..i].contains(name) {
                return Err(AlgoError::validation(format!("duplicate feature name '{name}'")));
            }
        }
        let regularization = ensure_finite("regularization", regularization)?;
        if regularization < 0.0 {
            return Err(AlgoError::validation(format!(
                "regularization must be non-negative, got {regularization}"
            )));
        }

        Ok(Self {
            feature_names,
            regularization,
            coefficients: None,
        })
    }

    /// Constructor for compile-time feature sets that are known to be valid.
    pub(crate) fn with_trusted_parts(feature_names: Vec<String>, regularization: f64) -> Self {
        Self {
            feature_names,
            regularization,
            coefficients: None,
        }
    }

    /// Rebuild an already fitted model from stored parts.
    pub fn from_parts(
        feature_names: Vec<String>,
        regularization: f64,
        coefficients: Vec<f64>,
    ) -> AlgoResult<Self> {
        let mut model = Self::new(feature_names, regularization)?;
        if coefficients.len() != model.dimension() {
            return Err(AlgoError::validation(format!(
                "expected {} coefficients (bias + {} features), got {}",
                model.dimension(),
                model.feature_names.len(),
                coefficients.len()
            )));
        }
        ensure_all_finite("coefficients", &coefficients)?;
        model.coefficients = Some(coefficients);
        Ok(model)
    }

    /// Fit on `rows` (one entry per feature, no bias column) against `targets`.
    ///
    /// The stored coefficients are only replaced when the solve succeeds.
    pub fn fit(&mut self, rows: &[Vec<f64>], targets: &[f64]) -> AlgoResult<FitMetrics> {
        let f = self.feature_names.len();
        let d = self.dimension();

        if rows.is_empty() {
            return Err(AlgoError::validation("cannot fit on an empty dataset"));
        }
        if rows.len() != targets.len() {
            return Err(AlgoError::validation(format!(
                "{} rows but {} targets",
                rows.len(),
                targets.len()
            )));
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != f {
                return Err(AlgoError::validation(format!(
                    "row {i} has {} features, expected {f}",
                    row.len()
                )));
            }
            ensure_all_finite("features", row)?;
        }
        ensure_all_finite("targets", targets)?;

        let (mut xtx, xty) = normal_equations(rows, targets, f);

        // Intercept (index 0) stays unpenalised
        for i in 1..d {
            xtx[i * d + i] += self.regularization;
        }

        let l = cholesky_factor(&xtx, d)?;
        let beta = solve_cholesky(&l, &xty, d);
        if has_invalid_values(&beta) {
            return Err(AlgoError::SingularMatrix { dimension: d });
        }

        let predictions: Vec<f64> = rows.iter().map(|row| Self::apply(&beta, row)).collect();
        let residuals: Vec<f64> = targets
            .iter()
            .zip(predictions.iter())
            .map(|(y, p)| (y - p) * (y - p))
            .collect();
        let mse = mean(&residuals);
        let y_mean = mean(targets);
        let ss_tot: f64 = targets.iter().map(|y| (y - y_mean) * (y - y_mean)).sum();
        let ss_res: f64 = residuals.iter().sum();
        let r2 = if ss_tot > 0.0 {
            1.0 - safe_ratio(ss_res, ss_tot)
        } else {
            0.0
        };

        let mut feature_names = Vec::with_capacity(d);
        feature_names.push(INTERCEPT_NAME.to_string());
        feature_names.extend(self.feature_names.iter().cloned());

        self.coefficients = Some(beta.clone());

        Ok(FitMetrics {
            mse,
            r2,
            coefficients: beta,
            feature_names,
            samples: rows.len(),
        })
    }

    /// Raw (unclipped) prediction `β · [1, row]`
    pub fn predict_row(&self, row: &[f64]) -> AlgoResult<f64> {
        let beta = self.coefficients.as_ref().ok_or(AlgoError::UnfittedModel)?;
        if row.len() != self.feature_names.len() {
            return Err(AlgoError::validation(format!(
                "expected {} features, got {}",
                self.feature_names.len(),
                row.len()
            )));
        }
        ensure_all_finite("features", row)?;
        Ok(Self::apply(beta, row))
    }

    fn apply(beta: &[f64], row: &[f64]) -> f64 {
        beta[0] + dot_product(&beta[1..], row)
    }

    /// Number of coefficients including the intercept
    pub fn dimension(&self) -> usize {
        self.feature_names.len() + 1
    }

    pub fn is_fitted(&self) -> bool {
        self.coefficients.is_some()
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn regularization(&self) -> f64 {
        self.regularization
    }
}
