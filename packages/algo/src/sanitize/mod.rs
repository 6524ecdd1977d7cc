//! Data Sanitization
//!
//! Numerical stability utilities.
//!
//! Functions:
//! - Input validation (finite checks)
//! - Neutral-value arithmetic helpers
//! - Value-table health diagnostics

use crate::error::{AlgoError, AlgoResult};
use crate::types::{TableDiagnostics, EPSILON};

/// Check whether a slice contains NaN or Inf
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|&x| x.is_nan() || x.is_infinite())
}

/// Reject a non-finite scalar input
pub fn ensure_finite(name: &str, value: f64) -> AlgoResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(AlgoError::validation(format!("{name} must be finite, got {value}")))
    }
}

/// Reject a slice containing any non-finite value
pub fn ensure_all_finite(name: &str, values: &[f64]) -> AlgoResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(idx) => Err(AlgoError::validation(format!(
            "{name}[{idx}] must be finite, got {}",
            values[idx]
        ))),
        None => Ok(()),
    }
}

/// Division that degrades to `0.0` when the denominator vanishes
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < EPSILON || !denominator.is_finite() {
        0.0
    } else {
        numerator / denominator
    }
}

/// Arithmetic mean, `0.0` for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    safe_ratio(values.iter().sum(), values.len() as f64)
}

/// Diagnose the health of a value table
pub fn diagnose_table(values: &[f64]) -> TableDiagnostics {
    let mut nan_count = 0;
    let mut inf_count = 0;
    let mut visited_entries = 0;
    let mut min_value = f64::MAX;
    let mut max_value = f64::MIN;

    for &v in values {
        if v.is_nan() {
            nan_count += 1;
            continue;
        }
        if v.is_infinite() {
            inf_count += 1;
            continue;
        }
        if v != 0.0 {
            visited_entries += 1;
        }
        min_value = min_value.min(v);
        max_value = max_value.max(v);
    }

    let is_healthy = nan_count == 0 && inf_count == 0;
    let message = if is_healthy {
        "Value table is healthy".to_string()
    } else if nan_count > 0 {
        format!("Value table contains {nan_count} NaN entries")
    } else {
        format!("Value table contains {inf_count} infinite entries")
    };

    TableDiagnostics {
        is_healthy,
        nan_count,
        inf_count,
        min_value: if min_value == f64::MAX { 0.0 } else { min_value },
        max_value: if max_value == f64::MIN { 0.0 } else { max_value },
        visited_entries,
        total_entries: values.len(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_invalid_values() {
        assert!(!has_invalid_values(&[1.0, 2.0, 3.0]));
        assert!(has_invalid_values(&[1.0, f64::NAN, 3.0]));
        assert!(has_invalid_values(&[1.0, f64::INFINITY, 3.0]));
    }

    #[test]
    fn test_ensure_all_finite_reports_position() {
        let err = ensure_all_finite("features", &[1.0, f64::NAN]).unwrap_err();
        assert!(err.to_string().contains("features[1]"));
        assert!(ensure_all_finite("features", &[1.0, 2.0]).is_ok());
    }

    #[test]
    fn test_safe_ratio_neutral_on_zero() {
        assert_eq!(safe_ratio(3.0, 0.0), 0.0);
        assert_eq!(safe_ratio(3.0, 2.0), 1.5);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[1.0, 3.0]), 2.0);
    }

    #[test]
    fn test_diagnose_table() {
        let healthy = diagnose_table(&[0.0, 0.5, -0.25, 0.0]);
        assert!(healthy.is_healthy);
        assert_eq!(healthy.visited_entries, 2);
        assert_eq!(healthy.min_value, -0.25);
        assert_eq!(healthy.max_value, 0.5);

        let broken = diagnose_table(&[0.0, f64::NAN, f64::INFINITY]);
        assert!(!broken.is_healthy);
        assert_eq!(broken.nan_count, 1);
        assert_eq!(broken.inf_count, 1);
    }

    #[test]
    fn test_diagnose_empty_table() {
        let diag = diagnose_table(&[]);
        assert!(diag.is_healthy);
        assert_eq!(diag.min_value, 0.0);
        assert_eq!(diag.max_value, 0.0);
    }
}
