//! Dense linear algebra on row-major `f64` slices.

use crate::error::{AlgoError, AlgoResult};

/// Pivot tolerance relative to the pivot's own diagonal entry
pub const SINGULAR_PIVOT_TOLERANCE: f64 = 1e-12;

/// Cholesky factorisation A = L * L^T of a symmetric positive-definite matrix.
///
/// Unlike a regularised factorisation this never patches a bad pivot: a pivot
/// that is non-positive, non-finite, or vanishing relative to its own
/// diagonal entry yields [`AlgoError::SingularMatrix`]. The result does not
/// depend on the sample count behind `a` or on the scale of other rows.
pub fn cholesky_factor(a: &[f64], d: usize) -> AlgoResult<Vec<f64>> {
    if a.len() != d * d {
        return Err(AlgoError::validation(format!(
            "expected {}x{} matrix, got {} values",
            d,
            d,
            a.len()
        )));
    }

    let mut l = vec![0.0; d * d];

    for i in 0..d {
        for j in 0..=i {
            let mut sum = a[i * d + j];
            for k in 0..j {
                sum -= l[i * d + k] * l[j * d + k];
            }

            if i == j {
                if !sum.is_finite() || sum <= SINGULAR_PIVOT_TOLERANCE * a[i * d + i].abs() {
                    return Err(AlgoError::SingularMatrix { dimension: d });
                }
                l[i * d + i] = sum.sqrt();
            } else {
                l[i * d + j] = sum / l[j * d + j];
            }
        }
    }

    Ok(l)
}

/// Solve A * x = b given the Cholesky factor L of A.
pub fn solve_cholesky(l: &[f64], b: &[f64], d: usize) -> Vec<f64> {
    // L * y = b
    let y = solve_triangular_lower(l, b, d);
    // L^T * x = y
    solve_triangular_upper_transpose(l, &y, d)
}

/// Forward substitution for L * x = b
pub fn solve_triangular_lower(l: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut x = vec![0.0; n];

    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i * n + j] * x[j];
        }
        x[i] = sum / l[i * n + i];
    }

    x
}

/// Back substitution for L^T * x = b
fn solve_triangular_upper_transpose(l: &[f64], b: &[f64], n: usize) -> Vec<f64> {
    let mut x = vec![0.0; n];

    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            // L^T[i,j] = L[j,i]
            sum -= l[j * n + i] * x[j];
        }
        x[i] = sum / l[i * n + i];
    }

    x
}

/// Accumulate X^T X and X^T y for a design matrix with a leading bias column.
///
/// Returns `(xtx, xty)` with dimension `features + 1`.
pub fn normal_equations(rows: &[Vec<f64>], targets: &[f64], features: usize) -> (Vec<f64>, Vec<f64>) {
    let d = features + 1;
    let mut xtx = vec![0.0; d * d];
    let mut xty = vec![0.0; d];
    let mut x = vec![0.0; d];

    for (row, &y) in rows.iter().zip(targets.iter()) {
        x[0] = 1.0;
        x[1..].copy_from_slice(row);
        for i in 0..d {
            xty[i] += x[i] * y;
            for j in 0..d {
                xtx[i * d + j] += x[i] * x[j];
            }
        }
    }

    (xtx, xty)
}

#[cfg(test)]
fn mat_vec_mul(a: &[f64], x: &[f64], d: usize) -> Vec<f64> {
    let mut result = vec![0.0; d];
    for i in 0..d {
        for j in 0..d {
            result[i] += a[i * d + j] * x[j];
        }
    }
    result
}

pub fn dot_product(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cholesky_identity() {
        let a = vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let l = cholesky_factor(&a, 3).unwrap();
        for i in 0..3 {
            assert!((l[i * 3 + i] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_solve_cholesky() {
        // A = [[2, 1], [1, 2]]
        let a = vec![2.0, 1.0, 1.0, 2.0];
        let b = vec![1.0, 2.0];

        let l = cholesky_factor(&a, 2).unwrap();
        let x = solve_cholesky(&l, &b, 2);

        let ax = mat_vec_mul(&a, &x, 2);
        for i in 0..2 {
            assert!((ax[i] - b[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_cholesky_rejects_singular() {
        // Rank-one matrix [[1, 1], [1, 1]]
        let a = vec![1.0, 1.0, 1.0, 1.0];
        assert_eq!(
            cholesky_factor(&a, 2),
            Err(AlgoError::SingularMatrix { dimension: 2 })
        );
    }

    #[test]
    fn test_cholesky_pivot_tolerance_is_per_row() {
        // A tiny but well-separated pivot next to a huge one is not singular
        let a = vec![1e12, 0.0, 0.0, 1e-6];
        let l = cholesky_factor(&a, 2).unwrap();
        assert!((l[3] - 1e-3).abs() < 1e-15);

        let b = vec![1e12, 1e-6];
        let x = solve_cholesky(&l, &b, 2);
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_zero_pivot() {
        let a = vec![4.0, 0.0, 0.0, 0.0];
        assert!(cholesky_factor(&a, 2).is_err());
    }

    #[test]
    fn test_cholesky_rejects_nan() {
        let a = vec![f64::NAN, 0.0, 0.0, 1.0];
        assert!(cholesky_factor(&a, 2).is_err());
    }

    #[test]
    fn test_cholesky_rejects_wrong_shape() {
        assert!(matches!(
            cholesky_factor(&[1.0, 2.0, 3.0], 2),
            Err(AlgoError::Validation(_))
        ));
    }

    #[test]
    fn test_normal_equations_bias_column() {
        let rows = vec![vec![1.0], vec![2.0]];
        let targets = vec![3.0, 5.0];
        let (xtx, xty) = normal_equations(&rows, &targets, 1);

        // X = [[1, 1], [1, 2]]
        assert_eq!(xtx, vec![2.0, 3.0, 3.0, 5.0]);
        assert_eq!(xty, vec![8.0, 13.0]);
    }

    #[test]
    fn test_dot_product() {
        let result = dot_product(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]);
        assert!((result - 32.0).abs() < 1e-10);
    }
}
