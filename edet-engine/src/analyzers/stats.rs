//! Small numeric kernels used by the analyzers.
//!
//! All functions take already-filtered, finite values. Degenerate inputs
//! (too few points, zero variance, singular matrices) return `None` rather
//! than NaN so callers can fall back to their documented neutral values.

/// Pivot magnitude below which a matrix is treated as singular.
pub const SINGULARITY_EPSILON: f64 = 1e-10;

/// Clamps into `[0, 1]`; NaN maps to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Population variance (divides by `n`).
pub fn population_variance(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    Some(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

/// Pearson correlation of two equally long series.
///
/// Requires at least 3 points and non-zero variance in both series.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 3 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= f64::EPSILON || syy <= f64::EPSILON {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    Some(r.clamp(-1.0, 1.0))
}

/// Fisher–Pearson coefficient of skewness `g1 = m3 / m2^1.5`.
///
/// `None` below 3 points; 0 for a constant series.
pub fn skewness(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let m = mean(values)?;
    let n = values.len() as f64;
    let m2 = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
    if m2 <= f64::EPSILON {
        return Some(0.0);
    }
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n;
    Some(m3 / m2.powf(1.5))
}

/// Quantile of sorted values with linear interpolation between ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile_sorted(&sorted_copy(values), 0.5)
}

/// Population standard deviation over mean; `None` when the mean is 0.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if m.abs() <= f64::EPSILON {
        return None;
    }
    Some(population_variance(values)?.sqrt() / m.abs())
}

/// Fraction of values outside `[Q1 − 1.5·IQR, Q3 + 1.5·IQR]`.
///
/// Requires at least 4 values.
pub fn iqr_outlier_fraction(values: &[f64]) -> Option<f64> {
    if values.len() < 4 {
        return None;
    }
    let sorted = sorted_copy(values);
    let q1 = quantile_sorted(&sorted, 0.25)?;
    let q3 = quantile_sorted(&sorted, 0.75)?;
    let iqr = q3 - q1;
    let lower = q1 - 1.5 * iqr;
    let upper = q3 + 1.5 * iqr;
    let outliers = sorted.iter().filter(|&&v| v < lower || v > upper).count();
    Some(outliers as f64 / sorted.len() as f64)
}

/// Correlation matrix of equally long complete columns.
///
/// Pairs without a defined correlation contribute 0 off the diagonal.
pub fn correlation_matrix(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let k = columns.len();
    let mut matrix = vec![vec![0.0; k]; k];
    for i in 0..k {
        matrix[i][i] = 1.0;
        for j in (i + 1)..k {
            let r = pearson(&columns[i], &columns[j]).unwrap_or(0.0);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

/// Inverts a square matrix by Gauss–Jordan elimination with partial pivoting.
///
/// Returns `None` for a singular (or non-square) matrix.
pub fn invert_matrix(matrix: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = matrix.len();
    if matrix.iter().any(|row| row.len() != n) {
        return None;
    }

    let mut a: Vec<Vec<f64>> = matrix.to_vec();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let mut row = vec![0.0; n];
            row[i] = 1.0;
            row
        })
        .collect();

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))?;
        if a[pivot_row][col].abs() < SINGULARITY_EPSILON {
            return None;
        }
        a.swap(col, pivot_row);
        inv.swap(col, pivot_row);

        let pivot = a[col][col];
        for j in 0..n {
            a[col][j] /= pivot;
            inv[col][j] /= pivot;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    if inv.iter().flatten().all(|v| v.is_finite()) {
        Some(inv)
    } else {
        None
    }
}
