//! Descriptive statistics over small samples. Empty input yields `None`.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1). A single value has spread 0.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    if values.len() < 2 {
        return Some(0.0);
    }
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Pearson correlation. Needs two or more pairs; zero variance gives 0.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }

    let n = pairs.len() as f64;
    let (mut sx, mut sy, mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        sx += x;
        sy += y;
        sxx += x * x;
        syy += y * y;
        sxy += x * y;
    }

    let numerator = n * sxy - sx * sy;
    let denominator = ((n * sxx - sx * sx) * (n * syy - sy * sy)).sqrt();
    if denominator == 0.0 || denominator.is_nan() {
        return Some(0.0);
    }
    Some(numerator / denominator)
}

/// Least-squares line through a set of points.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LinearFit {
    pub slope: f64,
    /// Absent when every `y` is equal.
    pub r_squared: Option<f64>,
}

/// Slope and R² of `ys` against `xs`. Needs two or more distinct `xs`.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let nf = n as f64;

    let sx: f64 = xs.iter().sum();
    let sy: f64 = ys.iter().sum();
    let sxx: f64 = xs.iter().map(|x| x * x).sum();
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();

    let denominator = nf * sxx - sx * sx;
    if denominator == 0.0 {
        return None;
    }
    let slope = (nf * sxy - sx * sy) / denominator;

    let (mx, my) = (sx / nf, sy / nf);
    let ss_tot: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| (y - (slope * (x - mx) + my)).powi(2))
        .sum();

    Some(LinearFit {
        slope,
        r_squared: (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot),
    })
}

/// 95th percentile by the exclusive method over twenty cut points. Fewer
/// than twenty samples fall back to the maximum.
pub fn p95(values: &[f64]) -> Option<f64> {
    const CUTS: usize = 20;
    const INDEX: usize = 19;

    if values.len() < CUTS {
        return max(values);
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let len = sorted.len();
    let m = len + 1;
    let j = (INDEX * m / CUTS).clamp(1, len - 1);
    let delta = (INDEX * m - j * CUTS) as f64;
    let cuts = CUTS as f64;

    Some((sorted[j - 1] * (cuts - delta) + sorted[j] * delta) / cuts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sample_std_uses_n_minus_one() {
        let std = sample_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!(approx(std, 2.138089935299395));
        assert_eq!(sample_std(&[3.0]), Some(0.0));
        assert_eq!(sample_std(&[]), None);
    }

    #[test]
    fn median_of_even_and_odd_samples() {
        assert_eq!(median(&[5.0, 1.0, 3.0]), Some(3.0));
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), Some(2.5));
    }

    #[test]
    fn pearson_edge_cases() {
        let perfect = pearson(&[(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]).unwrap();
        assert!(approx(perfect, 1.0));

        let inverse = pearson(&[(1.0, 3.0), (2.0, 2.0), (3.0, 1.0)]).unwrap();
        assert!(approx(inverse, -1.0));

        assert_eq!(pearson(&[(3.0, 1.0), (3.0, 5.0)]), Some(0.0));
        assert_eq!(pearson(&[(1.0, 1.0)]), None);
    }

    #[test]
    fn linear_fit_recovers_slope_and_fit_quality() {
        let exact = linear_fit(&[2.0, 3.0, 4.0, 5.0], &[2.5, 3.0, 3.5, 4.0]).unwrap();
        assert!(approx(exact.slope, 0.5));
        assert!(approx(exact.r_squared.unwrap(), 1.0));

        let noisy = linear_fit(&[1.0, 2.0, 3.0], &[1.0, 3.0, 2.0]).unwrap();
        assert!(approx(noisy.slope, 0.5));
        assert!(approx(noisy.r_squared.unwrap(), 0.25));
    }

    #[test]
    fn linear_fit_degenerate_inputs() {
        assert_eq!(linear_fit(&[1.0], &[1.0]), None);
        assert_eq!(linear_fit(&[3.0, 3.0], &[1.0, 2.0]), None);

        let flat = linear_fit(&[1.0, 2.0], &[4.0, 4.0]).unwrap();
        assert_eq!(flat.slope, 0.0);
        assert_eq!(flat.r_squared, None);
    }

    #[test]
    fn p95_interpolates_with_enough_samples() {
        let values: Vec<f64> = (1..=20).map(f64::from).collect();
        assert!(approx(p95(&values).unwrap(), 19.95));

        assert_eq!(p95(&[5.0, 9.0, 1.0]), Some(9.0));
        assert_eq!(p95(&[]), None);
    }
}
