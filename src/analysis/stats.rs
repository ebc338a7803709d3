//! Numeric kernels for descriptive statistics.
//!
//! - **Mean**: Kahan compensated summation.
//! - **Variance/StdDev**: Welford's online algorithm, sample (n − 1) form.
//! - **Median**: midpoint of the two central values for even lengths.
//! - **Correlation**: Pearson over pairwise-complete observations.
//!
//! Every function returns NaN where the statistic is undefined, matching
//! how the values are later written to tables.

/// Kahan compensated sum.
pub fn kahan_sum(data: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for &x in data {
        let y = x - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    sum
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    kahan_sum(data) / data.len() as f64
}

/// Sample standard deviation (ddof = 1). NaN for fewer than two values.
pub fn std_dev(data: &[f64]) -> f64 {
    if data.len() < 2 {
        return f64::NAN;
    }
    let mut count = 0.0;
    let mut running_mean = 0.0;
    let mut m2 = 0.0;
    for &x in data {
        count += 1.0;
        let delta = x - running_mean;
        running_mean += delta / count;
        m2 += delta * (x - running_mean);
    }
    (m2 / (count - 1.0)).sqrt()
}

pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn min(data: &[f64]) -> f64 {
    data.iter().copied().reduce(f64::min).unwrap_or(f64::NAN)
}

pub fn max(data: &[f64]) -> f64 {
    data.iter().copied().reduce(f64::max).unwrap_or(f64::NAN)
}

/// Pearson correlation of paired observations, skipping pairs with a
/// missing side.
///
/// NaN when fewer than two complete pairs remain or either side has zero
/// variance. The result is clamped to `[-1, 1]`.
pub fn pearson(x: &[Option<f64>], y: &[Option<f64>]) -> f64 {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();

    if xs.len() < 2 {
        return f64::NAN;
    }

    let mx = mean(&xs);
    let my = mean(&ys);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in xs.iter().zip(&ys) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}
