//! Parzen estimators over one search dimension

use rand::Rng;

/// Mean of Gaussian kernels centred on `points`, evaluated at `x`.
///
/// Unnormalized; only ratios between two estimators with the same bandwidth
/// are meaningful. An empty estimator is flat.
pub fn parzen_density(x: f64, points: &[f64], bandwidth: f64) -> f64 {
    if points.is_empty() {
        return 1.0;
    }
    let inv = 1.0 / (2.0 * bandwidth * bandwidth);
    points.iter().map(|&p| (-(x - p).powi(2) * inv).exp()).sum::<f64>() / points.len() as f64
}

/// Kernel width for `n` points spread over `[low, high)`
pub fn bandwidth(low: f64, high: f64, n: usize) -> f64 {
    let span = (high - low).abs().max(f64::EPSILON);
    0.2 * span * (n.max(1) as f64).powf(-0.2)
}

/// Propose a continuous coordinate.
///
/// Candidates are drawn from l(x), the estimator over `good`, and the one
/// with the largest l(x) / g(x) is kept.
pub fn propose_continuous<R: Rng>(
    good: &[f64],
    bad: &[f64],
    (low, high): (f64, f64),
    n_candidates: usize,
    rng: &mut R,
) -> f64 {
    if good.is_empty() || high <= low {
        return low + rng.random::<f64>() * (high - low);
    }
    let width = bandwidth(low, high, good.len());

    let mut best = (f64::NEG_INFINITY, low);
    for _ in 0..n_candidates.max(1) {
        let centre = good[rng.random_range(0..good.len())];
        let candidate = (centre + gaussian(rng) * width).clamp(low, high);
        let ratio = parzen_density(candidate, good, width) / (parzen_density(candidate, bad, width) + 1e-12);
        if ratio > best.0 {
            best = (ratio, candidate);
        }
    }
    best.1
}

/// Propose one of `n_cells` unit cells starting at `offset`.
///
/// Each cell is weighted by its add-one smoothed good/bad count ratio. The
/// returned coordinate is the centre of the drawn cell.
pub fn propose_cell<R: Rng>(good: &[f64], bad: &[f64], offset: f64, n_cells: usize, rng: &mut R) -> f64 {
    let count = |points: &[f64]| {
        let mut counts = vec![1.0; n_cells];
        for &p in points {
            let cell = (p - offset).floor();
            if cell >= 0.0 && (cell as usize) < n_cells {
                counts[cell as usize] += 1.0;
            }
        }
        counts
    };
    let weights: Vec<f64> = count(good).iter().zip(count(bad)).map(|(l, g)| l / g).collect();
    offset + weighted_index(&weights, rng) as f64 + 0.5
}

fn weighted_index<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    let mut target = rng.random::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if target < *w {
            return i;
        }
        target -= w;
    }
    weights.len().saturating_sub(1)
}

/// Standard normal draw (Box-Muller)
fn gaussian<R: Rng>(rng: &mut R) -> f64 {
    let u1 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
