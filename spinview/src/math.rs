//! Numerical routines for baseline correction and signal quality.

use nalgebra::{DMatrix, DVector};

/// Mask marking the outer margins of the abscissa: true where `x` lies
/// within `fraction` of the total width from either end.
pub fn baseline_region(x: &[f64], fraction: f64) -> Vec<bool> {
    let (min, max) = x.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), xi| {
        (lo.min(*xi), hi.max(*xi))
    });
    let width = max - min;
    let left = min + width * fraction;
    let right = max - width * fraction;
    x.iter().map(|xi| *xi <= left || *xi >= right).collect()
}

/// Fit a polynomial of the given order to the masked points of `y` by
/// least squares and subtract it. The fit runs on a normalized abscissa
/// (-1..1) for numerical stability; the baseline is evaluated over the
/// full axis.
///
/// Returns `(corrected, baseline)`.
pub fn correct_baseline(
    y: &[f64],
    order: usize,
    region: &[bool],
) -> Result<(Vec<f64>, Vec<f64>), String> {
    let n = y.len();
    if region.len() != n {
        return Err(format!(
            "region mask length {} does not match data length {}",
            region.len(),
            n
        ));
    }
    if order + 1 >= n {
        return Err(format!(
            "polynomial order {} must be smaller than the number of points {}",
            order, n
        ));
    }
    let masked_count = region.iter().filter(|m| **m).count();
    if masked_count < order + 1 {
        return Err(format!(
            "baseline region holds {} points, polynomial order {} needs at least {}",
            masked_count,
            order,
            order + 1
        ));
    }

    // Vandermonde matrix over a normalized abscissa.
    let grid: Vec<f64> = (0..n)
        .map(|i| -1.0 + 2.0 * i as f64 / (n - 1) as f64)
        .collect();
    let vandermonde =
        DMatrix::from_fn(n, order + 1, |row, col| grid[row].powi(col as i32));

    let masked_rows: Vec<usize> = (0..n).filter(|i| region[*i]).collect();
    let design = DMatrix::from_fn(masked_count, order + 1, |row, col| {
        vandermonde[(masked_rows[row], col)]
    });
    let observations = DVector::from_fn(masked_count, |row, _| y[masked_rows[row]]);

    let coefficients = design
        .svd(true, true)
        .solve(&observations, f64::EPSILON)
        .map_err(|err| format!("least-squares fit failed: {}", err))?;

    let baseline = &vandermonde * &coefficients;
    let corrected: Vec<f64> = y
        .iter()
        .zip(baseline.iter())
        .map(|(yi, bi)| yi - bi)
        .collect();
    Ok((corrected, baseline.iter().copied().collect()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseMode {
    /// Noise level as standard deviation of the masked region.
    StdDev,
    /// Noise level as peak-to-peak amplitude of the masked region.
    PeakToPeak,
}

#[derive(Debug, Clone, Copy)]
pub struct SignalToNoise {
    pub snr: f64,
    pub signal_level: f64,
    pub noise_level: f64,
}

/// Signal-to-noise ratio of a sweep. The signal level is the peak-to-peak
/// amplitude of the whole sweep, the noise level is taken from the points
/// marked by `noise_region`.
pub fn calculate_snr(
    y: &[f64],
    noise_region: &[bool],
    mode: NoiseMode,
) -> Option<SignalToNoise> {
    if y.is_empty() || noise_region.len() != y.len() {
        return None;
    }
    let noise: Vec<f64> = y
        .iter()
        .zip(noise_region)
        .filter_map(|(yi, m)| m.then_some(*yi))
        .collect();
    if noise.is_empty() {
        return None;
    }
    let (min, max) = min_max(y);
    let signal_level = max - min;
    let noise_level = match mode {
        NoiseMode::StdDev => {
            let mean = noise.iter().sum::<f64>() / noise.len() as f64;
            (noise.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / noise.len() as f64).sqrt()
        }
        NoiseMode::PeakToPeak => {
            let (nmin, nmax) = min_max(&noise);
            nmax - nmin
        }
    };
    Some(SignalToNoise {
        snr: signal_level / noise_level,
        signal_level,
        noise_level,
    })
}

/// Reduce a stack of transient traces to the field sweep at the time
/// position where the response is strongest: the column index that most
/// rows name as their absolute maximum.
pub fn transient_peak_slice(rows: &[Vec<f64>]) -> Option<Vec<f64>> {
    let width = rows.first()?.len();
    if width == 0 {
        return None;
    }
    let mut votes = vec![0_usize; width];
    for row in rows {
        let argmax = row
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))?
            .0;
        votes[argmax] += 1;
    }
    let peak = votes
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)?
        .0;
    Some(rows.iter().map(|row| row[peak]).collect())
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), v| (lo.min(*v), hi.max(*v)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baseline_region_marks_outer_margins() {
        let x: Vec<f64> = (0..=100).map(|i| i as f64).collect();
        let mask = baseline_region(&x, 0.15);
        assert!(mask[0] && mask[15]);
        assert!(!mask[16] && !mask[50] && !mask[84]);
        assert!(mask[85] && mask[100]);
    }

    #[test]
    fn test_linear_baseline_is_removed_exactly() {
        let n = 101;
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        // Linear ramp with a bump in the middle that the margins do not see.
        let y: Vec<f64> = x
            .iter()
            .map(|xi| {
                let bump = (-((xi - 50.0) / 5.0).powi(2)).exp();
                0.5 * xi + 3.0 + bump
            })
            .collect();
        let region = baseline_region(&x, 0.15);
        let (corrected, baseline) = correct_baseline(&y, 1, &region).unwrap();
        for (i, m) in region.iter().enumerate() {
            if *m {
                assert!(
                    corrected[i].abs() < 1e-6,
                    "margin point {} not flattened: {}",
                    i,
                    corrected[i]
                );
            }
        }
        // Baseline stays linear through the bump region.
        let slope = baseline[1] - baseline[0];
        let slope_mid = baseline[51] - baseline[50];
        assert!((slope - slope_mid).abs() < 1e-9);
    }

    #[test]
    fn test_correct_baseline_rejects_bad_input() {
        let y = vec![1.0, 2.0, 3.0];
        assert!(correct_baseline(&y, 5, &[true, true, true]).is_err());
        assert!(correct_baseline(&y, 1, &[true, false]).is_err());
        assert!(correct_baseline(&y, 1, &[false, false, false]).is_err());
    }

    #[test]
    fn test_snr_on_flat_noise() {
        let mut y = vec![0.0; 100];
        for (i, v) in y.iter_mut().enumerate() {
            // Alternating +-1 "noise" on the margins, a peak of 10 inside.
            *v = if i % 2 == 0 { 1.0 } else { -1.0 };
        }
        y[50] = 10.0;
        let region = baseline_region(
            &(0..100).map(|i| i as f64).collect::<Vec<_>>(),
            0.15,
        );
        let res = calculate_snr(&y, &region, NoiseMode::StdDev).unwrap();
        assert!(res.signal_level > 10.0);
        assert!(res.noise_level > 0.9 && res.noise_level < 1.1);
        assert!(res.snr > 10.0);
    }

    #[test]
    fn test_snr_peak_to_peak_mode() {
        let y = vec![-1.0, 1.0, -1.0, 10.0, -1.0, 1.0, -1.0];
        let region = vec![true, true, true, false, true, true, true];
        let res = calculate_snr(&y, &region, NoiseMode::PeakToPeak).unwrap();
        assert_eq!(res.noise_level, 2.0);
        assert_eq!(res.signal_level, 11.0);
        assert!((res.snr - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_transient_peak_slice_votes_for_common_peak() {
        let rows = vec![
            vec![0.0, 5.0, 1.0],
            vec![0.0, -7.0, 1.0],
            vec![2.0, 3.0, 1.0],
        ];
        let slice = transient_peak_slice(&rows).unwrap();
        assert_eq!(slice, vec![5.0, -7.0, 3.0]);
    }
}
