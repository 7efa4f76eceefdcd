//! Bubblefill baseline (Sheehy et al., 2023).
//!
//! The detrended spectrum is scaled so one bin and one intensity unit have the
//! same length. Circular bubbles are grown from below under each x-range until
//! they touch the spectrum; the touching point splits the range and both halves
//! are processed again until they are narrower than the local minimum width.

use std::collections::VecDeque;

use crate::error::{invalid, ProcessResult};
use crate::numeric::polyfit::Polynomial;
use crate::pipeline::smoothing::savgol_filter;

const SMOOTHING_ORDER: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Alignment {
    Left,
    Center,
    Right,
}

/// Bubble under `s[..=len]` (index coordinates, local to the range), lifted so
/// it touches the signal. Returns the bubble and the touching point.
fn grow_bubble(s: &[f64], alignment: Alignment) -> (Vec<f64>, usize) {
    let len = (s.len() - 1) as f64;
    let (width, middle) = match alignment {
        Alignment::Left => (2.0 * len, 0.0),
        Alignment::Right => (2.0 * len, len),
        Alignment::Center => (len, len / 2.0),
    };
    let radius = width / 2.0;
    let mut bubble: Vec<f64> = (0..s.len())
        .map(|i| {
            let dx = i as f64 - middle;
            (radius * radius - dx * dx).max(0.0).sqrt() - width
        })
        .collect();
    let (touch, gap) = s
        .iter()
        .zip(&bubble)
        .map(|(a, b)| a - b)
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .unwrap_or((0, 0.0));
    bubble.iter_mut().for_each(|b| *b += gap);
    (bubble, touch)
}

fn bubble_loop(s: &[f64], min_widths: &[usize]) -> Vec<f64> {
    let n = s.len();
    let mut baseline = vec![0.0f64; n];
    let mut queue: VecDeque<(usize, usize)> = VecDeque::from([(0, n - 1)]);
    while let Some((left, right)) = queue.pop_front() {
        if left >= right {
            continue;
        }
        let alignment = if left == 0 && right != n - 1 {
            Alignment::Left
        } else if left != 0 && right == n - 1 {
            Alignment::Right
        } else {
            if right - left < min_widths[(left + right) / 2] {
                continue;
            }
            Alignment::Center
        };

        let (bubble, rel) = grow_bubble(&s[left..=right], alignment);
        for (b, v) in baseline[left..=right].iter_mut().zip(bubble) {
            *b = b.max(v);
        }
        let touch = left + rel;
        if touch == right {
            queue.push_back((left, touch - 1));
        } else if touch == left {
            queue.push_back((touch + 1, right));
        } else {
            queue.push_back((touch, right));
            queue.push_back((left, touch));
        }
    }
    baseline
}

/// Baseline of `y` with a per-bin minimum bubble width (in bins).
pub fn baseline(y: &[f64], min_widths: &[usize], fit_order: usize) -> ProcessResult<Vec<f64>> {
    let n = y.len();
    if min_widths.len() != n {
        return invalid(format!(
            "bubblefill: {} widths for {} bins",
            min_widths.len(),
            n
        ));
    }
    if n < 3 {
        return Ok(y.to_vec());
    }
    let idx: Vec<f64> = (0..n).map(|i| i as f64).collect();
    let trend = Polynomial::fit(&idx, y, fit_order.min(n - 1))?.eval_all(&idx);
    let detrended: Vec<f64> = y.iter().zip(&trend).map(|(a, b)| a - b).collect();
    let smin = detrended.iter().copied().fold(f64::INFINITY, f64::min);
    let shifted: Vec<f64> = detrended.iter().map(|v| v - smin).collect();
    let smax = shifted.iter().copied().fold(0.0, f64::max);
    let scale = smax / n as f64;
    if !(scale > 0.0) {
        return Ok(trend.iter().map(|t| t + smin).collect());
    }
    let scaled: Vec<f64> = shifted.iter().map(|v| v / scale).collect();

    let bubbles = bubble_loop(&scaled, min_widths);
    let mut out: Vec<f64> = bubbles
        .iter()
        .zip(&trend)
        .map(|(b, t)| b * scale + t + smin)
        .collect();

    let min_width = min_widths.iter().copied().min().unwrap_or(1);
    let mut window = 2 * (min_width / 4) + 3;
    if window > n {
        window = if n % 2 == 1 { n } else { n - 1 };
    }
    if window > SMOOTHING_ORDER {
        out = savgol_filter(&out, window, SMOOTHING_ORDER)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spectrum() -> Vec<f64> {
        (0..500)
            .map(|i| {
                let x = i as f64;
                20.0 + 0.03 * x
                    + 15.0 * (-0.5 * ((x - 250.0) / 120.0).powi(2)).exp()
                    + 100.0 * (-0.5 * ((x - 150.0) / 3.0).powi(2)).exp()
                    + 80.0 * (-0.5 * ((x - 380.0) / 4.0).powi(2)).exp()
            })
            .collect()
    }

    #[test]
    fn test_baseline_stays_under_peaks() {
        let y = spectrum();
        let b = baseline(&y, &vec![40; y.len()], 1).unwrap();
        assert_eq!(b.len(), y.len());
        assert!(y[150] - b[150] > 80.0);
        assert!(y[380] - b[380] > 60.0);
        // Broad background is followed
        assert!(b[250] > 35.0);
    }

    #[test]
    fn test_bubble_touches_signal() {
        let s = vec![5.0, 3.0, 1.0, 3.0, 5.0];
        let (bubble, touch) = grow_bubble(&s, Alignment::Center);
        assert_eq!(touch, 2);
        assert!((bubble[2] - 1.0).abs() < 1e-12);
        assert!(bubble.iter().zip(&s).all(|(b, v)| *b <= v + 1e-12));
    }

    #[test]
    fn test_flat_signal() {
        let b = baseline(&[2.0; 30], &[10; 30], 1).unwrap();
        assert!(b.iter().all(|v| (v - 2.0).abs() < 1e-9));
    }

    #[test]
    fn test_width_length_mismatch() {
        assert!(baseline(&[1.0, 2.0, 3.0], &[1, 2], 1).is_err());
    }
}
