//! Grey-scale morphology on 1-D signals.
//!
//! The structuring element is a flat window of `2·half_width + 1` samples,
//! clipped at the signal ends. Sliding extrema use a monotonic deque so every
//! operator is `O(n)` regardless of the width.

use std::collections::VecDeque;

fn sliding_extreme(
    signal: &[f64],
    half_width: usize,
    keep_first: impl Fn(f64, f64) -> bool,
) -> Vec<f64> {
    let n = signal.len();
    let mut out = Vec::with_capacity(n);
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut next = 0;
    for i in 0..n {
        let hi = (i + half_width).min(n - 1);
        while next <= hi {
            while let Some(&back) = window.back() {
                if keep_first(signal[back], signal[next]) {
                    break;
                }
                window.pop_back();
            }
            window.push_back(next);
            next += 1;
        }
        let lo = i.saturating_sub(half_width);
        while let Some(&front) = window.front() {
            if front >= lo {
                break;
            }
            window.pop_front();
        }
        if let Some(&front) = window.front() {
            out.push(signal[front]);
        }
    }
    out
}

/// Sliding minimum.
pub fn erosion(signal: &[f64], half_width: usize) -> Vec<f64> {
    sliding_extreme(signal, half_width, |kept, new| kept < new)
}

/// Sliding maximum.
pub fn dilation(signal: &[f64], half_width: usize) -> Vec<f64> {
    sliding_extreme(signal, half_width, |kept, new| kept > new)
}

/// Erosion followed by dilation: removes peaks narrower than the window.
pub fn opening(signal: &[f64], half_width: usize) -> Vec<f64> {
    dilation(&erosion(signal, half_width), half_width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erosion_dilation() {
        let s = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        assert_eq!(erosion(&s, 1), vec![1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);
        assert_eq!(dilation(&s, 1), vec![3.0, 4.0, 4.0, 5.0, 9.0, 9.0, 9.0, 6.0]);
        assert_eq!(erosion(&s, 0), s.to_vec());
    }

    #[test]
    fn test_matches_naive() {
        let s: Vec<f64> = (0..57).map(|i| ((i * 37) % 23) as f64 - (i % 5) as f64).collect();
        for w in [1usize, 3, 7, 40] {
            let naive: Vec<f64> = (0..s.len())
                .map(|i| {
                    let lo = i.saturating_sub(w);
                    let hi = (i + w).min(s.len() - 1);
                    s[lo..=hi].iter().copied().fold(f64::INFINITY, f64::min)
                })
                .collect();
            assert_eq!(erosion(&s, w), naive);
        }
    }

    #[test]
    fn test_opening_removes_narrow_peak() {
        let mut s = vec![1.0; 20];
        s[10] = 50.0;
        let o = opening(&s, 2);
        assert!(o.iter().all(|&v| v == 1.0));
        // opening never exceeds the signal
        assert!(o.iter().zip(&s).all(|(a, b)| a <= b));
    }

    #[test]
    fn test_empty() {
        assert!(erosion(&[], 3).is_empty());
    }
}
