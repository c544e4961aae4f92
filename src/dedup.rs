//! Windowed deduplication of read-end positions.
//!
//! Positions within `wobble` nucleotides of each other are treated as one
//! feature. A position is a local maximum ("greatest") when no position in
//! its window has a higher count, and representatives are then picked in
//! scan order so that no two lie within `wobble` of each other.

use std::collections::VecDeque;

/// Window used for the `average` diagnostic column
pub const AVERAGE_WINDOW: i64 = 50;

/// For every point, whether its count is >= the count of every point within
/// `wobble` of it (itself included). Ties count as greatest.
///
/// `points` may come in any order; results are returned in the same order.
pub fn is_greatest(points: &[(i64, u32)], wobble: i64) -> Vec<bool> {
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by_key(|&i| points[i].0);

    let mut result = vec![false; points.len()];
    // Indices into `order`, counts non-increasing from front to back
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut right = 0;

    for (rank, &idx) in order.iter().enumerate() {
        let (pos, count) = points[idx];

        while right < order.len() && points[order[right]].0 <= pos + wobble {
            let incoming = points[order[right]].1;
            while let Some(&back) = window.back() {
                if points[order[back]].1 <= incoming {
                    window.pop_back();
                } else {
                    break;
                }
            }
            window.push_back(right);
            right += 1;
        }
        while let Some(&front) = window.front() {
            if points[order[front]].0 < pos - wobble {
                window.pop_front();
            } else {
                break;
            }
        }

        // `rank` itself is inside the window, so the front is never empty
        let max = window
            .front()
            .map(|&front| points[order[front]].1)
            .unwrap_or(count);
        debug_assert!(rank < right);
        result[idx] = count >= max;
    }

    result
}

/// All-pairs version of [`is_greatest`]
pub fn is_greatest_naive(points: &[(i64, u32)], wobble: i64) -> Vec<bool> {
    points
        .iter()
        .map(|&(pos, count)| {
            points
                .iter()
                .filter(|&&(other, _)| (other - pos).abs() <= wobble)
                .all(|&(_, other_count)| count >= other_count)
        })
        .collect()
}

/// Pick representatives among greatest positions, walking `positions` in
/// the given order.
///
/// A greatest position is picked unless it lies within `wobble` of the
/// previous greatest position. The tracker moves to every greatest position,
/// picked or not, so among tied maxima the first one met in scan order wins.
pub fn pick_from_greatest(positions: &[i64], greatest: &[bool], wobble: i64) -> Vec<bool> {
    let mut previous: Option<i64> = None;
    positions
        .iter()
        .zip(greatest)
        .map(|(&pos, &is_greatest)| {
            if !is_greatest {
                return false;
            }
            let picked = match previous {
                Some(prev) => (prev - pos).abs() > wobble,
                None => true,
            };
            previous = Some(pos);
            picked
        })
        .collect()
}

/// Sum of the counts within `window` of each point, divided by the window
/// length (`2 * window + 1`).
pub fn window_average(points: &[(i64, u32)], window: i64) -> Vec<f64> {
    let mut sorted: Vec<(i64, u64)> = points.iter().map(|&(p, c)| (p, c as u64)).collect();
    sorted.sort_by_key(|&(p, _)| p);

    let mut prefix = Vec::with_capacity(sorted.len() + 1);
    prefix.push(0u64);
    for &(_, count) in &sorted {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + count);
    }

    let width = (2 * window + 1) as f64;
    points
        .iter()
        .map(|&(pos, _)| {
            let lo = sorted.partition_point(|&(p, _)| p < pos - window);
            let hi = sorted.partition_point(|&(p, _)| p <= pos + window);
            (prefix[hi] - prefix[lo]) as f64 / width
        })
        .collect()
}
