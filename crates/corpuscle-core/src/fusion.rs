//! Reciprocal Rank Fusion.
//!
//! Pure rank-combination logic, decoupled from any index client so it
//! can be unit-tested on plain ranked lists. Each item's fused score is
//! the sum of `1 / (rank + k)` over every list it appears in; items are
//! ordered by descending fused score with ties broken by
//! first-appearance order.

use std::collections::HashMap;
use std::hash::Hash;

/// The standard RRF dampening constant.
pub const DEFAULT_RRF_K: f64 = 60.0;

/// Fuse several ranked lists into one.
///
/// `lists` are ordered best-first; ranks are 0-based. Duplicate entries
/// within a single list are ignored after their first occurrence.
pub fn reciprocal_rank_fusion<T>(lists: &[Vec<T>], k: f64) -> Vec<(T, f64)>
where
    T: Eq + Hash + Clone,
{
    let mut order: Vec<T> = Vec::new();
    let mut scores: HashMap<T, f64> = HashMap::new();
    let mut seen_in_list: HashMap<T, usize> = HashMap::new();

    for (list_no, list) in lists.iter().enumerate() {
        for (rank, item) in list.iter().enumerate() {
            if seen_in_list.get(item) == Some(&list_no) {
                continue;
            }
            seen_in_list.insert(item.clone(), list_no);
            let entry = scores.entry(item.clone()).or_insert_with(|| {
                order.push(item.clone());
                0.0
            });
            *entry += 1.0 / (rank as f64 + k);
        }
    }

    let mut fused: Vec<(T, f64)> = order
        .into_iter()
        .map(|item| {
            let score = scores[&item];
            (item, score)
        })
        .collect();

    // Stable sort keeps first-appearance order on equal scores.
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused
}
