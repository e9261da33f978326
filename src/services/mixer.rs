use std::collections::HashSet;

use crate::{
    error::{AppError, AppResult},
    models::FeedEntry,
};

/// Blends multiple pre-ordered candidate lists into one feed.
///
/// Each source gets a budget proportional to its normalized weight. Sources
/// are drained in input order: first a budgeted pass, then a backfill pass
/// that continues from each source's cursor until `total_items` is reached or
/// every source is exhausted. Items whose id already appears in the result
/// are skipped without consuming budget, so the output never contains
/// duplicates even when sources overlap. Within the slice contributed by a
/// source, that source's input order is preserved.
///
/// This is deliberately not a round-robin interleave: filling source by
/// source keeps the composition deterministic and debuggable. Callers that
/// want visual interleaving should pre-chunk their inputs.
///
/// Contract violations are rejected eagerly:
/// - `sources` and `weights` of different lengths
/// - a weight sum that is not strictly positive (e.g. all zeros)
pub fn mix_sources<T: FeedEntry>(
    sources: Vec<Vec<T>>,
    weights: &[f64],
    total_items: usize,
) -> AppResult<Vec<T>> {
    if sources.len() != weights.len() {
        return Err(AppError::InvalidInput(format!(
            "Mismatched mix inputs: {} sources, {} weights",
            sources.len(),
            weights.len()
        )));
    }

    let total_weight: f64 = weights.iter().sum();
    if total_weight <= 0.0 {
        return Err(AppError::InvalidInput(
            "Mix weights must sum to a positive value".to_string(),
        ));
    }

    // Budgets are rounded per source; the sum may drift from total_items,
    // which the backfill pass corrects.
    let budgets: Vec<usize> = weights
        .iter()
        .map(|w| ((w / total_weight) * total_items as f64).round().max(0.0) as usize)
        .collect();

    let mut cursors: Vec<std::vec::IntoIter<T>> =
        sources.into_iter().map(Vec::into_iter).collect();
    let mut result: Vec<T> = Vec::with_capacity(total_items);
    let mut used_ids: HashSet<String> = HashSet::new();

    // Budgeted pass: fill each source up to its target, skipping ids already
    // taken from an earlier source.
    for (cursor, &budget) in cursors.iter_mut().zip(budgets.iter()) {
        let mut taken = 0;
        while taken < budget {
            let Some(item) = cursor.next() else {
                break;
            };
            if used_ids.insert(item.feed_id().to_string()) {
                result.push(item);
                taken += 1;
            }
        }
    }

    // Backfill pass: compensate for rounding shortfall and exhausted sources,
    // continuing from each cursor where the budgeted pass stopped.
    if result.len() < total_items {
        for cursor in cursors.iter_mut() {
            if result.len() >= total_items {
                break;
            }
            while result.len() < total_items {
                let Some(item) = cursor.next() else {
                    break;
                };
                if used_ids.insert(item.feed_id().to_string()) {
                    result.push(item);
                }
            }
        }
    }

    result.truncate(total_items);
    Ok(result)
}
