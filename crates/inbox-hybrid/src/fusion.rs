//! Reciprocal Rank Fusion: score = Σ 1/(k + rank_i), rank 0-based.
//!
//! Only positions matter, so rankings on unrelated score scales (BM25,
//! cosine) combine without normalisation.

use std::collections::HashMap;
use std::hash::Hash;

use inbox_core::types::{sort_descending, Ranking, Scored};

pub const RRF_K: f64 = 60.0;

/// Fuses `rankings` with `k = 60`. See [`fuse_with_k`].
pub fn fuse<T, K, F>(rankings: &[Ranking<T>], to_id: F) -> Ranking<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    fuse_with_k(rankings, RRF_K, to_id)
}

/// Every distinct id across `rankings` appears once, represented by the
/// first item seen with that id. Ties keep first-appearance order, walking
/// the lists in order.
pub fn fuse_with_k<T, K, F>(rankings: &[Ranking<T>], k: f64, to_id: F) -> Ranking<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut fused: Ranking<T> = Vec::new();
    let mut slot_of: HashMap<K, usize> = HashMap::new();

    for ranking in rankings {
        for (rank, scored) in ranking.iter().enumerate() {
            let contribution = 1.0 / (k + rank as f64);
            let id = to_id(&scored.item);
            match slot_of.get(&id) {
                Some(&slot) => fused[slot].score += contribution,
                None => {
                    slot_of.insert(id, fused.len());
                    fused.push(Scored { item: scored.item.clone(), score: contribution });
                }
            }
        }
    }

    sort_descending(&mut fused);
    fused
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranking(ids: &[&'static str]) -> Ranking<&'static str> {
        ids.iter().map(|&id| Scored { item: id, score: 1.0 }).collect()
    }

    #[test]
    fn swapped_pair_ties_and_keeps_first_seen() {
        let fused = fuse(&[ranking(&["x", "y"]), ranking(&["y", "x"])], |s| *s);
        let expected = 1.0 / 60.0 + 1.0 / 61.0;
        assert_eq!(fused.len(), 2);
        assert_eq!(fused[0].item, "x");
        assert_eq!(fused[1].item, "y");
        assert!((fused[0].score - expected).abs() < 1e-12);
        assert!((fused[1].score - expected).abs() < 1e-12);
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let none: Vec<Ranking<&str>> = Vec::new();
        assert!(fuse(&none, |s| *s).is_empty());
        assert!(fuse(&[ranking(&[]), ranking(&[])], |s| *s).is_empty());
    }
}
