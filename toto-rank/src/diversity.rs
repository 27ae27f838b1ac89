use std::collections::HashSet;

use crate::combinations::SubsetKey;
use crate::topk::TopEntry;

#[derive(Debug, Clone, PartialEq)]
pub struct SelectedEntry {
    /// Rang de sélection, à partir de 1.
    pub number: usize,
    pub entry: TopEntry,
}

/// Sélection gloutonne : parcourt la liste déjà triée par score décroissant et retient
/// chaque combinaison dont aucune sous-combinaison n'a déjà été retenue.
pub fn select_diverse(ranked: &[TopEntry], count: usize) -> Vec<SelectedEntry> {
    let mut selected = Vec::with_capacity(count.min(ranked.len()));
    if count == 0 {
        return selected;
    }
    let mut seen: HashSet<SubsetKey> = HashSet::new();

    for entry in ranked {
        if entry.subsets.iter().any(|s| seen.contains(&s.subset)) {
            continue;
        }
        seen.extend(entry.subsets.iter().map(|s| s.subset));
        selected.push(SelectedEntry { number: selected.len() + 1, entry: entry.clone() });
        if selected.len() >= count {
            break;
        }
    }

    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinations::{index_patterns, Combinations};
    use crate::scorer::SubsetGap;

    fn entry(ordinal: u64, numbers: &[u8], k: usize, value: f64) -> TopEntry {
        let subsets = index_patterns(numbers.len(), k)
            .iter()
            .map(|p| {
                let picked: Vec<u8> = p.iter().map(|&i| numbers[i]).collect();
                SubsetGap { subset: SubsetKey::from_numbers(&picked), gap: 0 }
            })
            .collect();
        TopEntry {
            ordinal,
            value,
            numbers: numbers.to_vec(),
            avg_gap: value,
            min_gap: value as u32,
            subsets,
        }
    }

    #[test]
    fn test_skips_overlapping_candidates() {
        let ranked = vec![
            entry(0, &[1, 2, 3], 2, 5.0),
            entry(1, &[1, 2, 4], 2, 4.0), // partage {1,2}
            entry(2, &[1, 4, 5], 2, 3.0),
            entry(3, &[2, 4, 6], 2, 2.0),
        ];
        let picked = select_diverse(&ranked, 10);
        let ords: Vec<u64> = picked.iter().map(|s| s.entry.ordinal).collect();
        assert_eq!(ords, vec![0, 2, 3]);
        let numbers: Vec<usize> = picked.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_stops_at_count() {
        let ranked = vec![
            entry(0, &[1, 2, 3], 3, 3.0),
            entry(1, &[4, 5, 6], 3, 2.0),
            entry(2, &[7, 8, 9], 3, 1.0),
        ];
        assert_eq!(select_diverse(&ranked, 2).len(), 2);
    }

    #[test]
    fn test_zero_count_selects_nothing() {
        let ranked = vec![entry(0, &[1, 2, 3], 2, 1.0)];
        assert!(select_diverse(&ranked, 0).is_empty());
    }

    #[test]
    fn test_short_list_is_not_an_error() {
        let ranked = vec![entry(0, &[1, 2, 3], 2, 1.0), entry(1, &[1, 2, 5], 2, 1.0)];
        assert_eq!(select_diverse(&ranked, 5).len(), 1);
        assert!(select_diverse(&[], 5).is_empty());
    }

    #[test]
    fn test_picks_are_disjoint_ordered_subsequence() {
        let ranked: Vec<TopEntry> = Combinations::new(9, 4)
            .enumerate()
            .map(|(i, c)| entry(i as u64, &c, 2, 100.0 - i as f64))
            .collect();
        let picked = select_diverse(&ranked, 50);
        assert!(picked.len() <= 50usize.min(ranked.len()));
        assert!(!picked.is_empty());

        for (a_idx, a) in picked.iter().enumerate() {
            for b in &picked[a_idx + 1..] {
                let a_set: HashSet<_> = a.entry.subsets.iter().map(|s| s.subset).collect();
                assert!(b.entry.subsets.iter().all(|s| !a_set.contains(&s.subset)));
                assert!(a.entry.ordinal < b.entry.ordinal);
            }
        }
    }
}
