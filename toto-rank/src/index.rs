use std::collections::HashMap;

use toto_db::models::Draw;

use crate::combinations::{index_patterns, SubsetKey, MAX_UNIVERSE};

/// Retard de chaque k-sous-combinaison observée dans la fenêtre :
/// `gap = (window_size - 1) - position du tirage le plus récent qui la contient`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecencyIndex {
    gaps: HashMap<SubsetKey, u32>,
    window_size: usize,
    k: usize,
}

impl RecencyIndex {
    /// `window[0]` est le tirage le plus ancien. Le parcours va du plus récent au plus
    /// ancien : seule la première insertion d'une sous-combinaison est conservée.
    pub fn build(window: &[Draw], k: usize) -> Self {
        let window_size = window.len();
        let mut gaps = HashMap::new();
        let mut patterns_by_len: HashMap<usize, Vec<Vec<usize>>> = HashMap::new();

        for (idx, draw) in window.iter().enumerate().rev() {
            let numbers = usable_numbers(draw);
            if k == 0 || numbers.len() < k {
                continue;
            }
            let gap = (window_size - 1 - idx) as u32;
            let patterns = patterns_by_len
                .entry(numbers.len())
                .or_insert_with(|| index_patterns(numbers.len(), k));
            for pattern in patterns.iter() {
                let key = pattern
                    .iter()
                    .fold(SubsetKey::EMPTY, |key, &p| key.with(numbers[p]));
                gaps.entry(key).or_insert(gap);
            }
        }

        log::debug!(
            "Index de retard : {} sous-combinaisons de taille {} sur {} tirages",
            gaps.len(),
            k,
            window_size
        );

        Self { gaps, window_size, k }
    }

    /// Retard d'une sous-combinaison ; 0 si elle n'apparaît pas dans la fenêtre.
    #[inline]
    pub fn gap(&self, key: &SubsetKey) -> u32 {
        self.gaps.get(key).copied().unwrap_or(0)
    }

    pub fn get(&self, key: &SubsetKey) -> Option<u32> {
        self.gaps.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.gaps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SubsetKey, &u32)> {
        self.gaps.iter()
    }
}

/// Numéros présents, triés, sans doublon, limités à l'univers représentable.
fn usable_numbers(draw: &Draw) -> Vec<u8> {
    let mut numbers: Vec<u8> = draw
        .present_numbers()
        .into_iter()
        .filter(|n| (1..=MAX_UNIVERSE).contains(n))
        .collect();
    numbers.sort_unstable();
    numbers.dedup();
    numbers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinations::Combinations;

    fn draw(numbers: [Option<u8>; 6]) -> Draw {
        Draw { id: 0, draw_number: String::new(), numbers }
    }

    fn full(nums: [u8; 6]) -> Draw {
        draw(nums.map(Some))
    }

    fn sample_window() -> Vec<Draw> {
        vec![
            full([1, 2, 3, 4, 5, 6]),
            full([1, 2, 3, 7, 8, 9]),
            full([4, 5, 6, 7, 8, 9]),
        ]
    }

    #[test]
    fn test_gap_of_latest_occurrence() {
        let index = RecencyIndex::build(&sample_window(), 2);
        assert_eq!(index.get(&SubsetKey::from_numbers(&[1, 2])), Some(1));
        assert_eq!(index.get(&SubsetKey::from_numbers(&[4, 5])), Some(0));
        assert_eq!(index.get(&SubsetKey::from_numbers(&[1, 4])), Some(2));
        assert_eq!(index.get(&SubsetKey::from_numbers(&[7, 9])), Some(0));
    }

    #[test]
    fn test_absent_subset_defaults_to_zero() {
        let index = RecencyIndex::build(&sample_window(), 2);
        // 10 n'apparaît dans aucun tirage de la fenêtre.
        let unseen = SubsetKey::from_numbers(&[1, 10]);
        assert_eq!(index.get(&unseen), None);
        assert_eq!(index.gap(&unseen), 0);
        // Même retard qu'une paire du tirage le plus récent.
        assert_eq!(index.gap(&SubsetKey::from_numbers(&[4, 5])), index.gap(&unseen));
    }

    #[test]
    fn test_empty_window() {
        let index = RecencyIndex::build(&[], 3);
        assert!(index.is_empty());
        assert_eq!(index.window_size(), 0);
    }

    #[test]
    fn test_absent_numbers_excluded() {
        let window = vec![draw([Some(3), None, Some(1), None, Some(2), None])];
        let index = RecencyIndex::build(&window, 2);
        assert_eq!(index.len(), 3);
        assert_eq!(index.get(&SubsetKey::from_numbers(&[1, 3])), Some(0));

        // Moins de k numéros présents : rien n'est indexé.
        let index = RecencyIndex::build(&window, 4);
        assert!(index.is_empty());
    }

    #[test]
    fn test_duplicates_in_draw_collapse() {
        let window = vec![draw([Some(5), Some(5), Some(6), None, None, None])];
        let index = RecencyIndex::build(&window, 2);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get(&SubsetKey::from_numbers(&[5, 6])), Some(0));
    }

    #[test]
    fn test_every_subset_matches_brute_force() {
        let window = vec![
            full([1, 5, 9, 13, 17, 21]),
            full([2, 5, 9, 14, 18, 22]),
            full([1, 5, 10, 13, 19, 21]),
            full([3, 6, 9, 13, 17, 20]),
            full([1, 5, 9, 14, 17, 22]),
        ];
        let k = 3;
        let index = RecencyIndex::build(&window, k);
        let n = window.len();

        let mut expected: HashMap<SubsetKey, u32> = HashMap::new();
        for (idx, d) in window.iter().enumerate() {
            let mut nums = d.present_numbers();
            nums.sort_unstable();
            for subset in index_patterns(nums.len(), k) {
                let picked: Vec<u8> = subset.iter().map(|&p| nums[p]).collect();
                // Le plus récent écrase les plus anciens.
                expected.insert(SubsetKey::from_numbers(&picked), (n - 1 - idx) as u32);
            }
        }

        assert_eq!(index.len(), expected.len());
        for (key, gap) in &expected {
            assert_eq!(index.get(key), Some(*gap), "subset {}", key);
        }
        assert!(index.iter().all(|(_, &g)| (g as usize) < n));
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let window = sample_window();
        assert_eq!(RecencyIndex::build(&window, 3), RecencyIndex::build(&window, 3));
    }

    #[test]
    fn test_single_draw_all_gaps_zero() {
        let window = vec![full([10, 20, 30, 40, 41, 42])];
        let index = RecencyIndex::build(&window, 2);
        assert_eq!(index.len(), Combinations::new(6, 2).count());
        assert!(index.iter().all(|(_, &g)| g == 0));
    }
}
