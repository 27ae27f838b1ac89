use std::ops::ControlFlow;

use crate::combinations::{binomial, index_patterns, next_combination, Combinations, SubsetKey};
use crate::config::{RunParams, ScoreMode};
use crate::index::RecencyIndex;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub gap_sum: u64,
    pub min_gap: u32,
    /// `gap_sum / C(j, k)`.
    pub avg_gap: f64,
}

impl CandidateScore {
    pub fn value(&self, mode: ScoreMode) -> f64 {
        match mode {
            ScoreMode::Min => self.min_gap as f64,
            ScoreMode::Avg => self.avg_gap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetGap {
    pub subset: SubsetKey,
    pub gap: u32,
}

/// A candidate with its full subset breakdown, as produced by [`CandidateScorer::iter`].
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    /// Position in the lexicographic enumeration, starting at 0.
    pub ordinal: u64,
    pub numbers: Vec<u8>,
    pub score: CandidateScore,
    pub value: f64,
    pub subsets: Vec<SubsetGap>,
}

/// Candidates sharing the same leading number: a contiguous run of the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub first: u8,
    pub base_ordinal: u64,
    pub len: u64,
}

pub struct CandidateScorer<'a> {
    index: &'a RecencyIndex,
    max_number: u8,
    j: usize,
    mode: ScoreMode,
    patterns: Vec<Vec<usize>>,
}

impl<'a> CandidateScorer<'a> {
    /// `k` is taken from the index.
    pub fn new(index: &'a RecencyIndex, max_number: u8, j: usize, mode: ScoreMode) -> Self {
        let patterns = index_patterns(j, index.k());
        Self { index, max_number, j, mode, patterns }
    }

    pub fn from_params(index: &'a RecencyIndex, params: &RunParams) -> Self {
        Self::new(index, params.max_number, params.j, params.mode)
    }

    pub fn mode(&self) -> ScoreMode {
        self.mode
    }

    /// C(max_number, j), saturating.
    pub fn total(&self) -> u64 {
        binomial(self.max_number as u64, self.j as u64).unwrap_or(u64::MAX)
    }

    pub fn subsets_per_candidate(&self) -> usize {
        self.patterns.len()
    }

    /// `combo` must be sorted ascending.
    #[inline]
    pub fn score(&self, combo: &[u8]) -> CandidateScore {
        let mut gap_sum = 0u64;
        let mut min_gap = u32::MAX;
        for pattern in &self.patterns {
            let key = pattern.iter().fold(SubsetKey::EMPTY, |key, &p| key.with(combo[p]));
            let gap = self.index.gap(&key);
            gap_sum += gap as u64;
            min_gap = min_gap.min(gap);
        }
        if self.patterns.is_empty() {
            min_gap = 0;
        }
        let avg_gap = if self.patterns.is_empty() {
            0.0
        } else {
            gap_sum as f64 / self.patterns.len() as f64
        };
        CandidateScore { gap_sum, min_gap, avg_gap }
    }

    /// Subsets of `combo` in canonical order, each with its gap.
    pub fn breakdown(&self, combo: &[u8]) -> Vec<SubsetGap> {
        self.patterns
            .iter()
            .map(|pattern| {
                let subset = pattern.iter().fold(SubsetKey::EMPTY, |key, &p| key.with(combo[p]));
                SubsetGap { subset, gap: self.index.gap(&subset) }
            })
            .collect()
    }

    pub fn evaluate(&self, ordinal: u64, combo: &[u8]) -> ScoredCandidate {
        let score = self.score(combo);
        ScoredCandidate {
            ordinal,
            numbers: combo.to_vec(),
            value: score.value(self.mode),
            score,
            subsets: self.breakdown(combo),
        }
    }

    /// Lazy, restartable sequence over every candidate in lexicographic order.
    pub fn iter(&self) -> ScoredCandidates<'_, 'a> {
        ScoredCandidates {
            scorer: self,
            combos: Combinations::new(self.max_number, self.j),
            ordinal: 0,
        }
    }

    /// Splits the enumeration by leading number. Partitions are in enumeration order
    /// and their ordinals are contiguous.
    pub fn partitions(&self) -> Vec<Partition> {
        if self.j == 0 || self.j > self.max_number as usize {
            return Vec::new();
        }
        let last_first = self.max_number as usize - self.j + 1;
        let mut base_ordinal = 0u64;
        (1..=last_first as u8)
            .map(|first| {
                let rest = (self.max_number - first) as u64;
                let len = binomial(rest, self.j as u64 - 1).unwrap_or(u64::MAX);
                let part = Partition { first, base_ordinal, len };
                base_ordinal = base_ordinal.saturating_add(len);
                part
            })
            .collect()
    }

    /// Visits every candidate of `part` in order without allocating per candidate.
    pub fn scan_partition<F>(&self, part: &Partition, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(u64, &[u8], CandidateScore) -> ControlFlow<()>,
    {
        let mut combo: Vec<u8> = (0..self.j as u8).map(|i| part.first + i).collect();
        let mut ordinal = part.base_ordinal;
        loop {
            visit(ordinal, &combo, self.score(&combo))?;
            ordinal += 1;
            if !next_combination(&mut combo[1..], self.max_number) {
                return ControlFlow::Continue(());
            }
        }
    }

    /// Visits every candidate in canonical order.
    pub fn scan<F>(&self, mut visit: F) -> ControlFlow<()>
    where
        F: FnMut(u64, &[u8], CandidateScore) -> ControlFlow<()>,
    {
        if self.j == 0 || self.j > self.max_number as usize {
            return ControlFlow::Continue(());
        }
        let mut combo: Vec<u8> = (1..=self.j as u8).collect();
        let mut ordinal = 0u64;
        loop {
            visit(ordinal, &combo, self.score(&combo))?;
            ordinal += 1;
            if !next_combination(&mut combo, self.max_number) {
                return ControlFlow::Continue(());
            }
        }
    }
}

pub struct ScoredCandidates<'s, 'a> {
    scorer: &'s CandidateScorer<'a>,
    combos: Combinations,
    ordinal: u64,
}

impl Iterator for ScoredCandidates<'_, '_> {
    type Item = ScoredCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        let combo = self.combos.next()?;
        let scored = self.scorer.evaluate(self.ordinal, &combo);
        self.ordinal += 1;
        Some(scored)
    }
}
