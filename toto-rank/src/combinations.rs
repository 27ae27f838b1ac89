//! Combinatorial primitives: binomial coefficients, lexicographic enumeration
//! and the bitmask key used for k-subsets.

/// Largest number a subset key can hold (bit `n - 1` of a `u128`).
pub const MAX_UNIVERSE: u8 = 128;

/// C(n, r), or `None` if it does not fit in a `u64`.
pub fn binomial(n: u64, r: u64) -> Option<u64> {
    if r > n {
        return Some(0);
    }
    let r = r.min(n - r);
    let mut acc: u128 = 1;
    for i in 0..r {
        acc = acc.checked_mul((n - i) as u128)? / (i as u128 + 1);
    }
    u64::try_from(acc).ok()
}

/// Advances `combo` (strictly ascending, values ≤ `max`) to the next combination in
/// lexicographic order. Returns `false` once the last combination has been passed;
/// `combo` is then left unchanged.
pub fn next_combination(combo: &mut [u8], max: u8) -> bool {
    let r = combo.len();
    let mut i = r;
    while i > 0 {
        i -= 1;
        let limit = max as usize - (r - 1 - i);
        if (combo[i] as usize) < limit {
            combo[i] += 1;
            for t in (i + 1)..r {
                combo[t] = combo[t - 1] + 1;
            }
            return true;
        }
    }
    false
}

/// All r-combinations of the positions `0..n`, lexicographic. Applied to a sorted
/// slice they give its r-subsets in canonical order.
pub fn index_patterns(n: usize, r: usize) -> Vec<Vec<usize>> {
    if r > n {
        return Vec::new();
    }
    let mut patterns = Vec::new();
    let mut current: Vec<usize> = (0..r).collect();
    loop {
        patterns.push(current.clone());
        let mut i = r;
        let mut advanced = false;
        while i > 0 {
            i -= 1;
            if current[i] < n - (r - i) {
                current[i] += 1;
                for t in (i + 1)..r {
                    current[t] = current[t - 1] + 1;
                }
                advanced = true;
                break;
            }
        }
        if !advanced {
            return patterns;
        }
    }
}

/// Lazy lexicographic enumeration of the r-combinations of `{1..=max}`.
#[derive(Debug, Clone)]
pub struct Combinations {
    current: Vec<u8>,
    max: u8,
    done: bool,
}

impl Combinations {
    pub fn new(max: u8, r: usize) -> Self {
        let done = r == 0 || r > max as usize;
        let current = (1..=r as u8).collect();
        Self { current, max, done }
    }
}

impl Iterator for Combinations {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.current.clone();
        if !next_combination(&mut self.current, self.max) {
            self.done = true;
        }
        Some(item)
    }
}

/// A set of numbers in `1..=MAX_UNIVERSE`, stored as a bitmask. Two keys are equal
/// exactly when they hold the same numbers, whatever order they were built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubsetKey(u128);

impl SubsetKey {
    pub const EMPTY: SubsetKey = SubsetKey(0);

    pub fn from_numbers(numbers: &[u8]) -> Self {
        numbers.iter().fold(Self::EMPTY, |key, &n| key.with(n))
    }

    #[inline]
    pub fn with(self, n: u8) -> Self {
        debug_assert!((1..=MAX_UNIVERSE).contains(&n));
        SubsetKey(self.0 | 1u128 << (n - 1))
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn intersects(&self, other: &SubsetKey) -> bool {
        self.0 & other.0 != 0
    }

    /// Numbers in ascending order.
    pub fn numbers(&self) -> Vec<u8> {
        let mut bits = self.0;
        let mut out = Vec::with_capacity(self.len());
        while bits != 0 {
            let tz = bits.trailing_zeros();
            out.push(tz as u8 + 1);
            bits &= bits - 1;
        }
        out
    }
}

impl std::fmt::Display for SubsetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.numbers().iter().map(|n| n.to_string()).collect();
        write!(f, "({})", parts.join(", "))
    }
}
