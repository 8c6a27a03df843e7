//! Weighted hand ranges.
//!
//! A range is an ordered list of `(pattern, weight)` entries written in the
//! usual shorthand: `AA(5),KK-99,AKs,86s+,AhKh,22+`. Patterns expand to
//! concrete combos; weights are relative integer multipliers.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use itertools::Itertools;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::cards::{
    cards_mask, full_deck, parse_combo, Card, Combo, Rank, ALL_RANKS, ALL_SUITS,
};
use crate::error::{EngineError, EngineResult};

pub const TOTAL_COMBOS: usize = 1326;

static ANYTHING: Lazy<Vec<Combo>> = Lazy::new(|| {
    full_deck()
        .into_iter()
        .tuple_combinations()
        .map(|(a, b)| Combo::from_distinct(a, b))
        .collect()
});

/// Every two-card combo, built once.
pub fn all_combos() -> &'static [Combo] {
    &ANYTHING
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suitedness {
    Suited,
    Offsuit,
    Any,
}

impl Suitedness {
    fn suffix(self) -> &'static str {
        match self {
            Suitedness::Suited => "s",
            Suitedness::Offsuit => "o",
            Suitedness::Any => "",
        }
    }

    fn admits(self, suited: bool) -> bool {
        match self {
            Suitedness::Suited => suited,
            Suitedness::Offsuit => !suited,
            Suitedness::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangePattern {
    Anything,
    Nothing,
    /// `AhKh`
    Exact(Combo),
    /// `AA`
    Pair(Rank),
    /// `AKs`, `AKo`, `AK`
    Unpaired {
        high: Rank,
        low: Rank,
        suitedness: Suitedness,
    },
    /// `KK-99`
    PairSpan { top: Rank, bottom: Rank },
    /// `22+`
    PairPlus(Rank),
    /// `AKo-AJo`: the high rank is fixed, the low rank runs from `bottom` to `top`.
    UnpairedSpan {
        high: Rank,
        top: Rank,
        bottom: Rank,
        suitedness: Suitedness,
    },
    /// `86s+`: the low rank runs from `low` up to one below `high`.
    UnpairedPlus {
        high: Rank,
        low: Rank,
        suitedness: Suitedness,
    },
}

fn pair_combos(rank: Rank, out: &mut Vec<Combo>) {
    for (i, &s1) in ALL_SUITS.iter().enumerate().rev() {
        for &s2 in ALL_SUITS[..i].iter().rev() {
            out.push(Combo::from_distinct(Card::new(rank, s1), Card::new(rank, s2)));
        }
    }
}

fn unpaired_combos(high: Rank, low: Rank, suitedness: Suitedness, out: &mut Vec<Combo>) {
    for &s1 in ALL_SUITS.iter().rev() {
        for &s2 in ALL_SUITS.iter().rev() {
            if suitedness.admits(s1 == s2) {
                out.push(Combo::from_distinct(Card::new(high, s1), Card::new(low, s2)));
            }
        }
    }
}

fn ranks_between(bottom: Rank, top: Rank) -> impl DoubleEndedIterator<Item = Rank> {
    (bottom.index()..=top.index()).filter_map(Rank::from_index)
}

impl RangePattern {
    /// All combos of the pattern, ignoring dead cards.
    pub fn combos(&self) -> Vec<Combo> {
        let mut out = Vec::new();
        match *self {
            RangePattern::Anything => out.extend_from_slice(all_combos()),
            RangePattern::Nothing => {}
            RangePattern::Exact(combo) => out.push(combo),
            RangePattern::Pair(rank) => pair_combos(rank, &mut out),
            RangePattern::Unpaired {
                high,
                low,
                suitedness,
            } => unpaired_combos(high, low, suitedness, &mut out),
            RangePattern::PairSpan { top, bottom } => {
                for rank in ranks_between(bottom, top).rev() {
                    pair_combos(rank, &mut out);
                }
            }
            RangePattern::PairPlus(bottom) => {
                for rank in ranks_between(bottom, Rank::Ace).rev() {
                    pair_combos(rank, &mut out);
                }
            }
            RangePattern::UnpairedSpan {
                high,
                top,
                bottom,
                suitedness,
            } => {
                for low in ranks_between(bottom, top).rev() {
                    unpaired_combos(high, low, suitedness, &mut out);
                }
            }
            RangePattern::UnpairedPlus {
                high,
                low,
                suitedness,
            } => {
                if let Some(top) = Rank::from_index(high.index() - 1) {
                    for l in ranks_between(low, top).rev() {
                        unpaired_combos(high, l, suitedness, &mut out);
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for RangePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RangePattern::Anything => write!(f, "anything"),
            RangePattern::Nothing => write!(f, "nothing"),
            RangePattern::Exact(combo) => write!(f, "{}", combo),
            RangePattern::Pair(r) => write!(f, "{}{}", r.to_char(), r.to_char()),
            RangePattern::Unpaired {
                high,
                low,
                suitedness,
            } => write!(f, "{}{}{}", high.to_char(), low.to_char(), suitedness.suffix()),
            RangePattern::PairSpan { top, bottom } => write!(
                f,
                "{}{}-{}{}",
                top.to_char(),
                top.to_char(),
                bottom.to_char(),
                bottom.to_char()
            ),
            RangePattern::PairPlus(r) => write!(f, "{}{}+", r.to_char(), r.to_char()),
            RangePattern::UnpairedSpan {
                high,
                top,
                bottom,
                suitedness,
            } => write!(
                f,
                "{h}{t}{s}-{h}{b}{s}",
                h = high.to_char(),
                t = top.to_char(),
                b = bottom.to_char(),
                s = suitedness.suffix()
            ),
            RangePattern::UnpairedPlus {
                high,
                low,
                suitedness,
            } => write!(f, "{}{}{}+", high.to_char(), low.to_char(), suitedness.suffix()),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

enum HandClass {
    Pair(Rank),
    Unpaired(Rank, Rank, Suitedness),
}

fn bad(token: &str) -> EngineError {
    EngineError::InvalidRangeNotation(token.to_string())
}

fn parse_class(spec: &str, token: &str) -> EngineResult<HandClass> {
    let chars: Vec<char> = spec.chars().collect();
    let suitedness = match chars.len() {
        2 => Suitedness::Any,
        3 => match chars[2] {
            's' => Suitedness::Suited,
            'o' => Suitedness::Offsuit,
            _ => return Err(bad(token)),
        },
        _ => return Err(bad(token)),
    };
    let r1 = Rank::from_char(chars[0]).map_err(|_| bad(token))?;
    let r2 = Rank::from_char(chars[1]).map_err(|_| bad(token))?;
    if r1 == r2 {
        if suitedness != Suitedness::Any {
            return Err(bad(token));
        }
        return Ok(HandClass::Pair(r1));
    }
    if r1 < r2 {
        return Err(bad(token));
    }
    Ok(HandClass::Unpaired(r1, r2, suitedness))
}

fn parse_pattern(spec: &str, token: &str) -> EngineResult<RangePattern> {
    match spec {
        "anything" => return Ok(RangePattern::Anything),
        "nothing" => return Ok(RangePattern::Nothing),
        _ => {}
    }

    if let Some(base) = spec.strip_suffix('+') {
        return match parse_class(base, token)? {
            HandClass::Pair(r) => Ok(RangePattern::PairPlus(r)),
            HandClass::Unpaired(high, low, suitedness) => Ok(RangePattern::UnpairedPlus {
                high,
                low,
                suitedness,
            }),
        };
    }

    if let Some((left, right)) = spec.split_once('-') {
        return match (parse_class(left, token)?, parse_class(right, token)?) {
            (HandClass::Pair(a), HandClass::Pair(b)) => Ok(RangePattern::PairSpan {
                top: a.max(b),
                bottom: a.min(b),
            }),
            (HandClass::Unpaired(h1, l1, s1), HandClass::Unpaired(h2, l2, s2))
                if h1 == h2 && s1 == s2 =>
            {
                Ok(RangePattern::UnpairedSpan {
                    high: h1,
                    top: l1.max(l2),
                    bottom: l1.min(l2),
                    suitedness: s1,
                })
            }
            _ => Err(bad(token)),
        };
    }

    if spec.len() == 4 {
        return parse_combo(spec)
            .map(RangePattern::Exact)
            .map_err(|_| bad(token));
    }

    match parse_class(spec, token)? {
        HandClass::Pair(r) => Ok(RangePattern::Pair(r)),
        HandClass::Unpaired(high, low, suitedness) => Ok(RangePattern::Unpaired {
            high,
            low,
            suitedness,
        }),
    }
}

fn parse_entry(token: &str) -> EngineResult<RangeEntry> {
    let (spec, weight) = match token.strip_suffix(')') {
        Some(body) => {
            let (spec, weight) = body.split_once('(').ok_or_else(|| bad(token))?;
            if weight.is_empty() || !weight.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad(token));
            }
            let weight: u32 = weight.parse().map_err(|_| bad(token))?;
            if weight == 0 {
                return Err(bad(token));
            }
            (spec, weight)
        }
        None => (token, 1),
    };
    Ok(RangeEntry {
        pattern: parse_pattern(spec, token)?,
        weight,
    })
}

// ---------------------------------------------------------------------------
// HandRange
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeEntry {
    pub pattern: RangePattern,
    pub weight: u32,
}

impl fmt::Display for RangeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weight == 1 {
            write!(f, "{}", self.pattern)
        } else {
            write!(f, "{}({})", self.pattern, self.weight)
        }
    }
}

/// An immutable weighted range. Transforms return a new range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HandRange {
    entries: Vec<RangeEntry>,
}

impl HandRange {
    /// Parses comma-separated notation. Whitespace is not allowed anywhere.
    pub fn parse(notation: &str) -> EngineResult<HandRange> {
        if notation.is_empty() {
            return Err(bad(notation));
        }
        let entries = notation
            .split(',')
            .map(parse_entry)
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(HandRange { entries })
    }

    pub fn anything() -> HandRange {
        HandRange {
            entries: vec![RangeEntry {
                pattern: RangePattern::Anything,
                weight: 1,
            }],
        }
    }

    pub fn nothing() -> HandRange {
        HandRange {
            entries: vec![RangeEntry {
                pattern: RangePattern::Nothing,
                weight: 1,
            }],
        }
    }

    /// A range holding exactly one combo.
    pub fn single(combo: Combo) -> HandRange {
        HandRange {
            entries: vec![RangeEntry {
                pattern: RangePattern::Exact(combo),
                weight: 1,
            }],
        }
    }

    pub fn entries(&self) -> &[RangeEntry] {
        &self.entries
    }

    /// Every `(combo, weight)` of the range that shares no card with `board`.
    pub fn generate(&self, board: &[Card]) -> Vec<(Combo, u32)> {
        let dead = cards_mask(board);
        self.entries
            .iter()
            .flat_map(|entry| {
                entry
                    .pattern
                    .combos()
                    .into_iter()
                    .filter(move |c| c.mask() & dead == 0)
                    .map(move |c| (c, entry.weight))
            })
            .collect()
    }

    /// Like `generate`, but only for evenly weighted ranges.
    pub fn generate_unweighted(&self, board: &[Card]) -> EngineResult<Vec<Combo>> {
        if !self.entries.iter().map(|e| e.weight).all_equal() {
            return Err(EngineError::UnevenWeighting);
        }
        Ok(self.generate(board).into_iter().map(|(c, _)| c).collect())
    }

    /// Combos of the range avoiding every card in `dead`.
    pub fn combos_avoiding(&self, dead: u64) -> Vec<Combo> {
        self.entries
            .iter()
            .flat_map(|entry| entry.pattern.combos())
            .filter(|c| c.mask() & dead == 0)
            .collect()
    }

    pub fn combo_count(&self, board: &[Card]) -> usize {
        self.combos_avoiding(cards_mask(board)).len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .iter()
            .all(|e| e.pattern.combos().is_empty())
    }

    pub fn weight_of(&self, combo: &Combo) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.pattern.combos().contains(combo))
            .map(|e| e.weight)
    }

    pub fn contains(&self, combo: &Combo) -> bool {
        self.weight_of(combo).is_some()
    }

    /// Combo -> weight map; fails on a combo produced twice.
    pub fn weight_map(&self) -> EngineResult<HashMap<Combo, u32>> {
        let mut map = HashMap::new();
        for (combo, weight) in self.generate(&[]) {
            if map.insert(combo, weight).is_some() {
                return Err(EngineError::DuplicateCombo(combo.to_string()));
            }
        }
        Ok(map)
    }

    pub fn validate(&self) -> EngineResult<()> {
        self.weight_map().map(|_| ())
    }

    /// Removes every combo that `other` holds at the same weight.
    pub fn subtract(&self, other: &HandRange) -> EngineResult<HandRange> {
        let theirs: HashMap<Combo, u32> = other.generate(&[]).into_iter().collect();
        let kept: Vec<(Combo, u32)> = self
            .generate(&[])
            .into_iter()
            .filter(|(combo, weight)| theirs.get(combo) != Some(weight))
            .collect();
        canonicalize(&kept)
    }

    pub fn reweight(&self, weight: u32) -> EngineResult<HandRange> {
        if weight == 0 {
            return Err(EngineError::Validation("weight must be positive".to_string()));
        }
        Ok(HandRange {
            entries: self
                .entries
                .iter()
                .map(|e| RangeEntry {
                    pattern: e.pattern,
                    weight,
                })
                .collect(),
        })
    }

    pub fn remove_board(&self, board: &[Card]) -> EngineResult<HandRange> {
        canonicalize(&self.generate(board))
    }
}

impl fmt::Display for HandRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.entries.iter().join(","))
    }
}

impl FromStr for HandRange {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<HandRange> {
        HandRange::parse(s)
    }
}

impl TryFrom<String> for HandRange {
    type Error = EngineError;

    fn try_from(s: String) -> EngineResult<HandRange> {
        HandRange::parse(&s)
    }
}

impl From<HandRange> for String {
    fn from(range: HandRange) -> String {
        range.to_string()
    }
}

// ---------------------------------------------------------------------------
// Canonicalization
// ---------------------------------------------------------------------------

/// Splits ascending ranks into maximal contiguous runs, each returned as (bottom, top).
fn contiguous_runs(ranks: &[Rank]) -> Vec<(Rank, Rank)> {
    let mut runs: Vec<(Rank, Rank)> = Vec::new();
    for &rank in ranks {
        match runs.last_mut() {
            Some((_, top)) if top.index() + 1 == rank.index() => *top = rank,
            _ => runs.push((rank, rank)),
        }
    }
    runs
}

fn pair_run(bottom: Rank, top: Rank) -> RangePattern {
    if bottom == top {
        RangePattern::Pair(top)
    } else if top == Rank::Ace {
        RangePattern::PairPlus(bottom)
    } else {
        RangePattern::PairSpan { top, bottom }
    }
}

fn unpaired_run(high: Rank, bottom: Rank, top: Rank, suitedness: Suitedness) -> RangePattern {
    if bottom == top {
        RangePattern::Unpaired {
            high,
            low: top,
            suitedness,
        }
    } else if top.index() + 1 == high.index() {
        RangePattern::UnpairedPlus {
            high,
            low: bottom,
            suitedness,
        }
    } else {
        RangePattern::UnpairedSpan {
            high,
            top,
            bottom,
            suitedness,
        }
    }
}

/// Removes `class` from `combos` when every one of its combos is present.
fn take_if_complete(combos: &mut HashSet<Combo>, class: &[Combo]) -> bool {
    if !class.iter().all(|c| combos.contains(c)) {
        return false;
    }
    for c in class {
        combos.remove(c);
    }
    true
}

/// Collapses one weight group into class tokens plus leftover exact combos.
fn collapse_group(mut combos: HashSet<Combo>) -> Vec<RangePattern> {
    let mut patterns = Vec::new();
    let mut scratch = Vec::with_capacity(12);

    let mut pair_ranks = Vec::new();
    for &rank in &ALL_RANKS {
        scratch.clear();
        pair_combos(rank, &mut scratch);
        if take_if_complete(&mut combos, &scratch) {
            pair_ranks.push(rank);
        }
    }
    for (bottom, top) in contiguous_runs(&pair_ranks) {
        patterns.push(pair_run(bottom, top));
    }

    for suitedness in [Suitedness::Suited, Suitedness::Offsuit] {
        for (hi_idx, &high) in ALL_RANKS.iter().enumerate().skip(1) {
            let mut lows = Vec::new();
            for &low in &ALL_RANKS[..hi_idx] {
                scratch.clear();
                unpaired_combos(high, low, suitedness, &mut scratch);
                if take_if_complete(&mut combos, &scratch) {
                    lows.push(low);
                }
            }
            for (bottom, top) in contiguous_runs(&lows) {
                patterns.push(unpaired_run(high, bottom, top, suitedness));
            }
        }
    }

    patterns.extend(combos.into_iter().map(RangePattern::Exact));
    patterns
}

type TokenKey = (u8, Reverse<Rank>, Reverse<Option<Rank>>, u8, Reverse<Option<(u8, u8)>>, Reverse<u32>);

/// Pairs first, then suited, then offsuit; higher ranks first; class tokens before
/// exact combos of the same ranks; exact combos by descending suits; then heavier first.
fn token_key(entry: &RangeEntry) -> TokenKey {
    let (class, primary, secondary, exact, suits) = match entry.pattern {
        RangePattern::Pair(r) => (0, r, None, 0, None),
        RangePattern::PairPlus(_) => (0, Rank::Ace, None, 0, None),
        RangePattern::PairSpan { top, .. } => (0, top, None, 0, None),
        RangePattern::Unpaired {
            high,
            low,
            suitedness,
        }
        | RangePattern::UnpairedPlus {
            high,
            low,
            suitedness,
        } => {
            let top = match entry.pattern {
                RangePattern::UnpairedPlus { .. } => {
                    Rank::from_index(high.index() - 1).unwrap_or(low)
                }
                _ => low,
            };
            (class_of(suitedness), high, Some(top), 0, None)
        }
        RangePattern::UnpairedSpan {
            high,
            top,
            suitedness,
            ..
        } => (class_of(suitedness), high, Some(top), 0, None),
        RangePattern::Exact(combo) => {
            let class = if combo.is_pair() {
                0
            } else if combo.is_suited() {
                1
            } else {
                2
            };
            let secondary = if combo.is_pair() {
                None
            } else {
                Some(combo.low().rank)
            };
            let suits = (combo.high().suit as u8, combo.low().suit as u8);
            (class, combo.high().rank, secondary, 1, Some(suits))
        }
        RangePattern::Anything | RangePattern::Nothing => (3, Rank::Ace, None, 0, None),
    };
    (
        class,
        Reverse(primary),
        Reverse(secondary),
        exact,
        Reverse(suits),
        Reverse(entry.weight),
    )
}

fn class_of(suitedness: Suitedness) -> u8 {
    match suitedness {
        Suitedness::Suited => 1,
        Suitedness::Offsuit => 2,
        Suitedness::Any => 3,
    }
}

/// Minimal notation for a set of weighted combos; the inverse of `generate`.
pub fn canonicalize(combos: &[(Combo, u32)]) -> EngineResult<HandRange> {
    let mut groups: BTreeMap<u32, HashSet<Combo>> = BTreeMap::new();
    let mut seen: HashSet<Combo> = HashSet::with_capacity(combos.len());
    for &(combo, weight) in combos {
        if !seen.insert(combo) {
            return Err(EngineError::DuplicateCombo(combo.to_string()));
        }
        groups.entry(weight).or_default().insert(combo);
    }

    if seen.is_empty() {
        return Ok(HandRange::nothing());
    }
    if let Some((&weight, group)) = groups.iter().next() {
        if group.len() == TOTAL_COMBOS {
            return Ok(HandRange {
                entries: vec![RangeEntry {
                    pattern: RangePattern::Anything,
                    weight,
                }],
            });
        }
    }

    let mut entries: Vec<RangeEntry> = groups
        .into_iter()
        .flat_map(|(weight, group)| {
            collapse_group(group)
                .into_iter()
                .map(move |pattern| RangeEntry { pattern, weight })
        })
        .collect();

    entries.sort_by_key(token_key);
    for (a, b) in entries.iter().tuple_windows() {
        if token_key(a) == token_key(b) {
            return Err(EngineError::InternalInconsistency(format!(
                "tokens {} and {} sort as equal",
                a, b
            )));
        }
    }
    Ok(HandRange { entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anything_has_every_combo_once() {
        let set: HashSet<Combo> = all_combos().iter().copied().collect();
        assert_eq!(all_combos().len(), TOTAL_COMBOS);
        assert_eq!(set.len(), TOTAL_COMBOS);
    }

    #[test]
    fn runs_split_on_gaps() {
        let ranks = [Rank::Two, Rank::Three, Rank::Five, Rank::Seven, Rank::Eight];
        assert_eq!(
            contiguous_runs(&ranks),
            vec![
                (Rank::Two, Rank::Three),
                (Rank::Five, Rank::Five),
                (Rank::Seven, Rank::Eight)
            ]
        );
    }

    #[test]
    fn unpaired_run_prefers_plus_at_ceiling() {
        let p = unpaired_run(Rank::Eight, Rank::Six, Rank::Seven, Suitedness::Suited);
        assert_eq!(p.to_string(), "86s+");
        let p = unpaired_run(Rank::Ace, Rank::Ten, Rank::Queen, Suitedness::Offsuit);
        assert_eq!(p.to_string(), "AQo-ATo");
    }
}
