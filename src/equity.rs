//! Showdowns and range-vs-range equity.
//!
//! `showdown_equity` enumerates every deal exactly when the board is complete
//! and the number of combo combinations is within `hard_limit`; otherwise it
//! samples deals (and board runouts) at random.

use std::collections::HashMap;
use std::fmt;

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::cards::{cards_mask, Card, Combo, Deck};
use crate::error::{EngineError, EngineResult};
use crate::game::PlayerId;
use crate::hand_evaluator::{evaluate_combo, HandStrength};
use crate::range::HandRange;

/// Consecutive rejected samples tolerated before a Monte Carlo trial is abandoned.
pub const MAX_SAMPLE_RETRIES: usize = 100;

/// Attempts made by `deal_hands` before giving up.
pub const MAX_DEAL_ATTEMPTS: usize = 10_000;

pub const DEFAULT_HARD_LIMIT: u64 = 50_000;

#[derive(Debug, Clone)]
pub struct ShowdownResult {
    /// Players in showdown order; `None` means the hand was mucked.
    pub hands: Vec<(PlayerId, Option<HandStrength>)>,
    pub winners: Vec<PlayerId>,
}

impl ShowdownResult {
    /// Each winner's share of `pot`.
    pub fn share(&self, pot: f64) -> f64 {
        if self.winners.is_empty() {
            return 0.0;
        }
        pot / self.winners.len() as f64
    }
}

/// Shows hands down in the given order. A hand is revealed only if it is at
/// least as good as the best hand revealed before it.
///
/// Panics if a card appears twice across the board and the hands.
pub fn showdown(board: &[Card], hands: &[(PlayerId, Combo)]) -> EngineResult<ShowdownResult> {
    let mut seen = cards_mask(board);
    assert_eq!(
        seen.count_ones() as usize,
        board.len(),
        "duplicate card on the board"
    );
    for (_, combo) in hands {
        assert_eq!(seen & combo.mask(), 0, "duplicate card at showdown: {}", combo);
        seen |= combo.mask();
    }
    if board.len() != 5 {
        return Err(EngineError::NotEnoughCards {
            need: 5,
            got: board.len(),
        });
    }

    let mut best: Option<HandStrength> = None;
    let mut revealed = Vec::with_capacity(hands.len());
    for &(player, combo) in hands {
        let strength = evaluate_combo(&combo, board);
        if best.map_or(true, |b| strength >= b) {
            best = Some(strength);
            revealed.push((player, Some(strength)));
        } else {
            revealed.push((player, None));
        }
    }

    let winners = revealed
        .iter()
        .filter(|(_, s)| s.is_some() && *s == best)
        .map(|&(p, _)| p)
        .collect();
    Ok(ShowdownResult {
        hands: revealed,
        winners,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquityResult {
    /// Pot share per player, in the order the ranges were given. Empty when
    /// no valid deal exists.
    pub equities: Vec<f64>,
    /// Deals evaluated.
    pub iterations: usize,
    pub exact: bool,
}

impl EquityResult {
    fn empty(exact: bool) -> EquityResult {
        EquityResult {
            equities: Vec::new(),
            iterations: 0,
            exact,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equities.is_empty()
    }
}

impl fmt::Display for EquityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "no valid deals");
        }
        let shares: Vec<String> = self
            .equities
            .iter()
            .enumerate()
            .map(|(i, e)| format!("P{} {:.1}%", i, e * 100.0))
            .collect();
        write!(
            f,
            "{} ({} {})",
            shares.join(" | "),
            self.iterations,
            if self.exact { "deals, exact" } else { "trials, sampled" }
        )
    }
}

/// Splits `weight` among the best hands on a complete board.
fn tally(board: &[Card], hands: &[Combo], weight: f64, wins: &mut [f64]) {
    let strengths: Vec<HandStrength> = hands.iter().map(|h| evaluate_combo(h, board)).collect();
    let Some(&best) = strengths.iter().max() else {
        return;
    };
    let winners = strengths.iter().filter(|&&s| s == best).count() as f64;
    for (i, &s) in strengths.iter().enumerate() {
        if s == best {
            wins[i] += weight / winners;
        }
    }
}

fn normalize(wins: Vec<f64>, iterations: usize, exact: bool) -> EquityResult {
    let total: f64 = wins.iter().sum();
    if total <= 0.0 {
        return EquityResult::empty(exact);
    }
    EquityResult {
        equities: wins.into_iter().map(|w| w / total).collect(),
        iterations,
        exact,
    }
}

/// Walks every combination of one combo per player with an explicit stack,
/// pruning any partial deal that reuses a card.
fn enumerate_exact(options: &[Vec<(Combo, u32)>], board: &[Card]) -> EquityResult {
    let players = options.len();
    let mut wins = vec![0.0; players];
    let mut iterations = 0usize;

    let mut cursor: Vec<usize> = vec![0];
    let mut chosen: Vec<Combo> = Vec::with_capacity(players);
    let mut weights: Vec<f64> = Vec::with_capacity(players);
    let mut used = cards_mask(board);

    while let Some(&idx) = cursor.last() {
        let depth = cursor.len() - 1;
        if idx == options[depth].len() {
            cursor.pop();
            if let Some(combo) = chosen.pop() {
                used &= !combo.mask();
                weights.pop();
            }
            if let Some(parent) = cursor.last_mut() {
                *parent += 1;
            }
            continue;
        }

        let (combo, weight) = options[depth][idx];
        if used & combo.mask() != 0 {
            cursor[depth] += 1;
            continue;
        }

        if depth + 1 == players {
            chosen.push(combo);
            let deal_weight = weights.iter().product::<f64>() * weight as f64;
            tally(board, &chosen, deal_weight, &mut wins);
            chosen.pop();
            iterations += 1;
            cursor[depth] += 1;
            continue;
        }

        chosen.push(combo);
        weights.push(weight as f64);
        used |= combo.mask();
        cursor.push(0);
    }

    normalize(wins, iterations, true)
}

fn sample_deal<R: Rng + ?Sized>(
    options: &[Vec<(Combo, u32)>],
    samplers: &[WeightedIndex<u32>],
    board_mask: u64,
    rng: &mut R,
) -> Option<(Vec<Combo>, u64)> {
    'attempt: for _ in 0..MAX_SAMPLE_RETRIES {
        let mut used = board_mask;
        let mut hands = Vec::with_capacity(options.len());
        for (opts, sampler) in options.iter().zip(samplers) {
            let (combo, _) = opts[sampler.sample(rng)];
            if used & combo.mask() != 0 {
                continue 'attempt;
            }
            used |= combo.mask();
            hands.push(combo);
        }
        return Some((hands, used));
    }
    None
}

fn monte_carlo<R: Rng + ?Sized>(
    options: &[Vec<(Combo, u32)>],
    board: &[Card],
    iterations: usize,
    rng: &mut R,
) -> EquityResult {
    let samplers = match options
        .iter()
        .map(|o| WeightedIndex::new(o.iter().map(|&(_, w)| w)))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(samplers) => samplers,
        Err(_) => return EquityResult::empty(false),
    };

    let board_mask = cards_mask(board);
    let missing = 5 - board.len();
    let mut wins = vec![0.0; options.len()];
    let mut full_board: Vec<Card> = Vec::with_capacity(5);

    for _ in 0..iterations {
        let Some((hands, used)) = sample_deal(options, &samplers, board_mask, rng) else {
            log::warn!(
                "abandoning equity run: {} consecutive conflicting samples",
                MAX_SAMPLE_RETRIES
            );
            return EquityResult::empty(false);
        };

        full_board.clear();
        full_board.extend_from_slice(board);
        if missing > 0 {
            let deck = Deck::excluding(used);
            full_board.extend(deck.cards.choose_multiple(rng, missing));
        }
        tally(&full_board, &hands, 1.0, &mut wins);
    }

    normalize(wins, iterations, false)
}

/// Equity of each player's range against the others on `board`.
pub fn showdown_equity<R: Rng + ?Sized>(
    ranges: &[HandRange],
    board: &[Card],
    hard_limit: u64,
    iterations: usize,
    rng: &mut R,
) -> EngineResult<EquityResult> {
    if ranges.is_empty() {
        return Err(EngineError::Validation("no ranges to evaluate".to_string()));
    }
    if board.len() > 5 || cards_mask(board).count_ones() as usize != board.len() {
        return Err(EngineError::InvalidBoardNotation(
            crate::cards::format_cards(board),
        ));
    }

    let options: Vec<Vec<(Combo, u32)>> = ranges.iter().map(|r| r.generate(board)).collect();
    let product = options
        .iter()
        .try_fold(1u64, |acc, o| acc.checked_mul(o.len() as u64));

    match product {
        Some(size) if board.len() == 5 && size <= hard_limit => {
            log::debug!("exact equity over {} combinations", size);
            Ok(enumerate_exact(&options, board))
        }
        _ => {
            log::debug!(
                "sampling equity: {} trials (combinations {:?}, limit {})",
                iterations,
                product,
                hard_limit
            );
            Ok(monte_carlo(&options, board, iterations, rng))
        }
    }
}

/// Share of the pot `hand` wins against `range`.
pub fn equity_of_hand_vs_range<R: Rng + ?Sized>(
    hand: Combo,
    range: &HandRange,
    board: &[Card],
    hard_limit: u64,
    iterations: usize,
    rng: &mut R,
) -> EngineResult<f64> {
    let ranges = [HandRange::single(hand), range.clone()];
    let result = showdown_equity(&ranges, board, hard_limit, iterations, rng)?;
    result.equities.first().copied().ok_or_else(|| {
        EngineError::IncompatibleRanges(format!("{} cannot be dealt against {}", hand, range))
    })
}

/// Equity of every combo of `range_a` against `range_b`. Combos that cannot
/// be dealt against `range_b` are left out.
pub fn equity_of_every_hand_in_range_vs_range<R: Rng + ?Sized>(
    range_a: &HandRange,
    range_b: &HandRange,
    board: &[Card],
    hard_limit: u64,
    iterations: usize,
    rng: &mut R,
) -> EngineResult<HashMap<Combo, f64>> {
    let mut out = HashMap::new();
    for (combo, _) in range_a.generate(board) {
        match equity_of_hand_vs_range(combo, range_b, board, hard_limit, iterations, rng) {
            Ok(equity) => {
                out.insert(combo, equity);
            }
            Err(EngineError::IncompatibleRanges(_)) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Deals one combo per range, consistent with the board and each other.
pub fn deal_hands<R: Rng + ?Sized>(
    ranges: &[HandRange],
    board: &[Card],
    rng: &mut R,
) -> EngineResult<Vec<Combo>> {
    let options: Vec<Vec<(Combo, u32)>> = ranges.iter().map(|r| r.generate(board)).collect();
    let samplers: Vec<WeightedIndex<u32>> = options
        .iter()
        .map(|o| WeightedIndex::new(o.iter().map(|&(_, w)| w)))
        .collect::<Result<_, _>>()
        .map_err(|_| EngineError::IncompatibleRanges("a range has no live combos".to_string()))?;

    let board_mask = cards_mask(board);
    'attempt: for _ in 0..MAX_DEAL_ATTEMPTS {
        let mut used = board_mask;
        let mut hands = Vec::with_capacity(options.len());
        for (opts, sampler) in options.iter().zip(&samplers) {
            let (combo, _) = opts[sampler.sample(rng)];
            if used & combo.mask() != 0 {
                continue 'attempt;
            }
            used |= combo.mask();
            hands.push(combo);
        }
        return Ok(hands);
    }
    Err(EngineError::IncompatibleRanges(format!(
        "no consistent deal after {} attempts",
        MAX_DEAL_ATTEMPTS
    )))
}
