//! Best-five-card evaluation for 5 to 7 cards.
//!
//! Strength is packed into a single `u32` (category in the high bits, up to
//! five 4-bit kicker values below it) so comparing two hands is an integer
//! compare.

use std::fmt;

use crate::cards::{cards_mask, Card, Combo};
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HandCategory {
    HighCard = 0,
    OnePair = 1,
    TwoPair = 2,
    ThreeOfAKind = 3,
    Straight = 4,
    Flush = 5,
    FullHouse = 6,
    FourOfAKind = 7,
    StraightFlush = 8,
    RoyalFlush = 9,
}

impl HandCategory {
    fn from_bits(bits: u32) -> HandCategory {
        match bits {
            0 => HandCategory::HighCard,
            1 => HandCategory::OnePair,
            2 => HandCategory::TwoPair,
            3 => HandCategory::ThreeOfAKind,
            4 => HandCategory::Straight,
            5 => HandCategory::Flush,
            6 => HandCategory::FullHouse,
            7 => HandCategory::FourOfAKind,
            8 => HandCategory::StraightFlush,
            _ => HandCategory::RoyalFlush,
        }
    }
}

impl fmt::Display for HandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandCategory::HighCard => write!(f, "High Card"),
            HandCategory::OnePair => write!(f, "One Pair"),
            HandCategory::TwoPair => write!(f, "Two Pair"),
            HandCategory::ThreeOfAKind => write!(f, "Three of a Kind"),
            HandCategory::Straight => write!(f, "Straight"),
            HandCategory::Flush => write!(f, "Flush"),
            HandCategory::FullHouse => write!(f, "Full House"),
            HandCategory::FourOfAKind => write!(f, "Four of a Kind"),
            HandCategory::StraightFlush => write!(f, "Straight Flush"),
            HandCategory::RoyalFlush => write!(f, "Royal Flush"),
        }
    }
}

/// Totally ordered hand strength; higher wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandStrength(u32);

impl HandStrength {
    fn pack(category: HandCategory, kickers: &[u8]) -> HandStrength {
        let mut value = (category as u32) << 20;
        for (i, &k) in kickers.iter().take(5).enumerate() {
            value |= (k as u32) << (16 - 4 * i);
        }
        HandStrength(value)
    }

    pub fn category(&self) -> HandCategory {
        HandCategory::from_bits(self.0 >> 20)
    }

    /// Rank values (2..=14) that break ties within the category, most significant first.
    pub fn kickers(&self) -> Vec<u8> {
        (0..5)
            .map(|i| ((self.0 >> (16 - 4 * i)) & 0xF) as u8)
            .take_while(|&k| k != 0)
            .collect()
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for HandStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category())
    }
}

/// Rank bits are indexed Two = 0 .. Ace = 12.
fn straight_high(bits: u16) -> Option<u8> {
    for top in (4..=12u16).rev() {
        let run = 0x1F << (top - 4);
        if bits & run == run {
            return Some(top as u8 + 2);
        }
    }
    let wheel = (1 << 12) | 0xF;
    if bits & wheel == wheel {
        return Some(5);
    }
    None
}

/// Highest `n` set ranks in `bits`, as values 2..=14.
fn top_ranks(bits: u16, n: usize) -> Vec<u8> {
    (0..13u8)
        .rev()
        .filter(|&i| bits & (1 << i) != 0)
        .take(n)
        .map(|i| i + 2)
        .collect()
}

fn strength_of<'a>(cards: impl Iterator<Item = &'a Card>) -> HandStrength {
    let mut counts = [0u8; 13];
    let mut suits = [0u16; 4];
    for card in cards {
        counts[card.rank.index()] += 1;
        suits[card.suit.index()] |= 1 << card.rank.index();
    }

    if let Some(&flush_bits) = suits.iter().find(|s| s.count_ones() >= 5) {
        if let Some(high) = straight_high(flush_bits) {
            let category = if high == 14 {
                HandCategory::RoyalFlush
            } else {
                HandCategory::StraightFlush
            };
            return HandStrength::pack(category, &[high]);
        }
    }

    let mut present = 0u16;
    let mut quads = Vec::new();
    let mut trips = Vec::new();
    let mut pairs = Vec::new();
    for idx in (0..13usize).rev() {
        let count = counts[idx];
        if count > 0 {
            present |= 1 << idx;
        }
        let value = idx as u8 + 2;
        match count {
            4 => quads.push(value),
            3 => trips.push(value),
            2 => pairs.push(value),
            _ => {}
        }
    }
    let without = |values: &[u8]| {
        values
            .iter()
            .fold(present, |bits, &v| bits & !(1u16 << (v - 2)))
    };

    if let Some(&quad) = quads.first() {
        let kick = top_ranks(without(&[quad]), 1);
        let mut kickers = vec![quad];
        kickers.extend(kick);
        return HandStrength::pack(HandCategory::FourOfAKind, &kickers);
    }

    if let Some(&trip) = trips.first() {
        let pair = trips
            .iter()
            .skip(1)
            .chain(pairs.iter())
            .copied()
            .max();
        if let Some(pair) = pair {
            return HandStrength::pack(HandCategory::FullHouse, &[trip, pair]);
        }
    }

    if let Some(&flush_bits) = suits.iter().find(|s| s.count_ones() >= 5) {
        return HandStrength::pack(HandCategory::Flush, &top_ranks(flush_bits, 5));
    }

    if let Some(high) = straight_high(present) {
        return HandStrength::pack(HandCategory::Straight, &[high]);
    }

    if let Some(&trip) = trips.first() {
        let mut kickers = vec![trip];
        kickers.extend(top_ranks(without(&[trip]), 2));
        return HandStrength::pack(HandCategory::ThreeOfAKind, &kickers);
    }

    if pairs.len() >= 2 {
        let (high, low) = (pairs[0], pairs[1]);
        let mut kickers = vec![high, low];
        kickers.extend(top_ranks(without(&[high, low]), 1));
        return HandStrength::pack(HandCategory::TwoPair, &kickers);
    }

    if let Some(&pair) = pairs.first() {
        let mut kickers = vec![pair];
        kickers.extend(top_ranks(without(&[pair]), 3));
        return HandStrength::pack(HandCategory::OnePair, &kickers);
    }

    HandStrength::pack(HandCategory::HighCard, &top_ranks(present, 5))
}

/// Evaluates the best five-card hand among 5 to 7 distinct cards.
pub fn evaluate(cards: &[Card]) -> EngineResult<HandStrength> {
    if cards.len() < 5 {
        return Err(EngineError::NotEnoughCards {
            need: 5,
            got: cards.len(),
        });
    }
    if cards.len() > 7 {
        return Err(EngineError::InvalidBoardNotation(format!(
            "cannot evaluate {} cards",
            cards.len()
        )));
    }
    if cards_mask(cards).count_ones() as usize != cards.len() {
        return Err(EngineError::DuplicateCard(crate::cards::format_cards(cards)));
    }
    Ok(strength_of(cards.iter()))
}

pub fn evaluate_hand(hole_cards: &[Card], board: &[Card]) -> EngineResult<HandStrength> {
    let mut all_cards: Vec<Card> = Vec::with_capacity(hole_cards.len() + board.len());
    all_cards.extend_from_slice(hole_cards);
    all_cards.extend_from_slice(board);
    evaluate(&all_cards)
}

/// Hot-path variant for callers that already guarantee a complete, conflict-free board.
pub(crate) fn evaluate_combo(combo: &Combo, board: &[Card]) -> HandStrength {
    let hole = combo.cards();
    strength_of(hole.iter().chain(board.iter()))
}
