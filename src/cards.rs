use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rank {
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Nine = 9,
    Ten = 10,
    Jack = 11,
    Queen = 12,
    King = 13,
    Ace = 14,
}

impl Rank {
    pub fn from_char(c: char) -> EngineResult<Rank> {
        match c {
            '2' => Ok(Rank::Two),
            '3' => Ok(Rank::Three),
            '4' => Ok(Rank::Four),
            '5' => Ok(Rank::Five),
            '6' => Ok(Rank::Six),
            '7' => Ok(Rank::Seven),
            '8' => Ok(Rank::Eight),
            '9' => Ok(Rank::Nine),
            'T' => Ok(Rank::Ten),
            'J' => Ok(Rank::Jack),
            'Q' => Ok(Rank::Queen),
            'K' => Ok(Rank::King),
            'A' => Ok(Rank::Ace),
            _ => Err(EngineError::InvalidRank(c)),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Rank::Two => '2',
            Rank::Three => '3',
            Rank::Four => '4',
            Rank::Five => '5',
            Rank::Six => '6',
            Rank::Seven => '7',
            Rank::Eight => '8',
            Rank::Nine => '9',
            Rank::Ten => 'T',
            Rank::Jack => 'J',
            Rank::Queen => 'Q',
            Rank::King => 'K',
            Rank::Ace => 'A',
        }
    }

    pub fn value(self) -> u8 {
        self as u8
    }

    /// 0-based position: Two = 0, Ace = 12.
    pub fn index(self) -> usize {
        self as usize - 2
    }

    pub fn from_index(idx: usize) -> Option<Rank> {
        ALL_RANKS.get(idx).copied()
    }
}

pub const ALL_RANKS: [Rank; 13] = [
    Rank::Two,
    Rank::Three,
    Rank::Four,
    Rank::Five,
    Rank::Six,
    Rank::Seven,
    Rank::Eight,
    Rank::Nine,
    Rank::Ten,
    Rank::Jack,
    Rank::Queen,
    Rank::King,
    Rank::Ace,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub fn from_char(c: char) -> EngineResult<Suit> {
        match c {
            'c' => Ok(Suit::Clubs),
            'd' => Ok(Suit::Diamonds),
            'h' => Ok(Suit::Hearts),
            's' => Ok(Suit::Spades),
            _ => Err(EngineError::InvalidSuit(c)),
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Suit::Clubs => 'c',
            Suit::Diamonds => 'd',
            Suit::Hearts => 'h',
            Suit::Spades => 's',
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Suit::Spades => "\u{2660}",
            Suit::Hearts => "\u{2665}",
            Suit::Diamonds => "\u{2666}",
            Suit::Clubs => "\u{2663}",
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

pub const ALL_SUITS: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

/// A playing card. Ordered by rank, then suit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Card {
        Card { rank, suit }
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    /// Dense index in 0..52, rank-major.
    pub fn index(&self) -> usize {
        self.rank.index() * 4 + self.suit.index()
    }

    pub fn mask(&self) -> u64 {
        1u64 << self.index()
    }

    pub fn pretty(&self) -> String {
        format!("{}{}", self.rank.to_char(), self.suit.symbol())
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.to_char(), self.suit.to_char())
    }
}

impl FromStr for Card {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Card> {
        parse_card(s)
    }
}

impl TryFrom<String> for Card {
    type Error = EngineError;

    fn try_from(s: String) -> EngineResult<Card> {
        parse_card(&s)
    }
}

impl From<Card> for String {
    fn from(card: Card) -> String {
        card.to_string()
    }
}

/// Two distinct hole cards. Stored high card first so equal combos compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Combo {
    hi: Card,
    lo: Card,
}

impl Combo {
    pub fn new(a: Card, b: Card) -> EngineResult<Combo> {
        if a == b {
            return Err(EngineError::DuplicateCard(a.to_string()));
        }
        let (hi, lo) = if a > b { (a, b) } else { (b, a) };
        Ok(Combo { hi, lo })
    }

    /// Caller guarantees `a != b`.
    pub(crate) fn from_distinct(a: Card, b: Card) -> Combo {
        debug_assert!(a != b);
        if a > b {
            Combo { hi: a, lo: b }
        } else {
            Combo { hi: b, lo: a }
        }
    }

    pub fn high(&self) -> Card {
        self.hi
    }

    pub fn low(&self) -> Card {
        self.lo
    }

    pub fn cards(&self) -> [Card; 2] {
        [self.hi, self.lo]
    }

    pub fn mask(&self) -> u64 {
        self.hi.mask() | self.lo.mask()
    }

    pub fn contains(&self, card: Card) -> bool {
        self.hi == card || self.lo == card
    }

    pub fn conflicts(&self, other: &Combo) -> bool {
        self.mask() & other.mask() != 0
    }

    pub fn is_pair(&self) -> bool {
        self.hi.rank == self.lo.rank
    }

    pub fn is_suited(&self) -> bool {
        self.hi.suit == self.lo.suit
    }
}

impl fmt::Display for Combo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.hi, self.lo)
    }
}

impl FromStr for Combo {
    type Err = EngineError;

    fn from_str(s: &str) -> EngineResult<Combo> {
        parse_combo(s)
    }
}

impl TryFrom<String> for Combo {
    type Error = EngineError;

    fn try_from(s: String) -> EngineResult<Combo> {
        parse_combo(&s)
    }
}

impl From<Combo> for String {
    fn from(combo: Combo) -> String {
        combo.to_string()
    }
}

/// Bitmask of a set of cards.
pub fn cards_mask(cards: &[Card]) -> u64 {
    cards.iter().fold(0u64, |acc, c| acc | c.mask())
}

pub fn full_deck() -> Vec<Card> {
    ALL_RANKS
        .iter()
        .flat_map(|&r| ALL_SUITS.iter().map(move |&s| Card::new(r, s)))
        .collect()
}

pub struct Deck {
    pub cards: Vec<Card>,
}

impl Deck {
    pub fn new(exclude: &[Card]) -> Deck {
        Deck::excluding(cards_mask(exclude))
    }

    /// Every card not set in `dead`.
    pub fn excluding(dead: u64) -> Deck {
        let cards = full_deck()
            .into_iter()
            .filter(|c| dead & c.mask() == 0)
            .collect();
        Deck { cards }
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) -> &mut Self {
        self.cards.shuffle(rng);
        self
    }

    pub fn deal(&mut self, n: usize) -> EngineResult<Vec<Card>> {
        if n > self.cards.len() {
            return Err(EngineError::NotEnoughCards {
                need: n,
                got: self.cards.len(),
            });
        }
        let dealt: Vec<Card> = self.cards.drain(..n).collect();
        Ok(dealt)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

pub fn parse_card(notation: &str) -> EngineResult<Card> {
    let notation = notation.trim();
    let chars: Vec<char> = notation.chars().collect();
    if chars.len() != 2 {
        return Err(EngineError::InvalidCardNotation(notation.to_string()));
    }
    let rank = Rank::from_char(chars[0])?;
    let suit = Suit::from_char(chars[1])?;
    Ok(Card::new(rank, suit))
}

/// Parses concatenated mnemonics ("AdKd2c"); fails on repeated cards.
pub fn parse_board(notation: &str) -> EngineResult<Vec<Card>> {
    let notation = notation.trim().replace([' ', ','], "");
    let chars: Vec<char> = notation.chars().collect();
    if chars.len() % 2 != 0 || chars.len() > 10 {
        return Err(EngineError::InvalidBoardNotation(notation));
    }
    let mut cards = Vec::with_capacity(chars.len() / 2);
    let mut seen = 0u64;
    for pair in chars.chunks(2) {
        let s: String = pair.iter().collect();
        let card = parse_card(&s)?;
        if seen & card.mask() != 0 {
            return Err(EngineError::DuplicateCard(card.to_string()));
        }
        seen |= card.mask();
        cards.push(card);
    }
    Ok(cards)
}

pub fn parse_combo(notation: &str) -> EngineResult<Combo> {
    let notation = notation.trim();
    if notation.len() != 4 || !notation.is_ascii() {
        return Err(EngineError::InvalidCardNotation(notation.to_string()));
    }
    Combo::new(parse_card(&notation[..2])?, parse_card(&notation[2..])?)
}

pub fn format_cards(cards: &[Card]) -> String {
    cards.iter().map(|c| c.to_string()).collect()
}
