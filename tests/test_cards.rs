use std::collections::HashSet;

use range_ev::cards::*;
use range_ev::error::EngineError;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn c(notation: &str) -> Card {
    parse_card(notation).unwrap()
}

#[test]
fn test_card_creation() {
    let card = Card::new(Rank::Ace, Suit::Spades);
    assert_eq!(card.rank, Rank::Ace);
    assert_eq!(card.suit, Suit::Spades);
    assert_eq!(card.value(), 14);
}

#[test]
fn test_invalid_rank_and_suit() {
    assert!(matches!(Rank::from_char('X'), Err(EngineError::InvalidRank('X'))));
    assert!(matches!(Suit::from_char('x'), Err(EngineError::InvalidSuit('x'))));
}

#[test]
fn test_card_str() {
    assert_eq!(Card::new(Rank::King, Suit::Diamonds).to_string(), "Kd");
    assert_eq!(Card::new(Rank::Ace, Suit::Spades).pretty(), "A\u{2660}");
}

#[test]
fn test_card_ordering_is_rank_then_suit() {
    assert!(c("2s") < c("Ac"));
    assert!(c("Ac") < c("Ad"));
    assert!(c("Kh") > c("Qs"));
}

#[test]
fn test_card_index_is_dense() {
    let indices: HashSet<usize> = full_deck().iter().map(|card| card.index()).collect();
    assert_eq!(indices.len(), 52);
    assert!(indices.iter().all(|&i| i < 52));
}

#[test]
fn test_parse_board() {
    let board = parse_board("As Kd Qh 5c 2s").unwrap();
    assert_eq!(board.len(), 5);
    assert_eq!(board[0], c("As"));
    assert_eq!(parse_board("").unwrap().len(), 0);
}

#[test]
fn test_parse_board_rejects_duplicates_and_odd_length() {
    assert!(matches!(parse_board("AsAs"), Err(EngineError::DuplicateCard(_))));
    assert!(parse_board("AsK").is_err());
    assert!(parse_board("AsKdQh5c2s3h").is_err());
}

#[test]
fn test_combo_is_unordered() {
    let a = Combo::new(c("Kh"), c("Ah")).unwrap();
    let b = Combo::new(c("Ah"), c("Kh")).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.high(), c("Ah"));
    assert_eq!(a.to_string(), "AhKh");
    assert!(a.is_suited());
    assert!(!a.is_pair());
}

#[test]
fn test_combo_rejects_same_card() {
    assert!(Combo::new(c("Ah"), c("Ah")).is_err());
    assert!(parse_combo("AhAh").is_err());
}

#[test]
fn test_combo_conflicts() {
    let a = parse_combo("AhKh").unwrap();
    let b = parse_combo("AhQd").unwrap();
    let d = parse_combo("QsJs").unwrap();
    assert!(a.conflicts(&b));
    assert!(!a.conflicts(&d));
    assert!(a.contains(c("Kh")));
    assert_eq!(a.mask().count_ones(), 2);
}

#[test]
fn test_combo_serde_as_string() {
    let combo = parse_combo("TdTc").unwrap();
    let json = serde_json::to_string(&combo).unwrap();
    assert_eq!(json, "\"TdTc\"");
    let back: Combo = serde_json::from_str(&json).unwrap();
    assert_eq!(back, combo);
    assert!(serde_json::from_str::<Card>("\"Zz\"").is_err());
}

#[test]
fn test_deck_exclude_and_deal() {
    let mut deck = Deck::new(&[c("As"), c("Kh")]);
    assert_eq!(deck.len(), 50);
    let dealt = deck.deal(5).unwrap();
    assert_eq!(dealt.len(), 5);
    assert_eq!(deck.len(), 45);
    assert!(deck.deal(46).is_err());
}

#[test]
fn test_deck_shuffle_is_seeded() {
    let mut rng_a = StdRng::seed_from_u64(7);
    let mut rng_b = StdRng::seed_from_u64(7);
    let mut a = Deck::new(&[]);
    let mut b = Deck::new(&[]);
    a.shuffle(&mut rng_a);
    b.shuffle(&mut rng_b);
    assert_eq!(a.cards, b.cards);
    let set: HashSet<Card> = a.cards.iter().copied().collect();
    assert_eq!(set.len(), 52);
}
