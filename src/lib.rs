pub mod cards;
pub mod cli;
pub mod config;
pub mod display;
pub mod equity;
pub mod error;
pub mod fold_equity;
pub mod game;
pub mod game_tree;
pub mod hand_evaluator;
pub mod history;
pub mod range;
pub mod resolution;
