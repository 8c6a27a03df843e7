use std::collections::HashMap;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::cards::{Card, Combo, Suit};
use crate::equity::EquityResult;
use crate::fold_equity::FoldEquityRecord;
use crate::game::{ActionOptions, ActionResult};
use crate::range::HandRange;

const RANGE_GRID_RANKS: [char; 13] = ['A', 'K', 'Q', 'J', 'T', '9', '8', '7', '6', '5', '4', '3', '2'];

/// Preflop class of a combo: `AA`, `AKs` or `AKo`.
pub fn class_label(combo: &Combo) -> String {
    let high = combo.high().rank.to_char();
    let low = combo.low().rank.to_char();
    if combo.is_pair() {
        format!("{}{}", high, low)
    } else if combo.is_suited() {
        format!("{}{}s", high, low)
    } else {
        format!("{}{}o", high, low)
    }
}

fn class_size(label: &str) -> usize {
    match label.chars().nth(2) {
        Some('s') => 4,
        Some('o') => 12,
        _ => 6,
    }
}

/// 13x13 grid of preflop classes. Complete classes are green, partial ones yellow.
pub fn range_grid(range: &HandRange, title: &str) -> String {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (combo, _) in range.generate(&[]) {
        *counts.entry(class_label(&combo)).or_insert(0) += 1;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![Cell::new("")];
    for &r in &RANGE_GRID_RANKS {
        header.push(Cell::new(r).set_alignment(CellAlignment::Center));
    }
    table.set_header(header);

    for (i, &r1) in RANGE_GRID_RANKS.iter().enumerate() {
        let mut row = vec![Cell::new(format!("{}", r1).bold().to_string())];
        for (j, &r2) in RANGE_GRID_RANKS.iter().enumerate() {
            let hand = if i == j {
                format!("{}{}", r1, r2)
            } else if i < j {
                format!("{}{}s", r1, r2)
            } else {
                format!("{}{}o", r2, r1)
            };

            let count = counts.get(&hand).copied().unwrap_or(0);
            let cell = if count == class_size(&hand) {
                Cell::new(hand.green().bold().to_string())
            } else if count > 0 {
                Cell::new(hand.yellow().to_string())
            } else {
                Cell::new(hand.dimmed().to_string())
            };
            row.push(cell.set_alignment(CellAlignment::Center));
        }
        table.add_row(row);
    }

    format!("  {}\n{}", title.bold(), table)
}

pub fn equity_bar(equity: f64, width: usize) -> String {
    let filled = ((equity * width as f64) as usize).min(width);
    let bar: String = "\u{2588}".repeat(filled) + &"\u{2591}".repeat(width - filled);
    let pct = format!("{:.1}%", equity * 100.0);

    if equity >= 0.6 {
        format!("{} {}", bar.green(), pct)
    } else if equity >= 0.4 {
        format!("{} {}", bar.yellow(), pct)
    } else {
        format!("{} {}", bar.red(), pct)
    }
}

pub fn board_display(cards: &[Card]) -> String {
    if cards.is_empty() {
        return "(no board)".dimmed().to_string();
    }
    cards
        .iter()
        .map(|card| {
            let text = card.pretty();
            match card.suit {
                Suit::Spades => text.white().to_string(),
                Suit::Hearts => text.red().to_string(),
                Suit::Diamonds => text.blue().to_string(),
                Suit::Clubs => text.green().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn equity_table(ranges: &[HandRange], result: &EquityResult) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Player"),
        Cell::new("Range"),
        Cell::new("Equity").set_alignment(CellAlignment::Right),
        Cell::new(""),
    ]);
    for (i, (range, equity)) in ranges.iter().zip(&result.equities).enumerate() {
        table.add_row(vec![
            Cell::new(format!("P{}", i).bold().to_string()),
            Cell::new(range.to_string()),
            Cell::new(format!("{:.2}%", equity * 100.0)).set_alignment(CellAlignment::Right),
            Cell::new(equity_bar(*equity, 20)),
        ]);
    }
    table.to_string()
}

pub fn options_table(options: &ActionOptions) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Option").set_alignment(CellAlignment::Left),
        Cell::new("Value").set_alignment(CellAlignment::Right),
    ]);
    table.add_row(vec![
        Cell::new(options.passive_label().bold().to_string()),
        Cell::new(format!("{}", options.call_cost)),
    ]);
    let raise = if options.can_raise {
        format!("{} .. {}", options.min_raise, options.max_raise)
    } else {
        "not allowed".dimmed().to_string()
    };
    table.add_row(vec![
        Cell::new(options.aggressive_label().bold().to_string()),
        Cell::new(raise),
    ]);
    table.to_string()
}

pub fn styled_action(action: &ActionResult) -> String {
    let text = action.to_string().to_uppercase();
    match action {
        ActionResult::RaiseTo(_) => text.red().bold().to_string(),
        ActionResult::Call => text.green().bold().to_string(),
        ActionResult::Fold => text.dimmed().bold().to_string(),
        ActionResult::Terminate => text.yellow().bold().to_string(),
    }
}

pub fn ev_cell(ev: f64) -> String {
    if ev >= 0.0 {
        format!("{:+.2}", ev).green().to_string()
    } else {
        format!("{:+.2}", ev).red().to_string()
    }
}

pub fn fold_equity_table(record: &FoldEquityRecord, limit: usize) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Combo"),
        Cell::new("Fold %").set_alignment(CellAlignment::Right),
        Cell::new("Immediate").set_alignment(CellAlignment::Right),
        Cell::new("Semibluff EV").set_alignment(CellAlignment::Right),
        Cell::new("Semibluff Eq").set_alignment(CellAlignment::Right),
    ]);

    let mut rows: Vec<_> = record.combos.iter().collect();
    rows.sort_by(|a, b| b.fold_ratio.total_cmp(&a.fold_ratio));
    for c in rows.into_iter().take(limit) {
        let (semibluff_ev, semibluff_equity) = if c.semibluff_ev.is_infinite() {
            ("inf".to_string(), "inf".to_string())
        } else {
            (
                format!("{:.2}", c.semibluff_ev),
                format!("{:.1}%", c.semibluff_equity * 100.0),
            )
        };
        table.add_row(vec![
            Cell::new(c.combo.to_string().bold().to_string()),
            Cell::new(format!("{:.1}%", c.fold_ratio * 100.0)).set_alignment(CellAlignment::Right),
            Cell::new(ev_cell(c.immediate_result)).set_alignment(CellAlignment::Right),
            Cell::new(semibluff_ev).set_alignment(CellAlignment::Right),
            Cell::new(semibluff_equity).set_alignment(CellAlignment::Right),
        ]);
    }
    table.to_string()
}

pub fn print_section(title: &str, content: &str) {
    println!("\n{}", title.cyan().bold());
    println!("  {}", content);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "Error:".red().bold(), msg);
}

pub fn print_warning(msg: &str) {
    eprintln!("{} {}", "Warning:".yellow().bold(), msg);
}
