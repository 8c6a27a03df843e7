use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};

use crate::cards::{parse_board, parse_combo, Combo};
use crate::config::EngineConfig;
use crate::display::{
    board_display, equity_table, ev_cell, fold_equity_table, options_table, print_error,
    print_section, print_warning, range_grid, styled_action,
};
use crate::equity::{showdown, showdown_equity};
use crate::error::{EngineError, EngineResult};
use crate::fold_equity::analyze_fold_equity;
use crate::game::{GameState, PlayerId};
use crate::game_tree::{GameTree, NodeAction};
use crate::history::HandHistory;
use crate::range::HandRange;
use crate::resolution::{resolve_action, ActionRangeTriple};

#[derive(Parser)]
#[command(name = "rev", version, about = "Range-based poker equity, action resolution and EV.")]
struct Cli {
    /// Engine config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Seed for every random draw
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Largest combination count enumerated exactly
    #[arg(long, global = true)]
    hard_limit: Option<u64>,
    /// Monte Carlo trials per equity query
    #[arg(short = 'n', long, global = true)]
    iterations: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Canonical form, combo count and grid of a range
    Range {
        /// Range notation (e.g. "QQ+,AKs(2),76s")
        notation: String,
        /// Board cards removed from the count (e.g. AsKd5c)
        #[arg(short, long)]
        board: Option<String>,
        /// Range to take out (same weights only)
        #[arg(long)]
        subtract: Option<String>,
    },
    /// Range vs range showdown equity
    Equity {
        /// Two or more ranges, one per player
        #[arg(required = true, num_args = 2..)]
        ranges: Vec<String>,
        /// Board cards (e.g. AsKd5c)
        #[arg(short, long)]
        board: Option<String>,
    },
    /// Show down concrete hands on a complete board
    Showdown {
        /// Five board cards
        board: String,
        /// Hole cards in showdown order (e.g. AhAc KhKc)
        #[arg(required = true)]
        hands: Vec<String>,
    },
    /// Legal options for a player in a saved game state
    Options {
        /// Game state file (JSON)
        state: PathBuf,
        /// Player to act (defaults to whoever is next)
        #[arg(short, long)]
        player: Option<PlayerId>,
    },
    /// Resolve a fold / passive / aggressive range split into one action
    Resolve {
        /// Game state file (JSON)
        state: PathBuf,
        #[arg(short, long)]
        player: Option<PlayerId>,
        #[arg(long, default_value = "nothing")]
        fold: String,
        #[arg(long, default_value = "nothing")]
        passive: String,
        #[arg(long, default_value = "nothing")]
        aggressive: String,
        /// Raise total for the aggressive range
        #[arg(long)]
        raise_to: Option<u64>,
    },
    /// Build (and merge) game trees from finished hands and print combo EVs
    Tree {
        /// Hand history files (JSON) sharing one lineage
        #[arg(required = true)]
        histories: Vec<PathBuf>,
        /// Player whose combos are evaluated
        #[arg(short, long, default_value = "0")]
        player: PlayerId,
        /// Evaluate one combo instead of the whole range
        #[arg(long)]
        combo: Option<String>,
    },
    /// Fold equity of every bet in a finished hand
    FoldEquity {
        /// Hand history file (JSON)
        history: PathBuf,
        /// Rows shown per bet
        #[arg(long, default_value = "20")]
        top: usize,
    },
}

pub fn run() {
    let cli = Cli::parse();
    dispatch(cli);
}

pub fn run_with_args(args: Vec<String>) {
    let cli = Cli::parse_from(args);
    dispatch(cli);
}

fn engine_config(cli: &Cli) -> EngineResult<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(limit) = cli.hard_limit {
        config.hard_limit = limit;
    }
    if let Some(n) = cli.iterations {
        config.iterations = n;
    }
    Ok(config)
}

fn dispatch(cli: Cli) {
    let result = engine_config(&cli).and_then(|config| match cli.command {
        Commands::Range {
            notation,
            board,
            subtract,
        } => cmd_range(notation, board, subtract),
        Commands::Equity { ranges, board } => cmd_equity(&config, ranges, board),
        Commands::Showdown { board, hands } => cmd_showdown(board, hands),
        Commands::Options { state, player } => cmd_options(state, player),
        Commands::Resolve {
            state,
            player,
            fold,
            passive,
            aggressive,
            raise_to,
        } => cmd_resolve(&config, state, player, &fold, &passive, &aggressive, raise_to),
        Commands::Tree {
            histories,
            player,
            combo,
        } => cmd_tree(&config, histories, player, combo),
        Commands::FoldEquity { history, top } => cmd_fold_equity(history, top),
    });
    if let Err(e) = result {
        print_error(&e.to_string());
        std::process::exit(1);
    }
}

fn optional_board(board: Option<String>) -> EngineResult<Vec<crate::cards::Card>> {
    match board {
        Some(b) => parse_board(&b),
        None => Ok(Vec::new()),
    }
}

fn cmd_range(notation: String, board: Option<String>, subtract: Option<String>) -> EngineResult<()> {
    let board = optional_board(board)?;
    let mut range = HandRange::parse(&notation)?;
    range.validate()?;
    if let Some(other) = subtract {
        range = range.subtract(&HandRange::parse(&other)?)?;
    }

    let combos = range.combo_count(&board);
    println!();
    println!("  {} {}", "Canonical:".bold(), range.to_string().green());
    if !board.is_empty() {
        println!("  {} {}", "Board:".bold(), board_display(&board));
    }
    println!(
        "  {} {} ({:.1}% of hands)",
        "Combos:".bold(),
        combos,
        combos as f64 / crate::range::TOTAL_COMBOS as f64 * 100.0
    );
    println!();
    println!("{}", range_grid(&range, &notation));
    println!();
    Ok(())
}

fn cmd_equity(config: &EngineConfig, ranges: Vec<String>, board: Option<String>) -> EngineResult<()> {
    let board = optional_board(board)?;
    let ranges: Vec<HandRange> = ranges
        .iter()
        .map(|r| HandRange::parse(r))
        .collect::<EngineResult<_>>()?;

    let mut rng = config.rng();
    let result = showdown_equity(&ranges, &board, config.hard_limit, config.iterations, &mut rng)?;
    if result.is_empty() {
        return Err(EngineError::IncompatibleRanges(
            "no valid deal exists for these ranges".to_string(),
        ));
    }

    println!();
    println!("  {} {}", "Board:".bold(), board_display(&board));
    let method = if result.exact {
        format!("exact over {} deals", result.iterations)
    } else {
        format!("{} sampled trials", result.iterations)
    };
    println!("  {} {}\n", "Method:".bold(), method);
    println!("{}", equity_table(&ranges, &result));
    println!();
    Ok(())
}

fn cmd_showdown(board: String, hands: Vec<String>) -> EngineResult<()> {
    let board = parse_board(&board)?;
    let hands: Vec<(PlayerId, Combo)> = hands
        .iter()
        .enumerate()
        .map(|(i, h)| parse_combo(h).map(|c| (i, c)))
        .collect::<EngineResult<_>>()?;

    let mut seen = crate::cards::cards_mask(&board);
    for (_, combo) in &hands {
        if seen & combo.mask() != 0 {
            return Err(EngineError::DuplicateCard(combo.to_string()));
        }
        seen |= combo.mask();
    }
    let result = showdown(&board, &hands)?;

    println!();
    println!("  {} {}\n", "Board:".bold(), board_display(&board));
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Player"),
        Cell::new("Hand"),
        Cell::new("Shows"),
        Cell::new("Result").set_alignment(CellAlignment::Center),
    ]);
    for ((player, combo), (_, strength)) in hands.iter().zip(&result.hands) {
        let shows = match strength {
            Some(s) => s.to_string(),
            None => "mucked".dimmed().to_string(),
        };
        let outcome = if result.winners.contains(player) {
            "WIN".green().bold().to_string()
        } else {
            "".to_string()
        };
        table.add_row(vec![
            Cell::new(format!("P{}", player).bold().to_string()),
            Cell::new(combo.to_string()),
            Cell::new(shows),
            Cell::new(outcome).set_alignment(CellAlignment::Center),
        ]);
    }
    println!("{}", table);
    println!();
    Ok(())
}

fn load_state(path: &PathBuf) -> EngineResult<GameState> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn actor_of(state: &GameState, player: Option<PlayerId>) -> EngineResult<PlayerId> {
    player
        .or(state.to_act)
        .ok_or_else(|| EngineError::Validation("nobody is left to act".to_string()))
}

fn cmd_options(state: PathBuf, player: Option<PlayerId>) -> EngineResult<()> {
    let state = load_state(&state)?;
    let actor = actor_of(&state, player)?;
    let options = state.current_options(actor)?;

    println!();
    println!(
        "  {} P{} on the {} ({} in the pot)",
        "To act:".bold(),
        actor,
        state.street(),
        state.pot()
    );
    println!("  {} {}\n", "Board:".bold(), board_display(&state.board));
    println!("{}", options_table(&options));
    println!();
    Ok(())
}

fn cmd_resolve(
    config: &EngineConfig,
    state: PathBuf,
    player: Option<PlayerId>,
    fold: &str,
    passive: &str,
    aggressive: &str,
    raise_to: Option<u64>,
) -> EngineResult<()> {
    let state = load_state(&state)?;
    let actor = actor_of(&state, player)?;
    let options = state.current_options(actor)?;
    let triple = ActionRangeTriple::new(
        HandRange::parse(fold)?,
        HandRange::parse(passive)?,
        HandRange::parse(aggressive)?,
        raise_to,
    );

    let mut rng = config.rng();
    let resolution = resolve_action(&state, actor, &triple, &options, &mut rng)?;

    println!();
    println!("  {} P{}", "Player:".bold(), actor);
    println!("  {} {}", "Action:".bold(), styled_action(&resolution.action));
    if let Some(holding) = resolution.holding {
        println!("  {} {}", "Holding:".bold(), holding);
    }
    println!("  {} {:.4}", "Line weight:".bold(), resolution.current_factor);
    println!();
    Ok(())
}

fn describe(action: &NodeAction) -> String {
    match action {
        NodeAction::Root => "root".to_string(),
        NodeAction::Act { player, action } => format!("P{} {}", player, styled_action(action)),
        NodeAction::Showdown => "showdown".cyan().to_string(),
    }
}

fn cmd_tree(
    config: &EngineConfig,
    histories: Vec<PathBuf>,
    player: PlayerId,
    combo: Option<String>,
) -> EngineResult<()> {
    let mut trees = Vec::with_capacity(histories.len());
    for path in &histories {
        let history = HandHistory::from_json_file(path)?;
        let tree = GameTree::build(&history)?;
        log::info!("built {} nodes from {}", tree.len(), path.display());
        trees.push(tree);
    }
    let mut tree = GameTree::merge(trees)?;
    log::info!("merged {} hands into {} nodes", histories.len(), tree.len());

    println!();
    println!(
        "  {} {} nodes, {} leaves, line weight {:.4}",
        "Tree:".bold(),
        tree.len(),
        tree.leaves().len(),
        tree.root().weight
    );
    for leaf in tree.leaves() {
        let line: Vec<String> = tree.line(leaf).iter().map(describe).collect();
        println!("    {}  (pot {})", line.join(" > "), tree.node(leaf).pot());
    }

    let mut rng = config.rng();
    let results = match combo {
        Some(text) => {
            let combo = parse_combo(&text)?;
            vec![(combo, tree.combo_ev(combo, player, config, &mut rng))]
        }
        None => tree.range_ev(player, config, &mut rng),
    };

    let mut evs = Vec::new();
    let mut skipped = 0usize;
    let mut blocked = 0usize;
    for (combo, result) in results {
        match result {
            Ok(ev) => evs.push((combo, ev)),
            Err(EngineError::InvalidComboForTree { combo }) => {
                log::debug!("{} is not in any branch", combo);
                skipped += 1;
            }
            Err(EngineError::IncompatibleRanges(reason)) => {
                log::debug!("{} has no EV: {}", combo, reason);
                blocked += 1;
            }
            Err(e) => return Err(e),
        }
    }
    evs.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Combo"),
        Cell::new("EV").set_alignment(CellAlignment::Right),
    ]);
    for (combo, ev) in &evs {
        table.add_row(vec![
            Cell::new(combo.to_string().bold().to_string()),
            Cell::new(ev_cell(*ev)).set_alignment(CellAlignment::Right),
        ]);
    }
    print_section(&format!("EV for P{}", player), &format!("{} combos", evs.len()));
    println!("{}", table);
    if skipped > 0 {
        print_warning(&format!("{} combos are not covered by the tree", skipped));
    }
    if blocked > 0 {
        print_warning(&format!("{} combos are blocked by the board", blocked));
    }
    println!();
    Ok(())
}

fn cmd_fold_equity(history: PathBuf, top: usize) -> EngineResult<()> {
    let history = HandHistory::from_json_file(&history)?;
    let records = analyze_fold_equity(&history)?;
    if records.is_empty() {
        println!("\n  No completed bets to analyze.\n");
        return Ok(());
    }

    for record in &records {
        log::info!(
            "P{} bet to {} on the {} against {:?}",
            record.bettor,
            record.raise_total,
            record.street,
            record.folders
        );
        print_section(
            &format!("P{} bets to {} on the {}", record.bettor, record.raise_total, record.street),
            &format!(
                "pot {} | bet costs {} | to call {} | pot if called {} | mean fold {:.1}%",
                record.pot_before_bet,
                record.bet_cost,
                record.cost_to_call,
                record.pot_if_called,
                record.mean_fold_ratio() * 100.0
            ),
        );
        println!("{}", fold_equity_table(record, top));
    }
    println!();
    Ok(())
}
