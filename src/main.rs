use anyhow::Context;
use clap::Parser;
use opening_trainer::book::load_book;
use opening_trainer::core::logging::init_tracing;
use opening_trainer::core::settings_persistence::{load_settings, save_settings, settings_path};
use opening_trainer::tree::CachedLookup;
use opening_trainer::{
    BookLookup, MoveStore, Orientation, SessionContext, SessionController, SessionStore,
    TerminalBoard, TrainerMode, TurnOutcome,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

/// Train chess openings against a book from the terminal
#[derive(Parser, Debug)]
#[command(name = "trainer", version)]
struct Args {
    /// Opening book (JSON lines or nested nodes)
    #[arg(long)]
    book: Option<PathBuf>,

    /// `learn` or `free`; defaults to the saved setting
    #[arg(long)]
    mode: Option<TrainerMode>,

    /// `white` or `black`; defaults to the saved setting
    #[arg(long)]
    orientation: Option<Orientation>,

    /// Settings file, instead of the one in the user config dir
    #[arg(long)]
    config: Option<PathBuf>,
}

const HELP: &str = "moves: e2e4 or e2 e4 | reset | flip | mode learn|free | line | save | quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = args.config.unwrap_or_else(settings_path);
    let mut settings = load_settings(&config);
    init_tracing(&settings.log_filter);

    let tree = match &args.book {
        Some(path) => load_book(path)
            .with_context(|| format!("failed to load opening book {}", path.display()))?,
        None => {
            info!("[BOOK] No book given, starting from an empty tree");
            MoveStore::new()
        }
    }
    .into_shared();

    let mode = args.mode.unwrap_or(settings.mode);
    let orientation = args.orientation.unwrap_or(settings.orientation);
    let store = Arc::new(SessionStore::new(orientation, mode));
    store.subscribe(|state| {
        let line: Vec<&str> = state.line.iter().map(|node| node.san.as_str()).collect();
        println!("line: {}", line.join(" "));
    });

    let lookup = Arc::new(CachedLookup::new(BookLookup::new(Arc::clone(&tree))));
    let controller = SessionController::new(SessionContext {
        tree,
        lookup,
        store,
        view: Arc::new(TerminalBoard),
        delays: settings.delays,
    });

    println!("{} mode. {}", mode, HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(input) = lines.next_line().await? {
        let words: Vec<&str> = input.split_whitespace().collect();
        match words.as_slice() {
            [] => continue,
            ["quit"] | ["exit"] => break,
            ["reset"] => controller.reset_session(),
            ["flip"] => {
                let flipped = match controller.store().orientation() {
                    Orientation::White => Orientation::Black,
                    Orientation::Black => Orientation::White,
                };
                controller.set_orientation(flipped);
            }
            ["mode", name] => match name.parse::<TrainerMode>() {
                Ok(mode) => {
                    controller.set_mode(mode);
                    println!("{} mode", mode);
                }
                Err(e) => println!("{}", e),
            },
            ["line"] => {
                let line: Vec<String> =
                    controller.store().line().into_iter().map(|node| node.san).collect();
                println!("line: {}", line.join(" "));
            }
            ["save"] => {
                settings.mode = controller.store().mode();
                settings.orientation = controller.store().orientation();
                match save_settings(&settings, &config) {
                    Ok(()) => println!("saved to {}", config.display()),
                    Err(e) => warn!("[SETTINGS] Failed to save settings: {}", e),
                }
            }
            [from, to] => play(&controller, from, to).await,
            [word] if word.len() == 4 && word.is_char_boundary(2) => {
                let (from, to) = word.split_at(2);
                play(&controller, from, to).await;
            }
            _ => println!("{}", HELP),
        }
    }

    controller.wait_idle().await;
    Ok(())
}

async fn play(controller: &SessionController, from: &str, to: &str) {
    let outcome = controller.drop_piece(from, to).await;
    match &outcome {
        TurnOutcome::Rejected => println!("{}{} rejected", from, to),
        TurnOutcome::Recorded { san, known: true } => println!("{} (book)", san),
        TurnOutcome::Recorded { san, known: false } => println!("{} (new)", san),
        TurnOutcome::Continue { san, reply } => println!("{} correct, reply {}", san, reply),
        TurnOutcome::Incorrect { san } => println!("{} is not in the book", san),
        TurnOutcome::End { san } => println!("{} ends the line, starting over", san),
        TurnOutcome::Aborted { san } => println!("{} could not be checked", san),
    }
    controller.wait_idle().await;
}
