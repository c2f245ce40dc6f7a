// The popperview CLI.
// You can run Popper and watch its hypotheses, translate captured output, or browse history.

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use popperview::clause::translate_hypothesis;
use popperview::history::HistoryStore;
use popperview::notation::Notation;
use popperview::render::SvgSink;
use popperview::runner::{parse_timeout, ConsoleLevel, RunConfig, RunEvent};
use popperview::segmenter::segment;
use popperview::session::{Session, DEFAULT_FONT_SIZE};
use popperview::settings::{home_dir, locate_popper, Settings};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(
    name = "popperview",
    about = "Runs the Popper ILP system and shows its hypotheses as logic",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    #[clap(
        long,
        global = true,
        help = "Directory for history.json and last_paths.json. Defaults to the current directory.",
        value_name = "DIR"
    )]
    data_dir: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run Popper on a learning task
    Run {
        /// Background knowledge file
        #[clap(long, value_name = "FILE")]
        bk: Option<PathBuf>,

        /// Bias file
        #[clap(long, value_name = "FILE")]
        bias: Option<PathBuf>,

        /// Examples file
        #[clap(long, value_name = "FILE")]
        exs: Option<PathBuf>,

        #[clap(
            long,
            help = "Path to popper.py. If not provided, the last one used or a checkout under ~/popper.",
            value_name = "PATH"
        )]
        popper: Option<PathBuf>,

        #[clap(
            long,
            default_value = "300s",
            help = "How long Popper may run. Only the digits count, as seconds. Use \"none\" to wait forever."
        )]
        timeout: String,

        /// Show hypotheses while Popper is still printing them
        #[clap(long)]
        realtime: bool,

        /// Emit LaTeX instead of Unicode
        #[clap(long)]
        latex: bool,

        #[clap(
            long,
            help = "Write the last rendered hypothesis to this SVG file.",
            value_name = "OUT"
        )]
        svg: Option<PathBuf>,

        #[clap(long, default_value_t = DEFAULT_FONT_SIZE, value_name = "N")]
        font_size: u32,
    },

    /// Translate one hypothesis block
    Translate {
        #[clap(
            value_name = "FILE",
            help = "File holding the clauses. If not provided, or \"-\", reads from stdin."
        )]
        file: Option<String>,

        /// Emit LaTeX instead of Unicode
        #[clap(long)]
        latex: bool,
    },

    /// Split a captured Popper log into hypotheses and translate each one
    Segment {
        #[clap(
            value_name = "FILE",
            help = "The captured log. If not provided, or \"-\", reads from stdin."
        )]
        file: Option<String>,

        /// Emit LaTeX instead of Unicode
        #[clap(long)]
        latex: bool,
    },

    /// Print the history of rendered hypotheses
    History {
        /// Forget the history instead of printing it
        #[clap(long)]
        clear: bool,
    },
}

fn notation(latex: bool) -> Notation {
    if latex {
        Notation::Latex
    } else {
        Notation::Unicode
    }
}

fn read_input(file: Option<String>) -> String {
    let result = match file.as_deref() {
        None | Some("-") => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).map(|_| text)
        }
        Some(path) => std::fs::read_to_string(path),
    };
    result.unwrap_or_else(|e| {
        println!("Error reading input: {}", e);
        std::process::exit(1);
    })
}

/// Fills in missing paths from the remembered settings, then remembers the ones used.
fn resolve_run_paths(data_dir: &Path, given: Settings) -> Result<Settings, String> {
    let mut settings = Settings::load_or_default(data_dir);
    settings.merge(given);

    let popper = locate_popper(&settings, home_dir().as_deref()).map_err(|e| e.to_string())?;
    settings.popper_path = Some(popper);
    for (name, path) in [
        ("--bk", &settings.bk),
        ("--bias", &settings.bias),
        ("--exs", &settings.exs),
    ] {
        if path.is_none() {
            return Err(format!("no {} file given, and none remembered", name));
        }
    }

    if let Err(e) = settings.save(data_dir) {
        tracing::warn!("could not remember paths: {}", e);
    }
    Ok(settings)
}

#[tokio::main]
async fn main() {
    // Use RUST_LOG to control log levels, e.g. RUST_LOG=popperview=debug
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let data_dir = match &args.data_dir {
        Some(dir) => PathBuf::from(dir),
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                println!("Error getting current directory: {}", e);
                std::process::exit(1);
            }
        },
    };

    match args.command {
        Command::Run {
            bk,
            bias,
            exs,
            popper,
            timeout,
            realtime,
            latex,
            svg,
            font_size,
        } => {
            let given = Settings {
                popper_path: popper,
                bk,
                bias,
                exs,
            };
            let settings = match resolve_run_paths(&data_dir, given) {
                Ok(settings) => settings,
                Err(e) => {
                    println!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let config = RunConfig {
                popper: settings.popper_path.unwrap_or_default(),
                bk: settings.bk.unwrap_or_default(),
                bias: settings.bias.unwrap_or_default(),
                exs: settings.exs.unwrap_or_default(),
                timeout: parse_timeout(&timeout),
                realtime,
                notation: notation(latex),
                ..RunConfig::default()
            };

            let mut session = Session::open(&data_dir, SvgSink);
            session.font_size = font_size;
            let mut rx = match session.start(config) {
                Ok(rx) => rx,
                Err(e) => {
                    println!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            let mut last_image = None;
            let mut success = false;
            while let Some(event) = rx.recv().await {
                if let Some(image) = session.handle_event(&event) {
                    last_image = Some(image);
                }
                match event {
                    RunEvent::Console { level, message } => match level {
                        ConsoleLevel::Info | ConsoleLevel::Output => println!("{}", message),
                        ConsoleLevel::Warning => println!("Warning: {}", message),
                        ConsoleLevel::Error => println!("Error: {}", message),
                    },
                    RunEvent::Hypothesis { markup, partial } => {
                        println!();
                        println!("{}:", if partial { "Current hypothesis" } else { "Hypothesis" });
                        for line in markup {
                            println!("  {}", line);
                        }
                        println!();
                    }
                    RunEvent::Finished(status) => {
                        println!("Popper {}.", status.verb());
                        success = status.is_success();
                        break;
                    }
                }
            }

            if let (Some(path), Some(image)) = (svg, last_image) {
                match std::fs::write(&path, &image.bytes) {
                    Ok(()) => println!("Hypothesis written to {}", path.display()),
                    Err(e) => {
                        println!("Error writing {}: {}", path.display(), e);
                        std::process::exit(1);
                    }
                }
            }
            if !success {
                std::process::exit(1);
            }
        }

        Command::Translate { file, latex } => {
            let text = read_input(file);
            for line in translate_hypothesis(&text, notation(latex)) {
                println!("{}", line);
            }
        }

        Command::Segment { file, latex } => {
            let text = read_input(file);
            let blocks = segment(&text);
            if blocks.is_empty() {
                println!("No hypothesis found.");
                std::process::exit(1);
            }
            for (i, block) in blocks.iter().enumerate() {
                println!("Hypothesis {}:", i + 1);
                for line in translate_hypothesis(block, notation(latex)) {
                    println!("  {}", line);
                }
                println!();
            }
        }

        Command::History { clear } => {
            let mut history = HistoryStore::load_from_dir(&data_dir);
            if clear {
                if let Err(e) = history.clear() {
                    println!("Error clearing history: {}", e);
                    std::process::exit(1);
                }
                println!("History cleared.");
            } else if history.is_empty() {
                println!("No history yet.");
            } else {
                print!("{}", history.render_listing());
            }
        }
    }
}
