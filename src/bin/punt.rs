use punt::repl::{repl, run_file};

use clap::Parser;
use std::path::PathBuf;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const EXIT_IO: i32 = 74;

#[derive(Parser, Debug)]
#[command(name = "punt")]
#[command(about = "Run a punt script, or start a REPL when none is given")]
struct Cli {
    /// Path to a script
    script: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.script {
        Some(path) => match run_file(&path) {
            Ok(result) => process::exit(result.exit_code()),
            Err(e) => {
                eprintln!("Could not read {}: {}", path.display(), e);
                process::exit(EXIT_IO);
            }
        },
        None => {
            if let Err(e) = repl() {
                eprintln!("{}", e);
                process::exit(EXIT_IO);
            }
        }
    }
}
