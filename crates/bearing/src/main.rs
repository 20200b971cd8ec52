use bearing::{Command, SOCKET_PATH, ThemeSelector};
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::os::unix::net::UnixStream;

#[derive(Parser, Debug)]
#[command(name = "bearing", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Show the compass window
    Show,
    /// Hide the compass window
    Hide,
    /// Push one raw device heading (degrees, 0 = north)
    Heading {
        #[arg(allow_negative_numbers = true)]
        degrees: f64,
    },
    /// Rotate the dial manually by a signed number of degrees
    Rotate {
        #[arg(allow_negative_numbers = true)]
        delta: f64,
    },
    /// Switch theme ("next" cycles through the built-in themes)
    Theme { name: String },
    /// Read headings from stdin, one per line, and forward them
    Follow,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Show => send(&[Command::Show]),
        Commands::Hide => send(&[Command::Hide]),
        Commands::Heading { degrees } => send(&[Command::Heading(degrees)]),
        Commands::Rotate { delta } => send(&[Command::Rotate(delta)]),
        Commands::Theme { name } => {
            let selector = if name.eq_ignore_ascii_case("next") {
                ThemeSelector::Next
            } else {
                ThemeSelector::Named(name)
            };
            send(&[Command::Theme(selector)])
        }
        Commands::Follow => follow(),
    }
}

fn connect() -> anyhow::Result<UnixStream> {
    UnixStream::connect(SOCKET_PATH).map_err(|e| {
        anyhow::anyhow!(
            "Failed to connect to luopan at {}: {}. Is luopan running?",
            SOCKET_PATH,
            e
        )
    })
}

fn send(commands: &[Command]) -> anyhow::Result<()> {
    let mut stream = connect()?;
    for cmd in commands {
        writeln!(stream, "{}", cmd)?;
    }
    Ok(())
}

fn follow() -> anyhow::Result<()> {
    let mut stream = connect()?;
    let stdin = std::io::stdin();

    for line in stdin.lock().lines() {
        let line = line?;
        let Some(token) = line.split_whitespace().next() else {
            continue;
        };
        match token.parse::<f64>() {
            Ok(degrees) if degrees.is_finite() => {
                writeln!(stream, "{}", Command::Heading(degrees))?;
            }
            _ => log::warn!("Skipping unreadable heading line: {:?}", line),
        }
    }
    Ok(())
}
