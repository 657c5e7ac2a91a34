use std::ops::RangeInclusive;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use storyweaver::data::DataBag;
use storyweaver::format::Story;
use storyweaver::freeplay::Interaction;
use storyweaver::player::{Player, Progress, Timings};

mod console;
use console::ConsoleSurface;

const HELP: &str = "commands: [n]ext, [p]rev, [r]estart, [o]utline, \
search <branch>, export <card key> [branch], [q]uit";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Answer {
    Yes,
    No,
}

/// Play a scripted story in the terminal
#[derive(Debug, Parser)]
#[command(name = "storyweaver-player", version)]
struct Args {
    /// Story file (JSON)
    story: PathBuf,
    /// Data bag the story's steps reference (JSON object)
    data: PathBuf,
    /// Override the pacing of staged effects
    #[arg(long)]
    timings: Option<PathBuf>,
    /// Play every step without waiting for commands
    #[arg(long)]
    auto: bool,
    /// Answer every confirmation prompt without asking
    #[arg(long, value_enum)]
    answer: Option<Answer>,
    /// Playback speed factor; 0 disables all pauses
    #[arg(long, default_value_t = 1.0, value_parser = parse_speed)]
    speed: f64,
}

const SPEED_RANGE: RangeInclusive<f64> = 0.01..=100.0;

fn parse_speed(value: &str) -> Result<f64, String> {
    let speed: f64 = value.trim().parse().map_err(|err| format!("{}", err))?;
    if speed == 0.0 || SPEED_RANGE.contains(&speed) {
        Ok(speed)
    } else {
        Err(format!(
            "expected 0 or a factor between {} and {}",
            SPEED_RANGE.start(),
            SPEED_RANGE.end()
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let story = Story::from_path(&args.story)
        .with_context(|| format!("Failed to load story {}", args.story.display()))?;
    let data = DataBag::from_path(&args.data)
        .with_context(|| format!("Failed to load data {}", args.data.display()))?;
    let timings = match &args.timings {
        Some(path) => Timings::from_path(path)
            .with_context(|| format!("Failed to load timings {}", path.display()))?,
        None => Timings::default(),
    };

    let answer = match (args.answer, args.auto) {
        (Some(answer), _) => Some(matches!(answer, Answer::Yes)),
        // unattended playback has nobody to ask
        (None, true) => Some(true),
        (None, false) => None,
    };
    let surface = ConsoleSurface::new(args.speed, answer);

    println!("{}", story.title);
    let mut player = Player::new(story, data, surface).with_timings(timings);

    if args.auto {
        while let Progress::Executed { .. } = player.advance().await {}
        player.surface().print_outline();
        return Ok(());
    }

    println!("{}", HELP);
    loop {
        let Some(line) = player.surface_mut().read_line().await? else {
            break;
        };
        let mut words = line.split_whitespace();
        match words.next() {
            Some("n" | "next") | None => {
                player.advance().await;
            }
            Some("p" | "prev") => {
                if !player.retreat() {
                    println!("  (nothing to undo)");
                }
            }
            Some("r" | "restart") => player.reset(),
            Some("o" | "outline") => player.surface().print_outline(),
            Some("s" | "search") => {
                let Some(branch_id) = words.next() else {
                    println!("  usage: search <branch>");
                    continue;
                };
                let interaction = Interaction::Search {
                    branch_id: branch_id.to_string(),
                };
                if !player.interact(interaction).await {
                    println!("  (search is not available right now)");
                }
            }
            Some("e" | "export") => {
                let Some(key) = words.next() else {
                    println!("  usage: export <card key> [branch]");
                    continue;
                };
                let card = match player.data().card(key) {
                    Ok(card) => card,
                    Err(err) => {
                        println!("  ({})", err);
                        continue;
                    }
                };
                let interaction = Interaction::Export {
                    card,
                    branch_id: words.next().map(str::to_string),
                };
                if !player.interact(interaction).await {
                    println!("  (no branch to export into)");
                }
            }
            Some("q" | "quit") => break,
            Some(_) => println!("{}", HELP),
        }
    }

    Ok(())
}
