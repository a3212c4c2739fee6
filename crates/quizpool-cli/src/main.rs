//! quizpool CLI
//!
//! Import courses, inspect them and drill questions from the terminal.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use quizpool_core::{
    AppConfig, ConfigPatch, QuizEngine, SelectedQuestion, SessionSummary,
};
use tracing::{debug, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// quizpool - spaced-repetition drills for multiple-choice courses
#[derive(Parser)]
#[command(name = "quizpool")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spaced-repetition drills for multiple-choice courses")]
struct Cli {
    /// SQLite database path (default: ~/.quizpool/quizpool.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Host configuration file (.toml, .json or .yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed the scheduler's random source
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a course from a JSON question file
    Import {
        /// Path to the JSON array of questions
        file: PathBuf,
        /// Course name (default: the file stem)
        #[arg(long)]
        name: Option<String>,
    },

    /// List courses with per-pool counts
    List,

    /// Send every question of a course back to Latent
    Reset { course: String },

    /// Delete a course and all of its history
    Delete { course: String },

    /// Hide a question so it is never scheduled again
    Hide { course: String, question: u32 },

    /// Show the engine configuration, or update it with key=value pairs
    Config {
        /// Settings to change, e.g. test_pool_target_size=20
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },

    /// Show a course's event log, newest first
    Events {
        course: String,
        #[arg(long, default_value = "20")]
        limit: usize,
        #[arg(long, default_value = "0")]
        offset: usize,
    },

    /// Drill questions until nothing is available or you quit
    Drill {
        course: String,
        /// Stop after this many answers
        #[arg(long)]
        max: Option<u32>,
    },
}

fn load_app_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    let mut app = match &cli.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::from_env()?,
    };
    if let Some(db) = &cli.db {
        app.db_path = db.clone();
    }
    if let Some(seed) = cli.seed {
        app.rng_seed = Some(seed);
    }
    Ok(app)
}

/// Parse `key=value` pairs into a config patch. Values are read as JSON
/// where possible (numbers, booleans), otherwise as strings.
fn parse_patch(pairs: &[String]) -> anyhow::Result<ConfigPatch> {
    let mut map = serde_json::Map::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("expected KEY=VALUE, got '{pair}'");
        };
        let value = serde_json::from_str(value.trim())
            .unwrap_or_else(|_| serde_json::Value::String(value.trim().to_string()));
        map.insert(key.trim().to_string(), value);
    }
    serde_json::from_value(serde_json::Value::Object(map)).context("invalid configuration key")
}

async fn run_import(engine: &QuizEngine, file: PathBuf, name: Option<String>) -> anyhow::Result<()> {
    let document = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let name = match name {
        Some(name) => name,
        None => file
            .file_stem()
            .and_then(|s| s.to_str())
            .context("cannot derive a course name from the file name, pass --name")?
            .to_string(),
    };

    let report = engine.create_course_from_json(&name, &document).await?;
    println!("Created course '{}' ({})", name, report.course_id);
    println!("  loaded:  {}", report.total_loaded);
    println!("  skipped: {}", report.total_skipped);
    for issue in &report.validation_errors {
        println!("    #{}: {}", issue.index, issue.reason);
    }
    Ok(())
}

async fn run_list(engine: &QuizEngine) -> anyhow::Result<()> {
    let courses = engine.list_courses().await?;
    if courses.is_empty() {
        println!("No courses. Import one with `quizpool import <file>`.");
        return Ok(());
    }
    println!(
        "{:<36}  {:<24} {:>6} {:>6} {:>7} {:>6} {:>6}",
        "ID", "NAME", "LATENT", "TEST", "LEARNED", "MASTER", "TOTAL"
    );
    for c in courses {
        println!(
            "{:<36}  {:<24} {:>6} {:>6} {:>7} {:>6} {:>6}",
            c.id,
            c.name,
            c.stats.latent,
            c.stats.test,
            c.stats.learned,
            c.stats.master,
            c.total_questions()
        );
    }
    Ok(())
}

async fn run_config(engine: &QuizEngine, set: Vec<String>) -> anyhow::Result<()> {
    let config = if set.is_empty() {
        engine.get_config().await?
    } else {
        let patch = parse_patch(&set)?;
        engine.update_config(&patch).await?
    };
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

async fn run_events(
    engine: &QuizEngine,
    course: &str,
    limit: usize,
    offset: usize,
) -> anyhow::Result<()> {
    for event in engine.get_event_log(course, limit, offset).await? {
        println!(
            "{}  {:<16} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.details
        );
    }
    Ok(())
}

fn show_question(selected: &SelectedQuestion) {
    println!();
    println!(
        "[{} / {}] {}",
        selected.pool(),
        selected.strategy,
        selected.question.question
    );
    for (i, option) in selected.question.options.iter().enumerate() {
        println!("  {}) {}", i + 1, option);
    }
}

/// Read an option number from stdin. `None` means quit.
fn read_choice(input: &mut impl BufRead, options: usize) -> anyhow::Result<Option<usize>> {
    loop {
        print!("Answer (1-{options}, q to quit): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(None);
        }
        match line.parse::<usize>() {
            Ok(n) if (1..=options).contains(&n) => return Ok(Some(n - 1)),
            _ => println!("Please enter a number between 1 and {options}."),
        }
    }
}

async fn run_drill(engine: &QuizEngine, course: &str, max: Option<u32>) -> anyhow::Result<()> {
    let config = engine.get_config().await?;
    engine.start_session(course).await?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut summary = SessionSummary::default();

    while max.map_or(true, |m| summary.answered < m) {
        let Some(selected) = engine.find_next_question(course).await? else {
            println!();
            println!("Nothing to review right now. Come back once the snoozes run out.");
            break;
        };

        show_question(&selected);
        let Some(choice) = read_choice(&mut input, selected.question.options.len())? else {
            break;
        };
        let answer = selected.question.options[choice].clone();

        let outcome = engine.submit_answer(course, &selected, &answer).await?;
        summary.record(outcome.correct);

        if outcome.correct {
            println!("Correct.");
        } else {
            println!("Wrong. The answer is: {}", selected.question.correct_option);
        }
        println!("{}", selected.question.explanation);
        if let Some((from, to)) = outcome.transition() {
            println!("Moved from {from} to {to}.");
        }
        if outcome.correct && config.auto_advance_on_correct {
            tokio::time::sleep(std::time::Duration::from_millis(config.auto_advance_delay_ms))
                .await;
        }
    }

    engine.end_session(course, summary).await?;
    println!();
    println!(
        "Answered {} ({} correct, {:.0}%).",
        summary.answered,
        summary.correct,
        summary.accuracy() * 100.0
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let app = load_app_config(&cli)?;
    debug!(db = %app.db_path.display(), in_memory = app.in_memory, "Opening engine");
    if app.in_memory {
        warn!("Using an in-memory store; nothing will be saved");
    }
    let engine = QuizEngine::from_app_config(&app)?;

    match cli.command {
        Commands::Import { file, name } => run_import(&engine, file, name).await,
        Commands::List => run_list(&engine).await,
        Commands::Reset { course } => {
            engine.reset_course(&course).await?;
            println!("Course {course} reset.");
            Ok(())
        }
        Commands::Delete { course } => {
            engine.delete_course(&course).await?;
            println!("Course {course} deleted.");
            Ok(())
        }
        Commands::Hide { course, question } => {
            if engine.hide_question(&course, question).await? {
                println!("Question {question} hidden.");
            } else {
                println!("Question {question} was already hidden.");
            }
            Ok(())
        }
        Commands::Config { set } => run_config(&engine, set).await,
        Commands::Events {
            course,
            limit,
            offset,
        } => run_events(&engine, &course, limit, offset).await,
        Commands::Drill { course, max } => run_drill(&engine, &course, max).await,
    }
}
