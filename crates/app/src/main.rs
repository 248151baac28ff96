use std::fmt;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use glossary_core::model::{PreferencesUpdate, Role, Theme};
use services::{AppServices, Clock, HttpSource, JsonFileSource, QuestionSource};

const DEFAULT_DATA_DIR: &str = ".glossary-data";
const DEFAULT_QUESTIONS: &str = "data/quiz-questions.json";
const DEFAULT_COUNT: usize = 5;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidCount { raw: String },
    InvalidQuota { raw: String },
    InvalidPreference(String),
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidCount { raw } => write!(f, "invalid --count value: {raw}"),
            ArgsError::InvalidQuota { raw } => write!(f, "invalid --quota-bytes value: {raw}"),
            ArgsError::InvalidPreference(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  app [quiz]  [options]                 # run a quiz (default)");
    eprintln!("  app progress [options]                # show stored progress");
    eprintln!("  app prefs [--role R] [--theme T] [options]");
    eprintln!("  app reset [options]                   # delete all stored progress");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --data-dir <path>      progress directory (default: {DEFAULT_DATA_DIR})");
    eprintln!("  --questions <path|url> quiz questions JSON (default: {DEFAULT_QUESTIONS})");
    eprintln!("  --count <n>            questions per quiz (default: {DEFAULT_COUNT})");
    eprintln!("  --quota-bytes <n>      cap on stored bytes");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  GLOSSARY_DATA_DIR, GLOSSARY_QUESTIONS, GLOSSARY_QUIZ_COUNT, GLOSSARY_QUOTA_BYTES");
    eprintln!("  RUST_LOG (e.g. RUST_LOG=debug)");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quiz,
    Progress,
    Prefs,
    Reset,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "quiz" => Some(Self::Quiz),
            "progress" => Some(Self::Progress),
            "prefs" => Some(Self::Prefs),
            "reset" => Some(Self::Reset),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Args {
    data_dir: PathBuf,
    questions: String,
    count: usize,
    quota_bytes: Option<u64>,
    preferences: PreferencesUpdate,
}

impl Args {
    fn parse(command: Command, args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut data_dir = std::env::var("GLOSSARY_DATA_DIR")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
        let mut questions = std::env::var("GLOSSARY_QUESTIONS")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_QUESTIONS.to_string());
        let mut count = std::env::var("GLOSSARY_QUIZ_COUNT")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .filter(|count| *count > 0)
            .unwrap_or(DEFAULT_COUNT);
        let mut quota_bytes = std::env::var("GLOSSARY_QUOTA_BYTES")
            .ok()
            .and_then(|value| value.parse::<u64>().ok());
        let mut preferences = PreferencesUpdate::new();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--data-dir" => data_dir = PathBuf::from(require_value(args, "--data-dir")?),
                "--questions" => questions = require_value(args, "--questions")?,
                "--count" => {
                    let value = require_value(args, "--count")?;
                    count = value
                        .parse::<usize>()
                        .ok()
                        .filter(|count| *count > 0)
                        .ok_or(ArgsError::InvalidCount { raw: value })?;
                }
                "--quota-bytes" => {
                    let value = require_value(args, "--quota-bytes")?;
                    let parsed = value
                        .parse::<u64>()
                        .map_err(|_| ArgsError::InvalidQuota { raw: value.clone() })?;
                    quota_bytes = Some(parsed);
                }
                "--role" if command == Command::Prefs => {
                    let value = require_value(args, "--role")?;
                    let role: Role = value
                        .parse()
                        .map_err(|e| ArgsError::InvalidPreference(format!("{e}")))?;
                    preferences = preferences.with_role(role);
                }
                "--theme" if command == Command::Prefs => {
                    let value = require_value(args, "--theme")?;
                    let theme: Theme = value
                        .parse()
                        .map_err(|e| ArgsError::InvalidPreference(format!("{e}")))?;
                    preferences = preferences.with_theme(theme);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self {
            data_dir,
            questions,
            count,
            quota_bytes,
            preferences,
        })
    }

    fn question_source(&self) -> Arc<dyn QuestionSource> {
        if self.questions.starts_with("http://") || self.questions.starts_with("https://") {
            Arc::new(HttpSource::new(self.questions.clone()))
        } else {
            Arc::new(JsonFileSource::new(&self.questions))
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Quiz,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Quiz,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if argv.first().is_some_and(|first| !first.starts_with("--")) {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;
    log::debug!("starting with {parsed:?}");

    let mut services = AppServices::file_backed(
        Clock::default_clock(),
        &parsed.data_dir,
        parsed.quota_bytes,
        parsed.question_source(),
    );
    if !services.progress().is_local_storage_available() {
        eprintln!("warning: progress will not be saved (storage unavailable)");
    }

    match cmd {
        Command::Quiz => run_quiz(&mut services, parsed.count).await,
        Command::Progress => {
            print_progress(&services);
            Ok(())
        }
        Command::Prefs => {
            let progress = services.progress();
            if !parsed.preferences.is_empty() {
                progress.update_preferences(parsed.preferences);
            }
            let prefs = progress.get_preferences();
            println!(
                "role:  {}",
                prefs.selected_role.map_or("(not set)", Role::as_str)
            );
            println!("theme: {}", prefs.theme.map_or("(not set)", Theme::as_str));
            Ok(())
        }
        Command::Reset => {
            services.progress().clear_all_data();
            println!("All progress deleted.");
            Ok(())
        }
    }
}

async fn run_quiz(services: &mut AppServices, count: usize) -> Result<(), Box<dyn std::error::Error>> {
    let visits = services.progress().increment_visit_count();
    log::info!("session {visits} started");

    let mut session = services.start_quiz(count).await?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    while let Some(question) = session.current() {
        println!();
        println!(
            "[{}/{}] {} ({})",
            session.position() + 1,
            session.len(),
            question.question(),
            question.term()
        );
        let options = question.options().to_vec();
        for (index, option) in options.iter().enumerate() {
            println!("  {}) {option}", index + 1);
        }

        let answer = loop {
            print!("> ");
            io::stdout().flush()?;
            let Some(line) = lines.next().transpose()? else {
                println!();
                println!("Quiz abandoned; nothing recorded.");
                return Ok(());
            };
            match line.trim().parse::<usize>() {
                Ok(choice) if (1..=options.len()).contains(&choice) => {
                    break options[choice - 1].clone();
                }
                _ => println!("Enter a number between 1 and {}.", options.len()),
            }
        };

        let outcome = services.answer(&mut session, &answer)?;
        if outcome.correct {
            println!("Correct!");
        } else {
            println!("Not quite. The answer is: {}", outcome.correct_answer);
        }
    }

    println!();
    println!("Score: {}/{}", session.score(), session.len());
    println!(
        "Best score so far: {}",
        services.progress().get_progress().best_score
    );
    Ok(())
}

fn print_progress(services: &AppServices) {
    let progress = services.progress().get_progress();
    let mut terms: Vec<&String> = progress.answered_terms.iter().collect();
    terms.sort();

    println!("visits:        {}", progress.visit_count);
    println!("quizzes taken: {}", progress.attempts());
    println!("best score:    {}", progress.best_score);
    println!("terms covered: {}", terms.len());
    for term in terms {
        println!("  - {term}");
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
