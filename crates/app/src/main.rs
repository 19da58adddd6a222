use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use providers::InMemoryEnergy;
use quest_core::model::{Answer, LessonId, NodeRef, PathSnapshot};
use quest_core::{ActiveUnitTracker, LayoutClass, NodeState, TrailSettings};
use services::{
    Advance, Clock, EngineConfig, PathService, SessionLoopService, SessionPhase, SubmitOutcome,
};
use tracing_subscriber::EnvFilter;

mod demo;

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidWrongCount { raw: String },
    EmptyLesson,
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidWrongCount { raw } => write!(f, "invalid --wrong value: {raw}"),
            ArgsError::EmptyLesson => write!(f, "--lesson cannot be empty"),
        }
    }
}

impl std::error::Error for ArgsError {}

#[derive(Debug)]
enum RunError {
    NoPlayableLesson,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::NoPlayableLesson => write!(f, "the path has no lesson to play"),
        }
    }
}

impl std::error::Error for RunError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- path [--snapshot <file.json>] [--narrow]");
    eprintln!("  cargo run -p app -- play [--snapshot <file.json>] [--lesson <id>] [--wrong <n>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  built-in demo path, the current lesson, 1 wrong answer");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  QUEST_SNAPSHOT, QUEST_LOG, QUEST_BATCH_SIZE,");
    eprintln!("  QUEST_MICROCOPY_MAX_CHARS, QUEST_CELEBRATION_COOLDOWN_SECS");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Path,
    Play,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "path" => Some(Self::Path),
            "play" => Some(Self::Play),
            _ => None,
        }
    }
}

struct Args {
    snapshot: Option<PathBuf>,
    lesson: Option<LessonId>,
    wrong: usize,
    layout: LayoutClass,
}

impl Args {
    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self {
            snapshot: std::env::var("QUEST_SNAPSHOT")
                .ok()
                .filter(|value| !value.trim().is_empty())
                .map(PathBuf::from),
            lesson: None,
            wrong: 1,
            layout: LayoutClass::Wide,
        };

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--snapshot" => {
                    parsed.snapshot = Some(PathBuf::from(require_value(args, "--snapshot")?));
                }
                "--lesson" => {
                    let value = require_value(args, "--lesson")?;
                    let lesson = value.parse().map_err(|_| ArgsError::EmptyLesson)?;
                    parsed.lesson = Some(lesson);
                }
                "--wrong" => {
                    let value = require_value(args, "--wrong")?;
                    parsed.wrong = value
                        .parse()
                        .map_err(|_| ArgsError::InvalidWrongCount { raw: value.clone() })?;
                }
                "--narrow" => parsed.layout = LayoutClass::Narrow,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("QUEST_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_snapshot(path: Option<&PathBuf>) -> Result<PathSnapshot, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(demo::snapshot());
    };
    let raw = std::fs::read_to_string(path)?;
    let snapshot = serde_json::from_str(&raw)?;
    tracing::info!(path = %path.display(), "loaded path snapshot");
    Ok(snapshot)
}

fn state_label(state: NodeState) -> &'static str {
    match state {
        NodeState::Completed => "completed",
        NodeState::Current => "current",
        NodeState::Available => "available",
        NodeState::Locked => "locked",
    }
}

fn print_path(path: &PathService, layout: LayoutClass) {
    let report = path.node_states();
    let layouts = path.layouts();
    for (unit, trail) in path.snapshot().ordered_units().into_iter().zip(&layouts) {
        println!(
            "unit {} \"{}\"  progress {:.0}%  height {:.0}",
            unit.id,
            unit.title,
            trail.unit_progress * 100.0,
            trail.height
        );
        let views: HashMap<_, _> = report
            .unit_views(trail.unit_index)
            .map(|view| (&view.node, view))
            .collect();
        for position in &trail.positions {
            let Some(view) = views.get(&position.node) else {
                continue;
            };
            let label = match &position.node {
                NodeRef::Lesson(id) => format!("lesson {id}"),
                NodeRef::Event(id) => format!("event  {id}"),
            };
            let mut marks = Vec::new();
            if view.emphasis != quest_core::Emphasis::None {
                marks.push(format!("{:?}", view.emphasis).to_lowercase());
            }
            if view.tags.recovery {
                marks.push("recovery".to_string());
            }
            if view.tags.review_anchor {
                marks.push("review".to_string());
            }
            println!(
                "  #{:<2} {:<18} {:<9} x={:>5.1} y={:>6.1} {}",
                position.global_index,
                label,
                state_label(view.state),
                position.x,
                position.y,
                marks.join(",")
            );
        }
        println!("  path: {}", trail.path_data);
    }
    for violation in &report.violations {
        println!("! {violation}");
    }

    let tops = path.section_tops();
    let mut tracker = ActiveUnitTracker::new(layout);
    for viewport_top in tops.iter().map(|top| top + 1.0) {
        tracker.request_recompute();
        if let Some(active) = tracker.on_animation_frame(&tops, viewport_top) {
            println!("scrolled to {viewport_top:.0}: active unit {active}");
        }
    }
}

async fn play(path: &mut PathService, args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let lesson_id = match &args.lesson {
        Some(lesson) => lesson.clone(),
        None => path
            .current_lesson()
            .cloned()
            .ok_or(RunError::NoPlayableLesson)?,
    };
    let subject_id = path.snapshot().subject_id.clone();

    let content = demo::provider(path.snapshot());
    let energy = InMemoryEnergy::new(5).with_refill(0, 50);
    let loop_svc = SessionLoopService::new(
        Clock::default_clock(),
        Arc::new(content),
        Arc::new(energy),
    )
    .with_config(EngineConfig::from_env());

    let mut session = loop_svc.start_session(&subject_id, &lesson_id).await?;
    let mut wrong_left = args.wrong;
    while session.phase() == SessionPhase::Active {
        let Some(item) = session.current_item() else {
            break;
        };
        println!("Q{} {}", session.cursor() + 1, item.metadata.prompt);

        let option_id = if wrong_left > 0 { "wrong" } else { "right" };
        let outcome = loop_svc
            .submit(
                &mut session,
                Answer::Select {
                    option_id: option_id.to_string(),
                },
            )
            .await?;
        match outcome {
            SubmitOutcome::Recorded(report) => {
                if !report.graded.correct {
                    wrong_left = wrong_left.saturating_sub(1);
                }
                println!("   {}", report.graded.feedback.text);
                if let Some(explanation) = &report.graded.feedback.explanation {
                    println!("   ({explanation})");
                }
                if let Some(remediation) = &report.remediation {
                    println!("   + follow-up {remediation}");
                }
            }
            SubmitOutcome::Rejected(rejection) => println!("   skipped: {rejection}"),
        }

        if session.energy().is_exhausted() {
            println!("   out of energy, waiting for a refill");
            loop_svc.refill_with_wait(&mut session).await?;
        }
        if loop_svc.advance(&mut session)? == Advance::Finishing {
            break;
        }
    }

    let reward = loop_svc.finish_and_mark(&mut session, path).await?;
    let progress = session.progress();
    println!(
        "finished {}: {}/{} correct, {} stars, +{} xp, +{} coins{}",
        lesson_id,
        progress.correct,
        progress.answered,
        reward.stars(),
        reward.xp_earned(),
        reward.coins_earned(),
        if reward.leveled_up() { ", level up!" } else { "" }
    );
    println!("{}", serde_json::to_string_pretty(&reward)?);
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::Play,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::Play,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };
    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let args = Args::parse(&mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    init_tracing();
    let snapshot = load_snapshot(args.snapshot.as_ref())?;
    let mut path = PathService::new(snapshot, TrailSettings::default());

    match cmd {
        Command::Path => print_path(&path, args.layout),
        Command::Play => {
            play(&mut path, &args).await?;
            println!();
            print_path(&path, args.layout);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
