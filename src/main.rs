mod app;
mod cli;
mod db;
mod document;
mod entities;
mod error;
mod ids;
mod metrics;
mod model;
mod store;
mod util;

use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::app::App;
use crate::cli::{
    CheckinCommand, CheckinSave, Cli, Command, DateArg, ExerciseAdd, ExerciseCommand,
    ExerciseUpdate, ProgressArgs, SessionCommand, SessionSkip, SessionToggle, SettingsArgs,
    SwellingArg,
};
use crate::error::AppError;
use crate::ids::UuidIds;
use crate::model::{
    Change, CheckInInput, DateKey, ExerciseChanges, Reminder, Session, SettingsChanges, Swelling,
};
use crate::util::{
    format_checkin_detail, format_exercise_detail, format_plan_list, format_progress,
    format_session_detail, greeting,
};

const DATA_DIR_ENV: &str = "REHAB_HOME";
const TODAY_ENV: &str = "REHAB_TODAY";
const LOG_ENV: &str = "REHAB_LOG";

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<(), AppError> {
    let Cli {
        data_dir,
        today,
        command,
    } = Cli::parse();

    let today = resolve_today(today)?;
    let data_dir = resolve_data_dir(data_dir)?;
    let db_path = db::resolve_db_path(&data_dir);
    db::ensure_parent_dir(&db_path)?;
    let mut lock = db::open_lock(&db_path)?;
    let _guard = lock.write()?;

    let db = db::connect(&db_path).await?;
    db::ensure_schema(&db).await?;
    let mut app = App::open(db, Box::new(UuidIds)).await?;

    match command {
        Command::Today => handle_today(&mut app, today).await,
        Command::Exercise(command) => handle_exercise(&mut app, command).await,
        Command::Session(command) => handle_session(&mut app, command, today).await,
        Command::Checkin(command) => handle_checkin(&mut app, command, today).await,
        Command::Progress(args) => handle_progress(&app, args, today),
        Command::Settings(args) => handle_settings(&mut app, args).await,
        Command::Export => {
            println!("{}", serde_json::to_string_pretty(app.document())?);
            Ok(())
        }
        Command::Reset => {
            app.reset().await?;
            println!("All data reset. Sample plan restored.");
            Ok(())
        }
    }
}

async fn handle_today(app: &mut App, today: DateKey) -> Result<(), AppError> {
    let session = app.ensure_session(today).await?;
    println!("{}", greeting(app.settings()));
    println!();
    println!("{}", format_session_detail(today, &session, app.exercises()));
    Ok(())
}

async fn handle_exercise(app: &mut App, command: ExerciseCommand) -> Result<(), AppError> {
    match command {
        ExerciseCommand::Add(args) => handle_exercise_add(app, args).await,
        ExerciseCommand::Update(args) => handle_exercise_update(app, args).await,
        ExerciseCommand::Remove(args) => {
            let removed = app
                .delete_exercise(&args.id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("exercise {}", args.id)))?;
            println!("Removed exercise ID: {}: {}", removed.id, removed.name);
            Ok(())
        }
        ExerciseCommand::List => {
            println!("{}", format_plan_list(app.exercises()));
            Ok(())
        }
        ExerciseCommand::Show(args) => {
            println!("{}", format_exercise_detail(app.get_exercise(&args.id)?));
            Ok(())
        }
    }
}

async fn handle_exercise_add(app: &mut App, args: ExerciseAdd) -> Result<(), AppError> {
    let mut record = app.draft_exercise();
    ExerciseChanges {
        name: Some(args.name),
        sets: args.sets,
        reps: args.reps,
        instructions: args.instructions,
        video: args.video,
    }
    .apply(&mut record);

    match app.upsert_exercise(record).await? {
        Change::Applied(exercise) => {
            println!("Created exercise ID: {}: {}", exercise.id, exercise.name);
            Ok(())
        }
        Change::Rejected(_) => Err(empty_name()),
    }
}

async fn handle_exercise_update(app: &mut App, args: ExerciseUpdate) -> Result<(), AppError> {
    let mut record = app.get_exercise(&args.id)?.clone();
    ExerciseChanges {
        name: args.name,
        sets: args.sets,
        reps: args.reps,
        instructions: args.instructions,
        video: args.video,
    }
    .apply(&mut record);

    match app.upsert_exercise(record).await? {
        Change::Applied(exercise) => {
            println!("Updated exercise ID: {}: {}", exercise.id, exercise.name);
            Ok(())
        }
        Change::Rejected(_) => Err(empty_name()),
    }
}

async fn handle_session(
    app: &mut App,
    command: SessionCommand,
    today: DateKey,
) -> Result<(), AppError> {
    match command {
        SessionCommand::Toggle(args) => handle_session_toggle(app, args, today).await,
        SessionCommand::Complete(args) => {
            let date = resolve_date(args, today)?;
            let session = require_applied(date, app.complete_day(date).await?)?;
            println!("Completed {date}: {} exercises done", session.done_exercise_ids.len());
            Ok(())
        }
        SessionCommand::Skip(args) => handle_session_skip(app, args, today).await,
        SessionCommand::Show(args) => {
            let date = resolve_date(args, today)?;
            let session = app.ensure_session(date).await?;
            println!("{}", format_session_detail(date, &session, app.exercises()));
            Ok(())
        }
    }
}

async fn handle_session_toggle(
    app: &mut App,
    args: SessionToggle,
    today: DateKey,
) -> Result<(), AppError> {
    let date = resolve_date(args.date, today)?;
    let exercise = app.get_exercise(&args.exercise_id)?.name.clone();
    let session = app
        .toggle_exercise(date, &args.exercise_id, !args.undo)
        .await?
        .into_inner();
    let state = if args.undo { "not done" } else { "done" };
    println!(
        "Marked {exercise} {state} for {date}. Status: {}",
        session.status().as_str()
    );
    Ok(())
}

async fn handle_session_skip(
    app: &mut App,
    args: SessionSkip,
    today: DateKey,
) -> Result<(), AppError> {
    let date = resolve_date(args.date, today)?;
    let reason = args.reason.map(|reason| reason.trim().to_string());
    require_applied(date, app.skip_day(date, reason).await?)?;
    println!("Skipped {date}");
    Ok(())
}

async fn handle_checkin(
    app: &mut App,
    command: CheckinCommand,
    today: DateKey,
) -> Result<(), AppError> {
    match command {
        CheckinCommand::Save(args) => handle_checkin_save(app, args, today).await,
        CheckinCommand::Clear(args) => {
            let date = resolve_date(args, today)?;
            match app.clear_checkin(date).await? {
                Some(_) => println!("Cleared check-in for {date}"),
                None => println!("No check-in for {date}"),
            }
            Ok(())
        }
        CheckinCommand::Show(args) => {
            let date = resolve_date(args, today)?;
            println!("{}", format_checkin_detail(date, app.find_checkin(date)));
            Ok(())
        }
    }
}

async fn handle_checkin_save(
    app: &mut App,
    args: CheckinSave,
    today: DateKey,
) -> Result<(), AppError> {
    let date = resolve_date(args.date, today)?;
    let saved = app
        .save_checkin(CheckInInput {
            date,
            pain: args.pain,
            stiffness: args.stiffness,
            swelling: swelling_from_arg(args.swelling),
            sleep: args.sleep,
            notes: args.notes,
        })
        .await?;
    println!("Saved check-in for {}: pain {}/10", saved.date, saved.pain);
    Ok(())
}

fn handle_progress(app: &App, args: ProgressArgs, today: DateKey) -> Result<(), AppError> {
    let days = usize::try_from(args.days)
        .map_err(|_| AppError::InvalidInput(format!("--days {} is too large", args.days)))?;
    println!("{}", format_progress(&app.progress(today, days)));
    Ok(())
}

async fn handle_settings(app: &mut App, args: SettingsArgs) -> Result<(), AppError> {
    let SettingsArgs { name, reminder } = args;
    let settings = if name.is_none() && reminder.is_none() {
        app.settings().clone()
    } else {
        app.update_settings(SettingsChanges {
            name,
            reminder: reminder.map(|value| Reminder::from(value.trim().to_string())),
        })
        .await?
    };
    println!("Name: {}", settings.name);
    println!("Reminder: {}", settings.reminder.as_str());
    println!("{}", greeting(&settings));
    Ok(())
}

fn resolve_data_dir(flag: Option<PathBuf>) -> Result<PathBuf, AppError> {
    if let Some(path) = flag {
        return Ok(path);
    }
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    if let Ok(home) = std::env::var("HOME") {
        return Ok(PathBuf::from(home).join(".rehab"));
    }
    Err(AppError::InvalidInput(format!(
        "unable to resolve data directory; set {DATA_DIR_ENV}"
    )))
}

fn resolve_today(flag: Option<String>) -> Result<DateKey, AppError> {
    let raw = flag.or_else(|| {
        std::env::var(TODAY_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
    });
    match raw {
        Some(raw) => raw.parse(),
        None => Ok(DateKey::new(Local::now().date_naive())),
    }
}

fn resolve_date(arg: DateArg, today: DateKey) -> Result<DateKey, AppError> {
    match arg.date {
        Some(raw) => raw.parse(),
        None => Ok(today),
    }
}

fn require_applied(date: DateKey, change: Change<Session>) -> Result<Session, AppError> {
    match change {
        Change::Applied(session) => Ok(session),
        Change::Rejected(session) => Err(AppError::InvalidInput(format!(
            "{date} is already {}; nothing changed",
            session.status().as_str().to_lowercase()
        ))),
    }
}

fn empty_name() -> AppError {
    AppError::InvalidInput("exercise name cannot be empty".to_string())
}

fn swelling_from_arg(arg: SwellingArg) -> Swelling {
    match arg {
        SwellingArg::None => Swelling::None,
        SwellingArg::Mild => Swelling::Mild,
        SwellingArg::Moderate => Swelling::Moderate,
        SwellingArg::Severe => Swelling::Severe,
    }
}
