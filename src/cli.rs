use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "rehab",
    version,
    about = "Track a home rehab plan, daily sessions and symptom check-ins"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Directory holding rehab.db (defaults to $REHAB_HOME or ~/.rehab)"
    )]
    pub data_dir: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        value_name = "YYYY-MM-DD",
        help = "Treat this date as today (defaults to $REHAB_TODAY or the local date)"
    )]
    pub today: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show today's session
    Today,
    #[command(subcommand)]
    Exercise(ExerciseCommand),
    #[command(subcommand)]
    Session(SessionCommand),
    #[command(subcommand)]
    Checkin(CheckinCommand),
    /// Adherence, streak and pain trend for the trailing window
    Progress(ProgressArgs),
    /// Show or change name and reminder
    Settings(SettingsArgs),
    /// Print the whole document as JSON
    Export,
    /// Delete all data and start over with the sample plan
    Reset,
}

#[derive(Subcommand, Debug)]
pub enum ExerciseCommand {
    Add(ExerciseAdd),
    Update(ExerciseUpdate),
    Remove(ExerciseRemove),
    List,
    Show(ExerciseShow),
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    Toggle(SessionToggle),
    Complete(DateArg),
    Skip(SessionSkip),
    Show(DateArg),
}

#[derive(Subcommand, Debug)]
pub enum CheckinCommand {
    Save(CheckinSave),
    Clear(DateArg),
    Show(DateArg),
}

#[derive(Args, Debug)]
pub struct ExerciseAdd {
    pub name: String,
    #[arg(long)]
    pub sets: Option<u32>,
    #[arg(long)]
    pub reps: Option<u32>,
    #[arg(long)]
    pub instructions: Option<String>,
    #[arg(long, value_name = "URL")]
    pub video: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExerciseUpdate {
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub sets: Option<u32>,
    #[arg(long)]
    pub reps: Option<u32>,
    #[arg(long)]
    pub instructions: Option<String>,
    #[arg(long, value_name = "URL")]
    pub video: Option<String>,
}

#[derive(Args, Debug)]
pub struct ExerciseRemove {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct ExerciseShow {
    pub id: String,
}

#[derive(Args, Debug)]
pub struct DateArg {
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<String>,
}

#[derive(Args, Debug)]
pub struct SessionToggle {
    pub exercise_id: String,
    #[arg(long, help = "Mark the exercise as not done")]
    pub undo: bool,
    #[command(flatten)]
    pub date: DateArg,
}

#[derive(Args, Debug)]
pub struct SessionSkip {
    #[arg(long)]
    pub reason: Option<String>,
    #[command(flatten)]
    pub date: DateArg,
}

#[derive(Args, Debug)]
pub struct CheckinSave {
    #[arg(long, help = "Pain score 0-10")]
    pub pain: i32,
    #[arg(long, help = "Stiffness score 0-10")]
    pub stiffness: i32,
    #[arg(long, value_enum, default_value_t = SwellingArg::None)]
    pub swelling: SwellingArg,
    #[arg(long, value_name = "HOURS", value_parser = parse_hours)]
    pub sleep: Option<f64>,
    #[arg(long, default_value = "")]
    pub notes: String,
    #[command(flatten)]
    pub date: DateArg,
}

#[derive(Args, Debug)]
pub struct ProgressArgs {
    #[arg(
        long,
        default_value_t = crate::metrics::WINDOW_DAYS as u64,
        value_parser = clap::value_parser!(u64).range(1..=crate::metrics::MAX_WINDOW_DAYS)
    )]
    pub days: u64,
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, help = "off, morning, evening, or a custom value")]
    pub reminder: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum SwellingArg {
    None,
    Mild,
    Moderate,
    Severe,
}

fn parse_hours(raw: &str) -> Result<f64, String> {
    let hours: f64 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{raw}' is not a number"))?;
    if !hours.is_finite() || hours < 0.0 {
        return Err(format!("'{raw}' must be a finite number of hours, 0 or more"));
    }
    Ok(hours)
}
