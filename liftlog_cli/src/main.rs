use chrono::Local;
use clap::{Args, Parser, Subcommand};
use liftlog_core::*;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "liftlog")]
#[command(about = "Strength training progress tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage exercises
    #[command(subcommand)]
    Exercise(ExerciseCommand),

    /// Record, correct or remove logged sets
    #[command(subcommand)]
    Log(LogCommand),

    /// Manage training sessions
    #[command(subcommand)]
    Session(SessionCommand),

    /// Manage training plans
    #[command(subcommand)]
    Plan(PlanCommand),

    /// Report references to exercises or sessions that no longer exist
    Check,

    /// Write a backup bundle
    Export {
        /// Destination file (prints to stdout if omitted)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Replace all data with the contents of a backup bundle
    Import {
        /// Bundle file written by `export`
        path: PathBuf,
    },

    /// Write every logged set to a CSV file
    ExportCsv {
        /// Destination file
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum ExerciseCommand {
    /// Add a new exercise
    Add { name: String },
    /// Rename an exercise
    Rename { id: Uuid, name: String },
    /// Delete an exercise and all of its sets
    Delete { id: Uuid },
    /// List exercises with their headline metrics
    List,
    /// Show an exercise's sets and metrics
    Show { id: Uuid },
}

#[derive(Subcommand)]
enum LogCommand {
    /// Log a set against an exercise
    Add {
        exercise: Uuid,
        #[command(flatten)]
        set: SetArgs,
        /// Session the set belongs to
        #[arg(long)]
        session: Option<Uuid>,
    },
    /// Change the weight and reps of a logged set
    Update {
        exercise: Uuid,
        log: Uuid,
        #[command(flatten)]
        set: SetArgs,
    },
    /// Remove a logged set
    Delete { exercise: Uuid, log: Uuid },
}

#[derive(Args)]
struct SetArgs {
    /// Weight lifted
    #[arg(long)]
    weight: f64,
    /// Repetitions performed
    #[arg(long)]
    reps: u32,
}

#[derive(Args)]
struct GroupArgs {
    name: String,
    /// Exercise included (repeatable, order is kept)
    #[arg(long = "exercise")]
    exercises: Vec<Uuid>,
    /// Free-text notes
    #[arg(long, default_value = "")]
    notes: String,
}

#[derive(Subcommand)]
enum SessionCommand {
    /// Add a session
    Add(GroupArgs),
    /// Replace a session's name, exercises and notes
    Update {
        id: Uuid,
        #[command(flatten)]
        fields: GroupArgs,
    },
    /// Delete a session and every set logged in it
    Delete { id: Uuid },
    /// List sessions with their total volume
    List,
    /// Show the sets logged in a session
    Show { id: Uuid },
    /// Start a session from a plan's exercises and notes
    FromPlan {
        plan: Uuid,
        /// Session name (defaults to the plan's name)
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum PlanCommand {
    /// Add a plan
    Add(GroupArgs),
    /// Replace a plan's name, exercises and notes
    Update {
        id: Uuid,
        #[command(flatten)]
        fields: GroupArgs,
    },
    /// Delete a plan
    Delete { id: Uuid },
    /// List plans
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    liftlog_core::logging::init_with_level(&config.logging.level);

    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);
    let mut store = open_file_store(data_dir.join("store"));
    report_corrupt_slots(store.load_report());

    match cli.command {
        Commands::Exercise(cmd) => cmd_exercise(&mut store, cmd),
        Commands::Log(cmd) => cmd_log(&mut store, cmd)?,
        Commands::Session(cmd) => cmd_session(&mut store, cmd),
        Commands::Plan(cmd) => cmd_plan(&mut store, cmd),
        Commands::Check => cmd_check(&store),
        Commands::Export { output } => cmd_export(&store, output)?,
        Commands::Import { path } => cmd_import(&mut store, &path)?,
        Commands::ExportCsv { path } => {
            let delimiter = config.export.delimiter_byte()?;
            let count = export_logs_csv(&path, store.exercises(), delimiter)?;
            println!("✓ Exported {} sets to {}", count, path.display());
        }
    }

    if let Some(err) = store.last_persist_error() {
        eprintln!("Warning: changes could not be saved: {}", err);
    }

    Ok(())
}

fn report_corrupt_slots(report: &LoadReport) {
    for (name, status) in [
        ("exercises", &report.exercises),
        ("sessions", &report.sessions),
        ("plans", &report.plans),
    ] {
        if let SlotStatus::Corrupt(reason) = status {
            eprintln!(
                "Warning: stored {} could not be read ({}); starting with none.",
                name, reason
            );
        }
    }
}

fn cmd_exercise(store: &mut FileStore, cmd: ExerciseCommand) {
    match cmd {
        ExerciseCommand::Add { name } => {
            let id = store.add_exercise(name.trim());
            println!("✓ Added exercise {}", id);
        }
        ExerciseCommand::Rename { id, name } => {
            if store.update_exercise(id, name.trim()) {
                println!("✓ Renamed exercise {}", id);
            } else {
                not_found("exercise", id);
            }
        }
        ExerciseCommand::Delete { id } => {
            if store.delete_exercise(id) {
                println!("✓ Deleted exercise {}", id);
            } else {
                not_found("exercise", id);
            }
        }
        ExerciseCommand::List => {
            if store.exercises().is_empty() {
                println!("No exercises yet.");
            }
            for exercise in store.exercises() {
                let summary = ExerciseSummary::compute(exercise);
                println!(
                    "{}  {}  ({} sets, est. 1RM {})",
                    exercise.id,
                    exercise.name,
                    summary.log_count,
                    fmt_metric(summary.estimated_one_rep_max)
                );
            }
        }
        ExerciseCommand::Show { id } => match store.exercise(id) {
            Some(exercise) => display_exercise(exercise),
            None => not_found("exercise", id),
        },
    }
}

fn cmd_log(store: &mut FileStore, cmd: LogCommand) -> Result<()> {
    match cmd {
        LogCommand::Add {
            exercise,
            set,
            session,
        } => {
            validate_set(set.weight, set.reps)?;
            match store.add_log(exercise, set.weight, set.reps, session) {
                Some(log_id) => println!("✓ Logged set {}", log_id),
                None => not_found("exercise", exercise),
            }
        }
        LogCommand::Update { exercise, log, set } => {
            validate_set(set.weight, set.reps)?;
            if store.update_log(exercise, log, set.weight, set.reps) {
                println!("✓ Updated set {}", log);
            } else {
                not_found("set", log);
            }
        }
        LogCommand::Delete { exercise, log } => {
            if store.delete_log(exercise, log) {
                println!("✓ Deleted set {}", log);
            } else {
                not_found("set", log);
            }
        }
    }
    Ok(())
}

fn cmd_session(store: &mut FileStore, cmd: SessionCommand) {
    match cmd {
        SessionCommand::Add(args) => {
            let id = store.add_session(args.name.trim(), args.exercises, args.notes);
            println!("✓ Added session {}", id);
        }
        SessionCommand::Update { id, fields } => {
            if store.update_session(id, fields.name.trim(), fields.exercises, fields.notes) {
                println!("✓ Updated session {}", id);
            } else {
                not_found("session", id);
            }
        }
        SessionCommand::Delete { id } => {
            let purged = store.logs_for_session(id).len();
            if store.delete_session(id) {
                println!("✓ Deleted session {} and {} logged sets", id, purged);
            } else {
                not_found("session", id);
            }
        }
        SessionCommand::List => {
            if store.sessions().is_empty() {
                println!("No sessions yet.");
            }
            for session in store.sessions() {
                println!(
                    "{}  {}  {}  volume {:.1}",
                    session.id,
                    session.created_at.with_timezone(&Local).format("%Y-%m-%d"),
                    session.name,
                    store.session_total_volume(session.id).unwrap_or_default()
                );
            }
        }
        SessionCommand::Show { id } => match store.session(id) {
            Some(session) => display_session(store, session),
            None => not_found("session", id),
        },
        SessionCommand::FromPlan { plan, name } => {
            let name = match (name, store.plan(plan)) {
                (Some(name), _) => name,
                (None, Some(p)) => p.name.clone(),
                (None, None) => String::new(),
            };
            match store.start_session_from_plan(plan, name) {
                Some(id) => println!("✓ Started session {}", id),
                None => not_found("plan", plan),
            }
        }
    }
}

fn cmd_plan(store: &mut FileStore, cmd: PlanCommand) {
    match cmd {
        PlanCommand::Add(args) => {
            let id = store.add_plan(args.name.trim(), args.exercises, args.notes);
            println!("✓ Added plan {}", id);
        }
        PlanCommand::Update { id, fields } => {
            if store.update_plan(id, fields.name.trim(), fields.exercises, fields.notes) {
                println!("✓ Updated plan {}", id);
            } else {
                not_found("plan", id);
            }
        }
        PlanCommand::Delete { id } => {
            if store.delete_plan(id) {
                println!("✓ Deleted plan {}", id);
            } else {
                not_found("plan", id);
            }
        }
        PlanCommand::List => {
            if store.plans().is_empty() {
                println!("No plans yet.");
            }
            for plan in store.plans() {
                println!(
                    "{}  {}  ({} exercises)",
                    plan.id,
                    plan.name,
                    plan.exercise_ids.len()
                );
            }
        }
    }
}

fn cmd_check(store: &FileStore) {
    let findings = store.check_integrity();
    if findings.is_empty() {
        println!("✓ No dangling references");
        return;
    }

    println!("Found {} dangling references:", findings.len());
    for finding in findings {
        println!("  - {}", finding);
    }
}

fn cmd_export(store: &FileStore, output: Option<PathBuf>) -> Result<()> {
    let bundle = export_bundle(store.exercises(), store.sessions(), store.plans())?;
    match output {
        Some(path) => {
            liftlog_core::export::write_bundle(&path, &bundle)?;
            println!("✓ Exported backup to {}", path.display());
        }
        None => println!("{}", bundle.to_json()?),
    }
    Ok(())
}

fn cmd_import(store: &mut FileStore, path: &Path) -> Result<()> {
    let snapshot = liftlog_core::export::read_bundle(path)?;
    let (exercises, sessions, plans) = (
        snapshot.exercises.len(),
        snapshot.sessions.len(),
        snapshot.plans.len(),
    );
    store.restore(snapshot);
    println!(
        "✓ Imported {} exercises, {} sessions, {} plans",
        exercises, sessions, plans
    );
    Ok(())
}

fn not_found(kind: &str, id: Uuid) {
    println!("No {} with id {} - nothing changed.", kind, id);
}

fn fmt_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}", v))
}

fn display_exercise(exercise: &Exercise) {
    let summary = ExerciseSummary::compute(exercise);

    println!("\n{}", exercise.name);
    println!("  id: {}", exercise.id);
    println!();
    println!("  Sets:              {}", summary.log_count);
    println!("  Total volume:      {:.1}", summary.total_volume);
    println!(
        "  Est. 1RM:          {}",
        fmt_metric(summary.estimated_one_rep_max)
    );
    println!(
        "  Avg intensity:     {}",
        fmt_metric(summary.average_intensity)
    );
    match (summary.overload_score, summary.overload_trend) {
        (Some(score), Some(trend)) => {
            println!("  Overload:          {:+.1}% ({})", score, trend)
        }
        _ => println!("  Overload:          -"),
    }

    if !exercise.logs.is_empty() {
        println!();
        for log in exercise.logs_chronological() {
            println!(
                "  {}  {}  {} x {}",
                log.id,
                log.logged_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                log.weight,
                log.reps
            );
        }
    }
    println!();
}

fn display_session(store: &FileStore, session: &TrainingSession) {
    println!("\n{}", session.name);
    println!("  id: {}", session.id);
    println!(
        "  started: {}",
        session.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    if !session.notes.is_empty() {
        println!("  notes: {}", session.notes);
    }

    println!();
    for exercise_id in &session.exercise_ids {
        match store.exercise(*exercise_id) {
            Some(exercise) => println!("  • {}", exercise.name),
            None => println!("  • (missing exercise {})", exercise_id),
        }
    }

    println!();
    for (exercise, log) in store.logs_for_session(session.id) {
        println!("  {}: {} x {}", exercise.name, log.weight, log.reps);
    }
    println!(
        "\n  Total volume: {:.1}\n",
        store.session_total_volume(session.id).unwrap_or_default()
    );
}
