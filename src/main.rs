use std::{
    fs,
    path::PathBuf,
    sync::Arc,
};

use clap::{
    Parser,
    Subcommand,
};
use kanji_widgets::{
    backup::{
        restore_backup_file,
        write_backup_file,
        BackupFrequency,
        BackupScheduler,
    },
    catalog::{
        random_kanji,
        JishoClient,
        KanjiCatalog,
    },
    core::{
        EventBus,
        KanjiEntry,
        KanjiError,
        KanjiEvent,
        SystemClock,
    },
    persistence::{
        get_app_data_dir,
        FileStorage,
    },
    progress::{
        ProgressStore,
        Stats,
    },
    session::SessionManager,
    speech::{
        example_text,
        reading_to_play,
        CommandSpeaker,
        LogSpeaker,
        Speaker,
        SPEECH_LANG,
    },
};
use tokio::io::{
    AsyncBufReadExt,
    BufReader,
};
use tracing::{
    info,
    warn,
};
use tracing_subscriber::{
    fmt,
    prelude::*,
    EnvFilter,
};

/// Kanji flashcards with progress tracking
#[derive(Parser)]
#[command(name = "kanji-widgets")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding progress, settings and caches
    #[arg(long, env = "KANJI_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Skip dictionary lookups
    #[arg(long)]
    offline: bool,

    /// Text-to-speech program, e.g. "espeak-ng -v ja"
    #[arg(long, env = "KANJI_SPEECH_COMMAND")]
    speech_command: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current kanji
    Show,
    /// Mark a kanji as mastered (defaults to the current one)
    Master { character: Option<String> },
    /// Skip the current kanji
    Skip,
    /// List recently mastered kanji
    Recent {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },
    /// Show learning statistics
    Stats,
    /// Change the JLPT level
    Level { level: String },
    /// Speak the current kanji's reading
    Speak {
        /// Speak the first example word instead
        #[arg(long)]
        example: bool,
    },
    /// Export progress as JSON
    Export {
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Import progress from an exported file
    Import { file: PathBuf },
    /// Write a dated backup file
    Backup {
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
    /// Restore progress from a backup file
    Restore { file: PathBuf },
    /// Clear all progress
    Reset,
    /// Enrich a level with dictionary data
    Refresh { level: Option<String> },
    /// Interactive study loop
    Study,
}

struct App {
    data_dir: PathBuf,
    session: SessionManager<KanjiCatalog>,
    scheduler: Arc<BackupScheduler>,
    events: EventBus,
    speaker: Box<dyn Speaker>,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kanji_widgets=info"));
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn build_app(cli: &Cli) -> Result<App, KanjiError> {
    let data_dir = cli.data_dir.clone().unwrap_or_else(get_app_data_dir);
    let storage = Arc::new(FileStorage::open(&data_dir)?);
    let clock = Arc::new(SystemClock);

    let store = Arc::new(ProgressStore::new(storage.clone(), clock.clone()));
    store.init()?;
    if let Err(e) = store.cleanup() {
        warn!(error = %e, "cleanup failed");
    }

    let jisho = if cli.offline {
        None
    } else {
        match JishoClient::new() {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "dictionary client unavailable, continuing offline");
                None
            }
        }
    };
    let catalog = Arc::new(KanjiCatalog::new(storage, clock, jisho));

    let events = EventBus::new();
    let scheduler = BackupScheduler::new(store.clone(), events.sender());
    scheduler.check_backup_due(store.settings().local_backup_freq);
    let session = SessionManager::new(store, catalog, events.sender());

    let speaker: Box<dyn Speaker> =
        match cli.speech_command.as_deref().and_then(CommandSpeaker::from_command_line) {
            Some(speaker) => Box::new(speaker),
            None => Box::new(LogSpeaker),
        };

    Ok(App { data_dir, session, scheduler, events, speaker })
}

async fn run(cli: Cli) -> Result<(), KanjiError> {
    let app = build_app(&cli)?;
    let session = &app.session;
    let store = session.store();

    match cli.command {
        Commands::Show => {
            print_entry(&session.current_kanji()?.entry);
        }
        Commands::Master { character } => {
            let outcome = match character {
                Some(character) => session.mark_mastered(&character)?,
                None => {
                    session.current_kanji()?;
                    session.mark_current_mastered()?
                }
            };
            println!("Mastered: {}", outcome.progress.mastered.len());
            println!("Next:");
            print_entry(&outcome.next.entry);
        }
        Commands::Skip => {
            let skipped = session.current_kanji()?.entry.character;
            session.skip_current()?;
            println!("Skipped {}", skipped);
        }
        Commands::Recent { limit } => {
            let recent = store.get_recent(limit);
            if recent.is_empty() {
                println!("No recent kanji");
            }
            for entry in recent {
                println!("{}  {}", entry.character, entry.meanings.join(", "));
            }
        }
        Commands::Stats => {
            print!("{}", format_stats(&store.stats()?));
        }
        Commands::Level { level } => {
            let presented = session.change_level(&level)?;
            println!("Level set to {}", level);
            print_entry(&presented.entry);
        }
        Commands::Speak { example } => {
            let entry = session.current_kanji()?.entry;
            speak_entry(&app, &entry, example)?;
        }
        Commands::Export { out } => {
            let blob = store.export_snapshot()?;
            match out {
                Some(path) => {
                    fs::write(&path, blob)?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{}", blob),
            }
        }
        Commands::Import { file } | Commands::Restore { file } => {
            restore_backup_file(store, &file)?;
            session.load_current_kanji()?;
            println!("Progress imported successfully");
        }
        Commands::Backup { dir } => {
            let dir = dir.unwrap_or_else(|| app.data_dir.join("backups"));
            let path = write_backup_file(store, &dir)?;
            println!("Backup written to {}", path.display());
        }
        Commands::Reset => {
            let presented = session.reset_progress()?;
            println!("Progress reset");
            print_entry(&presented.entry);
        }
        Commands::Refresh { level } => {
            let level = level.unwrap_or_else(|| session.level());
            let entries = session.catalog().refresh_level(&level).await?;
            println!("Refreshed {} kanji for {}", entries.len(), level);
        }
        Commands::Study => study(&app).await?,
    }

    report_events(&app.events);
    Ok(())
}

async fn study(app: &App) -> Result<(), KanjiError> {
    let session = &app.session;
    let settings = session.store().settings();

    let scheduler = &app.scheduler;
    scheduler.schedule(settings.local_backup_freq);
    if settings.online_backup_freq != BackupFrequency::Never {
        info!(frequency = ?settings.online_backup_freq, "online backup is not available, ignoring");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut entry = session.current_kanji()?.entry;

    loop {
        println!();
        print_entry(&entry);
        if settings.auto_play {
            speak_entry(app, &entry, false)?;
        }
        println!("[Enter] mastered  [p] play  [s] skip  [q] quit");

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => match session.mark_current_mastered() {
                Ok(outcome) => entry = outcome.next.entry,
                Err(e) => eprintln!("Error: {}", e),
            },
            "p" => speak_entry(app, &entry, false)?,
            "s" => {
                session.skip_current()?;
                if let Some(random) = random_kanji(&**session.catalog(), &session.level()) {
                    if let Some(shown) = session.show_from_recent(&random.character) {
                        entry = shown;
                    }
                }
            }
            "q" => break,
            other => println!("Unknown command: {}", other),
        }

        report_events(&app.events);
    }

    scheduler.cancel();
    Ok(())
}

fn speak_entry(app: &App, entry: &KanjiEntry, example: bool) -> Result<(), KanjiError> {
    let text = if example {
        entry.examples.first().map(example_text)
    } else {
        reading_to_play(entry, app.session.store().settings().default_audio)
    };

    match text {
        Some(text) => app.speaker.speak(text, SPEECH_LANG),
        None => {
            println!("Nothing to speak for {}", entry.character);
            Ok(())
        }
    }
}

fn format_stats(stats: &Stats) -> String {
    [
        format!("Mastered:       {}", stats.total_mastered),
        format!("Studied:        {}", stats.total_studied),
        format!("Streak:         {} days", stats.current_streak),
        format!("Days active:    {}", stats.days_active),
        format!("Average/day:    {:.1}", stats.average_per_day),
        format!("Recent:         {}", stats.recent_activity),
        format!("Goal:           {:.0}%", stats.goal_percentage),
    ]
    .iter()
    .map(|line| format!("{}\n", line))
    .collect()
}

fn print_entry(entry: &KanjiEntry) {
    println!("{}  [{}]", entry.character, entry.level);
    println!("  Meaning:  {}", entry.meanings_label());
    if !entry.on_readings.is_empty() {
        println!("  On'yomi:  {}", entry.on_readings.join(", "));
    }
    if !entry.kun_readings.is_empty() {
        println!("  Kun'yomi: {}", entry.kun_readings.join(", "));
    }
    for example in &entry.examples {
        println!("  {} ({}) - {}", example.word, example.reading, example.meaning);
    }
}

fn report_events(events: &EventBus) {
    for event in events.poll_events() {
        match event {
            KanjiEvent::LevelComplete { level } => {
                println!("Congratulations! You have mastered every {} kanji. Starting over.", level)
            }
            KanjiEvent::BackupFailed { reason } => eprintln!("Backup failed: {}", reason),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_output_labels_recent_view() {
        let stats = Stats {
            total_mastered: 12,
            total_studied: 15,
            current_streak: 3,
            days_active: 4,
            average_per_day: 3.8,
            recent_activity: 10,
            study_start_date: 0,
            last_study_date: None,
            goal_percentage: 12.0,
        };
        let output = format_stats(&stats);
        assert!(output.contains("Recent:         10\n"));
        assert!(output.contains("Average/day:    3.8\n"));
        assert!(output.contains("Goal:           12%\n"));
        assert!(!output.contains("Last 7 days"));
    }

    #[test]
    fn test_startup_runs_backup_check() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().to_str().unwrap();
        let cli = Cli::parse_from(["kanji-widgets", "--offline", "--data-dir", data_dir, "stats"]);

        let app = build_app(&cli).unwrap();
        assert_eq!(app.scheduler.auto_backups().unwrap().len(), 1);
        assert!(app.scheduler.last_backup().is_some());
        let events = app.events.poll_events();
        assert!(matches!(events.as_slice(), [KanjiEvent::BackupCreated { .. }]));

        // A second start within the interval finds the backup fresh
        let again = build_app(&cli).unwrap();
        assert_eq!(again.scheduler.auto_backups().unwrap().len(), 1);
        assert!(again.events.poll_events().is_empty());
    }
}
