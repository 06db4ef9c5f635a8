use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::warn;

use sprachtage::catalogue::Curriculum;
use sprachtage::config::{Config, StoreBackend};
use sprachtage::error::StorageError;
use sprachtage::grading::Response;
use sprachtage::models::{DayDef, DayProgress, JsonOutput, SkillActivity, SkillKey};
use sprachtage::progress::{day_key, ProgressStore};
use sprachtage::storage::{FileStore, KeyValueStore, MemoryStore, SqliteStore};
use sprachtage::telemetry;

#[derive(Parser)]
#[command(name = "sprachtage")]
#[command(about = "A day-by-day four-skill language curriculum with progress tracking")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the progress store
    Init,

    /// List all chapters
    Chapters,

    /// Show a chapter and its days
    Chapter {
        /// Chapter ID (e.g. a1_ch1)
        id: String,
    },

    /// Show the activities for one day
    Day {
        /// Chapter ID
        chapter: String,

        /// Day number (1-based)
        day: u32,

        /// Only show one skill: listening/speaking/reading/writing
        #[arg(long, short)]
        skill: Option<String>,
    },

    /// Check an answer to an exercise
    Check {
        /// Chapter ID
        chapter: String,

        /// Day number (1-based)
        day: u32,

        /// Skill: listening/speaking/reading/writing
        skill: String,

        /// Exercise number (1-based)
        exercise: usize,

        /// Your answer (option number or text)
        answer: String,
    },

    /// Mark a skill as done for a day
    Done {
        /// Chapter ID
        chapter: String,

        /// Day number (1-based)
        day: u32,

        /// Skill: listening/speaking/reading/writing
        skill: String,
    },

    /// Show all recorded progress
    Progress,

    /// Show the next activity to work on
    Next,

    /// Validate the catalogue (built-in, configured, or the given file)
    Validate {
        /// Catalogue JSON file
        path: Option<PathBuf>,
    },

    /// Show learning statistics
    Stats,
}

// The configured progress backend
enum Store {
    Sqlite(SqliteStore),
    File(FileStore),
    Memory(MemoryStore),
}

impl Store {
    fn open(config: &Config) -> Result<Self, StorageError> {
        match config.store {
            StoreBackend::Sqlite => {
                let path = config.database_path();
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let db = SqliteStore::open(&path)?;
                db.init()?;
                Ok(Store::Sqlite(db))
            }
            StoreBackend::File => Ok(Store::File(FileStore::new(&config.data_dir))),
            StoreBackend::Memory => {
                warn!("Using in-memory store; progress will not be saved");
                Ok(Store::Memory(MemoryStore::new()))
            }
        }
    }

    fn location(&self, config: &Config) -> String {
        match self {
            Store::Sqlite(_) => config.database_path().display().to_string(),
            Store::File(_) => config.data_dir.display().to_string(),
            Store::Memory(_) => "memory".to_string(),
        }
    }

    fn last_saved(&self, key: &str) -> Option<DateTime<Utc>> {
        match self {
            Store::Sqlite(db) => db.updated_at(key).ok().flatten(),
            Store::File(_) | Store::Memory(_) => None,
        }
    }
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self {
            Store::Sqlite(s) => s.get(key),
            Store::File(s) => s.get(key),
            Store::Memory(s) => s.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        match self {
            Store::Sqlite(s) => s.set(key, value),
            Store::File(s) => s.set(key, value),
            Store::Memory(s) => s.set(key, value),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    telemetry::init_tracing();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    // Validation must run even when the configured catalogue would fail to load
    if let Commands::Validate { path } = &cli.command {
        return validate(cli.json, path.as_ref().or(config.catalogue.as_ref()));
    }

    let curriculum = match &config.catalogue {
        Some(path) => Curriculum::from_path(path)?,
        None => Curriculum::builtin()?,
    };
    let store = Store::open(&config)?;
    let location = store.location(&config);
    let progress = ProgressStore::with_key(store, config.progress_key.clone());

    match cli.command {
        Commands::Init => {
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Progress store ready at: {}", location);
            }
        }

        Commands::Chapters => {
            let summaries = progress.curriculum_summary(&curriculum);
            if cli.json {
                let rows: Vec<_> = curriculum
                    .get_all_chapters()
                    .iter()
                    .zip(&summaries)
                    .map(|(c, s)| {
                        serde_json::json!({
                            "id": c.id,
                            "level": c.level,
                            "title": c.title,
                            "subtitle": c.subtitle,
                            "days": c.days.len(),
                            "progress": s
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string(&JsonOutput::ok(rows))?);
            } else {
                println!("{:<10} {:<6} {:<40} {:<6} DONE", "ID", "LEVEL", "TITLE", "DAYS");
                println!("{}", "-".repeat(72));
                for (chapter, summary) in curriculum.get_all_chapters().iter().zip(&summaries) {
                    println!(
                        "{:<10} {:<6} {:<40} {:<6} {:.0}%",
                        chapter.id,
                        chapter.level,
                        truncate(&chapter.title, 38),
                        chapter.days.len(),
                        summary.percent()
                    );
                }
            }
        }

        Commands::Chapter { id } => {
            let Some(chapter) = curriculum.chapter(&id) else {
                return not_found(cli.json, "Chapter not found");
            };
            let all = progress.get_progress();

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "chapter": chapter,
                        "progress": progress.chapter_summary(chapter)
                    })))?
                );
            } else {
                println!("{} [{}]", chapter.title, chapter.level);
                println!("{}", chapter.subtitle);
                if let Some(book) = &chapter.reference_book {
                    println!("Reference: {} ({})", book.name, book.path);
                }
                for image in &chapter.reference_images {
                    println!("Image: {}", image);
                }
                println!();
                for day in &chapter.days {
                    let entry = all.get(&day_key(&chapter.id, day.day));
                    println!(
                        "Day {:<3} {:<40} {}",
                        day.day,
                        truncate(&day.title, 38),
                        skill_marks(entry)
                    );
                }
            }
        }

        Commands::Day {
            chapter,
            day,
            skill,
        } => {
            let skill = skill.as_deref().map(parse_skill).transpose()?;
            let Some(day_def) = curriculum.day(&chapter, day) else {
                return not_found(cli.json, "Day not found");
            };
            let done = progress.day_progress(&chapter, day);

            if cli.json {
                let data = match skill {
                    Some(s) => serde_json::json!({
                        "day": day_def.day,
                        "title": day_def.title,
                        "skill": s,
                        "activity": day_def.skills.get(s),
                        "progress": done
                    }),
                    None => serde_json::json!({ "day": day_def, "progress": done }),
                };
                println!("{}", serde_json::to_string(&JsonOutput::ok(data))?);
            } else {
                print_day(day_def, skill, &done);
            }
        }

        Commands::Check {
            chapter,
            day,
            skill,
            exercise,
            answer,
        } => {
            let skill = parse_skill(&skill)?;
            let Some(activity) = curriculum.activity(&chapter, day, skill) else {
                return not_found(cli.json, "Day not found");
            };
            let Some(ex) = exercise
                .checked_sub(1)
                .and_then(|i| activity.exercises.get(i))
            else {
                return not_found(cli.json, "Exercise not found");
            };

            let verdict = ex.check(&Response::parse_for(ex, &answer));
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&verdict))?);
            } else {
                if verdict.correct {
                    println!("Correct!");
                } else {
                    println!("Not quite. Expected: {}", verdict.expected);
                }
                if let Some(explanation) = &verdict.explanation {
                    println!("{}", explanation);
                }
            }
        }

        Commands::Done {
            chapter,
            day,
            skill,
        } => {
            let skill = parse_skill(&skill)?;
            if curriculum.day(&chapter, day).is_none() {
                return not_found(cli.json, "Day not found");
            }

            progress.try_mark_skill_done(&chapter, day, skill)?;

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(progress.day_progress(&chapter, day)))?
                );
            } else {
                println!("Marked {} done for {} day {}.", skill.label(), chapter, day);
                if progress.is_day_complete(&chapter, day) {
                    println!("Day {} complete!", day);
                }
            }
        }

        Commands::Progress => {
            let all = progress.get_progress();
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&all))?);
            } else if all.is_empty() {
                println!("No progress recorded yet.");
            } else {
                for (key, entry) in &all {
                    println!("{:<24} {}", key, skill_marks(Some(entry)));
                }
            }
        }

        Commands::Next => match progress.next_pending(&curriculum) {
            Some(pending) => {
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&pending))?);
                } else {
                    let title = curriculum
                        .day(&pending.chapter_id, pending.day)
                        .map(|d| d.title.as_str())
                        .unwrap_or("");
                    println!("=== Next Activity ===");
                    println!();
                    println!("Chapter: {}", pending.chapter_id);
                    println!("Day {}: {}", pending.day, title);
                    println!("Skill: {} {}", pending.skill.icon(), pending.skill.label());
                    println!();
                    println!("When finished, record it with:");
                    println!(
                        "  sprachtage done {} {} {}",
                        pending.chapter_id, pending.day, pending.skill
                    );
                }
            }
            None => {
                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
                } else {
                    println!("Everything is done. Herzlichen Glückwunsch!");
                }
            }
        },

        // Handled before the catalogue is loaded
        Commands::Validate { .. } => {}

        Commands::Stats => {
            let summaries = progress.curriculum_summary(&curriculum);
            let completed_days: usize = summaries.iter().map(|s| s.completed_days).sum();
            let completed_skills: usize = summaries.iter().map(|s| s.completed_skills).sum();
            let total_skills: usize = summaries.iter().map(|s| s.total_skills).sum();
            let completed_chapters = summaries.iter().filter(|s| s.is_complete()).count();
            let last_saved = progress.storage().last_saved(&config.progress_key);

            if cli.json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "chapters": curriculum.get_all_chapters().len(),
                        "completed_chapters": completed_chapters,
                        "days": curriculum.total_days(),
                        "completed_days": completed_days,
                        "skills": total_skills,
                        "completed_skills": completed_skills,
                        "exercises": curriculum.total_exercises(),
                        "last_saved": last_saved
                    })))?
                );
            } else {
                println!("=== Learning Statistics ===");
                println!(
                    "Chapters: {}/{} complete",
                    completed_chapters,
                    curriculum.get_all_chapters().len()
                );
                println!("Days: {}/{} complete", completed_days, curriculum.total_days());
                println!("Skills: {}/{} done", completed_skills, total_skills);
                println!("Exercises available: {}", curriculum.total_exercises());
                if let Some(ts) = last_saved {
                    println!("Last saved: {}", ts.format("%Y-%m-%d %H:%M UTC"));
                }
            }
        }
    }

    Ok(())
}

fn validate(json: bool, path: Option<&PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    use sprachtage::error::CatalogueError;

    let loaded = match path {
        Some(p) => Curriculum::from_path(p),
        None => Curriculum::builtin(),
    };

    match loaded {
        Ok(curriculum) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                        "chapters": curriculum.get_all_chapters().len(),
                        "days": curriculum.total_days(),
                        "exercises": curriculum.total_exercises()
                    })))?
                );
            } else {
                println!(
                    "Catalogue OK: {} chapters, {} days, {} exercises.",
                    curriculum.get_all_chapters().len(),
                    curriculum.total_days(),
                    curriculum.total_exercises()
                );
            }
            Ok(())
        }
        Err(CatalogueError::Invalid(issues)) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string(&JsonOutput {
                        success: false,
                        data: Some(&issues),
                        error: Some(format!("{} issue(s)", issues.len())),
                    })?
                );
            } else {
                for issue in &issues {
                    println!("{}", issue);
                }
            }
            Err(CatalogueError::Invalid(issues).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn not_found(json: bool, msg: &str) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(&JsonOutput::<()>::err(msg))?);
    } else {
        println!("{}.", msg);
    }
    Ok(())
}

fn parse_skill(s: &str) -> Result<SkillKey, String> {
    SkillKey::from_str(s).ok_or_else(|| {
        format!(
            "Invalid skill '{}'. Use: listening, speaking, reading, or writing",
            s
        )
    })
}

fn skill_marks(entry: Option<&DayProgress>) -> String {
    SkillKey::ALL
        .iter()
        .map(|s| {
            let done = entry
                .and_then(|e| e.get(s))
                .copied()
                .unwrap_or(false);
            format!("{}{}", s.icon(), if done { "✓" } else { "·" })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_day(day: &DayDef, only: Option<SkillKey>, done: &DayProgress) {
    println!("=== Day {}: {} ===", day.day, day.title);
    for (skill, activity) in day.skills.iter() {
        if only.is_some_and(|o| o != skill) {
            continue;
        }
        let mark = if done.get(&skill).copied().unwrap_or(false) {
            " (done)"
        } else {
            ""
        };
        println!();
        println!("{} {}{}", skill.icon(), skill.label(), mark);
        print_activity(activity);
    }
}

fn print_activity(activity: &SkillActivity) {
    println!("{}", activity.instruction);
    println!();
    println!("{}", activity.content);
    if let Some(audio) = &activity.audio_path {
        println!("Audio: {}", audio);
    }
    for extra in &activity.extra_audio {
        println!("Audio ({}): {}", extra.label, extra.path);
    }
    for (i, ex) in activity.exercises.iter().enumerate() {
        println!();
        println!("  {}. [{}] {}", i + 1, ex.answer.type_name(), ex.question);
        for (j, option) in ex.answer.options().iter().enumerate() {
            println!("     {}) {}", j + 1, option);
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    mod truncate_tests {
        use super::*;

        #[test]
        fn truncate_short_string() {
            assert_eq!(truncate("hello", 10), "hello");
        }

        #[test]
        fn truncate_exact_length() {
            assert_eq!(truncate("hello", 5), "hello");
        }

        #[test]
        fn truncate_long_string() {
            assert_eq!(truncate("hello world", 8), "hello...");
        }

        #[test]
        fn truncate_multibyte() {
            assert_eq!(truncate("Grüße aus München", 8), "Grüße...");
        }

        #[test]
        fn truncate_empty_string() {
            assert_eq!(truncate("", 10), "");
        }
    }

    mod skill_tests {
        use super::*;

        #[test]
        fn parse_skill_valid() {
            assert_eq!(parse_skill("reading").unwrap(), SkillKey::Reading);
        }

        #[test]
        fn parse_skill_invalid_lists_choices() {
            let err = parse_skill("grammar").unwrap_err();
            assert!(err.contains("listening, speaking, reading, or writing"));
        }

        #[test]
        fn marks_without_entry() {
            assert_eq!(skill_marks(None), "🎧· 🗣️· 📖· ✍️·");
        }

        #[test]
        fn marks_with_entry() {
            let mut entry = DayProgress::new();
            entry.insert(SkillKey::Speaking, true);
            entry.insert(SkillKey::Writing, false);
            assert_eq!(skill_marks(Some(&entry)), "🎧· 🗣️✓ 📖· ✍️·");
        }
    }

    mod store_tests {
        use super::*;

        #[test]
        fn memory_backend_opens() {
            let config = Config {
                store: StoreBackend::Memory,
                ..Config::default()
            };
            let store = Store::open(&config).unwrap();
            assert_eq!(store.location(&config), "memory");
            assert!(store.last_saved("k").is_none());
        }

        #[test]
        fn sqlite_backend_creates_database() {
            let dir = tempfile::tempdir().unwrap();
            let config = Config {
                store: StoreBackend::Sqlite,
                data_dir: dir.path().join("nested"),
                ..Config::default()
            };
            let store = Store::open(&config).unwrap();
            assert!(config.database_path().exists());

            let progress = ProgressStore::new(store);
            progress.mark_skill_done("a1_ch1", 1, SkillKey::Reading);
            assert!(progress.storage().last_saved(sprachtage::PROGRESS_KEY).is_some());
        }

        #[test]
        fn file_backend_round_trips() {
            let dir = tempfile::tempdir().unwrap();
            let config = Config {
                store: StoreBackend::File,
                data_dir: dir.path().to_path_buf(),
                ..Config::default()
            };
            let progress = ProgressStore::new(Store::open(&config).unwrap());
            progress.mark_skill_done("a1_ch1", 2, SkillKey::Listening);
            assert!(progress.is_skill_done("a1_ch1", 2, SkillKey::Listening));
        }
    }

    mod cli_parsing_tests {
        use super::*;

        #[test]
        fn parse_init_command() {
            let cli = Cli::try_parse_from(["sprachtage", "init"]).unwrap();
            assert!(!cli.json);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_init_with_json() {
            let cli = Cli::try_parse_from(["sprachtage", "--json", "init"]).unwrap();
            assert!(cli.json);
            assert!(matches!(cli.command, Commands::Init));
        }

        #[test]
        fn parse_chapter() {
            let cli = Cli::try_parse_from(["sprachtage", "chapter", "a1_ch1"]).unwrap();
            match cli.command {
                Commands::Chapter { id } => assert_eq!(id, "a1_ch1"),
                _ => panic!("Expected Chapter command"),
            }
        }

        #[test]
        fn parse_day_with_skill_short() {
            let cli = Cli::try_parse_from(["sprachtage", "day", "a1_ch1", "2", "-s", "reading"])
                .unwrap();
            match cli.command {
                Commands::Day {
                    chapter,
                    day,
                    skill,
                } => {
                    assert_eq!(chapter, "a1_ch1");
                    assert_eq!(day, 2);
                    assert_eq!(skill, Some("reading".to_string()));
                }
                _ => panic!("Expected Day command"),
            }
        }

        #[test]
        fn parse_day_rejects_non_numeric_day() {
            let result = Cli::try_parse_from(["sprachtage", "day", "a1_ch1", "two"]);
            assert!(result.is_err());
        }

        #[test]
        fn parse_check() {
            let cli = Cli::try_parse_from([
                "sprachtage",
                "check",
                "a1_ch1",
                "1",
                "writing",
                "2",
                "Ich heiße Anna",
            ])
            .unwrap();
            match cli.command {
                Commands::Check {
                    chapter,
                    day,
                    skill,
                    exercise,
                    answer,
                } => {
                    assert_eq!(chapter, "a1_ch1");
                    assert_eq!(day, 1);
                    assert_eq!(skill, "writing");
                    assert_eq!(exercise, 2);
                    assert_eq!(answer, "Ich heiße Anna");
                }
                _ => panic!("Expected Check command"),
            }
        }

        #[test]
        fn parse_done_with_json() {
            let cli = Cli::try_parse_from(["sprachtage", "done", "a1_ch1", "1", "listening", "--json"])
                .unwrap();
            assert!(cli.json);
            match cli.command {
                Commands::Done {
                    chapter,
                    day,
                    skill,
                } => {
                    assert_eq!(chapter, "a1_ch1");
                    assert_eq!(day, 1);
                    assert_eq!(skill, "listening");
                }
                _ => panic!("Expected Done command"),
            }
        }

        #[test]
        fn parse_done_missing_skill() {
            let result = Cli::try_parse_from(["sprachtage", "done", "a1_ch1", "1"]);
            assert!(result.is_err());
        }

        #[test]
        fn parse_validate_with_path() {
            let cli = Cli::try_parse_from(["sprachtage", "validate", "content.json"]).unwrap();
            match cli.command {
                Commands::Validate { path } => {
                    assert_eq!(path, Some(PathBuf::from("content.json")))
                }
                _ => panic!("Expected Validate command"),
            }
        }

        #[test]
        fn parse_commands_without_arguments() {
            let parse = |arg| Cli::try_parse_from(["sprachtage", arg]).unwrap().command;
            assert!(matches!(parse("chapters"), Commands::Chapters));
            assert!(matches!(parse("progress"), Commands::Progress));
            assert!(matches!(parse("next"), Commands::Next));
            assert!(matches!(parse("stats"), Commands::Stats));
            assert!(matches!(parse("validate"), Commands::Validate { path: None }));
        }

        #[test]
        fn parse_unknown_command_fails() {
            assert!(Cli::try_parse_from(["sprachtage", "reset"]).is_err());
        }
    }
}
