//! Sprachtage: a chapter/day/skill language curriculum with persistent
//! completion tracking.
//!
//! - [`catalogue`]: the ordered, validated, read-only course content
//! - [`grading`]: answer checking for exercises
//! - [`progress`]: per-day, per-skill completion flags over an injected store
//! - [`storage`]: SQLite, file and in-memory key-value backends

pub mod catalogue;
pub mod config;
pub mod error;
pub mod grading;
pub mod models;
pub mod progress;
pub mod storage;
pub mod telemetry;

pub use catalogue::Curriculum;
pub use error::{CatalogueError, ConfigError, StorageError};
pub use grading::{Response, Verdict};
pub use models::{ChapterDef, DayDef, Exercise, SkillActivity, SkillKey};
pub use progress::{ProgressStore, PROGRESS_KEY};
