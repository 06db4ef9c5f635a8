//! The ordered, read-only curriculum: chapters, their days and the four
//! skill activities per day.
//!
//! The built-in content is compiled into the binary from
//! `data/curriculum.json`. An external document in the same format can be
//! loaded instead. Either way the catalogue is validated once on load and
//! never mutated afterwards.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::error::CatalogueError;
use crate::models::{AnswerKey, ChapterDef, DayDef, SkillActivity, SkillKey};

const BUILTIN_CURRICULUM: &str = include_str!("../data/curriculum.json");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Curriculum {
    chapters: Vec<ChapterDef>,
}

/// A content problem found while validating a catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    /// Where the problem is, e.g. `a1_ch1/day2/reading/exercise3`
    pub location: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl Curriculum {
    /// Load the content shipped with the application.
    pub fn builtin() -> Result<Self, CatalogueError> {
        Self::from_json(BUILTIN_CURRICULUM)
    }

    #[instrument(level = "debug", skip(json), fields(len = json.len()))]
    pub fn from_json(json: &str) -> Result<Self, CatalogueError> {
        let chapters: Vec<ChapterDef> = serde_json::from_str(json)?;
        Self::new(chapters)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogueError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogueError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let curriculum = Self::from_json(&json)?;
        info!(path = %path.display(), chapters = curriculum.chapters.len(), "Loaded external catalogue");
        Ok(curriculum)
    }

    /// Build a catalogue from chapter definitions, rejecting invalid content.
    pub fn new(chapters: Vec<ChapterDef>) -> Result<Self, CatalogueError> {
        let issues = validate_chapters(&chapters);
        if !issues.is_empty() {
            return Err(CatalogueError::Invalid(issues));
        }
        debug!(chapters = chapters.len(), "Catalogue validated");
        Ok(Self { chapters })
    }

    pub fn get_all_chapters(&self) -> &[ChapterDef] {
        &self.chapters
    }

    pub fn chapter(&self, id: &str) -> Option<&ChapterDef> {
        self.chapters.iter().find(|c| c.id == id)
    }

    pub fn day(&self, chapter_id: &str, day: u32) -> Option<&DayDef> {
        self.chapter(chapter_id)?.day(day)
    }

    pub fn activity(&self, chapter_id: &str, day: u32, skill: SkillKey) -> Option<&SkillActivity> {
        self.day(chapter_id, day).map(|d| d.skills.get(skill))
    }

    pub fn total_days(&self) -> usize {
        self.chapters.iter().map(|c| c.days.len()).sum()
    }

    pub fn total_exercises(&self) -> usize {
        self.chapters
            .iter()
            .flat_map(|c| &c.days)
            .flat_map(|d| d.skills.iter())
            .map(|(_, a)| a.exercises.len())
            .sum()
    }

    pub fn validate(&self) -> Vec<ValidationIssue> {
        validate_chapters(&self.chapters)
    }
}

pub fn validate_chapters(chapters: &[ChapterDef]) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let mut seen_ids = HashSet::new();

    for chapter in chapters {
        if chapter.id.trim().is_empty() {
            issues.push(ValidationIssue::new(
                format!("chapter '{}'", chapter.title),
                "chapter id is empty",
            ));
        } else if !seen_ids.insert(chapter.id.as_str()) {
            issues.push(ValidationIssue::new(&chapter.id, "duplicate chapter id"));
        }

        if chapter.days.is_empty() {
            issues.push(ValidationIssue::new(&chapter.id, "chapter has no days"));
        }

        for (idx, day) in chapter.days.iter().enumerate() {
            let expected = idx as u32 + 1;
            let day_loc = format!("{}/day{}", chapter.id, day.day);
            if day.day != expected {
                issues.push(ValidationIssue::new(
                    &day_loc,
                    format!("day number out of sequence (expected {})", expected),
                ));
            }

            for (skill, activity) in day.skills.iter() {
                for (ex_idx, exercise) in activity.exercises.iter().enumerate() {
                    let loc = format!("{}/{}/exercise{}", day_loc, skill, ex_idx + 1);
                    validate_answer_key(&exercise.answer, &loc, &mut issues);
                }
            }
        }
    }

    issues
}

fn validate_answer_key(key: &AnswerKey, loc: &str, issues: &mut Vec<ValidationIssue>) {
    match key {
        AnswerKey::MultipleChoice {
            options,
            correct_answer,
        }
        | AnswerKey::TrueFalse {
            options,
            correct_answer,
        } => {
            if options.is_empty() {
                issues.push(ValidationIssue::new(loc, "choice exercise has no options"));
            } else if *correct_answer >= options.len() {
                issues.push(ValidationIssue::new(
                    loc,
                    format!(
                        "correct answer index {} out of range for {} options",
                        correct_answer,
                        options.len()
                    ),
                ));
            }
        }
        AnswerKey::TextInput { correct_answer, .. } | AnswerKey::FillBlank { correct_answer, .. } => {
            if correct_answer.trim().is_empty() {
                issues.push(ValidationIssue::new(loc, "correct answer is empty"));
            }
        }
        AnswerKey::Ordering {
            options,
            correct_answer,
            ..
        } => {
            if options.is_empty() {
                issues.push(ValidationIssue::new(loc, "ordering exercise has no items"));
            }
            if correct_answer.trim().is_empty() {
                issues.push(ValidationIssue::new(loc, "correct answer is empty"));
            }
        }
    }
}
