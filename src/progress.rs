//! Per-day, per-skill completion flags.
//!
//! The whole progress map lives in a single storage entry as JSON:
//! `{"<chapterId>_day<n>": {"listening": true, ...}}`. Reads fail soft: an
//! unparseable blob is an empty map, and entries or skills that are not
//! recognised are skipped one at a time (and kept on write). Every mark is a
//! full read-merge-write of that entry, which is not atomic: two writers
//! racing on the same store can lose an update.

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::catalogue::Curriculum;
use crate::error::StorageError;
use crate::models::{ChapterDef, DayProgress, ProgressMap, SkillKey};
use crate::storage::KeyValueStore;

pub const PROGRESS_KEY: &str = "sprachtage_progress";

pub fn day_key(chapter_id: &str, day: u32) -> String {
    format!("{}_day{}", chapter_id, day)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterSummary {
    pub chapter_id: String,
    pub completed_days: usize,
    pub total_days: usize,
    pub completed_skills: usize,
    pub total_skills: usize,
}

impl ChapterSummary {
    pub fn percent(&self) -> f64 {
        if self.total_skills == 0 {
            0.0
        } else {
            (self.completed_skills as f64 / self.total_skills as f64) * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total_skills > 0 && self.completed_skills == self.total_skills
    }
}

/// The first activity in curriculum order that is not yet done.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingActivity {
    pub chapter_id: String,
    pub day: u32,
    pub skill: SkillKey,
}

pub struct ProgressStore<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStore> ProgressStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, PROGRESS_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Everything recorded so far. Missing, unreadable or malformed data
    /// yields an empty map.
    #[instrument(level = "debug", skip(self), fields(key = %self.key))]
    pub fn get_progress(&self) -> ProgressMap {
        self.read_raw()
            .into_iter()
            .filter_map(|(key, entry)| day_entry(&entry).map(|day| (key, day)))
            .collect()
    }

    // The stored object as-is. Entries this version does not understand are
    // kept so a later write carries them forward untouched.
    fn read_raw(&self) -> Map<String, Value> {
        let raw = match self.storage.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Map::new(),
            Err(e) => {
                warn!(error = %e, "Progress unreadable; treating as empty");
                return Map::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!("Stored progress is not an object; treating as empty");
                Map::new()
            }
            Err(e) => {
                warn!(error = %e, "Stored progress is malformed; treating as empty");
                Map::new()
            }
        }
    }

    /// Record a skill as done. Write failures are logged and swallowed.
    pub fn mark_skill_done(&self, chapter_id: &str, day: u32, skill: SkillKey) {
        if let Err(e) = self.try_mark_skill_done(chapter_id, day, skill) {
            warn!(error = %e, chapter_id, day, %skill, "Failed to save progress");
        }
    }

    /// Record a skill as done, reporting a failed write.
    #[instrument(level = "debug", skip(self), fields(key = %self.key))]
    pub fn try_mark_skill_done(
        &self,
        chapter_id: &str,
        day: u32,
        skill: SkillKey,
    ) -> Result<(), StorageError> {
        let mut progress = self.read_raw();
        let entry = progress
            .entry(day_key(chapter_id, day))
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(skills) = entry {
            skills.insert(skill.as_str().to_string(), Value::Bool(true));
        }

        let json = serde_json::to_string(&progress)?;
        self.storage.set(&self.key, &json)?;
        debug!(entries = progress.len(), "Progress saved");
        Ok(())
    }

    pub fn day_progress(&self, chapter_id: &str, day: u32) -> DayProgress {
        self.get_progress()
            .remove(&day_key(chapter_id, day))
            .unwrap_or_default()
    }

    pub fn is_skill_done(&self, chapter_id: &str, day: u32, skill: SkillKey) -> bool {
        is_done(&self.day_progress(chapter_id, day), skill)
    }

    pub fn is_day_complete(&self, chapter_id: &str, day: u32) -> bool {
        day_complete(&self.day_progress(chapter_id, day))
    }

    pub fn chapter_summary(&self, chapter: &ChapterDef) -> ChapterSummary {
        summarize(chapter, &self.get_progress())
    }

    /// Summaries for every chapter, reading storage once.
    pub fn curriculum_summary(&self, curriculum: &Curriculum) -> Vec<ChapterSummary> {
        let progress = self.get_progress();
        curriculum
            .get_all_chapters()
            .iter()
            .map(|c| summarize(c, &progress))
            .collect()
    }

    pub fn next_pending(&self, curriculum: &Curriculum) -> Option<PendingActivity> {
        let progress = self.get_progress();
        for chapter in curriculum.get_all_chapters() {
            for day in &chapter.days {
                let entry = progress.get(&day_key(&chapter.id, day.day));
                for skill in SkillKey::ALL {
                    if !entry.is_some_and(|p| is_done(p, skill)) {
                        return Some(PendingActivity {
                            chapter_id: chapter.id.clone(),
                            day: day.day,
                            skill,
                        });
                    }
                }
            }
        }
        None
    }
}

// Known skills with boolean flags; anything else in the entry is skipped.
fn day_entry(entry: &Value) -> Option<DayProgress> {
    let skills = entry.as_object()?;
    Some(
        skills
            .iter()
            .filter_map(|(name, flag)| Some((skill_from_key(name)?, flag.as_bool()?)))
            .collect(),
    )
}

fn skill_from_key(name: &str) -> Option<SkillKey> {
    SkillKey::ALL.into_iter().find(|s| s.as_str() == name)
}

fn is_done(day: &DayProgress, skill: SkillKey) -> bool {
    day.get(&skill).copied().unwrap_or(false)
}

fn day_complete(day: &DayProgress) -> bool {
    SkillKey::ALL.iter().all(|s| is_done(day, *s))
}

fn summarize(chapter: &ChapterDef, progress: &ProgressMap) -> ChapterSummary {
    let mut completed_days = 0;
    let mut completed_skills = 0;

    for day in &chapter.days {
        if let Some(entry) = progress.get(&day_key(&chapter.id, day.day)) {
            completed_skills += SkillKey::ALL.iter().filter(|s| is_done(entry, **s)).count();
            if day_complete(entry) {
                completed_days += 1;
            }
        }
    }

    ChapterSummary {
        chapter_id: chapter.id.clone(),
        completed_days,
        total_days: chapter.days.len(),
        completed_skills,
        total_skills: chapter.days.len() * SkillKey::ALL.len(),
    }
}
