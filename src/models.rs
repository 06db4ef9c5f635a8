//! Curriculum content types (skills, exercises, activities, days, chapters),
//! the progress map shape, and the CLI's JSON output wrapper.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// The four learning modalities every day covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillKey {
    Listening,
    Speaking,
    Reading,
    Writing,
}

impl SkillKey {
    pub const ALL: [SkillKey; 4] = [
        SkillKey::Listening,
        SkillKey::Speaking,
        SkillKey::Reading,
        SkillKey::Writing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkillKey::Listening => "listening",
            SkillKey::Speaking => "speaking",
            SkillKey::Reading => "reading",
            SkillKey::Writing => "writing",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SkillKey::Listening => "Listening",
            SkillKey::Speaking => "Speaking",
            SkillKey::Reading => "Reading",
            SkillKey::Writing => "Writing",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            SkillKey::Listening => "🎧",
            SkillKey::Speaking => "🗣️",
            SkillKey::Reading => "📖",
            SkillKey::Writing => "✍️",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "listening" | "listen" | "l" => Some(SkillKey::Listening),
            "speaking" | "speak" | "s" => Some(SkillKey::Speaking),
            "reading" | "read" | "r" => Some(SkillKey::Reading),
            "writing" | "write" | "w" => Some(SkillKey::Writing),
            _ => None,
        }
    }
}

impl std::fmt::Display for SkillKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// === Exercises ===

/// A single gradable prompt attached to a skill activity.
///
/// The answer representation is tied to the exercise type: choice-style
/// exercises carry an option index, text-style exercises carry the expected
/// string plus any accepted alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub question: String,
    #[serde(flatten)]
    pub answer: AnswerKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AnswerKey {
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        options: Vec<String>,
        correct_answer: usize,
    },
    #[serde(rename_all = "camelCase")]
    TrueFalse {
        #[serde(default = "default_true_false_options")]
        options: Vec<String>,
        correct_answer: usize,
    },
    #[serde(rename_all = "camelCase")]
    TextInput {
        correct_answer: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        acceptable_answers: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    FillBlank {
        correct_answer: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        acceptable_answers: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Ordering {
        options: Vec<String>,
        correct_answer: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        acceptable_answers: Vec<String>,
    },
}

fn default_true_false_options() -> Vec<String> {
    vec!["Richtig".to_string(), "Falsch".to_string()]
}

impl AnswerKey {
    pub fn type_name(&self) -> &'static str {
        match self {
            AnswerKey::MultipleChoice { .. } => "multiple-choice",
            AnswerKey::TrueFalse { .. } => "true-false",
            AnswerKey::TextInput { .. } => "text-input",
            AnswerKey::FillBlank { .. } => "fill-blank",
            AnswerKey::Ordering { .. } => "ordering",
        }
    }

    /// Option list shown to the learner; empty for free-text exercises.
    pub fn options(&self) -> &[String] {
        match self {
            AnswerKey::MultipleChoice { options, .. }
            | AnswerKey::TrueFalse { options, .. }
            | AnswerKey::Ordering { options, .. } => options,
            AnswerKey::TextInput { .. } | AnswerKey::FillBlank { .. } => &[],
        }
    }

    pub fn is_index_answer(&self) -> bool {
        matches!(
            self,
            AnswerKey::MultipleChoice { .. } | AnswerKey::TrueFalse { .. }
        )
    }
}

// === Content ===

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraAudio {
    pub label: String,
    pub path: String,
}

/// Content for one skill on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "SkillActivityRecord")]
pub struct SkillActivity {
    pub instruction: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exercises: Vec<Exercise>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_audio: Vec<ExtraAudio>,
}

// On-disk shape, still accepting the single question/answer pair older
// content used before exercise lists existed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SkillActivityRecord {
    instruction: String,
    content: String,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    exercises: Vec<Exercise>,
    #[serde(default)]
    audio_path: Option<String>,
    #[serde(default)]
    extra_audio: Vec<ExtraAudio>,
}

impl From<SkillActivityRecord> for SkillActivity {
    fn from(rec: SkillActivityRecord) -> Self {
        let mut exercises = rec.exercises;
        if exercises.is_empty() {
            if let (Some(question), Some(answer)) = (rec.question, rec.answer) {
                exercises.push(Exercise {
                    question,
                    answer: AnswerKey::TextInput {
                        correct_answer: answer,
                        acceptable_answers: vec![],
                    },
                    explanation: None,
                });
            }
        }

        Self {
            instruction: rec.instruction,
            content: rec.content,
            exercises,
            audio_path: rec.audio_path,
            extra_audio: rec.extra_audio,
        }
    }
}

/// Exactly one activity per skill; a day cannot be missing one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaySkills {
    pub listening: SkillActivity,
    pub speaking: SkillActivity,
    pub reading: SkillActivity,
    pub writing: SkillActivity,
}

impl DaySkills {
    pub fn get(&self, skill: SkillKey) -> &SkillActivity {
        match skill {
            SkillKey::Listening => &self.listening,
            SkillKey::Speaking => &self.speaking,
            SkillKey::Reading => &self.reading,
            SkillKey::Writing => &self.writing,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SkillKey, &SkillActivity)> + '_ {
        SkillKey::ALL.into_iter().map(move |skill| (skill, self.get(skill)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayDef {
    pub day: u32,
    pub title: String,
    pub skills: DaySkills,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceBook {
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterDef {
    pub id: String,
    pub level: String,
    pub title: String,
    pub subtitle: String,
    pub days: Vec<DayDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_book: Option<ReferenceBook>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reference_images: Vec<String>,
}

impl ChapterDef {
    pub fn day(&self, day: u32) -> Option<&DayDef> {
        self.days.iter().find(|d| d.day == day)
    }
}

// === Progress ===

pub type DayProgress = BTreeMap<SkillKey, bool>;
pub type ProgressMap = BTreeMap<String, DayProgress>;

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activity_json() -> serde_json::Value {
        json!({
            "instruction": "Hör zu.",
            "content": "Hallo!"
        })
    }

    mod skill_key_tests {
        use super::*;

        #[test]
        fn all_lists_four_skills_in_order() {
            let names: Vec<_> = SkillKey::ALL.iter().map(|s| s.as_str()).collect();
            assert_eq!(names, vec!["listening", "speaking", "reading", "writing"]);
        }

        #[test]
        fn from_str_valid() {
            assert_eq!(SkillKey::from_str("listening"), Some(SkillKey::Listening));
            assert_eq!(SkillKey::from_str("SPEAKING"), Some(SkillKey::Speaking));
            assert_eq!(SkillKey::from_str("r"), Some(SkillKey::Reading));
            assert_eq!(SkillKey::from_str(" write "), Some(SkillKey::Writing));
        }

        #[test]
        fn from_str_invalid() {
            assert_eq!(SkillKey::from_str("grammar"), None);
            assert_eq!(SkillKey::from_str(""), None);
        }

        #[test]
        fn serializes_lowercase() {
            assert_eq!(serde_json::to_string(&SkillKey::Reading).unwrap(), "\"reading\"");
        }

        #[test]
        fn labels_and_icons_are_distinct() {
            let labels: std::collections::HashSet<_> =
                SkillKey::ALL.iter().map(|s| s.label()).collect();
            let icons: std::collections::HashSet<_> =
                SkillKey::ALL.iter().map(|s| s.icon()).collect();
            assert_eq!(labels.len(), 4);
            assert_eq!(icons.len(), 4);
        }
    }

    mod exercise_tests {
        use super::*;

        #[test]
        fn multiple_choice_deserializes() {
            let ex: Exercise = serde_json::from_value(json!({
                "type": "multiple-choice",
                "question": "Was heißt 'hello'?",
                "options": ["Tschüss", "Hallo"],
                "correctAnswer": 1,
                "explanation": "Hallo = hello"
            }))
            .unwrap();
            assert_eq!(ex.question, "Was heißt 'hello'?");
            assert_eq!(ex.explanation.as_deref(), Some("Hallo = hello"));
            assert_eq!(
                ex.answer,
                AnswerKey::MultipleChoice {
                    options: vec!["Tschüss".into(), "Hallo".into()],
                    correct_answer: 1,
                }
            );
        }

        #[test]
        fn text_input_with_acceptable_answers() {
            let ex: Exercise = serde_json::from_value(json!({
                "type": "text-input",
                "question": "Yes?",
                "correctAnswer": "ja",
                "acceptableAnswers": ["Ja", "ja."]
            }))
            .unwrap();
            match ex.answer {
                AnswerKey::TextInput {
                    correct_answer,
                    acceptable_answers,
                } => {
                    assert_eq!(correct_answer, "ja");
                    assert_eq!(acceptable_answers, vec!["Ja", "ja."]);
                }
                other => panic!("Expected text input, got {:?}", other),
            }
        }

        #[test]
        fn true_false_defaults_options() {
            let ex: Exercise = serde_json::from_value(json!({
                "type": "true-false",
                "question": "Berlin ist in Deutschland.",
                "correctAnswer": 0
            }))
            .unwrap();
            assert_eq!(ex.answer.options(), &["Richtig", "Falsch"]);
            assert!(ex.answer.is_index_answer());
        }

        #[test]
        fn index_answer_must_be_a_number() {
            let result: Result<Exercise, _> = serde_json::from_value(json!({
                "type": "multiple-choice",
                "question": "?",
                "options": ["a"],
                "correctAnswer": "a"
            }));
            assert!(result.is_err());
        }

        #[test]
        fn unknown_type_rejected() {
            let result: Result<Exercise, _> = serde_json::from_value(json!({
                "type": "matching",
                "question": "?",
                "correctAnswer": "a"
            }));
            assert!(result.is_err());
        }

        #[test]
        fn serializes_with_type_tag() {
            let ex = Exercise {
                question: "Ordne.".into(),
                answer: AnswerKey::Ordering {
                    options: vec!["heiße".into(), "Ich".into(), "Anna".into()],
                    correct_answer: "Ich heiße Anna".into(),
                    acceptable_answers: vec![],
                },
                explanation: None,
            };
            let value = serde_json::to_value(&ex).unwrap();
            assert_eq!(value["type"], "ordering");
            assert_eq!(value["correctAnswer"], "Ich heiße Anna");
            assert!(value.get("acceptableAnswers").is_none());
            assert!(value.get("explanation").is_none());
        }

        #[test]
        fn type_names_match_tags() {
            let key = AnswerKey::FillBlank {
                correct_answer: "bin".into(),
                acceptable_answers: vec![],
            };
            let value = serde_json::to_value(&key).unwrap();
            assert_eq!(value["type"], key.type_name());
            assert!(key.options().is_empty());
            assert!(!key.is_index_answer());
        }
    }

    mod activity_tests {
        use super::*;

        #[test]
        fn minimal_activity() {
            let a: SkillActivity = serde_json::from_value(activity_json()).unwrap();
            assert!(a.exercises.is_empty());
            assert!(a.audio_path.is_none());
            assert!(a.extra_audio.is_empty());
        }

        #[test]
        fn legacy_question_migrates_to_exercise() {
            let a: SkillActivity = serde_json::from_value(json!({
                "instruction": "Schreib.",
                "content": "…",
                "question": "Wie heißt du?",
                "answer": "Ich heiße Anna"
            }))
            .unwrap();
            assert_eq!(a.exercises.len(), 1);
            assert_eq!(a.exercises[0].question, "Wie heißt du?");
            assert_eq!(a.exercises[0].answer.type_name(), "text-input");
        }

        #[test]
        fn legacy_question_ignored_when_exercises_present() {
            let a: SkillActivity = serde_json::from_value(json!({
                "instruction": "Schreib.",
                "content": "…",
                "question": "old",
                "answer": "old",
                "exercises": [{
                    "type": "fill-blank",
                    "question": "Ich ___ Anna.",
                    "correctAnswer": "heiße"
                }]
            }))
            .unwrap();
            assert_eq!(a.exercises.len(), 1);
            assert_eq!(a.exercises[0].question, "Ich ___ Anna.");
        }

        #[test]
        fn legacy_question_without_answer_is_dropped() {
            let a: SkillActivity = serde_json::from_value(json!({
                "instruction": "Schreib.",
                "content": "…",
                "question": "Wie heißt du?"
            }))
            .unwrap();
            assert!(a.exercises.is_empty());
        }

        #[test]
        fn audio_fields_roundtrip_names() {
            let a: SkillActivity = serde_json::from_value(json!({
                "instruction": "Hör zu.",
                "content": "Dialog",
                "audioPath": "audio/a1_ch1/day1.mp3",
                "extraAudio": [{"label": "Langsam", "path": "audio/a1_ch1/day1_slow.mp3"}]
            }))
            .unwrap();
            assert_eq!(a.audio_path.as_deref(), Some("audio/a1_ch1/day1.mp3"));
            assert_eq!(a.extra_audio[0].label, "Langsam");

            let value = serde_json::to_value(&a).unwrap();
            assert_eq!(value["audioPath"], "audio/a1_ch1/day1.mp3");
            assert!(value.get("question").is_none());
        }
    }

    mod day_tests {
        use super::*;

        fn skills_json() -> serde_json::Value {
            json!({
                "listening": activity_json(),
                "speaking": activity_json(),
                "reading": activity_json(),
                "writing": activity_json()
            })
        }

        #[test]
        fn day_requires_all_four_skills() {
            let mut skills = skills_json();
            skills.as_object_mut().unwrap().remove("writing");
            let result: Result<DayDef, _> = serde_json::from_value(json!({
                "day": 1,
                "title": "Hallo",
                "skills": skills
            }));
            assert!(result.is_err());
        }

        #[test]
        fn day_rejects_extra_skills() {
            let mut skills = skills_json();
            skills
                .as_object_mut()
                .unwrap()
                .insert("grammar".into(), activity_json());
            let result: Result<DayDef, _> = serde_json::from_value(json!({
                "day": 1,
                "title": "Hallo",
                "skills": skills
            }));
            assert!(result.is_err());
        }

        #[test]
        fn iter_yields_every_skill_once() {
            let day: DayDef = serde_json::from_value(json!({
                "day": 1,
                "title": "Hallo",
                "skills": skills_json()
            }))
            .unwrap();
            let keys: Vec<_> = day.skills.iter().map(|(k, _)| k).collect();
            assert_eq!(keys, SkillKey::ALL.to_vec());
        }
    }

    mod json_output_tests {
        use super::*;

        #[test]
        fn json_output_ok() {
            let output = JsonOutput::ok("test data");
            assert!(output.success);
            assert_eq!(output.data, Some("test data"));
            assert!(output.error.is_none());
        }

        #[test]
        fn json_output_err() {
            let output: JsonOutput<()> = JsonOutput::err("Something failed");
            assert!(!output.success);
            assert!(output.data.is_none());
            assert_eq!(output.error, Some("Something failed".to_string()));
        }
    }
}
