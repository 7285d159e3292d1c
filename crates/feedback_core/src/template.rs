//! crates/feedback_core/src/template.rs
//!
//! Maps a remote survey template onto draft competency blocks.

use crate::domain::{CompetencyBlock, Question, QuestionType, RemoteTemplate};
use std::collections::HashMap;

const UNNAMED_COMPETENCY: &str = "General";

/// Template question types that carry an agreement scale.
const SCALE_MARKERS: [&str; 4] = ["likert", "agree", "rating", "scale"];

/// Likert-like template types become rating-scale questions; everything else
/// is mapped to open-ended.
pub fn map_question_type(raw: &str) -> QuestionType {
    let raw = raw.to_ascii_lowercase();
    if SCALE_MARKERS.iter().any(|marker| raw.contains(marker)) {
        QuestionType::RatingScale
    } else {
        QuestionType::OpenEnded
    }
}

/// Groups template questions into one block per competency name, keeping the
/// order in which each competency first appears.
pub fn blocks_from_template(template: &RemoteTemplate) -> Vec<CompetencyBlock> {
    let mut blocks: Vec<CompetencyBlock> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    for item in &template.questions {
        let text = item.text.trim();
        if text.is_empty() {
            continue;
        }
        let competency = match item.competency.trim() {
            "" => UNNAMED_COMPETENCY,
            name => name,
        };

        let index = *index_by_name
            .entry(competency.to_ascii_lowercase())
            .or_insert_with(|| {
                blocks.push(CompetencyBlock {
                    survey_name: template.name.clone(),
                    competency: competency.to_string(),
                    description: String::new(),
                    questions: Vec::new(),
                });
                blocks.len() - 1
            });

        let block = &mut blocks[index];
        if block.description.is_empty() {
            block.description = item.description.trim().to_string();
        }
        block
            .questions
            .push(Question::new(text, map_question_type(&item.kind)));
    }

    blocks
}
