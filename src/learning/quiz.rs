//! Quiz grading.

use crate::course::Quiz;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizResult {
    pub score_percent: u8,
    pub passed: bool,
    pub answered: usize,
    pub total: usize,
    /// Every question; unanswered ones count as incorrect.
    pub per_question_correct: BTreeMap<String, bool>,
    pub correct_answers: BTreeMap<String, usize>,
}

/// Score = correct / total questions, rounded half up to a whole percent, passed
/// when `score_percent >= pass_threshold`.
///
/// Answers naming a question the quiz does not have are rejected.
pub fn grade_quiz(
    quiz: &Quiz,
    answers: &BTreeMap<String, usize>,
    pass_threshold: u8,
) -> Result<QuizResult, ApiError> {
    if let Some(unknown) = answers.keys().find(|id| quiz.question(id).is_none()) {
        return Err(ApiError::QuestionNotFound(unknown.clone()));
    }

    let mut per_question_correct = BTreeMap::new();
    let mut correct_answers = BTreeMap::new();
    let mut correct = 0usize;
    for question in &quiz.questions {
        let is_correct = answers
            .get(&question.id)
            .map(|selected| question.is_correct(*selected))
            .unwrap_or(false);
        if is_correct {
            correct += 1;
        }
        per_question_correct.insert(question.id.clone(), is_correct);
        correct_answers.insert(question.id.clone(), question.kind.correct_answer());
    }

    let total = quiz.questions.len();
    let score_percent = score_percent(correct, total);
    Ok(QuizResult {
        score_percent,
        passed: score_percent >= pass_threshold,
        answered: answers.len(),
        total,
        per_question_correct,
        correct_answers,
    })
}

fn score_percent(correct: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((correct * 100 + total / 2) / total).min(100) as u8
}
