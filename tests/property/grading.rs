//! Property-based tests for quiz grading

use proptest::prelude::*;
use std::collections::BTreeMap;
use syllabus::course::{Question, QuestionKind, Quiz};
use syllabus::learning::grade_quiz;

/// (option count, correct index) per question
fn quiz_shape() -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec(
        (2usize..=5).prop_flat_map(|options| (Just(options), 0..options)),
        1..12,
    )
}

fn build_quiz(shape: &[(usize, usize)]) -> Quiz {
    let questions = shape
        .iter()
        .enumerate()
        .map(|(i, (options, correct))| Question {
            id: format!("q{}", i + 1),
            question: format!("Question {}", i + 1),
            kind: QuestionKind::MultipleChoice {
                options: (0..*options).map(|o| format!("Option {o}")).collect(),
                correct_answer: *correct,
            },
        })
        .collect();
    Quiz {
        description: String::new(),
        questions,
    }
}

proptest! {
    #[test]
    fn test_grading_ignores_answer_order(
        (shape, picks) in quiz_shape().prop_flat_map(|shape| {
            let picks = prop::collection::vec(prop::option::of(0usize..5), shape.len());
            (Just(shape), picks)
        }),
        threshold in 0u8..=100,
        seed in any::<u64>(),
    ) {
        let quiz = build_quiz(&shape);
        let mut pairs: Vec<(String, usize)> = picks
            .iter()
            .enumerate()
            .filter_map(|(i, pick)| pick.map(|p| (format!("q{}", i + 1), p)))
            .collect();

        let forward: BTreeMap<_, _> = pairs.iter().cloned().collect();
        // Deterministic shuffle from the seed.
        let len = pairs.len();
        if len > 1 {
            for i in (1..len).rev() {
                let j = (seed.wrapping_mul(i as u64 + 7) % (i as u64 + 1)) as usize;
                pairs.swap(i, j);
            }
        }
        let shuffled: BTreeMap<_, _> = pairs.into_iter().collect();

        let a = grade_quiz(&quiz, &forward, threshold).unwrap();
        let b = grade_quiz(&quiz, &shuffled, threshold).unwrap();
        prop_assert_eq!(&a, &b);

        let correct = shape
            .iter()
            .zip(&picks)
            .filter(|((_, answer), pick)| **pick == Some(*answer))
            .count();
        let total = shape.len();
        prop_assert_eq!(a.total, total);
        prop_assert_eq!(a.answered, forward.len());
        prop_assert_eq!(a.score_percent as usize, (correct * 100 + total / 2) / total);
        prop_assert_eq!(a.passed, a.score_percent >= threshold);
        prop_assert_eq!(a.per_question_correct.len(), total);
        prop_assert_eq!(a.per_question_correct.values().filter(|c| **c).count(), correct);
    }

    #[test]
    fn test_unknown_question_is_always_rejected(
        shape in quiz_shape(),
        extra in 12usize..100,
    ) {
        let quiz = build_quiz(&shape);
        let mut answers = BTreeMap::new();
        answers.insert("q1".to_string(), 0);
        answers.insert(format!("q{extra}"), 0);
        prop_assert!(grade_quiz(&quiz, &answers, 50).is_err());
    }
}
