use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::db::models::{AnswerRecord, Question};

/// Answer options are a fixed four-slot array, so a selection index is only
/// meaningful in `0..=3`.
pub(crate) const OPTION_RANGE: std::ops::RangeInclusive<i32> = 0..=3;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ScoringError {
    #[error("Question not found in this quiz: {0}")]
    UnknownQuestion(String),
    #[error("Duplicate answer for question {0}")]
    DuplicateAnswer(String),
    #[error("Selected option must be between 0 and 3")]
    OptionOutOfRange,
}

/// A single validated answer as taken off the wire.
#[derive(Debug, Clone)]
pub(crate) struct AnswerSelection {
    pub(crate) question_id: String,
    pub(crate) selected_option: i32,
}

/// The outcome of grading one submission against the quiz question set.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AttemptScore {
    pub(crate) answers: Vec<AnswerRecord>,
    pub(crate) score: i32,
    pub(crate) max_score: i32,
    pub(crate) percentage: i32,
    pub(crate) passed: bool,
}

pub(crate) fn max_score(questions: &[Question]) -> i32 {
    questions.iter().map(|question| question.points).sum()
}

/// Integer percentage rounded to the nearest whole point, half up.
pub(crate) fn percentage(score: i32, max_score: i32) -> i32 {
    if max_score <= 0 {
        return 0;
    }
    ((f64::from(score) / f64::from(max_score)) * 100.0).round() as i32
}

/// Grade a submission. Unanswered questions score zero but still count
/// toward the maximum, an answer outside the question set or a repeated
/// question id rejects the whole submission.
pub(crate) fn score_submission(
    questions: &[Question],
    selections: &[AnswerSelection],
    passing_score: i32,
) -> Result<AttemptScore, ScoringError> {
    let by_id: HashMap<&str, &Question> =
        questions.iter().map(|question| (question.id.as_str(), question)).collect();

    let mut seen: HashSet<&str> = HashSet::with_capacity(selections.len());
    let mut answers = Vec::with_capacity(selections.len());
    let mut score = 0;

    for selection in selections {
        let question = by_id
            .get(selection.question_id.as_str())
            .copied()
            .ok_or_else(|| ScoringError::UnknownQuestion(selection.question_id.clone()))?;

        if !seen.insert(question.id.as_str()) {
            return Err(ScoringError::DuplicateAnswer(selection.question_id.clone()));
        }

        if !OPTION_RANGE.contains(&selection.selected_option) {
            return Err(ScoringError::OptionOutOfRange);
        }

        let is_correct = selection.selected_option == question.correct_answer;
        let earned = if is_correct { question.points } else { 0 };
        score += earned;

        answers.push(AnswerRecord {
            question_id: question.id.clone(),
            selected_option: selection.selected_option,
            is_correct,
            points: earned,
        });
    }

    let max_score = max_score(questions);
    let percentage = percentage(score, max_score);

    Ok(AttemptScore { answers, score, max_score, percentage, passed: percentage >= passing_score })
}

/// A limit of zero (or less) disables the timer entirely.
pub(crate) fn time_limit_exceeded(time_limit_minutes: i32, elapsed_seconds: i64) -> bool {
    let limit_seconds = i64::from(time_limit_minutes) * 60;
    limit_seconds > 0 && elapsed_seconds > limit_seconds
}

#[cfg(test)]
mod tests {
    use sqlx::types::Json;
    use time::macros::datetime;

    use super::*;
    use crate::db::types::DifficultyLevel;

    fn question(id: &str, correct_answer: i32, points: i32) -> Question {
        let now = datetime!(2025-01-02 10:00);
        Question {
            id: id.to_string(),
            quiz_id: "quiz-1".to_string(),
            question_text: format!("Question {id}"),
            options: Json(vec![
                "Option A".to_string(),
                "Option B".to_string(),
                "Option C".to_string(),
                "Option D".to_string(),
            ]),
            correct_answer,
            points,
            order_index: 1,
            explanation: None,
            difficulty: DifficultyLevel::Medium,
            created_at: now,
            updated_at: now,
        }
    }

    fn select(question_id: &str, option: i32) -> AnswerSelection {
        AnswerSelection { question_id: question_id.to_string(), selected_option: option }
    }

    #[test]
    fn full_marks_when_everything_correct() {
        let questions = vec![question("q1", 0, 2), question("q2", 3, 3)];
        let selections = vec![select("q1", 0), select("q2", 3)];

        let result = score_submission(&questions, &selections, 70).expect("score");

        assert_eq!(result.score, 5);
        assert_eq!(result.max_score, 5);
        assert_eq!(result.percentage, 100);
        assert!(result.passed);
        assert!(result.answers.iter().all(|answer| answer.is_correct));
    }

    #[test]
    fn wrong_answers_earn_zero_points() {
        let questions = vec![question("q1", 0, 2), question("q2", 3, 3)];
        let selections = vec![select("q1", 1), select("q2", 3)];

        let result = score_submission(&questions, &selections, 70).expect("score");

        assert_eq!(result.score, 3);
        assert_eq!(result.max_score, 5);
        assert_eq!(result.percentage, 60);
        assert!(!result.passed);
        assert_eq!(result.answers[0].points, 0);
        assert_eq!(result.answers[1].points, 3);
    }

    #[test]
    fn unanswered_questions_count_toward_max() {
        let questions = vec![question("q1", 0, 1), question("q2", 1, 1), question("q3", 2, 1)];
        let selections = vec![select("q1", 0)];

        let result = score_submission(&questions, &selections, 70).expect("score");

        assert_eq!(result.score, 1);
        assert_eq!(result.max_score, 3);
        assert_eq!(result.percentage, 33);
        assert_eq!(result.answers.len(), 1);
    }

    #[test]
    fn empty_submission_scores_zero() {
        let questions = vec![question("q1", 0, 4)];

        let result = score_submission(&questions, &[], 70).expect("score");

        assert_eq!(result.score, 0);
        assert_eq!(result.max_score, 4);
        assert_eq!(result.percentage, 0);
        assert!(!result.passed);
        assert!(result.answers.is_empty());
    }

    #[test]
    fn unknown_question_rejects_submission() {
        let questions = vec![question("q1", 0, 1)];
        let selections = vec![select("q1", 0), select("q9", 0)];

        let err = score_submission(&questions, &selections, 70).unwrap_err();
        assert_eq!(err, ScoringError::UnknownQuestion("q9".to_string()));
    }

    #[test]
    fn repeated_question_rejects_submission() {
        let questions = vec![question("q1", 0, 1), question("q2", 1, 1)];
        let selections = vec![select("q1", 0), select("q1", 0)];

        let err = score_submission(&questions, &selections, 70).unwrap_err();
        assert_eq!(err, ScoringError::DuplicateAnswer("q1".to_string()));
    }

    #[test]
    fn out_of_range_option_rejects_submission() {
        let questions = vec![question("q1", 0, 1)];

        let err = score_submission(&questions, &[select("q1", 4)], 70).unwrap_err();
        assert_eq!(err, ScoringError::OptionOutOfRange);

        let err = score_submission(&questions, &[select("q1", -1)], 70).unwrap_err();
        assert_eq!(err, ScoringError::OptionOutOfRange);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 2), 50);
        assert_eq!(percentage(1, 6), 17);
        assert_eq!(percentage(5, 6), 83);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn percentage_with_zero_max_is_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(10, 0), 0);
    }

    #[test]
    fn pass_boundary_is_inclusive() {
        let questions = vec![
            question("q1", 0, 1),
            question("q2", 0, 1),
            question("q3", 0, 1),
            question("q4", 0, 1),
            question("q5", 0, 1),
        ];
        // 4 of 5 correct = exactly 80 percent.
        let selections = vec![
            select("q1", 0),
            select("q2", 0),
            select("q3", 0),
            select("q4", 0),
            select("q5", 1),
        ];

        let result = score_submission(&questions, &selections, 80).expect("score");
        assert_eq!(result.percentage, 80);
        assert!(result.passed);

        let result = score_submission(&questions, &selections, 81).expect("score");
        assert!(!result.passed);
    }

    #[test]
    fn time_limit_zero_disables_timer() {
        assert!(!time_limit_exceeded(0, i64::MAX / 2));
        assert!(!time_limit_exceeded(-5, 100));
    }

    #[test]
    fn time_limit_boundary_is_inclusive() {
        assert!(!time_limit_exceeded(30, 1_800));
        assert!(time_limit_exceeded(30, 1_801));
    }
}
