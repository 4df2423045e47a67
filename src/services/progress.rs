use anyhow::{Context, Result};
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Progress;

/// Share of course items finished, as a whole percentage rounded half up.
/// A course with no lessons and no quizzes counts as 0, not complete.
pub(crate) fn completion_percentage(
    completed_lessons: i32,
    passed_quizzes: i32,
    total_lessons: i32,
    total_quizzes: i32,
) -> i32 {
    let total = total_lessons + total_quizzes;
    if total <= 0 {
        return 0;
    }
    let done = completed_lessons + passed_quizzes;
    (100.0 * f64::from(done) / f64::from(total)).round() as i32
}

pub(crate) fn recompute(progress: &Progress, passed_quizzes: i32) -> i32 {
    completion_percentage(
        progress.completed_lessons.0.len() as i32,
        passed_quizzes,
        progress.total_lessons,
        progress.total_quizzes,
    )
}

/// Creates the zeroed progress row that enrollment hands to the learner.
/// Totals are snapshotted from the course content at enrollment time; the
/// admin progress endpoint can adjust them later. Idempotent.
pub(crate) async fn seed_for_enrollment(
    state: &AppState,
    user_id: &str,
    course_id: &str,
) -> Result<()> {
    let total_lessons = crate::repositories::lessons::count_by_course(state.db(), course_id)
        .await
        .context("Failed to count course lessons")?;
    let total_quizzes = crate::repositories::quizzes::count_by_course(state.db(), course_id)
        .await
        .context("Failed to count course quizzes")?;

    let now = primitive_now_utc();
    let created = crate::repositories::progress::create(
        state.db(),
        crate::repositories::progress::CreateProgress {
            id: &Uuid::new_v4().to_string(),
            user_id,
            course_id,
            total_lessons: total_lessons as i32,
            total_quizzes: total_quizzes as i32,
            last_accessed_at: now,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .context("Failed to seed course progress")?;

    if created {
        tracing::info!(user_id = %user_id, course_id = %course_id, "Seeded course progress");
    }
    Ok(())
}

/// Propagates a passed quiz into the learner's course progress. Best effort:
/// a missing progress row is logged and counted, never bubbled up, so the
/// finalized attempt stands regardless.
pub(crate) async fn record_quiz_pass(
    state: &AppState,
    user_id: &str,
    course_id: &str,
) -> Result<bool> {
    let progress =
        crate::repositories::progress::find_by_user_course(state.db(), user_id, course_id)
            .await
            .context("Failed to fetch course progress")?;

    let Some(progress) = progress else {
        tracing::warn!(
            user_id = %user_id,
            course_id = %course_id,
            "No progress row for passed quiz; update dropped"
        );
        metrics::counter!("quiz_progress_pass_dropped_total").increment(1);
        return Ok(false);
    };

    let passed_quizzes = progress.passed_quizzes + 1;
    let percentage = recompute(&progress, passed_quizzes);

    crate::repositories::progress::set_passed_quizzes(
        state.db(),
        &progress.id,
        passed_quizzes,
        percentage,
        None,
        primitive_now_utc(),
    )
    .await
    .context("Failed to update passed quiz count")?;

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::completion_percentage;

    #[test]
    fn empty_course_is_zero_percent() {
        assert_eq!(completion_percentage(0, 0, 0, 0), 0);
    }

    #[test]
    fn nothing_done_is_zero_percent() {
        assert_eq!(completion_percentage(0, 0, 4, 2), 0);
    }

    #[test]
    fn everything_done_is_full() {
        assert_eq!(completion_percentage(4, 2, 4, 2), 100);
    }

    #[test]
    fn quiz_pass_moves_two_of_five_to_three_of_five() {
        assert_eq!(completion_percentage(2, 0, 3, 2), 40);
        assert_eq!(completion_percentage(2, 1, 3, 2), 60);
        // Same shape with a single quiz in the mix.
        assert_eq!(completion_percentage(2, 0, 4, 1), 40);
        assert_eq!(completion_percentage(2, 1, 4, 1), 60);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(completion_percentage(1, 0, 3, 0), 33);
        assert_eq!(completion_percentage(2, 0, 3, 0), 67);
        assert_eq!(completion_percentage(1, 0, 8, 0), 13);
    }

    #[test]
    fn lessons_and_quizzes_weigh_the_same() {
        assert_eq!(
            completion_percentage(1, 1, 2, 2),
            completion_percentage(2, 0, 2, 2)
        );
    }
}
