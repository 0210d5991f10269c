//! Count and streak milestones generated for every habit.

use crate::errors::{HabitError, HabitResult};
use crate::models::{Habit, Milestone, MilestoneKind};
use crate::store::{Database, NewMilestone};
use chrono::{Duration, NaiveDate};
use tracing::info;

pub const THRESHOLDS: [u32; 5] = [3, 7, 14, 30, 60];

pub fn count_text(threshold: u32) -> String {
    format!("Complete the habit {threshold} times")
}

pub fn streak_text(threshold: u32) -> String {
    format!("Complete the habit {threshold} times in a row")
}

/// Creates the five count and five streak milestones for a new habit.
pub fn seed_achievements(db: &mut Database, habit: &Habit) -> HabitResult<Vec<Milestone>> {
    let mut created = Vec::with_capacity(THRESHOLDS.len() * 2);
    for kind in [MilestoneKind::Count, MilestoneKind::Streak] {
        for threshold in THRESHOLDS {
            let text = if kind == MilestoneKind::Count {
                count_text(threshold)
            } else {
                streak_text(threshold)
            };
            created.push(db.create_milestone(NewMilestone {
                habit_id: habit.id,
                user_id: habit.user_id,
                kind,
                text,
                threshold: Some(threshold),
                deadline: None,
            })?);
        }
    }
    Ok(created)
}

/// Evaluates count and streak goals after the log of `habit` on `date` was
/// checked off. Returns the milestones that became completed.
///
/// Completions are never revoked here, even if an earlier check-off is
/// later undone.
pub fn evaluate_checkoff(
    db: &mut Database,
    habit: &Habit,
    date: NaiveDate,
) -> HabitResult<Vec<Milestone>> {
    let mut reached = Vec::new();

    let completed_total = db
        .logs_for_habit(habit.id)
        .filter(|log| log.status)
        .count();
    if let Some(threshold) = THRESHOLDS
        .into_iter()
        .find(|threshold| *threshold as usize == completed_total)
    {
        reached.push((MilestoneKind::Count, threshold));
    }

    for threshold in THRESHOLDS {
        if streak_length(db, habit, date, threshold) == threshold {
            reached.push((MilestoneKind::Streak, threshold));
        }
    }

    let mut newly_completed = Vec::new();
    for (kind, threshold) in reached {
        let id = db
            .milestones_for_habit(habit.id)
            .find(|m| m.kind == kind && m.threshold == Some(threshold))
            .map(|m| m.id)
            .ok_or(HabitError::NotFound("achievement milestone"))?;
        let milestone = db
            .milestone_mut(id)
            .ok_or(HabitError::NotFound("achievement milestone"))?;
        if !milestone.completed {
            milestone.completed = true;
            info!(habit_id = habit.id, text = %milestone.text, "achievement reached");
            newly_completed.push(milestone.clone());
        }
    }

    Ok(newly_completed)
}

/// Counts completed logs at the habit's cadence walking back from `date`,
/// looking at most `threshold` occurrences deep. The log on `date` counts as
/// the first element.
fn streak_length(db: &Database, habit: &Habit, date: NaiveDate, threshold: u32) -> u32 {
    let step = habit.frequency.interval_days();
    let mut count = 1;
    for i in 1..i64::from(threshold) {
        let hit = date
            .checked_sub_signed(Duration::days(i * step))
            .and_then(|expected| db.log_for(habit.id, expected))
            .is_some_and(|log| log.status);
        if !hit {
            break;
        }
        count += 1;
    }
    count
}
