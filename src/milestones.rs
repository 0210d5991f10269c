//! User-authored deadline milestones.

use crate::errors::{HabitError, HabitResult};
use crate::models::{Habit, HabitId, Milestone, MilestoneDraft, MilestoneId, MilestoneKind, UserId};
use crate::store::{Database, NewMilestone};
use chrono::{Duration, NaiveDate};
use tracing::info;

pub const PAST_DEADLINE: &str = "The deadline cannot be in the past!";
pub const COUNT_NOT_NUMERIC: &str = "The number of milestones must be a positive number.";
pub const COUNT_NOT_POSITIVE: &str = "The number of milestones must be positive.";
pub const INTERVAL_NOT_NUMERIC: &str =
    "The interval between milestones must be a non-negative number.";
pub const INTERVAL_NOT_POSITIVE: &str =
    "The interval between milestones must be positive for a recurring milestone.";
pub const COUNT_TOO_LARGE: &str = "The number of milestones cannot be more than 365.";
pub const EMPTY_TEXT: &str = "Please describe the milestone.";

/// Longest recurring series accepted in one request.
pub const MAX_SERIES: u32 = 365;

/// Points for finishing a deadline milestone on or before its deadline.
pub const ON_TIME_POINTS: u64 = 3;
pub const LATE_POINTS: u64 = 1;

fn check_deadline(deadline: Option<NaiveDate>, today: NaiveDate) -> HabitResult<()> {
    match deadline {
        Some(deadline) if deadline < today => Err(HabitError::validation(PAST_DEADLINE)),
        _ => Ok(()),
    }
}

fn check_text(text: &str) -> HabitResult<()> {
    if text.trim().is_empty() {
        return Err(HabitError::validation(EMPTY_TEXT));
    }
    Ok(())
}

pub fn add_deadline_milestone(
    db: &mut Database,
    user_id: UserId,
    habit_id: HabitId,
    text: &str,
    deadline: Option<NaiveDate>,
    today: NaiveDate,
) -> HabitResult<Milestone> {
    check_deadline(deadline, today)?;
    check_text(text)?;
    db.owned_habit(user_id, habit_id)?;

    let milestone = db.transaction(|db| {
        db.create_milestone(NewMilestone {
            habit_id,
            user_id,
            kind: MilestoneKind::Deadline,
            text: text.to_string(),
            threshold: None,
            deadline,
        })
    })?;
    info!(habit_id, milestone_id = milestone.id, "milestone added");
    Ok(milestone)
}

/// Adds the non-empty drafts to `habit` in order. Every deadline is checked
/// before anything is written; callers run this inside their transaction.
pub fn add_drafts(
    db: &mut Database,
    habit: &Habit,
    drafts: &[MilestoneDraft],
    today: NaiveDate,
) -> HabitResult<Vec<Milestone>> {
    let drafts: Vec<_> = drafts
        .iter()
        .filter(|draft| !draft.text.trim().is_empty())
        .collect();
    for draft in &drafts {
        check_deadline(draft.deadline, today)?;
    }
    drafts
        .into_iter()
        .map(|draft| {
            db.create_milestone(NewMilestone {
                habit_id: habit.id,
                user_id: habit.user_id,
                kind: MilestoneKind::Deadline,
                text: draft.text.clone(),
                threshold: None,
                deadline: draft.deadline,
            })
        })
        .collect()
}

fn parse_count(raw: &str) -> HabitResult<u32> {
    let count: i64 = raw
        .trim()
        .parse()
        .map_err(|_| HabitError::validation(COUNT_NOT_NUMERIC))?;
    if count <= 0 {
        return Err(HabitError::validation(COUNT_NOT_POSITIVE));
    }
    if count > i64::from(MAX_SERIES) {
        return Err(HabitError::validation(COUNT_TOO_LARGE));
    }
    u32::try_from(count).map_err(|_| HabitError::validation(COUNT_NOT_NUMERIC))
}

/// `start + i * interval` days, or the interval error when that leaves the
/// calendar range.
fn offset_date(start: NaiveDate, i: i64, interval: i64) -> HabitResult<NaiveDate> {
    i.checked_mul(interval)
        .and_then(Duration::try_days)
        .and_then(|offset| start.checked_add_signed(offset))
        .ok_or_else(|| HabitError::validation(INTERVAL_NOT_NUMERIC))
}

fn parse_interval(raw: &str) -> HabitResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(days) if days >= 0 => Ok(days),
        _ => Err(HabitError::validation(INTERVAL_NOT_NUMERIC)),
    }
}

/// Creates `count` milestones spaced `interval` days apart starting at
/// `start`. Count and interval arrive as raw form text.
#[allow(clippy::too_many_arguments)]
pub fn add_recurring_milestones(
    db: &mut Database,
    user_id: UserId,
    habit_id: HabitId,
    text: &str,
    start: NaiveDate,
    count: &str,
    interval: &str,
    today: NaiveDate,
) -> HabitResult<Vec<Milestone>> {
    let count = parse_count(count)?;
    let interval = parse_interval(interval)?;
    if count > 1 && interval == 0 {
        return Err(HabitError::validation(INTERVAL_NOT_POSITIVE));
    }
    check_deadline(Some(start), today)?;
    check_text(text)?;
    db.owned_habit(user_id, habit_id)?;
    let deadlines = (0..i64::from(count))
        .map(|i| offset_date(start, i, interval))
        .collect::<HabitResult<Vec<_>>>()?;

    let created = db.transaction(|db| {
        deadlines
            .into_iter()
            .map(|deadline| {
                db.create_milestone(NewMilestone {
                    habit_id,
                    user_id,
                    kind: MilestoneKind::Deadline,
                    text: text.to_string(),
                    threshold: None,
                    deadline: Some(deadline),
                })
            })
            .collect::<HabitResult<Vec<_>>>()
    })?;
    info!(habit_id, count, interval, "recurring milestones added");
    Ok(created)
}

fn owned_milestone(db: &Database, user_id: UserId, id: MilestoneId) -> HabitResult<&Milestone> {
    db.milestone(id)
        .filter(|milestone| milestone.user_id == user_id)
        .ok_or(HabitError::NotFound("milestone"))
}

fn owned_deadline_milestone(
    db: &Database,
    user_id: UserId,
    id: MilestoneId,
) -> HabitResult<&Milestone> {
    owned_milestone(db, user_id, id).and_then(|milestone| {
        if milestone.kind.is_achievement() {
            Err(HabitError::validation(
                "Achievement milestones are managed automatically.",
            ))
        } else {
            Ok(milestone)
        }
    })
}

/// Marks a deadline milestone as done and credits the owner's score.
/// Returns the points awarded.
pub fn complete_milestone(
    db: &mut Database,
    user_id: UserId,
    id: MilestoneId,
    today: NaiveDate,
) -> HabitResult<u64> {
    let milestone = owned_deadline_milestone(db, user_id, id)?;
    if milestone.completed {
        return Ok(0);
    }
    let points = match milestone.deadline {
        Some(deadline) if today > deadline => LATE_POINTS,
        _ => ON_TIME_POINTS,
    };

    db.transaction(|db| {
        db.milestone_mut(id)
            .ok_or(HabitError::NotFound("milestone"))?
            .completed = true;
        let user = db.user_mut(user_id).ok_or(HabitError::NotFound("user"))?;
        user.score += points;
        Ok(())
    })?;
    info!(user_id, milestone_id = id, points, "milestone completed");
    Ok(points)
}

pub fn edit_milestone(
    db: &mut Database,
    user_id: UserId,
    id: MilestoneId,
    text: Option<&str>,
    deadline: Option<NaiveDate>,
    today: NaiveDate,
) -> HabitResult<Milestone> {
    owned_deadline_milestone(db, user_id, id)?;
    check_deadline(deadline, today)?;
    if let Some(text) = text {
        check_text(text)?;
    }

    let milestone = db
        .milestone_mut(id)
        .ok_or(HabitError::NotFound("milestone"))?;
    if let Some(text) = text {
        milestone.text = text.to_string();
    }
    if deadline.is_some() {
        milestone.deadline = deadline;
    }
    Ok(milestone.clone())
}

pub fn delete_milestone(db: &mut Database, user_id: UserId, id: MilestoneId) -> HabitResult<()> {
    owned_deadline_milestone(db, user_id, id)?;
    db.delete_milestone(id);
    Ok(())
}

pub fn milestones_for_habit(
    db: &Database,
    user_id: UserId,
    habit_id: HabitId,
) -> HabitResult<Vec<Milestone>> {
    db.owned_habit(user_id, habit_id)?;
    Ok(db.milestones_for_habit(habit_id).cloned().collect())
}
