//! Habit lifecycle and log check-off.

use crate::achievements::{evaluate_checkoff, seed_achievements};
use crate::errors::{HabitError, HabitResult};
use crate::milestones::add_drafts;
use crate::models::{CheckOff, Habit, HabitChanges, HabitId, LogId, NewHabit, UserId};
use crate::store::Database;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{info, warn};

pub const EMPTY_TITLE: &str = "Please insert a title.";
pub const EVALUATION_WARNING: &str =
    "Your progress was saved, but milestones could not be updated. Please toggle the habit again.";

/// Creates an active habit with its first log, its achievement milestones
/// and any drafted deadline milestones. Nothing is stored if a draft is
/// invalid.
pub fn create_habit(
    db: &mut Database,
    user_id: UserId,
    new: NewHabit,
    now: NaiveDateTime,
) -> HabitResult<Habit> {
    if new.title.trim().is_empty() {
        return Err(HabitError::validation(EMPTY_TITLE));
    }
    let today = now.date();

    let habit = db.transaction(|db| {
        let habit =
            db.create_habit(user_id, &new.title, &new.description, new.frequency, now)?;
        db.create_log(habit.id, today)?;
        seed_achievements(db, &habit)?;
        add_drafts(db, &habit, &new.milestones, today)?;
        Ok(habit)
    })?;

    info!(user_id, habit_id = habit.id, frequency = %habit.frequency, "habit created");
    Ok(habit)
}

/// Applies the provided changes. Any effective change moves the interval
/// anchor to `now`.
pub fn edit_habit(
    db: &mut Database,
    user_id: UserId,
    habit_id: HabitId,
    changes: HabitChanges,
    now: NaiveDateTime,
) -> HabitResult<Habit> {
    db.owned_habit(user_id, habit_id)?;
    if changes
        .title
        .as_deref()
        .is_some_and(|title| title.trim().is_empty())
    {
        return Err(HabitError::validation(EMPTY_TITLE));
    }

    let habit = db
        .habit_mut(habit_id)
        .ok_or(HabitError::NotFound("habit"))?;
    let mut changed = false;
    if let Some(title) = changes.title.filter(|title| *title != habit.title) {
        habit.title = title;
        changed = true;
    }
    if let Some(description) = changes
        .description
        .filter(|description| *description != habit.description)
    {
        habit.description = description;
        changed = true;
    }
    if let Some(frequency) = changes.frequency.filter(|f| *f != habit.frequency) {
        habit.frequency = frequency;
        changed = true;
    }
    if changed {
        habit.last_modified = now;
        info!(user_id, habit_id, "habit edited");
    }
    Ok(habit.clone())
}

fn set_active(
    db: &mut Database,
    user_id: UserId,
    habit_id: HabitId,
    active: bool,
    today: NaiveDate,
) -> HabitResult<Habit> {
    db.owned_habit(user_id, habit_id)?;
    let habit = db
        .habit_mut(habit_id)
        .ok_or(HabitError::NotFound("habit"))?;
    if active && !habit.active {
        habit.resumed_on = Some(today);
    }
    habit.active = active;
    info!(user_id, habit_id, active, "habit activation changed");
    Ok(habit.clone())
}

/// Stops log materialization for the habit. Existing logs are kept.
pub fn archive_habit(
    db: &mut Database,
    user_id: UserId,
    habit_id: HabitId,
    today: NaiveDate,
) -> HabitResult<Habit> {
    set_active(db, user_id, habit_id, false, today)
}

/// Reactivates the habit. Days before `today` stay without logs.
pub fn unarchive_habit(
    db: &mut Database,
    user_id: UserId,
    habit_id: HabitId,
    today: NaiveDate,
) -> HabitResult<Habit> {
    set_active(db, user_id, habit_id, true, today)
}

/// Removes the habit with all of its logs and milestones.
pub fn delete_habit(db: &mut Database, user_id: UserId, habit_id: HabitId) -> HabitResult<()> {
    db.owned_habit(user_id, habit_id)?;
    db.delete_habit_cascade(habit_id);
    info!(user_id, habit_id, "habit deleted");
    Ok(())
}

/// Stores the new status of a log, then evaluates achievements when it was
/// checked off.
///
/// A failed evaluation leaves the status change in place and is reported
/// through `CheckOff::warning`; checking off again re-runs it.
pub fn set_log_status(
    db: &mut Database,
    user_id: UserId,
    log_id: LogId,
    status: bool,
) -> HabitResult<CheckOff> {
    let log = db.log(log_id).ok_or(HabitError::NotFound("log"))?;
    let habit = db.owned_habit(user_id, log.habit_id)?.clone();

    let log = db.transaction(|db| {
        let log = db.log_mut(log_id).ok_or(HabitError::NotFound("log"))?;
        log.status = status;
        Ok(log.clone())
    })?;

    let mut outcome = CheckOff {
        log,
        newly_completed: Vec::new(),
        warning: None,
    };
    if !status {
        return Ok(outcome);
    }

    let date = outcome.log.date;
    match db.transaction(|db| evaluate_checkoff(db, &habit, date)) {
        Ok(newly_completed) => outcome.newly_completed = newly_completed,
        Err(err) => {
            warn!(habit_id = habit.id, "milestone evaluation failed: {err}");
            outcome.warning = Some(EVALUATION_WARNING.to_string());
        }
    }
    Ok(outcome)
}

pub fn toggle_log(db: &mut Database, user_id: UserId, log_id: LogId) -> HabitResult<CheckOff> {
    let status = db.log(log_id).ok_or(HabitError::NotFound("log"))?.status;
    set_log_status(db, user_id, log_id, !status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::Frequency;
    use crate::materialize::materialize;
    use crate::milestones::PAST_DEADLINE;
    use crate::models::{MilestoneDraft, MilestoneKind};
    use crate::store::tests::noon;
    use chrono::{Duration, NaiveDate};

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 10).unwrap() + Duration::days(offset)
    }

    fn new_habit(frequency: Frequency) -> NewHabit {
        NewHabit {
            title: "test_habit".into(),
            description: "test_description".into(),
            frequency,
            milestones: Vec::new(),
        }
    }

    fn setup(frequency: Frequency) -> (Database, UserId, Habit) {
        let mut db = Database::default();
        let user = db.create_user("test_user", "hash".into()).unwrap();
        let habit = create_habit(&mut db, user.id, new_habit(frequency), noon(day(0))).unwrap();
        (db, user.id, habit)
    }

    #[test]
    fn creation_writes_first_log_and_achievements() {
        let (db, _, habit) = setup(Frequency::Weekly);
        assert!(habit.active);
        assert_eq!(habit.frequency, Frequency::Weekly);
        assert!(db.log_for(habit.id, day(0)).is_some_and(|log| !log.status));
        assert_eq!(db.milestones_for_habit(habit.id).count(), 10);
    }

    #[test]
    fn creation_with_drafts_stores_them() {
        let mut db = Database::default();
        let user = db.create_user("u", "hash".into()).unwrap();
        let mut new = new_habit(Frequency::Daily);
        new.milestones = vec![
            MilestoneDraft {
                text: "test_mile".into(),
                deadline: None,
            },
            MilestoneDraft {
                text: String::new(),
                deadline: None,
            },
        ];
        let habit = create_habit(&mut db, user.id, new, noon(day(0))).unwrap();
        let deadline_milestones: Vec<_> = db
            .milestones_for_habit(habit.id)
            .filter(|m| m.kind == MilestoneKind::Deadline)
            .collect();
        assert_eq!(deadline_milestones.len(), 1);
        assert_eq!(deadline_milestones[0].text, "test_mile");
        assert_eq!(deadline_milestones[0].user_id, user.id);
    }

    #[test]
    fn past_draft_rejects_the_whole_habit() {
        let mut db = Database::default();
        let user = db.create_user("u", "hash".into()).unwrap();
        let mut new = new_habit(Frequency::Daily);
        new.milestones = vec![MilestoneDraft {
            text: "test_mile".into(),
            deadline: Some(day(-1)),
        }];
        assert_eq!(
            create_habit(&mut db, user.id, new, noon(day(0))),
            Err(HabitError::validation(PAST_DEADLINE))
        );
        assert_eq!(db.habits_for_user(user.id).count(), 0);
        assert_eq!(db.milestone_count(), 0);
        assert_eq!(db.log_count(), 0);
    }

    #[test]
    fn empty_title_is_rejected() {
        let mut db = Database::default();
        let user = db.create_user("u", "hash".into()).unwrap();
        let mut new = new_habit(Frequency::Daily);
        new.title = "  ".into();
        assert!(create_habit(&mut db, user.id, new, noon(day(0))).is_err());
    }

    #[test]
    fn editing_frequency_moves_the_anchor() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        let changes = HabitChanges {
            frequency: Some(Frequency::Weekly),
            ..Default::default()
        };
        let edited = edit_habit(&mut db, user, habit.id, changes, noon(day(3))).unwrap();
        assert_eq!(edited.frequency, Frequency::Weekly);
        assert_eq!(edited.last_modified.date(), day(3));

        for offset in 4..10 {
            materialize(&mut db, user, day(offset)).unwrap();
        }
        assert!(db.log_for(habit.id, day(7)).is_none());
        materialize(&mut db, user, day(10)).unwrap();
        assert!(db.log_for(habit.id, day(10)).is_some());
    }

    #[test]
    fn unchanged_edit_keeps_the_anchor() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        let changes = HabitChanges {
            title: Some(habit.title.clone()),
            ..Default::default()
        };
        let edited = edit_habit(&mut db, user, habit.id, changes, noon(day(3))).unwrap();
        assert_eq!(edited.last_modified, habit.last_modified);
    }

    #[test]
    fn other_users_cannot_touch_the_habit() {
        let (mut db, _, habit) = setup(Frequency::Daily);
        let intruder = db.create_user("intruder", "hash".into()).unwrap();
        let changes = HabitChanges {
            title: Some("test_title_edit".into()),
            ..Default::default()
        };
        assert_eq!(
            edit_habit(&mut db, intruder.id, habit.id, changes, noon(day(1))),
            Err(HabitError::NotFound("habit"))
        );
        assert!(delete_habit(&mut db, intruder.id, habit.id).is_err());
        assert_eq!(db.habit(habit.id).unwrap().title, "test_habit");
    }

    #[test]
    fn archive_stops_materialization_and_unarchive_resumes_it() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        archive_habit(&mut db, user, habit.id, day(0)).unwrap();
        materialize(&mut db, user, day(1)).unwrap();
        assert!(db.log_for(habit.id, day(1)).is_none());
        assert!(db.log_for(habit.id, day(0)).is_some());

        unarchive_habit(&mut db, user, habit.id, day(3)).unwrap();
        let view = materialize(&mut db, user, day(3)).unwrap();
        assert_eq!(view.total, 1);
        assert!(db.log_for(habit.id, day(3)).is_some());
    }

    #[test]
    fn archived_days_stay_empty_after_unarchive() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        archive_habit(&mut db, user, habit.id, day(1)).unwrap();
        let resumed = unarchive_habit(&mut db, user, habit.id, day(5)).unwrap();
        assert_eq!(resumed.resumed_on, Some(day(5)));

        let view = materialize(&mut db, user, day(3)).unwrap();
        assert_eq!(view.total, 0);
        assert!(db.log_for(habit.id, day(3)).is_none());
        materialize(&mut db, user, day(6)).unwrap();
        assert!(db.log_for(habit.id, day(6)).is_some());
    }

    #[test]
    fn unarchiving_an_active_habit_keeps_its_history_open() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        let same = unarchive_habit(&mut db, user, habit.id, day(5)).unwrap();
        assert_eq!(same.resumed_on, None);
        materialize(&mut db, user, day(2)).unwrap();
        assert!(db.log_for(habit.id, day(2)).is_some());
    }

    #[test]
    fn delete_cascades_to_logs_and_milestones() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        materialize(&mut db, user, day(1)).unwrap();
        delete_habit(&mut db, user, habit.id).unwrap();
        assert!(db.habit(habit.id).is_none());
        assert_eq!(db.logs_for_habit(habit.id).count(), 0);
        assert_eq!(db.milestones_for_habit(habit.id).count(), 0);
    }

    #[test]
    fn three_checkoffs_in_a_row_report_both_goals() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        let mut outcome = None;
        for offset in 0..3 {
            materialize(&mut db, user, day(offset)).unwrap();
            let log_id = db.log_for(habit.id, day(offset)).unwrap().id;
            outcome = Some(set_log_status(&mut db, user, log_id, true).unwrap());
        }
        let outcome = outcome.unwrap();
        assert!(outcome.warning.is_none());
        let kinds: Vec<_> = outcome.newly_completed.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MilestoneKind::Count, MilestoneKind::Streak]);
    }

    #[test]
    fn toggle_flips_status() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        let log_id = db.log_for(habit.id, day(0)).unwrap().id;
        assert!(toggle_log(&mut db, user, log_id).unwrap().log.status);
        let undone = toggle_log(&mut db, user, log_id).unwrap();
        assert!(!undone.log.status);
        assert!(undone.newly_completed.is_empty());
    }

    #[test]
    fn evaluation_failure_keeps_the_checkoff() {
        let mut db = Database::default();
        let user = db.create_user("u", "hash".into()).unwrap();
        let habit = db
            .create_habit(user.id, "bare", "", Frequency::Daily, noon(day(0)))
            .unwrap();
        let mut last = 0;
        for offset in 0..3 {
            last = db.create_log(habit.id, day(offset)).unwrap().id;
            if offset < 2 {
                db.log_mut(last).unwrap().status = true;
            }
        }

        let outcome = set_log_status(&mut db, user.id, last, true).unwrap();
        assert_eq!(outcome.warning.as_deref(), Some(EVALUATION_WARNING));
        assert!(db.log(last).unwrap().status);
    }

    #[test]
    fn checking_off_again_retries_evaluation() {
        let mut db = Database::default();
        let user = db.create_user("u", "hash".into()).unwrap();
        let habit = db
            .create_habit(user.id, "bare", "", Frequency::Daily, noon(day(0)))
            .unwrap();
        let mut last = 0;
        for offset in 0..3 {
            last = db.create_log(habit.id, day(offset)).unwrap().id;
            db.log_mut(last).unwrap().status = offset < 2;
        }
        let failed = set_log_status(&mut db, user.id, last, true).unwrap();
        assert!(failed.warning.is_some());

        seed_achievements(&mut db, &habit).unwrap();
        let retried = set_log_status(&mut db, user.id, last, true).unwrap();
        assert!(retried.warning.is_none());
        assert!(retried.log.status);
        let kinds: Vec<_> = retried.newly_completed.iter().map(|m| m.kind).collect();
        assert_eq!(kinds, vec![MilestoneKind::Count, MilestoneKind::Streak]);
    }
}
