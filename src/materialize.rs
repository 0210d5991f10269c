use crate::errors::HabitResult;
use crate::frequency::is_due;
use crate::models::{Dashboard, DashboardEntry, HabitId, UserId};
use crate::store::Database;
use chrono::NaiveDate;
use tracing::debug;

/// Makes sure every active habit of `user_id` that is due on `date` has its
/// log, then returns the dashboard for that date.
///
/// The batch of new logs commits atomically. Calling this twice for the same
/// date creates nothing the second time.
pub fn materialize(db: &mut Database, user_id: UserId, date: NaiveDate) -> HabitResult<Dashboard> {
    let due: Vec<HabitId> = db
        .habits_for_user(user_id)
        .filter(|habit| habit.active && habit.created_on() <= date)
        .filter(|habit| habit.resumed_on.is_none_or(|resumed| resumed <= date))
        .filter(|habit| db.log_for(habit.id, date).is_none())
        .filter(|habit| is_due(habit.frequency, habit.last_modified.date(), date))
        .map(|habit| habit.id)
        .collect();

    if !due.is_empty() {
        create_logs(db, &due, date)?;
        debug!(user_id, %date, created = due.len(), "materialized logs");
    }

    Ok(dashboard(db, user_id, date))
}

/// One log per habit on `date`, all or none.
fn create_logs(db: &mut Database, habits: &[HabitId], date: NaiveDate) -> HabitResult<()> {
    db.transaction(|db| {
        for habit_id in habits {
            db.create_log(*habit_id, date)?;
        }
        Ok(())
    })
}

/// The (habit, log) pairs for `date`, restricted to active habits.
pub fn dashboard(db: &Database, user_id: UserId, date: NaiveDate) -> Dashboard {
    let entries: Vec<DashboardEntry> = db
        .habits_for_user(user_id)
        .filter(|habit| habit.active)
        .filter_map(|habit| {
            db.log_for(habit.id, date).map(|log| DashboardEntry {
                habit: habit.clone(),
                log: log.clone(),
            })
        })
        .collect();

    let completed = entries.iter().filter(|entry| entry.log.status).count();
    let total = entries.len();

    Dashboard {
        date,
        entries,
        completed,
        todo: total - completed,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frequency::Frequency;
    use crate::store::tests::noon;
    use chrono::Duration;

    fn day0() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 1).unwrap()
    }

    fn setup(frequency: Frequency) -> (Database, UserId, HabitId) {
        let mut db = Database::default();
        let user = db.create_user("u", "hash".into()).unwrap();
        let habit = db
            .create_habit(user.id, "habit", "", frequency, noon(day0()))
            .unwrap();
        db.create_log(habit.id, day0()).unwrap();
        (db, user.id, habit.id)
    }

    #[test]
    fn materialize_is_idempotent() {
        let (mut db, user, _) = setup(Frequency::Daily);
        let target = day0() + Duration::days(3);

        let first = materialize(&mut db, user, target).unwrap();
        let count = db.log_count();
        let second = materialize(&mut db, user, target).unwrap();

        assert_eq!(db.log_count(), count);
        assert_eq!(first.total, 1);
        assert_eq!(
            first.entries.iter().map(|e| e.log.id).collect::<Vec<_>>(),
            second.entries.iter().map(|e| e.log.id).collect::<Vec<_>>()
        );
    }

    #[test]
    fn daily_habit_gets_a_log_for_each_visited_day() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        for offset in 1..=5 {
            materialize(&mut db, user, day0() + Duration::days(offset)).unwrap();
        }
        assert_eq!(db.logs_for_habit(habit).count(), 6);
    }

    #[test]
    fn weekly_habit_second_log_appears_after_seven_days() {
        let (mut db, user, habit) = setup(Frequency::Weekly);
        for offset in 1..=6 {
            let view = materialize(&mut db, user, day0() + Duration::days(offset)).unwrap();
            assert_eq!(view.total, 0);
        }
        assert_eq!(db.log_count(), 1);

        let view = materialize(&mut db, user, day0() + Duration::days(7)).unwrap();
        assert_eq!(view.total, 1);
        assert_eq!(db.logs_for_habit(habit).count(), 2);
        assert!(db.log_for(habit, day0() + Duration::days(7)).is_some());
    }

    #[test]
    fn monthly_habit_second_log_appears_after_thirty_days() {
        let (mut db, user, habit) = setup(Frequency::Monthly);
        for offset in 1..30 {
            materialize(&mut db, user, day0() + Duration::days(offset)).unwrap();
        }
        assert_eq!(db.log_count(), 1);
        materialize(&mut db, user, day0() + Duration::days(30)).unwrap();
        assert!(db.log_for(habit, day0() + Duration::days(30)).is_some());
    }

    #[test]
    fn dates_before_creation_get_no_logs() {
        let (mut db, user, _) = setup(Frequency::Daily);
        let view = materialize(&mut db, user, day0() - Duration::days(1)).unwrap();
        assert_eq!(view.total, 0);
        assert_eq!(db.log_count(), 1);
    }

    #[test]
    fn counts_split_completed_and_todo() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        db.create_habit(user, "second", "", Frequency::Daily, noon(day0()))
            .unwrap();
        let log_id = db.log_for(habit, day0()).unwrap().id;
        db.log_mut(log_id).unwrap().status = true;

        let view = materialize(&mut db, user, day0()).unwrap();
        assert_eq!(view.total, 2);
        assert_eq!(view.completed, 1);
        assert_eq!(view.todo, 1);
    }

    #[test]
    fn archived_habits_are_skipped_and_hidden() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        db.habit_mut(habit).unwrap().active = false;

        let view = materialize(&mut db, user, day0() + Duration::days(1)).unwrap();
        assert_eq!(view.total, 0);
        assert_eq!(db.log_count(), 1);
        assert_eq!(dashboard(&db, user, day0()).total, 0);
    }

    #[test]
    fn failed_batch_creates_no_logs() {
        let (mut db, user, habit) = setup(Frequency::Daily);
        let second = db
            .create_habit(user, "second", "", Frequency::Daily, noon(day0()))
            .unwrap();
        let target = day0() + Duration::days(1);

        let result = create_logs(&mut db, &[second.id, habit, habit], target);
        assert!(matches!(result, Err(crate::errors::HabitError::Store(_))));
        assert_eq!(db.log_count(), 1);
        assert!(db.log_for(second.id, target).is_none());

        let view = materialize(&mut db, user, target).unwrap();
        assert_eq!(view.total, 2);
    }

    #[test]
    fn other_users_habits_are_untouched() {
        let (mut db, _, habit) = setup(Frequency::Daily);
        let other = db.create_user("other", "hash".into()).unwrap();
        let view = materialize(&mut db, other.id, day0() + Duration::days(1)).unwrap();
        assert_eq!(view.total, 0);
        assert_eq!(db.logs_for_habit(habit).count(), 1);
    }
}
