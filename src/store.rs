//! In-memory entity store for users, habits, logs and milestones.
//!
//! The whole database is one serializable value. Mutations that must be
//! atomic run through [`Database::transaction`], which restores a snapshot
//! when the closure fails.

use crate::errors::{HabitError, HabitResult};
use crate::frequency::Frequency;
use crate::models::{
    Habit, HabitId, Log, LogId, Milestone, MilestoneId, MilestoneKind, User, UserId,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdCounters {
    pub user: u64,
    pub habit: u64,
    pub log: u64,
    pub milestone: u64,
}

impl Default for IdCounters {
    fn default() -> Self {
        Self {
            user: 1,
            habit: 1,
            log: 1,
            milestone: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewMilestone {
    pub habit_id: HabitId,
    pub user_id: UserId,
    pub kind: MilestoneKind,
    pub text: String,
    pub threshold: Option<u32>,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
    #[serde(default)]
    users: BTreeMap<UserId, User>,
    #[serde(default)]
    habits: BTreeMap<HabitId, Habit>,
    #[serde(default)]
    logs: BTreeMap<LogId, Log>,
    #[serde(default)]
    milestones: BTreeMap<MilestoneId, Milestone>,
    #[serde(default)]
    next_ids: IdCounters,
}

impl Database {
    /// Runs `f` atomically: on `Err` every change it made is discarded.
    pub fn transaction<T>(
        &mut self,
        f: impl FnOnce(&mut Database) -> HabitResult<T>,
    ) -> HabitResult<T> {
        let snapshot = self.clone();
        match f(self) {
            Ok(value) => Ok(value),
            Err(err) => {
                warn!("rolling back transaction: {err}");
                *self = snapshot;
                Err(err)
            }
        }
    }

    pub fn create_user(&mut self, username: &str, password_hash: String) -> HabitResult<User> {
        if self.user_by_username(username).is_some() {
            return Err(HabitError::Store(format!("duplicate username '{username}'")));
        }
        let id = next(&mut self.next_ids.user);
        let user = User {
            id,
            username: username.to_string(),
            password_hash,
            score: 0,
        };
        self.users.insert(id, user.clone());
        Ok(user)
    }

    pub fn user(&self, id: UserId) -> Option<&User> {
        self.users.get(&id)
    }

    pub fn user_mut(&mut self, id: UserId) -> Option<&mut User> {
        self.users.get_mut(&id)
    }

    pub fn user_by_username(&self, username: &str) -> Option<&User> {
        self.users.values().find(|user| user.username == username)
    }

    pub fn create_habit(
        &mut self,
        user_id: UserId,
        title: &str,
        description: &str,
        frequency: Frequency,
        now: NaiveDateTime,
    ) -> HabitResult<Habit> {
        if !self.users.contains_key(&user_id) {
            return Err(HabitError::NotFound("user"));
        }
        let id = next(&mut self.next_ids.habit);
        let habit = Habit {
            id,
            user_id,
            title: title.to_string(),
            description: description.to_string(),
            frequency,
            created_at: now,
            last_modified: now,
            active: true,
            resumed_on: None,
        };
        self.habits.insert(id, habit.clone());
        Ok(habit)
    }

    pub fn habit(&self, id: HabitId) -> Option<&Habit> {
        self.habits.get(&id)
    }

    pub fn habit_mut(&mut self, id: HabitId) -> Option<&mut Habit> {
        self.habits.get_mut(&id)
    }

    /// The habit with `id`, provided it belongs to `user_id`.
    pub fn owned_habit(&self, user_id: UserId, id: HabitId) -> HabitResult<&Habit> {
        self.habits
            .get(&id)
            .filter(|habit| habit.user_id == user_id)
            .ok_or(HabitError::NotFound("habit"))
    }

    pub fn habits_for_user(&self, user_id: UserId) -> impl Iterator<Item = &Habit> {
        self.habits
            .values()
            .filter(move |habit| habit.user_id == user_id)
    }

    pub fn create_log(&mut self, habit_id: HabitId, date: NaiveDate) -> HabitResult<Log> {
        if !self.habits.contains_key(&habit_id) {
            return Err(HabitError::NotFound("habit"));
        }
        if self.log_for(habit_id, date).is_some() {
            return Err(HabitError::Store(format!(
                "log for habit {habit_id} on {date} already exists"
            )));
        }
        let id = next(&mut self.next_ids.log);
        let log = Log {
            id,
            habit_id,
            date,
            status: false,
        };
        self.logs.insert(id, log.clone());
        Ok(log)
    }

    pub fn log(&self, id: LogId) -> Option<&Log> {
        self.logs.get(&id)
    }

    pub fn log_mut(&mut self, id: LogId) -> Option<&mut Log> {
        self.logs.get_mut(&id)
    }

    pub fn log_for(&self, habit_id: HabitId, date: NaiveDate) -> Option<&Log> {
        self.logs
            .values()
            .find(|log| log.habit_id == habit_id && log.date == date)
    }

    pub fn logs_for_habit(&self, habit_id: HabitId) -> impl Iterator<Item = &Log> {
        self.logs.values().filter(move |log| log.habit_id == habit_id)
    }

    pub fn create_milestone(&mut self, new: NewMilestone) -> HabitResult<Milestone> {
        if !self.habits.contains_key(&new.habit_id) {
            return Err(HabitError::NotFound("habit"));
        }
        let id = next(&mut self.next_ids.milestone);
        let milestone = Milestone {
            id,
            habit_id: new.habit_id,
            user_id: new.user_id,
            kind: new.kind,
            text: new.text,
            threshold: new.threshold,
            deadline: new.deadline,
            completed: false,
        };
        self.milestones.insert(id, milestone.clone());
        Ok(milestone)
    }

    pub fn milestone(&self, id: MilestoneId) -> Option<&Milestone> {
        self.milestones.get(&id)
    }

    pub fn milestone_mut(&mut self, id: MilestoneId) -> Option<&mut Milestone> {
        self.milestones.get_mut(&id)
    }

    pub fn milestones_for_habit(&self, habit_id: HabitId) -> impl Iterator<Item = &Milestone> {
        self.milestones
            .values()
            .filter(move |milestone| milestone.habit_id == habit_id)
    }

    pub fn delete_milestone(&mut self, id: MilestoneId) -> Option<Milestone> {
        self.milestones.remove(&id)
    }

    /// Removes the habit together with all of its logs and milestones.
    pub fn delete_habit_cascade(&mut self, habit_id: HabitId) -> Option<Habit> {
        self.logs.retain(|_, log| log.habit_id != habit_id);
        self.milestones
            .retain(|_, milestone| milestone.habit_id != habit_id);
        self.habits.remove(&habit_id)
    }

    pub fn log_count(&self) -> usize {
        self.logs.len()
    }

    pub fn milestone_count(&self) -> usize {
        self.milestones.len()
    }
}

fn next(counter: &mut u64) -> u64 {
    let id = *counter;
    *counter += 1;
    id
}
