use crate::frequency::Frequency;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub type UserId = u64;
pub type HabitId = u64;
pub type LogId = u64;
pub type MilestoneId = u64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub password_hash: String,
    #[serde(default)]
    pub score: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Habit {
    pub id: HabitId,
    pub user_id: UserId,
    pub title: String,
    pub description: String,
    pub frequency: Frequency,
    pub created_at: NaiveDateTime,
    /// Anchor for interval arithmetic; reset on any title, description or frequency change.
    pub last_modified: NaiveDateTime,
    pub active: bool,
    /// Day of the last unarchive; no logs are created before it.
    #[serde(default)]
    pub resumed_on: Option<NaiveDate>,
}

impl Habit {
    pub fn created_on(&self) -> NaiveDate {
        self.created_at.date()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Log {
    pub id: LogId,
    pub habit_id: HabitId,
    pub date: NaiveDate,
    #[serde(default)]
    pub status: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Deadline,
    Count,
    Streak,
}

impl MilestoneKind {
    pub fn is_achievement(self) -> bool {
        matches!(self, MilestoneKind::Count | MilestoneKind::Streak)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Milestone {
    pub id: MilestoneId,
    pub habit_id: HabitId,
    pub user_id: UserId,
    pub kind: MilestoneKind,
    pub text: String,
    /// Set for count and streak milestones only.
    #[serde(default)]
    pub threshold: Option<u32>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
}

/// One user-authored milestone submitted together with a habit.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MilestoneDraft {
    pub text: String,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewHabit {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub milestones: Vec<MilestoneDraft>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HabitChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub token: String,
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: UserId,
    pub username: String,
    pub score: u64,
}

#[derive(Debug, Deserialize)]
pub struct LogStatusRequest {
    pub status: bool,
}

#[derive(Debug, Deserialize)]
pub struct RecurringMilestoneRequest {
    pub text: String,
    pub deadline: NaiveDate,
    pub count: String,
    pub interval: String,
}

#[derive(Debug, Deserialize)]
pub struct MilestoneEditRequest {
    pub text: Option<String>,
    pub deadline: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardEntry {
    pub habit: Habit,
    pub log: Log,
}

/// What the dashboard renders for one navigated-to date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dashboard {
    pub date: NaiveDate,
    pub entries: Vec<DashboardEntry>,
    pub completed: usize,
    pub todo: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOff {
    pub log: Log,
    pub newly_completed: Vec<Milestone>,
    pub warning: Option<String>,
}
