//! HTML pages and form posts.

use crate::auth;
use crate::errors::{AppError, HabitError, HabitResult, TRANSIENT_NOTICE};
use crate::frequency::Frequency;
use crate::habits;
use crate::materialize::materialize;
use crate::milestones;
use crate::models::{
    CredentialsRequest, Habit, HabitChanges, HabitId, LogId, Milestone, MilestoneDraft,
    MilestoneId, NewHabit,
};
use crate::session::{expired_session_cookie, session_cookie, CurrentUser, PageUser};
use crate::state::AppState;
use crate::storage::persist_data;
use crate::store::Database;
use crate::ui::{self, DashboardPage};
use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{error, info, warn};

pub const INVALID_DATE: &str = "Please enter a valid date.";

/// Runs `f` against the store under its lock and persists the result when it
/// succeeds. The outer error is a persistence failure, the inner one the
/// outcome of the operation itself. A failed write puts the store back to
/// where it was before `f`.
pub async fn mutate<T>(
    state: &AppState,
    f: impl FnOnce(&mut Database) -> HabitResult<T>,
) -> Result<HabitResult<T>, AppError> {
    let mut db = state.db.lock().await;
    let snapshot = db.clone();
    let outcome = f(&mut db);
    if outcome.is_ok() {
        persist_or_restore(state, &mut db, snapshot).await?;
    }
    Ok(outcome)
}

async fn persist_or_restore(
    state: &AppState,
    db: &mut Database,
    snapshot: Database,
) -> Result<(), AppError> {
    if let Err(err) = persist_data(&state.data_path, db).await {
        warn!("persist failed, discarding in-memory changes");
        *db = snapshot;
        return Err(err);
    }
    Ok(())
}

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Empty form fields mean "no date".
pub fn parse_optional_date(raw: Option<&str>) -> HabitResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| HabitError::validation(INVALID_DATE)),
    }
}

async fn flash(state: &AppState, user: &CurrentUser, message: impl Into<String>) {
    state.sessions.lock().await.flash(&user.token, message);
}

/// Flashes the message of a failed operation; store failures get the
/// generic notice.
async fn flash_result<T>(state: &AppState, user: &CurrentUser, result: &HabitResult<T>, ok: &str) {
    match result {
        Ok(_) => flash(state, user, ok).await,
        Err(HabitError::Validation(message)) => flash(state, user, message.clone()).await,
        Err(HabitError::NotFound(_)) => {}
        Err(err) => {
            error!("request failed: {err}");
            flash(state, user, TRANSIENT_NOTICE).await;
        }
    }
}

pub async fn index(State(state): State<AppState>, user: Option<CurrentUser>) -> Html<String> {
    let username = match user {
        Some(user) => state.db.lock().await.user(user.id).map(|u| u.username.clone()),
        None => None,
    };
    Html(ui::render_index(username.as_deref()))
}

pub async fn signup_page() -> Html<String> {
    Html(ui::render_signup(&[]))
}

pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<CredentialsRequest>,
) -> Result<Response, AppError> {
    match mutate(&state, |db| auth::signup(db, &form.username, &form.password)).await? {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(HabitError::Validation(message)) => Ok(Html(ui::render_signup(&[message])).into_response()),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub required: Option<u8>,
}

pub async fn login_page(Query(query): Query<LoginQuery>) -> Html<String> {
    let notices: Vec<String> = query
        .required
        .map(|_| AppError::unauthorized().message)
        .into_iter()
        .collect();
    Html(ui::render_login(&notices))
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<CredentialsRequest>,
) -> Result<Response, AppError> {
    let result = {
        let db = state.db.lock().await;
        auth::login(&db, &form.username, &form.password)
    };
    match result {
        Ok(user) => {
            let token = state.sessions.lock().await.open(user.id);
            info!(user_id = user.id, "user logged in");
            Ok((
                [(header::SET_COOKIE, session_cookie(&token))],
                Redirect::to("/dashboard"),
            )
                .into_response())
        }
        Err(HabitError::Validation(message)) => Ok(Html(ui::render_login(&[message])).into_response()),
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(State(state): State<AppState>, user: Option<CurrentUser>) -> Response {
    if let Some(user) = user {
        state.sessions.lock().await.close(&user.token);
        info!(user_id = user.id, "user logged out");
    }
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/"),
    )
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub retry: Option<LogId>,
}

pub async fn dashboard_today(
    state: State<AppState>,
    user: PageUser,
    query: Query<DashboardQuery>,
) -> Result<Html<String>, AppError> {
    dashboard(state, user, Path(today()), query).await
}

pub async fn dashboard(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(date): Path<NaiveDate>,
    Query(query): Query<DashboardQuery>,
) -> Result<Html<String>, AppError> {
    let mut db = state.db.lock().await;
    let snapshot = db.clone();
    let mut notices = state.sessions.lock().await.take_flash(&user.token);

    let view = match materialize(&mut db, user.id, date) {
        Ok(view) => view,
        Err(err) => {
            error!(user_id = user.id, %date, "materialization failed: {err}");
            notices.push(TRANSIENT_NOTICE.to_string());
            materialize(&mut db, user.id, today())?
        }
    };
    persist_or_restore(&state, &mut db, snapshot).await?;

    let account = db.user(user.id).ok_or(HabitError::NotFound("user"))?;
    let habits: Vec<Habit> = db.habits_for_user(user.id).cloned().collect();
    let milestones: Vec<Milestone> = habits
        .iter()
        .flat_map(|habit| db.milestones_for_habit(habit.id).cloned())
        .collect();

    Ok(Html(ui::render_dashboard(&DashboardPage {
        username: &account.username,
        score: account.score,
        dashboard: &view,
        habits: &habits,
        milestones: &milestones,
        notices: &notices,
        retry: query.retry,
    })))
}

#[derive(Debug, Deserialize)]
pub struct NavigateForm {
    pub increment: String,
}

pub async fn navigate(
    _user: PageUser,
    Path(date): Path<NaiveDate>,
    Form(form): Form<NavigateForm>,
) -> Redirect {
    let target = match form.increment.as_str() {
        "yesterday" => ui::shift_day(date, false),
        "tomorrow" => ui::shift_day(date, true),
        _ => date,
    };
    Redirect::to(&ui::date_path(target))
}

#[derive(Debug, Deserialize)]
pub struct HabitForm {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub frequency: Option<String>,
    pub milestone: Option<String>,
    pub deadline: Option<String>,
}

fn parse_frequency(raw: Option<&str>) -> HabitResult<Option<Frequency>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => value.parse().map(Some).map_err(HabitError::Validation),
    }
}

pub async fn add_habit(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Form(form): Form<HabitForm>,
) -> Result<Redirect, AppError> {
    let result = mutate(&state, |db| {
        let frequency = parse_frequency(form.frequency.as_deref())?.unwrap_or_default();
        let deadline = parse_optional_date(form.deadline.as_deref())?;
        let milestones = form
            .milestone
            .iter()
            .map(|text| MilestoneDraft {
                text: text.clone(),
                deadline,
            })
            .collect();
        let new = NewHabit {
            title: form.title.clone(),
            description: form.description.clone(),
            frequency,
            milestones,
        };
        habits::create_habit(db, user.id, new, now())
    })
    .await?;
    flash_result(&state, &user, &result, "Habit added.").await;
    Ok(Redirect::to("/dashboard"))
}

#[derive(Debug, Default, Deserialize)]
pub struct EditHabitForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<String>,
    pub milestone: Option<String>,
    pub deadline: Option<String>,
    pub archive: Option<String>,
    pub unarchive: Option<String>,
    pub delete: Option<String>,
}

pub async fn edit_habit(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(habit_id): Path<HabitId>,
    Form(form): Form<EditHabitForm>,
) -> Result<Redirect, AppError> {
    let (result, message) = if form.delete.is_some() {
        let result = mutate(&state, |db| habits::delete_habit(db, user.id, habit_id)).await?;
        (result, "Habit deleted.")
    } else if form.archive.is_some() {
        let result = mutate(&state, |db| habits::archive_habit(db, user.id, habit_id, today()).map(|_| ())).await?;
        (result, "Habit archived.")
    } else if form.unarchive.is_some() {
        let result = mutate(&state, |db| habits::unarchive_habit(db, user.id, habit_id, today()).map(|_| ())).await?;
        (result, "Habit unarchived.")
    } else if let Some(text) = form.milestone.as_deref().filter(|text| !text.trim().is_empty()) {
        let result = mutate(&state, |db| {
            let deadline = parse_optional_date(form.deadline.as_deref())?;
            milestones::add_deadline_milestone(db, user.id, habit_id, text, deadline, today())
                .map(|_| ())
        })
        .await?;
        (result, "Milestone added.")
    } else {
        let result = mutate(&state, |db| {
            let changes = HabitChanges {
                title: form.title.clone(),
                description: form.description.clone(),
                frequency: parse_frequency(form.frequency.as_deref())?,
            };
            habits::edit_habit(db, user.id, habit_id, changes, now()).map(|_| ())
        })
        .await?;
        (result, "Habit updated.")
    };
    flash_result(&state, &user, &result, message).await;
    Ok(Redirect::to("/dashboard"))
}

/// The dashboard posts the status the log should end up with, so a resent
/// check-off re-runs milestone evaluation instead of undoing it.
#[derive(Debug, Default, Deserialize)]
pub struct ToggleForm {
    pub status: Option<bool>,
}

pub async fn toggle_log(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(log_id): Path<LogId>,
    Form(form): Form<ToggleForm>,
) -> Result<Redirect, AppError> {
    let result = mutate(&state, |db| match form.status {
        Some(status) => habits::set_log_status(db, user.id, log_id, status),
        None => habits::toggle_log(db, user.id, log_id),
    })
    .await?;
    match result {
        Ok(outcome) => {
            for milestone in &outcome.newly_completed {
                flash(&state, &user, format!("Milestone reached: {}", milestone.text)).await;
            }
            let mut target = ui::date_path(outcome.log.date);
            if let Some(warning) = outcome.warning {
                flash(&state, &user, warning).await;
                target = format!("{target}?retry={}", outcome.log.id);
            }
            Ok(Redirect::to(&target))
        }
        Err(err) => {
            flash_result::<()>(&state, &user, &Err(err), "").await;
            Ok(Redirect::to("/dashboard"))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MilestonesForm {
    pub habit_id: HabitId,
    pub title: String,
    pub deadline: String,
    pub num_milestones: String,
    pub delta: String,
}

pub async fn add_milestones(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Form(form): Form<MilestonesForm>,
) -> Result<Redirect, AppError> {
    let result = mutate(&state, |db| {
        let start = parse_optional_date(Some(&form.deadline))?
            .ok_or_else(|| HabitError::validation(INVALID_DATE))?;
        milestones::add_recurring_milestones(
            db,
            user.id,
            form.habit_id,
            &form.title,
            start,
            &form.num_milestones,
            &form.delta,
            today(),
        )
    })
    .await?;
    flash_result(&state, &user, &result, "Milestones added.").await;
    Ok(Redirect::to("/dashboard"))
}

pub async fn complete_milestone(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(milestone_id): Path<MilestoneId>,
) -> Result<Redirect, AppError> {
    let result = mutate(&state, |db| {
        milestones::complete_milestone(db, user.id, milestone_id, today())
    })
    .await?;
    if let Ok(points) = &result {
        if *points > 0 {
            flash(&state, &user, format!("Milestone completed: +{points} points")).await;
        }
    } else {
        flash_result(&state, &user, &result, "").await;
    }
    Ok(Redirect::to("/dashboard"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserId;

    #[test]
    fn empty_date_fields_mean_no_deadline() {
        assert_eq!(parse_optional_date(None), Ok(None));
        assert_eq!(parse_optional_date(Some("  ")), Ok(None));
        assert_eq!(
            parse_optional_date(Some("2021-01-01")),
            Ok(NaiveDate::from_ymd_opt(2021, 1, 1))
        );
        assert_eq!(
            parse_optional_date(Some("01/01/2021")),
            Err(HabitError::validation(INVALID_DATE))
        );
    }

    #[test]
    fn frequency_field_is_optional() {
        assert_eq!(parse_frequency(None), Ok(None));
        assert_eq!(parse_frequency(Some("weekly")), Ok(Some(Frequency::Weekly)));
        assert!(parse_frequency(Some("hourly")).is_err());
    }

    fn unwritable_state() -> (AppState, UserId) {
        let mut db = Database::default();
        let user = db.create_user("test_user", "hash".into()).unwrap();
        (AppState::new(std::env::temp_dir(), db), user.id)
    }

    #[tokio::test]
    async fn failed_write_discards_the_change() {
        let (state, user) = unwritable_state();
        let new = NewHabit {
            title: "test_habit".into(),
            description: String::new(),
            frequency: Frequency::Daily,
            milestones: Vec::new(),
        };
        let result = mutate(&state, |db| habits::create_habit(db, user, new, now())).await;
        assert!(result.is_err());

        let db = state.db.lock().await;
        assert_eq!(db.habits_for_user(user).count(), 0);
        assert_eq!(db.log_count(), 0);
        assert_eq!(db.milestone_count(), 0);
    }

    #[tokio::test]
    async fn failed_operation_skips_the_write() {
        let (state, user) = unwritable_state();
        let result = mutate(&state, |db| habits::delete_habit(db, user, 42)).await;
        assert_eq!(result.ok(), Some(Err(HabitError::NotFound("habit"))));
    }
}
