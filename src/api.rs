//! JSON endpoints, authenticated with a bearer session token.

use crate::auth;
use crate::errors::AppError;
use crate::habits;
use crate::handlers::{mutate, now, today};
use crate::materialize::materialize;
use crate::milestones;
use crate::models::{
    CheckOff, CredentialsRequest, Dashboard, Habit, HabitChanges, HabitId, LogId,
    LogStatusRequest, Milestone, MilestoneDraft, MilestoneEditRequest, MilestoneId, NewHabit,
    ProfileResponse, RecurringMilestoneRequest, SessionResponse,
};
use crate::session::CurrentUser;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Serialize;

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<ProfileResponse>), AppError> {
    let user = mutate(&state, |db| auth::signup(db, &payload.username, &payload.password)).await??;
    Ok((
        StatusCode::CREATED,
        Json(ProfileResponse {
            id: user.id,
            username: user.username,
            score: user.score,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let user = {
        let db = state.db.lock().await;
        auth::login(&db, &payload.username, &payload.password)?
    };
    let token = state.sessions.lock().await.open(user.id);
    Ok(Json(SessionResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}

pub async fn me(State(state): State<AppState>, user: CurrentUser) -> Result<Json<ProfileResponse>, AppError> {
    let db = state.db.lock().await;
    let account = db.user(user.id).ok_or_else(AppError::unauthorized)?;
    Ok(Json(ProfileResponse {
        id: account.id,
        username: account.username.clone(),
        score: account.score,
    }))
}

pub async fn dashboard(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(date): Path<NaiveDate>,
) -> Result<Json<Dashboard>, AppError> {
    let view = mutate(&state, |db| materialize(db, user.id, date)).await??;
    Ok(Json(view))
}

pub async fn create_habit(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<NewHabit>,
) -> Result<(StatusCode, Json<Habit>), AppError> {
    let habit = mutate(&state, |db| habits::create_habit(db, user.id, payload, now())).await??;
    Ok((StatusCode::CREATED, Json(habit)))
}

pub async fn edit_habit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(habit_id): Path<HabitId>,
    Json(changes): Json<HabitChanges>,
) -> Result<Json<Habit>, AppError> {
    let habit = mutate(&state, |db| habits::edit_habit(db, user.id, habit_id, changes, now())).await??;
    Ok(Json(habit))
}

pub async fn archive_habit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(habit_id): Path<HabitId>,
) -> Result<Json<Habit>, AppError> {
    let habit = mutate(&state, |db| habits::archive_habit(db, user.id, habit_id, today())).await??;
    Ok(Json(habit))
}

pub async fn unarchive_habit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(habit_id): Path<HabitId>,
) -> Result<Json<Habit>, AppError> {
    let habit = mutate(&state, |db| habits::unarchive_habit(db, user.id, habit_id, today())).await??;
    Ok(Json(habit))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(habit_id): Path<HabitId>,
) -> Result<StatusCode, AppError> {
    mutate(&state, |db| habits::delete_habit(db, user.id, habit_id)).await??;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn set_log_status(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(log_id): Path<LogId>,
    Json(payload): Json<LogStatusRequest>,
) -> Result<Json<CheckOff>, AppError> {
    let outcome =
        mutate(&state, |db| habits::set_log_status(db, user.id, log_id, payload.status)).await??;
    Ok(Json(outcome))
}

pub async fn list_milestones(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(habit_id): Path<HabitId>,
) -> Result<Json<Vec<Milestone>>, AppError> {
    let db = state.db.lock().await;
    Ok(Json(milestones::milestones_for_habit(&db, user.id, habit_id)?))
}

pub async fn add_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(habit_id): Path<HabitId>,
    Json(draft): Json<MilestoneDraft>,
) -> Result<(StatusCode, Json<Milestone>), AppError> {
    let milestone = mutate(&state, |db| {
        milestones::add_deadline_milestone(db, user.id, habit_id, &draft.text, draft.deadline, today())
    })
    .await??;
    Ok((StatusCode::CREATED, Json(milestone)))
}

pub async fn add_recurring_milestones(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(habit_id): Path<HabitId>,
    Json(payload): Json<RecurringMilestoneRequest>,
) -> Result<(StatusCode, Json<Vec<Milestone>>), AppError> {
    let created = mutate(&state, |db| {
        milestones::add_recurring_milestones(
            db,
            user.id,
            habit_id,
            &payload.text,
            payload.deadline,
            &payload.count,
            &payload.interval,
            today(),
        )
    })
    .await??;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn edit_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(milestone_id): Path<MilestoneId>,
    Json(payload): Json<MilestoneEditRequest>,
) -> Result<Json<Milestone>, AppError> {
    let milestone = mutate(&state, |db| {
        milestones::edit_milestone(
            db,
            user.id,
            milestone_id,
            payload.text.as_deref(),
            payload.deadline,
            today(),
        )
    })
    .await??;
    Ok(Json(milestone))
}

pub async fn delete_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(milestone_id): Path<MilestoneId>,
) -> Result<StatusCode, AppError> {
    mutate(&state, |db| milestones::delete_milestone(db, user.id, milestone_id)).await??;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub points: u64,
}

pub async fn complete_milestone(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(milestone_id): Path<MilestoneId>,
) -> Result<Json<CompletionResponse>, AppError> {
    let points = mutate(&state, |db| {
        milestones::complete_milestone(db, user.id, milestone_id, today())
    })
    .await??;
    Ok(Json(CompletionResponse { points }))
}
