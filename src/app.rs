use crate::state::AppState;
use crate::{api, handlers};
use axum::{
    routing::{get, post},
    Router,
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/signup", get(handlers::signup_page).post(handlers::signup))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/dashboard", get(handlers::dashboard_today))
        .route("/dashboard/add_milestones", post(handlers::add_milestones))
        .route(
            "/dashboard/:date",
            get(handlers::dashboard).post(handlers::navigate),
        )
        .route("/add_habit", post(handlers::add_habit))
        .route("/habit/:id/edit", post(handlers::edit_habit))
        .route("/log/:id/toggle", post(handlers::toggle_log))
        .route("/milestone/:id/complete", post(handlers::complete_milestone))
        .nest("/api", api_router())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(api::signup))
        .route("/login", post(api::login))
        .route("/me", get(api::me))
        .route("/dashboard/:date", get(api::dashboard))
        .route("/habits", post(api::create_habit))
        .route(
            "/habits/:id",
            axum::routing::patch(api::edit_habit).delete(api::delete_habit),
        )
        .route("/habits/:id/archive", post(api::archive_habit))
        .route("/habits/:id/unarchive", post(api::unarchive_habit))
        .route(
            "/habits/:id/milestones",
            get(api::list_milestones).post(api::add_milestone),
        )
        .route(
            "/habits/:id/milestones/recurring",
            post(api::add_recurring_milestones),
        )
        .route("/logs/:id", post(api::set_log_status))
        .route(
            "/milestones/:id",
            axum::routing::patch(api::edit_milestone).delete(api::delete_milestone),
        )
        .route("/milestones/:id/complete", post(api::complete_milestone))
}
