pub mod achievements;
pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod errors;
pub mod frequency;
pub mod habits;
pub mod handlers;
pub mod materialize;
pub mod milestones;
pub mod models;
pub mod session;
pub mod state;
pub mod storage;
pub mod store;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use errors::{HabitError, HabitResult};
pub use state::AppState;
pub use storage::load_data;
pub use store::Database;
