use crate::session::Sessions;
use crate::store::Database;
use std::{path::PathBuf, sync::Arc};
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    /// Held for the whole of each state-changing request.
    pub db: Arc<Mutex<Database>>,
    pub sessions: Arc<Mutex<Sessions>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, db: Database) -> Self {
        Self {
            data_path,
            db: Arc::new(Mutex::new(db)),
            sessions: Arc::new(Mutex::new(Sessions::default())),
        }
    }
}
