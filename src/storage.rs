use crate::errors::AppError;
use crate::store::Database;
use std::path::Path;
use tokio::fs;
use tracing::error;

pub async fn load_data(path: &Path) -> Database {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse data file: {err}");
                Database::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Database::default(),
        Err(err) => {
            error!("failed to read data file: {err}");
            Database::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &Database) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    fs::write(path, payload).await.map_err(|err| {
        error!("failed to write data file: {err}");
        AppError::internal(err)
    })?;
    Ok(())
}
