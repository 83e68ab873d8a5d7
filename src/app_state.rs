use std::sync::{Arc, Mutex};
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;
use crate::{config::AppConfig, export::ArtifactStore};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub status: Arc<Mutex<Status>>,
    pub artifacts: ArtifactStore,
    pub shutdown_sender: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl AppState {
    pub fn new(config: AppConfig, shutdown_tx: oneshot::Sender<()>) -> Self {
        Self {
            config,
            status: Arc::new(Mutex::new(Status {
                is_busy: false,
                message: "Servidor pronto.".to_string(),
                last_processed_at: None,
            })),
            artifacts: ArtifactStore::default(),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_tx))),
        }
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Status {
    pub is_busy: bool,
    pub message: String,
    pub last_processed_at: Option<DateTime<Utc>>,
}
