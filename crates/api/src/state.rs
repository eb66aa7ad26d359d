use std::sync::Arc;

use vantage_core::presence::PresenceTracker;
use vantage_core::storage::FileStorage;
use vantage_events::RoomHub;
use vantage_worker::ProcessingService;

use crate::access::{FileProjectDirectory, ProjectAccess};
use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: every component is behind an `Arc` or is `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Asset directories on disk.
    pub storage: FileStorage,
    /// Job table, worker pool and processing recipes.
    pub processing: Arc<ProcessingService>,
    /// Who is currently viewing which project.
    pub presence: Arc<PresenceTracker>,
    /// Collaboration rooms keyed by project.
    pub rooms: Arc<RoomHub>,
    /// WebSocket connection registry (heartbeat and shutdown).
    pub ws_manager: Arc<WsManager>,
    /// Project ownership, sharing and API keys.
    pub access: Arc<dyn ProjectAccess>,
}

impl AppState {
    /// Build every component from configuration, with the file-backed
    /// access directory. Must be called from within a Tokio runtime.
    pub fn from_config(config: ServerConfig) -> Self {
        let storage = FileStorage::new(config.storage.clone());
        let access = FileProjectDirectory::new(
            storage.root_file(&config.projects_filename),
            storage.root_file(&config.sharing_filename),
            storage.root_file(&config.integrations_filename),
        );
        Self::with_access(config, Arc::new(access))
    }

    /// Build every component from configuration with a caller-supplied
    /// access directory.
    pub fn with_access(config: ServerConfig, access: Arc<dyn ProjectAccess>) -> Self {
        let storage = FileStorage::new(config.storage.clone());
        let processing = ProcessingService::start(
            storage.clone(),
            config.processor.clone(),
            config.worker_max_concurrent,
        );
        Self {
            presence: Arc::new(PresenceTracker::new(config.presence_stale_window)),
            processing: Arc::new(processing),
            rooms: Arc::new(RoomHub::new()),
            ws_manager: Arc::new(WsManager::new()),
            storage,
            access,
            config: Arc::new(config),
        }
    }
}
