use std::sync::Arc;

use crate::{
    config::Config,
    services::{notification_service::NotificationEmitter, profile_directory::ProfileDirectory},
    store::ChatStore,
    websocket::ConnectionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub registry: ConnectionRegistry,
    pub profiles: Arc<dyn ProfileDirectory>,
    pub emitter: NotificationEmitter,
    pub config: Arc<Config>,
}
