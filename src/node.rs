//! Wiring of a single farm server: registry, dispatcher, processor, transport
//! and the HTTP router exposing them.

use crate::attachments::store::AttachmentStore;
use crate::attachments::tasks::register_attachment_tasks;
use crate::cache::handlers::*;
use crate::cache::helper::CacheHelper;
use crate::cache::protocol::*;
use crate::cache::tasks::{Caches, register_cache_tasks};
use crate::config::FarmSettings;
use crate::dispatcher::dispatcher::WebFarmDispatcher;
use crate::membership::roster::ServerRoster;
use crate::tasks::processor::TaskProcessor;
use crate::tasks::registry::TaskRegistry;
use crate::transport::handlers::{handle_farm_status, handle_receive_tasks};
use crate::transport::outbox::TaskOutbox;
use crate::transport::protocol::{ENDPOINT_FARM_STATUS, ENDPOINT_WEBFARM_TASKS};
use crate::transport::sender::TaskSender;

use anyhow::Result;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Extension},
    routing::{get, post},
};
use std::sync::Arc;

/// Largest accepted task batch (attachments travel inline).
const MAX_BATCH_BYTES: usize = 64 * 1024 * 1024;

pub struct FarmNode {
    pub registry: Arc<TaskRegistry>,
    pub dispatcher: Arc<WebFarmDispatcher>,
    pub processor: Arc<TaskProcessor>,
    pub outbox: Arc<TaskOutbox>,
    pub sender: Arc<TaskSender>,
    pub caches: Caches,
    pub cache_helper: Arc<CacheHelper>,
    pub attachments: Arc<AttachmentStore>,
}

impl FarmNode {
    /// Builds every component and registers all task kinds.
    pub fn new(settings: &FarmSettings, roster: Arc<dyn ServerRoster>) -> Result<Self> {
        let registry = TaskRegistry::new();

        let caches = Caches::new(&settings.persistent_root);
        register_cache_tasks(&registry, &caches)?;

        let attachments = Arc::new(AttachmentStore::new(
            &settings.attachment_root,
            settings.sync_attachments,
        ));
        register_attachment_tasks(&registry, &attachments)?;

        let outbox = Arc::new(TaskOutbox::new());
        let dispatcher = WebFarmDispatcher::new(
            settings.enabled,
            registry.clone(),
            roster.clone(),
            outbox.clone(),
        );
        let processor = Arc::new(TaskProcessor::new(
            registry.clone(),
            roster.local_server().clone(),
            settings.shared_storage,
        ));
        let sender = TaskSender::new(outbox.clone(), roster, settings.send_interval);
        let cache_helper = CacheHelper::new(caches.clone(), dispatcher.clone());

        tracing::info!(
            "Farm node {} ready with {} registered task(s)",
            settings.server_name,
            registry.task_count()
        );

        Ok(Self {
            registry,
            dispatcher,
            processor,
            outbox,
            sender,
            caches,
            cache_helper,
            attachments,
        })
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route(ENDPOINT_WEBFARM_TASKS, post(handle_receive_tasks))
            .route(ENDPOINT_FARM_STATUS, get(handle_farm_status))
            .route(ENDPOINT_CACHE_TOUCH, post(handle_touch))
            .route(ENDPOINT_CACHE_REMOVE, post(handle_remove))
            .route(ENDPOINT_CACHE_CLEAR, post(handle_clear))
            .route(ENDPOINT_FULL_PAGE_CLEAR, post(handle_clear_full_page))
            .route(ENDPOINT_PERSISTENT_REMOVE, post(handle_remove_persistent))
            .layer(DefaultBodyLimit::max(MAX_BATCH_BYTES))
            .layer(Extension(self.processor.clone()))
            .layer(Extension(self.dispatcher.clone()))
            .layer(Extension(self.outbox.clone()))
            .layer(Extension(self.cache_helper.clone()))
    }
}
