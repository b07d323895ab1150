//! Attachments Module Tests
//!
//! ## Test Scopes
//! - **Store**: File layout, deletion of every stored variant, input validation.
//! - **Task Encoding**: Text/binary contract of the two attachment tasks.
//! - **Replication**: Synchronization gate and local-then-remote flow.

#[cfg(test)]
mod tests {
    use crate::attachments::store::AttachmentStore;
    use crate::attachments::tasks::{delete_attachment, register_attachment_tasks, save_attachment};
    use crate::attachments::types::*;
    use crate::dispatcher::dispatcher::WebFarmDispatcher;
    use crate::error::TaskError;
    use crate::membership::roster::StaticRoster;
    use crate::membership::types::{Server, ServerName};
    use crate::tasks::processor::{ProcessOutcome, TaskProcessor};
    use crate::tasks::registry::TaskRegistry;
    use crate::tasks::types::{FarmTask, TaskKind, TaskPayload};
    use crate::transport::outbox::TaskOutbox;
    use std::sync::Arc;
    use uuid::Uuid;

    const GUID: &str = "3f2504e0-4f89-11d3-9a0c-0305e82c3301";

    fn guid() -> Uuid {
        Uuid::parse_str(GUID).unwrap()
    }

    fn update_task(extension: &str, content: &[u8]) -> UpdateAttachmentTask {
        UpdateAttachmentTask {
            site_name: "corporate".to_string(),
            file_guid: guid(),
            file_name: "logo".to_string(),
            file_extension: extension.to_string(),
            delete_old_files: true,
            content: content.to_vec(),
        }
    }

    fn delete_task() -> DeleteAttachmentTask {
        DeleteAttachmentTask {
            site_name: "corporate".to_string(),
            file_guid: guid(),
            file_name: "logo".to_string(),
            delete_directory: true,
        }
    }

    // ============================================================
    // TEST 1: AttachmentStore
    // ============================================================

    #[test]
    fn test_store_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), true);

        let path = store.write_file("corporate", &guid(), ".png", b"png").unwrap();

        assert_eq!(
            path,
            dir.path()
                .join("corporate")
                .join("files")
                .join("3f")
                .join(format!("{}.png", GUID))
        );
        assert_eq!(
            AttachmentStore::relative_path("corporate", &guid(), ".png"),
            format!("corporate/files/3f/{}.png", GUID)
        );
        assert_eq!(
            store.read_file("corporate", &guid(), ".png").unwrap(),
            Some(b"png".to_vec())
        );
        assert_eq!(store.read_file("corporate", &guid(), ".jpg").unwrap(), None);
    }

    #[test]
    fn test_delete_removes_every_variant() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), true);
        let other = Uuid::new_v4();

        store.write_file("corporate", &guid(), ".png", b"a").unwrap();
        store.write_file("corporate", &guid(), ".jpg", b"b").unwrap();

        assert_eq!(store.delete_files("corporate", &guid(), true).unwrap(), 2);
        assert_eq!(store.read_file("corporate", &guid(), ".png").unwrap(), None);
        assert!(!dir.path().join("corporate/files/3f").exists());

        // Nothing stored: not an error
        assert_eq!(store.delete_files("corporate", &other, true).unwrap(), 0);
    }

    #[test]
    fn test_delete_keeps_non_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), true);
        let neighbour = Uuid::parse_str("3f000000-0000-0000-0000-000000000001").unwrap();

        store.write_file("corporate", &guid(), ".png", b"a").unwrap();
        store.write_file("corporate", &neighbour, ".png", b"b").unwrap();

        assert_eq!(store.delete_files("corporate", &guid(), true).unwrap(), 1);
        assert!(dir.path().join("corporate/files/3f").exists());
        assert!(store.read_file("corporate", &neighbour, ".png").unwrap().is_some());
    }

    #[test]
    fn test_store_rejects_unsafe_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = AttachmentStore::new(dir.path(), true);

        for site in ["", "..", "a/b", "a\\b"] {
            assert!(matches!(
                store.write_file(site, &guid(), ".png", b"x"),
                Err(TaskError::InvalidArgument { .. })
            ));
        }
        for extension in ["png", ".", "./png", ".p/g"] {
            assert!(store.write_file("corporate", &guid(), extension, b"x").is_err());
        }

        // Extension-less attachments are allowed
        assert!(store.write_file("corporate", &guid(), "", b"x").is_ok());
    }

    // ============================================================
    // TEST 2: Task encoding
    // ============================================================

    #[test]
    fn test_update_task_payload_contract() {
        let payload = update_task(".png", &[1, 2, 3]).into_payload(ServerName::new("web-01"));

        assert_eq!(payload.task_type, "UPDATEATTACHMENT");
        assert_eq!(payload.target.as_deref(), Some(TARGET_FILE_UPDATE));
        assert_eq!(
            payload.text_data,
            vec!["corporate", GUID, "logo", ".png", "true"]
        );
        assert_eq!(payload.binary_data, Some(vec![1, 2, 3]));
        assert_eq!(
            payload.file_path,
            Some(format!("corporate/files/3f/{}.png", GUID))
        );

        let decoded = UpdateAttachmentTask::from_payload(&payload).unwrap();
        assert_eq!(decoded, update_task(".png", &[1, 2, 3]));
    }

    #[test]
    fn test_delete_task_payload_contract() {
        let payload = delete_task().into_payload(ServerName::new("web-01"));

        assert_eq!(payload.task_type, "DELETEATTACHMENT");
        assert_eq!(payload.target.as_deref(), Some(TARGET_FILE_DELETE));
        assert_eq!(payload.text_data, vec!["corporate", GUID, "logo", "true"]);
        assert!(payload.binary_data.is_none());
        assert_eq!(DeleteAttachmentTask::from_payload(&payload).unwrap(), delete_task());
    }

    #[test]
    fn test_malformed_attachment_payloads() {
        let origin = ServerName::new("web-02");

        // Content missing
        let mut payload = update_task(".png", b"x").into_payload(origin.clone());
        payload.binary_data = None;
        assert!(matches!(
            UpdateAttachmentTask::from_payload(&payload),
            Err(TaskError::InvalidArgument { .. })
        ));

        // Bad GUID
        let mut payload = delete_task().into_payload(origin.clone());
        payload.text_data[1] = "not-a-guid".to_string();
        let error = DeleteAttachmentTask::from_payload(&payload).unwrap_err();
        assert!(error.to_string().contains("not-a-guid"));

        // Wrong arity
        let payload = TaskPayload::new(origin, TaskKind::DeleteAttachment.as_str(), vec![]);
        assert!(matches!(
            DeleteAttachmentTask::from_payload(&payload),
            Err(TaskError::Arity { .. })
        ));
    }

    // ============================================================
    // TEST 3: Replication
    // ============================================================

    struct Farm {
        store: Arc<AttachmentStore>,
        dispatcher: Arc<WebFarmDispatcher>,
        outbox: Arc<TaskOutbox>,
        registry: Arc<TaskRegistry>,
        _dir: tempfile::TempDir,
    }

    fn farm(sync_enabled: bool) -> Farm {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(AttachmentStore::new(dir.path().join("web-01"), sync_enabled));
        let registry = TaskRegistry::new();
        register_attachment_tasks(&registry, &store).unwrap();

        let roster = StaticRoster::with_servers(
            ServerName::new("web-01"),
            vec![Server::new(
                ServerName::new("web-02"),
                "127.0.0.1:5002".parse().unwrap(),
                "127.0.0.1:6002".parse().unwrap(),
            )],
        );
        let outbox = Arc::new(TaskOutbox::new());
        let dispatcher =
            WebFarmDispatcher::new(true, registry.clone(), Arc::new(roster), outbox.clone());

        Farm {
            store,
            dispatcher,
            outbox,
            registry,
            _dir: dir,
        }
    }

    #[test]
    fn test_attachment_tasks_are_io_tasks() {
        let farm = farm(true);

        for kind in [TaskKind::UpdateAttachment, TaskKind::DeleteAttachment] {
            let registration = farm.registry.get(kind).unwrap();
            assert!(!registration.is_memory_task);
            assert!(registration.condition.is_some());
        }
    }

    #[test]
    fn test_update_guard_checks_switch_and_arity_only() {
        let farm = farm(true);
        let registration = farm.registry.get(TaskKind::UpdateAttachment).unwrap();

        // The guard does not need the file content
        let mut payload = update_task(".png", b"img").into_payload(ServerName::new("web-01"));
        payload.binary_data = None;
        assert!(registration.allows(&payload));
        assert!(UpdateAttachmentTask::condition(&payload, &farm.store));

        payload.text_data.pop();
        assert!(!registration.allows(&payload));

        let payload = update_task(".png", b"img").into_payload(ServerName::new("web-01"));
        farm.store.set_sync_enabled(false);
        assert!(!registration.allows(&payload));

        let delete = delete_task().into_payload(ServerName::new("web-01"));
        assert!(!DeleteAttachmentTask::condition(&delete, &farm.store));
        farm.store.set_sync_enabled(true);
        assert!(DeleteAttachmentTask::condition(&delete, &farm.store));
    }

    #[test]
    fn test_sync_disabled_suppresses_replication() {
        let farm = farm(false);

        let created = save_attachment(&farm.store, &farm.dispatcher, update_task(".png", b"img")).unwrap();

        // Stored locally, nothing queued for peers
        assert!(!created);
        assert!(farm.store.read_file("corporate", &guid(), ".png").unwrap().is_some());
        assert_eq!(farm.outbox.total_pending(), 0);

        farm.store.set_sync_enabled(true);
        assert!(farm
            .dispatcher
            .create_task(FarmTask::DeleteAttachment(delete_task())));
    }

    #[test]
    fn test_save_then_apply_on_peer() {
        let farm = farm(true);
        let peer_dir = tempfile::tempdir().unwrap();
        let peer_store = Arc::new(AttachmentStore::new(peer_dir.path(), true));
        let peer_registry = TaskRegistry::new();
        register_attachment_tasks(&peer_registry, &peer_store).unwrap();
        let peer = TaskProcessor::new(peer_registry, ServerName::new("web-02"), false);

        // A stale variant with another extension on the peer
        peer_store.write_file("corporate", &guid(), ".gif", b"old").unwrap();

        assert!(save_attachment(&farm.store, &farm.dispatcher, update_task(".png", b"new")).unwrap());
        let queued = farm.outbox.drain(&ServerName::new("web-02"));
        assert_eq!(queued.len(), 1);
        assert_eq!(peer.process(&queued[0]).unwrap(), ProcessOutcome::Applied);

        assert_eq!(
            peer_store.read_file("corporate", &guid(), ".png").unwrap(),
            Some(b"new".to_vec())
        );
        assert_eq!(peer_store.read_file("corporate", &guid(), ".gif").unwrap(), None);

        // Then delete it everywhere
        assert!(delete_attachment(&farm.store, &farm.dispatcher, delete_task()).unwrap());
        let queued = farm.outbox.drain(&ServerName::new("web-02"));
        assert_eq!(peer.process(&queued[0]).unwrap(), ProcessOutcome::Applied);

        assert_eq!(farm.store.read_file("corporate", &guid(), ".png").unwrap(), None);
        assert_eq!(peer_store.read_file("corporate", &guid(), ".png").unwrap(), None);
    }

    #[test]
    fn test_shared_storage_peer_skips_file_tasks() {
        let farm = farm(true);
        let peer_dir = tempfile::tempdir().unwrap();
        let peer_store = Arc::new(AttachmentStore::new(peer_dir.path(), true));
        let peer_registry = TaskRegistry::new();
        register_attachment_tasks(&peer_registry, &peer_store).unwrap();
        let peer = TaskProcessor::new(peer_registry, ServerName::new("web-02"), true);

        assert!(save_attachment(&farm.store, &farm.dispatcher, update_task(".png", b"x")).unwrap());
        let queued = farm.outbox.drain(&ServerName::new("web-02"));

        assert_eq!(
            peer.process(&queued[0]).unwrap(),
            ProcessOutcome::SkippedSharedStorage
        );
        assert_eq!(peer_store.read_file("corporate", &guid(), ".png").unwrap(), None);
    }
}
