//! Tasks Module Tests
//!
//! ## Test Scopes
//! - **Registry**: Registration, duplicate rejection, lookup at the string boundary.
//! - **Payloads**: Arity and argument decoding helpers, typed task encoding.
//! - **Processor**: Execution policy, deduplication and error isolation for inbound tasks.

#[cfg(test)]
mod tests {
    use crate::error::TaskError;
    use crate::membership::types::ServerName;
    use crate::tasks::processor::{BatchReport, ProcessOutcome, TaskProcessor};
    use crate::tasks::registry::{TaskRegistration, TaskRegistry};
    use crate::tasks::types::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_registration(kind: TaskKind, counter: Arc<AtomicUsize>) -> TaskRegistration {
        TaskRegistration::from_fn(kind, move |_payload| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn payload_from(origin: &str, kind: TaskKind, text: &[&str]) -> TaskPayload {
        TaskPayload::new(
            ServerName::new(origin),
            kind.as_str(),
            text.iter().map(|s| s.to_string()).collect(),
        )
    }

    // ============================================================
    // TEST 1: TaskRegistry
    // ============================================================

    #[test]
    fn test_registry_register_and_execute() {
        // ARRANGE
        let registry = TaskRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));

        // ACT
        registry
            .register(counting_registration(TaskKind::TouchCacheItem, calls.clone()))
            .unwrap();

        // ASSERT
        assert!(registry.has_task(TaskKind::TouchCacheItem));
        assert_eq!(registry.task_count(), 1);

        let payload = payload_from("web-02", TaskKind::TouchCacheItem, &["key"]);
        registry.execute(&payload).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registry_rejects_duplicate_registration() {
        // ARRANGE
        let registry = TaskRegistry::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        registry
            .register(counting_registration(TaskKind::RemoveCacheItem, first.clone()))
            .unwrap();

        // ACT
        let result =
            registry.register(counting_registration(TaskKind::RemoveCacheItem, second.clone()));

        // ASSERT: rejected, and the first registration stays active
        assert!(matches!(result, Err(TaskError::DuplicateRegistration(ref kind)) if kind == "REMOVECACHEITEM"));
        assert_eq!(registry.task_count(), 1);

        let payload = payload_from("web-02", TaskKind::RemoveCacheItem, &["false", "k"]);
        registry.execute(&payload).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_registry_unknown_task_type() {
        let registry = TaskRegistry::new();
        let payload = TaskPayload::new(ServerName::new("web-02"), "NOSUCHTASK", vec![]);

        let result = registry.execute(&payload);
        assert!(matches!(result, Err(TaskError::UnknownTaskType(_))));
        assert!(result.unwrap_err().to_string().contains("NOSUCHTASK"));
    }

    #[test]
    fn test_registry_known_but_unregistered_type() {
        let registry = TaskRegistry::new();
        let result = registry.resolve("CLEARFULLPAGECACHE");

        assert!(matches!(result, Err(TaskError::NotRegistered(_))));
    }

    #[test]
    fn test_registry_lists_tasks_sorted() {
        let registry = TaskRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(counting_registration(TaskKind::ClearCacheItems, calls.clone()))
            .unwrap();
        registry
            .register(counting_registration(TaskKind::TouchCacheItem, calls))
            .unwrap();

        assert_eq!(
            registry.list_tasks(),
            vec!["TOUCHCACHEITEM".to_string(), "CLEARCACHEITEMS".to_string()]
        );
    }

    #[test]
    fn test_registration_condition() {
        let registration = TaskRegistration::from_fn(TaskKind::DeleteAttachment, |_| Ok(()))
            .condition(|payload| payload.target.as_deref() == Some("allowed"));

        let allowed = payload_from("web-01", TaskKind::DeleteAttachment, &[])
            .with_target(Some("allowed".to_string()));
        let denied = payload_from("web-01", TaskKind::DeleteAttachment, &[]);

        assert!(registration.allows(&allowed));
        assert!(!registration.allows(&denied));

        // No condition: always allowed
        let open = TaskRegistration::from_fn(TaskKind::TouchCacheItem, |_| Ok(()));
        assert!(open.allows(&denied));
    }

    #[test]
    fn test_registry_and_processor_run_the_same_handler() {
        // ARRANGE
        let registry = TaskRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        registry
            .register(TaskRegistration::from_fn(
                TaskKind::RemoveCacheItem,
                move |payload| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    payload.expect_arity(2)
                },
            ))
            .unwrap();
        let processor = TaskProcessor::new(registry.clone(), ServerName::new("web-01"), false);
        let registration = registry.get(TaskKind::RemoveCacheItem).unwrap();

        // ACT
        let direct = registration.execute(&payload_from("web-02", TaskKind::RemoveCacheItem, &["false", "a"]));
        let via_registry = registry.execute(&payload_from("web-02", TaskKind::RemoveCacheItem, &["false"]));
        let via_processor =
            processor.process(&payload_from("web-02", TaskKind::RemoveCacheItem, &["false"]));

        // ASSERT: same handler, same error for the same bad input
        assert!(direct.is_ok());
        assert!(matches!(via_registry, Err(TaskError::Arity { .. })));
        assert!(matches!(via_processor, Err(TaskError::Arity { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    // ============================================================
    // TEST 2: TaskKind and payload helpers
    // ============================================================

    #[test]
    fn test_task_kind_parse_is_case_insensitive() {
        for kind in TaskKind::ALL {
            assert_eq!(kind.as_str().parse::<TaskKind>().unwrap(), kind);
            assert_eq!(kind.as_str().to_lowercase().parse::<TaskKind>().unwrap(), kind);
        }
        assert!("".parse::<TaskKind>().is_err());
    }

    #[test]
    fn test_arity_error_states_expected_and_actual() {
        let payload = payload_from("web-01", TaskKind::RemoveCacheItem, &["a", "b", "c"]);

        let error = payload.expect_arity(2).unwrap_err();
        let message = error.to_string();
        assert!(message.contains("expects 2"), "{}", message);
        assert!(message.contains("got 3"), "{}", message);

        let error = payload_from("web-01", TaskKind::TouchCacheItem, &[])
            .expect_min_arity(1)
            .unwrap_err();
        assert!(error.to_string().contains("at least 1"));
    }

    #[test]
    fn test_bool_arguments() {
        let payload = payload_from("web-01", TaskKind::RemoveCacheItem, &["True", "0", "maybe"]);

        assert!(payload.bool_arg(0).unwrap());
        assert!(!payload.bool_arg(1).unwrap());
        assert!(matches!(
            payload.bool_arg(2),
            Err(TaskError::InvalidArgument { .. })
        ));
        assert!(payload.bool_arg(3).is_err());
    }

    #[test]
    fn test_farm_task_encoding() {
        let origin = ServerName::new("web-01");

        let payload = FarmTask::ClearCacheItems {
            prefix: "page".to_string(),
            case_sensitive: false,
        }
        .into_payload(origin.clone());
        assert_eq!(payload.task_type, "CLEARCACHEITEMS");
        assert_eq!(payload.text_data, vec!["false".to_string(), "page".to_string()]);
        assert_eq!(payload.origin, origin);

        let payload = FarmTask::ClearFullPageCache.into_payload(origin.clone());
        assert!(payload.text_data.is_empty());
        assert!(payload.binary_data.is_none());

        let payload = FarmTask::TouchCacheItem {
            keys: vec!["a".to_string(), "b".to_string()],
        }
        .into_payload(origin);
        assert_eq!(payload.text_data.len(), 2);
    }

    #[test]
    fn test_same_data_ignores_identity() {
        let a = payload_from("web-01", TaskKind::TouchCacheItem, &["k"]);
        let b = payload_from("web-01", TaskKind::TouchCacheItem, &["k"]);
        let c = payload_from("web-01", TaskKind::TouchCacheItem, &["other"]);

        assert_ne!(a.task_id, b.task_id);
        assert!(a.same_data(&b));
        assert!(!a.same_data(&c));
    }

    // ============================================================
    // TEST 3: TaskProcessor
    // ============================================================

    fn processor_with_counter(shared_storage: bool) -> (TaskProcessor, Arc<AtomicUsize>) {
        let registry = TaskRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        registry
            .register(counting_registration(TaskKind::TouchCacheItem, calls.clone()))
            .unwrap();
        registry
            .register(
                counting_registration(TaskKind::UpdateAttachment, calls.clone()).memory_task(false),
            )
            .unwrap();

        (
            TaskProcessor::new(registry, ServerName::new("web-01"), shared_storage),
            calls,
        )
    }

    #[test]
    fn test_processor_applies_peer_task() {
        let (processor, calls) = processor_with_counter(false);
        let payload = payload_from("web-02", TaskKind::TouchCacheItem, &["k"]);

        assert_eq!(processor.process(&payload).unwrap(), ProcessOutcome::Applied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_processor_ignores_own_tasks() {
        let (processor, calls) = processor_with_counter(false);
        let payload = payload_from("web-01", TaskKind::TouchCacheItem, &["k"]);

        assert_eq!(processor.process(&payload).unwrap(), ProcessOutcome::OwnTask);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_processor_deduplicates_redelivery() {
        let (processor, calls) = processor_with_counter(false);
        let payload = payload_from("web-02", TaskKind::TouchCacheItem, &["k"]);

        processor.process(&payload).unwrap();
        assert_eq!(processor.process(&payload).unwrap(), ProcessOutcome::Duplicate);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_processor_skips_io_tasks_on_shared_storage() {
        let (processor, calls) = processor_with_counter(true);

        let io = payload_from("web-02", TaskKind::UpdateAttachment, &[]);
        assert_eq!(
            processor.process(&io).unwrap(),
            ProcessOutcome::SkippedSharedStorage
        );

        // Memory tasks still run
        let memory = payload_from("web-02", TaskKind::TouchCacheItem, &["k"]);
        assert_eq!(processor.process(&memory).unwrap(), ProcessOutcome::Applied);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_processor_failed_task_can_be_redelivered() {
        let registry = TaskRegistry::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        registry
            .register(TaskRegistration::from_fn(
                TaskKind::RemoveCacheItem,
                move |payload| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    payload.expect_arity(2)
                },
            ))
            .unwrap();
        let processor = TaskProcessor::new(registry, ServerName::new("web-01"), false);

        let payload = payload_from("web-02", TaskKind::RemoveCacheItem, &["false"]);
        assert!(processor.process(&payload).is_err());
        assert!(processor.process(&payload).is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_process_batch_isolates_failures() {
        let (processor, calls) = processor_with_counter(false);

        let batch = vec![
            payload_from("web-02", TaskKind::TouchCacheItem, &["a"]),
            TaskPayload::new(ServerName::new("web-02"), "NOSUCHTASK", vec![]),
            payload_from("web-02", TaskKind::ClearFullPageCache, &[]),
            payload_from("web-01", TaskKind::TouchCacheItem, &["own"]),
            payload_from("web-02", TaskKind::TouchCacheItem, &["b"]),
        ];

        let report = processor.process_batch(&batch);

        assert_eq!(
            report,
            BatchReport {
                applied: 2,
                skipped: 1,
                failed: 2,
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
