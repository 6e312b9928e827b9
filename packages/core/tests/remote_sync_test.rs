//! Remote Sync Tests
//!
//! Pulls merge fetched batches into the shared document, pushes drain the
//! outbound change list (and put it back on failure), and a cancelled pull
//! applies nothing.

#[cfg(test)]
mod remote_sync_tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use outliner_core::services::{
        LockRegistry, RemoteChange, RemoteNode, RemoteSource, RemoteSync,
    };
    use outliner_core::{Document, EngineConfig, NodeId, OutlineError, OutlineResult, OwnerToken, SharedDocument};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};
    use tokio::time::{sleep, timeout, Duration};

    /// Source serving queued batches and recording pushes
    #[derive(Default)]
    struct FakeSource {
        incoming: Mutex<Vec<Vec<RemoteChange>>>,
        pushed: Mutex<Vec<RemoteChange>>,
        fail_push: AtomicBool,
        hang: AtomicBool,
    }

    #[async_trait]
    impl RemoteSource for FakeSource {
        async fn fetch(&self) -> OutlineResult<Vec<RemoteChange>> {
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            let mut incoming = self.incoming.lock();
            Ok(if incoming.is_empty() {
                Vec::new()
            } else {
                incoming.remove(0)
            })
        }

        async fn push(&self, changes: Vec<RemoteChange>) -> OutlineResult<()> {
            if self.fail_push.load(Ordering::SeqCst) {
                return Err(OutlineError::persistence("remote unavailable"));
            }
            self.pushed.lock().extend(changes);
            Ok(())
        }
    }

    fn shared(text: &str) -> SharedDocument {
        Document::from_text(text, Arc::new(LockRegistry::new()), EngineConfig::default())
            .0
            .into_shared()
    }

    #[tokio::test]
    async fn test_pull_merges_remote_batch() -> Result<()> {
        let document = shared("- A\n");
        let source = Arc::new(FakeSource::default());
        let incoming = RemoteNode::new(NodeId::new(), "from phone");
        source
            .incoming
            .lock()
            .push(vec![RemoteChange::Upsert(incoming.clone())]);
        let sync = RemoteSync::new(document.clone(), source.clone());

        let report = sync.pull().await?.expect("not cancelled");
        assert_eq!(report.created, 1);
        assert!(document.lock().tree().get(incoming.id).is_some());

        // Nothing new: empty report, no version bump
        let version = document.lock().structure_version();
        let report = sync.pull().await?.expect("not cancelled");
        assert!(!report.changed());
        assert_eq!(document.lock().structure_version(), version);
        Ok(())
    }

    #[tokio::test]
    async fn test_push_sends_local_changes_once() -> Result<()> {
        let document = shared("- A\n");
        let source = Arc::new(FakeSource::default());
        let sync = RemoteSync::new(document.clone(), source.clone());

        let window = OwnerToken::new();
        let id = document.lock().visible_nodes()[0];
        document.lock().set_title(window, id, "A edited")?;

        assert_eq!(sync.push().await?, 1);
        assert_eq!(sync.push().await?, 0);
        let pushed = source.pushed.lock().clone();
        match &pushed[..] {
            [RemoteChange::Upsert(node)] => assert_eq!(node.title, "A edited"),
            other => panic!("unexpected push {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_push_requeues_changes() -> Result<()> {
        let document = shared("- A\n");
        let source = Arc::new(FakeSource::default());
        source.fail_push.store(true, Ordering::SeqCst);
        let sync = RemoteSync::new(document.clone(), source.clone());

        let window = OwnerToken::new();
        let id = document.lock().visible_nodes()[0];
        document.lock().set_title(window, id, "keep me")?;

        assert_err!(sync.push().await);
        assert!(document.lock().has_outbound_changes());

        source.fail_push.store(false, Ordering::SeqCst);
        assert_eq!(assert_ok!(sync.push().await), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_pull_applies_nothing() -> Result<()> {
        let document = shared("- A\n");
        let source = Arc::new(FakeSource::default());
        source.hang.store(true, Ordering::SeqCst);
        let sync = Arc::new(RemoteSync::new(document.clone(), source));
        let version = document.lock().structure_version();

        let pulling = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.pull().await })
        };
        sleep(Duration::from_millis(50)).await;
        sync.cancel();

        let outcome = timeout(Duration::from_secs(2), pulling).await???;
        assert!(outcome.is_none());
        assert_eq!(document.lock().structure_version(), version);
        Ok(())
    }

    #[tokio::test]
    async fn test_remote_update_keeps_focused_title() -> Result<()> {
        let document = shared("- typing here\n");
        let source = Arc::new(FakeSource::default());
        let window = OwnerToken::new();
        let id = document.lock().visible_nodes()[0];
        document.lock().focus_node(window, id)?;

        let mut remote = RemoteNode::capture(document.lock().tree(), id).expect("attached");
        remote.title = "server version".to_string();
        source.incoming.lock().push(vec![RemoteChange::Upsert(remote)]);

        RemoteSync::new(document.clone(), source).pull().await?;
        let doc = document.lock();
        assert_eq!(doc.tree().get(id).map(|n| n.title.as_str()), Some("typing here"));
        Ok(())
    }
}
