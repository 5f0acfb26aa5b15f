//! In-process page host.
//!
//! Each open page is a tab backed by a [`SnapshotSource`]. Injecting the
//! extractor spawns a task per tab which registers its listener only after
//! its start-up delay has elapsed, the same way a freshly injected content
//! script is not immediately reachable.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info};

use crate::error::{DeliveryError, HostError};
use crate::extractor::{ContentExtractor, SnapshotSource};
use crate::page::{ExtractorRequest, ExtractorResponse, PageChannel, PageHost, TargetId};
use crate::types::config::ExtractorConfig;

struct Envelope {
    request: ExtractorRequest,
    reply: oneshot::Sender<ExtractorResponse>,
}

struct Tab {
    url: String,
    source: Arc<dyn SnapshotSource>,
}

type Tabs = Arc<RwLock<HashMap<TargetId, Tab>>>;
type Listeners = Arc<RwLock<HashMap<TargetId, mpsc::Sender<Envelope>>>>;

/// Page host that runs extractors as tokio tasks.
///
/// # Example
///
/// ```rust,ignore
/// let host = LocalPageHost::new();
/// let snapshot = HttpPageLoader::new().load("https://example.com/terms").await?;
/// host.open_tab(snapshot).await;
/// let verifier = Verifier::new(host, MemoryResultStore::new(), gemini);
/// ```
pub struct LocalPageHost {
    extractor_config: ExtractorConfig,
    listener_delay: Duration,
    tabs: Tabs,
    listeners: Listeners,
    injected: RwLock<HashSet<TargetId>>,
    active: RwLock<Option<TargetId>>,
    next_id: AtomicU64,
}

impl Default for LocalPageHost {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalPageHost {
    /// Create an empty host with default extractor settings.
    pub fn new() -> Self {
        Self {
            extractor_config: ExtractorConfig::default(),
            listener_delay: Duration::ZERO,
            tabs: Arc::new(RwLock::new(HashMap::new())),
            listeners: Arc::new(RwLock::new(HashMap::new())),
            injected: RwLock::new(HashSet::new()),
            active: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Set the extractor config used by injected extractors.
    pub fn with_extractor_config(mut self, config: ExtractorConfig) -> Self {
        self.extractor_config = config;
        self
    }

    /// Delay between injection and listener registration.
    pub fn with_listener_delay(mut self, delay: Duration) -> Self {
        self.listener_delay = delay;
        self
    }

    /// Open a page and focus it.
    pub async fn open_tab<S>(&self, source: S) -> TargetId
    where
        S: SnapshotSource + 'static,
    {
        let id = TargetId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let url = source.snapshot().url;
        info!(target_id = %id, url = %url, "Opened tab");

        self.tabs.write().await.insert(
            id,
            Tab {
                url,
                source: Arc::new(source),
            },
        );
        *self.active.write().await = Some(id);
        id
    }

    /// Focus an open tab.
    pub async fn activate(&self, id: TargetId) -> Result<(), HostError> {
        if !self.tabs.read().await.contains_key(&id) {
            return Err(HostError::UnknownTarget(id));
        }
        *self.active.write().await = Some(id);
        Ok(())
    }

    /// Close a tab, stopping its extractor.
    pub async fn close_tab(&self, id: TargetId) {
        self.tabs.write().await.remove(&id);
        self.listeners.write().await.remove(&id);
        self.injected.write().await.remove(&id);

        let mut active = self.active.write().await;
        if *active == Some(id) {
            *active = None;
        }
    }

    /// URL of an open tab.
    pub async fn url(&self, id: TargetId) -> Option<String> {
        self.tabs.read().await.get(&id).map(|t| t.url.clone())
    }

    /// Whether the tab's extractor has registered its listener.
    pub async fn is_listening(&self, id: TargetId) -> bool {
        self.listeners.read().await.contains_key(&id)
    }
}

#[async_trait]
impl PageChannel for LocalPageHost {
    async fn send(
        &self,
        target: TargetId,
        request: ExtractorRequest,
    ) -> Result<ExtractorResponse, DeliveryError> {
        let sender = self
            .listeners
            .read()
            .await
            .get(&target)
            .cloned()
            .ok_or(DeliveryError::NoReceiver)?;

        let (reply, response) = oneshot::channel();
        sender
            .send(Envelope { request, reply })
            .await
            .map_err(|_| DeliveryError::Disconnected("extractor task ended".into()))?;

        response.await.map_err(|_| {
            DeliveryError::Disconnected(
                "The message port closed before a response was received.".into(),
            )
        })
    }
}

#[async_trait]
impl PageHost for LocalPageHost {
    async fn active_target(&self) -> Option<TargetId> {
        let active = *self.active.read().await;
        match active {
            Some(id) if self.tabs.read().await.contains_key(&id) => Some(id),
            _ => None,
        }
    }

    async fn inject_extractor(&self, target: TargetId) -> Result<(), HostError> {
        let source = self
            .tabs
            .read()
            .await
            .get(&target)
            .map(|tab| Arc::clone(&tab.source))
            .ok_or(HostError::UnknownTarget(target))?;

        if !self.injected.write().await.insert(target) {
            debug!(target_id = %target, "Extractor already injected");
            return Ok(());
        }

        let extractor = ContentExtractor::new(self.extractor_config.clone());
        let (tx, rx) = mpsc::channel(8);
        let tabs = Arc::clone(&self.tabs);
        let listeners = Arc::clone(&self.listeners);
        let delay = self.listener_delay;

        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            // The tab may have closed while we were starting up.
            if !tabs.read().await.contains_key(&target) {
                return;
            }
            listeners.write().await.insert(target, tx);
            debug!(target_id = %target, "Extractor listener registered");

            run_listener(extractor, source, rx).await;
            debug!(target_id = %target, "Extractor listener stopped");
        });

        Ok(())
    }
}

async fn run_listener(
    extractor: ContentExtractor,
    source: Arc<dyn SnapshotSource>,
    mut inbox: mpsc::Receiver<Envelope>,
) {
    while let Some(envelope) = inbox.recv().await {
        let response = match envelope.request {
            ExtractorRequest::GetPageContent => {
                ExtractorResponse::Content(extractor.extract(source.as_ref()).await)
            }
        };
        // The requester may have given up; nothing to do then.
        let _ = envelope.reply.send(response);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::config::RetryPolicy;
    use crate::types::page::{ExtractionReason, PageSnapshot};

    fn terms_page() -> PageSnapshot {
        PageSnapshot::new(
            "https://example.com/terms",
            "<body><main>These terms of service apply to all users of the example platform.</main></body>",
        )
    }

    #[tokio::test]
    async fn test_active_target_follows_open_and_close() {
        let host = LocalPageHost::new();
        assert_eq!(host.active_target().await, None);

        let first = host.open_tab(terms_page()).await;
        let second = host.open_tab(terms_page()).await;
        assert_eq!(host.active_target().await, Some(second));

        host.activate(first).await.unwrap();
        assert_eq!(host.active_target().await, Some(first));

        host.close_tab(first).await;
        assert_eq!(host.active_target().await, None);
        assert!(matches!(
            host.activate(first).await,
            Err(HostError::UnknownTarget(_))
        ));
    }

    #[tokio::test]
    async fn test_send_before_injection_has_no_receiver() {
        let host = LocalPageHost::new();
        let id = host.open_tab(terms_page()).await;

        let result = host.send(id, ExtractorRequest::GetPageContent).await;
        assert_eq!(result, Err(DeliveryError::NoReceiver));
    }

    #[tokio::test]
    async fn test_listener_registers_after_delay() {
        let host = LocalPageHost::new().with_listener_delay(Duration::from_millis(30));
        let id = host.open_tab(terms_page()).await;
        host.inject_extractor(id).await.unwrap();

        assert!(!host.is_listening(id).await);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(host.is_listening(id).await);

        let response = host.send(id, ExtractorRequest::GetPageContent).await.unwrap();
        match response {
            ExtractorResponse::Content(content) => {
                assert_eq!(content.reason, ExtractionReason::SelectorMatch);
                assert!(content.text.starts_with("These terms of service"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inject_is_idempotent() {
        let host = LocalPageHost::new().with_extractor_config(
            ExtractorConfig::new().with_retry(RetryPolicy::once()),
        );
        let id = host.open_tab(terms_page()).await;
        host.inject_extractor(id).await.unwrap();
        host.inject_extractor(id).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(host.send(id, ExtractorRequest::GetPageContent).await.is_ok());
    }

    #[tokio::test]
    async fn test_inject_unknown_target() {
        let host = LocalPageHost::new();
        let result = host.inject_extractor(TargetId(99)).await;
        assert!(matches!(result, Err(HostError::UnknownTarget(TargetId(99)))));
    }
}
