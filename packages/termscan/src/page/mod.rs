//! Page host abstractions.
//!
//! A *target* is one open page (a tab). The host knows which target is
//! focused, can inject the content extractor into it, and routes messages
//! to the extractor's listener once that listener has registered.
//! Injection and registration are racy with respect to each other; the
//! [`crate::bridge::MessagingBridge`] absorbs that race.

pub mod loader;
pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DeliveryError, HostError};
use crate::types::page::PageContent;

pub use loader::HttpPageLoader;
pub use local::LocalPageHost;

/// Identifier of an open page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Messages understood by the content extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ExtractorRequest {
    GetPageContent,
}

/// The extractor's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorResponse {
    Content(PageContent),
    Failed { error: String },
}

/// Delivery of one message to the extractor running in a target.
#[async_trait]
pub trait PageChannel: Send + Sync {
    /// Send a request and wait for the reply.
    ///
    /// Fails with [`DeliveryError::NoReceiver`] while the extractor's
    /// listener is not registered.
    async fn send(
        &self,
        target: TargetId,
        request: ExtractorRequest,
    ) -> Result<ExtractorResponse, DeliveryError>;
}

/// The privileged view of open pages used by the orchestrator.
#[async_trait]
pub trait PageHost: PageChannel {
    /// The currently focused target, if any.
    async fn active_target(&self) -> Option<TargetId>;

    /// Ensure the content extractor runs in `target` (and can read its
    /// same-origin frames). A no-op when it is already present.
    async fn inject_extractor(&self, target: TargetId) -> Result<(), HostError>;
}
