//! Messaging bridge between the orchestrator and an extractor.
//!
//! Injecting the extractor and the extractor registering its listener race
//! each other. The bridge retries delivery only while the failure is
//! [`DeliveryError::NoReceiver`]; any other failure, or running out of
//! attempts, resolves to `None` rather than an error.

use tracing::{debug, warn};

use crate::error::DeliveryError;
use crate::page::{ExtractorRequest, ExtractorResponse, PageChannel, TargetId};
use crate::retry::{retry_bounded, RetryError};
use crate::types::config::RetryPolicy;

/// Delivers requests to an extractor, absorbing the start-up race.
pub struct MessagingBridge<'a, C: PageChannel + ?Sized> {
    channel: &'a C,
    policy: RetryPolicy,
}

impl<'a, C: PageChannel + ?Sized> MessagingBridge<'a, C> {
    /// Bridge over `channel` with the default 10 x 100ms policy.
    pub fn new(channel: &'a C) -> Self {
        Self {
            channel,
            policy: RetryPolicy::messaging(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Send `request` to `target`; `None` means no response.
    pub async fn request(
        &self,
        target: TargetId,
        request: ExtractorRequest,
    ) -> Option<ExtractorResponse> {
        let outcome = retry_bounded(
            self.policy,
            |attempt| {
                debug!(target_id = %target, attempt, "Delivering message to extractor");
                self.channel.send(target, request)
            },
            DeliveryError::is_no_receiver,
        )
        .await;

        match outcome {
            Ok(response) => Some(response),
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!(target_id = %target, attempts, error = %last, "Extractor never started listening");
                None
            }
            Err(RetryError::Aborted { attempt, error }) => {
                warn!(target_id = %target, attempt, error = %error, "Message delivery failed");
                None
            }
        }
    }
}
