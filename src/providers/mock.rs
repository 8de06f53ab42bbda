//! In-memory provider for tests and local development.

use crate::providers::traits::MessagingProvider;
use crate::types::{DeliveryResult, DeliveryStatus};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One recorded send: the message as the provider received it, and the
/// result it returned.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage<M> {
    pub message: M,
    pub result: DeliveryResult,
}

struct MockState<M> {
    sent: Mutex<Vec<SentMessage<M>>>,
    script: Mutex<VecDeque<DeliveryResult>>,
    fixed_result: Option<DeliveryResult>,
    #[cfg(feature = "random")]
    failure_rate: f64,
    counter: AtomicU64,
}

/// Mock provider that records every send instead of calling a wire API.
///
/// Works for any message family, so the same mock drives WhatsApp, SMS,
/// email and Telegram tests. Clones share state: hand a clone to the code
/// under test and keep one for assertions.
///
/// Result selection per send, in order:
///
/// 1. the next scripted result, if a script was given and is not exhausted
/// 2. the fixed result, if one was given
/// 3. a random failure, when built with a failure rate (`random` feature)
/// 4. a successful `Sent` result with a sequential `mock_{n}` external id
///
/// # Example
///
/// ```rust,ignore
/// use messaging_gateway::{MockProvider, MessagingProvider, SmsMessage};
///
/// let provider: MockProvider<SmsMessage> = MockProvider::new();
/// let result = provider.send(&SmsMessage::new("+14155238886", "hi")).await;
///
/// assert!(result.succeeded());
/// assert_eq!(provider.sent()[0].message.body, "hi");
/// ```
pub struct MockProvider<M> {
    state: Arc<MockState<M>>,
}

impl<M> Clone for MockProvider<M> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<M> std::fmt::Debug for MockProvider<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockProvider")
            .field("sent", &self.sent_count())
            .finish()
    }
}

impl<M> Default for MockProvider<M> {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<M> MockProvider<M> {
    /// Create a mock where every send succeeds.
    pub fn new() -> Self {
        Self::from_parts(None, VecDeque::new())
    }

    /// Create a mock that returns `result` for every send.
    pub fn with_fixed_result(result: DeliveryResult) -> Self {
        Self::from_parts(Some(result), VecDeque::new())
    }

    /// Create a mock that returns the given results one per send, in order,
    /// then falls back to successful results.
    pub fn with_script(results: impl IntoIterator<Item = DeliveryResult>) -> Self {
        Self::from_parts(None, results.into_iter().collect())
    }

    /// Create a mock that fails randomly with the given probability
    /// (`0.0..=1.0`) and succeeds otherwise.
    #[cfg(feature = "random")]
    pub fn with_failure_rate(failure_rate: f64) -> Self {
        Self {
            state: Arc::new(MockState {
                sent: Mutex::new(Vec::new()),
                script: Mutex::new(VecDeque::new()),
                fixed_result: None,
                failure_rate,
                counter: AtomicU64::new(0),
            }),
        }
    }

    fn from_parts(fixed_result: Option<DeliveryResult>, script: VecDeque<DeliveryResult>) -> Self {
        Self {
            state: Arc::new(MockState {
                sent: Mutex::new(Vec::new()),
                script: Mutex::new(script),
                fixed_result,
                #[cfg(feature = "random")]
                failure_rate: 0.0,
                counter: AtomicU64::new(0),
            }),
        }
    }

    fn next_result(&self) -> DeliveryResult {
        if let Some(result) = lock(&self.state.script).pop_front() {
            return result;
        }

        if let Some(result) = &self.state.fixed_result {
            return result.clone();
        }

        #[cfg(feature = "random")]
        if self.state.failure_rate > 0.0 && rand::random::<f64>() < self.state.failure_rate {
            return DeliveryResult::fail("Simulated failure");
        }

        let n = self.state.counter.fetch_add(1, Ordering::Relaxed) + 1;
        DeliveryResult::ok_with_id(DeliveryStatus::Sent, format!("mock_{n}"))
    }

    /// Snapshot of everything sent so far, in send order.
    pub fn sent(&self) -> Vec<SentMessage<M>>
    where
        M: Clone,
    {
        lock(&self.state.sent).clone()
    }

    /// Number of sends recorded so far.
    pub fn sent_count(&self) -> usize {
        lock(&self.state.sent).len()
    }

    /// Forget all recorded sends. Scripted results are not restored.
    pub fn reset(&self) {
        lock(&self.state.sent).clear();
    }
}

impl<M> MessagingProvider for MockProvider<M>
where
    M: Clone + Send + Sync + 'static,
{
    type Message = M;

    async fn send(&self, message: &M) -> DeliveryResult {
        let result = self.next_result();
        lock(&self.state.sent).push(SentMessage {
            message: message.clone(),
            result: result.clone(),
        });
        result
    }

    async fn fetch_status(&self, external_id: &str) -> Option<DeliveryResult> {
        lock(&self.state.sent)
            .iter()
            .find(|record| record.result.external_id() == Some(external_id))
            .map(|record| record.result.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SmsMessage;

    fn sms(body: &str) -> SmsMessage {
        SmsMessage::new("+14155238886", body)
    }

    #[tokio::test]
    async fn test_records_sent_messages_in_order() {
        let provider: MockProvider<SmsMessage> = MockProvider::new();

        let first = provider.send(&sms("first")).await;
        let second = provider.send(&sms("second")).await;

        assert!(first.succeeded());
        assert_eq!(first.external_id(), Some("mock_1"));
        assert_eq!(second.external_id(), Some("mock_2"));

        let sent = provider.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message.body, "first");
        assert_eq!(sent[1].message.body, "second");
    }

    #[tokio::test]
    async fn test_fixed_result_is_returned_for_every_send() {
        let provider: MockProvider<SmsMessage> =
            MockProvider::with_fixed_result(DeliveryResult::fail("Simulated failure"));

        for _ in 0..3 {
            let result = provider.send(&sms("hi")).await;
            assert!(!result.succeeded());
            assert_eq!(result.error_message(), Some("Simulated failure"));
        }
        assert_eq!(provider.sent_count(), 3);
    }

    #[tokio::test]
    async fn test_script_is_consumed_then_defaults_to_success() {
        let provider: MockProvider<SmsMessage> = MockProvider::with_script([
            DeliveryResult::fail("boom"),
            DeliveryResult::ok(DeliveryStatus::Queued),
        ]);

        assert!(!provider.send(&sms("a")).await.succeeded());
        assert_eq!(
            provider.send(&sms("b")).await.status(),
            DeliveryStatus::Queued
        );

        let after_script = provider.send(&sms("c")).await;
        assert!(after_script.succeeded());
        assert_eq!(after_script.external_id(), Some("mock_1"));
    }

    #[tokio::test]
    async fn test_fetch_status_finds_recorded_result() {
        let provider: MockProvider<SmsMessage> = MockProvider::new();

        let result = provider.send(&sms("hi")).await;
        let id = result.external_id().expect("mock assigns ids");

        let fetched = provider.fetch_status(id).await.expect("recorded");
        assert_eq!(fetched, result);

        assert!(provider.fetch_status("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_clones_share_recorded_state() {
        let provider: MockProvider<SmsMessage> = MockProvider::new();
        let clone = provider.clone();

        clone.send(&sms("hi")).await;

        assert_eq!(provider.sent_count(), 1);
        provider.reset();
        assert_eq!(clone.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_spawn_send_resolves_to_same_outcome() {
        let provider: MockProvider<SmsMessage> = MockProvider::new();

        let handle = provider.spawn_send(sms("background"));
        let result = handle.await.expect("send task panicked");

        assert!(result.succeeded());
        assert_eq!(provider.sent()[0].message.body, "background");
    }
}
