//! Provider trait definition.

use crate::types::DeliveryResult;
use std::future::Future;
use tokio::task::JoinHandle;

/// Core trait that all message delivery providers implement.
///
/// A provider is a thin adapter between one message family and one wire
/// protocol. The essential rule of the contract: **delivery problems are
/// never errors**. `send` always completes with a [`DeliveryResult`];
/// rejected numbers, provider outages and timeouts all come back encoded in
/// the result. The only fallible moment is provider construction (see
/// [`ConfigError`](crate::ConfigError)).
///
/// # Type Parameters
///
/// - `Message`: the message family this provider delivers (e.g.
///   [`WhatsAppMessage`](crate::WhatsAppMessage),
///   [`SmsMessage`](crate::SmsMessage), [`EmailMessage`](crate::EmailMessage))
///
/// # Concurrency
///
/// Providers are `Clone + Send + Sync` and hold one connection-pooled HTTP
/// client created at construction; clones share it. Concurrent sends are
/// safe and do not serialize on remote latency. Providers never retry on
/// their own; retry policy belongs to
/// [`MessagingGateway`](crate::MessagingGateway).
///
/// # Note on async methods
///
/// All async methods in this trait return `Send` futures, making them
/// compatible with multi-threaded executors.
///
/// # Example
///
/// ```rust,ignore
/// use messaging_gateway::{DeliveryResult, DeliveryStatus, MessagingProvider, SmsMessage};
///
/// #[derive(Clone)]
/// struct MyProvider { /* ... */ }
///
/// impl MessagingProvider for MyProvider {
///     type Message = SmsMessage;
///
///     async fn send(&self, message: &SmsMessage) -> DeliveryResult {
///         // Map the message onto the wire, map the outcome back.
///         DeliveryResult::ok(DeliveryStatus::Sent)
///     }
/// }
/// ```
pub trait MessagingProvider: Send + Sync + Clone + 'static {
    /// Message family this provider delivers.
    type Message: Clone + Send + Sync + 'static;

    /// Deliver a message and await the outcome.
    ///
    /// Never fails with an error: every delivery problem is encoded in the
    /// returned [`DeliveryResult`].
    fn send(&self, message: &Self::Message) -> impl Future<Output = DeliveryResult> + Send;

    /// Fetch the current delivery status for a previously sent message.
    ///
    /// Returns `None` when the provider has no status polling API or the
    /// message is unknown; absence is "unknown", never an error. The
    /// default implementation reports no polling support.
    fn fetch_status(
        &self,
        external_id: &str,
    ) -> impl Future<Output = Option<DeliveryResult>> + Send {
        let _ = external_id;
        async { None }
    }

    /// Queue a send on a background task.
    ///
    /// Returns immediately with a handle that resolves to the same result
    /// [`send`](Self::send) would produce for the same message; the caller's
    /// execution context is never blocked.
    fn spawn_send(&self, message: Self::Message) -> JoinHandle<DeliveryResult>
    where
        Self: Sized,
    {
        let provider = self.clone();
        tokio::spawn(async move { provider.send(&message).await })
    }
}
