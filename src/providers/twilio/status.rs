//! Twilio message status mapping.

use crate::types::DeliveryStatus;

/// Maps a raw Twilio message status onto a [`DeliveryStatus`].
///
/// A missing status means the message was accepted but not yet picked up
/// by a worker, so it maps to `Queued`. Unrecognized statuses come back as
/// `Err` with the raw value so callers surface them instead of silently
/// treating them as progress.
pub(crate) fn map_message_status(raw: Option<&str>) -> Result<DeliveryStatus, &str> {
    let Some(raw) = raw else {
        return Ok(DeliveryStatus::Queued);
    };

    match raw {
        "queued" | "accepted" | "sending" | "receiving" | "scheduled" => Ok(DeliveryStatus::Queued),
        "sent" => Ok(DeliveryStatus::Sent),
        "delivered" | "received" => Ok(DeliveryStatus::Delivered),
        "read" => Ok(DeliveryStatus::Read),
        "failed" | "canceled" => Ok(DeliveryStatus::Failed),
        "undelivered" => Ok(DeliveryStatus::Undelivered),
        other => Err(other),
    }
}
