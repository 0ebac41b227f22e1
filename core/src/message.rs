//! Broker message types.
//!
//! An [`Envelope`] is what gets published; a [`Delivery`] is what a consumer
//! receives. Both carry the two broker-level properties the request/reply
//! pattern depends on: `reply_to` and `correlation_id`.
//!
//! Payloads are JSON bytes. The broker never looks inside them.

use serde::Serialize;

/// Content type attached to every published payload.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// An outbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Serialized payload
    pub payload: Vec<u8>,
    /// Queue the receiver should publish its reply to
    pub reply_to: Option<String>,
    /// Opaque token echoed back in the reply
    pub correlation_id: Option<String>,
    /// Payload schema version of the destination queue's contract
    pub schema_version: Option<u32>,
}

impl Envelope {
    /// Create an envelope with no reply routing.
    #[must_use]
    pub const fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            reply_to: None,
            correlation_id: None,
            schema_version: None,
        }
    }

    /// Serialize a value as the JSON payload of a new envelope.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the value cannot be represented as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::to_vec(value)?))
    }

    /// Set the reply queue.
    #[must_use]
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set the schema version.
    #[must_use]
    pub const fn with_schema_version(mut self, version: u32) -> Self {
        self.schema_version = Some(version);
        self
    }
}

/// An inbound message received by a consumer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    /// Raw payload bytes
    pub payload: Vec<u8>,
    /// Queue the sender expects a reply on
    pub reply_to: Option<String>,
    /// Correlation id set by the sender
    pub correlation_id: Option<String>,
}

impl Delivery {
    /// Whether this delivery carries the given correlation id.
    #[must_use]
    pub fn matches(&self, correlation_id: &str) -> bool {
        self.correlation_id.as_deref() == Some(correlation_id)
    }
}

impl From<Envelope> for Delivery {
    fn from(envelope: Envelope) -> Self {
        Self {
            payload: envelope.payload,
            reply_to: envelope.reply_to,
            correlation_id: envelope.correlation_id,
        }
    }
}
