//! Decoding of raw change envelopes into normalized [`Change`] values.
//!
//! The replication connector wraps every row or document change in an
//! envelope with an operation tag, a source descriptor and the entity state
//! before and after the change. Relational and document sources encode the
//! entity state differently, so each gets its own [`EnvelopeDecoder`]. The
//! one in use is chosen from configuration through [`SourceVariant`], never by
//! looking at the payload.

pub mod document;
pub mod relational;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, trace};

use crate::model::{Change, UserSnapshot};
use crate::{Error, Result};

pub use document::DocumentDecoder;
pub use relational::RelationalDecoder;

/// Outcome of decoding a well-formed envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The envelope describes a change to the configured entity.
    Change(Change),
    /// The envelope belongs to another table or collection.
    Ignored(SourceDescriptor),
}

/// Where a change envelope originates from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    Table(String),
    Collection(String),
}

impl SourceDescriptor {
    pub fn name(&self) -> &str {
        match self {
            SourceDescriptor::Table(name) | SourceDescriptor::Collection(name) => name,
        }
    }

    pub fn matches(&self, entity: &str) -> bool {
        self.name() == entity
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceDescriptor::Table(name) => write!(f, "table {}", name),
            SourceDescriptor::Collection(name) => write!(f, "collection {}", name),
        }
    }
}

/// Turns raw broker payloads into changes.
pub trait EnvelopeDecoder: Send + Sync {
    fn variant(&self) -> SourceVariant;

    /// Decodes `payload`, using `message_id` as the id of the resulting change.
    ///
    /// Envelopes from an unrelated source yield [`Decoded::Ignored`]; anything
    /// malformed is an error.
    fn decode(&self, message_id: &str, payload: &[u8]) -> Result<Decoded>;
}

/// Wire variant of the inbound envelopes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceVariant {
    /// Row images embedded as JSON objects, identified by table.
    #[default]
    Relational,
    /// Documents embedded as JSON-encoded strings, identified by collection.
    Document,
}

impl SourceVariant {
    pub fn decoder(self, entity: impl Into<String>) -> Box<dyn EnvelopeDecoder> {
        match self {
            SourceVariant::Relational => Box::new(RelationalDecoder::new(entity)),
            SourceVariant::Document => Box::new(DocumentDecoder::new(entity)),
        }
    }
}

impl fmt::Display for SourceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceVariant::Relational => f.write_str("relational"),
            SourceVariant::Document => f.write_str("document"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<S> {
    payload: Payload<S>,
}

#[derive(Debug, Deserialize)]
struct Payload<S> {
    #[serde(default)]
    op: Option<String>,
    source: S,
    #[serde(default)]
    before: Option<Value>,
    #[serde(default)]
    after: Option<Value>,
}

/// Shared envelope walk for both variants.
///
/// The source is checked before either snapshot is interpreted, so rows of
/// unrelated tables never have to match the user shape.
fn decode_envelope<S, D, F>(
    message_id: &str,
    payload: &[u8],
    entity: &str,
    descriptor: D,
    snapshot: F,
) -> Result<Decoded>
where
    S: for<'de> Deserialize<'de>,
    D: FnOnce(S) -> SourceDescriptor,
    F: Fn(&'static str, Value) -> Result<UserSnapshot>,
{
    let envelope: Envelope<S> = serde_json::from_slice(payload)?;
    let Payload {
        op,
        source,
        before,
        after,
    } = envelope.payload;

    let source = descriptor(source);
    if !source.matches(entity) {
        debug!(event_id = %message_id, %source, "Ignoring change from unrelated source");
        return Ok(Decoded::Ignored(source));
    }

    let before = before.map(|value| snapshot("before", value)).transpose()?;
    let after = after.map(|value| snapshot("after", value)).transpose()?;

    trace!(
        event_id = %message_id,
        op = op.as_deref().unwrap_or("?"),
        has_before = before.is_some(),
        has_after = after.is_some(),
        "Decoded change envelope"
    );

    Change::new(message_id, before, after).map(Decoded::Change)
}

fn nested_error(side: &str, err: impl fmt::Display) -> Error {
    Error::invalid_message(format!("invalid {} snapshot: {}", side, err))
}
