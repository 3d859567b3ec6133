use serde::Deserialize;
use serde_json::Value;

use super::{decode_envelope, nested_error, Decoded, EnvelopeDecoder, SourceDescriptor, SourceVariant};
use crate::model::{UserId, UserSnapshot};
use crate::timestamp::decode_micros;
use crate::Result;

/// Decoder for envelopes produced by a document-store source connector.
///
/// Documents arrive as JSON-encoded strings in extended JSON: the identity is
/// an `{"$oid": ..}` object and every instant a `{"$date": ..}` object
/// holding epoch microseconds.
#[derive(Debug, Clone)]
pub struct DocumentDecoder {
    collection: String,
}

impl DocumentDecoder {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DocumentSource {
    #[serde(default)]
    collection: String,
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    #[serde(rename = "$oid")]
    oid: String,
}

#[derive(Debug, Deserialize)]
struct Date {
    #[serde(rename = "$date")]
    micros: i64,
}

#[derive(Debug, Deserialize)]
struct UserDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    first_name: String,
    last_name: String,
    nickname: String,
    email: String,
    #[serde(default)]
    password_hash: Option<String>,
    country: String,
    created_at: Date,
    updated_at: Date,
    // omitted by the store until the user is soft-deleted
    #[serde(default)]
    deleted_at: Option<Date>,
}

impl UserDocument {
    fn into_snapshot(self) -> Result<UserSnapshot> {
        Ok(UserSnapshot {
            id: UserId::parse(&self.id.oid)?,
            first_name: self.first_name,
            last_name: self.last_name,
            nickname: self.nickname,
            email: self.email,
            password_hash: self.password_hash,
            country: self.country,
            created_at: decode_micros(self.created_at.micros)?,
            updated_at: decode_micros(self.updated_at.micros)?,
            deleted_at: self
                .deleted_at
                .map(|date| decode_micros(date.micros))
                .transpose()?,
        })
    }
}

fn document_snapshot(side: &'static str, value: Value) -> Result<UserSnapshot> {
    let Value::String(encoded) = value else {
        return Err(nested_error(side, "expected a JSON-encoded document string"));
    };
    let document: UserDocument =
        serde_json::from_str(&encoded).map_err(|e| nested_error(side, e))?;
    document.into_snapshot()
}

impl EnvelopeDecoder for DocumentDecoder {
    fn variant(&self) -> SourceVariant {
        SourceVariant::Document
    }

    fn decode(&self, message_id: &str, payload: &[u8]) -> Result<Decoded> {
        decode_envelope(
            message_id,
            payload,
            &self.collection,
            |source: DocumentSource| SourceDescriptor::Collection(source.collection),
            document_snapshot,
        )
    }
}
