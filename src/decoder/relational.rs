use serde::Deserialize;
use serde_json::Value;

use super::{decode_envelope, nested_error, Decoded, EnvelopeDecoder, SourceDescriptor, SourceVariant};
use crate::model::{UserId, UserSnapshot};
use crate::timestamp::decode_micros;
use crate::Result;

/// Decoder for envelopes produced by a relational source connector.
///
/// Row images are plain JSON objects and timestamps are epoch microseconds.
#[derive(Debug, Clone)]
pub struct RelationalDecoder {
    table: String,
}

impl RelationalDecoder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RelationalSource {
    #[serde(default)]
    table: String,
}

#[derive(Debug, Deserialize)]
struct UserRow {
    id: String,
    first_name: String,
    last_name: String,
    nickname: String,
    email: String,
    #[serde(default)]
    password_hash: Option<String>,
    country: String,
    created_at: i64,
    updated_at: i64,
    #[serde(default)]
    deleted_at: Option<i64>,
}

impl UserRow {
    fn into_snapshot(self) -> Result<UserSnapshot> {
        Ok(UserSnapshot {
            id: UserId::parse(&self.id)?,
            first_name: self.first_name,
            last_name: self.last_name,
            nickname: self.nickname,
            email: self.email,
            password_hash: self.password_hash,
            country: self.country,
            created_at: decode_micros(self.created_at)?,
            updated_at: decode_micros(self.updated_at)?,
            deleted_at: self.deleted_at.map(decode_micros).transpose()?,
        })
    }
}

fn row_snapshot(side: &'static str, value: Value) -> Result<UserSnapshot> {
    let row: UserRow = serde_json::from_value(value).map_err(|e| nested_error(side, e))?;
    row.into_snapshot()
}

impl EnvelopeDecoder for RelationalDecoder {
    fn variant(&self) -> SourceVariant {
        SourceVariant::Relational
    }

    fn decode(&self, message_id: &str, payload: &[u8]) -> Result<Decoded> {
        decode_envelope(
            message_id,
            payload,
            &self.table,
            |source: RelationalSource| SourceDescriptor::Table(source.table),
            row_snapshot,
        )
    }
}
