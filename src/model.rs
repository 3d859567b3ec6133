//! Normalized user change types shared by every envelope variant.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::{Error, Result};

/// Opaque user identifier.
///
/// The relational source stores it as a plain string column, the document
/// store as an object id. Both normalize to the same textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_message("user id is empty"));
        }
        if trimmed.len() != raw.len() {
            return Err(Error::invalid_message(format!(
                "user id {:?} has surrounding whitespace",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Point-in-time state of a user as seen by the source database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSnapshot {
    pub id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub nickname: String,
    pub email: String,
    /// Credential material. Always `None` once the change has been sanitized.
    pub password_hash: Option<String>,
    pub country: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// `None` unless the user has been soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl UserSnapshot {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Copy of this snapshot without credential material.
    pub fn redacted(&self) -> Self {
        Self {
            password_hash: None,
            ..self.clone()
        }
    }
}

/// A single user change: creation, update or deletion.
///
/// At least one of `before` and `after` is always present. A missing `before`
/// is a creation, a missing `after` a deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    id: String,
    before: Option<UserSnapshot>,
    after: Option<UserSnapshot>,
}

impl Change {
    pub fn new(
        id: impl Into<String>,
        before: Option<UserSnapshot>,
        after: Option<UserSnapshot>,
    ) -> Result<Self> {
        if before.is_none() && after.is_none() {
            return Err(Error::InvalidChange);
        }
        Ok(Self {
            id: id.into(),
            before,
            after,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn before(&self) -> Option<&UserSnapshot> {
        self.before.as_ref()
    }

    pub fn after(&self) -> Option<&UserSnapshot> {
        self.after.as_ref()
    }

    pub fn kind(&self) -> ChangeKind {
        match (&self.before, &self.after) {
            (None, _) => ChangeKind::Create,
            (Some(_), Some(_)) => ChangeKind::Update,
            (Some(_), None) => ChangeKind::Delete,
        }
    }

    /// Copy of this change with credential material removed from both
    /// snapshots.
    pub fn redacted(&self) -> Self {
        Self {
            id: self.id.clone(),
            before: self.before.as_ref().map(UserSnapshot::redacted),
            after: self.after.as_ref().map(UserSnapshot::redacted),
        }
    }

    /// Turns an update into a soft-deleted user into a plain deletion.
    ///
    /// Creations are left alone: without a `before` there is nothing to
    /// keep, so the invariant holds either way.
    pub fn collapse_soft_deletion(mut self) -> Self {
        if self.before.is_some() && self.after.as_ref().is_some_and(UserSnapshot::is_deleted) {
            self.after = None;
        }
        self
    }

    /// Whether `before` and `after` are equal, i.e. nothing changed.
    pub fn is_noop(&self) -> bool {
        self.before == self.after
    }

    /// Identifier of the user this change is about.
    pub fn user_id(&self) -> Option<&UserId> {
        self.after.as_ref().or(self.before.as_ref()).map(|s| &s.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Create => "create",
            ChangeKind::Update => "update",
            ChangeKind::Delete => "delete",
        };
        f.write_str(name)
    }
}
