use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Change, UserSnapshot};
use crate::Result;

/// Public shape of a user event. Credentials and deletion markers are not
/// part of it.
#[derive(Debug, Serialize)]
pub struct OutboundEvent<'a> {
    pub id: &'a str,
    pub before: Option<OutboundUser<'a>>,
    pub after: Option<OutboundUser<'a>>,
}

#[derive(Debug, Serialize)]
pub struct OutboundUser<'a> {
    pub id: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub nickname: &'a str,
    pub email: &'a str,
    pub country: &'a str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a UserSnapshot> for OutboundUser<'a> {
    fn from(user: &'a UserSnapshot) -> Self {
        Self {
            id: user.id.as_str(),
            first_name: &user.first_name,
            last_name: &user.last_name,
            nickname: &user.nickname,
            email: &user.email,
            country: &user.country,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl<'a> From<&'a Change> for OutboundEvent<'a> {
    fn from(change: &'a Change) -> Self {
        Self {
            id: change.id(),
            before: change.before().map(OutboundUser::from),
            after: change.after().map(OutboundUser::from),
        }
    }
}

pub struct JsonSerializer;

impl JsonSerializer {
    pub fn serialize(change: &Change) -> Result<String> {
        serde_json::to_string(&OutboundEvent::from(change)).map_err(Into::into)
    }
}
