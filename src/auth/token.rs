//! Defines the session token stored in the auth cookie and how it is
//! serialized, expired and extended.

use std::cmp::max;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::{Error, user::UserID};

mod datetime_format {
    //! Serializes a [time::OffsetDateTime] in a fixed format.
    //!
    //! The default serializer for [time::OffsetDateTime] will serialize
    //! "00:00:00.000000" as "0:00:00.0" and the deserializer would error out
    //! because it expects the hours to be two digits, not one.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// Date time format for the token expiry, e.g. "2021-01-01 00:00:00.000000 +00:00:00".
    const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A session token: who is logged in and until when.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Token {
    /// The logged in user.
    pub user_id: UserID,

    /// The time after which the token no longer identifies the user.
    #[serde(
        serialize_with = "datetime_format::serialize",
        deserialize_with = "datetime_format::deserialize"
    )]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Create a token for `user_id` that is valid for `duration` from `now`.
    ///
    /// # Errors
    /// Returns [Error::TimeFormat] if the expiry is out of range.
    pub fn new(user_id: UserID, now: OffsetDateTime, duration: Duration) -> Result<Self, Error> {
        let expires_at = now
            .checked_add(duration)
            .ok_or_else(|| Error::TimeFormat("session expiry out of range".to_owned()))?;

        Ok(Self {
            user_id,
            expires_at,
        })
    }

    /// Whether the token is no longer valid at `now`.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at <= now
    }

    /// The token with its expiry moved to `now + duration`, unless it already
    /// expires later than that.
    ///
    /// # Errors
    /// Returns [Error::TimeFormat] if the new expiry is out of range.
    pub fn extended(self, now: OffsetDateTime, duration: Duration) -> Result<Self, Error> {
        let candidate = Self::new(self.user_id, now, duration)?;

        Ok(Self {
            user_id: self.user_id,
            expires_at: max(self.expires_at, candidate.expires_at),
        })
    }
}
