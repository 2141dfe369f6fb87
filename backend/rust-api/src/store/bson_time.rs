//! Serde converters for chrono::DateTime <-> mongodb::bson::DateTime

use chrono::{DateTime, Utc};
use mongodb::bson;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let bson_dt = bson::DateTime::from_millis(date.timestamp_millis());
    bson_dt.serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let bson_dt = bson::DateTime::deserialize(deserializer)?;
    DateTime::from_timestamp_millis(bson_dt.timestamp_millis())
        .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
}

pub fn to_bson(date: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(date.timestamp_millis())
}

/// Drops sub-millisecond precision, matching what BSON dates can hold.
pub fn truncate(date: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or(date)
}
