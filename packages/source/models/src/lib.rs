#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Partition key and record types for mandi (agricultural market) price
//! data.
//!
//! A run of the pipeline targets exactly one [`PartitionKey`] (a calendar
//! day). Records arrive from the upstream API as loose JSON objects and are
//! carried through the pipeline as [`PriceRecord`]s; their
//! [`RecordIdentity`] is the uniqueness key enforced by the destination
//! store.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Name of the field that carries the partition date on every record.
pub const PARTITION_FIELD: &str = "arrival_date";

/// Categorical fields that, together with [`PARTITION_FIELD`], identify a
/// single price observation.
pub const IDENTITY_FIELDS: [&str; 6] = [
    "state",
    "district",
    "market",
    "commodity",
    "variety",
    "grade",
];

/// Canonical partition date format (`YYYY-MM-DD`).
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date format expected by the upstream API filter (`DD/MM/YYYY`).
pub const API_DATE_FORMAT: &str = "%d/%m/%Y";

/// A raw record exactly as decoded from the upstream JSON body.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Returns the comma-separated conflict target used for upserts:
/// every identity field followed by the partition field.
#[must_use]
pub fn conflict_target() -> String {
    let mut fields: Vec<&str> = IDENTITY_FIELDS.to_vec();
    fields.push(PARTITION_FIELD);
    fields.join(",")
}

/// A calendar date that scopes one run of the pipeline.
///
/// Displays and serializes in canonical `YYYY-MM-DD` form, so key order
/// and chronological order agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartitionKey(NaiveDate);

impl PartitionKey {
    /// Wraps a calendar date.
    #[must_use]
    pub const fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Returns the underlying calendar date.
    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.0
    }

    /// Formats the partition the way the upstream API filter expects it
    /// (`DD/MM/YYYY`).
    #[must_use]
    pub fn api_filter(self) -> String {
        self.0.format(API_DATE_FORMAT).to_string()
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(CANONICAL_DATE_FORMAT))
    }
}

/// Error returned when a string is not a canonical `YYYY-MM-DD` date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPartitionKeyError {
    /// The rejected input.
    pub value: String,
}

impl fmt::Display for InvalidPartitionKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid partition key {:?}: expected YYYY-MM-DD", self.value)
    }
}

impl std::error::Error for InvalidPartitionKeyError {}

impl FromStr for PartitionKey {
    type Err = InvalidPartitionKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s.trim(), CANONICAL_DATE_FORMAT)
            .map(Self)
            .map_err(|_| InvalidPartitionKeyError {
                value: s.to_string(),
            })
    }
}

impl Serialize for PartitionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PartitionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

/// The uniqueness key of a [`PriceRecord`]: every identity field followed
/// by the partition field, rendered as strings.
///
/// Missing and `null` fields are `None`, so two records that both lack a
/// field still collide.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordIdentity(Vec<Option<String>>);

impl RecordIdentity {
    /// Returns the identity values in conflict-target order.
    #[must_use]
    pub fn values(&self) -> &[Option<String>] {
        &self.0
    }
}

/// One price observation after normalization.
///
/// Wraps the JSON object so that fields the pipeline does not care about
/// (prices, commodity codes, ...) pass through to the store untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceRecord(RawRecord);

impl PriceRecord {
    /// Wraps a JSON object as a record.
    #[must_use]
    pub const fn new(fields: RawRecord) -> Self {
        Self(fields)
    }

    /// Returns the record's fields.
    #[must_use]
    pub const fn fields(&self) -> &RawRecord {
        &self.0
    }

    /// Consumes the record and returns its fields.
    #[must_use]
    pub fn into_fields(self) -> RawRecord {
        self.0
    }

    /// Returns the value of a single field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.0.get(name)
    }

    /// Returns the partition date field, if present and a string.
    #[must_use]
    pub fn partition_value(&self) -> Option<&str> {
        self.0.get(PARTITION_FIELD).and_then(serde_json::Value::as_str)
    }

    /// Builds this record's uniqueness key.
    #[must_use]
    pub fn identity(&self) -> RecordIdentity {
        RecordIdentity(
            IDENTITY_FIELDS
                .iter()
                .chain(std::iter::once(&PARTITION_FIELD))
                .map(|field| identity_value(self.0.get(*field)))
                .collect(),
        )
    }
}

impl From<RawRecord> for PriceRecord {
    fn from(fields: RawRecord) -> Self {
        Self(fields)
    }
}

fn identity_value(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
