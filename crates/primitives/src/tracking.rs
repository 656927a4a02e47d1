//! Attribution metadata for tracked insertions and deletions.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Whether a tracked span was inserted or deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingType {
	/// Text proposed for insertion.
	Insert,
	/// Text proposed for deletion.
	Delete,
}

/// Who tracked a span, how, and when.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackingProps {
	/// Insert or delete.
	#[serde(rename = "type")]
	pub kind: TrackingType,
	/// The actor that made the change.
	#[serde(rename = "userId")]
	pub user_id: String,
	/// When the change was made.
	#[serde(with = "timestamp")]
	pub ts: DateTime<Utc>,
}

impl TrackingProps {
	pub fn new(kind: TrackingType, user_id: impl Into<String>, ts: DateTime<Utc>) -> Self {
		Self {
			kind,
			user_id: user_id.into(),
			ts,
		}
	}
}

/// Attribution carried by a retain: either new props or an instruction to
/// drop whatever attribution the span has.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Tracking {
	/// Tag the span with these props.
	Props(TrackingProps),
	/// Remove tracking from the span (accept or reject).
	Clear,
}

impl Tracking {
	/// Returns the props, or `None` for [`Tracking::Clear`].
	pub fn props(&self) -> Option<&TrackingProps> {
		match self {
			Self::Props(props) => Some(props),
			Self::Clear => None,
		}
	}
}

impl From<TrackingProps> for Tracking {
	fn from(props: TrackingProps) -> Self {
		Self::Props(props)
	}
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ClearKind {
	None,
}

#[derive(Serialize, Deserialize)]
struct ClearRaw {
	#[serde(rename = "type")]
	kind: ClearKind,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TrackingRaw {
	Clear(ClearRaw),
	Props(TrackingProps),
}

impl Serialize for Tracking {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		match self {
			Self::Props(props) => props.serialize(serializer),
			Self::Clear => ClearRaw { kind: ClearKind::None }.serialize(serializer),
		}
	}
}

impl<'de> Deserialize<'de> for Tracking {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Ok(match TrackingRaw::deserialize(deserializer)? {
			TrackingRaw::Clear(_) => Self::Clear,
			TrackingRaw::Props(props) => Self::Props(props),
		})
	}
}

/// RFC 3339 timestamps with millisecond precision and a `Z` suffix.
mod timestamp {
	use super::*;

	pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
		serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
		let raw = String::deserialize(deserializer)?;
		DateTime::parse_from_rfc3339(&raw)
			.map(|ts| ts.with_timezone(&Utc))
			.map_err(serde::de::Error::custom)
	}
}
