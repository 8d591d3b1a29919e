//! Serde helpers shared by the wire types.

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;

/// (De)serializes a `Vec<(String, T)>` as a JSON object, keeping entry order.
pub mod ordered_map {
	use super::*;
	use serde::ser::{SerializeMap, Serializer};
	use serde::Serialize;

	pub fn serialize<S, T>(entries: &[(String, T)], serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
		T: Serialize,
	{
		let mut map = serializer.serialize_map(Some(entries.len()))?;
		for (key, value) in entries {
			map.serialize_entry(key, value)?;
		}
		map.end()
	}

	pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
	where
		D: Deserializer<'de>,
		T: Deserialize<'de>,
	{
		struct EntriesVisitor<T>(PhantomData<T>);

		impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
			type Value = Vec<(String, T)>;

			fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
				f.write_str("a JSON object")
			}

			fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
				let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
				while let Some((key, value)) = access.next_entry::<String, T>()? {
					entries.push((key, value));
				}
				Ok(entries)
			}
		}

		deserializer.deserialize_map(EntriesVisitor(PhantomData))
	}
}

/// Accepts a priority given either as a JSON number or as a numeric string.
pub fn deserialize_opt_priority<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Priority {
		Int(i64),
		Float(f64),
		Text(String),
	}

	match Option::<Priority>::deserialize(deserializer)? {
		None => Ok(None),
		Some(Priority::Int(value)) => Ok(Some(value)),
		Some(Priority::Float(value)) => Ok(Some(value as i64)),
		Some(Priority::Text(text)) if text.trim().is_empty() => Ok(None),
		Some(Priority::Text(text)) => text
			.trim()
			.parse::<i64>()
			.map(Some)
			.map_err(|_| de::Error::custom(format!("Invalid priority: {}", text))),
	}
}
