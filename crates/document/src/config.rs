//! Edit application policy.

use scribe_primitives::MAX_STRING_LENGTH;
use serde::{Deserialize, Serialize};

use crate::Result;

/// What a batch does when one of its edits fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyMode {
	/// Abort on the first failure and leave the document unchanged.
	#[default]
	Strict,
	/// Skip failing edits and keep going.
	Lenient,
}

/// Configuration for applying edits to documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditConfig {
	/// Failure policy for batches.
	pub apply_mode: ApplyMode,
	/// Longest document, in characters, an edit may produce.
	pub max_string_length: usize,
}

impl Default for EditConfig {
	fn default() -> Self {
		Self {
			apply_mode: ApplyMode::default(),
			max_string_length: MAX_STRING_LENGTH,
		}
	}
}

impl EditConfig {
	/// Parses a TOML document. Missing keys take their defaults.
	pub fn from_toml_str(input: &str) -> Result<Self> {
		Ok(toml::from_str(input)?)
	}
}
