use scribe_primitives::{CharLen, MAX_STRING_LENGTH};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::operation::EditOperation;

/// A document known only by its length.
///
/// Text edits update the length. Comment edits have nothing to act on and
/// are accepted as no-ops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HollowStringFileData {
	string_length: CharLen,
}

impl HollowStringFileData {
	pub fn new(string_length: CharLen) -> Self {
		Self { string_length }
	}

	pub fn string_length(&self) -> CharLen {
		self.string_length
	}

	pub fn edit(&mut self, op: &EditOperation) -> Result<()> {
		self.edit_with_limit(op, MAX_STRING_LENGTH)
	}

	/// On error the length is left as it was.
	pub fn edit_with_limit(&mut self, op: &EditOperation, max_length: CharLen) -> Result<()> {
		self.string_length = op.apply_to_length_with_limit(self.string_length, max_length)?;
		Ok(())
	}
}
