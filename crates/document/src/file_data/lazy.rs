use scribe_primitives::{CharLen, MAX_STRING_LENGTH, RangesData, StringFileData};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::StoredHashes;
use crate::Result;
use crate::blob_store::BlobStore;
use crate::operation::EditOperation;

/// A document whose content lives in a [`BlobStore`].
///
/// Edits are queued in `operations` until the document is hydrated or
/// stored; only the projected length is kept up to date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LazyStringFileData {
	hash: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	ranges_hash: Option<String>,
	string_length: CharLen,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	operations: Vec<EditOperation>,
}

impl LazyStringFileData {
	pub fn new(hash: impl Into<String>, ranges_hash: Option<String>, string_length: CharLen) -> Self {
		Self {
			hash: hash.into(),
			ranges_hash,
			string_length,
			operations: Vec::new(),
		}
	}

	pub fn hash(&self) -> &str {
		&self.hash
	}

	pub fn ranges_hash(&self) -> Option<&str> {
		self.ranges_hash.as_deref()
	}

	/// Length after the queued operations.
	pub fn string_length(&self) -> CharLen {
		self.string_length
	}

	/// Edits not yet folded into the stored content.
	pub fn operations(&self) -> &[EditOperation] {
		&self.operations
	}

	pub fn edit(&mut self, op: &EditOperation) -> Result<()> {
		self.edit_with_limit(op, MAX_STRING_LENGTH)
	}

	/// Queues `op`. On error nothing is queued and the length is unchanged.
	pub fn edit_with_limit(&mut self, op: &EditOperation, max_length: CharLen) -> Result<()> {
		self.string_length = op.apply_to_length_with_limit(self.string_length, max_length)?;
		self.operations.push(op.clone());
		Ok(())
	}

	/// Loads the stored content and annotations and replays queued edits.
	///
	/// Replay does not re-check the length limit, so edits queued through
	/// [`LazyStringFileData::edit_with_limit`] with a raised limit still
	/// hydrate.
	pub async fn to_eager(&self, store: &dyn BlobStore) -> Result<StringFileData> {
		let content = store.get_string(&self.hash).await?;
		let ranges: RangesData = match &self.ranges_hash {
			Some(hash) => serde_json::from_value(store.get_object(hash).await?)?,
			None => RangesData::default(),
		};

		let mut file = StringFileData::from_parts(content, ranges);
		for op in &self.operations {
			op.apply_with_limit(&mut file, CharLen::MAX)?;
		}
		debug!(hash = %self.hash, replayed = self.operations.len(), "hydrated lazy document");
		Ok(file)
	}

	/// Folds queued edits into freshly stored blobs.
	pub async fn store(&mut self, store: &dyn BlobStore) -> Result<StoredHashes> {
		if !self.operations.is_empty() {
			let eager = self.to_eager(store).await?;
			let stored = StoredHashes::put(&eager, store).await?;
			self.hash = stored.hash.clone();
			self.ranges_hash = stored.ranges_hash.clone();
			self.string_length = eager.string_length();
			self.operations.clear();
		}
		Ok(StoredHashes {
			hash: self.hash.clone(),
			ranges_hash: self.ranges_hash.clone(),
		})
	}
}
