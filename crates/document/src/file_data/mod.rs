//! Document materializations: eager, lazy (blob-backed) and hollow.

mod hollow;
mod lazy;

pub use hollow::HollowStringFileData;
pub use lazy::LazyStringFileData;
use scribe_primitives::{CharLen, CommentList, MAX_STRING_LENGTH, StringFileData};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::blob_store::BlobStore;
use crate::operation::EditOperation;
use crate::{DocumentError, Result};

/// Hashes under which a document's content and annotations are stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredHashes {
	pub hash: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub ranges_hash: Option<String>,
}

impl StoredHashes {
	/// Writes an eager document. Annotations are only stored when present.
	pub(crate) async fn put(file: &StringFileData, store: &dyn BlobStore) -> Result<Self> {
		let blob = store.put_string(file.content()).await?;
		let ranges = file.ranges();
		let ranges_hash = if ranges.is_empty() {
			None
		} else {
			Some(store.put_object(&serde_json::to_value(&ranges)?).await?.hash)
		};
		Ok(Self {
			hash: blob.hash,
			ranges_hash,
		})
	}
}

/// A document in one of its materializations.
///
/// The raw forms are distinguished by shape: `{content, ...}` is eager,
/// `{hash, stringLength, ...}` is lazy, and `{stringLength}` is hollow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileData {
	String(StringFileData),
	Lazy(LazyStringFileData),
	Hollow(HollowStringFileData),
}

impl FileData {
	pub fn from_string(content: impl Into<String>) -> Self {
		Self::String(StringFileData::new(content))
	}

	pub fn hollow(string_length: CharLen) -> Self {
		Self::Hollow(HollowStringFileData::new(string_length))
	}

	pub fn string_length(&self) -> CharLen {
		match self {
			Self::String(file) => file.string_length(),
			Self::Lazy(file) => file.string_length(),
			Self::Hollow(file) => file.string_length(),
		}
	}

	/// The text, when it is held in memory.
	pub fn content(&self) -> Option<&str> {
		match self {
			Self::String(file) => Some(file.content()),
			Self::Lazy(_) | Self::Hollow(_) => None,
		}
	}

	/// The comments, when they are held in memory.
	pub fn comments(&self) -> Option<&CommentList> {
		match self {
			Self::String(file) => Some(file.comments()),
			Self::Lazy(_) | Self::Hollow(_) => None,
		}
	}

	pub fn edit(&mut self, op: &EditOperation) -> Result<()> {
		self.edit_with_limit(op, MAX_STRING_LENGTH)
	}

	/// Applies or queues an edit. On error the document is unchanged.
	pub fn edit_with_limit(&mut self, op: &EditOperation, max_length: CharLen) -> Result<()> {
		match self {
			Self::String(file) => op.apply_with_limit(file, max_length),
			Self::Lazy(file) => file.edit_with_limit(op, max_length),
			Self::Hollow(file) => file.edit_with_limit(op, max_length),
		}
	}

	/// Returns the eager form, loading it from `store` if needed.
	pub async fn to_eager(&self, store: &dyn BlobStore) -> Result<StringFileData> {
		match self {
			Self::String(file) => Ok(file.clone()),
			Self::Lazy(file) => file.to_eager(store).await,
			Self::Hollow(_) => Err(DocumentError::HollowContent),
		}
	}

	/// Replaces this value with its eager form.
	pub async fn load_eager(&mut self, store: &dyn BlobStore) -> Result<()> {
		if !matches!(self, Self::String(_)) {
			*self = Self::String(self.to_eager(store).await?);
		}
		Ok(())
	}

	/// Drops content and annotations, keeping only the length.
	pub fn to_hollow(&self) -> FileData {
		debug!(length = self.string_length(), "hollowed document");
		Self::hollow(self.string_length())
	}

	/// Persists content and annotations, returning their hashes.
	///
	/// A lazy document folds its queued edits into new blobs and keeps no
	/// pending operations afterwards.
	pub async fn store(&mut self, store: &dyn BlobStore) -> Result<StoredHashes> {
		let stored = match self {
			Self::String(file) => StoredHashes::put(file, store).await?,
			Self::Lazy(file) => file.store(store).await?,
			Self::Hollow(_) => return Err(DocumentError::HollowContent),
		};
		debug!(hash = %stored.hash, ranges = ?stored.ranges_hash, "stored document");
		Ok(stored)
	}
}

impl From<StringFileData> for FileData {
	fn from(file: StringFileData) -> Self {
		Self::String(file)
	}
}

impl From<LazyStringFileData> for FileData {
	fn from(file: LazyStringFileData) -> Self {
		Self::Lazy(file)
	}
}

impl From<HollowStringFileData> for FileData {
	fn from(file: HollowStringFileData) -> Self {
		Self::Hollow(file)
	}
}
