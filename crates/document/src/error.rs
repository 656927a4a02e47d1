//! Error types for document-level editing.

use scribe_primitives::OtError;
use thiserror::Error;

/// Errors raised while editing, materializing or storing documents.
#[derive(Debug, Error)]
pub enum DocumentError {
	/// The text kernel rejected an operation.
	#[error(transparent)]
	Ot(#[from] OtError),

	/// No blob is stored under the given hash.
	#[error("blob not found: {hash}")]
	BlobNotFound {
		/// Hash that was looked up.
		hash: String,
	},

	/// The content store failed for a reason of its own.
	#[error("blob store error: {0}")]
	BlobStore(String),

	/// Two edit operations cannot be combined into one.
	#[error("cannot compose edit operations")]
	CannotCompose,

	/// Text content was requested from a length-only document.
	#[error("hollow document has no content")]
	HollowContent,

	/// An edit in a strict batch failed.
	#[error("edit {index} of batch failed: {source}")]
	Batch {
		/// Position of the failing edit in the batch.
		index: usize,
		/// Why it failed.
		#[source]
		source: Box<DocumentError>,
	},

	/// Malformed TOML configuration.
	#[error("config parse error: {0}")]
	Config(#[from] toml::de::Error),

	/// Malformed JSON for a document-level value.
	#[error("invalid json: {0}")]
	Json(#[from] serde_json::Error),
}

impl DocumentError {
	/// Returns true when the edit itself cannot be processed, as opposed to
	/// a storage or configuration failure.
	pub fn is_unprocessable(&self) -> bool {
		match self {
			Self::Ot(err) => err.is_unprocessable(),
			Self::Batch { source, .. } => source.is_unprocessable(),
			Self::CannotCompose | Self::HollowContent | Self::Json(_) => true,
			Self::BlobNotFound { .. } | Self::BlobStore(_) | Self::Config(_) => false,
		}
	}
}

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocumentError>;
