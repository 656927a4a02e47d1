//! Error types for the OT kernel.

use thiserror::Error;

use crate::range::Range;

/// Errors raised while building, applying or combining text operations.
#[derive(Debug, Error)]
pub enum OtError {
	/// Insert text contains characters outside the Basic Multilingual Plane.
	#[error("inserted text contains non BMP characters")]
	InvalidInsertion,

	/// A wire-level operation could not be recognised.
	#[error("unknown operation: {0}")]
	UnknownOperation(String),

	/// The operation does not fit the document it was applied to.
	#[error("{0}")]
	Apply(String),

	/// Applying the operation would produce an oversized document.
	#[error("resulting document would be too long: {length}")]
	TooLong {
		/// Length the document would have had.
		length: usize,
	},

	/// Two scan operations or ranges were merged without being compatible.
	#[error("cannot merge incompatible values")]
	CannotMerge,

	/// A range was shrunk below zero length.
	#[error("cannot shrink {range:?} by {by}")]
	ShrinkTooFar {
		/// The range being shrunk.
		range: Range,
		/// Requested shrink amount.
		by: usize,
	},

	/// A range was moved before the start of the document.
	#[error("cannot move {range:?} by {by}")]
	MoveOutOfBounds {
		/// The range being moved.
		range: Range,
		/// Requested offset.
		by: isize,
	},

	/// A cursor was used outside the range it was meant to split.
	#[error("cursor {cursor} is outside {range:?}")]
	CursorOutOfRange {
		/// The offending cursor.
		cursor: usize,
		/// The range that should contain it.
		range: Range,
	},

	/// A comment was built from ranges that overlap.
	#[error("ranges cannot overlap")]
	OverlappingRanges,

	/// Compose or transform preconditions on operation lengths were violated.
	#[error("{0}")]
	LengthMismatch(&'static str),

	/// Malformed JSON for a wire-level value.
	#[error("invalid json: {0}")]
	Json(#[from] serde_json::Error),
}

impl OtError {
	/// Returns true for errors that mean "this edit cannot be processed"
	/// as opposed to misuse of the API.
	pub fn is_unprocessable(&self) -> bool {
		matches!(
			self,
			Self::InvalidInsertion
				| Self::UnknownOperation(_)
				| Self::Apply(_)
				| Self::TooLong { .. }
				| Self::Json(_)
		)
	}

	pub(crate) fn apply(message: impl Into<String>) -> Self {
		Self::Apply(message.into())
	}
}

/// Result type for kernel operations.
pub type Result<T> = std::result::Result<T, OtError>;
