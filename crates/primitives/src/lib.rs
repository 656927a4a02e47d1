//! Core types for collaborative text editing: ranges, comments, tracked
//! changes, and the operational-transformation kernel that moves them.

/// Comments anchored to character ranges.
pub mod comment;
/// Error types for operation building and application.
pub mod error;
/// Eager document materialization.
pub mod file_data;
/// Text operations and their algebra.
pub mod operation;
/// Character range arithmetic.
pub mod range;
/// Attributed ranges of inserted or deleted text.
pub mod tracked_change;
/// Attribution metadata.
pub mod tracking;

pub use comment::{Comment, CommentList};
pub use error::{OtError, Result};
pub use file_data::{RangesData, StringFileData};
pub use operation::{
	CommentIds, InsertOp, Insertion, LengthState, MAX_STRING_LENGTH, RetainOp, ScanOp, TextOperation,
};
pub use range::{CharIdx, CharLen, Range};
pub use tracked_change::{TrackedChange, TrackedChangeList};
pub use tracking::{Tracking, TrackingProps, TrackingType};
