//! Applying sequences of edits under a failure policy.

use tracing::{debug, warn};

use crate::config::{ApplyMode, EditConfig};
use crate::file_data::FileData;
use crate::operation::EditOperation;
use crate::{DocumentError, Result};

/// What happened to a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
	/// Number of edits that took effect.
	pub applied: usize,
	/// Positions of edits skipped in lenient mode.
	pub skipped: Vec<usize>,
}

/// Applies `ops` in order.
///
/// In [`ApplyMode::Strict`] the first failure aborts the batch with
/// [`DocumentError::Batch`] and `file` keeps its prior state. In
/// [`ApplyMode::Lenient`] failing edits are skipped and reported.
pub fn apply_batch(file: &mut FileData, ops: &[EditOperation], config: &EditConfig) -> Result<BatchOutcome> {
	match config.apply_mode {
		ApplyMode::Strict => {
			let mut working = file.clone();
			for (index, op) in ops.iter().enumerate() {
				working
					.edit_with_limit(op, config.max_string_length)
					.map_err(|source| DocumentError::Batch {
						index,
						source: Box::new(source),
					})?;
			}
			*file = working;
			debug!(applied = ops.len(), "applied strict batch");
			Ok(BatchOutcome {
				applied: ops.len(),
				skipped: Vec::new(),
			})
		}
		ApplyMode::Lenient => {
			let mut outcome = BatchOutcome::default();
			for (index, op) in ops.iter().enumerate() {
				match file.edit_with_limit(op, config.max_string_length) {
					Ok(()) => outcome.applied += 1,
					Err(error) => {
						warn!(index, %error, "skipping edit that failed to apply");
						outcome.skipped.push(index);
					}
				}
			}
			debug!(applied = outcome.applied, skipped = outcome.skipped.len(), "applied lenient batch");
			Ok(outcome)
		}
	}
}
