//! Tracked changes: attributed ranges awaiting accept or reject.

use serde::{Deserialize, Serialize};

use crate::error::{OtError, Result};
use crate::range::{CharIdx, CharLen, Range};
use crate::tracking::{Tracking, TrackingProps};

/// A range of text attributed to an actor's insertion or deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChange {
	pub range: Range,
	pub tracking: TrackingProps,
}

impl TrackedChange {
	pub fn new(range: Range, tracking: TrackingProps) -> Self {
		Self { range, tracking }
	}

	/// Identical attribution and directly adjacent.
	///
	/// Changes by the same actor made at different times stay apart, so every
	/// character keeps the timestamp it was tracked with.
	pub fn can_merge(&self, other: &TrackedChange) -> bool {
		self.tracking == other.tracking && self.range.touches(&other.range)
	}

	/// Joins two adjacent changes with identical attribution.
	pub fn merge(&self, other: &TrackedChange) -> Result<TrackedChange> {
		if !self.can_merge(other) {
			return Err(OtError::CannotMerge);
		}
		Ok(self.merged_with(other))
	}

	fn merged_with(&self, other: &TrackedChange) -> TrackedChange {
		TrackedChange::new(self.range.union(&other.range), self.tracking.clone())
	}
}

/// Tracked changes ordered by position, never overlapping.
///
/// The list is the run-length form of a per-character attribution: adjacent
/// changes always differ in kind, actor or timestamp. The public `apply_*`
/// methods normalize immediately. Text operations use the unmerged variants
/// and normalize once at the end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<TrackedChange>", into = "Vec<TrackedChange>")]
pub struct TrackedChangeList {
	changes: Vec<TrackedChange>,
}

impl TrackedChangeList {
	/// Builds a list, sorting entries and merging adjacent identical ones.
	pub fn new(changes: impl IntoIterator<Item = TrackedChange>) -> Self {
		let mut list = Self {
			changes: changes.into_iter().filter(|c| !c.range.is_empty()).collect(),
		};
		list.normalize();
		list
	}

	pub fn len(&self) -> usize {
		self.changes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.changes.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &TrackedChange> {
		self.changes.iter()
	}

	pub fn as_slice(&self) -> &[TrackedChange] {
		&self.changes
	}

	/// Changes lying entirely inside `range`.
	pub fn in_range(&self, range: Range) -> impl Iterator<Item = &TrackedChange> {
		self.changes.iter().filter(move |c| range.contains(&c.range))
	}

	/// Changes covering the character at `cursor`.
	pub fn tracked_changes_at(&self, cursor: CharIdx) -> impl Iterator<Item = &TrackedChange> {
		self.changes
			.iter()
			.filter(move |c| c.range.start() <= cursor && cursor < c.range.end())
	}

	/// The parts of every change that fall inside `range`, clipped to it.
	pub fn intersect_range(&self, range: Range) -> Vec<TrackedChange> {
		self.changes
			.iter()
			.filter_map(|c| {
				c.range
					.intersect(&range)
					.map(|r| TrackedChange::new(r, c.tracking.clone()))
			})
			.collect()
	}

	/// Shifts changes around an insertion and tracks it if `tracking` is set.
	///
	/// An insertion strictly inside a change splits it. An insertion with
	/// the same attribution then merges back with both halves.
	pub fn apply_insert(&mut self, cursor: CharIdx, length: CharLen, tracking: Option<&TrackingProps>) {
		self.insert_unmerged(cursor, length, tracking);
		self.normalize();
	}

	/// Removes `[cursor, cursor + length)` from every change.
	pub fn apply_delete(&mut self, cursor: CharIdx, length: CharLen) {
		self.delete_unmerged(cursor, length);
		self.normalize();
	}

	/// Re-attributes `[cursor, cursor + length)`.
	///
	/// Without tracking this is a no-op. [`Tracking::Clear`] removes every
	/// change over the span, whoever made it. Props replace existing
	/// attribution over the span.
	pub fn apply_retain(&mut self, cursor: CharIdx, length: CharLen, tracking: Option<&Tracking>) {
		self.retain_unmerged(cursor, length, tracking);
		self.normalize();
	}

	pub(crate) fn insert_unmerged(&mut self, cursor: CharIdx, length: CharLen, tracking: Option<&TrackingProps>) {
		if length == 0 {
			return;
		}

		let mut changes = Vec::with_capacity(self.changes.len() + 2);
		for change in self.changes.drain(..) {
			let range = change.range;
			if range.start_is_after(cursor) || range.start() == cursor {
				changes.push(TrackedChange::new(range.shifted(length), change.tracking));
			} else if range.end() == cursor || !range.contains_cursor(cursor) {
				changes.push(change);
			} else {
				let left = Range::new(range.start(), cursor - range.start());
				let right = Range::new(cursor + length, range.end() - cursor);
				changes.push(TrackedChange::new(left, change.tracking.clone()));
				changes.push(TrackedChange::new(right, change.tracking));
			}
		}

		if let Some(tracking) = tracking {
			changes.push(TrackedChange::new(Range::new(cursor, length), tracking.clone()));
		}

		self.changes = changes;
		self.sort();
	}

	pub(crate) fn delete_unmerged(&mut self, cursor: CharIdx, length: CharLen) {
		if length == 0 {
			return;
		}

		let deleted = Range::new(cursor, length);
		self.changes.retain_mut(|change| {
			if deleted.contains(&change.range) {
				return false;
			}
			if change.range.overlaps(&deleted) {
				change.range = change.range.subtract(&deleted);
			} else if change.range.starts_after(&deleted) {
				change.range = change.range.shifted_back(length);
			}
			!change.range.is_empty()
		});
	}

	pub(crate) fn retain_unmerged(&mut self, cursor: CharIdx, length: CharLen, tracking: Option<&Tracking>) {
		let Some(tracking) = tracking else {
			return;
		};
		if length == 0 {
			return;
		}

		let retained = Range::new(cursor, length);
		let mut changes = Vec::with_capacity(self.changes.len() + 2);
		for change in self.changes.drain(..) {
			let range = change.range;
			if retained.contains(&range) {
				continue;
			}
			if !range.overlaps(&retained) {
				changes.push(change);
				continue;
			}

			let left = Range::new(range.start(), retained.start().saturating_sub(range.start()));
			let right = Range::new(retained.end(), range.end().saturating_sub(retained.end()));
			if range.start() < retained.start() && !left.is_empty() {
				changes.push(TrackedChange::new(left, change.tracking.clone()));
			}
			if range.end() > retained.end() && !right.is_empty() {
				changes.push(TrackedChange::new(right, change.tracking));
			}
		}

		if let Tracking::Props(props) = tracking {
			changes.push(TrackedChange::new(retained, props.clone()));
		}

		self.changes = changes;
		self.sort();
	}

	fn sort(&mut self) {
		self.changes.sort_by_key(|c| c.range.start());
	}

	/// Sorts and merges adjacent changes with identical attribution.
	pub(crate) fn normalize(&mut self) {
		self.sort();
		let mut merged: Vec<TrackedChange> = Vec::with_capacity(self.changes.len());
		for change in self.changes.drain(..) {
			match merged.last_mut() {
				Some(last) if last.can_merge(&change) => *last = last.merged_with(&change),
				_ => merged.push(change),
			}
		}
		self.changes = merged;
	}
}

impl From<Vec<TrackedChange>> for TrackedChangeList {
	fn from(changes: Vec<TrackedChange>) -> Self {
		Self::new(changes)
	}
}

impl From<TrackedChangeList> for Vec<TrackedChange> {
	fn from(list: TrackedChangeList) -> Self {
		list.changes
	}
}
