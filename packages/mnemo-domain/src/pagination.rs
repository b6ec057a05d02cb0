//! Cursor pagination over `(created_at DESC, id DESC)`.
//!
//! Backends resolve the cursor row, fetch `limit + 1` rows past it in the window's fetch order
//! and hand them to [`finish_page`], which trims the probe row and restores newest-first order.

use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use mnemo_config::{BackwardHasMore, MAX_PAGE_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageError {
	#[error("starting_after and ending_before cannot be used simultaneously.")]
	ConflictingCursors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
	/// Older rows, fetched newest first.
	Forward,
	/// Newer rows, fetched oldest first and reversed.
	Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
	Start,
	StartingAfter(Uuid),
	EndingBefore(Uuid),
}
impl Cursor {
	pub fn new(starting_after: Option<Uuid>, ending_before: Option<Uuid>) -> Result<Self, PageError> {
		match (starting_after, ending_before) {
			(Some(_), Some(_)) => Err(PageError::ConflictingCursors),
			(Some(id), None) => Ok(Self::StartingAfter(id)),
			(None, Some(id)) => Ok(Self::EndingBefore(id)),
			(None, None) => Ok(Self::Start),
		}
	}

	pub fn id(&self) -> Option<Uuid> {
		match self {
			Self::Start => None,
			Self::StartingAfter(id) | Self::EndingBefore(id) => Some(*id),
		}
	}

	pub fn direction(&self) -> Direction {
		match self {
			Self::EndingBefore(_) => Direction::Backward,
			Self::Start | Self::StartingAfter(_) => Direction::Forward,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
	pub limit: u32,
	pub cursor: Cursor,
}
impl PageWindow {
	pub fn new(
		limit: Option<i64>,
		default_limit: u32,
		starting_after: Option<Uuid>,
		ending_before: Option<Uuid>,
	) -> Result<Self, PageError> {
		let cursor = Cursor::new(starting_after, ending_before)?;

		Ok(Self { limit: clamp_limit(limit, default_limit), cursor })
	}

	pub fn direction(&self) -> Direction {
		self.cursor.direction()
	}

	/// Rows to request from the backend, one more than the page holds.
	pub fn fetch_limit(&self) -> u32 {
		self.limit + 1
	}
}

/// Position of a resolved cursor row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorKey {
	pub created_at: OffsetDateTime,
	pub id: Uuid,
}
impl CursorKey {
	/// Whether a row lies strictly past the cursor in the window's direction.
	pub fn admits(&self, direction: Direction, created_at: OffsetDateTime, id: Uuid) -> bool {
		let row = (created_at, id);
		let cursor = (self.created_at, self.id);

		match direction {
			Direction::Forward => row < cursor,
			Direction::Backward => row > cursor,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
	pub data: Vec<T>,
	pub has_more: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub total: Option<i64>,
}
impl<T> Page<T> {
	pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
		Page { data: self.data.into_iter().map(f).collect(), has_more: self.has_more, total: self.total }
	}
}

pub fn clamp_limit(limit: Option<i64>, default_limit: u32) -> u32 {
	let limit = limit.unwrap_or(i64::from(default_limit));

	limit.clamp(1, i64::from(MAX_PAGE_SIZE)) as u32
}

/// Builds the returned page from rows in fetch order. `has_more` is exact: it reports whether
/// a row beyond the page exists in the window's direction.
pub fn finish_page<T>(mut rows: Vec<T>, window: &PageWindow) -> Page<T> {
	let limit = window.limit as usize;
	let has_more = rows.len() > limit;

	rows.truncate(limit);

	if window.direction() == Direction::Backward {
		rows.reverse();
	}

	Page { data: rows, has_more, total: None }
}

/// Applies the configured reporting policy to an exact `has_more`.
pub fn report_has_more(exact: bool, window: &PageWindow, policy: BackwardHasMore) -> bool {
	match (window.direction(), policy) {
		(Direction::Backward, BackwardHasMore::Always) => true,
		_ => exact,
	}
}
