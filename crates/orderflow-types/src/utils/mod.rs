//! Formatting and clock helpers shared across crates.

use std::time::{SystemTime, UNIX_EPOCH};

/// Shortens an identifier for log output: the first 8 characters followed
/// by "..".
pub fn truncate_id(id: &str) -> String {
	match id.char_indices().nth(8) {
		Some((cut, _)) => format!("{}..", &id[..cut]),
		None => id.to_string(),
	}
}

/// Current unix time in seconds.
pub fn current_timestamp() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}
