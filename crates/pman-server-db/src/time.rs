// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::DbError;

/// Fixed-width UTC timestamp. Stored values compare correctly as plain text,
/// which the expiry filters rely on.
pub(crate) fn to_db_time(dt: DateTime<Utc>) -> String {
	dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn from_db_time(column: &str, value: &str) -> Result<DateTime<Utc>, DbError> {
	DateTime::parse_from_rfc3339(value)
		.map(|dt| dt.with_timezone(&Utc))
		.map_err(|e| DbError::Internal(format!("Invalid {column}: {e}")))
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{Duration, TimeZone};

	#[test]
	fn round_trips() {
		let now = Utc::now();
		let parsed = from_db_time("created_at", &to_db_time(now)).unwrap();
		assert_eq!(parsed.timestamp_micros(), now.timestamp_micros());
	}

	#[test]
	fn text_order_matches_time_order() {
		let a = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
		let b = a + Duration::microseconds(1);
		let c = a + Duration::days(400);
		assert!(to_db_time(a) < to_db_time(b));
		assert!(to_db_time(b) < to_db_time(c));
	}

	#[test]
	fn rejects_garbage() {
		assert!(matches!(
			from_db_time("updated_at", "yesterday"),
			Err(DbError::Internal(_))
		));
	}
}
