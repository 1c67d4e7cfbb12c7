//! Human-readable size parsing and the effective upload ceiling
//!
//! Upload limits are configured as strings such as `"2M"` or `"1.5gb"`.
//! [`parse_size`] turns those into byte counts and
//! [`effective_max_upload_size`] combines the two configured ceilings into
//! the one that actually binds.

use crate::errors::{UploadError, UploadResult};
use regex::Regex;
use std::sync::LazyLock;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

// Leading decimal number followed by an optional unit, nothing else.
static SIZE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^([0-9]+(?:\.[0-9]*)?)\s*(b|kb?|mb?|gb?)?$")
		.expect("SIZE_REGEX: invalid regex pattern")
});

/// Parses a human-readable size into a byte count.
///
/// Units are `b`, `k`/`kb`, `m`/`mb` and `g`/`gb` (case-insensitive,
/// binary multiples). A missing unit means bytes. Fractional results are
/// truncated, and values beyond `u64::MAX` saturate.
///
/// # Errors
///
/// Returns [`UploadError::InvalidSizeFormat`] when the text is not a number
/// optionally followed by one of the units above.
///
/// # Examples
///
/// ```
/// use formhandler_uploads::size::parse_size;
///
/// assert_eq!(parse_size("1024b").unwrap(), 1024);
/// assert_eq!(parse_size("5M").unwrap(), 5 * 1024 * 1024);
/// assert_eq!(parse_size("1.4mb").unwrap(), 1_468_006);
/// assert!(parse_size("wrong").is_err());
/// ```
pub fn parse_size(text: &str) -> UploadResult<u64> {
	let trimmed = text.trim();
	let invalid = || UploadError::InvalidSizeFormat {
		value: text.to_string(),
	};

	let caps = SIZE_REGEX.captures(trimmed).ok_or_else(invalid)?;
	let number = &caps[1];
	let multiplier = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
		None => 1,
		Some(unit) => match unit.as_str() {
			"b" => 1,
			"k" | "kb" => KB,
			"m" | "mb" => MB,
			"g" | "gb" => GB,
			_ => return Err(invalid()),
		},
	};

	match number.split_once('.') {
		None | Some((_, "")) => {
			let whole = number.trim_end_matches('.');
			// The regex guarantees digits, so a parse failure can only be overflow.
			Ok(whole
				.parse::<u64>()
				.map(|n| n.saturating_mul(multiplier))
				.unwrap_or(u64::MAX))
		}
		Some(_) => {
			let value: f64 = number.parse().map_err(|_| invalid())?;
			Ok((value * multiplier as f64).floor() as u64)
		}
	}
}

/// Returns the binding upload ceiling from two configured limits.
///
/// - Uploads disabled: `0`, whatever the limits say.
/// - A limit that fails to parse is ignored and logged.
/// - When both parse, the smaller wins; when one parses, it wins.
/// - When neither parses no bound can be established and `0` is returned,
///   refusing uploads rather than leaving them unbounded.
///
/// # Examples
///
/// ```
/// use formhandler_uploads::size::effective_max_upload_size;
///
/// assert_eq!(effective_max_upload_size(true, "5m", "2m"), 2 * 1024 * 1024);
/// assert_eq!(effective_max_upload_size(true, "2q", "2m"), 2 * 1024 * 1024);
/// assert_eq!(effective_max_upload_size(false, "5m", "2m"), 0);
/// ```
pub fn effective_max_upload_size(
	uploads_enabled: bool,
	upload_max_filesize: &str,
	post_max_size: &str,
) -> u64 {
	if !uploads_enabled {
		return 0;
	}

	let upload_max = parse_limit("upload_max_filesize", upload_max_filesize);
	let post_max = parse_limit("post_max_size", post_max_size);

	match (upload_max, post_max) {
		(Some(a), Some(b)) => a.min(b),
		(Some(a), None) => a,
		(None, Some(b)) => b,
		(None, None) => {
			tracing::warn!("no upload size limit could be parsed, refusing uploads");
			0
		}
	}
}

fn parse_limit(setting: &str, value: &str) -> Option<u64> {
	match parse_size(value) {
		Ok(bytes) => Some(bytes),
		Err(e) => {
			tracing::warn!(setting, value, "ignoring malformed size setting: {}", e);
			None
		}
	}
}

/// Formats a byte count for messages shown to users.
///
/// # Examples
///
/// ```
/// use formhandler_uploads::size::format_size;
///
/// assert_eq!(format_size(512), "512 B");
/// assert_eq!(format_size(2 * 1024 * 1024), "2 MB");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
	for (unit, name) in [(GB, "GB"), (MB, "MB"), (KB, "KB")] {
		if bytes >= unit {
			if bytes % unit == 0 {
				return format!("{} {}", bytes / unit, name);
			}
			return format!("{:.2} {}", bytes as f64 / unit as f64, name);
		}
	}
	format!("{} B", bytes)
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use rstest::rstest;

	#[rstest]
	#[case("1024b", 1024)]
	#[case("1B", 1)]
	#[case("1kb", 1024)]
	#[case("21k", 21504)]
	#[case("5m", 5_242_880)]
	#[case("5M", 5_242_880)]
	#[case("1G", 1_073_741_824)]
	#[case("4g", 4_294_967_296)]
	#[case("1.4mb", 1_468_006)]
	#[case("  8M  ", 8_388_608)]
	#[case("512", 512)]
	#[case("3.", 3)]
	#[case("2 KB", 2048)]
	fn test_parse_size_known_literals(#[case] input: &str, #[case] expected: u64) {
		// Act
		let bytes = parse_size(input).unwrap();

		// Assert
		assert_eq!(bytes, expected);
	}

	#[rstest]
	#[case("wrong")]
	#[case("")]
	#[case("2q")]
	#[case("left")]
	#[case("m5")]
	#[case(".5m")]
	#[case("5mbb")]
	#[case("-1k")]
	fn test_parse_size_rejects_malformed(#[case] input: &str) {
		// Act
		let result = parse_size(input);

		// Assert
		assert!(
			matches!(result, Err(UploadError::InvalidSizeFormat { ref value }) if value == input)
		);
	}

	#[rstest]
	fn test_parse_size_saturates_on_overflow() {
		assert_eq!(parse_size("99999999999999999999g").unwrap(), u64::MAX);
		assert_eq!(parse_size("17179869184g").unwrap(), u64::MAX);
	}

	#[rstest]
	#[case(false, "5m", "2m", 0)]
	#[case(false, "wrong", "wrong", 0)]
	#[case(true, "5m", "2m", 2_097_152)]
	#[case(true, "2kb", "2m", 2048)]
	#[case(true, "2q", "2m", 2_097_152)]
	#[case(true, "2m", "left", 2_097_152)]
	#[case(true, "2q", "left", 0)]
	fn test_effective_max_upload_size(
		#[case] enabled: bool,
		#[case] upload_max: &str,
		#[case] post_max: &str,
		#[case] expected: u64,
	) {
		// Act
		let max = effective_max_upload_size(enabled, upload_max, post_max);

		// Assert
		assert_eq!(max, expected);
	}

	#[rstest]
	#[case(0, "0 B")]
	#[case(1023, "1023 B")]
	#[case(1024, "1 KB")]
	#[case(1_468_006, "1.40 MB")]
	#[case(4 * GB, "4 GB")]
	fn test_format_size(#[case] bytes: u64, #[case] expected: &str) {
		assert_eq!(format_size(bytes), expected);
	}

	proptest! {
		#[test]
		fn prop_kilobytes_scale_by_1024(n in 0u64..1_000_000) {
			prop_assert_eq!(parse_size(&format!("{}k", n)).unwrap(), n * 1024);
			prop_assert_eq!(parse_size(&format!("{}KB", n)).unwrap(), n * 1024);
		}

		#[test]
		fn prop_effective_max_never_exceeds_either_limit(a in 0u64..1_000_000, b in 0u64..1_000_000) {
			let max = effective_max_upload_size(true, &format!("{}b", a), &format!("{}", b));
			prop_assert_eq!(max, a.min(b));
		}
	}
}
