use clap::{
	ValueEnum,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use serde_json::Value;

/// Package version stamped with the git revision and target triple at build time.
pub const VERSION: &str = concat!(
	env!("CARGO_PKG_VERSION"),
	"-",
	env!("VERGEN_GIT_SHA"),
	"-",
	env!("VERGEN_CARGO_TARGET_TRIPLE"),
);

/// How command results are written to stdout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
	/// Indented JSON.
	#[default]
	Pretty,
	/// One JSON document per line.
	Compact,
}
impl Format {
	pub fn render(self, value: &Value) -> serde_json::Result<String> {
		match self {
			Self::Pretty => serde_json::to_string_pretty(value),
			Self::Compact => serde_json::to_string(value),
		}
	}
}

pub fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.usage(AnsiColor::Yellow.on_default() | Effects::BOLD)
		.literal(AnsiColor::Cyan.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
		.error(AnsiColor::Red.on_default() | Effects::BOLD)
		.invalid(AnsiColor::Red.on_default())
		.valid(AnsiColor::Green.on_default())
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn version_starts_with_the_package_version() {
		assert!(VERSION.starts_with(env!("CARGO_PKG_VERSION")));
		assert!(VERSION.matches('-').count() >= 2);
	}

	#[test]
	fn compact_output_is_a_single_line() {
		let value = json!({ "items": [{ "id": "4", "score": 1.5 }] });
		let compact = Format::Compact.render(&value).expect("Failed to render compact output.");
		let pretty = Format::Pretty.render(&value).expect("Failed to render pretty output.");

		assert_eq!(compact, r#"{"items":[{"id":"4","score":1.5}]}"#);
		assert!(pretty.lines().count() > 1);
		assert_eq!(serde_json::from_str::<Value>(&pretty).expect("Failed to parse output."), value);
	}
}
