//! Validates markup from stdin against a small inline-formatting whitelist
#![expect(clippy::print_stdout, reason = "binary")]

use std::io::stdin;
use std::process::ExitCode;

use tagcheck::{TagRule, Validator};

fn main() -> ExitCode {
	let mut validator = Validator::default();
	validator.add_rules([
		TagRule::global()
			.attributes(["class", "id", "title"])
			.pattern("data-[a-z0-9-]+")
			.expect("valid pattern"),
		TagRule::new("a").attributes(["href", "rel", "target"]),
		TagRule::new("br").self_closing(true),
		TagRule::new("img")
			.attributes(["src", "alt", "width", "height"])
			.self_closing(true),
		TagRule::new("p"),
		TagRule::new("span"),
		TagRule::new("b"),
		TagRule::new("i"),
		TagRule::new("code"),
		TagRule::new("pre"),
		TagRule::new("ul"),
		TagRule::new("ol"),
		TagRule::new("li"),
	]);
	// streams, nothing is buffered beyond the open tags
	let violations = match validator.validate_reader(stdin().lock()) {
		Ok(violations) => violations,
		Err(err) => {
			for violation in &err.violations {
				println!("{violation}");
			}
			println!("error: {err}");
			return ExitCode::from(2);
		}
	};
	for violation in &violations {
		println!("{violation}");
	}
	if violations.is_empty() {
		ExitCode::SUCCESS
	} else {
		println!("{} violations", violations.len());
		ExitCode::FAILURE
	}
}
