//! Derived text fields: slugs, excerpts and reading time.

use once_cell::sync::Lazy;
use regex::Regex;

pub const EXCERPT_LENGTH: usize = 180;
pub const TAG_SLUG_LENGTH: usize = 30;
const WORDS_PER_MINUTE: f64 = 200.0;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Removes HTML tags and collapses whitespace.
pub fn strip_html(content: &str) -> String {
	let text = HTML_TAG.replace_all(content, " ");

	WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Converts a title or name into a URL-safe slug.
///
/// Non-ASCII text is transliterated first (`é` becomes `e`). Letters are
/// lowercased, runs of whitespace, hyphens and underscores become a single `-`,
/// and every other character is dropped.
pub fn slugify(input: &str) -> String {
	let input = deunicode::deunicode(input);
	let mut slug = String::with_capacity(input.len());
	let mut pending_separator = false;

	for c in input.chars() {
		if c.is_ascii_alphanumeric() {
			if pending_separator && !slug.is_empty() {
				slug.push('-');
			}

			pending_separator = false;
			slug.push(c.to_ascii_lowercase());
		} else if c.is_whitespace() || c == '-' || c == '_' {
			pending_separator = true;
		}
	}

	slug
}

/// Slug of a tag name, bounded to [`TAG_SLUG_LENGTH`] characters.
pub fn tag_slug(name: &str) -> String {
	let mut slug = slugify(name);

	slug.truncate(TAG_SLUG_LENGTH);
	slug.trim_end_matches('-').to_string()
}

/// Produces `base`, then `base-1`, `base-2`, ... for slug collision resolution.
pub fn slug_candidate(base: &str, attempt: u32) -> String {
	if attempt == 0 {
		base.to_string()
	} else {
		format!("{base}-{attempt}")
	}
}

/// The plain-text preview of a post's HTML content.
pub fn excerpt(content: &str) -> String {
	let text = strip_html(content);

	match text.char_indices().nth(EXCERPT_LENGTH) {
		Some((end, _)) => format!("{}…", text[..end].trim_end()),
		None => text,
	}
}

/// Estimated reading time in whole minutes, never less than one.
pub fn reading_time(content: &str) -> i32 {
	let words = strip_html(content).split_whitespace().count();
	#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
	let minutes = (words as f64 / WORDS_PER_MINUTE).round() as i32;

	minutes.max(1)
}
