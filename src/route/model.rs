use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// These can be removed when [`serde`] supports
/// literal defaults: <https://github.com/serde-rs/serde/issues/368>
#[inline]
fn one() -> i64 {
	DEFAULT_PAGE
}

#[inline]
fn ten() -> i64 {
	DEFAULT_LIMIT
}

/// Reads a positive integer, treating anything else as absent.
pub(crate) fn positive<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;

	Ok(raw
		.and_then(|value| value.trim().parse::<i64>().ok())
		.filter(|value| *value >= 1))
}

fn page_or_default<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(positive(deserializer)?.unwrap_or(DEFAULT_PAGE))
}

fn limit_or_default<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
	D: Deserializer<'de>,
{
	Ok(positive(deserializer)?.unwrap_or(DEFAULT_LIMIT))
}

/// Pagination parameters shared by every listing route.
///
/// Malformed values fall back to the defaults instead of failing the request.
#[derive(Debug, Clone, Copy, Deserialize, Validate, JsonSchema)]
pub struct Paginate {
	/// The page number to return (1-indexed).
	#[serde(default = "one", deserialize_with = "page_or_default")]
	#[schemars(with = "Option<i64>")]
	pub page: i64,
	/// The number of items to return per page.
	#[serde(default = "ten", deserialize_with = "limit_or_default")]
	#[schemars(with = "Option<i64>")]
	pub limit: i64,
}

impl Default for Paginate {
	fn default() -> Self {
		Self {
			page: DEFAULT_PAGE,
			limit: DEFAULT_LIMIT,
		}
	}
}

impl Paginate {
	pub fn with_limit(limit: i64) -> Self {
		Self {
			page: DEFAULT_PAGE,
			limit,
		}
	}

	pub fn offset(&self) -> i64 {
		(self.page.max(1) - 1).saturating_mul(self.limit())
	}

	pub fn limit(&self) -> i64 {
		self.limit.max(1)
	}
}

/// Pagination metadata returned next to every page of results.
#[derive(Debug, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
	/// The number of items matching the query across all pages.
	pub total: i64,
	pub page: i64,
	pub limit: i64,
	pub total_pages: i64,
	/// Whether items exist after this page.
	pub has_more: bool,
}

impl Pagination {
	pub fn new(paginate: &Paginate, returned: usize, total: i64) -> Self {
		let limit = paginate.limit();
		let returned = i64::try_from(returned).unwrap_or(i64::MAX);

		Self {
			total,
			page: paginate.page,
			limit,
			total_pages: (total + limit - 1) / limit,
			has_more: paginate.offset() + returned < total,
		}
	}
}

/// A single page of results.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Page<T> {
	pub data: Vec<T>,
	pub pagination: Pagination,
}

impl<T> Page<T> {
	pub fn new(data: Vec<T>, paginate: &Paginate, total: i64) -> Self {
		Self {
			pagination: Pagination::new(paginate, data.len(), total),
			data,
		}
	}

	pub fn empty(paginate: &Paginate) -> Self {
		Self::new(Vec::new(), paginate, 0)
	}

	pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
		Page {
			data: self.data.into_iter().map(f).collect(),
			pagination: self.pagination,
		}
	}
}

/// A bare result count, for routes that return a short list without pages.
#[derive(Debug, Default, Deserialize, Validate, JsonSchema)]
pub struct LimitInput {
	#[serde(default, deserialize_with = "positive")]
	pub limit: Option<i64>,
}

impl LimitInput {
	pub fn limit_or(&self, default: i64) -> i64 {
		self.limit.unwrap_or(default).max(1)
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct IdInput {
	pub id: Uuid,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SlugInput {
	#[validate(length(min = 1, max = 256))]
	pub slug: String,
}

/// The public projection of a user attached to posts and comments.
#[derive(Debug, Clone, Serialize, JsonSchema, PartialEq, Eq)]
pub struct AuthorSummary {
	pub id: Uuid,
	pub name: String,
	pub username: Option<String>,
	pub avatar: Option<String>,
}

#[cfg(test)]
mod test {
	use super::{LimitInput, Paginate, Pagination};

	#[derive(serde::Deserialize)]
	struct Wrapper {
		#[serde(flatten)]
		paginate: Paginate,
	}

	fn parse(query: &str) -> Paginate {
		let uri = format!("/posts?{query}").parse().unwrap();

		axum::extract::Query::<Wrapper>::try_from_uri(&uri)
			.unwrap()
			.0
			.paginate
	}

	#[test]
	fn test_paginate_offset() {
		let mut paginate = Paginate { page: 1, limit: 10 };

		assert_eq!(paginate.offset(), 0);

		paginate.page = 2;

		assert_eq!(paginate.offset(), 10);

		paginate.limit = 5;

		assert_eq!(paginate.offset(), 5);

		paginate.page = 3;

		assert_eq!(paginate.offset(), 10);
	}

	#[test]
	fn test_paginate_limit_is_not_capped() {
		let paginate = parse("limit=500");

		assert_eq!(paginate.limit(), 500);
		assert_eq!(Pagination::new(&paginate, 3, 3).limit, 500);
		assert_eq!(Paginate { page: 1, limit: 0 }.limit(), 1);
	}

	#[test]
	fn test_paginate_defaults() {
		let paginate = parse("");

		assert_eq!((paginate.page, paginate.limit), (1, 10));
	}

	#[test]
	fn test_paginate_non_numeric_falls_back() {
		let paginate = parse("page=abc&limit=-4");

		assert_eq!((paginate.page, paginate.limit), (1, 10));

		let paginate = parse("page=3&limit=25");

		assert_eq!((paginate.page, paginate.limit), (3, 25));
	}

	#[test]
	fn test_limit_input() {
		let uri = "/users/suggested?limit=oops".parse().unwrap();
		let input = axum::extract::Query::<LimitInput>::try_from_uri(&uri).unwrap().0;

		assert_eq!(input.limit_or(5), 5);

		let uri = "/tags/popular?limit=500".parse().unwrap();
		let input = axum::extract::Query::<LimitInput>::try_from_uri(&uri).unwrap().0;

		assert_eq!(input.limit_or(10), 500);
		assert_eq!(LimitInput::default().limit_or(10), 10);
	}

	#[test]
	fn test_pagination_metadata() {
		let paginate = Paginate { page: 2, limit: 10 };
		let pagination = Pagination::new(&paginate, 10, 25);

		assert_eq!(
			pagination,
			Pagination {
				total: 25,
				page: 2,
				limit: 10,
				total_pages: 3,
				has_more: true,
			}
		);

		let paginate = Paginate { page: 3, limit: 10 };

		assert!(!Pagination::new(&paginate, 5, 25).has_more);
		assert_eq!(Pagination::new(&paginate, 0, 0).total_pages, 0);
	}
}
