use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::route::{post, tag, user};

pub const RESULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, Default, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
	#[default]
	All,
	Posts,
	Users,
	Tags,
}

impl SearchType {
	pub fn includes(self, other: Self) -> bool {
		self == Self::All || self == other
	}
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct SearchInput {
	/// Case-insensitive substring to look for.
	#[validate(length(max = 256))]
	pub query: Option<String>,
	/// Which kinds of results to return.
	#[serde(default, rename = "type")]
	pub kind: SearchType,
}

/// Up to ten matches of each requested kind. Kinds that were not requested are absent.
#[derive(Debug, Default, Serialize, JsonSchema)]
pub struct SearchResults {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub posts: Option<Vec<post::model::Post>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub users: Option<Vec<user::model::UserSummary>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tags: Option<Vec<tag::model::Tag>>,
}

#[cfg(test)]
mod test {
	use super::{SearchInput, SearchType};

	#[test]
	fn test_search_type() {
		let uri = "/search?query=rust&type=users".parse().unwrap();
		let input = axum::extract::Query::<SearchInput>::try_from_uri(&uri).unwrap().0;

		assert_eq!(input.kind, SearchType::Users);
		assert!(SearchType::All.includes(SearchType::Tags));
		assert!(!SearchType::Users.includes(SearchType::Posts));

		let uri = "/search?query=rust".parse().unwrap();
		let input = axum::extract::Query::<SearchInput>::try_from_uri(&uri).unwrap().0;

		assert_eq!(input.kind, SearchType::All);
	}
}
