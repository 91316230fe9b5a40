use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::route::model::{positive, Paginate};

pub const DEFAULT_LIMIT: i64 = 20;

/// A topic that posts can be filed under.
///
/// Posts reference tags by slug.
#[model]
#[derive(Debug, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
	/// The unique identifier of the tag.
	#[serde(skip_deserializing)]
	pub id: Uuid,
	/// The display name of the tag.
	#[validate(length(min = 2, max = 64))]
	pub name: String,
	/// The URL-safe identifier derived from the name.
	#[serde(skip_deserializing)]
	pub slug: String,
	#[validate(length(max = 500))]
	pub description: Option<String>,
	#[serde(skip_deserializing)]
	pub created_at: chrono::DateTime<chrono::Utc>,
	#[serde(skip_deserializing)]
	pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, JsonSchema)]
pub struct TagResponse {
	pub tag: Tag,
}

/// A tag slug and the number of published posts using it.
#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
pub struct PopularTag {
	pub name: String,
	pub count: i64,
}

#[derive(Serialize, JsonSchema)]
pub struct PopularTags {
	pub tags: Vec<PopularTag>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct ListTagsInput {
	/// Case-insensitive substring of the tag name.
	#[validate(length(max = 64))]
	pub search: Option<String>,
	#[serde(default, deserialize_with = "positive")]
	pub page: Option<i64>,
	/// Defaults to 20.
	#[serde(default, deserialize_with = "positive")]
	pub limit: Option<i64>,
}

impl ListTagsInput {
	pub fn paginate(&self) -> Paginate {
		Paginate {
			page: self.page.unwrap_or(1),
			limit: self.limit.unwrap_or(DEFAULT_LIMIT),
		}
	}
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::{CreateTagInput, ListTagsInput, UpdateTagInput};

	#[test]
	fn test_create_tag_input() {
		let input = serde_json::from_value::<CreateTagInput>(serde_json::json!({
			"name": "Rust",
			"description": "Systems programming",
		}))
		.unwrap();

		assert!(input.validate().is_ok());

		let input = serde_json::from_value::<CreateTagInput>(serde_json::json!({ "name": "R" })).unwrap();

		assert!(input.validate().is_err());
	}

	#[test]
	fn test_update_tag_input_is_partial() {
		let input = serde_json::from_value::<UpdateTagInput>(serde_json::json!({})).unwrap();

		assert!(input.name.is_none());
		assert!(input.validate().is_ok());
	}

	#[test]
	fn test_list_tags_default_limit() {
		let uri = "/tags?search=ru".parse().unwrap();
		let input = axum::extract::Query::<ListTagsInput>::try_from_uri(&uri).unwrap().0;

		assert_eq!(input.paginate().limit, 20);
		assert_eq!(input.paginate().page, 1);
	}
}
