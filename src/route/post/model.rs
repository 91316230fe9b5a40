use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::route::model::{AuthorSummary, Paginate};

/// A post as read from the database, joined with its author.
#[derive(Debug, sqlx::FromRow)]
pub struct PostRow {
	pub id: Uuid,
	pub user_id: Uuid,
	pub title: String,
	pub content: String,
	pub excerpt: String,
	pub slug: String,
	pub cover_image: Option<String>,
	pub published: bool,
	pub tags: Vec<String>,
	pub reading_time: i32,
	pub likes_count: i64,
	pub comments_count: i64,
	pub created_at: chrono::DateTime<chrono::Utc>,
	pub updated_at: chrono::DateTime<chrono::Utc>,
	pub author_name: String,
	pub author_username: Option<String>,
	pub author_avatar: Option<String>,
}

/// A single post, created by a user.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Post {
	/// The unique identifier of the post.
	pub id: Uuid,
	pub title: String,
	/// The content of the post in HTML.
	pub content: String,
	/// A plain-text preview of the content.
	pub excerpt: String,
	/// The unique, URL-safe identifier derived from the title.
	pub slug: String,
	pub cover_image: Option<String>,
	pub published: bool,
	/// Tag slugs.
	pub tags: Vec<String>,
	/// Estimated reading time in minutes.
	pub reading_time: i32,
	pub likes_count: i64,
	pub comments_count: i64,
	pub author: AuthorSummary,
	pub created_at: chrono::DateTime<chrono::Utc>,
	pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<PostRow> for Post {
	fn from(row: PostRow) -> Self {
		Self {
			id: row.id,
			title: row.title,
			content: row.content,
			excerpt: row.excerpt,
			slug: row.slug,
			cover_image: row.cover_image,
			published: row.published,
			tags: row.tags,
			reading_time: row.reading_time,
			likes_count: row.likes_count,
			comments_count: row.comments_count,
			author: AuthorSummary {
				id: row.user_id,
				name: row.author_name,
				username: row.author_username,
				avatar: row.author_avatar,
			},
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

#[derive(Serialize, JsonSchema)]
pub struct PostResponse {
	pub post: Post,
}

/// Which drafts a listing is allowed to return, independently of the
/// `published` filter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Drafts {
	#[default]
	Any,
	/// Only drafts written by this viewer, or none for an anonymous one.
	VisibleTo(Option<Uuid>),
}

/// Restrictions applied to a post listing. Every field is optional.
#[derive(Debug, Default, Clone)]
pub struct PostFilters {
	pub author_id: Option<Uuid>,
	/// `None` lists both published posts and drafts.
	pub published: Option<bool>,
	pub drafts: Drafts,
	/// A tag slug.
	pub tag: Option<String>,
	/// Case-insensitive substring of the title or the content.
	pub search: Option<String>,
	/// Only posts by authors this user follows.
	pub followed_by: Option<Uuid>,
	/// Only posts this user liked.
	pub liked_by: Option<Uuid>,
}

impl PostFilters {
	pub fn published() -> Self {
		Self {
			published: Some(true),
			..Self::default()
		}
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PostOrder {
	/// Newest first.
	#[default]
	Latest,
	/// Most liked, then most commented, then newest.
	Popular,
}

impl PostOrder {
	pub fn sql(self) -> &'static str {
		match self {
			Self::Latest => "p.created_at DESC, p.id DESC",
			Self::Popular => "p.likes_count DESC, p.comments_count DESC, p.created_at DESC, p.id DESC",
		}
	}
}

/// Reads `true` or `false`, treating anything else as absent.
fn tri_state<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;

	Ok(raw.and_then(|value| value.trim().parse::<bool>().ok()))
}

fn non_blank(value: Option<&String>) -> Option<String> {
	value
		.map(|value| value.trim())
		.filter(|value| !value.is_empty())
		.map(str::to_string)
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListPostsInput {
	pub author_id: Option<Uuid>,
	#[serde(default, deserialize_with = "tri_state")]
	#[schemars(with = "Option<bool>")]
	pub published: Option<bool>,
	#[validate(length(max = 64))]
	pub tag: Option<String>,
	#[validate(length(max = 256))]
	pub search: Option<String>,
	#[serde(flatten)]
	pub paginate: Paginate,
}

impl ListPostsInput {
	pub fn filters(&self) -> PostFilters {
		PostFilters {
			author_id: self.author_id,
			published: self.published,
			tag: non_blank(self.tag.as_ref()).map(|tag| crate::text::tag_slug(&tag)),
			search: non_blank(self.search.as_ref()),
			..PostFilters::default()
		}
	}
}

#[derive(Debug, Clone, Copy, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
	Latest,
	Following,
	Recommended,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct FeedInput {
	pub kind: FeedKind,
}

/// Titles are stored trimmed, so one made only of whitespace would be empty.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
	if title.trim().is_empty() {
		return Err(ValidationError::new("title must not be blank"));
	}

	Ok(())
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
	#[validate(length(min = 1, max = 200), custom(function = "validate_title"))]
	pub title: String,
	/// The content of the post in HTML.
	#[validate(length(min = 20))]
	pub content: String,
	/// Overrides the preview derived from the content.
	#[validate(length(max = 500))]
	pub excerpt: Option<String>,
	#[validate(url)]
	pub cover_image: Option<String>,
	/// Tag names. Unknown tags are created.
	#[serde(default)]
	#[validate(length(max = 10))]
	pub tags: Vec<String>,
	#[serde(default)]
	pub published: bool,
}

/// Changes to a post. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostInput {
	#[validate(length(min = 1, max = 200), custom(function = "validate_title"))]
	pub title: Option<String>,
	#[validate(length(min = 20))]
	pub content: Option<String>,
	#[validate(length(max = 500))]
	pub excerpt: Option<String>,
	#[validate(url)]
	pub cover_image: Option<String>,
	#[validate(length(max = 10))]
	pub tags: Option<Vec<String>>,
	pub published: Option<bool>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct PublishInput {
	pub published: bool,
}

/// Whether the viewer likes a post, and how many likes it has.
#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
	pub is_liked: bool,
	pub likes_count: i64,
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::{CreatePostInput, FeedKind, ListPostsInput, UpdatePostInput};

	fn list(query: &str) -> ListPostsInput {
		let uri = format!("/posts?{query}").parse().unwrap();

		axum::extract::Query::<ListPostsInput>::try_from_uri(&uri)
			.unwrap()
			.0
	}

	#[test]
	fn test_list_posts_input() {
		let input = list("tag=Web%20Dev&search=%20rust%20&published=true&page=2");
		let filters = input.filters();

		assert_eq!(filters.tag.as_deref(), Some("web-dev"));
		assert_eq!(filters.search.as_deref(), Some("rust"));
		assert_eq!(filters.published, Some(true));
		assert_eq!(input.paginate.page, 2);
		assert_eq!(input.paginate.limit, 10);
	}

	#[test]
	fn test_list_posts_published_is_tri_state() {
		assert_eq!(list("published=false").filters().published, Some(false));
		assert_eq!(list("published=maybe").filters().published, None);
		assert_eq!(list("").filters().published, None);
		assert_eq!(list("search=%20%20").filters().search, None);
	}

	#[test]
	fn test_feed_kind() {
		let kind = serde_json::from_str::<FeedKind>("\"recommended\"").unwrap();

		assert_eq!(kind, FeedKind::Recommended);
		assert!(serde_json::from_str::<FeedKind>("\"random\"").is_err());
	}

	#[test]
	fn test_create_post_input() {
		let input = serde_json::from_value::<CreatePostInput>(serde_json::json!({
			"title": "Hi",
			"content": "word ".repeat(25),
			"published": true,
		}))
		.unwrap();

		assert!(input.validate().is_ok());
		assert!(input.tags.is_empty());

		let input = serde_json::from_value::<CreatePostInput>(serde_json::json!({
			"title": "Hi",
			"content": "too short",
			"coverImage": "nope",
		}))
		.unwrap();

		let errors = input.validate().unwrap_err();

		assert!(errors.field_errors().contains_key("content"));
		assert_eq!(errors.field_errors().len(), 2);
	}

	#[test]
	fn test_blank_title_is_rejected() {
		let input = serde_json::from_value::<CreatePostInput>(serde_json::json!({
			"title": "   ",
			"content": "word ".repeat(25),
		}))
		.unwrap();

		assert!(input.validate().unwrap_err().field_errors().contains_key("title"));

		let input = serde_json::from_value::<UpdatePostInput>(serde_json::json!({ "title": "\t\n" }))
			.unwrap();

		assert!(input.validate().unwrap_err().field_errors().contains_key("title"));

		let input = serde_json::from_value::<UpdatePostInput>(serde_json::json!({ "title": " Hi " }))
			.unwrap();

		assert!(input.validate().is_ok());
	}
}
