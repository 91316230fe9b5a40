use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::route::model::{AuthorSummary, Paginate};

/// A comment as read from the database, joined with its author and post.
#[derive(Debug, sqlx::FromRow)]
pub struct CommentRow {
	pub id: Uuid,
	pub post_id: Uuid,
	pub user_id: Uuid,
	pub parent_id: Option<Uuid>,
	pub content: String,
	pub created_at: chrono::DateTime<chrono::Utc>,
	pub updated_at: chrono::DateTime<chrono::Utc>,
	pub replies_count: i64,
	pub author_name: String,
	pub author_username: Option<String>,
	pub author_avatar: Option<String>,
	pub post_title: String,
	pub post_slug: String,
}

/// The post a comment was written on.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PostSummary {
	pub id: Uuid,
	pub title: String,
	pub slug: String,
}

/// A comment on a post, or a reply to another comment.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
	pub id: Uuid,
	pub content: String,
	pub post_id: Uuid,
	/// The comment this replies to. Replies cannot be replied to.
	pub parent_id: Option<Uuid>,
	pub replies_count: i64,
	pub author: AuthorSummary,
	pub post: PostSummary,
	pub created_at: chrono::DateTime<chrono::Utc>,
	pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CommentRow> for Comment {
	fn from(row: CommentRow) -> Self {
		Self {
			id: row.id,
			content: row.content,
			post_id: row.post_id,
			parent_id: row.parent_id,
			replies_count: row.replies_count,
			author: AuthorSummary {
				id: row.user_id,
				name: row.author_name,
				username: row.author_username,
				avatar: row.author_avatar,
			},
			post: PostSummary {
				id: row.post_id,
				title: row.post_title,
				slug: row.post_slug,
			},
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

#[derive(Serialize, JsonSchema)]
pub struct CommentResponse {
	pub comment: Comment,
}

/// Reads an optional id where an empty value counts as absent.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
		None | Some("") => Ok(None),
		Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
	}
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ListCommentsInput {
	pub post_id: Uuid,
	/// Lists the replies to this comment. Top-level comments are listed when absent.
	#[serde(default, deserialize_with = "blank_as_none")]
	pub parent_id: Option<Uuid>,
	#[serde(flatten)]
	pub paginate: Paginate,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
	#[validate(length(min = 3, max = 5000))]
	pub content: String,
	pub post_id: Uuid,
	pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct UpdateCommentInput {
	#[validate(length(min = 3, max = 5000))]
	pub content: String,
}
