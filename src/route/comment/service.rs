use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
	route::model::{Page, Paginate},
	Database,
};

use super::{model, Error, RouteError};

const SELECT_COMMENT: &str = r#"
	SELECT
		c.*,
		(SELECT COUNT(*) FROM comment r WHERE r.parent_id = c.id) AS replies_count,
		u.name AS author_name,
		u.username AS author_username,
		u.avatar AS author_avatar,
		p.title AS post_title,
		p.slug AS post_slug
	FROM comment c
	JOIN "user" u ON u.id = c.user_id
	JOIN post p ON p.id = c.post_id
"#;

async fn fetch_comment(
	conn: &mut PgConnection,
	id: Uuid,
) -> Result<Option<model::Comment>, sqlx::Error> {
	let row = sqlx::query_as::<_, model::CommentRow>(&format!("{SELECT_COMMENT} WHERE c.id = $1"))
		.bind(id)
		.fetch_optional(&mut *conn)
		.await?;

	Ok(row.map(model::Comment::from))
}

/// Fetches a comment if `viewer` can see the post it belongs to.
pub async fn get_comment(
	database: &Database,
	id: Uuid,
	viewer: Option<Uuid>,
) -> Result<Option<model::Comment>, sqlx::Error> {
	let row = sqlx::query_as::<_, model::CommentRow>(&format!(
		"{SELECT_COMMENT} WHERE c.id = $1 AND (p.published OR p.user_id = $2::UUID)"
	))
	.bind(id)
	.bind(viewer)
	.fetch_optional(database)
	.await?;

	Ok(row.map(model::Comment::from))
}

/// Lists the comments on a post, newest first.
///
/// With `parent_id` the replies to that comment are listed, otherwise the
/// top-level comments.
pub async fn list_for_post(
	database: &Database,
	post_id: Uuid,
	parent_id: Option<Uuid>,
	paginate: &Paginate,
) -> Result<Page<model::Comment>, sqlx::Error> {
	const FILTER: &str = "WHERE c.post_id = $1 AND c.parent_id IS NOT DISTINCT FROM $2::UUID";

	let rows = sqlx::query_as::<_, model::CommentRow>(&format!(
		"{SELECT_COMMENT} {FILTER} ORDER BY c.created_at DESC, c.id LIMIT $3 OFFSET $4"
	))
	.bind(post_id)
	.bind(parent_id)
	.bind(paginate.limit())
	.bind(paginate.offset())
	.fetch_all(database)
	.await?;

	let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM comment c {FILTER}"))
		.bind(post_id)
		.bind(parent_id)
		.fetch_one(database)
		.await?;

	Ok(Page::new(rows, paginate, total).map(model::Comment::from))
}

/// Lists the comments written by a user on posts the viewer can see, newest first.
pub async fn list_for_user(
	database: &Database,
	user_id: Uuid,
	viewer: Option<Uuid>,
	paginate: &Paginate,
) -> Result<Page<model::Comment>, sqlx::Error> {
	const FILTER: &str = "WHERE c.user_id = $1 AND (p.published OR p.user_id = $2::UUID)";

	let rows = sqlx::query_as::<_, model::CommentRow>(&format!(
		"{SELECT_COMMENT} {FILTER} ORDER BY c.created_at DESC, c.id LIMIT $3 OFFSET $4"
	))
	.bind(user_id)
	.bind(viewer)
	.bind(paginate.limit())
	.bind(paginate.offset())
	.fetch_all(database)
	.await?;

	let total = sqlx::query_scalar::<_, i64>(&format!(
		"SELECT COUNT(*) FROM comment c JOIN post p ON p.id = c.post_id {FILTER}"
	))
	.bind(user_id)
	.bind(viewer)
	.fetch_one(database)
	.await?;

	Ok(Page::new(rows, paginate, total).map(model::Comment::from))
}

/// Locks the post for the rest of the transaction if `viewer` can see it.
async fn lock_visible_post(
	conn: &mut PgConnection,
	post_id: Uuid,
	viewer: Uuid,
) -> Result<(), RouteError> {
	let post = sqlx::query_as::<_, (Uuid, bool)>(
		"SELECT user_id, published FROM post WHERE id = $1 FOR UPDATE",
	)
	.bind(post_id)
	.fetch_optional(&mut *conn)
	.await?;

	match post {
		Some((author, published)) if published || author == viewer => Ok(()),
		_ => Err(Error::UnknownPost(post_id).into()),
	}
}

/// Verifies that `user` wrote the comment, returning the post it belongs to.
async fn owned_comment(conn: &mut PgConnection, id: Uuid, user: Uuid) -> Result<Uuid, RouteError> {
	let comment =
		sqlx::query_as::<_, (Uuid, Uuid)>("SELECT user_id, post_id FROM comment WHERE id = $1")
			.bind(id)
			.fetch_optional(&mut *conn)
			.await?;

	match comment {
		None => Err(Error::UnknownComment(id).into()),
		Some((author, _)) if author != user => Err(Error::NotOwner(id).into()),
		Some((_, post_id)) => Ok(post_id),
	}
}

/// Writes a comment and counts it on the post in the same transaction.
#[tracing::instrument(skip(database, input), fields(post = %input.post_id))]
pub async fn create_comment(
	database: &Database,
	author: Uuid,
	input: model::CreateCommentInput,
) -> Result<model::Comment, RouteError> {
	let mut tx = database.begin().await?;

	lock_visible_post(&mut tx, input.post_id, author).await?;

	if let Some(parent_id) = input.parent_id {
		let parent = sqlx::query_as::<_, (Uuid, Option<Uuid>)>(
			"SELECT post_id, parent_id FROM comment WHERE id = $1",
		)
		.bind(parent_id)
		.fetch_optional(&mut *tx)
		.await?;

		match parent {
			Some((post_id, _)) if post_id != input.post_id => {
				return Err(Error::InvalidParent(parent_id).into())
			}
			Some((_, Some(_))) => return Err(Error::NestedReply(parent_id).into()),
			Some(_) => {}
			None => return Err(Error::InvalidParent(parent_id).into()),
		}
	}

	let id = sqlx::query_scalar::<_, Uuid>(
		r#"
			INSERT INTO comment (post_id, user_id, parent_id, content)
			VALUES ($1, $2, $3, $4)
			RETURNING id
		"#,
	)
	.bind(input.post_id)
	.bind(author)
	.bind(input.parent_id)
	.bind(input.content.trim())
	.fetch_one(&mut *tx)
	.await?;

	sqlx::query("UPDATE post SET comments_count = comments_count + 1 WHERE id = $1")
		.bind(input.post_id)
		.execute(&mut *tx)
		.await?;

	let comment = fetch_comment(&mut tx, id)
		.await?
		.ok_or(Error::UnknownComment(id))?;

	tx.commit().await?;

	tracing::info!(monotonic_counter.comments_created = 1_u64, comment = %id);

	Ok(comment)
}

pub async fn update_comment(
	database: &Database,
	id: Uuid,
	user: Uuid,
	content: &str,
) -> Result<model::Comment, RouteError> {
	let mut conn = database.acquire().await?;

	owned_comment(&mut conn, id, user).await?;

	sqlx::query("UPDATE comment SET content = $2, updated_at = now() WHERE id = $1")
		.bind(id)
		.bind(content.trim())
		.execute(&mut *conn)
		.await?;

	let comment = fetch_comment(&mut conn, id)
		.await?
		.ok_or(Error::UnknownComment(id))?;

	Ok(comment)
}

/// Deletes a comment and its replies, taking them off the post's comment count.
///
/// The post row is locked before any comment row, in the same order as
/// [`create_comment`].
#[tracing::instrument(skip(database))]
pub async fn delete_comment(database: &Database, id: Uuid, user: Uuid) -> Result<(), RouteError> {
	let mut tx = database.begin().await?;

	let post_id = owned_comment(&mut tx, id, user).await?;

	sqlx::query("SELECT 1 FROM post WHERE id = $1 FOR UPDATE")
		.bind(post_id)
		.execute(&mut *tx)
		.await?;

	let removed = sqlx::query("DELETE FROM comment WHERE id = $1 OR parent_id = $1")
		.bind(id)
		.execute(&mut *tx)
		.await?
		.rows_affected();

	sqlx::query("UPDATE post SET comments_count = GREATEST(comments_count - $2, 0) WHERE id = $1")
		.bind(post_id)
		.bind(i64::try_from(removed).unwrap_or(i64::MAX))
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	tracing::debug!(comment = %id, removed, "deleted comment");

	Ok(())
}
