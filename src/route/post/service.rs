//! Queries and mutations over posts and their likes.

use sqlx::{Connection, PgConnection};
use uuid::Uuid;

use crate::{
	route::{
		model::{Page, Paginate},
		tag,
	},
	text, Database,
};

use super::{model, Error, RouteError};

const SELECT_POST: &str = r#"
	SELECT p.*, u.name AS author_name, u.username AS author_username, u.avatar AS author_avatar
	FROM post p
	JOIN "user" u ON u.id = p.user_id
"#;

/// Every parameter is optional; a `NULL` parameter disables its restriction.
const FILTER_POSTS: &str = r#"
	WHERE ($1::UUID IS NULL OR p.user_id = $1)
	AND ($2::BOOLEAN IS NULL OR p.published = $2)
	AND ($3::TEXT IS NULL OR $3 = ANY(p.tags))
	AND ($4::TEXT IS NULL OR strpos(lower(p.title), lower($4)) > 0 OR strpos(lower(p.content), lower($4)) > 0)
	AND ($5::UUID IS NULL OR p.user_id IN (SELECT following_id FROM follow WHERE follower_id = $5))
	AND ($6::UUID IS NULL OR p.id IN (SELECT post_id FROM post_like WHERE user_id = $6))
	AND (NOT $7::BOOLEAN OR p.published OR p.user_id = $8::UUID)
"#;

const SLUG_FALLBACK: &str = "post";

/// Which post a lookup refers to.
#[derive(Debug, Clone, Copy)]
pub enum PostKey<'a> {
	Id(Uuid),
	Slug(&'a str),
}

fn bind_filters<'q, O>(
	query: sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments>,
	filters: &'q model::PostFilters,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, sqlx::postgres::PgArguments> {
	query
		.bind(filters.author_id)
		.bind(filters.published)
		.bind(filters.tag.as_deref())
		.bind(filters.search.as_deref())
		.bind(filters.followed_by)
		.bind(filters.liked_by)
		.bind(matches!(filters.drafts, model::Drafts::VisibleTo(_)))
		.bind(match filters.drafts {
			model::Drafts::VisibleTo(viewer) => viewer,
			model::Drafts::Any => None,
		})
}

/// Lists the posts matching `filters`, along with the total number of matches.
#[tracing::instrument(skip(database))]
pub async fn list_posts(
	database: &Database,
	filters: &model::PostFilters,
	order: model::PostOrder,
	paginate: &Paginate,
) -> Result<Page<model::Post>, sqlx::Error> {
	let sql = format!(
		"{SELECT_POST} {FILTER_POSTS} ORDER BY {} LIMIT $9 OFFSET $10",
		order.sql()
	);

	let rows = bind_filters(sqlx::query_as::<_, model::PostRow>(&sql), filters)
		.bind(paginate.limit())
		.bind(paginate.offset())
		.fetch_all(database)
		.await?;

	let count = format!("SELECT COUNT(*) FROM post p {FILTER_POSTS}");
	let (total,) = bind_filters(sqlx::query_as::<_, (i64,)>(&count), filters)
		.fetch_one(database)
		.await?;

	Ok(Page::new(rows, paginate, total).map(model::Post::from))
}

/// Lists published posts for one of the feeds.
///
/// The following feed is empty for anonymous viewers.
pub async fn get_feed(
	database: &Database,
	kind: model::FeedKind,
	viewer: Option<Uuid>,
	paginate: &Paginate,
) -> Result<Page<model::Post>, sqlx::Error> {
	let (filters, order) = match kind {
		model::FeedKind::Latest => (model::PostFilters::published(), model::PostOrder::Latest),
		model::FeedKind::Recommended => (model::PostFilters::published(), model::PostOrder::Popular),
		model::FeedKind::Following => {
			let Some(viewer) = viewer else {
				return Ok(Page::empty(paginate));
			};

			(
				model::PostFilters {
					followed_by: Some(viewer),
					..model::PostFilters::published()
				},
				model::PostOrder::Latest,
			)
		}
	};

	list_posts(database, &filters, order, paginate).await
}

async fn fetch_post(
	conn: &mut PgConnection,
	key: PostKey<'_>,
) -> Result<Option<model::Post>, sqlx::Error> {
	let row = match key {
		PostKey::Id(id) => {
			sqlx::query_as::<_, model::PostRow>(&format!("{SELECT_POST} WHERE p.id = $1"))
				.bind(id)
				.fetch_optional(&mut *conn)
				.await?
		}
		PostKey::Slug(slug) => {
			sqlx::query_as::<_, model::PostRow>(&format!("{SELECT_POST} WHERE p.slug = $1"))
				.bind(slug.to_lowercase())
				.fetch_optional(&mut *conn)
				.await?
		}
	};

	Ok(row.map(model::Post::from))
}

/// Fetches a post if `viewer` may see it. Drafts are only visible to their author.
pub async fn get_post(
	database: &Database,
	key: PostKey<'_>,
	viewer: Option<Uuid>,
) -> Result<Option<model::Post>, sqlx::Error> {
	let mut conn = database.acquire().await?;
	let post = fetch_post(&mut conn, key).await?;

	Ok(post.filter(|post| post.published || Some(post.author.id) == viewer))
}

/// Locks a post for the rest of the transaction, verifying that `user` owns it.
///
/// Returns the current title of the post.
async fn lock_owned(conn: &mut PgConnection, id: Uuid, user: Uuid) -> Result<String, RouteError> {
	let post = sqlx::query_as::<_, (Uuid, String)>(
		"SELECT user_id, title FROM post WHERE id = $1 FOR UPDATE",
	)
	.bind(id)
	.fetch_optional(&mut *conn)
	.await?;

	match post {
		None => Err(Error::UnknownPost(id).into()),
		Some((owner, _)) if owner != user => Err(Error::NotOwner(id).into()),
		Some((_, title)) => Ok(title),
	}
}

fn slug_base(title: &str) -> String {
	let slug = text::slugify(title);

	if slug.is_empty() {
		SLUG_FALLBACK.into()
	} else {
		slug
	}
}

/// Creates a post, giving it the first free slug derived from its title.
#[tracing::instrument(skip(database, input), fields(title = %input.title))]
pub async fn create_post(
	database: &Database,
	author: Uuid,
	input: model::CreatePostInput,
) -> Result<model::Post, RouteError> {
	let mut tx = database.begin().await?;

	let tags = tag::service::ensure_tags_exist(&mut tx, &input.tags).await?;
	let title = input.title.trim();
	let excerpt = input
		.excerpt
		.filter(|excerpt| !excerpt.trim().is_empty())
		.unwrap_or_else(|| text::excerpt(&input.content));
	let reading_time = text::reading_time(&input.content);
	let base = slug_base(title);

	let mut attempt = 0;
	let id = loop {
		let inserted = sqlx::query_scalar::<_, Uuid>(
			r#"
				INSERT INTO post (user_id, title, content, excerpt, slug, cover_image, published, tags, reading_time)
				VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
				ON CONFLICT (slug) DO NOTHING
				RETURNING id
			"#,
		)
		.bind(author)
		.bind(title)
		.bind(&input.content)
		.bind(&excerpt)
		.bind(text::slug_candidate(&base, attempt))
		.bind(&input.cover_image)
		.bind(input.published)
		.bind(&tags)
		.bind(reading_time)
		.fetch_optional(&mut *tx)
		.await?;

		if let Some(id) = inserted {
			break id;
		}

		attempt += 1;
	};

	let post = fetch_post(&mut tx, PostKey::Id(id))
		.await?
		.ok_or(Error::UnknownPost(id))?;

	tx.commit().await?;

	tracing::info!(monotonic_counter.posts_created = 1_u64, post = %post.id, slug = %post.slug);

	Ok(post)
}

/// Applies a partial update to a post owned by `user`.
///
/// A changed title regenerates the slug, skipping slugs held by other posts.
#[tracing::instrument(skip(database, input))]
pub async fn update_post(
	database: &Database,
	id: Uuid,
	user: Uuid,
	input: model::UpdatePostInput,
) -> Result<model::Post, RouteError> {
	let mut tx = database.begin().await?;

	let previous_title = lock_owned(&mut tx, id, user).await?;

	let tags = match &input.tags {
		Some(tags) => Some(tag::service::ensure_tags_exist(&mut tx, tags).await?),
		None => None,
	};

	let excerpt = input
		.excerpt
		.filter(|excerpt| !excerpt.trim().is_empty())
		.or_else(|| input.content.as_deref().map(text::excerpt));
	let reading_time = input.content.as_deref().map(text::reading_time);
	let title = input.title.as_deref().map(str::trim);

	sqlx::query(
		r#"
			UPDATE post
			SET
				title = COALESCE($2, title),
				content = COALESCE($3, content),
				excerpt = COALESCE($4, excerpt),
				cover_image = COALESCE($5, cover_image),
				tags = COALESCE($6, tags),
				published = COALESCE($7, published),
				reading_time = COALESCE($8, reading_time),
				updated_at = now()
			WHERE id = $1
		"#,
	)
	.bind(id)
	.bind(title)
	.bind(&input.content)
	.bind(&excerpt)
	.bind(&input.cover_image)
	.bind(&tags)
	.bind(input.published)
	.bind(reading_time)
	.execute(&mut *tx)
	.await?;

	if let Some(title) = title.filter(|title| *title != previous_title) {
		assign_slug(&mut tx, id, &slug_base(title)).await?;
	}

	let post = fetch_post(&mut tx, PostKey::Id(id))
		.await?
		.ok_or(Error::UnknownPost(id))?;

	tx.commit().await?;

	Ok(post)
}

/// Gives a post the first slug derived from `base` that no other post holds.
///
/// Each attempt runs in a savepoint, so a slug claimed by a concurrent
/// transaction after the `NOT EXISTS` check moves on to the next candidate
/// instead of aborting the whole update.
async fn assign_slug(conn: &mut PgConnection, id: Uuid, base: &str) -> Result<String, sqlx::Error> {
	let mut attempt = 0;

	loop {
		let slug = text::slug_candidate(base, attempt);
		let mut savepoint = conn.begin().await?;
		let updated = sqlx::query(
			r#"
				UPDATE post SET slug = $2
				WHERE id = $1 AND NOT EXISTS (SELECT 1 FROM post WHERE slug = $2 AND id <> $1)
			"#,
		)
		.bind(id)
		.bind(&slug)
		.execute(&mut *savepoint)
		.await;

		match updated {
			Ok(result) if result.rows_affected() > 0 => {
				savepoint.commit().await?;

				return Ok(slug);
			}
			Ok(_) => savepoint.rollback().await?,
			Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
				tracing::debug!(%slug, "slug taken concurrently");
				savepoint.rollback().await?;
			}
			Err(error) => return Err(error),
		}

		attempt += 1;
	}
}

pub async fn set_published(
	database: &Database,
	id: Uuid,
	user: Uuid,
	published: bool,
) -> Result<model::Post, RouteError> {
	let mut tx = database.begin().await?;

	lock_owned(&mut tx, id, user).await?;

	sqlx::query("UPDATE post SET published = $2, updated_at = now() WHERE id = $1")
		.bind(id)
		.bind(published)
		.execute(&mut *tx)
		.await?;

	let post = fetch_post(&mut tx, PostKey::Id(id))
		.await?
		.ok_or(Error::UnknownPost(id))?;

	tx.commit().await?;

	Ok(post)
}

/// Deletes a post owned by `user`, along with its comments and likes.
#[tracing::instrument(skip(database))]
pub async fn delete_post(database: &Database, id: Uuid, user: Uuid) -> Result<(), RouteError> {
	let mut tx = database.begin().await?;

	lock_owned(&mut tx, id, user).await?;

	sqlx::query("DELETE FROM post WHERE id = $1")
		.bind(id)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(())
}

/// Likes the post if `user` has not yet, otherwise removes the like.
///
/// The post row stays locked until the like row and the counter are both
/// written, so concurrent toggles by the same user apply one after another
/// and `likes_count` always equals the number of like rows.
#[tracing::instrument(skip(database))]
pub async fn toggle_like(
	database: &Database,
	id: Uuid,
	user: Uuid,
) -> Result<model::LikeState, RouteError> {
	let mut tx = database.begin().await?;

	let post = sqlx::query_as::<_, (Uuid, bool)>(
		"SELECT user_id, published FROM post WHERE id = $1 FOR UPDATE",
	)
	.bind(id)
	.fetch_optional(&mut *tx)
	.await?;

	match post {
		Some((author, published)) if published || author == user => {}
		_ => return Err(Error::UnknownPost(id).into()),
	}

	let removed = sqlx::query("DELETE FROM post_like WHERE user_id = $1 AND post_id = $2")
		.bind(user)
		.bind(id)
		.execute(&mut *tx)
		.await?
		.rows_affected();

	let delta: i64 = if removed > 0 {
		-1
	} else {
		let inserted = sqlx::query(
			r#"
				INSERT INTO post_like (user_id, post_id) VALUES ($1, $2)
				ON CONFLICT (user_id, post_id) DO NOTHING
			"#,
		)
		.bind(user)
		.bind(id)
		.execute(&mut *tx)
		.await?
		.rows_affected();

		i64::from(inserted > 0)
	};

	let likes_count = sqlx::query_scalar::<_, i64>(
		r#"
			UPDATE post SET likes_count = GREATEST(likes_count + $2, 0)
			WHERE id = $1
			RETURNING likes_count
		"#,
	)
	.bind(id)
	.bind(delta)
	.fetch_one(&mut *tx)
	.await?;

	tx.commit().await?;

	let is_liked = removed == 0;

	tracing::info!(monotonic_counter.likes_toggled = 1_u64, is_liked);

	Ok(model::LikeState {
		is_liked,
		likes_count,
	})
}

pub async fn like_state(
	database: &Database,
	id: Uuid,
	user: Uuid,
) -> Result<Option<model::LikeState>, sqlx::Error> {
	sqlx::query_as::<_, model::LikeState>(
		r#"
			SELECT
				EXISTS (SELECT 1 FROM post_like WHERE post_id = p.id AND user_id = $2) AS is_liked,
				p.likes_count
			FROM post p
			WHERE p.id = $1 AND (p.published OR p.user_id = $2)
		"#,
	)
	.bind(id)
	.bind(user)
	.fetch_optional(database)
	.await
}

#[cfg(test)]
mod test {
	use super::slug_base;

	#[test]
	fn test_slug_base() {
		assert_eq!(slug_base("Hello World"), "hello-world");
		assert_eq!(slug_base("???"), "post");
	}
}
