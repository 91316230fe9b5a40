use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
	route::model::{Page, Paginate},
	text, Database,
};

use super::{model, Error, RouteError};

const SELECT_SUMMARY: &str = r#"
	SELECT u.id, u.name, u.username, u.avatar, u.bio, u.headline, u.followers_count
	FROM "user" u
"#;

const USERNAME_BASE_LENGTH: usize = 28;
const MIN_USERNAME_LENGTH: usize = 3;

/// The username a new account gets when it does not choose one.
///
/// Uses the slugified name, falling back to the local part of the email
/// when the name has too few usable characters.
pub fn username_base(name: &str, email: &str) -> String {
	let mut base = text::slugify(name);

	if base.len() < MIN_USERNAME_LENGTH {
		base = text::slugify(email.split('@').next().unwrap_or_default());
	}

	if base.len() < MIN_USERNAME_LENGTH {
		base = "user".into();
	}

	base.truncate(USERNAME_BASE_LENGTH);
	base.trim_end_matches('-').to_string()
}

/// Finds the first free username among `base`, `base-1`, `base-2`, ...
pub async fn available_username(conn: &mut PgConnection, base: &str) -> Result<String, sqlx::Error> {
	let mut attempt = 0;

	loop {
		let candidate = text::slug_candidate(base, attempt);
		let taken = sqlx::query_scalar::<_, bool>(
			r#"SELECT EXISTS (SELECT 1 FROM "user" WHERE username = $1)"#,
		)
		.bind(&candidate)
		.fetch_one(&mut *conn)
		.await?;

		if !taken {
			return Ok(candidate);
		}

		attempt += 1;
	}
}

/// A list of users defined by their relation to a user or post.
#[derive(Debug, Clone, Copy)]
pub enum Relation {
	/// Users following the user.
	Followers(Uuid),
	/// Users the user follows.
	Following(Uuid),
	/// Users that like the post.
	Likers(Uuid),
}

impl Relation {
	/// The join and filter selecting the related users, with `$1` bound to the id.
	fn sql(self) -> &'static str {
		match self {
			Self::Followers(..) => "JOIN follow r ON r.follower_id = u.id WHERE r.following_id = $1",
			Self::Following(..) => "JOIN follow r ON r.following_id = u.id WHERE r.follower_id = $1",
			Self::Likers(..) => "JOIN post_like r ON r.user_id = u.id WHERE r.post_id = $1",
		}
	}

	fn id(self) -> Uuid {
		match self {
			Self::Followers(id) | Self::Following(id) | Self::Likers(id) => id,
		}
	}
}

/// Lists related users, most recent relation first.
#[tracing::instrument(skip(database))]
pub async fn list_users(
	database: &Database,
	relation: Relation,
	paginate: &Paginate,
) -> Result<Page<model::UserSummary>, sqlx::Error> {
	let users = sqlx::query_as::<_, model::UserSummary>(&format!(
		"{SELECT_SUMMARY} {} ORDER BY r.created_at DESC, u.id LIMIT $2 OFFSET $3",
		relation.sql()
	))
	.bind(relation.id())
	.bind(paginate.limit())
	.bind(paginate.offset())
	.fetch_all(database)
	.await?;

	let total = sqlx::query_scalar::<_, i64>(&format!(
		r#"SELECT COUNT(*) FROM "user" u {}"#,
		relation.sql()
	))
	.bind(relation.id())
	.fetch_one(database)
	.await?;

	Ok(Page::new(users, paginate, total))
}

/// The newest accounts, excluding the viewer.
pub async fn suggested(
	database: &Database,
	viewer: Option<Uuid>,
	limit: i64,
) -> Result<Vec<model::UserSummary>, sqlx::Error> {
	sqlx::query_as::<_, model::UserSummary>(&format!(
		"{SELECT_SUMMARY} WHERE ($1::UUID IS NULL OR u.id <> $1) ORDER BY u.created_at DESC LIMIT $2"
	))
	.bind(viewer)
	.bind(limit)
	.fetch_all(database)
	.await
}

/// Users whose name or username contains `query`, ignoring case.
pub async fn search_users(
	database: &Database,
	query: &str,
	limit: i64,
) -> Result<Vec<model::UserSummary>, sqlx::Error> {
	sqlx::query_as::<_, model::UserSummary>(&format!(
		r#"
			{SELECT_SUMMARY}
			WHERE strpos(lower(u.name), lower($1)) > 0 OR strpos(lower(COALESCE(u.username, '')), lower($1)) > 0
			ORDER BY u.followers_count DESC, u.created_at DESC
			LIMIT $2
		"#
	))
	.bind(query)
	.bind(limit)
	.fetch_all(database)
	.await
}

/// Follows `following` if `follower` does not already, otherwise unfollows.
///
/// Both user rows are locked in id order for the duration of the toggle, so
/// concurrent toggles between the same pair settle one at a time and the
/// stored counters always match the follow rows.
#[tracing::instrument(skip(database))]
pub async fn toggle_follow(
	database: &Database,
	follower: Uuid,
	following: Uuid,
) -> Result<model::FollowState, RouteError> {
	if follower == following {
		return Err(Error::SelfFollow.into());
	}

	let mut tx = database.begin().await?;

	let locked = sqlx::query_scalar::<_, Uuid>(
		r#"SELECT id FROM "user" WHERE id = ANY($1) ORDER BY id FOR UPDATE"#,
	)
	.bind(&[follower, following][..])
	.fetch_all(&mut *tx)
	.await?;

	if !locked.contains(&following) {
		return Err(Error::UnknownUser(following).into());
	}

	let removed = sqlx::query("DELETE FROM follow WHERE follower_id = $1 AND following_id = $2")
		.bind(follower)
		.bind(following)
		.execute(&mut *tx)
		.await?
		.rows_affected();

	let delta: i64 = if removed > 0 {
		-1
	} else {
		let inserted = sqlx::query(
			r#"
				INSERT INTO follow (follower_id, following_id) VALUES ($1, $2)
				ON CONFLICT (follower_id, following_id) DO NOTHING
			"#,
		)
		.bind(follower)
		.bind(following)
		.execute(&mut *tx)
		.await?
		.rows_affected();

		i64::from(inserted > 0)
	};

	let followers_count = sqlx::query_scalar::<_, i64>(
		r#"
			UPDATE "user" SET followers_count = GREATEST(followers_count + $2, 0)
			WHERE id = $1
			RETURNING followers_count
		"#,
	)
	.bind(following)
	.bind(delta)
	.fetch_one(&mut *tx)
	.await?;

	sqlx::query(
		r#"UPDATE "user" SET following_count = GREATEST(following_count + $2, 0) WHERE id = $1"#,
	)
	.bind(follower)
	.bind(delta)
	.execute(&mut *tx)
	.await?;

	tx.commit().await?;

	let is_following = removed == 0;

	tracing::info!(monotonic_counter.follows_toggled = 1_u64, is_following);

	Ok(model::FollowState {
		is_following,
		followers_count,
	})
}

pub async fn is_following(
	database: &Database,
	follower: Uuid,
	following: Uuid,
) -> Result<bool, sqlx::Error> {
	sqlx::query_scalar::<_, bool>(
		"SELECT EXISTS (SELECT 1 FROM follow WHERE follower_id = $1 AND following_id = $2)",
	)
	.bind(follower)
	.bind(following)
	.fetch_one(database)
	.await
}

pub async fn stats(database: &Database, user_id: Uuid) -> Result<Option<model::Stats>, sqlx::Error> {
	sqlx::query_as::<_, model::Stats>(
		r#"
			SELECT
				(SELECT COUNT(*) FROM post WHERE user_id = u.id AND published) AS posts_count,
				(SELECT COUNT(*) FROM post WHERE user_id = u.id AND NOT published) AS drafts_count,
				u.followers_count,
				u.following_count,
				(SELECT COALESCE(SUM(likes_count), 0)::BIGINT FROM post WHERE user_id = u.id) AS total_likes,
				0::BIGINT AS total_views
			FROM "user" u
			WHERE u.id = $1
		"#,
	)
	.bind(user_id)
	.fetch_optional(database)
	.await
}

/// Deletes an account along with everything it owns.
///
/// Rows owned by the user disappear through cascading foreign keys; before
/// that, the counters they contributed to on other users' rows are taken back.
#[tracing::instrument(skip(database))]
pub async fn delete_account(database: &Database, user_id: Uuid) -> Result<bool, sqlx::Error> {
	let mut tx = database.begin().await?;

	sqlx::query(
		r#"
			UPDATE post SET likes_count = GREATEST(likes_count - 1, 0)
			WHERE user_id <> $1 AND id IN (SELECT post_id FROM post_like WHERE user_id = $1)
		"#,
	)
	.bind(user_id)
	.execute(&mut *tx)
	.await?;

	// Replies to the user's comments are removed with them.
	sqlx::query(
		r#"
			UPDATE post p SET comments_count = GREATEST(p.comments_count - c.removed, 0)
			FROM (
				SELECT post_id, COUNT(*) AS removed FROM comment
				WHERE user_id = $1 OR parent_id IN (SELECT id FROM comment WHERE user_id = $1)
				GROUP BY post_id
			) c
			WHERE p.id = c.post_id AND p.user_id <> $1
		"#,
	)
	.bind(user_id)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		r#"
			UPDATE "user" SET followers_count = GREATEST(followers_count - 1, 0)
			WHERE id IN (SELECT following_id FROM follow WHERE follower_id = $1)
		"#,
	)
	.bind(user_id)
	.execute(&mut *tx)
	.await?;

	sqlx::query(
		r#"
			UPDATE "user" SET following_count = GREATEST(following_count - 1, 0)
			WHERE id IN (SELECT follower_id FROM follow WHERE following_id = $1)
		"#,
	)
	.bind(user_id)
	.execute(&mut *tx)
	.await?;

	let deleted = sqlx::query(r#"DELETE FROM "user" WHERE id = $1"#)
		.bind(user_id)
		.execute(&mut *tx)
		.await?
		.rows_affected();

	tx.commit().await?;

	Ok(deleted > 0)
}
