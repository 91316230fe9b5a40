use aide::axum::IntoApiResponse;
use axum::{
	extract::State,
	http::{header, StatusCode},
	response::IntoResponse,
};
use macros::route;

use crate::{
	extract::{Json, MaybeSession, Path, Query, Session},
	openapi::tag,
	route::{
		comment,
		model::{IdInput, LimitInput, Page, Paginate},
		post,
	},
	session, Database,
};

use super::{model, service, Error, RouteError};

const SUGGESTED_LIMIT: i64 = 5;

async fn require_user(database: &Database, id: uuid::Uuid) -> Result<model::User, RouteError> {
	let user = sqlx::query_as::<_, model::User>(r#"SELECT * FROM "user" WHERE id = $1"#)
		.bind(id)
		.fetch_optional(database)
		.await?;

	user.ok_or_else(|| Error::UnknownUser(id).into())
}

/// Get own account
/// Returns the authenticated user, including private fields such as the email.
#[route(tag = tag::USER)]
pub async fn get_me(session: Session) -> Json<model::UserResponse> {
	Json(model::UserResponse { user: session.user })
}

/// Get suggested users
/// Returns the newest accounts, excluding your own.
#[route(tag = tag::USER)]
pub async fn suggested(
	State(database): State<Database>,
	session: MaybeSession,
	Query(input): Query<LimitInput>,
) -> Result<Json<model::UsersResponse>, RouteError> {
	let users =
		service::suggested(&database, session.user_id(), input.limit_or(SUGGESTED_LIMIT)).await?;

	Ok(Json(model::UsersResponse { users }))
}

/// Get user by username
/// Returns the public profile of a user.
#[route(tag = tag::USER)]
pub async fn get_by_username(
	State(database): State<Database>,
	Path(model::UsernameInput { username }): Path<model::UsernameInput>,
) -> Result<Json<model::ProfileResponse>, RouteError> {
	let user = sqlx::query_as::<_, model::User>(r#"SELECT * FROM "user" WHERE username = $1"#)
		.bind(username.to_lowercase())
		.fetch_optional(&database)
		.await?;

	let user = user.ok_or(Error::UnknownUsername(username))?;

	Ok(Json(model::ProfileResponse { user: user.into() }))
}

/// Get user
/// Returns the public profile of a user.
#[route(tag = tag::USER)]
pub async fn get_user(
	State(database): State<Database>,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::ProfileResponse>, RouteError> {
	let user = require_user(&database, id).await?;

	Ok(Json(model::ProfileResponse { user: user.into() }))
}

/// Update profile
/// Updates your profile. Absent fields are left unchanged.
#[route(tag = tag::USER)]
pub async fn update_user(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::UpdateProfileInput>,
) -> Result<Json<model::UserResponse>, RouteError> {
	if session.user.id != id {
		return Err(Error::NotOwner.into());
	}

	let user = sqlx::query_as::<_, model::User>(
		r#"
			UPDATE "user"
			SET
				name = COALESCE($2, name),
				bio = COALESCE($3, bio),
				headline = COALESCE($4, headline),
				avatar = COALESCE($5, avatar),
				website = COALESCE($6, website),
				twitter = COALESCE($7, twitter),
				github = COALESCE($8, github),
				linkedin = COALESCE($9, linkedin),
				updated_at = now()
			WHERE id = $1
			RETURNING *
		"#,
	)
	.bind(id)
	.bind(input.name.as_deref().map(str::trim))
	.bind(input.bio)
	.bind(input.headline)
	.bind(input.avatar)
	.bind(input.website)
	.bind(input.twitter)
	.bind(input.github)
	.bind(input.linkedin)
	.fetch_one(&database)
	.await?;

	Ok(Json(model::UserResponse { user }))
}

/// Delete account
/// Deletes your account and everything you created. This action is irreversible.
#[route(tag = tag::USER, response(status = 204, description = "Deleted successfully."))]
pub async fn delete_user(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	if session.user.id != id {
		return Err(Error::NotOwner.into());
	}

	service::delete_account(&database, id).await?;

	tracing::info!(user = %id, "deleted account");

	// Clear the session cookie
	Ok((
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		StatusCode::NO_CONTENT,
	)
		.into_response())
}

/// Get user stats
/// Returns post, follower and like totals for a user.
#[route(tag = tag::USER)]
pub async fn get_stats(
	State(database): State<Database>,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::Stats>, RouteError> {
	let stats = service::stats(&database, id).await?;

	Ok(Json(stats.ok_or(Error::UnknownUser(id))?))
}

/// Get followers
/// Returns a paginated list of the users following a user, most recent first.
#[route(tag = tag::USER)]
pub async fn get_followers(
	State(database): State<Database>,
	Path(IdInput { id }): Path<IdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<model::UserSummary>>, RouteError> {
	require_user(&database, id).await?;

	let users = service::list_users(&database, service::Relation::Followers(id), &paginate).await?;

	Ok(Json(users))
}

/// Get following
/// Returns a paginated list of the users a user follows, most recent first.
#[route(tag = tag::USER)]
pub async fn get_following(
	State(database): State<Database>,
	Path(IdInput { id }): Path<IdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<model::UserSummary>>, RouteError> {
	require_user(&database, id).await?;

	let users = service::list_users(&database, service::Relation::Following(id), &paginate).await?;

	Ok(Json(users))
}

/// Toggle follow
/// Follows the user, or unfollows them if you already do.
#[route(tag = tag::USER)]
pub async fn toggle_follow(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::FollowState>, RouteError> {
	let state = service::toggle_follow(&database, session.user.id, id).await?;

	Ok(Json(state))
}

/// Get follow status
/// Returns whether you follow the user.
#[route(tag = tag::USER)]
pub async fn follow_status(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::FollowStatus>, RouteError> {
	let is_following = service::is_following(&database, session.user.id, id).await?;

	Ok(Json(model::FollowStatus { is_following }))
}

/// Get user posts
/// Returns a paginated list of a user's posts, newest first. Drafts are
/// included only when you are the user.
#[route(tag = tag::USER)]
pub async fn get_posts(
	State(database): State<Database>,
	session: MaybeSession,
	Path(IdInput { id }): Path<IdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<post::model::Post>>, RouteError> {
	let filters = post::model::PostFilters {
		author_id: Some(id),
		drafts: post::model::Drafts::VisibleTo(session.user_id()),
		..post::model::PostFilters::default()
	};

	let posts =
		post::service::list_posts(&database, &filters, post::model::PostOrder::Latest, &paginate)
			.await?;

	Ok(Json(posts))
}

/// Get liked posts
/// Returns a paginated list of the published posts a user likes, newest first.
#[route(tag = tag::USER)]
pub async fn get_likes(
	State(database): State<Database>,
	Path(IdInput { id }): Path<IdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<post::model::Post>>, RouteError> {
	let filters = post::model::PostFilters {
		liked_by: Some(id),
		..post::model::PostFilters::published()
	};

	let posts =
		post::service::list_posts(&database, &filters, post::model::PostOrder::Latest, &paginate)
			.await?;

	Ok(Json(posts))
}

/// Get user comments
/// Returns a paginated list of the comments a user wrote, newest first.
#[route(tag = tag::USER)]
pub async fn get_comments(
	State(database): State<Database>,
	session: MaybeSession,
	Path(IdInput { id }): Path<IdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<comment::model::Comment>>, RouteError> {
	let comments =
		comment::service::list_for_user(&database, id, session.user_id(), &paginate).await?;

	Ok(Json(comments))
}
