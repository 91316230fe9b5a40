use aide::axum::IntoApiResponse;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use macros::route;

use crate::{
	extract::{Json, MaybeSession, Path, Query, Session},
	openapi::tag,
	route::{
		model::{IdInput, Page, Paginate, SlugInput},
		user,
	},
	Database,
};

use super::{model, service, Error, RouteError};

/// List posts
/// Returns a paginated list of posts, newest first, filtered by author, tag,
/// publication state or a search term.
/// Drafts are only listed for their author, so `published=false` lists
/// nothing for anyone else.
#[route(tag = tag::POST)]
pub async fn list_posts(
	State(database): State<Database>,
	session: MaybeSession,
	Query(input): Query<model::ListPostsInput>,
) -> Result<Json<Page<model::Post>>, RouteError> {
	let filters = model::PostFilters {
		drafts: model::Drafts::VisibleTo(session.user_id()),
		..input.filters()
	};

	let posts = service::list_posts(
		&database,
		&filters,
		model::PostOrder::Latest,
		&input.paginate,
	)
	.await?;

	Ok(Json(posts))
}

/// Get feed
/// Returns one of the feeds of published posts: `latest` (newest first),
/// `following` (posts by followed authors) or `recommended` (most liked and commented).
#[route(tag = tag::POST)]
pub async fn get_feed(
	State(database): State<Database>,
	session: MaybeSession,
	Path(model::FeedInput { kind }): Path<model::FeedInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<model::Post>>, RouteError> {
	let posts = service::get_feed(&database, kind, session.user_id(), &paginate).await?;

	Ok(Json(posts))
}

/// Create post
/// Creates a new post. The slug, excerpt and reading time are derived from
/// the title and content.
#[route(tag = tag::POST, response(status = 201, shape = "Json<model::PostResponse>"))]
pub async fn create_post(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::CreatePostInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let post = service::create_post(&database, session.user.id, input).await?;

	Ok((StatusCode::CREATED, Json(model::PostResponse { post })).into_response())
}

/// Get post
/// Returns a single post by its unique id.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(database): State<Database>,
	session: MaybeSession,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::PostResponse>, RouteError> {
	let post = service::get_post(&database, service::PostKey::Id(id), session.user_id()).await?;
	let post = post.ok_or(Error::UnknownPost(id))?;

	Ok(Json(model::PostResponse { post }))
}

/// Get post by slug
/// Returns a single post by its slug.
#[route(tag = tag::POST)]
pub async fn get_post_by_slug(
	State(database): State<Database>,
	session: MaybeSession,
	Path(SlugInput { slug }): Path<SlugInput>,
) -> Result<Json<model::PostResponse>, RouteError> {
	let post = service::get_post(&database, service::PostKey::Slug(&slug), session.user_id()).await?;
	let post = post.ok_or(Error::UnknownSlug(slug))?;

	Ok(Json(model::PostResponse { post }))
}

/// Update post
/// Updates an existing post by its unique id. Only the author may do this.
#[route(tag = tag::POST)]
pub async fn update_post(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::UpdatePostInput>,
) -> Result<Json<model::PostResponse>, RouteError> {
	let post = service::update_post(&database, id, session.user.id, input).await?;

	Ok(Json(model::PostResponse { post }))
}

/// Delete post
/// Deletes an existing post by its unique id, along with its comments and likes.
#[route(tag = tag::POST, response(status = 204, description = "Deleted successfully."))]
pub async fn delete_post(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	service::delete_post(&database, id, session.user.id).await?;

	Ok(StatusCode::NO_CONTENT.into_response())
}

/// Publish post
/// Publishes or unpublishes a post. Only the author may do this.
#[route(tag = tag::POST)]
pub async fn publish_post(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::PublishInput>,
) -> Result<Json<model::PostResponse>, RouteError> {
	let post = service::set_published(&database, id, session.user.id, input.published).await?;

	Ok(Json(model::PostResponse { post }))
}

/// Toggle like
/// Likes the post, or removes the like if it already exists.
#[route(tag = tag::POST)]
pub async fn toggle_like(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::LikeState>, RouteError> {
	let state = service::toggle_like(&database, id, session.user.id).await?;

	Ok(Json(state))
}

/// Get like status
/// Returns whether you like the post, and its number of likes.
#[route(tag = tag::POST)]
pub async fn like_status(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::LikeState>, RouteError> {
	let state = service::like_state(&database, id, session.user.id).await?;

	Ok(Json(state.ok_or(Error::UnknownPost(id))?))
}

/// Get likes
/// Returns a paginated list of the users that like the post, most recent first.
#[route(tag = tag::POST)]
pub async fn get_likes(
	State(database): State<Database>,
	session: MaybeSession,
	Path(IdInput { id }): Path<IdInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<user::model::UserSummary>>, RouteError> {
	let post = service::get_post(&database, service::PostKey::Id(id), session.user_id()).await?;

	if post.is_none() {
		return Err(Error::UnknownPost(id).into());
	}

	let users =
		user::service::list_users(&database, user::service::Relation::Likers(id), &paginate)
			.await?;

	Ok(Json(users))
}
