use aide::axum::IntoApiResponse;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use macros::route;

use crate::{
	extract::{Json, MaybeSession, Path, Query, Session},
	openapi::tag,
	route::{
		model::{IdInput, Page},
		post,
	},
	Database,
};

use super::{model, service, Error, RouteError};

/// List comments
/// Returns a paginated list of the comments on a post, newest first.
/// Pass `parentId` to list the replies to a comment instead.
#[route(tag = tag::COMMENT)]
pub async fn list_comments(
	State(database): State<Database>,
	session: MaybeSession,
	Query(input): Query<model::ListCommentsInput>,
) -> Result<Json<Page<model::Comment>>, RouteError> {
	let post = post::service::get_post(
		&database,
		post::service::PostKey::Id(input.post_id),
		session.user_id(),
	)
	.await?;

	if post.is_none() {
		return Err(Error::UnknownPost(input.post_id).into());
	}

	let comments =
		service::list_for_post(&database, input.post_id, input.parent_id, &input.paginate).await?;

	Ok(Json(comments))
}

/// Create comment
/// Comments on a post, or replies to a top-level comment.
#[route(tag = tag::COMMENT, response(status = 201, shape = "Json<model::CommentResponse>"))]
pub async fn create_comment(
	State(database): State<Database>,
	session: Session,
	Json(input): Json<model::CreateCommentInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let comment = service::create_comment(&database, session.user.id, input).await?;

	Ok((StatusCode::CREATED, Json(model::CommentResponse { comment })).into_response())
}

/// Get comment
/// Returns a single comment by its unique id.
#[route(tag = tag::COMMENT)]
pub async fn get_comment(
	State(database): State<Database>,
	session: MaybeSession,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<Json<model::CommentResponse>, RouteError> {
	let comment = service::get_comment(&database, id, session.user_id()).await?;
	let comment = comment.ok_or(Error::UnknownComment(id))?;

	Ok(Json(model::CommentResponse { comment }))
}

/// Update comment
/// Changes the content of a comment. Only the author may do this.
#[route(tag = tag::COMMENT)]
pub async fn update_comment(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
	Json(input): Json<model::UpdateCommentInput>,
) -> Result<Json<model::CommentResponse>, RouteError> {
	let comment = service::update_comment(&database, id, session.user.id, &input.content).await?;

	Ok(Json(model::CommentResponse { comment }))
}

/// Delete comment
/// Deletes a comment and its replies. Only the author may do this.
#[route(tag = tag::COMMENT, response(status = 204, description = "Deleted successfully."))]
pub async fn delete_comment(
	State(database): State<Database>,
	session: Session,
	Path(IdInput { id }): Path<IdInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	service::delete_comment(&database, id, session.user.id).await?;

	Ok(StatusCode::NO_CONTENT.into_response())
}
