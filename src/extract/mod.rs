//! Extractors that run [`validator`] rules on their input before a handler sees it.
//!
//! Each one wraps the matching axum extractor, so malformed input and failed
//! validation both surface as an [`AppError`] with a 400 status.

mod session;

pub use session::{MaybeSession, Session};

use aide::OperationIo;
use axum::{
	body::Body,
	extract::{FromRequest, FromRequestParts, Request},
	http::{request, Response},
	response::IntoResponse,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::AppError;

fn validated<T: Validate>(input: T) -> Result<T, AppError> {
	input.validate()?;

	Ok(input)
}

/// A validated JSON body, also used as the JSON response type of every route.
///
/// ```rust
/// async fn create_post(Json(input): Json<model::CreatePostInput>) {
///   // `input.title` is already known to be 1 to 200 characters
/// }
/// ```
#[derive(OperationIo)]
#[aide(input_with = "axum::Json<T>", output_with = "axum::Json<T>", json_schema)]
pub struct Json<T>(pub T);

impl<T: serde::Serialize> IntoResponse for Json<T> {
	fn into_response(self) -> Response<Body> {
		axum::Json(self.0).into_response()
	}
}

#[axum::async_trait]
impl<T, S> FromRequest<S> for Json<T>
where
	T: DeserializeOwned + Validate,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
		let axum::Json(input) = axum::Json::<T>::from_request(req, state).await?;

		validated(input).map(Self)
	}
}

/// A validated query string, such as the filters and [`Paginate`] of a listing.
///
/// [`Paginate`]: crate::route::model::Paginate
#[derive(OperationIo)]
#[aide(
	input_with = "axum::extract::Query<T>",
	output_with = "axum::Json<T>",
	json_schema
)]
pub struct Query<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Query<T>
where
	T: DeserializeOwned + Validate,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let axum::extract::Query(input) =
			axum::extract::Query::<T>::from_request_parts(parts, state).await?;

		validated(input).map(Self)
	}
}

/// Validated path parameters, like the `:id` of `/posts/:id` or the
/// `:slug` of `/tags/:slug`.
#[derive(OperationIo)]
#[aide(
	input_with = "axum::extract::Path<T>",
	output_with = "axum::Json<T>",
	json_schema
)]
pub struct Path<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
	T: DeserializeOwned + Validate + Send,
	S: Send + Sync,
{
	type Rejection = AppError;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let axum::extract::Path(input) =
			axum::extract::Path::<T>::from_request_parts(parts, state).await?;

		validated(input).map(Self)
	}
}

#[cfg(test)]
mod test {
	use axum::{
		extract::{FromRequest, FromRequestParts},
		http::{Request, StatusCode},
	};

	use super::{Json, Query};
	use crate::route::{comment::model::UpdateCommentInput, post::model::ListPostsInput};

	#[tokio::test]
	async fn test_query_runs_validation() {
		let tag = "a".repeat(65);
		let (mut parts, _) = Request::get(format!("/posts?tag={tag}"))
			.body(())
			.unwrap()
			.into_parts();

		let error = Query::<ListPostsInput>::from_request_parts(&mut parts, &())
			.await
			.err()
			.unwrap();

		assert_eq!(error.status(), StatusCode::BAD_REQUEST);

		let (mut parts, _) = Request::get("/posts?tag=rust").body(()).unwrap().into_parts();
		let Query(input) = Query::<ListPostsInput>::from_request_parts(&mut parts, &())
			.await
			.unwrap();

		assert_eq!(input.tag.as_deref(), Some("rust"));
	}

	#[tokio::test]
	async fn test_json_runs_validation() {
		let request = |body: &'static str| {
			Request::post("/comments/1")
				.header("content-type", "application/json")
				.body(axum::body::Body::from(body))
				.unwrap()
		};

		let error = Json::<UpdateCommentInput>::from_request(request(r#"{"content":"no"}"#), &())
			.await
			.err()
			.unwrap();

		assert_eq!(error.status(), StatusCode::BAD_REQUEST);

		let error = Json::<UpdateCommentInput>::from_request(request("{"), &())
			.await
			.err()
			.unwrap();

		assert_eq!(error.status(), StatusCode::BAD_REQUEST);

		let Json(input) =
			Json::<UpdateCommentInput>::from_request(request(r#"{"content":"Nice"}"#), &())
				.await
				.unwrap();

		assert_eq!(input.content, "Nice");
	}
}
