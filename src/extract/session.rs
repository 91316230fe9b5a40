use std::str::FromStr;

use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};
use uuid::Uuid;

use crate::{
	error::RouteError,
	openapi::{SECURITY_SCHEME_BEARER, SECURITY_SCHEME_SESSION},
	route::{auth, user},
	session, Database,
};

pub const AUTHORIZATION_PREFIX: &str = "Bearer ";

/// Reads the session id from the `Authorization` header, falling back
/// to the session cookie.
///
/// Returns `Ok(None)` when the request carries neither.
fn session_token(parts: &request::Parts) -> Result<Option<Uuid>, auth::Error> {
	if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
		let slice = value.to_str().map_err(|_| auth::Error::InvalidSession)?;
		let token = slice
			.strip_prefix(AUTHORIZATION_PREFIX)
			.ok_or(auth::Error::InvalidSession)?;

		return Uuid::from_str(token.trim())
			.map(Some)
			.map_err(|_| auth::Error::InvalidSession);
	}

	let cookie = parts
		.headers
		.get_all(header::COOKIE)
		.into_iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(cookie::Cookie::split_parse)
		.filter_map(Result::ok)
		.find(|cookie| cookie.name() == session::COOKIE_NAME);

	match cookie {
		Some(cookie) => Uuid::parse_str(cookie.value())
			.map(Some)
			.map_err(|_| auth::Error::InvalidSession),
		None => Ok(None),
	}
}

/// Extracts the session and related user from the request.
///
/// If it does not exist, a [`auth::Error::NoSession`] is returned.
/// If the session is unknown, a [`auth::Error::InvalidSession`] is returned.
///
/// ```rust
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub id: Uuid,
	pub user: user::model::User,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let session_id = session_token(parts)?.ok_or(auth::Error::NoSession)?;

		let database = Database::from_ref(state);
		let user = sqlx::query_as::<_, user::model::User>(
			r#"
				SELECT * FROM "user" WHERE id = (
					SELECT user_id FROM session WHERE id = $1
				)
			"#,
		)
		.bind(session_id)
		.fetch_optional(&database)
		.await?;

		let user = user.ok_or(auth::Error::InvalidSession)?;

		Ok(Session {
			id: session_id,
			user,
		})
	}
}

impl OperationInput for Session {
	/// Operation input for the session extractor.
	///
	/// This adds a session requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.extend([
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
			[(SECURITY_SCHEME_BEARER.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		]);
	}
}

/// A session that may be absent.
///
/// Used by routes that are public but tailor their response to the viewer,
/// such as the following feed or draft visibility. Missing or stale
/// credentials yield `None`; database failures are still returned.
#[derive(Debug)]
pub struct MaybeSession(pub Option<Session>);

impl MaybeSession {
	pub fn user_id(&self) -> Option<Uuid> {
		self.0.as_ref().map(|session| session.user.id)
	}
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for MaybeSession
where
	Database: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<auth::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		match Session::from_request_parts(parts, state).await {
			Ok(session) => Ok(Self(Some(session))),
			Err(RouteError::Route(_)) => Ok(Self(None)),
			Err(error) => Err(error),
		}
	}
}

impl OperationInput for MaybeSession {}
