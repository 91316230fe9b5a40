use std::fmt::Display;

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection,
	http::{Response, StatusCode},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::Serialize;

pub type Map = serde_json::Map<String, serde_json::Value>;

const INTERNAL_SERVER_ERROR: &str = "internal server error";

/// A single machine-readable error, optionally tied to an input field.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message {
	/// A short error code, such as `unknown_post` or `length`.
	pub content: String,
	/// The input field that caused the error, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<String>,
	/// Additional context for the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Map>,
}

impl Message {
	pub fn new(content: impl Into<String>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	pub fn field(mut self, field: impl Into<String>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(Map::new)
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorResponse {
	/// A human-readable description of the error.
	pub error: String,
	/// Structured errors, present for validation failures and unknown resources.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub details: Vec<Message>,
}

/// Describes how a route-specific error is presented to the client.
///
/// The [`Display`] implementation of the error is sent to the client unless
/// the status is a server error, so it must not contain sensitive information.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;

	fn errors(&self) -> Vec<Message> {
		Vec::new()
	}
}

/// Errors shared by every route.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] rejection::JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] rejection::QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] rejection::PathRejection),
	#[error("too many requests")]
	RateLimited,
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
}

impl AppError {
	pub fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Json(..) | Self::Query(..) | Self::Path(..) => {
				StatusCode::BAD_REQUEST
			}
			Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
			Self::Database(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	/// The message presented to the client.
	pub fn message(&self) -> String {
		match self {
			Self::Validation(..) => "validation failed".into(),
			Self::Json(rejection) => rejection.body_text(),
			Self::Query(rejection) => rejection.body_text(),
			Self::Path(rejection) => rejection.body_text(),
			Self::RateLimited => self.to_string(),
			Self::Database(..) => INTERNAL_SERVER_ERROR.into(),
		}
	}

	pub fn errors(&self) -> Vec<Message> {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					errors.iter().map(move |error| {
						let message = Message::new(error.code.to_string()).field(field.to_string());

						match &error.message {
							Some(text) => message.detail("message", text.to_string()),
							None => message,
						}
					})
				})
				.collect(),
			_ => Vec::new(),
		}
	}
}

impl From<tower_governor::GovernorError> for AppError {
	fn from(_: tower_governor::GovernorError) -> Self {
		Self::RateLimited
	}
}

/// An error returned from a route, either specific to the route's module
/// or one of the shared [`AppError`]s.
#[derive(Debug, thiserror::Error)]
pub enum RouteError<T: ErrorShape> {
	#[error(transparent)]
	Route(T),
	#[error(transparent)]
	App(#[from] AppError),
}

impl<T: ErrorShape> From<T> for RouteError<T> {
	fn from(error: T) -> Self {
		Self::Route(error)
	}
}

impl<T: ErrorShape> From<sqlx::Error> for RouteError<T> {
	fn from(error: sqlx::Error) -> Self {
		Self::App(AppError::Database(error))
	}
}

fn respond(
	status: StatusCode,
	error: String,
	details: Vec<Message>,
	internal: &dyn Display,
) -> Response<Body> {
	let error = if status.is_server_error() {
		tracing::error!(error = %internal, "request failed");
		INTERNAL_SERVER_ERROR.into()
	} else {
		tracing::debug!(error = %internal, %status, "request rejected");
		error
	};

	(status, axum::Json(ErrorResponse { error, details })).into_response()
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		respond(self.status(), self.message(), self.errors(), &self)
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::Route(error) => respond(error.status(), error.to_string(), error.errors(), &error),
			Self::App(error) => error.into_response(),
		}
	}
}

impl OperationOutput for AppError {
	type Inner = ErrorResponse;
}

impl<T: ErrorShape> OperationOutput for RouteError<T> {
	type Inner = ErrorResponse;
}

#[cfg(test)]
mod test {
	use axum::{http::StatusCode, response::IntoResponse};
	use validator::Validate;

	use super::{AppError, ErrorShape, Message, RouteError};

	#[derive(Debug, thiserror::Error)]
	enum Error {
		#[error("thing not found")]
		Unknown,
		#[error("disk on fire")]
		Broken,
	}

	impl ErrorShape for Error {
		fn status(&self) -> StatusCode {
			match self {
				Self::Unknown => StatusCode::NOT_FOUND,
				Self::Broken => StatusCode::INTERNAL_SERVER_ERROR,
			}
		}

		fn errors(&self) -> Vec<Message> {
			Message::new("unknown_thing").detail("thing", "abc").into_vec()
		}
	}

	#[derive(Validate)]
	struct Input {
		#[validate(length(min = 3))]
		title: String,
	}

	#[test]
	fn test_route_error_status() {
		let response = RouteError::from(Error::Unknown).into_response();

		assert_eq!(response.status(), StatusCode::NOT_FOUND);

		let response = RouteError::from(Error::Broken).into_response();

		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}

	#[test]
	fn test_database_error_is_internal() {
		let error = AppError::Database(sqlx::Error::RowNotFound);

		assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
		assert_eq!(error.message(), "internal server error");
	}

	#[test]
	fn test_validation_errors_name_fields() {
		let errors = Input { title: "no".into() }.validate().unwrap_err();
		let error = AppError::from(errors);

		assert_eq!(error.status(), StatusCode::BAD_REQUEST);

		let messages = error.errors();

		assert_eq!(messages.len(), 1);
		assert_eq!(messages[0].content, "length");
		assert_eq!(messages[0].field.as_deref(), Some("title"));
	}

	#[test]
	fn test_message_details() {
		let message = Message::new("unknown_post").detail("post", "1234");

		assert_eq!(
			message.details.unwrap().get("post"),
			Some(&serde_json::json!("1234"))
		);
	}
}
