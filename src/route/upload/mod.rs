use aide::axum::ApiRouter;
use axum::{
	extract::{
		multipart::{MultipartError, MultipartRejection},
		DefaultBodyLimit,
	},
	http::StatusCode,
	routing::post,
};

use crate::{error, storage, AppState};

pub mod model;
pub mod route;

pub const FILE_FIELD: &str = "file";
pub const FOLDER_FIELD: &str = "folder";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("no file was uploaded")]
	MissingFile,
	#[error("{}", .0.body_text())]
	Form(MultipartRejection),
	#[error("{}", .0.body_text())]
	Multipart(MultipartError),
	#[error("{0}")]
	Storage(storage::Error),
}

pub type RouteError = error::RouteError<Error>;

/// Multipart bodies have no OpenAPI input shape, so the upload route is not
/// part of the generated documentation.
pub fn routes(max_bytes: usize) -> ApiRouter<AppState> {
	ApiRouter::new().route(
		"/",
		post(route::upload).layer(DefaultBodyLimit::max(max_bytes)),
	)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::MissingFile => StatusCode::BAD_REQUEST,
			Self::Form(rejection) => rejection.status(),
			Self::Multipart(error) => error.status(),
			Self::Storage(storage::Error::NotAnImage | storage::Error::Decode(..)) => {
				StatusCode::BAD_REQUEST
			}
			Self::Storage(storage::Error::Io(..)) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		match self {
			Self::MissingFile => error::Message::new("missing_file").field(FILE_FIELD).into_vec(),
			Self::Storage(storage::Error::NotAnImage | storage::Error::Decode(..)) => {
				error::Message::new("not_an_image").field(FILE_FIELD).into_vec()
			}
			_ => Vec::new(),
		}
	}
}

#[cfg(test)]
mod test {
	use std::io::Cursor;

	use axum::http::StatusCode;

	use super::{Error, FILE_FIELD};
	use crate::{error::ErrorShape, storage, test::*};

	const BOUNDARY: &str = "medium-platform-boundary";

	fn png() -> Vec<u8> {
		let mut buffer = Cursor::new(Vec::new());

		image::RgbImage::new(4, 3)
			.write_to(&mut buffer, image::ImageFormat::Png)
			.unwrap();

		buffer.into_inner()
	}

	fn form(field: &str, content: &[u8]) -> Vec<u8> {
		let mut body = format!(
			"--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.png\"\r\nContent-Type: image/png\r\n\r\n"
		)
		.into_bytes();

		body.extend_from_slice(content);
		body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
		body
	}

	#[test]
	fn test_error_status() {
		assert_eq!(Error::MissingFile.status(), StatusCode::BAD_REQUEST);
		assert_eq!(
			Error::Storage(storage::Error::NotAnImage).status(),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(
			Error::Storage(storage::Error::Io(std::io::ErrorKind::Other.into())).status(),
			StatusCode::INTERNAL_SERVER_ERROR
		);
	}

	#[sqlx::test]
	async fn test_upload_image(pool: Database) {
		let app = app(pool);

		let response = app
			.post("/uploads")
			.content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
			.bytes(form(FILE_FIELD, &png()).into())
			.await;

		assert_eq!(response.status_code(), 401);

		register(&app, "jane@doe.com", "Jane Doe").await;

		let response = app
			.post("/uploads")
			.content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
			.bytes(form(FILE_FIELD, &png()).into())
			.await;

		assert_eq!(response.status_code(), 200);

		let body = response.json::<serde_json::Value>();

		assert_eq!(body["width"], 4);
		assert_eq!(body["height"], 3);
		assert!(body["publicId"].as_str().unwrap().starts_with("posts/"));

		let stored = app.get(body["url"].as_str().unwrap()).await;

		assert_eq!(stored.status_code(), 200);

		let response = app
			.post("/uploads")
			.content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
			.bytes(form(FILE_FIELD, b"plain text").into())
			.await;

		assert_eq!(response.status_code(), 400);

		let response = app
			.post("/uploads")
			.content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
			.bytes(form("other", &png()).into())
			.await;

		assert_eq!(response.status_code(), 400);
	}

	#[sqlx::test]
	async fn test_upload_too_large(pool: Database) {
		let app = app(pool);

		register(&app, "jane@doe.com", "Jane Doe").await;

		let response = app
			.post("/uploads")
			.content_type(&format!("multipart/form-data; boundary={BOUNDARY}"))
			.bytes(form(FILE_FIELD, &vec![0; UPLOAD_MAX_BYTES + 1]).into())
			.await;

		assert_eq!(response.status_code(), 413);
	}
}
