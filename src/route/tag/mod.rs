use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;
pub mod service;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("tag not found")]
	UnknownTag(String),
	#[error("tag already exists")]
	TagExists,
	#[error("tag name must contain letters or digits")]
	InvalidName,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(list_tags, list_tags_docs).post_with(create_tag, create_tag_docs),
		)
		.api_route("/popular", get_with(popular_tags, popular_tags_docs))
		.api_route(
			"/:slug",
			get_with(get_tag, get_tag_docs)
				.put_with(update_tag, update_tag_docs)
				.delete_with(delete_tag, delete_tag_docs),
		)
		.api_route("/:slug/posts", get_with(get_tag_posts, get_tag_posts_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownTag(..) => StatusCode::NOT_FOUND,
			Self::TagExists => StatusCode::CONFLICT,
			Self::InvalidName => StatusCode::BAD_REQUEST,
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		match self {
			Self::UnknownTag(slug) => error::Message::new("unknown_tag")
				.detail("tag", slug.as_str())
				.into_vec(),
			Self::InvalidName => error::Message::new("invalid_name").field("name").into_vec(),
			Self::TagExists => Vec::new(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[sqlx::test]
	async fn test_create_and_get_tag(pool: Database) {
		let app = app(pool);

		register(&app, "jane@doe.com", "Jane Doe").await;

		let response = app
			.post("/tags")
			.json(&json!({ "name": "Web Dev", "description": "Building for the web" }))
			.await;

		assert_eq!(response.status_code(), 201);
		assert_eq!(response.json::<serde_json::Value>()["tag"]["slug"], "web-dev");

		let response = app.post("/tags").json(&json!({ "name": "web dev" })).await;

		assert_eq!(response.status_code(), 409);

		let response = app.get("/tags/web-dev").await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<serde_json::Value>()["tag"]["name"], "Web Dev");

		assert_eq!(app.get("/tags/nope").await.status_code(), 404);
	}

	#[sqlx::test]
	async fn test_popular_tags_and_delete(pool: Database) {
		let app = app(pool);

		register(&app, "jane@doe.com", "Jane Doe").await;

		for (title, tags) in [
			("First", json!(["Rust", "Web Dev"])),
			("Second", json!(["rust"])),
		] {
			let response = app
				.post("/posts")
				.json(&json!({
					"title": title,
					"content": "word ".repeat(25),
					"tags": tags,
					"published": true,
				}))
				.await;

			assert_eq!(response.status_code(), 201);
		}

		let response = app.get("/tags/popular").await;
		let body = response.json::<serde_json::Value>();

		assert_eq!(body["tags"][0], json!({ "name": "rust", "count": 2 }));
		assert_eq!(body["tags"][1], json!({ "name": "web-dev", "count": 1 }));

		let response = app.get("/tags/rust/posts").await;

		assert_eq!(response.json::<serde_json::Value>()["pagination"]["total"], 2);

		assert_eq!(app.delete("/tags/rust").await.status_code(), 204);

		let response = app.get("/posts/slug/first").await;

		assert_eq!(
			response.json::<serde_json::Value>()["post"]["tags"],
			json!(["web-dev"])
		);
	}
}
