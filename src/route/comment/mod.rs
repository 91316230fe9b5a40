use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod route;
pub mod service;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("comment not found")]
	UnknownComment(Uuid),
	#[error("post not found")]
	UnknownPost(Uuid),
	#[error("you can only modify your own comments")]
	NotOwner(Uuid),
	#[error("the parent comment does not exist on this post")]
	InvalidParent(Uuid),
	#[error("replies cannot be replied to")]
	NestedReply(Uuid),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(list_comments, list_comments_docs).post_with(create_comment, create_comment_docs),
		)
		.api_route(
			"/:id",
			get_with(get_comment, get_comment_docs)
				.put_with(update_comment, update_comment_docs)
				.delete_with(delete_comment, delete_comment_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownComment(..) | Self::UnknownPost(..) => StatusCode::NOT_FOUND,
			Self::NotOwner(..) => StatusCode::FORBIDDEN,
			Self::InvalidParent(..) | Self::NestedReply(..) => StatusCode::BAD_REQUEST,
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		let (content, key, id) = match self {
			Self::UnknownComment(id) => ("unknown_comment", "comment", id),
			Self::UnknownPost(id) => ("unknown_post", "post", id),
			Self::NotOwner(id) => ("not_owner", "comment", id),
			Self::InvalidParent(id) => ("invalid_parent", "parent", id),
			Self::NestedReply(id) => ("nested_reply", "parent", id),
		};

		error::Message::new(content)
			.detail(key, id.to_string())
			.into_vec()
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	async fn published_post(app: &TestServer) -> String {
		let body = app
			.post("/posts")
			.json(&json!({
				"title": "Discuss",
				"content": "word ".repeat(25),
				"published": true,
			}))
			.await
			.json::<serde_json::Value>();

		body["post"]["id"].as_str().unwrap().to_string()
	}

	async fn comments_count(app: &TestServer, post: &str) -> i64 {
		app.get(&format!("/posts/{post}"))
			.await
			.json::<serde_json::Value>()["post"]["commentsCount"]
			.as_i64()
			.unwrap()
	}

	#[sqlx::test]
	async fn test_comment_counts(pool: Database) {
		let app = app(pool);

		register(&app, "jane@doe.com", "Jane Doe").await;

		let post = published_post(&app).await;

		let response = app
			.post("/comments")
			.json(&json!({ "postId": post, "content": "Great read" }))
			.await;

		assert_eq!(response.status_code(), 201);

		let comment = response.json::<serde_json::Value>()["comment"]["id"]
			.as_str()
			.unwrap()
			.to_string();

		let response = app
			.post("/comments")
			.json(&json!({ "postId": post, "parentId": comment, "content": "Agreed" }))
			.await;

		assert_eq!(response.status_code(), 201);

		let reply = response.json::<serde_json::Value>()["comment"]["id"]
			.as_str()
			.unwrap()
			.to_string();

		let response = app
			.post("/comments")
			.json(&json!({ "postId": post, "parentId": reply, "content": "Too deep" }))
			.await;

		assert_eq!(response.status_code(), 400);
		assert_eq!(comments_count(&app, &post).await, 2);

		let body = app
			.get("/comments")
			.add_query_param("postId", &post)
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["pagination"]["total"], 1);
		assert_eq!(body["data"][0]["repliesCount"], 1);

		let body = app
			.get("/comments")
			.add_query_param("postId", &post)
			.add_query_param("parentId", "")
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["data"][0]["id"], comment.as_str());

		assert_eq!(app.delete(&format!("/comments/{reply}")).await.status_code(), 204);
		assert_eq!(comments_count(&app, &post).await, 1);

		assert_eq!(app.delete(&format!("/comments/{comment}")).await.status_code(), 204);
		assert_eq!(comments_count(&app, &post).await, 0);
	}

	#[sqlx::test]
	async fn test_non_author_cannot_edit(pool: Database) {
		let other = app(pool.clone());
		let app = app(pool);

		register(&app, "jane@doe.com", "Jane Doe").await;

		let post = published_post(&app).await;
		let body = app
			.post("/comments")
			.json(&json!({ "postId": post, "content": "Mine" }))
			.await
			.json::<serde_json::Value>();
		let comment = body["comment"]["id"].as_str().unwrap().to_string();

		register(&other, "other@example.com", "Other").await;

		let response = other
			.put(&format!("/comments/{comment}"))
			.json(&json!({ "content": "Not yours" }))
			.await;

		assert_eq!(response.status_code(), 403);
		assert_eq!(other.delete(&format!("/comments/{comment}")).await.status_code(), 403);

		let response = app.get(&format!("/comments/{comment}")).await;

		assert_eq!(response.json::<serde_json::Value>()["comment"]["content"], "Mine");
		assert_eq!(comments_count(&app, &post).await, 1);
	}
}
