use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, AppState};

pub mod model;
pub mod route;
pub mod service;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("user not found")]
	UnknownUser(Uuid),
	#[error("user not found")]
	UnknownUsername(String),
	#[error("you cannot follow yourself")]
	SelfFollow,
	#[error("you can only modify your own account")]
	NotOwner,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/me", get_with(get_me, get_me_docs))
		.api_route("/suggested", get_with(suggested, suggested_docs))
		.api_route(
			"/username/:username",
			get_with(get_by_username, get_by_username_docs),
		)
		.api_route(
			"/:id",
			get_with(get_user, get_user_docs)
				.put_with(update_user, update_user_docs)
				.delete_with(delete_user, delete_user_docs),
		)
		.api_route("/:id/stats", get_with(get_stats, get_stats_docs))
		.api_route("/:id/followers", get_with(get_followers, get_followers_docs))
		.api_route("/:id/following", get_with(get_following, get_following_docs))
		.api_route(
			"/:id/toggle-follow",
			post_with(toggle_follow, toggle_follow_docs),
		)
		.api_route(
			"/:id/follow-status",
			get_with(follow_status, follow_status_docs),
		)
		.api_route("/:id/posts", get_with(get_posts, get_posts_docs))
		.api_route("/:id/likes", get_with(get_likes, get_likes_docs))
		.api_route("/:id/comments", get_with(get_comments, get_comments_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownUser(..) | Self::UnknownUsername(..) => StatusCode::NOT_FOUND,
			Self::SelfFollow => StatusCode::BAD_REQUEST,
			Self::NotOwner => StatusCode::FORBIDDEN,
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		match self {
			Self::UnknownUser(id) => error::Message::new("unknown_user")
				.detail("user", id.to_string())
				.into_vec(),
			Self::UnknownUsername(username) => error::Message::new("unknown_user")
				.detail("username", username.as_str())
				.into_vec(),
			Self::SelfFollow | Self::NotOwner => Vec::new(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	fn id(user: &serde_json::Value) -> &str {
		user["id"].as_str().unwrap()
	}

	#[sqlx::test]
	async fn test_follow_toggle(pool: Database) {
		let other = app(pool.clone());
		let app = app(pool);

		let jane = register(&app, "jane@doe.com", "Jane Doe").await;
		let john = register(&other, "john@doe.com", "John Doe").await;

		let response = app.post(&format!("/users/{}/toggle-follow", id(&john))).await;

		assert_eq!(
			response.json::<serde_json::Value>(),
			json!({ "isFollowing": true, "followersCount": 1 })
		);

		let response = app.get(&format!("/users/{}/follow-status", id(&john))).await;

		assert_eq!(response.json::<serde_json::Value>()["isFollowing"], true);

		let body = other
			.get(&format!("/users/{}/followers", id(&john)))
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["data"][0]["id"], jane["id"]);

		let body = app
			.get(&format!("/users/{}", id(&jane)))
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["user"]["followingCount"], 1);
		assert!(body["user"].get("email").is_none());

		let response = app.post(&format!("/users/{}/toggle-follow", id(&john))).await;

		assert_eq!(
			response.json::<serde_json::Value>(),
			json!({ "isFollowing": false, "followersCount": 0 })
		);
	}

	#[sqlx::test]
	async fn test_self_follow_is_rejected(pool: Database) {
		let app = app(pool);
		let jane = register(&app, "jane@doe.com", "Jane Doe").await;

		let response = app.post(&format!("/users/{}/toggle-follow", id(&jane))).await;

		assert_eq!(response.status_code(), 400);
	}

	#[sqlx::test]
	async fn test_update_profile_only_self(pool: Database) {
		let other = app(pool.clone());
		let app = app(pool);

		let jane = register(&app, "jane@doe.com", "Jane Doe").await;

		register(&other, "john@doe.com", "John Doe").await;

		let response = other
			.put(&format!("/users/{}", id(&jane)))
			.json(&json!({ "bio": "hijacked" }))
			.await;

		assert_eq!(response.status_code(), 403);

		let response = app
			.put(&format!("/users/{}", id(&jane)))
			.json(&json!({ "bio": "Writer", "website": "https://jane.dev" }))
			.await;

		assert_eq!(response.status_code(), 200);
		assert_eq!(response.json::<serde_json::Value>()["user"]["bio"], "Writer");

		let response = app.get("/users/username/jane-doe").await;

		assert_eq!(response.json::<serde_json::Value>()["user"]["website"], "https://jane.dev");
	}

	#[sqlx::test]
	async fn test_delete_account_repairs_counters(pool: Database) {
		let other = app(pool.clone());
		let app = app(pool);

		let jane = register(&app, "jane@doe.com", "Jane Doe").await;
		let john = register(&other, "john@doe.com", "John Doe").await;

		let body = app
			.post("/posts")
			.json(&json!({ "title": "Stays", "content": "word ".repeat(25), "published": true }))
			.await
			.json::<serde_json::Value>();
		let post = body["post"]["id"].as_str().unwrap().to_string();

		other.post(&format!("/posts/{post}/toggle-like")).await;
		other
			.post("/comments")
			.json(&json!({ "postId": post, "content": "Nice one" }))
			.await;
		other.post(&format!("/users/{}/toggle-follow", id(&jane))).await;

		let response = other.delete(&format!("/users/{}", id(&john))).await;

		assert_eq!(response.status_code(), 204);

		let body = app.get(&format!("/posts/{post}")).await.json::<serde_json::Value>();

		assert_eq!(body["post"]["likesCount"], 0);
		assert_eq!(body["post"]["commentsCount"], 0);

		let body = app
			.get(&format!("/users/{}/stats", id(&jane)))
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["followersCount"], 0);
		assert_eq!(body["postsCount"], 1);
		assert_eq!(body["totalViews"], 0);
	}
}
