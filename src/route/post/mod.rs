use aide::axum::{
	routing::{get_with, patch_with, post_with},
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
	#[error("post not found")]
	UnknownPost(Uuid),
	#[error("post not found")]
	UnknownSlug(String),
	#[error("you can only modify your own posts")]
	NotOwner(Uuid),
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route(
			"/",
			get_with(list_posts, list_posts_docs).post_with(create_post, create_post_docs),
		)
		.api_route("/feed/:kind", get_with(get_feed, get_feed_docs))
		.api_route("/slug/:slug", get_with(get_post_by_slug, get_post_by_slug_docs))
		.api_route(
			"/:id",
			get_with(get_post, get_post_docs)
				.put_with(update_post, update_post_docs)
				.delete_with(delete_post, delete_post_docs),
		)
		.api_route("/:id/publish", patch_with(publish_post, publish_post_docs))
		.api_route("/:id/toggle-like", post_with(toggle_like, toggle_like_docs))
		.api_route("/:id/like-status", get_with(like_status, like_status_docs))
		.api_route("/:id/likes", get_with(get_likes, get_likes_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) | Self::UnknownSlug(..) => StatusCode::NOT_FOUND,
			Self::NotOwner(..) => StatusCode::FORBIDDEN,
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		match self {
			Self::UnknownPost(post) => error::Message::new("unknown_post")
				.detail("post", post.to_string())
				.into_vec(),
			Self::NotOwner(post) => error::Message::new("not_owner")
				.detail("post", post.to_string())
				.into_vec(),
			Self::UnknownSlug(slug) => error::Message::new("unknown_post")
				.detail("slug", slug.as_str())
				.into_vec(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	fn post(title: &str) -> serde_json::Value {
		json!({
			"title": title,
			"content": "word ".repeat(25),
			"published": true,
		})
	}

	#[sqlx::test]
	async fn test_create_post(pool: Database) {
		let app = app(pool);
		let user = register(&app, "jane@doe.com", "Jane Doe").await;

		let response = app.post("/posts").json(&post("Hi")).await;

		assert_eq!(response.status_code(), 201);

		let body = response.json::<serde_json::Value>();

		assert_eq!(body["post"]["slug"], "hi");
		assert_eq!(body["post"]["author"]["id"], user["id"]);
		assert!(body["post"]["readingTime"].as_i64().unwrap() >= 1);
		assert!(body["post"]["author"].get("email").is_none());
	}

	#[sqlx::test]
	async fn test_slug_collision(pool: Database) {
		let app = app(pool);

		register(&app, "jane@doe.com", "Jane Doe").await;

		let first = app.post("/posts").json(&post("Hello World")).await;
		let second = app.post("/posts").json(&post("Hello World")).await;

		assert_eq!(first.json::<serde_json::Value>()["post"]["slug"], "hello-world");
		assert_eq!(second.json::<serde_json::Value>()["post"]["slug"], "hello-world-1");

		let response = app.get("/posts/slug/hello-world-1").await;

		assert_eq!(response.status_code(), 200);
	}

	#[sqlx::test]
	async fn test_non_owner_is_forbidden(pool: Database) {
		let other = app(pool.clone());
		let app = app(pool);

		register(&app, "owner@example.com", "Owner").await;

		let body = app.post("/posts").json(&post("Mine")).await.json::<serde_json::Value>();
		let id = body["post"]["id"].as_str().unwrap().to_string();

		register(&other, "other@example.com", "Other").await;

		let response = other
			.put(&format!("/posts/{id}"))
			.json(&json!({ "title": "Yours now" }))
			.await;

		assert_eq!(response.status_code(), 403);
		assert_eq!(other.delete(&format!("/posts/{id}")).await.status_code(), 403);

		let response = app.get(&format!("/posts/{id}")).await;

		assert_eq!(response.json::<serde_json::Value>()["post"]["title"], "Mine");
	}

	#[sqlx::test]
	async fn test_toggle_like_twice_restores_state(pool: Database) {
		let app = app(pool);

		register(&app, "jane@doe.com", "Jane Doe").await;

		let body = app.post("/posts").json(&post("Likeable")).await.json::<serde_json::Value>();
		let id = body["post"]["id"].as_str().unwrap().to_string();

		let response = app.post(&format!("/posts/{id}/toggle-like")).await;

		assert_eq!(
			response.json::<serde_json::Value>(),
			json!({ "isLiked": true, "likesCount": 1 })
		);

		let response = app.post(&format!("/posts/{id}/toggle-like")).await;

		assert_eq!(
			response.json::<serde_json::Value>(),
			json!({ "isLiked": false, "likesCount": 0 })
		);
	}

	#[sqlx::test]
	async fn test_concurrent_likes_keep_counter(pool: Database) {
		let app = app(pool.clone());
		let user = register(&app, "jane@doe.com", "Jane Doe").await;

		let body = app.post("/posts").json(&post("Racy")).await.json::<serde_json::Value>();
		let id = body["post"]["id"].as_str().unwrap().parse().unwrap();
		let user = user["id"].as_str().unwrap().parse().unwrap();

		let (first, second) = tokio::join!(
			super::service::toggle_like(&pool, id, user),
			super::service::toggle_like(&pool, id, user),
		);

		assert_ne!(first.unwrap().is_liked, second.unwrap().is_liked);

		let (likes, count) = sqlx::query_as::<_, (i64, i64)>(
			"SELECT likes_count, (SELECT COUNT(*) FROM post_like WHERE post_id = $1) FROM post WHERE id = $1",
		)
		.bind(id)
		.fetch_one(&pool)
		.await
		.unwrap();

		assert_eq!(likes, count);
		assert_eq!(likes, 0);
	}

	#[sqlx::test]
	async fn test_concurrent_renames_get_distinct_slugs(pool: Database) {
		let app = app(pool.clone());
		let user = register(&app, "jane@doe.com", "Jane Doe").await;
		let user = user["id"].as_str().unwrap().parse().unwrap();

		let mut ids = Vec::new();

		for title in ["First", "Second"] {
			let body = app.post("/posts").json(&post(title)).await.json::<serde_json::Value>();

			ids.push(body["post"]["id"].as_str().unwrap().parse().unwrap());
		}

		let rename = || {
			serde_json::from_value::<super::model::UpdatePostInput>(json!({ "title": "Same Title" }))
				.unwrap()
		};

		let (first, second) = tokio::join!(
			super::service::update_post(&pool, ids[0], user, rename()),
			super::service::update_post(&pool, ids[1], user, rename()),
		);

		let mut slugs = vec![first.unwrap().slug, second.unwrap().slug];

		slugs.sort();

		assert_eq!(slugs, ["same-title", "same-title-1"]);
	}

	#[sqlx::test]
	async fn test_drafts_are_private(pool: Database) {
		let anonymous = app(pool.clone());
		let app = app(pool);

		register(&app, "jane@doe.com", "Jane Doe").await;

		let body = app
			.post("/posts")
			.json(&json!({ "title": "Draft", "content": "word ".repeat(25) }))
			.await
			.json::<serde_json::Value>();
		let id = body["post"]["id"].as_str().unwrap().to_string();

		assert_eq!(app.get(&format!("/posts/{id}")).await.status_code(), 200);

		assert_eq!(anonymous.get(&format!("/posts/{id}")).await.status_code(), 404);

		let response = anonymous.get("/posts").await;

		assert_eq!(response.json::<serde_json::Value>()["pagination"]["total"], 0);

		let response = app
			.patch(&format!("/posts/{id}/publish"))
			.json(&json!({ "published": true }))
			.await;

		assert_eq!(response.json::<serde_json::Value>()["post"]["published"], true);
		assert_eq!(anonymous.get(&format!("/posts/{id}")).await.status_code(), 200);
	}

	#[sqlx::test]
	async fn test_list_posts_published_filter(pool: Database) {
		let anonymous = app(pool.clone());
		let app = app(pool);

		let author = register(&app, "jane@doe.com", "Jane Doe").await;
		let author = author["id"].as_str().unwrap();

		app.post("/posts").json(&post("Out there")).await;
		app.post("/posts")
			.json(&json!({ "title": "Still drafting", "content": "word ".repeat(25) }))
			.await;

		let body = anonymous
			.get("/posts")
			.add_query_param("published", "false")
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["pagination"]["total"], 0);
		assert_eq!(body["data"], json!([]));

		let body = anonymous
			.get("/posts")
			.add_query_param("authorId", author)
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["pagination"]["total"], 1);
		assert_eq!(body["data"][0]["published"], true);

		let body = app
			.get("/posts")
			.add_query_param("authorId", author)
			.add_query_param("published", "false")
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["pagination"]["total"], 1);
		assert_eq!(body["data"][0]["title"], "Still drafting");

		let body = app.get("/posts").await.json::<serde_json::Value>();

		assert_eq!(body["pagination"]["total"], 2);
	}

	#[sqlx::test]
	async fn test_list_posts_pagination(pool: Database) {
		let app = app(pool);

		register(&app, "jane@doe.com", "Jane Doe").await;

		for title in ["One", "Two", "Three"] {
			app.post("/posts").json(&post(title)).await;
		}

		let body = app
			.get("/posts")
			.add_query_param("limit", 2)
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["data"].as_array().unwrap().len(), 2);
		assert_eq!(body["data"][0]["title"], "Three");
		assert_eq!(
			body["pagination"],
			json!({ "total": 3, "page": 1, "limit": 2, "totalPages": 2, "hasMore": true })
		);

		let body = app
			.get("/posts")
			.add_query_param("search", "TWO")
			.await
			.json::<serde_json::Value>();

		assert_eq!(body["pagination"]["total"], 1);
	}

	#[sqlx::test]
	async fn test_feeds(pool: Database) {
		let reader = app(pool.clone());
		let app = app(pool);

		let author = register(&app, "author@example.com", "Author").await;

		app.post("/posts").json(&post("Quiet")).await;

		let body = app.post("/posts").json(&post("Loud")).await.json::<serde_json::Value>();
		let loud = body["post"]["id"].as_str().unwrap().to_string();

		app.post(&format!("/posts/{loud}/toggle-like")).await;
		app.post("/posts").json(&post("Newest")).await;

		register(&reader, "reader@example.com", "Reader").await;

		let body = reader.get("/posts/feed/recommended").await.json::<serde_json::Value>();

		assert_eq!(body["data"][0]["title"], "Loud");

		let body = reader.get("/posts/feed/latest").await.json::<serde_json::Value>();

		assert_eq!(body["data"][0]["title"], "Newest");

		let body = reader.get("/posts/feed/following").await.json::<serde_json::Value>();

		assert_eq!(body["pagination"]["total"], 0);

		let id = author["id"].as_str().unwrap();

		reader.post(&format!("/users/{id}/toggle-follow")).await;

		let body = reader.get("/posts/feed/following").await.json::<serde_json::Value>();

		assert_eq!(body["pagination"]["total"], 3);
		assert_eq!(reader.get("/posts/feed/random").await.status_code(), 400);
	}
}
