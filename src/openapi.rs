use aide::{
	openapi::{ApiKeyLocation, SecurityScheme, Tag},
	transform::TransformOpenApi,
};

use crate::{error, extract::Json, session};

pub const SECURITY_SCHEME_SESSION: &str = "Session";
pub const SECURITY_SCHEME_BEARER: &str = "Bearer";

pub mod tag {
	pub const AUTH: &str = "Auth";
	pub const USER: &str = "User";
	pub const POST: &str = "Post";
	pub const COMMENT: &str = "Comment";
	pub const TAG: &str = "Tag";
	pub const SEARCH: &str = "Search";
}

fn tag(name: &str, description: &str) -> Tag {
	Tag {
		name: name.into(),
		description: Some(description.into()),
		..Default::default()
	}
}

pub fn docs(api: TransformOpenApi) -> TransformOpenApi {
	api.title("Medium Platform API")
		.summary("Posts, comments, claps and follows")
		.description(
			"A publishing platform: users write posts, follow each other, comment and like content.",
		)
		.tag(tag(tag::AUTH, "Registration and sessions"))
		.tag(tag(tag::USER, "Profiles and the follow graph"))
		.tag(tag(tag::POST, "Posts, feeds and likes"))
		.tag(tag(tag::COMMENT, "Comments and replies"))
		.tag(tag(tag::TAG, "Tags"))
		.tag(tag(tag::SEARCH, "Search across posts, users and tags"))
		.security_scheme(
			SECURITY_SCHEME_SESSION,
			SecurityScheme::ApiKey {
				location: ApiKeyLocation::Cookie,
				name: session::COOKIE_NAME.into(),
				description: Some("A user session cookie".into()),
				extensions: Default::default(),
			},
		)
		.security_scheme(
			SECURITY_SCHEME_BEARER,
			SecurityScheme::Http {
				scheme: "bearer".into(),
				bearer_format: Some("session id".into()),
				description: Some("The session id sent as a bearer token".into()),
				extensions: Default::default(),
			},
		)
		.default_response_with::<Json<error::ErrorResponse>, _>(|res| {
			res.example(error::ErrorResponse {
				error: "validation failed".into(),
				details: error::Message::new("length")
					.field("title")
					.detail("min", 3)
					.into_vec(),
			})
		})
}
