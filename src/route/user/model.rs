use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A registered account, as stored.
///
/// Only ever returned to the account's owner; everyone else sees a [`Profile`].
#[derive(Debug, Clone, Serialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: Uuid,
	pub email: String,
	pub username: Option<String>,
	pub name: String,
	#[serde(skip)]
	#[schemars(skip)]
	pub password: Vec<u8>,
	pub bio: String,
	pub avatar: Option<String>,
	pub headline: Option<String>,
	pub website: Option<String>,
	pub twitter: Option<String>,
	pub github: Option<String>,
	pub linkedin: Option<String>,
	pub followers_count: i64,
	pub following_count: i64,
	pub login_count: i64,
	pub last_login: Option<chrono::DateTime<chrono::Utc>>,
	pub created_at: chrono::DateTime<chrono::Utc>,
	pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// The public view of a user.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
	pub id: Uuid,
	pub username: Option<String>,
	pub name: String,
	pub bio: String,
	pub avatar: Option<String>,
	pub headline: Option<String>,
	pub website: Option<String>,
	pub twitter: Option<String>,
	pub github: Option<String>,
	pub linkedin: Option<String>,
	pub followers_count: i64,
	pub following_count: i64,
	pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<User> for Profile {
	fn from(user: User) -> Self {
		Self {
			id: user.id,
			username: user.username,
			name: user.name,
			bio: user.bio,
			avatar: user.avatar,
			headline: user.headline,
			website: user.website,
			twitter: user.twitter,
			github: user.github,
			linkedin: user.linkedin,
			followers_count: user.followers_count,
			following_count: user.following_count,
			created_at: user.created_at,
		}
	}
}

/// A user as it appears in lists of followers, likers and suggestions.
#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
	pub id: Uuid,
	pub name: String,
	pub username: Option<String>,
	pub avatar: Option<String>,
	pub bio: String,
	pub headline: Option<String>,
	pub followers_count: i64,
}

#[derive(Serialize, JsonSchema)]
pub struct UserResponse {
	pub user: User,
}

#[derive(Serialize, JsonSchema)]
pub struct ProfileResponse {
	pub user: Profile,
}

#[derive(Serialize, JsonSchema)]
pub struct UsersResponse {
	pub users: Vec<UserSummary>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UsernameInput {
	#[validate(length(min = 1, max = 64))]
	pub username: String,
}

/// Changes to a profile. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate, JsonSchema)]
pub struct UpdateProfileInput {
	#[validate(length(min = 2, max = 64))]
	pub name: Option<String>,
	#[validate(length(max = 500))]
	pub bio: Option<String>,
	#[validate(length(max = 120))]
	pub headline: Option<String>,
	#[validate(url)]
	pub avatar: Option<String>,
	#[validate(url)]
	pub website: Option<String>,
	#[validate(length(max = 100))]
	pub twitter: Option<String>,
	#[validate(length(max = 100))]
	pub github: Option<String>,
	#[validate(length(max = 100))]
	pub linkedin: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
	/// Published posts.
	pub posts_count: i64,
	pub drafts_count: i64,
	pub followers_count: i64,
	pub following_count: i64,
	/// Likes received across every post of the user.
	pub total_likes: i64,
	/// Views are not tracked, so this is always zero.
	pub total_views: i64,
}

/// The result of toggling a follow.
#[derive(Debug, Serialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FollowState {
	pub is_following: bool,
	/// The number of followers of the followed user after the toggle.
	pub followers_count: i64,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatus {
	pub is_following: bool,
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::UpdateProfileInput;

	fn input() -> UpdateProfileInput {
		UpdateProfileInput {
			name: None,
			bio: None,
			headline: None,
			avatar: None,
			website: None,
			twitter: None,
			github: None,
			linkedin: None,
		}
	}

	#[test]
	fn test_update_profile_empty_is_valid() {
		assert!(input().validate().is_ok());
	}

	#[test]
	fn test_update_profile_limits() {
		let errors = UpdateProfileInput {
			bio: Some("a".repeat(501)),
			website: Some("not a url".into()),
			..input()
		}
		.validate()
		.unwrap_err();

		let fields = errors.field_errors();

		assert!(fields.contains_key("bio"));
		assert!(fields.contains_key("website"));
		assert!(!fields.contains_key("name"));
	}
}
