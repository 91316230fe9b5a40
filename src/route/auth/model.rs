use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::route::user;

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username
		.chars()
		.any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
	{
		return Err(ValidationError::new("username must be alphanumeric"));
	}

	Ok(())
}

/// A login session.
#[derive(Debug, Serialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Session {
	/// The session id, usable as a bearer token.
	#[serde(rename = "sessionId")]
	pub id: Uuid,
	/// The user that owns the session.
	#[serde(skip)]
	pub user_id: Uuid,
	/// The creation time of the session.
	pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1, max = 128))]
	pub password: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct RegisterInput {
	/// The display name.
	#[validate(length(min = 2, max = 64))]
	pub name: String,
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 6, max = 128))]
	pub password: String,
	/// The username that is displayed to the public. Derived from the name when absent.
	#[validate(length(min = 3, max = 32), custom(function = "validate_username"))]
	pub username: Option<String>,
}

/// The account created by registration, along with its first session.
#[derive(Serialize, JsonSchema)]
pub struct Registered {
	pub user: user::model::User,
	pub session: Session,
}

#[cfg(test)]
mod test {
	use validator::Validate;

	use super::{validate_username, RegisterInput};

	#[test]
	fn test_validate_username() {
		assert!(validate_username("jane_doe-42").is_ok());
		assert!(validate_username("jane doe").is_err());
		assert!(validate_username("jané").is_err());
	}

	#[test]
	fn test_register_input() {
		let input = RegisterInput {
			name: "Jane".into(),
			email: "not-an-email".into(),
			password: "abc".into(),
			username: None,
		};

		let errors = input.validate().unwrap_err();
		let fields = errors.field_errors();

		assert!(fields.contains_key("email"));
		assert!(fields.contains_key("password"));
		assert!(!fields.contains_key("username"));
	}
}
