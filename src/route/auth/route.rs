use aide::axum::IntoApiResponse;
use argon2::Argon2;
use axum::{
	extract::State,
	http::{header, StatusCode},
	response::IntoResponse,
};
use macros::route;
use uuid::Uuid;

use crate::{
	extract::{Json, Session},
	openapi::tag,
	route::user,
	session, AppState, Database,
};

use super::{model, Error, RouteError};

pub const KEY_LENGTH: usize = 32;

/// Hashes a password with Argon2, using the user's id as a salt.
/// Since this is only used for logging in and creating a new password,
/// the scope of this function can remain in here with no issues.
fn hash_password(
	hasher: &Argon2,
	password: &str,
	id: &Uuid,
) -> Result<[u8; KEY_LENGTH], argon2::Error> {
	let mut hash = [0; KEY_LENGTH];

	hasher.hash_password_into(password.as_bytes(), id.as_bytes(), &mut hash)?;
	Ok(hash)
}

/// Maps unique violations on the user table to their client-facing errors.
fn map_unique_violation(error: sqlx::Error) -> RouteError {
	if let sqlx::Error::Database(ref database) = error {
		match database.constraint() {
			Some("user_email_key") => return Error::EmailTaken.into(),
			Some("user_username_key") => return Error::UsernameTaken.into(),
			_ => {}
		}
	}

	RouteError::from(error)
}

/// Log in
/// Logs in to an account, returning an associated session cookie.
#[route(tag = tag::AUTH, response(status = 200, description = "Logged in successfully.", shape = "Json<model::Session>"))]
pub async fn login(
	State(state): State<AppState>,
	Json(auth): Json<model::LoginInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let user = sqlx::query_as::<_, user::model::User>(r#"SELECT * FROM "user" WHERE email = $1"#)
		.bind(auth.email.to_lowercase())
		.fetch_optional(&state.database)
		.await?;

	let Some(user) = user else {
		return Err(Error::InvalidEmailOrPassword.into());
	};

	let hashed = hash_password(&state.hasher, &auth.password, &user.id).map_err(Error::Argon)?;

	if user.password != hashed {
		return Err(Error::InvalidEmailOrPassword.into());
	}

	let mut tx = state.database.begin().await?;

	sqlx::query(
		r#"
			UPDATE "user"
			SET login_count = login_count + 1, last_login = now()
			WHERE id = $1
		"#,
	)
	.bind(user.id)
	.execute(&mut *tx)
	.await?;

	let session = sqlx::query_as::<_, model::Session>(
		"INSERT INTO session (user_id) VALUES ($1) RETURNING *",
	)
	.bind(user.id)
	.fetch_one(&mut *tx)
	.await?;

	tx.commit().await?;

	tracing::info!(user = %user.id, "logged in");

	let cookie = session::create_cookie(session.id);

	Ok(([(header::SET_COOKIE, cookie.to_string())], Json(session)))
}

/// Log out
/// Logs out of the authenticated session and clears the session cookie.
#[route(tag = tag::AUTH, response(status = 204, description = "Logged out successfully."))]
pub async fn logout(
	State(database): State<Database>,
	session: Session,
) -> Result<impl IntoApiResponse, RouteError> {
	sqlx::query("DELETE FROM session WHERE id = $1")
		.bind(session.id)
		.execute(&database)
		.await?;

	// Clear the session cookie
	Ok((
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		StatusCode::NO_CONTENT,
	)
		.into_response())
}

/// Register account
/// Registers a new account, returning the user and an associated session cookie.
/// When no username is given, one is derived from the name.
#[route(tag = tag::AUTH, response(status = 201, description = "Registered successfully.", shape = "Json<model::Registered>"))]
pub async fn register(
	State(state): State<AppState>,
	Json(auth): Json<model::RegisterInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let user_id = Uuid::new_v4();
	let email = auth.email.trim().to_lowercase();
	let hashed = hash_password(&state.hasher, &auth.password, &user_id).map_err(Error::Argon)?;

	let mut tx = state.database.begin().await?;

	let username = match auth.username {
		Some(username) => username.to_lowercase(),
		None => {
			let base = user::service::username_base(&auth.name, &email);

			user::service::available_username(&mut *tx, &base).await?
		}
	};

	let user = sqlx::query_as::<_, user::model::User>(
		r#"
			INSERT INTO "user" (id, email, username, name, password)
			VALUES ($1, $2, $3, $4, $5)
			RETURNING *
		"#,
	)
	.bind(user_id)
	.bind(&email)
	.bind(&username)
	.bind(auth.name.trim())
	.bind(&hashed[..])
	.fetch_one(&mut *tx)
	.await
	.map_err(map_unique_violation)?;

	let session = sqlx::query_as::<_, model::Session>(
		"INSERT INTO session (user_id) VALUES ($1) RETURNING *",
	)
	.bind(user_id)
	.fetch_one(&mut *tx)
	.await?;

	tx.commit().await?;

	tracing::info!(user = %user.id, %username, "registered");

	let cookie = session::create_cookie(session.id);

	Ok((
		StatusCode::CREATED,
		[(header::SET_COOKIE, cookie.to_string())],
		Json(model::Registered { user, session }),
	)
		.into_response())
}
