use aide::axum::{routing::get_with, ApiRouter};
use axum::http::StatusCode;

use crate::{error, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("missing query")]
	MissingQuery,
}

pub type RouteError = error::RouteError<Error>;

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new().api_route("/", get_with(search, search_docs))
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::MissingQuery => StatusCode::BAD_REQUEST,
		}
	}

	fn errors(&self) -> Vec<error::Message> {
		error::Message::new("missing_query").field("query").into_vec()
	}
}
