#![warn(clippy::pedantic)]

mod config;
mod error;
mod extract;
mod openapi;
mod ratelimit;
mod route;
mod session;
mod storage;
mod text;
mod trace;


use std::{net::SocketAddr, sync::Arc, time::Duration};

use aide::{axum::ApiRouter, openapi::OpenApi};
use argon2::Argon2;
use axum::{
	extract::Request,
	http::Response,
	Extension, Router, ServiceExt,
};
use tower::Layer;
use tower_governor::GovernorLayer;
use tower_http::{
	compression::CompressionLayer,
	cors::CorsLayer,
	normalize_path::NormalizePathLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	services::ServeDir,
	trace::{OnResponse, TraceLayer},
};
use tracing::Span;

pub type Database = sqlx::Pool<sqlx::Postgres>;
pub type AppState = State;

/// The shared application state.
///
/// This should contain all shared dependencies that handlers need to access,
/// such as a database connection pool, a hash configuration (if it's expensive to create),
/// or the image store.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub hasher: Argon2<'static>,
	pub storage: storage::ImageStorage,
}

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
enum Error {
	#[error(transparent)]
	Config(#[from] config::Error),
	#[error(transparent)]
	Trace(#[from] trace::Error),
	#[error("failed to run migrations: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
	#[error("invalid rate limit configuration")]
	RateLimit,
	#[error("server error: {0}")]
	Io(#[from] std::io::Error),
}

/// Records the latency of every response in the `latency_ms` histogram.
#[derive(Clone, Copy)]
struct RecordLatency;

impl<B> OnResponse<B> for RecordLatency {
	fn on_response(self, response: &Response<B>, latency: Duration, _span: &Span) {
		tracing::info!(
			histogram.latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
			status = response.status().as_u16(),
			"finished processing request"
		);
	}
}

/// Builds the application router.
///
/// Rate limits key on the peer address, so when `limits` is given the router
/// must be served with connect info.
pub fn app(state: State, upload_max_bytes: usize, limits: Option<&ratelimit::Limits>) -> Router {
	let mut api = OpenApi::default();
	let upload_dir = state.storage.root.clone();

	let mut auth = route::auth::routes();

	if let Some(limits) = limits {
		auth = auth.layer(GovernorLayer {
			config: limits.secure.clone(),
		});
	}

	let mut router = ApiRouter::new()
		.nest("/auth", auth)
		.nest("/users", route::user::routes())
		.nest("/posts", route::post::routes())
		.nest("/comments", route::comment::routes())
		.nest("/tags", route::tag::routes())
		.nest("/search", route::search::routes())
		.nest("/uploads", route::upload::routes(upload_max_bytes))
		.nest("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.nest_service("/uploads/files", ServeDir::new(upload_dir))
		.layer(Extension(Arc::new(api)));

	if let Some(limits) = limits {
		router = router.layer(GovernorLayer {
			config: limits.default.clone(),
		});
	}

	router
		.layer(CompressionLayer::new())
		.layer(CorsLayer::permissive())
		.layer(PropagateRequestIdLayer::x_request_id())
		.layer(TraceLayer::new_for_http().on_response(RecordLatency))
		.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
		.with_state(state)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
	let config = config::Config::from_env()?;
	let _guard = trace::init(&config)?;

	let database = config.database()?;

	sqlx::migrate!().run(&database).await?;

	let state = State {
		database,
		hasher: Argon2::default(),
		storage: storage::ImageStorage::new(
			config.upload_dir.clone(),
			config.upload_base_url.clone(),
		),
	};

	let limits = ratelimit::Limits::new().ok_or(Error::RateLimit)?;

	ratelimit::cleanup_old_limits(&[&limits.default, &limits.secure]);

	let app = NormalizePathLayer::trim_trailing_slash().layer(app(
		state,
		config.upload_max_bytes,
		Some(&limits),
	));

	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!("listening on {}:{}", config.host, config.port);

	axum::serve(
		listener,
		ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
	)
	.await?;

	Ok(())
}
