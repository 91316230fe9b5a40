use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{
	clock::QuantaInstant,
	middleware::{RateLimitingMiddleware, StateInformationMiddleware},
};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

use crate::error::AppError;

pub type Config = Arc<GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>>;

/// Per-IP rate limits applied to the HTTP server.
///
/// `secure` guards the credential routes, `default` everything else.
#[derive(Clone)]
pub struct Limits {
	pub default: Config,
	pub secure: Config,
}

impl Limits {
	/// Returns `None` if a limiter is configured with a zero period or burst size.
	pub fn new() -> Option<Self> {
		Some(Self {
			default: default()?,
			secure: secure()?,
		})
	}
}

pub fn default() -> Option<Config> {
	GovernorConfigBuilder::default()
		.per_millisecond(100)
		.burst_size(50)
		.use_headers()
		.error_handler(error_handler)
		.finish()
		.map(Arc::new)
}

pub fn secure() -> Option<Config> {
	GovernorConfigBuilder::default()
		.per_second(1)
		.burst_size(5)
		.use_headers()
		.error_handler(error_handler)
		.finish()
		.map(Arc::new)
}

fn error_handler(error: GovernorError) -> Response<Body> {
	AppError::from(error).into_response()
}

pub fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();
	let interval = Duration::from_secs(60);

	std::thread::spawn(move || loop {
		std::thread::sleep(interval);

		for limiter in &limiters {
			tracing::debug!("rate limiting storage size: {}", limiter.len());

			limiter.retain_recent();
		}
	});
}

#[cfg(test)]
mod test {
	use axum::{http::StatusCode, response::IntoResponse};

	use super::Limits;
	use crate::error::AppError;

	#[test]
	fn test_limits_build() {
		assert!(Limits::new().is_some());
	}

	#[test]
	fn test_rate_limited_response() {
		let response = AppError::RateLimited.into_response();

		assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
	}
}
