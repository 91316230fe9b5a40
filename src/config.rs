use std::{env, net::IpAddr, path::PathBuf, str::FromStr};

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use tracing::Level;

use crate::Database;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{name} is invalid: {value:?}")]
	Invalid { name: &'static str, value: String },
	#[error("DATABASE_URL is invalid: {0}")]
	DatabaseUrl(#[source] sqlx::Error),
}

/// Process configuration, read once from the environment at start-up.
#[derive(Debug, Clone)]
pub struct Config {
	pub database_url: String,
	/// Overrides the database named in `database_url`.
	pub database_name: Option<String>,
	pub max_connections: u32,
	pub host: IpAddr,
	pub port: u16,
	pub upload_dir: PathBuf,
	/// Public URL prefix under which stored images are served.
	pub upload_base_url: String,
	pub upload_max_bytes: usize,
	pub log_level: Level,
	pub otlp_endpoint: Option<String>,
}

fn optional(name: &'static str) -> Option<String> {
	env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, Error> {
	match optional(name) {
		Some(value) => value
			.trim()
			.parse()
			.map_err(|_| Error::Invalid { name, value }),
		None => Ok(default),
	}
}

impl Config {
	/// Reads the configuration from the environment, loading a `.env` file first if present.
	pub fn from_env() -> Result<Self, Error> {
		dotenvy::dotenv().ok();

		Ok(Self {
			database_url: optional("DATABASE_URL").ok_or(Error::Missing("DATABASE_URL"))?,
			database_name: optional("DATABASE_NAME"),
			max_connections: parsed("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
			host: parsed("HOST", IpAddr::from([127, 0, 0, 1]))?,
			port: parsed("PORT", DEFAULT_PORT)?,
			upload_dir: optional("UPLOAD_DIR").map_or_else(|| PathBuf::from("uploads"), PathBuf::from),
			upload_base_url: optional("UPLOAD_BASE_URL")
				.map_or_else(|| "/uploads/files".into(), |url| url.trim_end_matches('/').into()),
			upload_max_bytes: parsed("UPLOAD_MAX_BYTES", DEFAULT_UPLOAD_MAX_BYTES)?,
			log_level: parsed("LOG_LEVEL", Level::INFO)?,
			otlp_endpoint: optional("OTEL_EXPORTER_OTLP_ENDPOINT"),
		})
	}

	/// Builds the connection options, applying `DATABASE_NAME` when set.
	pub fn connect_options(&self) -> Result<PgConnectOptions, Error> {
		let options = PgConnectOptions::from_str(&self.database_url).map_err(Error::DatabaseUrl)?;

		Ok(match &self.database_name {
			Some(name) => options.database(name),
			None => options,
		})
	}

	/// Creates the pool shared by every request.
	///
	/// Connections are established lazily, so this does not touch the network.
	pub fn database(&self) -> Result<Database, Error> {
		Ok(PgPoolOptions::new()
			.max_connections(self.max_connections)
			.connect_lazy_with(self.connect_options()?))
	}
}

#[cfg(test)]
mod test {
	use super::{Config, Error};

	fn config(url: &str, name: Option<&str>) -> Config {
		Config {
			database_url: url.into(),
			database_name: name.map(Into::into),
			max_connections: 1,
			host: [127, 0, 0, 1].into(),
			port: 3000,
			upload_dir: "uploads".into(),
			upload_base_url: "/uploads/files".into(),
			upload_max_bytes: 1024,
			log_level: tracing::Level::INFO,
			otlp_endpoint: None,
		}
	}

	#[test]
	fn test_database_name_override() {
		let options = config("postgres://localhost/medium", Some("medium_platform"))
			.connect_options()
			.unwrap();

		assert_eq!(options.get_database(), Some("medium_platform"));
	}

	#[test]
	fn test_database_name_from_url() {
		let options = config("postgres://localhost/medium", None)
			.connect_options()
			.unwrap();

		assert_eq!(options.get_database(), Some("medium"));
	}

	#[test]
	fn test_invalid_url() {
		assert!(matches!(
			config("not a url", None).connect_options(),
			Err(Error::DatabaseUrl(..))
		));
	}
}
