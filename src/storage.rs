use std::{io::Cursor, path::PathBuf};

use axum::body::Bytes;
use image::ImageReader;
use tokio::fs;
use uuid::Uuid;

pub const DEFAULT_FOLDER: &str = "posts";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("the file is not a supported image")]
	NotAnImage,
	#[error("failed to decode image: {0}")]
	Decode(#[from] image::ImageError),
	#[error("failed to write image: {0}")]
	Io(#[from] std::io::Error),
}

/// An image that has been written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
	pub url: String,
	/// The path of the image relative to the store root, without the base url.
	pub public_id: String,
	pub width: u32,
	pub height: u32,
}

/// Stores uploaded images on the local filesystem.
///
/// Files are written below `root` under a random name and served from `base_url`.
#[derive(Debug, Clone)]
pub struct ImageStorage {
	pub root: PathBuf,
	pub base_url: String,
}

/// Reduces a client-supplied folder to slug segments so it cannot escape the root.
fn sanitize_folder(folder: Option<&str>) -> String {
	let segments = folder
		.unwrap_or_default()
		.split('/')
		.map(crate::text::slugify)
		.filter(|segment| !segment.is_empty())
		.collect::<Vec<_>>();

	if segments.is_empty() {
		DEFAULT_FOLDER.into()
	} else {
		segments.join("/")
	}
}

impl ImageStorage {
	pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
		Self {
			root: root.into(),
			base_url: base_url.into(),
		}
	}

	/// Verifies that `bytes` is an image and writes it to the store.
	#[tracing::instrument(skip(self, bytes), fields(size = bytes.len()))]
	pub async fn save_image(&self, bytes: Bytes, folder: Option<&str>) -> Result<StoredImage, Error> {
		let reader = ImageReader::new(Cursor::new(bytes.as_ref())).with_guessed_format()?;
		let format = reader.format().ok_or(Error::NotAnImage)?;
		let extension = format
			.extensions_str()
			.first()
			.copied()
			.ok_or(Error::NotAnImage)?;
		let (width, height) = reader.into_dimensions()?;

		let folder = sanitize_folder(folder);
		let public_id = format!("{folder}/{}", Uuid::new_v4());
		let directory = self.root.join(&folder);
		let file_name = format!("{public_id}.{extension}");

		fs::create_dir_all(&directory).await?;
		fs::write(self.root.join(&file_name), &bytes).await?;

		tracing::info!(%public_id, width, height, "stored image");

		Ok(StoredImage {
			url: format!("{}/{file_name}", self.base_url),
			public_id,
			width,
			height,
		})
	}
}

#[cfg(test)]
mod test {
	use std::io::Cursor;

	use axum::body::Bytes;

	use super::{sanitize_folder, Error, ImageStorage};

	fn png(width: u32, height: u32) -> Bytes {
		let mut buffer = Cursor::new(Vec::new());

		image::RgbImage::new(width, height)
			.write_to(&mut buffer, image::ImageFormat::Png)
			.unwrap();

		Bytes::from(buffer.into_inner())
	}

	fn storage() -> ImageStorage {
		let root = std::env::temp_dir().join(format!("medium-uploads-{}", uuid::Uuid::new_v4()));

		ImageStorage::new(root, "/uploads/files")
	}

	#[test]
	fn test_sanitize_folder() {
		assert_eq!(sanitize_folder(None), "posts");
		assert_eq!(sanitize_folder(Some("../../etc")), "etc");
		assert_eq!(sanitize_folder(Some("Avatars/Large Ones")), "avatars/large-ones");
		assert_eq!(sanitize_folder(Some("///")), "posts");
	}

	#[tokio::test]
	async fn test_save_image() {
		let storage = storage();
		let image = storage.save_image(png(3, 2), Some("covers")).await.unwrap();

		assert_eq!((image.width, image.height), (3, 2));
		assert!(image.public_id.starts_with("covers/"));
		assert!(image.url.starts_with("/uploads/files/covers/"));
		assert!(image.url.ends_with(".png"));

		let path = storage.root.join(format!("{}.png", image.public_id));

		assert!(path.exists());

		std::fs::remove_dir_all(&storage.root).unwrap();
	}

	#[tokio::test]
	async fn test_reject_non_image() {
		let storage = storage();
		let result = storage
			.save_image(Bytes::from_static(b"definitely not an image"), None)
			.await;

		assert!(matches!(result, Err(Error::NotAnImage)));
	}
}
