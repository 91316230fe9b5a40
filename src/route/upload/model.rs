use schemars::JsonSchema;
use serde::Serialize;

use crate::storage::StoredImage;

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
	pub url: String,
	pub public_id: String,
	pub width: u32,
	pub height: u32,
}

impl From<StoredImage> for UploadResponse {
	fn from(image: StoredImage) -> Self {
		Self {
			url: image.url,
			public_id: image.public_id,
			width: image.width,
			height: image.height,
		}
	}
}
