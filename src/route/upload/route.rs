use axum::extract::{multipart::MultipartRejection, Multipart, State};

use crate::{
	extract::{Json, Session},
	storage::ImageStorage,
};

use super::{model, Error, RouteError, FILE_FIELD, FOLDER_FIELD};

/// Stores an uploaded image.
///
/// Reads the `file` field of a multipart form and an optional `folder`
/// to file it under. Other fields are ignored.
#[tracing::instrument(skip_all, fields(user_id = %session.user.id))]
pub async fn upload(
	State(storage): State<ImageStorage>,
	session: Session,
	multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<model::UploadResponse>, RouteError> {
	let mut multipart = multipart.map_err(Error::Form)?;
	let mut file = None;
	let mut folder = None;

	while let Some(field) = multipart.next_field().await.map_err(Error::Multipart)? {
		let name = field.name().map(str::to_owned);

		match name.as_deref() {
			Some(FILE_FIELD) => file = Some(field.bytes().await.map_err(Error::Multipart)?),
			Some(FOLDER_FIELD) => folder = Some(field.text().await.map_err(Error::Multipart)?),
			_ => {}
		}
	}

	let file = file.ok_or(Error::MissingFile)?;
	let image = storage
		.save_image(file, folder.as_deref())
		.await
		.map_err(Error::Storage)?;

	Ok(Json(image.into()))
}
