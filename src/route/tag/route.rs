use aide::axum::IntoApiResponse;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use macros::route;

use crate::{
	extract::{Json, Path, Query, Session},
	openapi::tag,
	route::{
		model::{LimitInput, Page, Paginate, SlugInput},
		post,
	},
	text, Database,
};

use super::{model, Error, RouteError};

const POPULAR_LIMIT: i64 = 10;

fn map_unique_violation(error: sqlx::Error) -> RouteError {
	match error {
		sqlx::Error::Database(ref database) if database.is_unique_violation() => {
			Error::TagExists.into()
		}
		error => RouteError::from(error),
	}
}

/// List tags
/// Returns a paginated list of tags sorted by name, optionally filtered by a search term.
#[route(tag = tag::TAG)]
pub async fn list_tags(
	State(database): State<Database>,
	Query(input): Query<model::ListTagsInput>,
) -> Result<Json<Page<model::Tag>>, RouteError> {
	let paginate = input.paginate();
	let search = input
		.search
		.as_deref()
		.map(str::trim)
		.filter(|search| !search.is_empty());

	let tags = sqlx::query_as::<_, model::Tag>(
		r#"
			SELECT * FROM tag
			WHERE ($1::TEXT IS NULL OR strpos(lower(name), lower($1)) > 0)
			ORDER BY name ASC
			LIMIT $2 OFFSET $3
		"#,
	)
	.bind(search)
	.bind(paginate.limit())
	.bind(paginate.offset())
	.fetch_all(&database)
	.await?;

	let total = sqlx::query_scalar::<_, i64>(
		"SELECT COUNT(*) FROM tag WHERE ($1::TEXT IS NULL OR strpos(lower(name), lower($1)) > 0)",
	)
	.bind(search)
	.fetch_one(&database)
	.await?;

	Ok(Json(Page::new(tags, &paginate, total)))
}

/// Create tag
/// Creates a new tag. The slug is derived from the name.
#[route(tag = tag::TAG, response(status = 201, shape = "Json<model::TagResponse>"))]
pub async fn create_tag(
	State(database): State<Database>,
	_session: Session,
	Json(input): Json<model::CreateTagInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let name = input.name.trim();
	let slug = text::tag_slug(name);

	if slug.is_empty() {
		return Err(Error::InvalidName.into());
	}

	let tag = sqlx::query_as::<_, model::Tag>(
		"INSERT INTO tag (name, slug, description) VALUES ($1, $2, $3) RETURNING *",
	)
	.bind(name)
	.bind(&slug)
	.bind(input.description)
	.fetch_one(&database)
	.await
	.map_err(map_unique_violation)?;

	Ok((StatusCode::CREATED, Json(model::TagResponse { tag })).into_response())
}

/// Get popular tags
/// Returns the tags used by the most published posts.
#[route(tag = tag::TAG)]
pub async fn popular_tags(
	State(database): State<Database>,
	Query(input): Query<LimitInput>,
) -> Result<Json<model::PopularTags>, RouteError> {
	let tags = sqlx::query_as::<_, model::PopularTag>(
		r#"
			SELECT name, COUNT(*) AS count
			FROM post, unnest(post.tags) AS t(name)
			WHERE post.published
			GROUP BY name
			ORDER BY count DESC, name ASC
			LIMIT $1
		"#,
	)
	.bind(input.limit_or(POPULAR_LIMIT))
	.fetch_all(&database)
	.await?;

	Ok(Json(model::PopularTags { tags }))
}

/// Get tag
/// Returns a single tag by its slug.
#[route(tag = tag::TAG)]
pub async fn get_tag(
	State(database): State<Database>,
	Path(SlugInput { slug }): Path<SlugInput>,
) -> Result<Json<model::TagResponse>, RouteError> {
	let tag = sqlx::query_as::<_, model::Tag>("SELECT * FROM tag WHERE slug = $1")
		.bind(&slug)
		.fetch_optional(&database)
		.await?;

	let tag = tag.ok_or(Error::UnknownTag(slug))?;

	Ok(Json(model::TagResponse { tag }))
}

/// Update tag
/// Changes the display name or description of a tag. The slug is kept.
#[route(tag = tag::TAG)]
pub async fn update_tag(
	State(database): State<Database>,
	_session: Session,
	Path(SlugInput { slug }): Path<SlugInput>,
	Json(input): Json<model::UpdateTagInput>,
) -> Result<Json<model::TagResponse>, RouteError> {
	let tag = sqlx::query_as::<_, model::Tag>(
		r#"
			UPDATE tag
			SET name = COALESCE($2, name), description = COALESCE($3, description), updated_at = now()
			WHERE slug = $1
			RETURNING *
		"#,
	)
	.bind(&slug)
	.bind(input.name.as_deref().map(str::trim))
	.bind(input.description.flatten())
	.fetch_optional(&database)
	.await
	.map_err(map_unique_violation)?;

	let tag = tag.ok_or(Error::UnknownTag(slug))?;

	Ok(Json(model::TagResponse { tag }))
}

/// Delete tag
/// Deletes a tag and removes it from every post that uses it.
#[route(tag = tag::TAG, response(status = 204, description = "Deleted successfully."))]
pub async fn delete_tag(
	State(database): State<Database>,
	_session: Session,
	Path(SlugInput { slug }): Path<SlugInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let mut tx = database.begin().await?;

	let deleted = sqlx::query("DELETE FROM tag WHERE slug = $1")
		.bind(&slug)
		.execute(&mut *tx)
		.await?
		.rows_affected();

	if deleted == 0 {
		return Err(Error::UnknownTag(slug).into());
	}

	sqlx::query("UPDATE post SET tags = array_remove(tags, $1) WHERE $1 = ANY(tags)")
		.bind(&slug)
		.execute(&mut *tx)
		.await?;

	tx.commit().await?;

	Ok(StatusCode::NO_CONTENT.into_response())
}

/// Get tag posts
/// Returns a paginated list of published posts filed under the tag, newest first.
#[route(tag = tag::TAG)]
pub async fn get_tag_posts(
	State(database): State<Database>,
	Path(SlugInput { slug }): Path<SlugInput>,
	Query(paginate): Query<Paginate>,
) -> Result<Json<Page<post::model::Post>>, RouteError> {
	let filters = post::model::PostFilters {
		tag: Some(slug),
		..post::model::PostFilters::published()
	};

	let posts = post::service::list_posts(
		&database,
		&filters,
		post::model::PostOrder::Latest,
		&paginate,
	)
	.await?;

	Ok(Json(posts))
}
