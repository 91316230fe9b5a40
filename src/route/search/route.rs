use axum::extract::State;
use macros::route;

use crate::{
	extract::{Json, Query},
	openapi::tag,
	route::{model::Paginate, post, tag as tags, user},
	Database,
};

use super::{model, Error, RouteError};

/// Search
/// Finds published posts, users and tags containing the query, up to ten of each.
/// `type` restricts the results to one kind.
#[route(tag = tag::SEARCH)]
pub async fn search(
	State(database): State<Database>,
	Query(input): Query<model::SearchInput>,
) -> Result<Json<model::SearchResults>, RouteError> {
	let query = input
		.query
		.as_deref()
		.map(str::trim)
		.filter(|query| !query.is_empty())
		.ok_or(Error::MissingQuery)?;

	let mut results = model::SearchResults::default();

	if input.kind.includes(model::SearchType::Posts) {
		let filters = post::model::PostFilters {
			search: Some(query.to_string()),
			..post::model::PostFilters::published()
		};

		let posts = post::service::list_posts(
			&database,
			&filters,
			post::model::PostOrder::Latest,
			&Paginate::with_limit(model::RESULT_LIMIT),
		)
		.await?;

		results.posts = Some(posts.data);
	}

	if input.kind.includes(model::SearchType::Users) {
		results.users = Some(user::service::search_users(&database, query, model::RESULT_LIMIT).await?);
	}

	if input.kind.includes(model::SearchType::Tags) {
		results.tags = Some(tags::service::search_tags(&database, query, model::RESULT_LIMIT).await?);
	}

	Ok(Json(results))
}
