use sqlx::PgConnection;

use crate::{text, Database};

use super::model;

/// Normalizes tag names into `(name, slug)` pairs, dropping blanks and
/// duplicate slugs while keeping the first spelling of each.
pub fn clean_tags(names: &[String]) -> Vec<(String, String)> {
	let mut tags: Vec<(String, String)> = Vec::with_capacity(names.len());

	for name in names {
		let name = name.trim();
		let slug = text::tag_slug(name);

		if slug.is_empty() || tags.iter().any(|(_, existing)| *existing == slug) {
			continue;
		}

		tags.push((name.to_string(), slug));
	}

	tags
}

/// Creates any tag that does not exist yet, returning the slugs in input order.
pub async fn ensure_tags_exist(
	conn: &mut PgConnection,
	names: &[String],
) -> Result<Vec<String>, sqlx::Error> {
	let tags = clean_tags(names);

	if tags.is_empty() {
		return Ok(Vec::new());
	}

	let (names, slugs): (Vec<String>, Vec<String>) = tags.into_iter().unzip();

	sqlx::query(
		r#"
			INSERT INTO tag (name, slug)
			SELECT * FROM UNNEST($1::TEXT[], $2::TEXT[])
			ON CONFLICT DO NOTHING
		"#,
	)
	.bind(&names)
	.bind(&slugs)
	.execute(&mut *conn)
	.await?;

	Ok(slugs)
}

/// Tags whose name or slug contains `query`, ignoring case.
pub async fn search_tags(
	database: &Database,
	query: &str,
	limit: i64,
) -> Result<Vec<model::Tag>, sqlx::Error> {
	sqlx::query_as::<_, model::Tag>(
		r#"
			SELECT * FROM tag
			WHERE strpos(lower(name), lower($1)) > 0 OR strpos(slug, lower($1)) > 0
			ORDER BY name
			LIMIT $2
		"#,
	)
	.bind(query)
	.bind(limit)
	.fetch_all(database)
	.await
}

#[cfg(test)]
mod test {
	use super::clean_tags;

	#[test]
	fn test_clean_tags() {
		let names = ["Web Dev", " web-dev ", "Rust!", "", "???"]
			.into_iter()
			.map(String::from)
			.collect::<Vec<_>>();

		assert_eq!(
			clean_tags(&names),
			vec![
				("Web Dev".to_string(), "web-dev".to_string()),
				("Rust!".to_string(), "rust".to_string()),
			]
		);
	}
}
