use crate::db::Database;
use crate::error::AppResult;
use crate::models::tag::{Tag, TagWithCount};
use crate::utils::time::current_timestamp_seconds;
use uuid::Uuid;

pub struct TagService<'a> {
    db: &'a Database,
}

impl<'a> TagService<'a> {
    pub fn new(db: &'a Database) -> Self {
        TagService { db }
    }

    pub async fn get_tag_by_id(&self, user_id: &str, id: &str) -> AppResult<Option<Tag>> {
        let result = sqlx::query_as::<_, Tag>(
            r#"
            SELECT id, user_id, name, created_at
            FROM tag
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    /// Owner's tags ordered by name, each with its association count. Drives
    /// the sidebar listing in the dashboard.
    pub async fn get_tags_with_counts(&self, user_id: &str) -> AppResult<Vec<TagWithCount>> {
        let tags = sqlx::query_as::<_, TagWithCount>(
            r#"
            SELECT t.id, t.name, t.created_at, COUNT(lt.link_id) AS link_count
            FROM tag t
            LEFT JOIN link_tag lt ON lt.tag_id = t.id
            WHERE t.user_id = $1
            GROUP BY t.id
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(tags)
    }

    /// Resolves tag names to ids for one owner: trims, lower-cases and dedups
    /// the names, looks up existing tags in one batched query and creates the
    /// missing ones in one batched insert. Returns ids in input order.
    pub async fn resolve_tag_ids(&self, user_id: &str, names: &[String]) -> AppResult<Vec<String>> {
        let mut normalized: Vec<String> = Vec::new();
        for name in names {
            let name = name.trim().to_lowercase();
            if !name.is_empty() && !normalized.contains(&name) {
                normalized.push(name);
            }
        }

        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = sqlx::QueryBuilder::new(
            "SELECT id, user_id, name, created_at FROM tag WHERE user_id = ",
        );
        qb.push_bind(user_id);
        qb.push(" AND name IN (");
        let mut separated = qb.separated(", ");
        for name in &normalized {
            separated.push_bind(name);
        }
        qb.push(")");

        let existing: Vec<Tag> = qb.build_query_as().fetch_all(&self.db.pool).await?;
        let mut by_name: std::collections::HashMap<String, String> = existing
            .into_iter()
            .map(|tag| (tag.name, tag.id))
            .collect();

        let missing: Vec<&String> = normalized
            .iter()
            .filter(|name| !by_name.contains_key(*name))
            .collect();

        if !missing.is_empty() {
            let now = current_timestamp_seconds();
            let new_tags: Vec<(String, String)> = missing
                .into_iter()
                .map(|name| (Uuid::new_v4().to_string(), name.clone()))
                .collect();

            let mut qb =
                sqlx::QueryBuilder::new("INSERT INTO tag (id, user_id, name, created_at) ");
            qb.push_values(new_tags.iter(), |mut b, (id, name)| {
                b.push_bind(id).push_bind(user_id).push_bind(name).push_bind(now);
            });
            qb.build().execute(&self.db.pool).await?;

            for (id, name) in new_tags {
                by_name.insert(name, id);
            }
        }

        Ok(normalized
            .iter()
            .filter_map(|name| by_name.get(name).cloned())
            .collect())
    }

    /// Deletes every candidate tag that no longer has any link association.
    /// Best effort by design: runs after association removal, not inside a
    /// transaction with it.
    pub async fn prune_orphans(&self, user_id: &str, tag_ids: &[String]) -> AppResult<()> {
        for tag_id in tag_ids {
            let count: (i64,) =
                sqlx::query_as("SELECT COUNT(*) FROM link_tag WHERE tag_id = $1")
                    .bind(tag_id)
                    .fetch_one(&self.db.pool)
                    .await?;

            if count.0 == 0 {
                sqlx::query("DELETE FROM tag WHERE id = $1 AND user_id = $2")
                    .bind(tag_id)
                    .bind(user_id)
                    .execute(&self.db.pool)
                    .await?;
                tracing::debug!("Pruned orphaned tag {}", tag_id);
            }
        }

        Ok(())
    }
}
