use std::collections::{HashMap, HashSet};

use sqlx::FromRow;
use uuid::Uuid;

use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::link::{Link, LinkForm, LinkUpdateForm, LinkWithTags};
use crate::models::tag::TagResponse;
use crate::services::metadata::PageMetadata;
use crate::services::tag::TagService;
use crate::utils::time::current_timestamp_seconds;
use crate::utils::url::{extract_domain, normalize_url, placeholder_title};

const LINK_COLUMNS: &str = r#"id, user_id, url, title, description, thumbnail_url, domain, notes, created_at, updated_at"#;

#[derive(FromRow)]
struct LinkTagRow {
    link_id: String,
    id: String,
    name: String,
    created_at: i64,
}

/// Storage workflows for links and their tag associations.
///
/// The multi-step workflows (save-with-tags, retag, delete-with-cleanup) are
/// deliberate sequences of independent statements, not transactions: a failing
/// step aborts the rest and earlier writes stay applied. Orphaned tags are
/// cleaned up by an explicit reference-count check after association removal.
pub struct LinkService<'a> {
    db: &'a Database,
}

impl<'a> LinkService<'a> {
    pub fn new(db: &'a Database) -> Self {
        LinkService { db }
    }

    pub async fn get_link_by_id(&self, user_id: &str, id: &str) -> AppResult<Option<Link>> {
        let result = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM link WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    pub async fn get_links_with_tags(&self, user_id: &str) -> AppResult<Vec<LinkWithTags>> {
        let links = sqlx::query_as::<_, Link>(&format!(
            "SELECT {LINK_COLUMNS} FROM link WHERE user_id = $1 ORDER BY created_at DESC, id"
        ))
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let mut tags_by_link = self.tags_by_link(user_id).await?;

        Ok(links
            .into_iter()
            .map(|link| {
                let tags = tags_by_link.remove(&link.id).unwrap_or_default();
                LinkWithTags { link, tags }
            })
            .collect())
    }

    pub async fn get_link_with_tags(
        &self,
        user_id: &str,
        id: &str,
    ) -> AppResult<Option<LinkWithTags>> {
        let Some(link) = self.get_link_by_id(user_id, id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query_as::<_, LinkTagRow>(
            r#"
            SELECT lt.link_id, t.id, t.name, t.created_at
            FROM link_tag lt
            JOIN tag t ON t.id = lt.tag_id
            WHERE lt.link_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(id)
        .fetch_all(&self.db.pool)
        .await?;

        let tags = rows
            .into_iter()
            .map(|row| TagResponse {
                id: row.id,
                name: row.name,
                created_at: row.created_at,
            })
            .collect();

        Ok(Some(LinkWithTags { link, tags }))
    }

    /// Save workflow, steps 1 and 2: insert the link row immediately with a
    /// placeholder title so the caller gets a response without waiting on the
    /// target page, then resolve and attach the requested tags. Metadata
    /// enrichment (step 3) is spawned by the route handler after this
    /// returns.
    pub async fn create_link(&self, user_id: &str, form: &LinkForm) -> AppResult<Link> {
        let url = normalize_url(&form.url);
        let domain = extract_domain(&url);

        let title = match form.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => title.to_string(),
            _ => placeholder_title(&url, domain.as_deref()),
        };

        let notes = form
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_string);

        let id = Uuid::new_v4().to_string();
        let now = current_timestamp_seconds();

        sqlx::query(
            r#"
            INSERT INTO link (id, user_id, url, title, description, thumbnail_url, domain, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NULL, NULL, $5, $6, $7, $8)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(&url)
        .bind(&title)
        .bind(&domain)
        .bind(&notes)
        .bind(now)
        .bind(now)
        .execute(&self.db.pool)
        .await?;

        if !form.tags.is_empty() {
            let tag_service = TagService::new(self.db);
            let tag_ids = tag_service.resolve_tag_ids(user_id, &form.tags).await?;
            self.attach_tags(&id, &tag_ids).await?;
        }

        self.get_link_by_id(user_id, &id)
            .await?
            .ok_or_else(|| AppError::InternalServerError("Failed to create link".to_string()))
    }

    /// Patches the link row with fetched page metadata. Runs from the
    /// detached enrichment task and may race with a concurrent user edit;
    /// last write wins.
    pub async fn apply_metadata(
        &self,
        link_id: &str,
        metadata: &PageMetadata,
        fallback_title: &str,
    ) -> AppResult<()> {
        let title = match metadata.title.trim() {
            "" => fallback_title,
            title => title,
        };

        sqlx::query(
            r#"
            UPDATE link
            SET title = $1, description = $2, thumbnail_url = $3, updated_at = $4
            WHERE id = $5
            "#,
        )
        .bind(title)
        .bind(&metadata.description)
        .bind(&metadata.thumbnail_url)
        .bind(current_timestamp_seconds())
        .bind(link_id)
        .execute(&self.db.pool)
        .await?;

        Ok(())
    }

    /// Update workflow. Tag policy is replace-all: every existing association
    /// is dropped and the supplied list recreated, then formerly-associated
    /// tags that lost their last reference are pruned.
    pub async fn update_link(
        &self,
        user_id: &str,
        id: &str,
        form: &LinkUpdateForm,
    ) -> AppResult<LinkWithTags> {
        let existing = self
            .get_link_by_id(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Link not found".to_string()))?;

        if form.title.is_some() || form.notes.is_some() {
            let title = form
                .title
                .as_deref()
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .unwrap_or(&existing.title)
                .to_string();

            let notes = match form.notes.as_deref() {
                Some(notes) => {
                    let notes = notes.trim();
                    (!notes.is_empty()).then(|| notes.to_string())
                }
                None => existing.notes.clone(),
            };

            sqlx::query(
                r#"
                UPDATE link
                SET title = $1, notes = $2, updated_at = $3
                WHERE id = $4 AND user_id = $5
                "#,
            )
            .bind(&title)
            .bind(&notes)
            .bind(current_timestamp_seconds())
            .bind(id)
            .bind(user_id)
            .execute(&self.db.pool)
            .await?;
        }

        if let Some(tag_names) = &form.tags {
            let old_tag_ids = self.tag_ids_for_link(id).await?;

            sqlx::query("DELETE FROM link_tag WHERE link_id = $1")
                .bind(id)
                .execute(&self.db.pool)
                .await?;

            let tag_service = TagService::new(self.db);
            let new_tag_ids = tag_service.resolve_tag_ids(user_id, tag_names).await?;
            self.attach_tags(id, &new_tag_ids).await?;

            let removed: Vec<String> = old_tag_ids
                .into_iter()
                .filter(|tag_id| !new_tag_ids.contains(tag_id))
                .collect();
            tag_service.prune_orphans(user_id, &removed).await?;
        }

        self.get_link_with_tags(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Link not found".to_string()))
    }

    pub async fn delete_link(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.get_link_by_id(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Link not found".to_string()))?;

        let old_tag_ids = self.tag_ids_for_link(id).await?;

        sqlx::query("DELETE FROM link_tag WHERE link_id = $1")
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        sqlx::query("DELETE FROM link WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db.pool)
            .await?;

        TagService::new(self.db)
            .prune_orphans(user_id, &old_tag_ids)
            .await
    }

    /// Tag-deletion workflow, faithful to the dashboard semantics: every link
    /// currently carrying the tag that is NOT in `links_to_keep` is deleted
    /// outright (with orphan checks on its other tags), kept links merely
    /// lose the association, and the tag row goes last.
    pub async fn delete_tag_with_links(
        &self,
        user_id: &str,
        tag_id: &str,
        links_to_keep: &[String],
    ) -> AppResult<()> {
        let tag_service = TagService::new(self.db);
        tag_service
            .get_tag_by_id(user_id, tag_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

        let tagged: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT lt.link_id
            FROM link_tag lt
            JOIN link l ON l.id = lt.link_id
            WHERE lt.tag_id = $1 AND l.user_id = $2
            "#,
        )
        .bind(tag_id)
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let keep: HashSet<&str> = links_to_keep.iter().map(String::as_str).collect();
        let (kept, doomed): (Vec<String>, Vec<String>) = tagged
            .into_iter()
            .map(|(link_id,)| link_id)
            .partition(|link_id| keep.contains(link_id.as_str()));

        if !kept.is_empty() {
            let mut qb = sqlx::QueryBuilder::new("DELETE FROM link_tag WHERE tag_id = ");
            qb.push_bind(tag_id);
            qb.push(" AND link_id IN (");
            let mut separated = qb.separated(", ");
            for link_id in &kept {
                separated.push_bind(link_id);
            }
            qb.push(")");
            qb.build().execute(&self.db.pool).await?;
        }

        for link_id in &doomed {
            let other_tags: Vec<String> = self
                .tag_ids_for_link(link_id)
                .await?
                .into_iter()
                .filter(|id| id != tag_id)
                .collect();

            sqlx::query("DELETE FROM link_tag WHERE link_id = $1")
                .bind(link_id)
                .execute(&self.db.pool)
                .await?;

            sqlx::query("DELETE FROM link WHERE id = $1 AND user_id = $2")
                .bind(link_id)
                .bind(user_id)
                .execute(&self.db.pool)
                .await?;

            tag_service.prune_orphans(user_id, &other_tags).await?;
        }

        sqlx::query("DELETE FROM tag WHERE id = $1 AND user_id = $2")
            .bind(tag_id)
            .bind(user_id)
            .execute(&self.db.pool)
            .await?;

        Ok(())
    }

    async fn attach_tags(&self, link_id: &str, tag_ids: &[String]) -> AppResult<()> {
        if tag_ids.is_empty() {
            return Ok(());
        }

        let mut qb =
            sqlx::QueryBuilder::new("INSERT OR IGNORE INTO link_tag (link_id, tag_id) ");
        qb.push_values(tag_ids.iter(), |mut b, tag_id| {
            b.push_bind(link_id).push_bind(tag_id);
        });
        qb.build().execute(&self.db.pool).await?;

        Ok(())
    }

    async fn tag_ids_for_link(&self, link_id: &str) -> AppResult<Vec<String>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT tag_id FROM link_tag WHERE link_id = $1")
                .bind(link_id)
                .fetch_all(&self.db.pool)
                .await?;

        Ok(rows.into_iter().map(|(tag_id,)| tag_id).collect())
    }

    async fn tags_by_link(&self, user_id: &str) -> AppResult<HashMap<String, Vec<TagResponse>>> {
        let rows = sqlx::query_as::<_, LinkTagRow>(
            r#"
            SELECT lt.link_id, t.id, t.name, t.created_at
            FROM link_tag lt
            JOIN tag t ON t.id = lt.tag_id
            WHERE t.user_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db.pool)
        .await?;

        let mut tags_by_link: HashMap<String, Vec<TagResponse>> = HashMap::new();
        for row in rows {
            tags_by_link.entry(row.link_id).or_default().push(TagResponse {
                id: row.id,
                name: row.name,
                created_at: row.created_at,
            });
        }

        Ok(tags_by_link)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;

    fn form(url: &str, tags: &[&str]) -> LinkForm {
        LinkForm {
            url: url.to_string(),
            title: None,
            notes: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            fetch_metadata: None,
        }
    }

    async fn tag_names(db: &Database, user_id: &str) -> Vec<String> {
        TagService::new(db)
            .get_tags_with_counts(user_id)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect()
    }

    #[tokio::test]
    async fn create_normalizes_scheme_and_derives_domain() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let link = service
            .create_link("u1", &form("www.example.com/path", &[]))
            .await
            .unwrap();

        assert_eq!(link.url, "https://www.example.com/path");
        assert_eq!(link.domain.as_deref(), Some("example.com"));
        assert_eq!(link.title, "example.com");
        assert!(link.description.is_none());
        assert!(link.thumbnail_url.is_none());
    }

    #[tokio::test]
    async fn create_with_explicit_title_keeps_it() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let mut f = form("https://example.com", &[]);
        f.title = Some("My Tab Title".to_string());
        let link = service.create_link("u1", &f).await.unwrap();

        assert_eq!(link.title, "My Tab Title");
    }

    #[tokio::test]
    async fn create_attaches_and_creates_tags() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let link = service
            .create_link("u1", &form("https://example.com", &["Rust", "web", "rust"]))
            .await
            .unwrap();

        let with_tags = service
            .get_link_with_tags("u1", &link.id)
            .await
            .unwrap()
            .unwrap();
        let names: Vec<&str> = with_tags.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["rust", "web"]);
    }

    #[tokio::test]
    async fn apply_metadata_patches_fields() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let link = service
            .create_link("u1", &form("https://example.com", &[]))
            .await
            .unwrap();

        let metadata = PageMetadata {
            title: "Example Site".to_string(),
            description: Some("A description".to_string()),
            thumbnail_url: Some("https://example.com/img.png".to_string()),
        };
        service
            .apply_metadata(&link.id, &metadata, &link.title)
            .await
            .unwrap();

        let updated = service
            .get_link_by_id("u1", &link.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Example Site");
        assert_eq!(updated.description.as_deref(), Some("A description"));
        assert_eq!(
            updated.thumbnail_url.as_deref(),
            Some("https://example.com/img.png")
        );
    }

    #[tokio::test]
    async fn apply_metadata_empty_title_falls_back() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let link = service
            .create_link("u1", &form("https://example.com", &[]))
            .await
            .unwrap();

        let metadata = PageMetadata {
            title: "  ".to_string(),
            description: None,
            thumbnail_url: None,
        };
        service
            .apply_metadata(&link.id, &metadata, "example.com")
            .await
            .unwrap();

        let updated = service
            .get_link_by_id("u1", &link.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "example.com");
    }

    #[tokio::test]
    async fn retag_replaces_associations_and_prunes_orphans() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let link = service
            .create_link("u1", &form("https://example.com", &["a", "b"]))
            .await
            .unwrap();

        let update = LinkUpdateForm {
            title: None,
            notes: None,
            tags: Some(vec!["b".to_string(), "c".to_string()]),
        };
        let updated = service.update_link("u1", &link.id, &update).await.unwrap();

        let names: Vec<&str> = updated.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);

        // "a" lost its last reference and is gone from the owner's tag set
        assert_eq!(tag_names(&db, "u1").await, vec!["b", "c"]);
    }

    #[tokio::test]
    async fn retag_keeps_tags_still_referenced_elsewhere() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        service
            .create_link("u1", &form("https://one.example.com", &["a"]))
            .await
            .unwrap();
        let second = service
            .create_link("u1", &form("https://two.example.com", &["a", "b"]))
            .await
            .unwrap();

        let update = LinkUpdateForm {
            title: None,
            notes: None,
            tags: Some(vec!["b".to_string()]),
        };
        service.update_link("u1", &second.id, &update).await.unwrap();

        assert_eq!(tag_names(&db, "u1").await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn update_patches_title_and_notes() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let mut f = form("https://example.com", &[]);
        f.notes = Some("old notes".to_string());
        let link = service.create_link("u1", &f).await.unwrap();

        let update = LinkUpdateForm {
            title: Some("New Title".to_string()),
            notes: Some("".to_string()),
            tags: None,
        };
        let updated = service.update_link("u1", &link.id, &update).await.unwrap();

        assert_eq!(updated.link.title, "New Title");
        assert!(updated.link.notes.is_none());
    }

    #[tokio::test]
    async fn delete_link_prunes_now_orphaned_tags() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let link = service
            .create_link("u1", &form("https://example.com", &["solo", "shared"]))
            .await
            .unwrap();
        service
            .create_link("u1", &form("https://other.example.com", &["shared"]))
            .await
            .unwrap();

        service.delete_link("u1", &link.id).await.unwrap();

        assert!(service.get_link_by_id("u1", &link.id).await.unwrap().is_none());
        assert_eq!(tag_names(&db, "u1").await, vec!["shared"]);
    }

    #[tokio::test]
    async fn delete_tag_keeps_selected_links_and_deletes_the_rest() {
        let db = test_database().await;
        let service = LinkService::new(&db);
        let tag_service = TagService::new(&db);

        let a = service
            .create_link("u1", &form("https://a.example.com", &["shared"]))
            .await
            .unwrap();
        let b = service
            .create_link("u1", &form("https://b.example.com", &["shared", "extra"]))
            .await
            .unwrap();
        let c = service
            .create_link("u1", &form("https://c.example.com", &["shared", "lonely"]))
            .await
            .unwrap();

        let shared_id = tag_service
            .get_tags_with_counts("u1")
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.name == "shared")
            .unwrap()
            .id;

        service
            .delete_tag_with_links("u1", &shared_id, &[a.id.clone(), b.id.clone()])
            .await
            .unwrap();

        // C was not kept: fully deleted, and its "lonely" tag orphan-pruned
        assert!(service.get_link_by_id("u1", &c.id).await.unwrap().is_none());

        // A and B survive without the deleted tag
        let a_tags = service.get_link_with_tags("u1", &a.id).await.unwrap().unwrap();
        assert!(a_tags.tags.is_empty());
        let b_tags = service.get_link_with_tags("u1", &b.id).await.unwrap().unwrap();
        let b_names: Vec<&str> = b_tags.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(b_names, vec!["extra"]);

        assert_eq!(tag_names(&db, "u1").await, vec!["extra"]);
    }

    #[tokio::test]
    async fn operations_are_owner_scoped() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let link = service
            .create_link("u1", &form("https://example.com", &["mine"]))
            .await
            .unwrap();

        assert!(service.get_link_by_id("u2", &link.id).await.unwrap().is_none());
        assert!(service.delete_link("u2", &link.id).await.is_err());

        let update = LinkUpdateForm {
            title: Some("hijack".to_string()),
            notes: None,
            tags: None,
        };
        assert!(service.update_link("u2", &link.id, &update).await.is_err());

        assert!(service.get_links_with_tags("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn listing_orders_newest_first() {
        let db = test_database().await;
        let service = LinkService::new(&db);

        let first = service
            .create_link("u1", &form("https://a.example.com", &[]))
            .await
            .unwrap();
        let second = service
            .create_link("u1", &form("https://b.example.com", &[]))
            .await
            .unwrap();

        // Same-second inserts fall back to id ordering; force distinct stamps
        sqlx::query("UPDATE link SET created_at = created_at - 10 WHERE id = $1")
            .bind(&first.id)
            .execute(db.pool())
            .await
            .unwrap();

        let links = service.get_links_with_tags("u1").await.unwrap();
        assert_eq!(links[0].link.id, second.id);
        assert_eq!(links[1].link.id, first.id);
    }
}
