use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::tag::TagResponse;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Link {
    pub id: String,
    pub user_id: String,
    pub url: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub domain: Option<String>,
    pub notes: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Form for saving a link. The dashboard sends only `url`/`notes`/`tags` and
/// lets the server enrich the title in the background; the browser extension
/// sends the tab title up front and sets `fetch_metadata` to false.
#[derive(Debug, Clone, Deserialize)]
pub struct LinkForm {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_metadata: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkUpdateForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkWithTags {
    #[serde(flatten)]
    pub link: Link,
    pub tags: Vec<TagResponse>,
}
