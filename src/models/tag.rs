use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagResponse {
    pub id: String,
    pub name: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct TagWithCount {
    pub id: String,
    pub name: String,
    pub created_at: i64,
    pub link_count: i64,
}

/// Form for the tag-deletion workflow. Links in `links_to_keep` only lose the
/// association; every other link carrying the tag is deleted outright.
#[derive(Debug, Deserialize)]
pub struct TagDeleteForm {
    #[serde(default)]
    pub links_to_keep: Vec<String>,
}
