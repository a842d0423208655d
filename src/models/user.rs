use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub api_key: Option<String>,
    #[sqlx(skip)]
    pub settings: Option<serde_json::Value>,
    #[sqlx(default)]
    #[serde(skip_serializing, default)]
    pub settings_str: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    pub fn parse_json_fields(&mut self) {
        if let Some(ref settings_str) = self.settings_str {
            self.settings = serde_json::from_str(settings_str).ok();
        }
    }
}
