use crate::db::Database;
use crate::error::AppResult;
use crate::models::User;
use crate::utils::time::current_timestamp_seconds;

const USER_COLUMNS: &str =
    r#"id, name, email, role, api_key, settings as settings_str, created_at, updated_at"#;

pub struct UserService<'a> {
    db: &'a Database,
}

impl<'a> UserService<'a> {
    pub fn new(db: &'a Database) -> Self {
        UserService { db }
    }

    pub async fn create_user(
        &self,
        id: &str,
        name: &str,
        email: &str,
        role: &str,
    ) -> AppResult<User> {
        let now = current_timestamp_seconds();

        sqlx::query(
            r#"
            INSERT INTO "user" (id, name, email, role, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(now)
        .bind(now)
        .execute(&self.db.pool)
        .await?;

        self.get_user_by_id(id).await?.ok_or_else(|| {
            crate::error::AppError::InternalServerError("Failed to create user".to_string())
        })
    }

    pub async fn get_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    pub async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    pub async fn get_user_by_api_key(&self, api_key: &str) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM "user" WHERE api_key = $1"#
        ))
        .bind(api_key)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(result)
    }

    pub async fn count_users(&self) -> AppResult<i64> {
        let count: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM "user""#)
            .fetch_one(&self.db.pool)
            .await?;

        Ok(count.0)
    }

    pub async fn update_api_key(&self, id: &str, api_key: Option<&str>) -> AppResult<()> {
        sqlx::query(r#"UPDATE "user" SET api_key = $1, updated_at = $2 WHERE id = $3"#)
            .bind(api_key)
            .bind(current_timestamp_seconds())
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        Ok(())
    }

    pub async fn update_settings(&self, id: &str, settings: &serde_json::Value) -> AppResult<()> {
        let settings_json = serde_json::to_string(settings).unwrap_or_else(|_| "{}".to_string());

        sqlx::query(r#"UPDATE "user" SET settings = $1, updated_at = $2 WHERE id = $3"#)
            .bind(settings_json)
            .bind(current_timestamp_seconds())
            .bind(id)
            .execute(&self.db.pool)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;

    #[tokio::test]
    async fn create_and_lookup_user() {
        let db = test_database().await;
        let service = UserService::new(&db);

        let user = service
            .create_user("u1", "Ada", "ada@example.com", "admin")
            .await
            .unwrap();
        assert_eq!(user.role, "admin");
        assert_eq!(service.count_users().await.unwrap(), 1);

        let by_email = service
            .get_user_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, "u1");
        assert!(service.get_user_by_id("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn settings_round_trip() {
        let db = test_database().await;
        let service = UserService::new(&db);

        service
            .create_user("u1", "Ada", "ada@example.com", "user")
            .await
            .unwrap();
        service
            .update_settings("u1", &serde_json::json!({"theme": "dark"}))
            .await
            .unwrap();

        let mut user = service.get_user_by_id("u1").await.unwrap().unwrap();
        user.parse_json_fields();
        assert_eq!(user.settings.unwrap()["theme"], "dark");
    }

    #[tokio::test]
    async fn api_key_lookup() {
        let db = test_database().await;
        let service = UserService::new(&db);

        service
            .create_user("u1", "Ada", "ada@example.com", "user")
            .await
            .unwrap();
        service.update_api_key("u1", Some("lv-abc")).await.unwrap();

        let user = service.get_user_by_api_key("lv-abc").await.unwrap().unwrap();
        assert_eq!(user.id, "u1");

        service.update_api_key("u1", None).await.unwrap();
        assert!(service.get_user_by_api_key("lv-abc").await.unwrap().is_none());
    }
}
