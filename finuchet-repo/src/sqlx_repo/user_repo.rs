use crate::sqlx_repo::SQLxRepo;
use crate::user_repo::{NewUser, User, UserRepo, UserRepoError};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as};
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct UserEntry {
    id: String,
    email: String,
    name: Option<String>,
    role: String,
    image: Option<String>,
    password_hash: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserEntry> for User {
    type Error = anyhow::Error;

    fn try_from(value: UserEntry) -> Result<Self, Self::Error> {
        Ok(User {
            id: value.id,
            email: value.email,
            name: value.name,
            role: value.role.parse()?,
            image: value.image,
            password_hash: value.password_hash,
            created_at: value.created_at,
        })
    }
}

#[async_trait]
impl UserRepo for SQLxRepo {
    #[instrument(skip(self))]
    async fn get_user(&self, user_id: &str) -> Result<User, UserRepoError> {
        let entry: Option<UserEntry> = query_as("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Unable to get user {}", user_id))?;
        let entry = entry.ok_or_else(|| UserRepoError::UserNotFound(user_id.to_owned()))?;
        Ok(User::try_from(entry)?)
    }

    #[instrument(skip(self))]
    async fn get_user_by_email(&self, email: &str) -> Result<User, UserRepoError> {
        let entry: Option<UserEntry> = query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Unable to get user {}", email))?;
        let entry = entry.ok_or_else(|| UserRepoError::UserNotFound(email.to_owned()))?;
        Ok(User::try_from(entry)?)
    }

    #[instrument(skip(self, new_user), fields(email = %new_user.email))]
    async fn create_user(&self, new_user: NewUser) -> Result<User, UserRepoError> {
        let user = new_user.into_user(crate::new_id(), Utc::now());
        let result = query(
            "INSERT INTO users(id, email, name, role, image, password_hash, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT DO NOTHING",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.role.to_string())
        .bind(&user.image)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Unable to create user {}", user.email))?;
        if result.rows_affected() == 1 {
            Ok(user)
        } else {
            Err(UserRepoError::UserAlreadyExists(user.email))
        }
    }

    #[instrument(skip(self))]
    async fn update_name(&self, user_id: &str, name: &str) -> Result<User, UserRepoError> {
        let entry: Option<UserEntry> =
            query_as("UPDATE users SET name = $1 WHERE id = $2 RETURNING *")
                .bind(name)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Unable to update name of {}", user_id))?;
        let entry = entry.ok_or_else(|| UserRepoError::UserNotFound(user_id.to_owned()))?;
        Ok(User::try_from(entry)?)
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password_hash(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<(), UserRepoError> {
        let result = query("UPDATE users SET password_hash = $1 WHERE id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to update password for {}", user_id))?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(UserRepoError::UserNotFound(user_id.to_owned()))
        }
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: &str) -> Result<(), UserRepoError> {
        let result = query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete user {}", user_id))?;
        if result.rows_affected() == 1 {
            Ok(())
        } else {
            Err(UserRepoError::UserNotFound(user_id.to_owned()))
        }
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>, UserRepoError> {
        let entries: Vec<UserEntry> = query_as("SELECT * FROM users ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
            .context("Unable to list users")?;
        let users = entries
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<User>, anyhow::Error>>()?;
        Ok(users)
    }
}
