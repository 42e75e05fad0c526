use crate::category_repo::{Category, CategoryRepo, CategoryRepoError, NewCategory};
use crate::sqlx_repo::SQLxRepo;
use crate::transaction_repo::TransactionKind;
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, QueryBuilder};
use tracing::instrument;

#[derive(sqlx::FromRow)]
struct CategoryEntry {
    id: String,
    user_id: String,
    name: String,
    kind: String,
    color: Option<String>,
    icon: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CategoryEntry> for Category {
    type Error = anyhow::Error;

    fn try_from(value: CategoryEntry) -> Result<Self, Self::Error> {
        Ok(Category {
            id: value.id,
            user_id: value.user_id,
            name: value.name,
            kind: value.kind.parse()?,
            color: value.color,
            icon: value.icon,
            created_at: value.created_at,
        })
    }
}

#[async_trait]
impl CategoryRepo for SQLxRepo {
    #[instrument(skip(self))]
    async fn get_category(&self, category_id: &str) -> Result<Category, CategoryRepoError> {
        let entry: Option<CategoryEntry> = query_as("SELECT * FROM categories WHERE id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Unable to get category {}", category_id))?;
        let entry =
            entry.ok_or_else(|| CategoryRepoError::CategoryNotFound(category_id.to_owned()))?;
        Ok(Category::try_from(entry)?)
    }

    #[instrument(skip(self))]
    async fn get_categories(
        &self,
        user_id: &str,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<Category>, CategoryRepoError> {
        let mut query_builder = QueryBuilder::new("SELECT * FROM categories WHERE user_id = ");
        query_builder.push_bind(user_id);
        if let Some(kind) = kind {
            query_builder.push(" AND kind = ").push_bind(kind.to_string());
        }
        query_builder.push(" ORDER BY name");
        let entries: Vec<CategoryEntry> = query_builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Unable to get categories for user {}", user_id))?;
        let categories = entries
            .into_iter()
            .map(Category::try_from)
            .collect::<Result<Vec<Category>, anyhow::Error>>()?;
        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn find_category(
        &self,
        user_id: &str,
        name: &str,
        kind: TransactionKind,
    ) -> Result<Option<Category>, CategoryRepoError> {
        let entry: Option<CategoryEntry> =
            query_as("SELECT * FROM categories WHERE user_id = $1 AND name = $2 AND kind = $3")
                .bind(user_id)
                .bind(name)
                .bind(kind.to_string())
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Unable to find category {}", name))?;
        Ok(entry.map(Category::try_from).transpose()?)
    }

    #[instrument(skip(self))]
    async fn create_category(
        &self,
        user_id: &str,
        new_category: NewCategory,
    ) -> Result<Category, CategoryRepoError> {
        let category = new_category.into_category(crate::new_id(), user_id.to_owned(), Utc::now());
        let result = query(
            "INSERT INTO categories(id, user_id, name, kind, color, icon, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (user_id, name, kind) DO NOTHING",
        )
        .bind(&category.id)
        .bind(&category.user_id)
        .bind(&category.name)
        .bind(category.kind.to_string())
        .bind(&category.color)
        .bind(&category.icon)
        .bind(category.created_at)
        .execute(&self.pool)
        .await
        .context("Unable to insert category")?;
        if result.rows_affected() == 1 {
            Ok(category)
        } else {
            Err(CategoryRepoError::CategoryAlreadyExists(category.name))
        }
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, category_id: &str) -> Result<Category, CategoryRepoError> {
        let entry: Option<CategoryEntry> =
            query_as("DELETE FROM categories WHERE id = $1 RETURNING *")
                .bind(category_id)
                .fetch_optional(&self.pool)
                .await
                .with_context(|| format!("Unable to delete category {}", category_id))?;
        let entry =
            entry.ok_or_else(|| CategoryRepoError::CategoryNotFound(category_id.to_owned()))?;
        Ok(Category::try_from(entry)?)
    }

    #[instrument(skip(self))]
    async fn delete_user_categories(&self, user_id: &str) -> Result<(), CategoryRepoError> {
        query("DELETE FROM categories WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to delete categories of user {}", user_id))?;
        Ok(())
    }
}
