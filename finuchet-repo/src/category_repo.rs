use crate::transaction_repo::TransactionKind;
use crate::user_repo::UserId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NewCategory {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub color: Option<String>,
    pub icon: Option<String>,
}

impl NewCategory {
    pub fn new(
        name: String,
        kind: TransactionKind,
        color: Option<String>,
        icon: Option<String>,
    ) -> NewCategory {
        NewCategory {
            name,
            kind,
            color,
            icon,
        }
    }

    pub fn into_category(self, id: String, user_id: UserId, created_at: DateTime<Utc>) -> Category {
        Category {
            id,
            user_id,
            name: self.name,
            kind: self.kind,
            color: self.color,
            icon: self.icon,
            created_at,
        }
    }
}

#[derive(Error, Debug)]
pub enum CategoryRepoError {
    #[error("Category with id {0} not found")]
    CategoryNotFound(String),
    #[error("Category {0} already exists")]
    CategoryAlreadyExists(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait CategoryRepo: Sync + Send {
    async fn get_category(&self, category_id: &str) -> Result<Category, CategoryRepoError>;

    /// Categories of the user, optionally restricted to one kind, ordered by name
    async fn get_categories(
        &self,
        user_id: &str,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<Category>, CategoryRepoError>;

    async fn find_category(
        &self,
        user_id: &str,
        name: &str,
        kind: TransactionKind,
    ) -> Result<Option<Category>, CategoryRepoError>;

    async fn create_category(
        &self,
        user_id: &str,
        new_category: NewCategory,
    ) -> Result<Category, CategoryRepoError>;

    async fn delete_category(&self, category_id: &str) -> Result<Category, CategoryRepoError>;

    async fn delete_user_categories(&self, user_id: &str) -> Result<(), CategoryRepoError>;
}
