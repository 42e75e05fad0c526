use crate::category_repo::CategoryRepoError::{CategoryAlreadyExists, CategoryNotFound};
use crate::category_repo::{Category, CategoryRepo, CategoryRepoError, NewCategory};
use crate::transaction_repo::TransactionKind;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct MemCategoryRepo {
    categories: RwLock<HashMap<String, Category>>,
}

impl MemCategoryRepo {
    pub fn new() -> MemCategoryRepo {
        MemCategoryRepo {
            categories: RwLock::new(HashMap::new()),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<HashMap<String, Category>>, anyhow::Error> {
        self.categories
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<HashMap<String, Category>>, anyhow::Error> {
        self.categories
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl CategoryRepo for MemCategoryRepo {
    async fn get_category(&self, category_id: &str) -> Result<Category, CategoryRepoError> {
        self.read_lock()?
            .get(category_id)
            .cloned()
            .ok_or_else(|| CategoryNotFound(category_id.to_owned()))
    }

    async fn get_categories(
        &self,
        user_id: &str,
        kind: Option<TransactionKind>,
    ) -> Result<Vec<Category>, CategoryRepoError> {
        let mut categories: Vec<Category> = self
            .read_lock()?
            .values()
            .filter(|c| c.user_id == user_id)
            .filter(|c| kind.map_or(true, |kind| c.kind == kind))
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn find_category(
        &self,
        user_id: &str,
        name: &str,
        kind: TransactionKind,
    ) -> Result<Option<Category>, CategoryRepoError> {
        Ok(self
            .read_lock()?
            .values()
            .find(|c| c.user_id == user_id && c.name == name && c.kind == kind)
            .cloned())
    }

    async fn create_category(
        &self,
        user_id: &str,
        new_category: NewCategory,
    ) -> Result<Category, CategoryRepoError> {
        let mut write_guard = self.write_lock()?;

        let exists = write_guard.values().any(|c| {
            c.user_id == user_id && c.name == new_category.name && c.kind == new_category.kind
        });
        if exists {
            return Err(CategoryAlreadyExists(new_category.name));
        }

        let category = new_category.into_category(crate::new_id(), user_id.to_owned(), Utc::now());
        write_guard.insert(category.id.clone(), category.clone());
        Ok(category)
    }

    async fn delete_category(&self, category_id: &str) -> Result<Category, CategoryRepoError> {
        self.write_lock()?
            .remove(category_id)
            .ok_or_else(|| CategoryNotFound(category_id.to_owned()))
    }

    async fn delete_user_categories(&self, user_id: &str) -> Result<(), CategoryRepoError> {
        self.write_lock()?.retain(|_, category| category.user_id != user_id);
        Ok(())
    }
}
