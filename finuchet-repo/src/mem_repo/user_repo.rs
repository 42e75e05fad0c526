use crate::user_repo::UserRepoError::{UserAlreadyExists, UserNotFound};
use crate::user_repo::{NewUser, User, UserRepo, UserRepoError};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct State {
    users: HashMap<String, User>,
    ids_by_email: HashMap<String, String>,
}

pub struct MemUserRepo {
    state: RwLock<State>,
}

impl MemUserRepo {
    pub fn new() -> MemUserRepo {
        let state = State {
            users: HashMap::new(),
            ids_by_email: HashMap::new(),
        };
        MemUserRepo {
            state: RwLock::new(state),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<State>, anyhow::Error> {
        self.state
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<State>, anyhow::Error> {
        self.state
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl UserRepo for MemUserRepo {
    async fn get_user(&self, user_id: &str) -> Result<User, UserRepoError> {
        let read_guard = self.read_lock()?;

        read_guard
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| UserNotFound(user_id.to_owned()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, UserRepoError> {
        let read_guard = self.read_lock()?;

        read_guard
            .ids_by_email
            .get(email)
            .and_then(|id| read_guard.users.get(id))
            .cloned()
            .ok_or_else(|| UserNotFound(email.to_owned()))
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, UserRepoError> {
        let mut write_guard = self.write_lock()?;

        if write_guard.ids_by_email.contains_key(&new_user.email) {
            return Err(UserAlreadyExists(new_user.email));
        }

        let user = new_user.into_user(crate::new_id(), Utc::now());
        write_guard
            .ids_by_email
            .insert(user.email.clone(), user.id.clone());
        write_guard.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update_name(&self, user_id: &str, name: &str) -> Result<User, UserRepoError> {
        let mut write_guard = self.write_lock()?;

        let user = write_guard
            .users
            .get_mut(user_id)
            .ok_or_else(|| UserNotFound(user_id.to_owned()))?;
        user.name = Some(name.to_owned());
        Ok(user.clone())
    }

    async fn update_password_hash(
        &self,
        user_id: &str,
        password_hash: &str,
    ) -> Result<(), UserRepoError> {
        let mut write_guard = self.write_lock()?;

        let user = write_guard
            .users
            .get_mut(user_id)
            .ok_or_else(|| UserNotFound(user_id.to_owned()))?;
        user.password_hash = Some(password_hash.to_owned());
        Ok(())
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), UserRepoError> {
        let mut write_guard = self.write_lock()?;

        if let Some(user) = write_guard.users.remove(user_id) {
            write_guard.ids_by_email.remove(&user.email);
            Ok(())
        } else {
            Err(UserNotFound(user_id.to_owned()))
        }
    }

    async fn list_users(&self) -> Result<Vec<User>, UserRepoError> {
        let read_guard = self.read_lock()?;

        let mut users: Vec<User> = read_guard.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}
