use crate::transaction_repo::TransactionRepoError::TransactionNotFound;
use crate::transaction_repo::{
    Filter, NewTransaction, Transaction, TransactionRepo, TransactionRepoError,
};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

struct State {
    transactions: HashMap<String, Transaction>,
    user_transactions: HashMap<String, HashSet<String>>,
}

pub struct MemTransactionRepo {
    state: RwLock<State>,
}

impl MemTransactionRepo {
    pub fn new() -> MemTransactionRepo {
        let state = State {
            transactions: HashMap::new(),
            user_transactions: HashMap::new(),
        };
        MemTransactionRepo {
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
impl TransactionRepo for MemTransactionRepo {
    async fn get_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Transaction, TransactionRepoError> {
        self.read_lock()?
            .transactions
            .get(transaction_id)
            .cloned()
            .ok_or_else(|| TransactionNotFound(transaction_id.to_owned()))
    }

    async fn get_transactions(
        &self,
        user_id: &str,
        filter: Filter,
    ) -> Result<Vec<Transaction>, TransactionRepoError> {
        let read_guard = self.read_lock()?;

        let Some(transaction_ids) = read_guard.user_transactions.get(user_id) else {
            return Ok(Vec::new());
        };

        let mut transactions: Vec<Transaction> = transaction_ids
            .iter()
            .filter_map(|id| read_guard.transactions.get(id))
            .filter(|t| filter.from.map_or(true, |from| t.date >= from))
            .filter(|t| filter.until.map_or(true, |until| t.date <= until))
            .filter(|t| filter.kind.map_or(true, |kind| t.kind == kind))
            .filter(|t| match &filter.category_id {
                Some(category_id) => t.category_id.as_ref() == Some(category_id),
                None => true,
            })
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        Ok(transactions)
    }

    async fn create_transaction(
        &self,
        user_id: &str,
        new_transaction: NewTransaction,
    ) -> Result<Transaction, TransactionRepoError> {
        let mut write_guard = self.write_lock()?;

        let transaction =
            new_transaction.into_transaction(crate::new_id(), user_id.to_owned(), Utc::now());

        write_guard
            .transactions
            .insert(transaction.id.clone(), transaction.clone());
        write_guard
            .user_transactions
            .entry(user_id.to_owned())
            .or_insert_with(HashSet::new)
            .insert(transaction.id.clone());

        Ok(transaction)
    }

    async fn delete_transaction(
        &self,
        transaction_id: &str,
    ) -> Result<Transaction, TransactionRepoError> {
        let mut write_guard = self.write_lock()?;

        let Some(transaction) = write_guard.transactions.remove(transaction_id) else {
            return Err(TransactionNotFound(transaction_id.to_owned()));
        };
        if let Some(ids) = write_guard.user_transactions.get_mut(&transaction.user_id) {
            ids.remove(transaction_id);
        }
        Ok(transaction)
    }

    async fn delete_user_transactions(&self, user_id: &str) -> Result<(), TransactionRepoError> {
        let mut write_guard = self.write_lock()?;

        if let Some(ids) = write_guard.user_transactions.remove(user_id) {
            for id in ids {
                write_guard.transactions.remove(&id);
            }
        }
        Ok(())
    }

    async fn external_transaction_exists(
        &self,
        api_connection_id: &str,
        external_id: &str,
    ) -> Result<bool, TransactionRepoError> {
        Ok(self.read_lock()?.transactions.values().any(|t| {
            t.api_connection_id.as_deref() == Some(api_connection_id)
                && t.external_id.as_deref() == Some(external_id)
        }))
    }
}
