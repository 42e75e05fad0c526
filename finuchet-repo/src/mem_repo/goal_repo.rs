use crate::goal_repo::GoalRepoError::GoalNotFound;
use crate::goal_repo::{FinancialGoal, GoalRepo, GoalRepoError, GoalUpdate, NewGoal};
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct MemGoalRepo {
    goals: RwLock<HashMap<String, FinancialGoal>>,
}

impl MemGoalRepo {
    pub fn new() -> MemGoalRepo {
        MemGoalRepo {
            goals: RwLock::new(HashMap::new()),
        }
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<HashMap<String, FinancialGoal>>, anyhow::Error> {
        self.goals
            .read()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }

    fn write_lock(
        &self,
    ) -> Result<RwLockWriteGuard<HashMap<String, FinancialGoal>>, anyhow::Error> {
        self.goals
            .write()
            .map_err(|_| anyhow!("Unable to acquire lock"))
    }
}

#[async_trait]
impl GoalRepo for MemGoalRepo {
    async fn get_goal(&self, goal_id: &str) -> Result<FinancialGoal, GoalRepoError> {
        self.read_lock()?
            .get(goal_id)
            .cloned()
            .ok_or_else(|| GoalNotFound(goal_id.to_owned()))
    }

    async fn get_goals(&self, user_id: &str) -> Result<Vec<FinancialGoal>, GoalRepoError> {
        let mut goals: Vec<FinancialGoal> = self
            .read_lock()?
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn create_goal(
        &self,
        user_id: &str,
        new_goal: NewGoal,
    ) -> Result<FinancialGoal, GoalRepoError> {
        let goal = new_goal.into_goal(crate::new_id(), user_id.to_owned(), Utc::now());
        self.write_lock()?.insert(goal.id.clone(), goal.clone());
        Ok(goal)
    }

    async fn update_goal(
        &self,
        goal_id: &str,
        update: GoalUpdate,
    ) -> Result<FinancialGoal, GoalRepoError> {
        let mut write_guard = self.write_lock()?;

        let goal = write_guard
            .get_mut(goal_id)
            .ok_or_else(|| GoalNotFound(goal_id.to_owned()))?;
        update.apply(goal, Utc::now());
        Ok(goal.clone())
    }

    async fn delete_goal(&self, goal_id: &str) -> Result<(), GoalRepoError> {
        self.write_lock()?
            .remove(goal_id)
            .map(|_| ())
            .ok_or_else(|| GoalNotFound(goal_id.to_owned()))
    }

    async fn delete_user_goals(&self, user_id: &str) -> Result<(), GoalRepoError> {
        self.write_lock()?.retain(|_, goal| goal.user_id != user_id);
        Ok(())
    }
}
