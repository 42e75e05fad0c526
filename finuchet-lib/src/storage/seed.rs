use crate::auth::password;
use crate::config::SeedConfig;
use crate::error::HandlerError;
use finuchet_repo::category_repo::{CategoryRepo, NewCategory};
use finuchet_repo::transaction_repo::TransactionKind;
use finuchet_repo::user_repo::{NewUser, Role, User, UserRepo, UserRepoError};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

const INCOME_CATEGORIES: [(&str, &str, &str); 4] = [
    ("Salary", "#4CAF50", "wallet"),
    ("Freelance", "#2196F3", "laptop"),
    ("Investments", "#9C27B0", "trending-up"),
    ("Gifts", "#E91E63", "gift"),
];

const EXPENSE_CATEGORIES: [(&str, &str, &str); 6] = [
    ("Groceries", "#FF5722", "shopping-cart"),
    ("Transport", "#795548", "car"),
    ("Entertainment", "#FFC107", "film"),
    ("Restaurants", "#FF9800", "coffee"),
    ("Utilities", "#607D8B", "home"),
    ("Health", "#F44336", "activity"),
];

#[derive(Serialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeedReport {
    pub success: bool,
    pub created_users: Vec<String>,
    pub created_categories: usize,
}

async fn ensure_user(
    user_repo: &Arc<dyn UserRepo>,
    email: &str,
    name: &str,
    password: &str,
    role: Role,
    created: &mut Vec<String>,
) -> Result<User, HandlerError> {
    let email = email.trim().to_lowercase();
    match user_repo.get_user_by_email(&email).await {
        Ok(user) => return Ok(user),
        Err(UserRepoError::UserNotFound(_)) => {}
        Err(e) => return Err(e.into()),
    }

    let password_hash = password::encode_password(password)?;
    let user = user_repo
        .create_user(
            NewUser::new(email.clone(), Some(name.to_owned()), Some(password_hash)).with_role(role),
        )
        .await?;
    info!(%email, %role, "Seeded user");
    created.push(email);
    Ok(user)
}

/// Creates the configured admin and demo users and the demo user's default categories. Anything
/// that already exists is left alone, so seeding twice is harmless.
pub async fn seed(
    user_repo: &Arc<dyn UserRepo>,
    category_repo: &Arc<dyn CategoryRepo>,
    config: &SeedConfig,
) -> Result<SeedReport, HandlerError> {
    let mut created_users = Vec::new();
    ensure_user(
        user_repo,
        &config.admin_email,
        "Administrator",
        &config.admin_password,
        Role::Admin,
        &mut created_users,
    )
    .await?;
    let demo = ensure_user(
        user_repo,
        &config.demo_email,
        "Demo User",
        &config.demo_password,
        Role::User,
        &mut created_users,
    )
    .await?;

    let defaults = INCOME_CATEGORIES
        .iter()
        .map(|c| (TransactionKind::Income, c))
        .chain(
            EXPENSE_CATEGORIES
                .iter()
                .map(|c| (TransactionKind::Expense, c)),
        );
    let mut created_categories = 0;
    for (kind, (name, color, icon)) in defaults {
        if category_repo
            .find_category(&demo.id, name, kind)
            .await?
            .is_some()
        {
            continue;
        }
        category_repo
            .create_category(
                &demo.id,
                NewCategory::new(
                    name.to_string(),
                    kind,
                    Some(color.to_string()),
                    Some(icon.to_string()),
                ),
            )
            .await?;
        created_categories += 1;
    }

    Ok(SeedReport {
        success: true,
        created_users,
        created_categories,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SeedConfig {
        SeedConfig {
            admin_email: "Admin@Example.com".to_owned(),
            admin_password: "admin-pass".to_owned(),
            demo_email: "demo@example.com".to_owned(),
            demo_password: "demo-pass".to_owned(),
        }
    }

    #[actix_rt::test]
    async fn seeding_twice() {
        let repos = finuchet_repo::mem_repo::create_repos();
        let first = seed(&repos.user_repo, &repos.category_repo, &config())
            .await
            .unwrap();
        assert_eq!(
            first.created_users,
            vec!["admin@example.com".to_owned(), "demo@example.com".to_owned()]
        );
        assert_eq!(first.created_categories, 10);

        let second = seed(&repos.user_repo, &repos.category_repo, &config())
            .await
            .unwrap();
        assert!(second.created_users.is_empty());
        assert_eq!(second.created_categories, 0);

        let admin = repos
            .user_repo
            .get_user_by_email("admin@example.com")
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
        let hash = admin.password_hash.unwrap();
        assert!(password::verify_password("admin-pass", &hash).unwrap());
    }
}
