mod utils;

use finuchet_repo::user_repo::{NewUser, Role, UserRepoError};
use rstest::rstest;
use utils::RepoType;
use uuid::Uuid;

fn new_user() -> NewUser {
    NewUser::new(
        format!("test-user-{}@example.com", Uuid::new_v4()),
        Some("Test".to_owned()),
        Some("not a real hash".to_owned()),
    )
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_create_and_get_user(#[case] repo_type: RepoType) {
    let Some(repos) = utils::build_repos(repo_type).await else {
        return;
    };
    let user_repo = repos.user_repo;

    let user = user_repo.create_user(new_user()).await.unwrap();
    assert_eq!(user.role, Role::User);

    let by_id = user_repo.get_user(&user.id).await.unwrap();
    assert_eq!(by_id.id, user.id);
    assert_eq!(by_id.email, user.email);
    assert_eq!(by_id.password_hash, user.password_hash);

    let by_email = user_repo.get_user_by_email(&user.email).await.unwrap();
    assert_eq!(by_email.id, user.id);

    user_repo.delete_user(&user.id).await.unwrap();
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_create_existing_user(#[case] repo_type: RepoType) {
    let Some(repos) = utils::build_repos(repo_type).await else {
        return;
    };
    let user_repo = repos.user_repo;

    let new_user = new_user();
    let user = user_repo.create_user(new_user.clone()).await.unwrap();

    let create_result = user_repo.create_user(new_user).await;
    assert!(matches!(
        create_result,
        Err(UserRepoError::UserAlreadyExists(_))
    ));

    user_repo.delete_user(&user.id).await.unwrap();
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_admin_role(#[case] repo_type: RepoType) {
    let Some(repos) = utils::build_repos(repo_type).await else {
        return;
    };
    let user_repo = repos.user_repo;

    let admin = user_repo
        .create_user(new_user().with_role(Role::Admin))
        .await
        .unwrap();
    let stored = user_repo.get_user(&admin.id).await.unwrap();
    assert_eq!(stored.role, Role::Admin);

    let users = user_repo.list_users().await.unwrap();
    assert!(users.iter().any(|u| u.id == admin.id));

    user_repo.delete_user(&admin.id).await.unwrap();
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_update_name_and_password(#[case] repo_type: RepoType) {
    let Some(repos) = utils::build_repos(repo_type).await else {
        return;
    };
    let user_repo = repos.user_repo;

    let user = user_repo.create_user(new_user()).await.unwrap();

    let renamed = user_repo.update_name(&user.id, "Renamed").await.unwrap();
    assert_eq!(renamed.name.as_deref(), Some("Renamed"));

    user_repo
        .update_password_hash(&user.id, "new hash")
        .await
        .unwrap();
    let stored = user_repo.get_user(&user.id).await.unwrap();
    assert_eq!(stored.password_hash.as_deref(), Some("new hash"));

    user_repo.delete_user(&user.id).await.unwrap();
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_update_invalid_user(#[case] repo_type: RepoType) {
    let Some(repos) = utils::build_repos(repo_type).await else {
        return;
    };
    let user_repo = repos.user_repo;

    assert!(matches!(
        user_repo
            .update_password_hash("invalid user", "new hash")
            .await,
        Err(UserRepoError::UserNotFound(_))
    ));
    assert!(matches!(
        user_repo.update_name("invalid user", "name").await,
        Err(UserRepoError::UserNotFound(_))
    ));
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_delete_user(#[case] repo_type: RepoType) {
    let Some(repos) = utils::build_repos(repo_type).await else {
        return;
    };
    let user_repo = repos.user_repo;

    let user = user_repo.create_user(new_user()).await.unwrap();
    user_repo.delete_user(&user.id).await.unwrap();

    assert!(user_repo.get_user(&user.id).await.is_err());
    assert!(user_repo.get_user_by_email(&user.email).await.is_err());

    // the email is free again
    let again = user_repo
        .create_user(NewUser::new(user.email.clone(), None, None))
        .await
        .unwrap();
    user_repo.delete_user(&again.id).await.unwrap();
}

#[rstest]
#[case::sqlx(RepoType::SQLx)]
#[case::mem(RepoType::Mem)]
#[actix_rt::test]
async fn test_delete_invalid_user(#[case] repo_type: RepoType) {
    let Some(repos) = utils::build_repos(repo_type).await else {
        return;
    };

    let delete_result = repos.user_repo.delete_user("test-user").await;
    assert!(matches!(
        delete_result,
        Err(UserRepoError::UserNotFound(_))
    ));
}
