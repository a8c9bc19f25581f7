mod common;

use sqlx::SqlitePool;
use uuid::Uuid;

use folder_access::authz::{grants, resolver, tuples, Principal, Resource, Role};
use folder_access::errors::AppError;

use common::{chain, grant_direct, seed_provider, seed_user};

#[sqlx::test]
async fn owner_can_grant_and_regrant_overwrites(pool: SqlitePool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let user = seed_user(&pool, "user@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, owner, Resource::folder(tree.a), Role::Owner).await;

    let mut tx = pool.begin().await.unwrap();
    let first = grants::grant(&mut tx, owner, user, Resource::workflow(tree.w), Role::User)
        .await
        .unwrap();
    let second = grants::grant(&mut tx, owner, user, Resource::workflow(tree.w), Role::Owner)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(first.tuple_id, second.tuple_id, "re-grant updates the same tuple");
    assert_eq!(second.role, Role::Owner);
    assert_eq!(second.inherited_from, None);

    let mut conn = pool.acquire().await.unwrap();
    let on_workflow = tuples::find_by_resource(&mut conn, Resource::workflow(tree.w), None)
        .await
        .unwrap();
    assert_eq!(on_workflow.len(), 1);
}

#[sqlx::test]
async fn non_owner_is_forbidden(pool: SqlitePool) {
    let viewer = seed_user(&pool, "viewer@example.com").await;
    let user = seed_user(&pool, "user@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, viewer, Resource::folder(tree.a), Role::User).await;

    let mut conn = pool.acquire().await.unwrap();
    let err = grants::grant(&mut conn, viewer, user, Resource::folder(tree.b), Role::User)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = grants::revoke(&mut conn, viewer, viewer, Resource::folder(tree.a))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[sqlx::test]
async fn missing_resource_or_principal_is_not_found(pool: SqlitePool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, owner, Resource::folder(tree.a), Role::Owner).await;

    let mut conn = pool.acquire().await.unwrap();

    let err = grants::grant(&mut conn, owner, owner, Resource::workflow(Uuid::new_v4()), Role::User)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let ghost = Principal::user(Uuid::new_v4());
    let err = grants::grant(&mut conn, owner, ghost, Resource::folder(tree.b), Role::User)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[sqlx::test]
async fn revoke_only_removes_direct_grants(pool: SqlitePool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let user = seed_user(&pool, "user@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, owner, Resource::folder(tree.a), Role::Owner).await;
    grant_direct(&pool, user, Resource::folder(tree.a), Role::User).await;

    let mut conn = pool.acquire().await.unwrap();
    let err = grants::revoke(&mut conn, owner, user, Resource::workflow(tree.w))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert_eq!(
        resolver::effective_role(&mut conn, user, Resource::workflow(tree.w))
            .await
            .unwrap(),
        Some(Role::User)
    );

    grants::revoke(&mut conn, owner, user, Resource::folder(tree.a))
        .await
        .unwrap();
    assert_eq!(
        resolver::effective_role(&mut conn, user, Resource::workflow(tree.w))
            .await
            .unwrap(),
        None
    );
}

#[sqlx::test]
async fn update_role_requires_an_existing_tuple(pool: SqlitePool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let user = seed_user(&pool, "user@example.com").await;
    let provider = seed_provider(&pool, Uuid::new_v4(), "warehouse").await;
    grant_direct(&pool, owner, Resource::provider(provider), Role::Owner).await;

    let mut conn = pool.acquire().await.unwrap();
    let err = grants::update_role(&mut conn, owner, user, Resource::provider(provider), Role::Owner)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    drop(conn);
    grant_direct(&pool, user, Resource::provider(provider), Role::User).await;

    let mut conn = pool.acquire().await.unwrap();
    let updated = grants::update_role(&mut conn, owner, user, Resource::provider(provider), Role::Owner)
        .await
        .unwrap();
    assert_eq!(updated.role, Role::Owner);
}

#[sqlx::test]
async fn inherited_owner_may_grant_below(pool: SqlitePool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let user = seed_user(&pool, "user@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, owner, Resource::folder(tree.a), Role::Owner).await;

    let mut conn = pool.acquire().await.unwrap();
    let access = grants::grant(&mut conn, owner, user, Resource::folder(tree.c), Role::User)
        .await
        .unwrap();

    assert_eq!(access.resource(), Resource::folder(tree.c));
    assert_eq!(access.principal(), user);
}

#[sqlx::test]
async fn rolled_back_grant_leaves_no_tuple(pool: SqlitePool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let user = seed_user(&pool, "user@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, owner, Resource::folder(tree.a), Role::Owner).await;

    let mut tx = pool.begin().await.unwrap();
    grants::grant(&mut tx, owner, user, Resource::folder(tree.b), Role::User)
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let found = tuples::find(&mut conn, user, Resource::folder(tree.b)).await.unwrap();
    assert!(found.is_none());
}
