mod common;

use sqlx::SqlitePool;
use uuid::Uuid;

use folder_access::authz::{resolver, Resource, Role};

use common::{chain, folder, grant_direct, seed_provider, seed_user, workflow};

#[sqlx::test]
async fn direct_owner_grant_on_workflow_resolves_without_inheritance(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let w = workflow(&pool, Uuid::new_v4(), "Standalone", None).await;
    grant_direct(&pool, user, Resource::workflow(w), Role::Owner).await;

    let mut conn = pool.acquire().await.unwrap();
    let access = resolver::resolve_access(&mut conn, user, Resource::workflow(w))
        .await
        .unwrap()
        .expect("direct grant resolves");

    assert_eq!(access.role, Role::Owner);
    assert_eq!(access.inherited_from, None);
    assert!(access.tuple_id.is_some());
}

#[sqlx::test]
async fn owner_on_top_folder_flows_down_three_levels(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, user, Resource::folder(tree.a), Role::Owner).await;

    let mut conn = pool.acquire().await.unwrap();
    let access = resolver::resolve_access(&mut conn, user, Resource::workflow(tree.w))
        .await
        .unwrap()
        .expect("inherited grant resolves");
    assert_eq!(access.role, Role::Owner);
    assert_eq!(access.inherited_from, Some(tree.a));

    for folder_id in [tree.b, tree.c] {
        let role = resolver::effective_role(&mut conn, user, Resource::folder(folder_id))
            .await
            .unwrap();
        assert_eq!(role, Some(Role::Owner));
    }
}

#[sqlx::test]
async fn inherited_owner_beats_direct_user(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, user, Resource::workflow(tree.w), Role::User).await;
    grant_direct(&pool, user, Resource::folder(tree.b), Role::Owner).await;

    let mut conn = pool.acquire().await.unwrap();
    let access = resolver::resolve_access(&mut conn, user, Resource::workflow(tree.w))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(access.role, Role::Owner);
    assert_eq!(access.inherited_from, Some(tree.b));
}

#[sqlx::test]
async fn direct_grant_wins_ties_and_nearest_ancestor_is_reported(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, user, Resource::folder(tree.a), Role::User).await;
    grant_direct(&pool, user, Resource::folder(tree.c), Role::User).await;

    let mut conn = pool.acquire().await.unwrap();

    let on_workflow = resolver::resolve_access(&mut conn, user, Resource::workflow(tree.w))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(on_workflow.role, Role::User);
    assert_eq!(on_workflow.inherited_from, Some(tree.c));

    let on_c = resolver::resolve_access(&mut conn, user, Resource::folder(tree.c))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(on_c.role, Role::User);
    assert_eq!(on_c.inherited_from, None, "direct tuple on C wins the tie with A");
}

#[sqlx::test]
async fn grants_below_a_folder_do_not_flow_upward(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, user, Resource::folder(tree.c), Role::Owner).await;
    grant_direct(&pool, user, Resource::workflow(tree.w), Role::Owner).await;

    let mut conn = pool.acquire().await.unwrap();
    for folder_id in [tree.a, tree.b] {
        let role = resolver::effective_role(&mut conn, user, Resource::folder(folder_id))
            .await
            .unwrap();
        assert_eq!(role, None);
    }
}

#[sqlx::test]
async fn providers_only_honour_direct_grants(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let tree = chain(&pool).await;
    let provider = seed_provider(&pool, tree.namespace_id, "warehouse").await;
    grant_direct(&pool, user, Resource::folder(tree.a), Role::Owner).await;

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(
        resolver::effective_role(&mut conn, user, Resource::provider(provider))
            .await
            .unwrap(),
        None
    );

    drop(conn);
    grant_direct(&pool, user, Resource::provider(provider), Role::User).await;

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(
        resolver::effective_role(&mut conn, user, Resource::provider(provider))
            .await
            .unwrap(),
        Some(Role::User)
    );
}

#[sqlx::test]
async fn unknown_resource_resolves_to_none(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;

    let mut conn = pool.acquire().await.unwrap();
    for resource in [
        Resource::folder(Uuid::new_v4()),
        Resource::workflow(Uuid::new_v4()),
        Resource::provider(Uuid::new_v4()),
    ] {
        assert_eq!(resolver::effective_role(&mut conn, user, resource).await.unwrap(), None);
    }
}

#[sqlx::test]
async fn root_workflow_has_no_inheritance_chain(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let namespace_id = Uuid::new_v4();
    let top = folder(&pool, namespace_id, "Top", None).await;
    let loose = workflow(&pool, namespace_id, "Loose", None).await;
    grant_direct(&pool, user, Resource::folder(top), Role::Owner).await;

    let mut conn = pool.acquire().await.unwrap();
    assert_eq!(
        resolver::effective_role(&mut conn, user, Resource::workflow(loose))
            .await
            .unwrap(),
        None
    );
}

#[sqlx::test]
async fn resolution_terminates_on_a_corrupted_cyclic_tree(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, user, Resource::folder(tree.b), Role::Owner).await;

    // bypass move validation to plant A -> C
    sqlx::query("UPDATE folders SET parent_folder_id = ? WHERE id = ?")
        .bind(tree.c.to_string())
        .bind(tree.a.to_string())
        .execute(&pool)
        .await
        .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let access = resolver::resolve_access(&mut conn, user, Resource::workflow(tree.w))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(access.role, Role::Owner);
    assert_eq!(access.inherited_from, Some(tree.b));
}

#[sqlx::test]
async fn require_role_distinguishes_owner_from_user(pool: SqlitePool) {
    let user = seed_user(&pool, "ada@example.com").await;
    let tree = chain(&pool).await;
    grant_direct(&pool, user, Resource::folder(tree.a), Role::User).await;

    let mut conn = pool.acquire().await.unwrap();
    let w = Resource::workflow(tree.w);

    assert_eq!(
        resolver::require_role(&mut conn, user, w, Role::User).await.unwrap(),
        Role::User
    );
    let err = resolver::require_role(&mut conn, user, w, Role::Owner).await.unwrap_err();
    assert!(matches!(err, folder_access::errors::AppError::Forbidden(_)));
}
