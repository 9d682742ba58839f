//! Accessible-set aggregation

use std::collections::BTreeSet;

use mediahub::models::{AccessLevel, GrantKind, Role};

use crate::common::{actor, ids, seed_album, seed_grant, seed_people, seed_project, TestApp};

#[tokio::test]
async fn test_owned_and_granted_project_appears_once() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let owned = seed_project(&app.state.db, ids::OWNER, "Owned").await;
    seed_grant(
        &app.state.db,
        GrantKind::ProjectAccess,
        &owned.id,
        ids::OWNER,
        AccessLevel::Read,
    )
    .await;
    seed_grant(
        &app.state.db,
        GrantKind::ClientProjectAccess,
        &owned.id,
        ids::OWNER,
        AccessLevel::Write,
    )
    .await;

    let ids = app
        .state
        .access
        .accessible_project_ids(&actor(ids::OWNER, Role::Pro))
        .await
        .unwrap();
    assert_eq!(ids, BTreeSet::from([owned.id]));
}

#[tokio::test]
async fn test_accessible_projects_match_resolver() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let pool = &app.state.db;

    let mine = seed_project(pool, ids::COLLABORATOR, "Mine").await;
    let internal = seed_project(pool, ids::OWNER, "Internal").await;
    let client = seed_project(pool, ids::OWNER, "Client").await;
    let hidden = seed_project(pool, ids::OWNER, "Hidden").await;
    seed_grant(pool, GrantKind::ProjectAccess, &internal.id, ids::COLLABORATOR, AccessLevel::Read).await;
    seed_grant(pool, GrantKind::ClientProjectAccess, &client.id, ids::COLLABORATOR, AccessLevel::Full).await;
    seed_grant(pool, GrantKind::ProjectAccess, &hidden.id, ids::OUTSIDER, AccessLevel::Full).await;

    let who = actor(ids::COLLABORATOR, Role::Pro);
    let visible = app.state.access.accessible_project_ids(&who).await.unwrap();

    assert_eq!(
        visible,
        BTreeSet::from([mine.id.clone(), internal.id.clone(), client.id.clone()])
    );

    for project in [&mine, &internal, &client, &hidden] {
        let decision = app
            .state
            .access
            .check_project_access(&project.id, &who)
            .await
            .unwrap();
        assert_eq!(
            decision.has_access(),
            visible.contains(&project.id),
            "resolver and aggregator disagree on {}",
            project.name
        );
    }
}

#[tokio::test]
async fn test_admin_sees_every_project() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let a = seed_project(&app.state.db, ids::OWNER, "A").await;
    let b = seed_project(&app.state.db, ids::COLLABORATOR, "B").await;

    let visible = app
        .state
        .access
        .accessible_project_ids(&actor(ids::ADMIN, Role::SuperAdmin))
        .await
        .unwrap();
    assert_eq!(visible, BTreeSet::from([a.id, b.id]));
}

#[tokio::test]
async fn test_no_projects_is_empty_not_error() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;

    let visible = app
        .state
        .access
        .accessible_project_ids(&actor(ids::OUTSIDER, Role::Pro))
        .await
        .unwrap();
    assert!(visible.is_empty());
}

#[tokio::test]
async fn test_accessible_albums_match_resolver() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let pool = &app.state.db;

    let shared_project = seed_project(pool, ids::OWNER, "Shared").await;
    let private_project = seed_project(pool, ids::OWNER, "Private").await;
    seed_grant(pool, GrantKind::ClientProjectAccess, &shared_project.id, ids::CLIENT, AccessLevel::Read).await;

    let in_shared = seed_album(pool, ids::OWNER, "In shared", Some(&shared_project.id)).await;
    let in_private = seed_album(pool, ids::OWNER, "In private", Some(&private_project.id)).await;
    let granted = seed_album(pool, ids::OWNER, "Granted", None).await;
    let standalone = seed_album(pool, ids::OWNER, "Standalone", None).await;
    seed_grant(pool, GrantKind::ClientAlbumAccess, &granted.id, ids::CLIENT, AccessLevel::Write).await;

    let client = actor(ids::CLIENT, Role::Client);
    let visible = app.state.access.accessible_album_ids(&client).await.unwrap();
    assert_eq!(
        visible,
        BTreeSet::from([in_shared.id.clone(), granted.id.clone()])
    );

    for album in [&in_shared, &in_private, &granted, &standalone] {
        let decision = app
            .state
            .access
            .check_album_access(&album.id, &client)
            .await
            .unwrap();
        assert_eq!(decision.has_access(), visible.contains(&album.id));
    }
}
