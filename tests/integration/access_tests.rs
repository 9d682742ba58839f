//! Access resolution against a real database

use rstest::rstest;

use mediahub::models::{AccessCheck, AccessDecision, AccessLevel, EntityKind, GrantKind, Role};

use crate::common::{actor, ids, seed_album, seed_grant, seed_people, seed_project, seed_user, TestApp};

#[rstest]
#[case(Role::Admin)]
#[case(Role::SuperAdmin)]
#[tokio::test]
async fn test_admin_gets_full_access_without_grants(#[case] role: Role) {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let album = seed_album(&app.state.db, ids::OWNER, "Ceremony", None).await;

    let admin = actor(ids::ADMIN, role);
    let access = &app.state.access;

    assert_eq!(
        access.check_project_access(&project.id, &admin).await.unwrap(),
        AccessDecision::granted(AccessLevel::Full)
    );
    assert_eq!(
        access.check_album_access(&album.id, &admin).await.unwrap(),
        AccessDecision::granted(AccessLevel::Full)
    );
}

#[tokio::test]
async fn test_admin_short_circuits_missing_entities() {
    let app = TestApp::new().await;
    let admin = actor(ids::ADMIN, Role::Admin);

    let decision = app
        .state
        .access
        .check_project_access("does-not-exist", &admin)
        .await
        .unwrap();
    assert_eq!(decision.access_level(), Some(AccessLevel::Full));
}

#[rstest]
#[case(Role::User)]
#[case(Role::Pro)]
#[case(Role::Client)]
#[tokio::test]
async fn test_owner_gets_full_access(#[case] role: Role) {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;

    let decision = app
        .state
        .access
        .check_project_access(&project.id, &actor(ids::OWNER, role))
        .await
        .unwrap();
    assert_eq!(decision, AccessDecision::granted(AccessLevel::Full));
}

#[tokio::test]
async fn test_grant_and_denial_scenario() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let p1 = seed_project(&app.state.db, ids::OWNER, "P1").await;
    seed_grant(
        &app.state.db,
        GrantKind::ProjectAccess,
        &p1.id,
        ids::COLLABORATOR,
        AccessLevel::Read,
    )
    .await;

    let access = &app.state.access;

    let granted = access
        .check_project_access(&p1.id, &actor(ids::COLLABORATOR, Role::Pro))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(AccessCheck::from(&granted)).unwrap(),
        serde_json::json!({"hasAccess": true, "accessLevel": "READ"})
    );

    let denied = access
        .check_project_access(&p1.id, &actor(ids::OUTSIDER, Role::Pro))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(AccessCheck::from(&denied)).unwrap(),
        serde_json::json!({"hasAccess": false, "reason": "Access denied"})
    );
}

#[tokio::test]
async fn test_missing_entities_are_not_found() {
    let app = TestApp::new().await;
    let user = actor(ids::OUTSIDER, Role::Pro);

    let project = app
        .state
        .access
        .check_project_access("missing", &user)
        .await
        .unwrap();
    assert_eq!(project.reason(), Some("Project not found"));
    assert!(!project.has_access());

    let album = app
        .state
        .access
        .resolve(EntityKind::Album, "missing", &user)
        .await
        .unwrap();
    assert_eq!(album, AccessDecision::not_found(EntityKind::Album));
}

#[tokio::test]
async fn test_internal_and_client_grants_take_the_max() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    seed_grant(
        &app.state.db,
        GrantKind::ProjectAccess,
        &project.id,
        ids::COLLABORATOR,
        AccessLevel::Write,
    )
    .await;
    seed_grant(
        &app.state.db,
        GrantKind::ClientProjectAccess,
        &project.id,
        ids::COLLABORATOR,
        AccessLevel::Full,
    )
    .await;

    let decision = app
        .state
        .access
        .check_project_access(&project.id, &actor(ids::COLLABORATOR, Role::Pro))
        .await
        .unwrap();
    assert_eq!(decision.access_level(), Some(AccessLevel::Full));
}

#[tokio::test]
async fn test_standalone_album_client_grant() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let a1 = seed_album(&app.state.db, ids::OWNER, "A1", None).await;
    seed_grant(
        &app.state.db,
        GrantKind::ClientAlbumAccess,
        &a1.id,
        ids::CLIENT,
        AccessLevel::Write,
    )
    .await;

    let decision = app
        .state
        .access
        .check_album_access(&a1.id, &actor(ids::CLIENT, Role::Client))
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(AccessCheck::from(&decision)).unwrap(),
        serde_json::json!({"hasAccess": true, "accessLevel": "WRITE"})
    );
}

#[rstest]
#[case(ids::OWNER)]
#[case(ids::COLLABORATOR)]
#[case(ids::CLIENT)]
#[case(ids::OUTSIDER)]
#[tokio::test]
async fn test_album_without_direct_grant_mirrors_project(#[case] user_id: &str) {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let album = seed_album(&app.state.db, ids::OWNER, "Ceremony", Some(&project.id)).await;
    seed_grant(
        &app.state.db,
        GrantKind::ProjectAccess,
        &project.id,
        ids::COLLABORATOR,
        AccessLevel::Write,
    )
    .await;
    seed_grant(
        &app.state.db,
        GrantKind::ClientProjectAccess,
        &project.id,
        ids::CLIENT,
        AccessLevel::Read,
    )
    .await;

    let role = if user_id == ids::CLIENT {
        Role::Client
    } else {
        Role::Pro
    };
    let who = actor(user_id, role);
    let access = &app.state.access;

    let on_project = access.check_project_access(&project.id, &who).await.unwrap();
    let on_album = access.check_album_access(&album.id, &who).await.unwrap();

    assert_eq!(on_album.has_access(), on_project.has_access());
    assert_eq!(on_album.access_level(), on_project.access_level());
}

#[tokio::test]
async fn test_album_takes_higher_of_direct_and_inherited() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let album = seed_album(&app.state.db, ids::OWNER, "Ceremony", Some(&project.id)).await;
    seed_grant(
        &app.state.db,
        GrantKind::ClientProjectAccess,
        &project.id,
        ids::CLIENT,
        AccessLevel::Write,
    )
    .await;
    seed_grant(
        &app.state.db,
        GrantKind::ClientAlbumAccess,
        &album.id,
        ids::CLIENT,
        AccessLevel::Read,
    )
    .await;

    let client = actor(ids::CLIENT, Role::Client);
    let decision = app
        .state
        .access
        .check_album_access(&album.id, &client)
        .await
        .unwrap();
    assert_eq!(decision.access_level(), Some(AccessLevel::Write));

    // And the other way round
    seed_grant(
        &app.state.db,
        GrantKind::ClientAlbumAccess,
        &album.id,
        ids::CLIENT,
        AccessLevel::Full,
    )
    .await;
    let decision = app
        .state
        .access
        .check_album_access(&album.id, &client)
        .await
        .unwrap();
    assert_eq!(decision.access_level(), Some(AccessLevel::Full));
}

#[tokio::test]
async fn test_album_owner_gets_full_access() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let album = seed_album(&app.state.db, ids::COLLABORATOR, "Extras", Some(&project.id)).await;

    let decision = app
        .state
        .access
        .check_album_access(&album.id, &actor(ids::COLLABORATOR, Role::Pro))
        .await
        .unwrap();
    assert_eq!(decision, AccessDecision::granted(AccessLevel::Full));
}

#[tokio::test]
async fn test_album_in_deleted_project_falls_back_to_direct_grants() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let album = seed_album(&app.state.db, ids::OWNER, "Ceremony", Some(&project.id)).await;

    // Point the album at a project that no longer exists
    let mut conn = app.state.db.acquire().await.unwrap();
    sqlx::query("PRAGMA foreign_keys = OFF")
        .execute(&mut *conn)
        .await
        .unwrap();
    sqlx::query("UPDATE albums SET project_id = 'gone' WHERE id = ?")
        .bind(&album.id)
        .execute(&mut *conn)
        .await
        .unwrap();
    drop(conn);

    let decision = app
        .state
        .access
        .check_album_access(&album.id, &actor(ids::COLLABORATOR, Role::Pro))
        .await
        .unwrap();
    assert_eq!(decision, AccessDecision::denied());
}

#[tokio::test]
async fn test_grants_are_read_fresh_on_every_call() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let collaborator = actor(ids::COLLABORATOR, Role::Pro);
    let access = &app.state.access;

    assert!(!access
        .check_project_access(&project.id, &collaborator)
        .await
        .unwrap()
        .has_access());

    seed_grant(
        &app.state.db,
        GrantKind::ProjectAccess,
        &project.id,
        ids::COLLABORATOR,
        AccessLevel::Read,
    )
    .await;

    assert!(access
        .check_project_access(&project.id, &collaborator)
        .await
        .unwrap()
        .has_access());
}

#[tokio::test]
async fn test_unknown_user_is_denied() {
    let app = TestApp::new().await;
    seed_user(&app.state.db, ids::OWNER, None, Role::Pro).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;

    let decision = app
        .state
        .access
        .check_project_access(&project.id, &actor("nobody", Role::User))
        .await
        .unwrap();
    assert_eq!(decision, AccessDecision::denied());
}
