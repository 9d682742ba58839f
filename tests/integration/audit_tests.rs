//! Audit recorder against a real database

use mediahub::{
    db::{AuditRepository, UserRepository},
    models::{
        AccessLevel, AuditAction, AuditEntityType, AuditEvent, AuditLogQuery, AuditMetadata,
        GrantKind, Role, ANONYMOUS_USER_ID, SYSTEM_USER_ID,
    },
};

use crate::common::{
    actor, audit_count, ids, seed_album, seed_grant, seed_people, seed_project, seed_user,
    test_config, TestApp,
};

async fn all_logs(app: &TestApp) -> Vec<mediahub::models::AuditLogEntry> {
    AuditRepository::new(&app.state.db)
        .list(&AuditLogQuery::default())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_record_denormalizes_actor() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;

    app.state.audit.log_project_created(ids::OWNER, &project).await;

    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 1);
    let entry = &logs[0];
    assert_eq!(entry.action, AuditAction::ProjectCreated);
    assert_eq!(entry.entity_type, AuditEntityType::Project);
    assert_eq!(entry.entity_id, project.id);
    assert_eq!(entry.user_id.as_deref(), Some(ids::OWNER));
    assert_eq!(entry.user_email.as_deref(), Some("user-1@example.com"));
    assert_eq!(entry.user_name.as_deref(), Some("Olivia"));
    assert_eq!(entry.user_role.as_deref(), Some("PRO"));
    assert_eq!(entry.description, "Created project \"Wedding\"");
    assert_eq!(entry.new_value.as_ref().unwrap()["name"], "Wedding");
}

#[tokio::test]
async fn test_unknown_user_is_recorded_with_null_identity() {
    let app = TestApp::new().await;

    let event = AuditEvent::new(AuditAction::ProjectDeleted, AuditEntityType::Project, "p-9")
        .by("ghost")
        .with_metadata(AuditMetadata::new().project_name("Old"));
    app.state.audit.record(event).await;

    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].user_id, None);
    assert_eq!(logs[0].user_email, None);
    assert_eq!(logs[0].user_name, None);
    assert_eq!(logs[0].user_role, None);
}

#[tokio::test]
async fn test_deleted_user_is_recorded_with_null_identity() {
    let app = TestApp::new().await;
    seed_user(&app.state.db, "leaver", Some("Lee"), Role::Pro).await;
    UserRepository::new(&app.state.db)
        .delete("leaver")
        .await
        .unwrap();

    let album_event = AuditEvent::new(AuditAction::AlbumDeleted, AuditEntityType::Album, "a-1")
        .by("leaver");
    app.state.audit.record(album_event).await;

    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].user_id, None);
}

#[tokio::test]
async fn test_system_actor_keeps_label_without_user_id() {
    let app = TestApp::new().await;

    let event = AuditEvent::new(AuditAction::UserDeleted, AuditEntityType::User, "u-5")
        .by(SYSTEM_USER_ID);
    app.state.audit.record(event).await;

    let logs = all_logs(&app).await;
    assert_eq!(logs[0].user_id, None);
    assert_eq!(logs[0].user_name.as_deref(), Some("system"));
}

#[tokio::test]
async fn test_anonymous_actor_is_recorded_without_user_id() {
    let app = TestApp::new().await;

    let event = AuditEvent::new(AuditAction::ImageDeleted, AuditEntityType::Image, "img-9")
        .by(ANONYMOUS_USER_ID);
    app.state.audit.record(event).await;

    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].user_id, None);
    assert_eq!(logs[0].user_email, None);
    assert_eq!(logs[0].user_role, None);
    assert_eq!(logs[0].user_name.as_deref(), Some("anonymous"));
}

#[tokio::test]
async fn test_empty_actor_id_leaves_identity_null() {
    let app = TestApp::new().await;

    let event =
        AuditEvent::new(AuditAction::ProjectDeleted, AuditEntityType::Project, "p-9").by("");
    app.state.audit.record(event).await;

    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].user_id, None);
    assert_eq!(logs[0].user_name, None);
    assert_eq!(logs[0].user_email, None);
}

#[tokio::test]
async fn test_client_access_helpers_record_one_row_each() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let grant = seed_grant(
        &app.state.db,
        GrantKind::ClientProjectAccess,
        &project.id,
        ids::CLIENT,
        AccessLevel::Read,
    )
    .await;
    let metadata = AuditMetadata::new()
        .project_name(&project.name)
        .target_user_name("Carla");

    app.state
        .audit
        .log_client_access_granted(ids::OWNER, &grant, metadata.clone())
        .await;
    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 1);
    let granted = &logs[0];
    assert_eq!(granted.action, AuditAction::ClientAccessGranted);
    assert_eq!(granted.entity_type, AuditEntityType::ClientProjectAccess);
    assert_eq!(granted.entity_id, project.id);
    assert_eq!(granted.user_id.as_deref(), Some(ids::OWNER));
    assert!(granted.old_value.is_none());
    let new_value = granted.new_value.as_ref().unwrap();
    assert_eq!(new_value["userId"], ids::CLIENT);
    assert_eq!(new_value["accessLevel"], "READ");
    assert!(granted.description.contains("Carla"));

    app.state
        .audit
        .log_client_access_revoked(ids::OWNER, &grant, metadata)
        .await;
    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 2);
    let revoked = &logs[0];
    assert_eq!(revoked.action, AuditAction::ClientAccessRevoked);
    assert_eq!(revoked.entity_type, AuditEntityType::ClientProjectAccess);
    assert!(revoked.new_value.is_none());
    assert_eq!(revoked.old_value.as_ref().unwrap()["userId"], ids::CLIENT);
}

#[tokio::test]
async fn test_grant_history_is_queryable_by_project_id() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let other = seed_project(&app.state.db, ids::OWNER, "Portraits").await;
    let owner = actor(ids::OWNER, Role::Pro);
    let grants = &app.state.grants;

    grants
        .grant_project_access(&owner, &project.id, ids::COLLABORATOR, AccessLevel::Read)
        .await
        .unwrap();
    grants
        .grant_project_access(&owner, &project.id, ids::COLLABORATOR, AccessLevel::Write)
        .await
        .unwrap();
    grants
        .revoke_project_access(&owner, &project.id, ids::COLLABORATOR)
        .await
        .unwrap();
    grants
        .grant_project_access(&owner, &project.id, ids::COLLABORATOR, AccessLevel::Read)
        .await
        .unwrap();
    grants
        .grant_project_access(&owner, &other.id, ids::COLLABORATOR, AccessLevel::Read)
        .await
        .unwrap();

    let history = AuditRepository::new(&app.state.db)
        .list(&AuditLogQuery {
            entity_id: Some(project.id.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    let actions: Vec<AuditAction> = history.iter().map(|e| e.action.clone()).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::ProjectAccessGranted,
            AuditAction::ProjectAccessRevoked,
            AuditAction::ProjectAccessModified,
            AuditAction::ProjectAccessGranted,
        ]
    );
}

#[tokio::test]
async fn test_unknown_action_round_trips() {
    let app = TestApp::new().await;

    let event = AuditEvent::new(
        AuditAction::Other("WATERMARK_APPLIED".to_string()),
        AuditEntityType::Image,
        "img-1",
    )
    .with_metadata(AuditMetadata::new().extra("position", serde_json::json!("bottom-right")));
    app.state.audit.record(event).await;

    let logs = all_logs(&app).await;
    assert_eq!(
        logs[0].action,
        AuditAction::Other("WATERMARK_APPLIED".to_string())
    );
    assert_eq!(logs[0].description, "WATERMARK_APPLIED performed on IMAGE");
    assert_eq!(
        logs[0].metadata.as_ref().unwrap().extra["position"],
        "bottom-right"
    );
}

#[tokio::test]
async fn test_persistence_failure_does_not_propagate() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;

    sqlx::query("DROP TABLE audit_logs")
        .execute(&app.state.db)
        .await
        .unwrap();

    // Neither call may panic or return an error
    app.state.audit.log_project_deleted(ids::OWNER, &project).await;
    let outcome = app
        .state
        .grants
        .grant_client_project_access(
            &actor(ids::OWNER, Role::Pro),
            &project.id,
            ids::CLIENT,
            AccessLevel::Read,
        )
        .await
        .expect("grant must commit even when its audit row cannot be written");
    assert_eq!(outcome.grant().access_level, AccessLevel::Read);

    let stored = app
        .state
        .grants
        .list_grants(GrantKind::ClientProjectAccess, &project.id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_stale_enabled_flag_cannot_silence_grant_audits() {
    let yaml = "default_page_size: 50\nmax_page_size: 200\nenabled: false\n";
    let mut config = test_config();
    config.audit = serde_norway::from_str(yaml).unwrap();
    let app = TestApp::with_config(config).await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let owner = actor(ids::OWNER, Role::Pro);

    app.state
        .grants
        .grant_project_access(&owner, &project.id, ids::COLLABORATOR, AccessLevel::Write)
        .await
        .unwrap();
    app.state
        .grants
        .revoke_project_access(&owner, &project.id, ids::COLLABORATOR)
        .await
        .unwrap();

    let logs = all_logs(&app).await;
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].action, AuditAction::ProjectAccessRevoked);
    assert_eq!(logs[1].action, AuditAction::ProjectAccessGranted);
}

#[tokio::test]
async fn test_entries_are_immutable() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    app.state.audit.log_project_created(ids::OWNER, &project).await;

    let update = sqlx::query("UPDATE audit_logs SET description = 'rewritten'")
        .execute(&app.state.db)
        .await;
    assert!(update.is_err());

    let delete = sqlx::query("DELETE FROM audit_logs")
        .execute(&app.state.db)
        .await;
    assert!(delete.is_err());

    assert_eq!(audit_count(&app.state.db).await, 1);
}

#[tokio::test]
async fn test_list_filters_and_orders_newest_first() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;
    let project = seed_project(&app.state.db, ids::OWNER, "Wedding").await;
    let album = seed_album(&app.state.db, ids::OWNER, "Ceremony", Some(&project.id)).await;

    let audit = &app.state.audit;
    audit.log_project_created(ids::OWNER, &project).await;
    audit
        .log_album_created(ids::OWNER, &album, Some(&project.name))
        .await;
    audit
        .log_image_uploaded(ids::COLLABORATOR, "img-1", &album, "first-kiss.jpg")
        .await;
    audit
        .log_image_deleted(ids::COLLABORATOR, "img-1", &album, "first-kiss.jpg")
        .await;

    let repo = AuditRepository::new(&app.state.db);

    let everything = repo.list(&AuditLogQuery::default()).await.unwrap();
    let actions: Vec<_> = everything.iter().map(|e| e.action.clone()).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::ImageDeleted,
            AuditAction::ImageUploaded,
            AuditAction::AlbumCreated,
            AuditAction::ProjectCreated,
        ]
    );

    let by_user = repo
        .list(&AuditLogQuery {
            user_id: Some(ids::COLLABORATOR.to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_user.len(), 2);

    let images = repo
        .list(&AuditLogQuery {
            entity_type: Some("IMAGE".to_string()),
            action: Some("IMAGE_UPLOADED".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(
        images[0].metadata.as_ref().unwrap().file_name.as_deref(),
        Some("first-kiss.jpg")
    );

    let page = repo
        .list(&AuditLogQuery {
            limit: Some(1),
            offset: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].action, AuditAction::ImageUploaded);
}

#[tokio::test]
async fn test_role_change_is_described() {
    let app = TestApp::new().await;
    seed_people(&app.state.db).await;

    let user = UserRepository::new(&app.state.db)
        .update_role(ids::COLLABORATOR, Role::Admin)
        .await
        .unwrap()
        .unwrap();
    app.state
        .audit
        .log_user_role_changed(ids::ADMIN, &user, Role::Pro)
        .await;

    let logs = all_logs(&app).await;
    assert_eq!(logs[0].action, AuditAction::UserRoleChanged);
    assert_eq!(
        logs[0].description,
        "Changed user-2@example.com's role from PRO to ADMIN"
    );
    assert_eq!(logs[0].old_value.as_ref().unwrap()["role"], "PRO");
}
