//! Step definitions for access resolution

use std::collections::BTreeSet;

use cucumber::{then, when};

use mediahub::models::{AccessCheck, AccessLevel, Role};

use crate::features::support::TestWorld;

#[when(expr = "{string} with role {word} checks access to project {string}")]
async fn check_project(world: &mut TestWorld, user_id: String, role: String, project: String) {
    let role: Role = role.parse().expect("unknown role in scenario");
    let actor = world.actor(&user_id, role);
    let project_id = world.project_id(&project);

    let decision = world
        .state()
        .access
        .check_project_access(&project_id, &actor)
        .await
        .expect("Access check failed");
    world.last_decision = Some(decision);
}

#[when(expr = "{string} with role {word} checks access to album {string}")]
async fn check_album(world: &mut TestWorld, user_id: String, role: String, album: String) {
    let role: Role = role.parse().expect("unknown role in scenario");
    let actor = world.actor(&user_id, role);
    let album_id = world.album_id(&album);

    let decision = world
        .state()
        .access
        .check_album_access(&album_id, &actor)
        .await
        .expect("Access check failed");
    world.last_decision = Some(decision);
}

#[then(expr = "access is granted at {word}")]
async fn granted_at(world: &mut TestWorld, level: String) {
    let expected: AccessLevel = level.parse().expect("unknown access level in scenario");
    let decision = world.last_decision.as_ref().expect("No access check ran");
    let check = AccessCheck::from(decision);

    assert!(check.has_access, "expected access, got {:?}", decision);
    assert_eq!(check.access_level, Some(expected));
    assert_eq!(check.reason, None);
}

#[then(expr = "access is denied with reason {string}")]
async fn denied_with(world: &mut TestWorld, reason: String) {
    let decision = world.last_decision.as_ref().expect("No access check ran");
    let check = AccessCheck::from(decision);

    assert!(!check.has_access, "expected no access, got {:?}", decision);
    assert_eq!(check.access_level, None);
    assert_eq!(check.reason.as_deref(), Some(reason.as_str()));
}

#[then(expr = "{string} with role {word} can see exactly the projects {string}")]
async fn sees_projects(world: &mut TestWorld, user_id: String, role: String, labels: String) {
    let role: Role = role.parse().expect("unknown role in scenario");
    let actor = world.actor(&user_id, role);

    let expected: BTreeSet<String> = labels
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| world.project_id(l))
        .collect();

    let actual = world
        .state()
        .access
        .accessible_project_ids(&actor)
        .await
        .expect("Aggregation failed");
    assert_eq!(actual, expected);
}
