//! Registry and grant expansion tests

use super::declaration::{ActionKey, FieldSpec, FieldValue, RoleDeclaration, Wildcard};
use super::registry::RoleRegistry;
use crate::error::AuthzError;
use crate::restriction::RestrictionTable;
use crate::schema::StaticSchema;
use crate::types::{Action, FieldKind};
use test_case::test_case;

fn schema() -> StaticSchema {
    StaticSchema::new()
        .resource("user", ["id", "name", "email", "created_at", "updated_at"])
        .association("user", "posts", "post")
        .association("user", "avatar", "image")
}

// ============================================================================
// Wildcard Expansion
// ============================================================================

#[test_case(Wildcard::ShowAll, &[Action::Show] ; "show_all grants show only")]
#[test_case(Wildcard::SaveAll, &[Action::Show, Action::Create, Action::Update] ; "save_all grants every action")]
#[test_case(Wildcard::CreateAll, &[Action::Show, Action::Create] ; "create_all grants show and create")]
#[test_case(Wildcard::UpdateAll, &[Action::Show, Action::Update] ; "update_all grants show and update")]
fn test_wildcard_action_matrix(wildcard: Wildcard, expected: &[Action]) {
    let registry = RoleRegistry::builder("user")
        .role(RoleDeclaration::new("role").attributes(wildcard))
        .build(&schema())
        .unwrap();

    let grant = registry.lookup("role").unwrap().grant();
    let actions: Vec<Action> = grant.attributes.keys().copied().collect();
    assert_eq!(actions, expected);
}

#[test]
fn test_save_all_restricts_each_action_independently() {
    let restrictions = RestrictionTable::defaults()
        .replace(Action::Show, FieldKind::Attributes, ["email"])
        .replace(Action::Update, FieldKind::Attributes, ["id", "name"]);

    let registry = RoleRegistry::builder("user")
        .restrictions(restrictions)
        .role(
            RoleDeclaration::new("admin")
                .attributes(Wildcard::SaveAll)
                .associations(Wildcard::SaveAll),
        )
        .build(&schema())
        .unwrap();

    let grant = registry.lookup("admin").unwrap().grant();
    assert_eq!(
        grant.attributes[&Action::Show],
        ["id", "name", "created_at", "updated_at"]
    );
    assert_eq!(grant.attributes[&Action::Create], ["name", "email"]);
    assert_eq!(
        grant.attributes[&Action::Update],
        ["email", "created_at", "updated_at"]
    );
    assert_eq!(grant.associations[&Action::Update], ["posts", "avatar"]);
}

#[test]
fn test_show_all_on_unrestricted_set() {
    let schema = StaticSchema::new().resource("thing", ["a", "b", "c"]);
    let registry = RoleRegistry::builder("thing")
        .role(RoleDeclaration::new("reader").attributes(Wildcard::ShowAll))
        .build(&schema)
        .unwrap();

    let grant = registry.lookup("reader").unwrap().grant();
    assert_eq!(grant.attributes.len(), 1);
    assert_eq!(grant.attributes[&Action::Show], ["a", "b", "c"]);
}

#[test]
fn test_all_minus_does_not_reapply_restrictions() {
    let schema = StaticSchema::new().resource("thing", ["a", "b", "x", "id"]);
    let registry = RoleRegistry::builder("thing")
        .role(
            RoleDeclaration::new("writer")
                .attributes(FieldSpec::explicit().with(ActionKey::Create, FieldValue::all_minus(["x"]))),
        )
        .build(&schema)
        .unwrap();

    let grant = registry.lookup("writer").unwrap().grant();
    assert_eq!(grant.attributes[&Action::Create], ["a", "b", "id"]);
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_guest_is_registered_implicitly() {
    let registry = RoleRegistry::builder("user")
        .role(RoleDeclaration::new("admin").attributes(Wildcard::ShowAll))
        .build(&schema())
        .unwrap();

    let guest = registry.lookup("guest").unwrap();
    assert!(guest.grant().attributes.is_empty());
    assert_eq!(registry.role_names().collect::<Vec<_>>(), vec!["admin", "guest"]);
}

#[test]
fn test_declared_guest_keeps_its_grant() {
    let registry = RoleRegistry::builder("user")
        .role(RoleDeclaration::new("guest").attributes(FieldSpec::explicit().show(["name"])))
        .build(&schema())
        .unwrap();

    assert_eq!(registry.role_count(), 1);
    assert_eq!(
        registry.lookup("guest").unwrap().grant().attributes[&Action::Show],
        ["name"]
    );
}

#[test]
fn test_duplicate_role_is_configuration_error() {
    let err = RoleRegistry::builder("user")
        .role(RoleDeclaration::new("admin"))
        .role(RoleDeclaration::new("admin"))
        .build(&schema())
        .unwrap_err();

    assert!(matches!(err, AuthzError::Configuration(ref msg) if msg.contains("declared twice")));
}

#[test]
fn test_empty_role_name_is_configuration_error() {
    let err = RoleRegistry::builder("user")
        .role(RoleDeclaration::new(" "))
        .build(&schema())
        .unwrap_err();

    assert!(matches!(err, AuthzError::Configuration(_)));
}

#[test]
fn test_wildcard_on_unknown_resource_fails_at_build() {
    let err = RoleRegistry::builder("ghost")
        .role(RoleDeclaration::new("admin").associations(Wildcard::ShowAll))
        .build(&schema())
        .unwrap_err();

    assert!(matches!(err, AuthzError::Configuration(ref msg) if msg.contains("ghost")));
}

#[test]
fn test_lookup_unknown_role() {
    let registry = RoleRegistry::builder("user").build(&schema()).unwrap();
    assert!(registry.lookup("nobody").is_err());
    assert!(!registry.contains("nobody"));
}

// ============================================================================
// Associated-as Aliases
// ============================================================================

#[test]
fn test_per_association_aliases() {
    let registry = RoleRegistry::builder("user")
        .role(
            RoleDeclaration::new("owner")
                .associations(FieldSpec::explicit().show(["posts", "avatar"]))
                .associated_as("posts", ["author"]),
        )
        .default_associated_roles("avatar", ["viewer"])
        .build(&schema())
        .unwrap();

    assert_eq!(registry.associated_roles("owner", "posts").unwrap(), vec!["author"]);
    assert_eq!(registry.associated_roles("owner", "avatar").unwrap(), vec!["viewer"]);
    assert!(registry.associated_roles("owner", "comments").is_none());

    let summary = &registry.lookup("owner").unwrap().permissions().roles;
    assert_eq!(summary.for_current_model, vec!["owner"]);
    assert_eq!(summary.for_associated_models["posts"], vec!["author"]);
    assert_eq!(summary.for_associated_models["avatar"], vec!["viewer"]);
}

#[test]
fn test_uniform_and_self_aliases_cover_granted_associations() {
    let registry = RoleRegistry::builder("user")
        .role(
            RoleDeclaration::new("admin")
                .associations(Wildcard::ShowAll)
                .associated_as_self(),
        )
        .role(
            RoleDeclaration::new("moderator")
                .associations(FieldSpec::explicit().show(["posts"]))
                .associated_as_everywhere(["reviewer", "reader"]),
        )
        .build(&schema())
        .unwrap();

    let admin = &registry.lookup("admin").unwrap().permissions().roles;
    assert_eq!(admin.for_associated_models["posts"], vec!["admin"]);
    assert_eq!(admin.for_associated_models["avatar"], vec!["admin"]);

    let moderator = &registry.lookup("moderator").unwrap().permissions().roles;
    assert_eq!(moderator.for_associated_models.len(), 1);
    assert_eq!(
        moderator.for_associated_models["posts"],
        vec!["reviewer", "reader"]
    );
}

#[test]
fn test_fallback_associated_roles() {
    let registry = RoleRegistry::builder("user")
        .role(RoleDeclaration::new("member").associations(FieldSpec::explicit().show(["posts"])))
        .default_associated_roles("avatar", ["owner"])
        .fallback_associated_roles(["public"])
        .build(&schema())
        .unwrap();

    assert_eq!(registry.default_associated_roles("avatar").unwrap(), ["owner"]);
    assert_eq!(registry.default_associated_roles("posts").unwrap(), ["public"]);
    assert_eq!(registry.associated_roles("member", "posts").unwrap(), vec!["public"]);
}

#[test]
fn test_association_alias_table() {
    let registry = RoleRegistry::builder("user")
        .association_alias("assoc", "associated_permission")
        .build(&schema())
        .unwrap();

    assert_eq!(registry.association_alias("assoc"), Some("associated_permission"));
    assert_eq!(registry.association_alias("posts"), None);
}
