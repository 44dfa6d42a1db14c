use stencil_core::model::fields::{FieldDescriptor, FieldKind, DEFAULT_EXCLUDED_FIELDS};
use stencil_core::{Entity, Named, User};

#[test]
fn default_exclusions_remove_exactly_four_names() {
    for (concrete, names) in [
        (Named::schema().model_fields(), Named::schema().model_field_names(&[])),
        (User::schema().model_fields(), User::schema().model_field_names(&[])),
    ] {
        assert_eq!(names.len(), concrete.len() - 4);
        let mut removed: Vec<&str> = concrete
            .iter()
            .map(|field| field.name)
            .filter(|name| !names.contains(name))
            .collect();
        let mut expected = DEFAULT_EXCLUDED_FIELDS.to_vec();
        removed.sort_unstable();
        expected.sort_unstable();
        assert_eq!(removed, expected);
    }
}

#[test]
fn extra_exclusions_are_applied_on_top() {
    let names = Named::schema().model_field_names(&["uuid", "description"]);
    assert!(!names.contains(&"uuid"));
    assert!(!names.contains(&"description"));
    assert!(names.contains(&"identity"));
}

#[test]
fn relational_fields_only_show_in_the_full_set() {
    let schema = Named::schema();
    assert!(schema.all_model_fields().iter().any(|field| field.name == "tags"));
    assert!(schema.model_fields().iter().all(|field| field.name != "tags"));

    let user_fields = User::schema();
    assert_eq!(
        user_fields.all_model_fields().len() - user_fields.model_fields().len(),
        2
    );
}

#[test]
fn field_lookup_falls_back_instead_of_failing() {
    let fallback = FieldDescriptor::optional("fallback", FieldKind::Text);
    let schema = Named::schema();

    assert_eq!(schema.model_field_or("identity", &fallback).name, "identity");
    assert_eq!(schema.model_field_or("population", &fallback).name, "fallback");
    assert!(schema.model_field("population").is_none());
    assert_eq!(
        schema.model_field("created_by").map(|field| field.kind),
        Some(FieldKind::UserRef)
    );
}
