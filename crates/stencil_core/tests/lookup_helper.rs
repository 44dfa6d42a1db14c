//! Single-record lookups collapse three distinct conditions into `None`.
//! Each condition is asserted separately through `resolve` so a change in
//! one of them cannot hide behind the shared absence signal.

use stencil_core::db::open_db_in_memory;
use stencil_core::{Criterion, Lookup, LookupValue, Named, RepoError, SqliteRepository};

fn seeded(conn: &rusqlite::Connection) -> SqliteRepository<'_, Named> {
    let repo = SqliteRepository::<Named>::try_new(conn).unwrap();
    for identity in ["Lagos", "Accra", "Accra"] {
        repo.create(&mut Named::new(identity), None).unwrap();
    }
    repo
}

#[test]
fn exactly_one_match_is_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);

    let criteria = [Criterion::eq("identity", "Lagos")];
    match repo.objects().resolve(&criteria).unwrap() {
        Lookup::Found(record) => assert_eq!(record.identity, "Lagos"),
        other => panic!("unexpected lookup: {other:?}"),
    }
    assert!(repo.objects().get_or_none(&criteria).unwrap().is_some());
}

#[test]
fn zero_matches_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);

    let criteria = [Criterion::eq("identity", "Nairobi")];
    assert_eq!(
        repo.objects().resolve(&criteria).unwrap(),
        Lookup::NotFound
    );
    assert!(repo.objects().get_or_none(&criteria).unwrap().is_none());
}

#[test]
fn several_matches_are_ambiguous() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);

    let criteria = [Criterion::eq("identity", "Accra")];
    assert_eq!(
        repo.objects().resolve(&criteria).unwrap(),
        Lookup::Ambiguous
    );
    assert!(repo.objects().get_or_none(&criteria).unwrap().is_none());
}

#[test]
fn wrong_shape_identifier_is_malformed() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);

    let criteria = [Criterion::eq("uuid", "12345")];
    assert!(matches!(
        repo.objects().resolve(&criteria).unwrap(),
        Lookup::Malformed(_)
    ));
    assert!(repo.objects().get_or_none(&criteria).unwrap().is_none());
}

#[test]
fn null_identifier_is_malformed() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);

    let criteria = [Criterion::eq("uuid", LookupValue::Null)];
    assert!(matches!(
        repo.objects().resolve(&criteria).unwrap(),
        Lookup::Malformed(_)
    ));
    assert!(repo.objects().get_or_none(&criteria).unwrap().is_none());
}

#[test]
fn unknown_field_is_malformed() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);

    let criteria = [Criterion::eq("population", 1_i64)];
    assert!(matches!(
        repo.objects().resolve(&criteria).unwrap(),
        Lookup::Malformed(_)
    ));
}

#[test]
fn uppercase_uuid_text_still_matches() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);
    let lagos = repo
        .objects()
        .get_or_none(&[Criterion::eq("identity", "Lagos")])
        .unwrap()
        .unwrap();

    let upper = lagos.base.uuid.to_string().to_uppercase();
    let found = repo
        .objects()
        .get_or_none(&[Criterion::eq("uuid", upper)])
        .unwrap();
    assert_eq!(found, Some(lagos));
}

#[test]
fn lookups_respect_the_lifecycle_scope() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);
    let criteria = [Criterion::eq("identity", "Lagos")];
    repo.objects()
        .filter(criteria[0].clone())
        .soft_delete(None)
        .unwrap();

    assert!(repo.objects().alive().get_or_none(&criteria).unwrap().is_none());
    assert!(repo.objects().dead().get_or_none(&criteria).unwrap().is_some());
}

#[test]
fn storage_failures_are_not_folded_into_absence() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);
    conn.execute_batch("DROP TABLE named_records;").unwrap();

    let err = repo
        .objects()
        .get_or_none(&[Criterion::eq("identity", "Lagos")])
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)), "unexpected error: {err}");
}

#[test]
fn malformed_scope_criteria_collapse_like_lookup_criteria() {
    let conn = open_db_in_memory().unwrap();
    let repo = seeded(&conn);

    let scope = repo.objects().filter(Criterion::eq("uuid", "12345"));
    assert!(matches!(
        scope.resolve(&[Criterion::eq("identity", "Lagos")]).unwrap(),
        Lookup::Malformed(_)
    ));
    assert!(scope
        .get_or_none(&[Criterion::eq("identity", "Lagos")])
        .unwrap()
        .is_none());
}
