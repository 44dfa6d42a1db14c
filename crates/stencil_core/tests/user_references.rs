use rusqlite::Connection;
use stencil_core::db::open_db_in_memory;
use stencil_core::{Criterion, Named, RepoError, Settings, SqliteRepository, User, UserId};

fn seed_user(conn: &Connection, email: &str, actor: Option<UserId>) -> User {
    let repo = SqliteRepository::<User>::try_new(conn).unwrap();
    let mut user = User::new(email).unwrap();
    repo.create(&mut user, actor).unwrap();
    user
}

fn dangling_references(conn: &Connection) -> i64 {
    let mut total = 0;
    for table in ["users", "named_records"] {
        for column in ["created_by", "updated_by", "deleted_by"] {
            let count: i64 = conn
                .query_row(
                    &format!(
                        "SELECT COUNT(*) FROM {table}
                         WHERE {column} IS NOT NULL
                           AND {column} NOT IN (SELECT id FROM users);"
                    ),
                    [],
                    |row| row.get(0),
                )
                .unwrap();
            total += count;
        }
    }
    total
}

#[test]
fn hard_deleting_a_user_substitutes_the_default_everywhere() {
    let conn = open_db_in_memory().unwrap();
    let fallback = seed_user(&conn, "system@example.com", None);
    let editor = seed_user(&conn, "editor@example.com", None);
    let invited = seed_user(&conn, "invited@example.com", editor.base.id);

    let named = SqliteRepository::<Named>::try_new(&conn).unwrap();
    let mut record = Named::new("Lagos");
    named.create(&mut record, editor.base.id).unwrap();
    named.objects().soft_delete(editor.base.id).unwrap();

    let users = SqliteRepository::<User>::try_new(&conn)
        .unwrap()
        .with_default_user(fallback.base.id);
    let removed = users
        .objects()
        .filter(Criterion::eq("uuid", editor.base.uuid))
        .hard_delete()
        .unwrap();
    assert_eq!(removed, 1);

    let record = named.get_by_uuid(record.base.uuid).unwrap();
    assert_eq!(record.base.created_by, fallback.base.id);
    assert_eq!(record.base.updated_by, fallback.base.id);
    assert_eq!(record.base.deleted_by, fallback.base.id);

    let invited = users.get_by_uuid(invited.base.uuid).unwrap();
    assert_eq!(invited.base.created_by, fallback.base.id);
    assert_eq!(dangling_references(&conn), 0);
}

#[test]
fn without_a_default_references_become_null() {
    let conn = open_db_in_memory().unwrap();
    let editor = seed_user(&conn, "editor@example.com", None);

    let named = SqliteRepository::<Named>::try_new(&conn).unwrap();
    let mut record = Named::new("Accra");
    named.create(&mut record, editor.base.id).unwrap();

    let users = SqliteRepository::<User>::try_new(&conn).unwrap();
    assert_eq!(users.objects().hard_delete().unwrap(), 1);

    let record = named.get_by_uuid(record.base.uuid).unwrap();
    assert_eq!(record.base.created_by, None);
    assert_eq!(record.base.updated_by, None);
    assert_eq!(dangling_references(&conn), 0);
}

#[test]
fn deleting_the_default_user_is_refused_and_changes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let fallback = seed_user(&conn, "system@example.com", None);
    let editor = seed_user(&conn, "editor@example.com", fallback.base.id);

    let users = SqliteRepository::<User>::try_new(&conn)
        .unwrap()
        .with_default_user(fallback.base.id);
    let err = users.objects().hard_delete().unwrap_err();
    assert!(matches!(
        err,
        RepoError::DefaultUserDeletion(id) if Some(id) == fallback.base.id
    ));

    assert_eq!(users.objects().count().unwrap(), 2);
    let editor = users.get_by_uuid(editor.base.uuid).unwrap();
    assert_eq!(editor.base.created_by, fallback.base.id);
}

#[test]
fn soft_deleting_users_keeps_their_references() {
    let conn = open_db_in_memory().unwrap();
    let editor = seed_user(&conn, "editor@example.com", None);
    let named = SqliteRepository::<Named>::try_new(&conn).unwrap();
    let mut record = Named::new("Abuja");
    named.create(&mut record, editor.base.id).unwrap();

    let users = SqliteRepository::<User>::try_new(&conn).unwrap();
    assert_eq!(users.objects().soft_delete(None).unwrap(), 1);

    let record = named.get_by_uuid(record.base.uuid).unwrap();
    assert_eq!(record.base.created_by, editor.base.id);
}

#[test]
fn configured_default_user_is_substituted_on_hard_delete() {
    let conn = open_db_in_memory().unwrap();
    let fallback = seed_user(&conn, "system@example.com", None);
    let editor = seed_user(&conn, "editor@example.com", None);
    let fallback_id = fallback.base.id.unwrap().to_string();
    let settings = Settings::from_lookup(|key| {
        (key == "AUDIT_DEFAULT_USER_ID").then(|| fallback_id.clone())
    })
    .unwrap();

    let named = SqliteRepository::<Named>::try_new(&conn).unwrap();
    let mut record = Named::new("Ilorin");
    named.create(&mut record, editor.base.id).unwrap();

    let users = SqliteRepository::<User>::from_settings(&conn, &settings).unwrap();
    users
        .objects()
        .filter(Criterion::eq("uuid", editor.base.uuid))
        .hard_delete()
        .unwrap();

    let record = named.get_by_uuid(record.base.uuid).unwrap();
    assert_eq!(record.base.created_by, fallback.base.id);
    assert_eq!(record.base.updated_by, fallback.base.id);

    let refused = users
        .objects()
        .filter(Criterion::eq("uuid", fallback.base.uuid))
        .hard_delete();
    assert!(matches!(refused, Err(RepoError::DefaultUserDeletion(_))));
}
