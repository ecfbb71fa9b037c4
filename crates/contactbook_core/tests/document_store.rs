use contactbook_core::{
    DbError, DocumentStore, Fields, JsonFileStore, SqliteDocumentStore, StoreBackend, StoreConfig,
};
use serde_json::{json, Value};
use std::fs;

fn row(first_name: &str) -> Fields {
    json!({
        "first_name": first_name,
        "last_name": "Brke",
        "phone_number": "",
        "address": ""
    })
    .as_object()
    .cloned()
    .unwrap()
}

fn first_name_is(name: &'static str) -> impl Fn(&Fields) -> bool {
    move |fields: &Fields| fields.get("first_name") == Some(&Value::from(name))
}

fn exercise_contract(store: &mut dyn DocumentStore) {
    let a = store.insert(&row("Anna")).unwrap();
    let b = store.insert(&row("Berta")).unwrap();
    let duplicate = store.insert(&row("Anna")).unwrap();
    assert!(a < b && b < duplicate);

    let found = store.find_one(&first_name_is("Anna")).unwrap().unwrap();
    assert_eq!(found.id, a);
    assert_eq!(found.fields, row("Anna"));
    assert!(store.find_one(&first_name_is("Nobody")).unwrap().is_none());

    assert_eq!(store.delete(&[a, 9_999]).unwrap(), vec![a]);
    assert!(store.delete(&[a]).unwrap().is_empty());

    let remaining: Vec<_> = store.all().unwrap().into_iter().map(|doc| doc.id).collect();
    assert_eq!(remaining, vec![b, duplicate]);

    let newest = store.insert(&row("Carla")).unwrap();
    assert!(newest > duplicate);
    assert_eq!(store.delete(&[newest]).unwrap(), vec![newest]);
    assert!(store.insert(&row("Dora")).unwrap() > newest);
}

#[test]
fn sqlite_store_honours_contract() {
    let mut store = SqliteDocumentStore::open_in_memory().unwrap();
    exercise_contract(&mut store);
}

#[test]
fn json_store_honours_contract() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonFileStore::open(dir.path().join("db.json")).unwrap();
    exercise_contract(&mut store);
}

#[test]
fn sqlite_rows_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contacts.db");

    let mut store = SqliteDocumentStore::open(&path).unwrap();
    let id = store.insert(&row("Anna")).unwrap();
    store.close().unwrap();

    let reopened = SqliteDocumentStore::open(&path).unwrap();
    let all = reopened.all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, id);
    assert_eq!(all[0].fields, row("Anna"));
}

#[test]
fn json_store_writes_readable_file_and_reloads_it() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");

    let mut store = JsonFileStore::open(&path).unwrap();
    let first = store.insert(&row("Anna")).unwrap();
    let second = store.insert(&row("Berta")).unwrap();
    store.delete(&[second]).unwrap();
    store.close().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("\n    \"last_id\""), "expected 4-space indent: {text}");
    let on_disk: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        on_disk,
        json!({
            "last_id": second,
            "documents": { first.to_string(): row("Anna") }
        })
    );

    let mut reopened = JsonFileStore::open(&path).unwrap();
    assert_eq!(reopened.all().unwrap().len(), 1);
    assert!(reopened.insert(&row("Carla")).unwrap() > second);
}

#[test]
fn json_store_orders_ids_numerically() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonFileStore::open(dir.path().join("db.json")).unwrap();
    for index in 0..11 {
        store.insert(&row(&format!("Name{index}"))).unwrap();
    }

    let ids: Vec<_> = store.all().unwrap().into_iter().map(|doc| doc.id).collect();
    assert_eq!(ids, (1..=11).collect::<Vec<_>>());
}

#[test]
fn json_store_creates_missing_file_and_parent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("db.json");

    let store = JsonFileStore::open(&path).unwrap();
    assert!(path.exists());
    assert!(store.all().unwrap().is_empty());
}

#[test]
fn json_store_rejects_malformed_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    fs::write(&path, "[1, 2, 3]").unwrap();

    let err = JsonFileStore::open(&path).unwrap_err();
    assert!(matches!(err, DbError::Corrupt { ref location, .. } if location == &path));
}

#[test]
fn config_opens_either_backend() {
    let dir = tempfile::tempdir().unwrap();

    for (backend, file) in [
        (StoreBackend::Sqlite, "contacts.db"),
        (StoreBackend::Json, "contacts.json"),
    ] {
        let config = StoreConfig::new(backend, dir.path().join(file));
        let mut store = config.open().unwrap();
        assert_eq!(store.backend(), backend);
        let id = store.insert(&row("Anna")).unwrap();
        store.close().unwrap();

        let reopened = config.open().unwrap();
        assert_eq!(reopened.all().unwrap()[0].id, id);
        reopened.close().unwrap();
    }
}

#[test]
fn json_store_rolls_back_when_the_file_cannot_be_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    let mut store = JsonFileStore::open(&path).unwrap();
    let kept = store.insert(&row("Anna")).unwrap();
    let before = store.all().unwrap();

    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();

    assert!(matches!(store.insert(&row("Berta")), Err(DbError::Io(_))));
    assert!(matches!(store.delete(&[kept]), Err(DbError::Io(_))));
    assert_eq!(store.all().unwrap(), before);
    assert!(!dir.path().join("db.json.tmp").exists());

    fs::remove_dir(&path).unwrap();
    assert_eq!(store.insert(&row("Berta")).unwrap(), kept + 1);
}

#[test]
fn json_store_refuses_to_wrap_identifiers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");
    fs::write(&path, format!(r#"{{"last_id": {}, "documents": {{}}}}"#, u64::MAX)).unwrap();

    let mut store = JsonFileStore::open(&path).unwrap();
    let err = store.insert(&row("Anna")).unwrap_err();
    assert!(matches!(err, DbError::Corrupt { .. }));
    assert!(store.all().unwrap().is_empty());
}
