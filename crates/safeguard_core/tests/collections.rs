use chrono::NaiveDate;
use safeguard_core::service::contact_service::{ContactService, ContactServiceError};
use safeguard_core::service::lost_item_service::{
    LostItemReport, LostItemService, LostItemServiceError,
};
use safeguard_core::service::todo_service::{TodoService, TodoServiceError};
use safeguard_core::store::{KeyValueStore, SqliteKeyValueStore};
use safeguard_core::{
    ContactValidationError, ExportMap, LostItemStatus, RecordId, RepoError, Storage, StorageKey,
    TaskPriority,
};
use serde_json::json;
use std::sync::Arc;

fn sqlite_storage(dir: &tempfile::TempDir) -> Storage {
    let backend = SqliteKeyValueStore::open(dir.path().join("safeguard.db")).unwrap();
    Storage::new(Arc::new(backend))
}

fn wallet() -> LostItemReport {
    LostItemReport {
        title: "  Brown wallet ".to_string(),
        description: "Leather, two cards inside".to_string(),
        category: "accessories".to_string(),
        location: "Central station".to_string(),
        date_reported: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
    }
}

#[test]
fn contacts_persist_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mom = {
        let contacts = ContactService::new(sqlite_storage(&dir));
        contacts
            .add_contact(" Mom ", "+1 (555) 010-0000", "mother", true)
            .unwrap()
    };

    let contacts = ContactService::new(sqlite_storage(&dir));
    let listed = contacts.list_contacts().unwrap();
    assert_eq!(listed, vec![mom.clone()]);
    assert_eq!(listed[0].name, "Mom");
    assert_eq!(contacts.primary_contact().unwrap(), Some(mom));
}

#[test]
fn only_one_contact_stays_primary() {
    let contacts = ContactService::new(Storage::in_memory());
    let mom = contacts
        .add_contact("Mom", "+15550100", "mother", true)
        .unwrap();
    let dad = contacts
        .add_contact("Dad", "+15550101", "father", true)
        .unwrap();

    assert_eq!(contacts.primary_contact().unwrap().map(|c| c.id), Some(dad.id));
    assert!(!contacts.get_contact(mom.id).unwrap().unwrap().is_primary);

    let mut promoted = mom.clone();
    promoted.is_primary = true;
    contacts.replace_contact(&promoted).unwrap();
    let primaries: Vec<_> = contacts
        .list_contacts()
        .unwrap()
        .into_iter()
        .filter(|c| c.is_primary)
        .map(|c| c.id)
        .collect();
    assert_eq!(primaries, vec![mom.id]);
}

#[test]
fn invalid_contacts_are_rejected() {
    let contacts = ContactService::new(Storage::in_memory());

    let blank = contacts.add_contact("  ", "+15550100", "", false).unwrap_err();
    assert!(matches!(
        blank,
        ContactServiceError::Validation(ContactValidationError::BlankName)
    ));

    let phone = contacts
        .add_contact("Neighbor", "call me", "", false)
        .unwrap_err();
    assert!(matches!(
        phone,
        ContactServiceError::Validation(ContactValidationError::InvalidPhone(_))
    ));
    assert!(contacts.list_contacts().unwrap().is_empty());
}

#[test]
fn removing_unknown_contact_reports_not_found() {
    let contacts = ContactService::new(Storage::in_memory());
    let id = RecordId::new();

    let err = contacts.remove_contact(id).unwrap_err();
    assert!(matches!(err, ContactServiceError::ContactNotFound(missing) if missing == id));
}

#[test]
fn malformed_contact_list_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(SqliteKeyValueStore::open(dir.path().join("safeguard.db")).unwrap());
    backend.put_raw(StorageKey::Contacts, "{broken").unwrap();
    let contacts = ContactService::new(Storage::new(backend.clone()));

    let err = contacts
        .add_contact("Mom", "+15550100", "mother", true)
        .unwrap_err();
    assert!(matches!(
        err,
        ContactServiceError::Repo(RepoError::InvalidData {
            key: StorageKey::Contacts,
            ..
        })
    ));
    assert_eq!(
        backend.get_raw(StorageKey::Contacts).unwrap().as_deref(),
        Some("{broken")
    );
}

#[test]
fn imported_contacts_with_numeric_ids_are_listed_and_kept() {
    let storage = Storage::in_memory();
    let mut data = ExportMap::new();
    data.insert(
        "CONTACTS".to_string(),
        json!([
            {
                "id": 1,
                "name": "Mom",
                "phone": "555-0100",
                "relationship": "mother",
                "isPrimary": true,
                "createdAt": "2024-05-03T10:00:00.000Z"
            },
            {"id": 1714730400000_i64, "name": "Dad", "phone": "555-0101"}
        ]),
    );
    assert!(storage.import_all(&data));

    let contacts = ContactService::new(storage.clone());
    let ids: Vec<_> = contacts
        .list_contacts()
        .unwrap()
        .into_iter()
        .map(|contact| contact.id)
        .collect();
    assert_eq!(
        ids,
        vec![RecordId::Number(1), RecordId::Number(1_714_730_400_000)]
    );
    assert_eq!(
        contacts.primary_contact().unwrap().map(|c| c.id),
        Some(RecordId::Number(1))
    );

    contacts
        .add_contact("Neighbor", "(415) 555-0100", "neighbor", false)
        .unwrap();
    contacts.remove_contact(RecordId::Number(1)).unwrap();
    let stored = storage.load(StorageKey::Contacts).unwrap();
    assert_eq!(stored[0]["id"], json!(1714730400000_i64));
    assert!(stored[1]["id"].is_string());
}

#[test]
fn lost_items_move_through_statuses() {
    let items = LostItemService::new(Storage::in_memory());
    let wallet = items.report_item(wallet()).unwrap();
    let keys = items
        .report_item(LostItemReport {
            title: "Keys".to_string(),
            ..wallet_report_without_title()
        })
        .unwrap();

    assert_eq!(wallet.title, "Brown wallet");
    assert_eq!(wallet.status, LostItemStatus::Lost);
    assert_eq!(items.list_items(None).unwrap().len(), 2);

    let found = items.update_status(wallet.id, LostItemStatus::Found).unwrap();
    assert_eq!(found.status, LostItemStatus::Found);
    let lost: Vec<_> = items
        .list_items(Some(LostItemStatus::Lost))
        .unwrap()
        .into_iter()
        .map(|item| item.id)
        .collect();
    assert_eq!(lost, vec![keys.id]);

    items.update_status(wallet.id, LostItemStatus::Recovered).unwrap();
    assert_eq!(
        items.list_items(Some(LostItemStatus::Recovered)).unwrap().len(),
        1
    );

    items.remove_item(keys.id).unwrap();
    assert!(matches!(
        items.update_status(keys.id, LostItemStatus::Found),
        Err(LostItemServiceError::ItemNotFound(_))
    ));
}

#[test]
fn blank_lost_item_title_is_rejected() {
    let items = LostItemService::new(Storage::in_memory());
    let err = items
        .report_item(LostItemReport {
            title: " ".to_string(),
            ..wallet()
        })
        .unwrap_err();
    assert!(matches!(err, LostItemServiceError::BlankTitle));
}

#[test]
fn todos_complete_reopen_and_remove() {
    let dir = tempfile::tempdir().unwrap();
    let todos = TodoService::new(sqlite_storage(&dir), None);

    let task = todos.add_task("Buy batteries", None, TaskPriority::Low).unwrap();
    assert!(!task.completed);

    assert!(todos.set_completed(task.id, true).unwrap().completed);
    assert!(todos.get_task(task.id).unwrap().unwrap().completed);
    assert!(!todos.set_completed(task.id, false).unwrap().completed);

    assert!(matches!(
        todos.add_task("   ", None, TaskPriority::High),
        Err(TodoServiceError::BlankTitle)
    ));

    let removed = todos.remove_task(task.id).unwrap();
    assert_eq!(removed.id, task.id);
    assert!(todos.list_tasks().unwrap().is_empty());
    assert!(matches!(
        todos.set_completed(task.id, true),
        Err(TodoServiceError::TaskNotFound(_))
    ));
}

fn wallet_report_without_title() -> LostItemReport {
    LostItemReport {
        title: String::new(),
        ..wallet()
    }
}
