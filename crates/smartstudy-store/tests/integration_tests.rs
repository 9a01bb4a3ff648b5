//! Integration tests for smartstudy-store
//!
//! These tests verify the save/load/list/delete cycle for sessions and the
//! last-opened pointer.

use smartstudy_domain::{DocumentMeta, Flashcard, QuizItem, SessionPersistence, SessionStore, StudySession};
use smartstudy_store::{DebouncedPersister, SqliteSessionStore, StoreError};
use std::time::Duration;

fn session(id: &str, updated_at: u64) -> StudySession {
    let mut session = StudySession::new();
    session.set_pdf_meta(DocumentMeta::new(id, format!("{}.pdf", id), 100, 0, ""));
    session.set_summary(format!("Summary of {}", id));
    session.touch_at(updated_at);
    session
}

#[test]
fn test_store_initialization() {
    let store = SqliteSessionStore::new(":memory:");
    assert!(store.is_ok(), "Store should initialize successfully");
}

#[test]
fn test_save_and_load_session() {
    let mut store = SqliteSessionStore::new(":memory:").unwrap();

    let mut original = session("doc-a", 1_000);
    original.set_quiz_items(vec![QuizItem {
        question: "What is 2 + 2?".to_string(),
        options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
        answer: "4".to_string(),
        explanation: "Arithmetic.".to_string(),
    }]);
    original.set_flashcards(vec![Flashcard::new("Term", "Definition")]);
    original.set_flashcard_index(0);

    let id = store.save_session(&original).unwrap();
    assert_eq!(id, "doc-a");

    let loaded = store.load_session("doc-a").unwrap().expect("session should exist");
    assert_eq!(loaded, original);
}

#[test]
fn test_save_requires_id() {
    let mut store = SqliteSessionStore::new(":memory:").unwrap();
    let result = store.save_session(&StudySession::new());
    assert!(matches!(result, Err(StoreError::MissingId)));
    assert_eq!(
        result.unwrap_err().to_string(),
        "Session must include an id before saving."
    );
}

#[test]
fn test_load_missing_session() {
    let store = SqliteSessionStore::new(":memory:").unwrap();
    assert!(store.load_session("nope").unwrap().is_none());
    assert!(store.load_session("").unwrap().is_none());
}

#[test]
fn test_save_overwrites_and_sets_pointer() {
    let mut store = SqliteSessionStore::new(":memory:").unwrap();
    store.save_session(&session("doc-a", 1)).unwrap();
    store.save_session(&session("doc-b", 2)).unwrap();
    assert_eq!(store.last_session_id().unwrap().as_deref(), Some("doc-b"));

    let mut updated = session("doc-a", 3);
    updated.set_summary("Rewritten");
    store.save_session(&updated).unwrap();

    assert_eq!(store.list_sessions().unwrap().len(), 2);
    assert_eq!(store.load_session("doc-a").unwrap().unwrap().summary, "Rewritten");
    assert_eq!(store.last_session_id().unwrap().as_deref(), Some("doc-a"));
}

#[test]
fn test_list_orders_by_most_recent_update() {
    let mut store = SqliteSessionStore::new(":memory:").unwrap();
    store.save_session(&session("old", 100)).unwrap();
    store.save_session(&session("newest", 300)).unwrap();
    store.save_session(&session("middle", 200)).unwrap();

    let ids: Vec<_> = store
        .list_sessions()
        .unwrap()
        .into_iter()
        .filter_map(|s| s.id)
        .collect();
    assert_eq!(ids, vec!["newest", "middle", "old"]);
}

#[test]
fn test_delete_clears_matching_pointer() {
    let mut store = SqliteSessionStore::new(":memory:").unwrap();
    store.save_session(&session("doc-a", 1)).unwrap();
    store.save_session(&session("doc-b", 2)).unwrap();

    // Pointer is doc-b; deleting doc-a leaves it alone
    store.delete_session("doc-a").unwrap();
    assert_eq!(store.last_session_id().unwrap().as_deref(), Some("doc-b"));

    store.delete_session("doc-b").unwrap();
    assert_eq!(store.last_session_id().unwrap(), None);
    assert!(store.list_sessions().unwrap().is_empty());
}

#[test]
fn test_pointer_can_be_cleared() {
    let mut store = SqliteSessionStore::new(":memory:").unwrap();
    store.set_last_session_id(Some("doc-a")).unwrap();
    assert_eq!(store.last_session_id().unwrap().as_deref(), Some("doc-a"));

    store.set_last_session_id(None).unwrap();
    assert_eq!(store.last_session_id().unwrap(), None);
}

#[test]
fn test_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("smart-study.db");

    {
        let mut store = SqliteSessionStore::new(&path).unwrap();
        store.save_session(&session("doc-a", 1)).unwrap();
    }

    let store = SqliteSessionStore::new(&path).unwrap();
    assert_eq!(store.last_session_id().unwrap().as_deref(), Some("doc-a"));
    assert_eq!(store.load_session("doc-a").unwrap().unwrap().summary, "Summary of doc-a");
}

#[tokio::test]
async fn test_debounced_persister_writes_to_sqlite() {
    let store = SqliteSessionStore::new(":memory:").unwrap();
    let persister = DebouncedPersister::new(store, Duration::from_millis(20));

    persister.schedule_persist(&session("doc-a", 1));
    persister.flush().await;

    let store = persister.store();
    let store = store.lock().unwrap();
    assert!(store.load_session("doc-a").unwrap().is_some());
}

#[tokio::test]
async fn test_persist_now_reports_missing_id() {
    let store = SqliteSessionStore::new(":memory:").unwrap();
    let persister = DebouncedPersister::new(store, Duration::from_millis(20));

    let result = persister.persist_now(&StudySession::new());
    assert!(result.is_err());
}
