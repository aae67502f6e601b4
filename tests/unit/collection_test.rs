//! Tests for backing collection realizations

use std::sync::Arc;

use prometheus_drain::core::{BackingCollection, Discipline, JsonCodec};
use prometheus_drain::infra::{
    DurableCollection, InMemoryCollection, ListKey, ListStore, MemoryListStore, ObservableCollection,
};

fn durable(store: &MemoryListStore, discipline: Discipline) -> Arc<dyn BackingCollection<String>> {
    Arc::new(DurableCollection::<String, JsonCodec<String>>::new(
        Arc::new(store.clone()),
        ListKey::new("unit:jobs", 1),
        discipline,
        JsonCodec::new(),
    ))
}

fn fill(collection: &dyn BackingCollection<String>, items: &[&str]) {
    for item in items {
        collection.try_add((*item).to_string()).unwrap();
    }
}

fn drain(collection: &dyn BackingCollection<String>) -> Vec<String> {
    std::iter::from_fn(|| collection.try_take()).collect()
}

#[test]
fn test_in_memory_queue_order() {
    let queue = InMemoryCollection::<String>::queue();
    fill(&queue, &["a", "b", "c"]);
    assert_eq!(queue.discipline(), Discipline::Fifo);
    assert_eq!(queue.count().unwrap(), 3);
    assert_eq!(queue.try_peek().as_deref(), Some("a"));
    assert_eq!(drain(&queue), ["a", "b", "c"]);
    assert!(queue.is_empty().unwrap());
}

#[test]
fn test_in_memory_stack_order() {
    let stack = InMemoryCollection::<String>::stack();
    fill(&stack, &["a", "b", "c"]);
    assert_eq!(stack.try_peek().as_deref(), Some("c"));
    assert_eq!(stack.snapshot().unwrap(), ["c", "b", "a"]);
    assert_eq!(drain(&stack), ["c", "b", "a"]);
}

#[test]
fn test_in_memory_is_not_observable() {
    let queue = InMemoryCollection::<String>::queue();
    assert!(queue.watch().unwrap().is_none());
}

#[test]
fn test_durable_queue_order() {
    let store = MemoryListStore::new();
    let queue = durable(&store, Discipline::Fifo);
    fill(queue.as_ref(), &["a", "b", "c"]);
    assert_eq!(queue.snapshot().unwrap(), ["a", "b", "c"]);
    assert_eq!(drain(queue.as_ref()), ["a", "b", "c"]);
    assert_eq!(queue.try_take(), None);
    assert_eq!(queue.try_peek(), None);
}

#[test]
fn test_durable_stack_order() {
    let store = MemoryListStore::new();
    let stack = durable(&store, Discipline::Lifo);
    fill(stack.as_ref(), &["a", "b", "c"]);
    assert_eq!(drain(stack.as_ref()), ["c", "b", "a"]);
}

#[test]
fn test_durable_items_live_in_the_store() {
    let store = MemoryListStore::new();
    let first = durable(&store, Discipline::Fifo);
    fill(first.as_ref(), &["x", "y"]);

    let list = ListKey::new("unit:jobs", 1);
    assert_eq!(store.len(&list).unwrap(), 2);
    assert_eq!(store.index(&list, 0).unwrap().as_deref(), Some(&b"\"x\""[..]));

    // reopening yields the same contents
    let reopened = durable(&store, Discipline::Fifo);
    assert_eq!(reopened.count().unwrap(), 2);
    reopened.clear().unwrap();
    assert_eq!(first.count().unwrap(), 0);
}

#[test]
fn test_durable_databases_are_isolated() {
    let store = MemoryListStore::new();
    let db1 = durable(&store, Discipline::Fifo);
    let db2: Arc<dyn BackingCollection<String>> = Arc::new(DurableCollection::<String, JsonCodec<String>>::new(
        Arc::new(store.clone()),
        ListKey::new("unit:jobs", 2),
        Discipline::Fifo,
        JsonCodec::new(),
    ));
    fill(db1.as_ref(), &["only-in-1"]);
    assert_eq!(db2.count().unwrap(), 0);
    assert_eq!(db2.try_take(), None);
}

#[test]
fn test_durable_skips_foreign_payloads_in_snapshot() {
    let store = MemoryListStore::new();
    let queue = durable(&store, Discipline::Fifo);
    let list = ListKey::new("unit:jobs", 1);
    store.push_back(&list, b"{broken").unwrap();
    fill(queue.as_ref(), &["ok"]);
    assert_eq!(queue.snapshot().unwrap(), ["ok"]);
    // the undecodable head is consumed and reported as empty
    assert_eq!(queue.try_take(), None);
    assert_eq!(queue.try_take().as_deref(), Some("ok"));
}

#[test]
fn test_shared_collections_report_empty_after_clear() {
    let store = MemoryListStore::new();
    let durable_queue = durable(&store, Discipline::Fifo);
    let observable_stack: Arc<dyn BackingCollection<String>> =
        Arc::new(ObservableCollection::<String, JsonCodec<String>>::new(
            Arc::new(store.clone()),
            ListKey::new("unit:stack", 1),
            Discipline::Lifo,
            JsonCodec::new(),
        ));

    for collection in [durable_queue, observable_stack] {
        fill(collection.as_ref(), &["a", "b"]);
        assert_eq!(collection.count().unwrap(), 2);
        collection.clear().unwrap();
        assert_eq!(collection.try_take(), None);
        assert_eq!(collection.try_peek(), None);
        assert_eq!(collection.count().unwrap(), 0);
        assert!(collection.snapshot().unwrap().is_empty());
    }
}

#[test]
fn test_undecodable_items_are_counted_as_discarded() {
    let store = MemoryListStore::new();
    let list = ListKey::new("unit:discard", 0);
    let queue = DurableCollection::<String, JsonCodec<String>>::new(
        Arc::new(store.clone()),
        list.clone(),
        Discipline::Fifo,
        JsonCodec::new(),
    );
    let observed = ObservableCollection::<String, JsonCodec<String>>::new(
        Arc::new(store.clone()),
        list.clone(),
        Discipline::Fifo,
        JsonCodec::new(),
    );

    store.push_back(&list, b"{broken").unwrap();
    store.push_back(&list, b"[1, 2]").unwrap();
    assert_eq!(queue.try_take(), None);
    assert_eq!(queue.discarded(), 1);
    assert_eq!(observed.try_take(), None);
    assert_eq!(observed.discarded(), 1);
    assert_eq!(store.len(&list).unwrap(), 0);

    // absent payloads are not losses
    store.push_back(&list, b"null").unwrap();
    assert_eq!(queue.try_take(), None);
    assert_eq!(queue.discarded(), 1);
}
