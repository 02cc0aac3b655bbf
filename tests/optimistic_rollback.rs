//! Optimistic apply / confirm / compensate through the public store API,
//! without a server: results are handed to the `settle_*` half directly.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use taskflow::api::{ApiError, Category, Task, TaskPatch};
use taskflow::store::{CategoryStore, TaskStore};

fn task(id: i64, title: &str) -> Task {
    Task {
        id,
        title: title.to_string(),
        completed: false,
        steps: Vec::new(),
        due_date: String::new(),
        category_id: 5,
    }
}

fn work_list() -> Vec<Task> {
    vec![task(1, "Report"), task(2, "Email Bob"), task(3, "Book flights")]
}

#[test]
fn test_toggle_visible_before_any_response() {
    let mut store = TaskStore::default();
    store.load_local(5, work_list());

    let pending = store.begin_toggle(2).unwrap();
    assert!(store.get(2).unwrap().completed);

    store
        .settle_change(pending, Err(ApiError::HttpStatus(500)))
        .unwrap_err();
    assert_eq!(store.items(), work_list().as_slice());
}

#[test]
fn test_errands_placeholder_then_server_id() {
    let mut store = CategoryStore::new();
    let pending = store.begin_create("Errands").unwrap();

    let placeholder = store.find_by_name("Errands").unwrap();
    assert!(placeholder.is_placeholder());
    assert_eq!(placeholder.id, pending.temp_id());

    let created = store
        .settle_create(
            pending,
            Ok(Category {
                id: 31,
                name: "Errands".to_string(),
            }),
        )
        .unwrap();
    assert_eq!(created.id, 31);
    assert_eq!(store.items(), &[created]);
}

#[test]
fn test_interleaved_changes_settle_independently() {
    let mut store = TaskStore::default();
    store.load_local(5, work_list());

    let rename = store
        .begin_update(1, &TaskPatch::title("Annual report"))
        .unwrap()
        .unwrap();
    let toggle = store.begin_toggle(3).unwrap();

    store.settle_change(toggle, Ok(())).unwrap();
    store.settle_change(rename, Ok(())).unwrap();

    assert_eq!(store.get(1).unwrap().title, "Annual report");
    assert!(store.get(3).unwrap().completed);
}

#[test]
fn test_remove_then_failure_restores_position() {
    let mut store = TaskStore::default();
    store.load_local(5, work_list());

    let pending = store.begin_remove(2).unwrap();
    let ids: Vec<i64> = store.items().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![1, 3]);

    store
        .settle_change(pending, Err(ApiError::HttpStatus(404)))
        .unwrap_err();
    assert_eq!(store.items(), work_list().as_slice());
}

proptest! {
    /// Each toggle is settled before the next starts; the list ends up as if
    /// only the successful toggles had happened.
    #[test]
    fn prop_sequential_toggles_match_successful_ones(
        ops in prop::collection::vec((1i64..=3, any::<bool>()), 0..24)
    ) {
        let mut store = TaskStore::default();
        store.load_local(5, work_list());
        let mut expected = work_list();

        for (id, succeeds) in ops {
            let pending = store.begin_toggle(id).unwrap();
            let result = if succeeds { Ok(()) } else { Err(ApiError::HttpStatus(500)) };
            let _ = store.settle_change(pending, result);
            if succeeds {
                let t = expected.iter_mut().find(|t| t.id == id).unwrap();
                t.completed = !t.completed;
            }
        }

        prop_assert_eq!(store.items(), expected.as_slice());
    }
}
