//! Sorting, debounced search, paging and focus restoration

use grid_client::{ClientError, FocusToken};
use grid_model::{EditableField, EntityField, EntityId, SortDirection, SortField};
use grid_store::{seed_entities, RecordStore};
use grid_test_utils::{key, Harness};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn debounced_search_sends_only_the_final_term() {
    let h = Harness::loaded().await;
    let before = h.transport.queries().len();

    let mut handles = Vec::new();
    for term in ["l", "la", "lam", "lamp"] {
        let caret = term.chars().count();
        handles.push(
            h.controller
                .search_input(term, Some(FocusToken::capture("searchTerm", caret))),
        );
        tokio::time::advance(Duration::from_millis(100)).await;
    }
    let last = handles.pop().unwrap();
    last.await.unwrap().unwrap();
    for earlier in handles {
        assert!(earlier.await.unwrap_err().is_cancelled());
    }

    let sent = &h.transport.queries()[before..];
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].search_term, "lamp");
    assert_eq!(sent[0].page, 1);

    let names: Vec<String> = h.sync.view().rows.iter().map(|r| r.name.clone()).collect();
    assert_eq!(
        names,
        vec!["Oak Desk Lamp", "Steel Floor Lamp", "Brass Table Lamp"]
    );
    assert_eq!(h.sync.view().baseline.count, 3);
    assert_eq!(
        h.presenter.focused_inputs(),
        vec![("searchTerm".to_string(), 4)]
    );
    assert!(h.presenter.history().last().unwrap().contains("searchTerm=lamp"));
}

#[tokio::test(start_paused = true)]
async fn enter_sends_immediately_and_cancels_the_timer() {
    let h = Harness::loaded().await;
    let before = h.transport.queries().len();

    let pending = h.controller.search_input("desk", None);
    let submitted = h.controller.search_submit(None);
    submitted.await.unwrap().unwrap();
    assert!(pending.await.unwrap_err().is_cancelled());

    let sent = &h.transport.queries()[before..];
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].search_term, "desk");
    assert_eq!(h.sync.view().rows.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn caret_is_clamped_to_the_new_value() {
    let h = Harness::loaded().await;
    h.controller.search_input("vase", None);
    h.controller
        .search_submit(Some(FocusToken::capture("searchTerm", 40)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        h.presenter.focused_inputs(),
        vec![("searchTerm".to_string(), 4)]
    );
}

#[tokio::test(start_paused = true)]
async fn focus_is_skipped_when_the_input_is_gone() {
    let h = Harness::loaded().await;
    h.presenter.set_input("minPrice", "12");
    h.controller
        .search_submit(Some(FocusToken::capture("minPrice", 5)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        h.presenter.focused_inputs(),
        vec![("minPrice".to_string(), 2)]
    );

    h.presenter.remove_input("minPrice");
    h.controller
        .search_submit(Some(FocusToken::capture("minPrice", 2)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(h.presenter.focused_inputs().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn sort_header_toggles_direction() {
    let h = Harness::loaded().await;

    h.controller.sort_by(SortField::Price).await.unwrap().unwrap();
    let view = h.sync.view();
    assert_eq!(view.params.sort_dir, SortDirection::Asc);
    assert_eq!(view.rows[0].id, EntityId(6));

    h.controller.sort_by(SortField::Price).await.unwrap().unwrap();
    let view = h.sync.view();
    assert_eq!(view.params.sort_dir, SortDirection::Desc);
    assert_eq!(view.rows[0].id, EntityId(5));

    h.controller.sort_by(SortField::Subtotal).await.unwrap().unwrap();
    let view = h.sync.view();
    assert_eq!(view.params.sort_field, SortField::Subtotal);
    assert_eq!(view.params.sort_dir, SortDirection::Asc);
    assert_eq!(view.rows[0].id, EntityId(6));

    assert_eq!(h.presenter.history().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn newer_navigation_aborts_the_older_one() {
    let h = Harness::loaded().await;
    let first = h.controller.sort_by(SortField::Name);
    let second = h.controller.sort_by(SortField::Name);

    second.await.unwrap().unwrap();
    assert!(first.await.unwrap_err().is_cancelled());
    assert_eq!(h.sync.view().params.sort_dir, SortDirection::Desc);
    assert_eq!(h.presenter.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn navigation_answered_after_a_newer_request_is_dropped() {
    let h = Harness::loaded().await;
    h.transport.hold(true);
    let sort_call = h.transport.calls().len();

    let sort = h.controller.sort_by(SortField::Name);
    h.transport.wait_for_parked(1).await;
    let controller = h.controller.clone();
    let delete = tokio::spawn(async move { controller.delete_row(EntityId(3)).await });
    h.transport.wait_for_parked(2).await;

    h.transport.release(sort_call);
    assert_eq!(sort.await.unwrap(), Err(ClientError::RequestSuperseded));
    assert_eq!(h.sync.view().params.sort_field, SortField::Id);
    assert!(h.sync.view().row(EntityId(3)).is_some());

    h.transport.release(sort_call + 1);
    delete.await.unwrap().unwrap();
    let view = h.sync.view();
    assert_eq!(view.params.sort_field, SortField::Name);
    assert!(view.row(EntityId(3)).is_none());
    assert_eq!(view.rows[0].id, EntityId(4));
    assert!(h.presenter.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn late_delete_refresh_never_replaces_a_newer_view() {
    let h = Harness::loaded().await;
    h.transport.hold(true);
    let delete_call = h.transport.calls().len();

    let sync = h.sync.clone();
    let delete = tokio::spawn(async move { sync.delete_row(EntityId(6)).await });
    h.transport.wait_for_parked(1).await;
    let sort = h.controller.sort_by(SortField::Price);
    h.transport.wait_for_parked(2).await;

    h.transport.release(delete_call + 1);
    sort.await.unwrap().unwrap();
    h.transport.release(delete_call);
    delete.await.unwrap().unwrap();

    let view = h.sync.view();
    assert_eq!(view.params.sort_field, SortField::Price);
    assert!(view.row(EntityId(6)).is_none());
    assert_eq!(view.rows[0].id, EntityId(4));
    assert_eq!(h.presenter.views().len(), 2);
    assert!(h.presenter.history().last().unwrap().contains("sortBy=price"));
}

#[tokio::test(start_paused = true)]
async fn paging_follows_page_metadata() {
    let h = Harness::new(Arc::new(RecordStore::new(seed_entities(25))));
    h.controller.reload().await.unwrap().unwrap();
    assert_eq!(h.sync.view().page.total_pages, 3);
    assert!(h.controller.prev_page().is_none());

    h.controller.next_page().unwrap().await.unwrap().unwrap();
    h.controller.next_page().unwrap().await.unwrap().unwrap();
    let view = h.sync.view();
    assert_eq!(view.page.page, 3);
    assert_eq!(view.rows.len(), 5);
    assert!(h.controller.next_page().is_none());

    h.controller.prev_page().unwrap().await.unwrap().unwrap();
    assert_eq!(h.sync.view().page.page, 2);
    assert_eq!(h.sync.view().baseline.count, 25);
}

#[tokio::test(start_paused = true)]
async fn search_field_change_reissues_only_with_a_term() {
    let h = Harness::loaded().await;
    assert!(h.controller.set_search_field(EntityField::Category).is_none());

    h.controller.search_submit(None).await.unwrap().unwrap();
    h.controller.search_input("furn", None);
    h.controller.search_submit(None).await.unwrap().unwrap();
    assert_eq!(h.sync.view().rows.len(), 2);

    h.controller
        .set_search_field(EntityField::Name)
        .unwrap()
        .await
        .unwrap()
        .unwrap();
    assert!(h.sync.view().rows.is_empty());
    assert_eq!(h.sync.view().baseline.count, 0);
}

#[tokio::test(start_paused = true)]
async fn failed_navigation_keeps_the_view() {
    let h = Harness::loaded().await;
    let before = h.sync.view();
    h.transport.sever(true);

    let result = h.controller.sort_by(SortField::Price).await.unwrap();
    assert!(matches!(result, Err(ClientError::Transport(_))));
    assert_eq!(h.sync.view(), before);
    assert!(h.presenter.history().is_empty());
}

#[tokio::test(start_paused = true)]
async fn edits_are_not_recorded_in_history() {
    let h = Harness::loaded().await;
    h.controller.reload().await.unwrap().unwrap();
    let recorded = h.presenter.history().len();

    let price = key(2, EditableField::Price);
    h.sync.begin_edit(price).unwrap();
    h.sync.update_draft(price, "81").unwrap();
    if let grid_client::Commit::Dispatched { task, .. } = h.sync.commit_edit(price).unwrap() {
        task.await.unwrap();
    }
    h.sync.delete_row(EntityId(3)).await.unwrap();

    assert_eq!(h.presenter.history().len(), recorded);
}
