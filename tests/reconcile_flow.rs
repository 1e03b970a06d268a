use listing_sync::catalog::load_seed;
use listing_sync::metadata;
use listing_sync::search::{self, SearchRequest};
use listing_sync::session::{Event, Session};
use listing_sync::{apply, FilterRecord, Input, SortOrder, ViewState};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

async fn seeded_state() -> ViewState {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/listings.json");
    ViewState::new(load_seed(path).await.expect("seed listings load"))
}

fn visible_ids(state: &ViewState) -> Vec<String> {
    state.visible().iter().map(|l| l.zpid.clone()).collect()
}

#[tokio::test]
async fn search_result_then_chat_reference_then_reset() {
    let state = seeded_state().await;
    assert_eq!(state.summary.returned_count, 10);

    let request = SearchRequest {
        location: Some("Texas".to_string()),
        max_price: Some(400_000),
        ..SearchRequest::default()
    };
    let result = search::run(&state.catalog, &request);
    let payload = json!({ "data": { "result": result.to_payload().to_string() } });

    let searched = apply(&Input::Payload(payload.clone()), &state);
    assert_eq!(searched.filters.query, "Texas");
    assert_eq!(searched.filters.price_max, Some(400_000));
    assert_eq!(visible_ids(&searched), vec!["29384756", "26651873"]);
    assert_eq!(searched.summary.location.as_deref(), Some("Texas"));
    assert!(searched.summary.map_bounds.is_some());
    assert_eq!(apply(&Input::Payload(payload), &searched), searched);

    // Not visible under the Texas filter, found in the whole catalog
    let chatted = apply(&Input::Text("tell me about 742 Evergreen Terrace".to_string()), &searched);
    assert_eq!(chatted.listing_context.as_deref(), Some("49023318"));
    assert_eq!(chatted.filters, searched.filters);

    let reset = apply(&Input::Payload(json!({})), &chatted);
    assert_eq!(reset.filters, FilterRecord::default());
    assert_eq!(reset.sort, SortOrder::HomesForYou);
    assert_eq!(reset.listing_context, None);
    assert_eq!(reset.summary.returned_count, 10);
}

#[tokio::test]
async fn detail_result_focuses_listing_without_touching_filters() {
    let state = seeded_state().await;
    let state = apply(&Input::Payload(json!({"maxPrice": 2000000, "bedsMin": 3})), &state);

    let detail = json!({
        "zpid": "13249875",
        "address": "18 Maple St, Boulder, CO 80302",
        "homeDetails": {"price": 1150000, "beds": 5, "description": "Craftsman with a mountain view"}
    });
    let payload = json!({ "response": detail.to_string() });

    let next = apply(&Input::Payload(payload), &state);
    assert_eq!(next.listing_context.as_deref(), Some("13249875"));
    assert_eq!(next.filters, state.filters);

    let focused = next.focused().expect("focused listing");
    assert_eq!(focused.description.as_deref(), Some("Craftsman with a mountain view"));
    assert_eq!(focused.display_address.as_deref(), Some("18 Maple St, Boulder, CO 80302"));
    assert_eq!(focused.neighborhood_note.as_deref(), Some("Quiet cul-de-sac near Wonderland Lake trails"));
}

#[tokio::test]
async fn garbage_payloads_degrade_to_no_opinion() {
    let state = seeded_state().await;
    let state = apply(&Input::Payload(json!({"location": "Denver"})), &state);

    for payload in [
        json!({"error": "Listing not found"}),
        Value::String("{\"listings\": [".to_string()),
        json!([1, 2, 3]),
    ] {
        assert_eq!(apply(&Input::Payload(payload), &state), state);
    }
}

#[tokio::test]
async fn session_applies_chat_directives_and_metadata_reflects_them() {
    let (session, _task) = Session::spawn(seeded_state().await);

    let snapshot = session
        .dispatch(Event::ChatText("under $700k with at least 4 beds".to_string()))
        .await
        .unwrap();
    assert_eq!(visible_ids(&snapshot.view), vec!["53877410", "49023318"]);

    let snapshot = session.dispatch(Event::SetSort(SortOrder::PriceLowHigh)).await.unwrap();
    assert_eq!(visible_ids(&snapshot.view), vec!["49023318", "53877410"]);

    let outbound = metadata::build(&snapshot.view, "is 742 Evergreen Terrace still available?");
    assert_eq!(outbound["zpid"], json!("49023318"));
    assert_eq!(outbound["filters"]["maxPrice"], json!(700000));
    assert_eq!(outbound["uiFilters"]["bedsMin"], json!(4));
    assert_eq!(outbound["activeFilters"]["sortOrder"], json!("priceLowHigh"));
}
