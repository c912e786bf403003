mod common;

use std::sync::Arc;

use futures::StreamExt;
use gw2api::{Connection, Error, GetAll, GetByIds, GetPaginated, Gw2Api};

use common::{json_response, query_param, RecordingTransport};

fn world_json(id: i32) -> String {
    format!(r#"{{"id":{id},"name":"World {id}","population":"Medium"}}"#)
}

fn worlds_body(ids: impl IntoIterator<Item = i32>) -> String {
    let worlds: Vec<String> = ids.into_iter().map(world_json).collect();
    format!("[{}]", worlds.join(","))
}

fn api_with(transport: Arc<RecordingTransport>) -> Gw2Api {
    let conn = Connection::builder()
        .with_base_url("https://api.test/v2")
        .with_transport(transport)
        .build()
        .unwrap();
    Gw2Api::new(conn)
}

/// Serves 150 worlds in pages, announcing the totals in headers.
fn paged_worlds_transport() -> RecordingTransport {
    RecordingTransport::new(|url| {
        let page: i32 = query_param(url, "page").unwrap().parse().unwrap();
        let page_size: i32 = query_param(url, "page_size").unwrap().parse().unwrap();
        let start = page * page_size;
        let end = (start + page_size).min(150);
        let body = worlds_body((start + 1)..=end.max(start));
        Ok(json_response(
            &body,
            &[
                ("X-Result-Total", "150"),
                ("X-Page-Size", "50"),
                ("X-Page-Total", "3"),
            ],
        ))
    })
}

#[tokio::test]
async fn three_pages_and_no_fourth_fetch() {
    let transport = Arc::new(paged_worlds_transport());
    let api = api_with(transport.clone());

    let worlds = api.worlds();
    let mut seq = worlds.pages(50);
    let mut pages = 0;
    let mut items = 0;
    while let Some(page) = seq.next().await {
        let page = page.unwrap();
        assert_eq!(page.result_total(), Some(150));
        items += page.content().len();
        pages += 1;
    }
    assert_eq!(pages, 3);
    assert_eq!(items, 150);
    assert_eq!(transport.calls(), 3, "must not fetch past the known total");
}

#[tokio::test]
async fn item_stream_flattens_lazily() {
    let transport = Arc::new(paged_worlds_transport());
    let api = api_with(transport.clone());

    let worlds = api.worlds();
    let stream = worlds.pages(50).into_items();
    // Building the stream must not fetch anything.
    assert_eq!(transport.calls(), 0);

    let ids: Vec<i32> = stream.map(|w| w.unwrap().id).collect().await;
    assert_eq!(ids.len(), 150);
    assert_eq!(ids[0], 1);
    assert_eq!(ids[149], 150);
    assert_eq!(transport.calls(), 3);
}

#[tokio::test]
async fn pagination_is_restartable() {
    let transport = Arc::new(paged_worlds_transport());
    let api = api_with(transport.clone());
    let worlds = api.worlds();

    let mut seq = worlds.pages(50);
    let mut first = Vec::new();
    while let Some(page) = seq.next().await {
        first.extend(page.unwrap().into_content().into_iter().map(|w| w.id));
    }
    assert_eq!(first.len(), 150);

    seq.reset();
    let mut second = Vec::new();
    while let Some(page) = seq.next().await {
        second.extend(page.unwrap().into_content().into_iter().map(|w| w.id));
    }
    assert_eq!(first, second);

    let fresh: Vec<i32> = worlds
        .pages(50)
        .into_items()
        .map(|w| w.unwrap().id)
        .collect()
        .await;
    assert_eq!(first, fresh);
}

#[tokio::test]
async fn short_page_ends_the_sequence() {
    let transport = Arc::new(RecordingTransport::new(|_url| {
        Ok(json_response(&worlds_body(1..=20), &[]))
    }));
    let api = api_with(transport.clone());

    let worlds = api.worlds();
    let mut seq = worlds.pages(50);
    let page = seq.next().await.unwrap().unwrap();
    assert_eq!(page.content().len(), 20);
    assert!(seq.next().await.is_none());
    assert_eq!(transport.calls(), 1);
}

/// Serves worlds for every requested id except 999, which the API does not
/// know.
fn by_ids_transport() -> RecordingTransport {
    RecordingTransport::new(|url| {
        let ids = query_param(url, "ids").unwrap();
        if ids == "all" {
            return Ok(json_response(&worlds_body(1..=3), &[]));
        }
        let known: Vec<i32> = ids
            .split(',')
            .map(|id| id.parse().unwrap())
            .filter(|id| *id != 999)
            .collect();
        Ok(json_response(&worlds_body(known), &[]))
    })
}

#[tokio::test]
async fn by_ids_reports_missing_ids_as_partial_result() {
    let transport = Arc::new(by_ids_transport());
    let api = api_with(transport.clone());

    let result = api.worlds().many(&[1, 2, 3, 999]).await.unwrap();
    let ids: Vec<i32> = result.items.iter().map(|w| w.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(result.missing, vec![999]);
    assert!(!result.is_complete());
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn by_ids_chunks_and_preserves_requested_order() {
    let transport = Arc::new(by_ids_transport());
    let api = api_with(transport.clone());

    // 250 ids, requested in descending order: two batches of 200 and 50.
    let requested: Vec<i32> = (1..=250).rev().collect();
    let result = api.worlds().many(&requested).await.unwrap();
    assert!(result.is_complete());
    let ids: Vec<i32> = result.items.iter().map(|w| w.id).collect();
    assert_eq!(ids, requested);
    assert_eq!(transport.calls(), 2);

    let first_batch = query_param(&transport.requests()[0], "ids").unwrap();
    assert_eq!(first_batch.split(',').count(), 200);
}

#[tokio::test]
async fn single_by_id_unwraps_the_one_item() {
    let transport = Arc::new(by_ids_transport());
    let api = api_with(transport.clone());

    let resp = api.worlds().single(1007).await.unwrap();
    assert_eq!(resp.content().id, 1007);
    assert_eq!(resp.content().name, "World 1007");

    match api.worlds().single(999).await {
        Err(Error::Api { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected a not-found error, got {other:?}"),
    }
}

#[tokio::test]
async fn by_ids_rejects_an_empty_id_set() {
    let transport = Arc::new(by_ids_transport());
    let api = api_with(transport.clone());

    let result = api.worlds().many(&[]).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn all_uses_a_single_ids_all_request_when_supported() {
    let transport = Arc::new(by_ids_transport());
    let api = api_with(transport.clone());

    let resp = api.worlds().all().await.unwrap();
    assert_eq!(resp.content().len(), 3);
    assert_eq!(transport.calls(), 1);
    assert_eq!(
        query_param(&transport.requests()[0], "ids").unwrap(),
        "all"
    );
}

#[tokio::test]
async fn all_walks_the_id_list_when_ids_all_is_unsupported() {
    let transport = Arc::new(RecordingTransport::new(|url| {
        match query_param(url, "ids") {
            None => Ok(json_response(r#"["box","cake"]"#, &[])),
            Some(ids) => {
                assert_eq!(ids, "box,cake");
                Ok(json_response(
                    r#"[{"id":"box","url":"https://static.test/box.jpg"},
                        {"id":"cake","url":"https://static.test/cake.jpg"}]"#,
                    &[],
                ))
            }
        }
    }));
    let api = api_with(transport.clone());

    let resp = api.quaggans().all().await.unwrap();
    let ids: Vec<&str> = resp.content().iter().map(|q| q.id.as_str()).collect();
    assert_eq!(ids, vec!["box", "cake"]);
    assert_eq!(transport.calls(), 2);
}
