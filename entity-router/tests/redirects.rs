/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/


mod support;

use entity_router::query_range::{START, STOP};
use entity_router::{
    Capability, EntityEmptyRequest, RedirectOption, ResultType, RouteConfiguration, RouteQuery,
    RouterConfiguration, TargetConfiguration,
};
use integration_test_utils::{
    ok_queries, redirect_on, result_types, MemoryDriver, RouterHarness, TestObject,
};
use support::{
    cache_through_router, empty_buffer, publish_buffer, CapturedLogs, BUFFER_CAPACITY, CACHE,
    STORE,
};

#[tokio::test(flavor = "multi_thread")]
async fn cache_miss_is_redirected_and_republished() {
    let cache = MemoryDriver::new("cache-1");
    let store = MemoryDriver::with_objects("store-1", [TestObject::new("obj:1", "stored")]);
    let harness = RouterHarness::new(
        vec![cache_through_router(
            &["NotFound"],
            vec![RedirectOption::Publish],
        )],
        vec![cache.driver(CACHE), store.driver(STORE)],
    );
    let cache_publish = publish_buffer(&harness, CACHE, BUFFER_CAPACITY);

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:1"], None)
        .await;

    assert_eq!(
        result_types(&response),
        vec![ResultType::NotFound, ResultType::Ok]
    );
    assert_eq!(
        response
            .results
            .iter()
            .map(|result| result.source_id.as_str())
            .collect::<Vec<_>>(),
        vec!["cache-1", "store-1"]
    );
    assert_eq!(
        cache_publish.drain(BUFFER_CAPACITY),
        vec![TestObject::new("obj:1", "stored")]
    );
    assert!(cache.calls_for(Capability::Publish).is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn redirect_only_receives_the_triggering_queries() {
    let cache = MemoryDriver::with_objects("cache-1", [TestObject::new("obj:2", "cached")]);
    let store = MemoryDriver::with_objects("store-1", [TestObject::new("obj:1", "stored")]);
    let harness = RouterHarness::new(
        vec![cache_through_router(&["NotFound"], Vec::new())],
        vec![cache.driver(CACHE), store.driver(STORE)],
    );

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:1", "obj:2"], None)
        .await;

    assert_eq!(
        result_types(&response),
        vec![ResultType::NotFound, ResultType::Ok, ResultType::Ok]
    );
    assert_eq!(ok_queries(&response), vec!["obj:2", "obj:1"]);
    assert_eq!(
        store.calls_for(Capability::Read)[0].queries,
        vec!["obj:1".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn unmatched_condition_does_not_redirect() {
    let cache = MemoryDriver::new("cache-1");
    let store = MemoryDriver::with_objects("store-1", [TestObject::new("obj:1", "stored")]);
    let harness = RouterHarness::new(
        vec![cache_through_router(&["Empty"], vec![RedirectOption::Publish])],
        vec![cache.driver(CACHE), store.driver(STORE)],
    );

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:1"], None)
        .await;

    assert_eq!(result_types(&response), vec![ResultType::NotFound]);
    assert!(store.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_redirect_result_empties_the_primary() {
    let cache = MemoryDriver::new("cache-1");
    let store = MemoryDriver::new("store-1");
    store.mark_empty("obj:9");
    let harness = RouterHarness::new(
        vec![cache_through_router(&["NotFound"], vec![RedirectOption::Empty])],
        vec![cache.driver(CACHE), store.driver(STORE)],
    );
    let cache_empty = empty_buffer(&harness, CACHE);

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:9"], None)
        .await;

    assert_eq!(
        result_types(&response),
        vec![ResultType::NotFound, ResultType::Empty]
    );
    assert_eq!(
        cache_empty.drain(BUFFER_CAPACITY),
        vec![EntityEmptyRequest::new("obj:9")]
    );
}

/// `main` router whose reads go to the cache and are redirected to `sources` on `conditions`.
fn cache_redirecting_to(
    conditions: &[&str],
    sources: &[&str],
    options: Vec<RedirectOption>,
) -> RouterConfiguration {
    RouterConfiguration::new(
        "main",
        "default",
        vec![
            RouteConfiguration::new(
                "objects-read",
                ["objects.read"],
                vec![TargetConfiguration::driver("cache-read", CACHE)
                    .with_redirect(redirect_on("again", conditions, sources, options))],
            ),
            RouteConfiguration::new(
                "objects-write",
                ["objects.publish", "objects.empty"],
                vec![TargetConfiguration::driver("cache-write", CACHE)],
            ),
        ],
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn self_redirect_does_not_republish_into_its_source() {
    let cache = MemoryDriver::with_objects("cache-1", [TestObject::new("obj:1", "cached")]);
    let harness = RouterHarness::new(
        vec![cache_redirecting_to(
            &["Ok"],
            &[CACHE],
            vec![RedirectOption::Publish],
        )],
        vec![cache.driver(CACHE)],
    );
    let cache_publish = publish_buffer(&harness, CACHE, BUFFER_CAPACITY);

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:1"], None)
        .await;

    assert_eq!(
        result_types(&response),
        vec![ResultType::Ok, ResultType::Ok]
    );
    assert!(response
        .results
        .iter()
        .all(|result| result.source_id == "cache-1"));
    assert!(cache_publish.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn only_results_from_other_sources_are_republished() {
    let cache = MemoryDriver::new("cache-1");
    let store = MemoryDriver::with_objects("store-1", [TestObject::new("obj:1", "stored")]);
    let harness = RouterHarness::new(
        vec![cache_redirecting_to(
            &["NotFound"],
            &[CACHE, STORE],
            vec![RedirectOption::Publish],
        )],
        vec![cache.driver(CACHE), store.driver(STORE)],
    );
    let cache_publish = publish_buffer(&harness, CACHE, BUFFER_CAPACITY);

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:1"], None)
        .await;

    assert_eq!(
        result_types(&response),
        vec![ResultType::NotFound, ResultType::NotFound, ResultType::Ok]
    );
    assert_eq!(
        cache_publish.drain(BUFFER_CAPACITY),
        vec![TestObject::new("obj:1", "stored")]
    );
}

#[tokio::test]
async fn republish_carries_the_originating_request_id() {
    let logs = CapturedLogs::default();
    let _guard = logs.install();

    let cache = MemoryDriver::new("cache-1");
    let store = MemoryDriver::with_objects("store-1", [TestObject::new("obj:1", "stored")]);
    let harness = RouterHarness::new(
        vec![cache_through_router(
            &["NotFound"],
            vec![RedirectOption::Publish],
        )],
        vec![cache.driver(CACHE), store.driver(STORE)],
    );
    let cache_publish = publish_buffer(&harness, CACHE, BUFFER_CAPACITY);

    harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:1"], Some("req-7".to_string()))
        .await;

    assert_eq!(cache_publish.len(), 1);
    let republished: Vec<String> = logs
        .lines()
        .into_iter()
        .filter(|line| line.contains("dispatch received") && line.contains("Publish"))
        .collect();
    assert_eq!(republished.len(), 1);
    assert!(republished[0].contains("request_id=\"req-7\""));
}

#[tokio::test(flavor = "multi_thread")]
async fn unbound_source_redirects_on_route_not_configured() {
    let store = MemoryDriver::with_objects("store-1", [TestObject::new("obj:1", "stored")]);
    let harness = RouterHarness::new(
        vec![RouterConfiguration::new(
            "main",
            "default",
            vec![RouteConfiguration::new(
                "objects-read",
                ["objects.read"],
                vec![TargetConfiguration::driver("ghost-read", "ghost").with_redirect(
                    redirect_on("unrouted", &["RouteNotConfigured"], &[STORE], Vec::new()),
                )],
            )],
        )],
        vec![store.driver(STORE)],
    );

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:1"], None)
        .await;

    assert_eq!(
        result_types(&response),
        vec![ResultType::RouteNotConfigured, ResultType::Ok]
    );
    assert_eq!(
        response
            .results
            .iter()
            .map(|result| result.source_id.as_str())
            .collect::<Vec<_>>(),
        vec!["main", "store-1"]
    );
    assert_eq!(
        store.calls_for(Capability::Read)[0].queries,
        vec!["obj:1".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn range_redirect_only_asks_for_the_remainder() {
    let cache = MemoryDriver::with_objects(
        "cache-1",
        [TestObject::at("obj:a/1", 1), TestObject::at("obj:a/2", 2)],
    );
    let store = MemoryDriver::with_objects(
        "store-1",
        (1..=5).map(|position| TestObject::at(format!("obj:a/{position}"), position)),
    );
    let harness = RouterHarness::new(
        vec![cache_through_router(&["Ok", "NotFound"], Vec::new())],
        vec![cache.driver(CACHE), store.driver(STORE)],
    );
    let objects = harness.router("main").entities::<TestObject>();
    let window = || {
        vec![RouteQuery::new("obj:a")
            .with_parameter(START, 0)
            .with_parameter(STOP, 10)]
    };

    let response = objects
        .query("objects.query", window(), 0, 10, None)
        .await;
    assert_eq!(
        response
            .content()
            .iter()
            .map(|object| object.position)
            .collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );

    let exhausted = objects.query("objects.query", window(), 0, 2, None).await;
    assert_eq!(exhausted.content().len(), 2);
    assert_eq!(store.calls_for(Capability::Query).len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn range_redirect_accounts_for_rows_found_by_other_queries() {
    let cache = MemoryDriver::with_objects(
        "cache-1",
        [TestObject::at("obj:a/1", 1), TestObject::at("obj:a/2", 2)],
    );
    let store = MemoryDriver::with_objects(
        "store-1",
        (1..=5)
            .map(|position| TestObject::at(format!("obj:a/{position}"), position))
            .chain([TestObject::at("obj:b/1", 1)]),
    );
    let harness = RouterHarness::new(
        vec![cache_through_router(&["NotFound"], Vec::new())],
        vec![cache.driver(CACHE), store.driver(STORE)],
    );
    let window = |prefix: &str| {
        RouteQuery::new(prefix)
            .with_parameter(START, 0)
            .with_parameter(STOP, 10)
    };

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .query(
            "objects.query",
            vec![window("obj:a"), window("obj:b")],
            0,
            10,
            None,
        )
        .await;

    assert_eq!(
        response
            .content()
            .iter()
            .map(|object| object.uuid.as_str())
            .collect::<Vec<_>>(),
        vec!["obj:a/1", "obj:a/2", "obj:a/3", "obj:a/4", "obj:a/5", "obj:b/1"]
    );
    assert_eq!(
        store.calls_for(Capability::Query)[0].queries,
        vec!["obj:a".to_string(), "obj:b".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn redirect_can_target_a_nested_router() {
    let cache = MemoryDriver::new("cache-1");
    let archive = MemoryDriver::with_objects("archive-1", [TestObject::new("obj:1", "archived")]);
    let harness = RouterHarness::new(
        vec![
            RouterConfiguration::new(
                "main",
                "default",
                vec![RouteConfiguration::new(
                    "objects-read",
                    ["objects.read"],
                    vec![TargetConfiguration::driver("cache-read", CACHE).with_redirect(
                        redirect_on("miss", &["NotFound"], &[], Vec::new()).with_target(
                            TargetConfiguration::router("to-archive", "archive-router"),
                        ),
                    )],
                )],
            ),
            RouterConfiguration::new(
                "archive-router",
                "Archive",
                vec![RouteConfiguration::new(
                    "all",
                    ["*"],
                    vec![TargetConfiguration::driver("archive", "archive")],
                )],
            ),
        ],
        vec![cache.driver(CACHE), archive.driver("archive")],
    );

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:1"], None)
        .await;

    assert_eq!(
        result_types(&response),
        vec![ResultType::NotFound, ResultType::Ok]
    );
    assert_eq!(response.results[1].source_id, "archive-1");
}
