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


use entity_router::{
    OperationMode, ResultType, RouteConfiguration, RouterConfiguration, TargetConfiguration,
};
use integration_test_utils::{
    redirect_on, result_types, FailingDriver, FailureMode, MemoryDriver, RouterHarness, TestObject,
};
use std::time::Duration;
use tokio::time::timeout;

fn flaky_then_store() -> RouterConfiguration {
    RouterConfiguration::new(
        "main",
        "default",
        vec![RouteConfiguration::new(
            "objects",
            ["objects\\..*"],
            vec![
                TargetConfiguration::driver("flaky", "flaky").with_redirect(redirect_on(
                    "on-error",
                    &["InternalError"],
                    &["fallback"],
                    Vec::new(),
                )),
                TargetConfiguration::driver("store", "store"),
            ],
        )],
    )
}

async fn failing_driver_is_contained(mode: FailureMode) {
    let flaky = FailingDriver::new("flaky-1", mode);
    let store = MemoryDriver::with_objects("store-1", [TestObject::new("obj:1", "a")]);
    let fallback = MemoryDriver::new("fallback-1");
    let harness = RouterHarness::new(
        vec![flaky_then_store()],
        vec![
            flaky.driver("flaky"),
            store.driver("store"),
            fallback.driver("fallback"),
        ],
    );

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .read("objects.read", ["obj:1", "obj:2"], None)
        .await;

    assert_eq!(
        result_types(&response),
        vec![
            ResultType::InternalError,
            ResultType::InternalError,
            ResultType::Ok,
            ResultType::NotFound,
        ]
    );
    assert_eq!(response.results[0].source_id, "flaky-1");
    assert_eq!(response.results[1].query.as_deref(), Some("obj:2"));
    assert_eq!(flaky.calls(), 1);
    assert!(fallback.calls().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn driver_error_becomes_internal_error_per_query() {
    failing_driver_is_contained(FailureMode::Error).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn driver_panic_becomes_internal_error_per_query() {
    failing_driver_is_contained(FailureMode::Panic).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_publish_reports_each_entity() {
    let flaky = FailingDriver::new("flaky-1", FailureMode::Panic);
    let store = MemoryDriver::new("store-1");
    let harness = RouterHarness::new(
        vec![flaky_then_store()],
        vec![flaky.driver("flaky"), store.driver("store")],
    );

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .publish(
            "objects.publish",
            vec![TestObject::new("obj:1", "a"), TestObject::new("obj:2", "b")],
            OperationMode::Sync,
            None,
        )
        .await;

    assert_eq!(
        result_types(&response),
        vec![
            ResultType::InternalError,
            ResultType::InternalError,
            ResultType::Ok,
            ResultType::Ok,
        ]
    );
    assert_eq!(store.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_publish_reports_only_the_entities_it_received() {
    let flaky = FailingDriver::new("flaky-1", FailureMode::Error);
    let harness = RouterHarness::new(
        vec![RouterConfiguration::new(
            "main",
            "default",
            vec![RouteConfiguration::new(
                "objects",
                ["objects.publish"],
                vec![TargetConfiguration::driver("flaky", "flaky")],
            )
            .with_filters(["^obj:"])],
        )],
        vec![flaky.driver("flaky")],
    );
    let objects = harness.router("main").entities::<TestObject>();

    let response = objects
        .publish(
            "objects.publish",
            vec![TestObject::new("obj:1", "a"), TestObject::new("misc:1", "b")],
            OperationMode::Sync,
            None,
        )
        .await;
    assert_eq!(result_types(&response), vec![ResultType::InternalError]);
    assert_eq!(response.results[0].query.as_deref(), Some("obj:1"));
    assert_eq!(response.results[0].source_id, "flaky-1");

    let filtered_out = objects
        .publish(
            "objects.publish",
            vec![TestObject::new("misc:2", "c")],
            OperationMode::Sync,
            None,
        )
        .await;
    assert!(filtered_out.results.is_empty());
    assert_eq!(flaky.calls(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn failing_subscription_leaves_the_others() {
    let flaky = FailingDriver::new("flaky-1", FailureMode::Error);
    let store = MemoryDriver::new("store-1");
    let harness = RouterHarness::new(
        vec![flaky_then_store()],
        vec![flaky.driver("flaky"), store.driver("store")],
    );

    let mut consumer = harness
        .router("main")
        .entities::<TestObject>()
        .subscribe("objects.subscribe", None)
        .await
        .expect("store subscription");

    assert_eq!(store.emit(vec![TestObject::new("obj:1", "a")]).await, 1);
    let received = timeout(Duration::from_secs(2), consumer.recv())
        .await
        .expect("delivered in time")
        .expect("open consumer");
    assert_eq!(received[0].uuid, "obj:1");
    assert_eq!(flaky.calls(), 1);
}
