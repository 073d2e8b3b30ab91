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

use entity_router::{
    BufferKey, BufferOperation, Capability, EntityDeleteRequest, OperationMode, PublishResultType,
    ResultType, RouteConfiguration, RouterConfiguration, TargetConfiguration,
};
use integration_test_utils::{driver_route, result_types, MemoryDriver, RouterHarness, TestObject};
use support::{publish_buffer, BUFFER_CAPACITY};

fn mem_router() -> RouterConfiguration {
    RouterConfiguration::new(
        "main",
        "default",
        vec![driver_route("objects", &["objects.publish", "objects.delete"], "mem")],
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn synchronous_publish_calls_the_driver() {
    let mem = MemoryDriver::new("mem-1");
    let harness = RouterHarness::new(vec![mem_router()], vec![mem.driver("mem")]);
    let objects = harness.router("main").entities::<TestObject>();

    let response = objects
        .publish(
            "objects.publish",
            vec![TestObject::new("obj:123", "a")],
            OperationMode::Sync,
            None,
        )
        .await;

    assert_eq!(response.results.len(), 1);
    let result = &response.results[0];
    assert_eq!(result.source_id, "mem-1");
    assert_eq!(result.query.as_deref(), Some("obj:123"));
    assert_eq!(result.result_type, ResultType::Ok);
    assert_eq!(
        mem.calls_for(Capability::Publish)[0].queries,
        vec!["obj:123".to_string()]
    );

    let kinds = |response: &entity_router::RouteResponse<entity_router::PublishResult<TestObject>>| {
        response
            .content()
            .iter()
            .map(|published| published.kind)
            .collect::<Vec<_>>()
    };
    assert_eq!(kinds(&response), vec![PublishResultType::Created]);

    let unchanged = objects
        .publish(
            "objects.publish",
            vec![TestObject::new("obj:123", "a")],
            OperationMode::Sync,
            None,
        )
        .await;
    assert_eq!(kinds(&unchanged), vec![PublishResultType::Unchanged]);

    let changed = objects
        .publish(
            "objects.publish",
            vec![TestObject::new("obj:123", "b")],
            OperationMode::Sync,
            None,
        )
        .await;
    assert_eq!(kinds(&changed), vec![PublishResultType::Changed]);
}

#[tokio::test(flavor = "multi_thread")]
async fn asynchronous_publish_is_queued() {
    let mem = MemoryDriver::new("mem-1");
    let harness = RouterHarness::new(vec![mem_router()], vec![mem.driver("mem")]);
    let buffer = publish_buffer(&harness, "mem", BUFFER_CAPACITY);

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .publish(
            "objects.publish",
            vec![TestObject::new("obj:123", "a")],
            OperationMode::Async,
            None,
        )
        .await;

    assert_eq!(result_types(&response), vec![ResultType::Ok]);
    assert_eq!(response.results[0].source_id, "mem-1");
    assert_eq!(
        response.content()[0].kind,
        PublishResultType::Queued
    );
    assert!(mem.calls_for(Capability::Publish).is_empty());
    assert_eq!(buffer.accepted(), 1);
    assert_eq!(buffer.drain(BUFFER_CAPACITY)[0].uuid, "obj:123");
}

#[tokio::test(flavor = "multi_thread")]
async fn asynchronous_publish_without_buffer_fails_per_entity() {
    let mem = MemoryDriver::new("mem-1");
    let harness = RouterHarness::new(vec![mem_router()], vec![mem.driver("mem")]);

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .publish(
            "objects.publish",
            vec![TestObject::new("obj:1", "a"), TestObject::new("obj:2", "b")],
            OperationMode::Async,
            None,
        )
        .await;

    assert_eq!(
        result_types(&response),
        vec![ResultType::InternalError, ResultType::InternalError]
    );
    assert!(mem.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn saturated_buffer_rejects_the_overflow() {
    let mem = MemoryDriver::new("mem-1");
    let harness = RouterHarness::new(vec![mem_router()], vec![mem.driver("mem")]);
    let buffer = publish_buffer(&harness, "mem", 1);

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .publish(
            "objects.publish",
            vec![TestObject::new("obj:1", "a"), TestObject::new("obj:2", "b")],
            OperationMode::Async,
            None,
        )
        .await;

    assert_eq!(
        result_types(&response),
        vec![ResultType::Ok, ResultType::InternalError]
    );
    assert_eq!(response.results[1].query.as_deref(), Some("obj:2"));
    assert_eq!(buffer.rejected(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn asynchronous_delete_uses_the_delete_buffer() {
    let mem = MemoryDriver::with_objects("mem-1", [TestObject::new("obj:1", "a")]);
    let harness = RouterHarness::new(vec![mem_router()], vec![mem.driver("mem")]);
    let buffer = harness.buffers.register_memory::<EntityDeleteRequest>(
        BufferKey::for_entity::<TestObject>(BufferOperation::Delete, "mem"),
        BUFFER_CAPACITY,
    );

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .delete(
            "objects.delete",
            vec![EntityDeleteRequest::new("obj:1")],
            OperationMode::Async,
            None,
        )
        .await;

    assert_eq!(response.content(), vec![&true]);
    assert_eq!(buffer.drain(BUFFER_CAPACITY), vec![EntityDeleteRequest::new("obj:1")]);
    assert!(mem.get("obj:1").is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn route_filters_limit_published_entities() {
    let mem = MemoryDriver::new("mem-1");
    let harness = RouterHarness::new(
        vec![RouterConfiguration::new(
            "main",
            "default",
            vec![RouteConfiguration::new(
                "objects",
                ["objects.publish"],
                vec![TargetConfiguration::driver("mem", "mem")],
            )
            .with_filters(["^obj:", "!^obj:tmp"])],
        )],
        vec![mem.driver("mem")],
    );

    let response = harness
        .router("main")
        .entities::<TestObject>()
        .publish(
            "objects.publish",
            vec![
                TestObject::new("obj:1", "a"),
                TestObject::new("obj:tmp-1", "b"),
                TestObject::new("misc:1", "c"),
            ],
            OperationMode::Sync,
            None,
        )
        .await;

    assert_eq!(result_types(&response), vec![ResultType::Ok]);
    assert_eq!(
        mem.calls_for(Capability::Publish)[0].queries,
        vec!["obj:1".to_string()]
    );
}
