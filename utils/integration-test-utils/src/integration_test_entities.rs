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


use entity_router::Entity;

/// Positioned test entity stored under the `objects` kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestObject {
    pub uuid: String,
    pub position: i64,
    pub value: String,
}

impl TestObject {
    pub fn new(uuid: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            position: 0,
            value: value.into(),
        }
    }

    pub fn at(uuid: impl Into<String>, position: i64) -> Self {
        Self {
            uuid: uuid.into(),
            position,
            value: String::new(),
        }
    }
}

impl Entity for TestObject {
    const KIND: &'static str = "objects";

    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn range_key(&self) -> i64 {
        self.position
    }
}
