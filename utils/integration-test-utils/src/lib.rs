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


mod integration_test_entities;
pub use integration_test_entities::TestObject;
mod integration_test_drivers;
pub use integration_test_drivers::{DriverCall, MemoryDriver};
mod driver_failing;
pub use driver_failing::{FailingDriver, FailureMode};
mod integration_test_utils;

pub use integration_test_utils::{
    driver_route, init_logging, ok_queries, redirect_on, result_types, wait_until, RouterHarness,
};
