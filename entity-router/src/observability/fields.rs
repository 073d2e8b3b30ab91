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

//! Canonical structured field keys and value-format helpers.

use std::time::Duration;

pub const EVENT: &str = "event";
pub const COMPONENT: &str = "component";
pub const REQUEST_ID: &str = "request_id";
pub const REQUEST_NAME: &str = "request_name";
pub const ROUTER_ID: &str = "router_id";
pub const TARGET_ID: &str = "target_id";
pub const SOURCE_ID: &str = "source_id";
pub const DRIVER_ID: &str = "driver_id";
pub const RESULT_TYPE: &str = "result_type";
pub const ELAPSED_MS: &str = "elapsed_ms";
pub const OPTION: &str = "option";
pub const DEPTH: &str = "depth";
pub const PATTERN: &str = "pattern";
pub const REASON: &str = "reason";
pub const ERR: &str = "err";

pub const NONE: &str = "none";
pub const REASON_ROUTER_REENTERED: &str = "router_reentered";
pub const REASON_MAX_DEPTH: &str = "max_depth";

/// Formats a duration as fractional milliseconds for `elapsed_ms` fields.
pub fn format_elapsed_ms(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::format_elapsed_ms;
    use std::time::Duration;

    #[test]
    fn elapsed_is_reported_in_milliseconds() {
        assert_eq!(format_elapsed_ms(Duration::from_micros(1500)), 1.5);
    }
}
