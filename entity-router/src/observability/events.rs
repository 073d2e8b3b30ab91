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

//! Canonical structured event names used across `entity-router`.

// Dispatch engine events.
pub const DISPATCH_RECEIVED: &str = "dispatch_received";
pub const DISPATCH_COMPLETED: &str = "dispatch_completed";
pub const DISPATCH_ROUTE_NOT_CONFIGURED: &str = "dispatch_route_not_configured";
pub const DISPATCH_CYCLE_DETECTED: &str = "dispatch_cycle_detected";
pub const TARGET_DRIVER_RESPONSE: &str = "target_driver_response";
pub const TARGET_ROUTER_RESPONSE: &str = "target_router_response";
pub const TARGET_ROUTER_UNBOUND: &str = "target_router_unbound";
pub const TARGET_DRIVER_FAILED: &str = "target_driver_failed";
pub const TARGET_DRIVER_PANICKED: &str = "target_driver_panicked";
pub const RESULT_GROUP: &str = "result_group";
pub const REDIRECT_TRIGGER: &str = "redirect_trigger";
pub const REDIRECT_OPTION_SET: &str = "redirect_option_set";
pub const OPTIONS_PROCESS: &str = "options_process";

// Subscription events.
pub const SUBSCRIBE_DRIVER_FAILED: &str = "subscribe_driver_failed";
pub const SUBSCRIBE_MERGED: &str = "subscribe_merged";
pub const SUBSCRIBE_EMPTY: &str = "subscribe_empty";
pub const CONSUMER_CANCELLED: &str = "consumer_cancelled";

// Async buffer events.
pub const BUFFER_MISSING: &str = "buffer_missing";
pub const BUFFER_REJECTED: &str = "buffer_rejected";
pub const BUFFER_REGISTERED: &str = "buffer_registered";

// Routing and configuration events.
pub const PATTERN_INVALID: &str = "pattern_invalid";
pub const FILTER_PATTERN_INVALID: &str = "filter_pattern_invalid";
pub const REDIRECT_CONDITION_UNKNOWN: &str = "redirect_condition_unknown";
pub const TARGETS_MAPPED: &str = "targets_mapped";

// Provider lifecycle events.
pub const PROVIDER_LOAD_START: &str = "provider_load_start";
pub const PROVIDER_LOAD_OK: &str = "provider_load_ok";
pub const PROVIDER_RELOAD_SCHEDULED: &str = "provider_reload_scheduled";
pub const PROVIDER_RELOAD_LAGGED: &str = "provider_reload_lagged";
pub const PROVIDER_RELOAD_STOPPED: &str = "provider_reload_stopped";
pub const ROUTER_ADD_OK: &str = "router_add_ok";
pub const ROUTER_ADD_FAILED: &str = "router_add_failed";
pub const ROUTER_REMOVE_OK: &str = "router_remove_ok";
pub const ROUTER_REMOVE_FAILED: &str = "router_remove_failed";
