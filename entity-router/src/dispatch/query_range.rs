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

//! Redirect narrowing for range queries.
//!
//! A range query carries `start`/`stop` per query and `skip`/`take` on the request. When a
//! redirect fires, the redirected request only asks for what the primary targets did not return.

use crate::entity::Entity;
use crate::request::{RouteQuery, RouteRequest};
use crate::result::RouteResult;

pub const START: &str = "start";
pub const STOP: &str = "stop";
pub const SKIP: &str = "skip";
pub const TAKE: &str = "take";

/// Builds the redirected request for a range query.
///
/// For each query the new `start` is one past the highest `range_key` among that query's `Ok`
/// results, when that is beyond the original start. A query is kept while its window is still
/// open or nothing has been found so far. `skip` and `take` are reduced by the number of `Ok`
/// results; once `take` is exhausted no queries are forwarded.
pub fn narrow_range<E: Entity>(request: &RouteRequest, results: &[RouteResult<E>]) -> RouteRequest {
    if request.queries.is_empty() {
        return request.clone();
    }

    let mut skip: i64 = request.parameter(SKIP).unwrap_or(0);
    let mut take: i64 = request.parameter(TAKE).unwrap_or(0);
    let mut count: i64 = 0;
    let mut queries = Vec::new();

    for query in &request.queries {
        let start: i64 = query.parameter(START).unwrap_or(0);
        let stop: i64 = query.parameter(STOP).unwrap_or(0);

        let mut found = 0i64;
        let mut max_found = 0i64;
        for entity in results
            .iter()
            .filter(|result| result.is_ok() && result.query.as_deref() == Some(query.query.as_str()))
            .filter_map(|result| result.content.as_ref())
        {
            max_found = if found == 0 {
                entity.range_key()
            } else {
                max_found.max(entity.range_key())
            };
            found += 1;
        }
        count += found;

        let redirect_start = if max_found > start {
            max_found.saturating_add(1)
        } else {
            start
        };
        if stop - redirect_start > 0 || count == 0 {
            queries.push(
                RouteQuery::new(query.query.clone())
                    .with_parameter(START, redirect_start)
                    .with_parameter(STOP, stop),
            );
        }
    }

    if count > 0 {
        skip = (skip - count).max(0);
    }
    take -= count;

    let mut redirected = request.derive_empty();
    redirected.set_parameter(SKIP, skip);
    redirected.set_parameter(TAKE, take);
    if take > 0 {
        redirected.queries = queries;
    }
    redirected
}

#[cfg(test)]
mod tests {
    use super::{narrow_range, SKIP, START, STOP, TAKE};
    use crate::request::{RouteQuery, RouteRequest};
    use crate::result::RouteResult;
    use crate::test_support::Note;

    fn range_request(skip: i64, take: i64) -> RouteRequest {
        RouteRequest::new(
            "[Entities] Query notes",
            Some("req-1".to_string()),
            [
                RouteQuery::new("sensor-a")
                    .with_parameter(START, 100)
                    .with_parameter(STOP, 200),
                RouteQuery::new("sensor-b")
                    .with_parameter(START, 100)
                    .with_parameter(STOP, 200),
            ],
        )
        .with_parameter(SKIP, skip)
        .with_parameter(TAKE, take)
    }

    #[test]
    fn window_starts_after_the_latest_found_entity() {
        let request = range_request(0, 10);
        let results = vec![
            RouteResult::ok("cache-1", "sensor-a", Note::at("n1", 120)),
            RouteResult::ok("cache-1", "sensor-a", Note::at("n2", 150)),
            RouteResult::empty("cache-1", "sensor-b"),
        ];

        let redirected = narrow_range(&request, &results);
        assert_eq!(redirected.id, "req-1");
        assert_eq!(redirected.parameter::<i64>(TAKE), Some(8));
        assert_eq!(redirected.parameter::<i64>(SKIP), Some(0));

        let a = &redirected.queries[0];
        assert_eq!(a.query, "sensor-a");
        assert_eq!(a.parameter::<i64>(START), Some(151));
        assert_eq!(a.parameter::<i64>(STOP), Some(200));

        let b = &redirected.queries[1];
        assert_eq!(b.parameter::<i64>(START), Some(100));
    }

    #[test]
    fn exhausted_take_forwards_no_queries() {
        let request = range_request(5, 2);
        let results = vec![
            RouteResult::ok("cache-1", "sensor-a", Note::at("n1", 110)),
            RouteResult::ok("cache-1", "sensor-b", Note::at("n2", 130)),
        ];

        let redirected = narrow_range(&request, &results);
        assert!(redirected.queries.is_empty());
        assert_eq!(redirected.parameter::<i64>(SKIP), Some(3));
        assert_eq!(redirected.parameter::<i64>(TAKE), Some(0));
    }

    #[test]
    fn closed_window_is_dropped() {
        let request = range_request(0, 10);
        let results = vec![RouteResult::ok("cache-1", "sensor-a", Note::at("n1", 199))];

        let redirected = narrow_range(&request, &results);
        let queries = redirected.query_strings();
        assert_eq!(queries, vec!["sensor-b"]);
    }

    #[test]
    fn window_at_the_end_of_the_key_space_stays_bounded() {
        let request = range_request(0, 10);
        let results = vec![RouteResult::ok("cache-1", "sensor-a", Note::at("n1", i64::MAX))];

        let redirected = narrow_range(&request, &results);
        assert_eq!(redirected.query_strings(), vec!["sensor-b"]);
        assert_eq!(redirected.parameter::<i64>(TAKE), Some(9));
    }
}
