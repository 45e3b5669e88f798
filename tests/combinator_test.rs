//! Aggregation policies over promise collections and the awaitable joins

use std::time::Duration;

use async_promise::{
    await_all, await_until_first_error, fan_in, Awaitable, Context, MultiPromise, Promise,
    PromiseError, PromiseMap,
};
use futures::StreamExt;
use tokio_test::assert_ok;

fn sleepy_ok<T>(delay: Duration, value: T) -> Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    Promise::new(move || async move {
        tokio::time::sleep(delay).await;
        Ok(value)
    })
}

fn sleepy_err<T>(delay: Duration, message: &str) -> Promise<T>
where
    T: Clone + Send + Sync + 'static,
{
    let message = message.to_string();
    Promise::new(move || async move {
        tokio::time::sleep(delay).await;
        Err(PromiseError::msg(message))
    })
}

#[tokio::test]
async fn await_all_succeeds_over_successes() {
    let ctx = Context::background();
    let a = Promise::resolved(1);
    let b = Promise::resolved("two");
    let c = Promise::resolved(3.0);

    assert_ok!(await_all(&ctx, [&a as &dyn Awaitable, &b, &c]).await);
}

#[tokio::test]
async fn await_all_stops_at_the_first_error_in_listed_order() {
    let ctx = Context::background();
    let a = Promise::resolved(1);
    let b: Promise<i32> = Promise::rejected(PromiseError::msg("second failed"));
    let c: Promise<i32> = Promise::rejected(PromiseError::msg("third failed"));

    let err = await_all(&ctx, [&a as &dyn Awaitable, &b, &c])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("second failed"));
}

#[tokio::test]
async fn await_all_over_nothing_is_ok() {
    let ctx = Context::background();
    let none: [&dyn Awaitable; 0] = [];
    assert_ok!(await_all(&ctx, none).await);
}

#[tokio::test(start_paused = true)]
async fn await_until_first_error_returns_without_waiting_for_slower_waits() {
    let ctx = Context::background();
    let slow = sleepy_ok(Duration::from_secs(3600), 1);
    let failing: Promise<i32> = sleepy_err(Duration::from_millis(10), "fast failure");

    let started = tokio::time::Instant::now();
    let err = await_until_first_error(&ctx, [&slow as &dyn Awaitable, &failing])
        .await
        .unwrap_err();

    assert!(err.to_string().contains("fast failure"));
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test]
async fn await_until_first_error_succeeds_when_everything_succeeds() {
    let ctx = Context::background();
    let a = Promise::resolved(1);
    let b = Promise::resolved(2);

    assert_ok!(await_until_first_error(&ctx, [&a as &dyn Awaitable, &b]).await);
}

#[tokio::test(start_paused = true)]
async fn all_results_restores_original_order() {
    let ctx = Context::background();
    let mut collection = MultiPromise::new();
    // Completion order is reversed on purpose: index 0 finishes last.
    collection.push(sleepy_ok(Duration::from_millis(50), 10));
    collection.push(sleepy_ok(Duration::from_millis(10), 20));

    let values = assert_ok!(collection.all_results(&ctx).await);
    assert_eq!(values, vec![10, 20]);
}

#[tokio::test]
async fn all_results_reports_every_failure() {
    let ctx = Context::background();
    let mut collection = MultiPromise::new();
    collection.push(Promise::resolved(1));
    collection.push(Promise::rejected(PromiseError::msg("broke")));
    collection.push(Promise::resolved(3));

    let err = collection.all_results(&ctx).await.unwrap_err();
    assert!(err.to_string().contains("broke"));
}

#[tokio::test]
async fn all_results_aggregates_multiple_failures() {
    let ctx = Context::background();
    let mut collection: MultiPromise<i32> = MultiPromise::new();
    collection.push(Promise::rejected(PromiseError::msg("first")));
    collection.push(Promise::rejected(PromiseError::msg("second")));

    let err = collection.all_results(&ctx).await.unwrap_err();
    let PromiseError::Aggregate(aggregate) = err else {
        panic!("expected an aggregate error, got {err}");
    };
    assert_eq!(aggregate.len(), 2);
    assert!(aggregate.errors()[0].to_string().contains("first"));
    assert!(aggregate.errors()[1].to_string().contains("second"));
}

#[tokio::test(start_paused = true)]
async fn all_results_or_first_error_fails_fast() {
    let ctx = Context::background();
    let mut collection = MultiPromise::new();
    collection.push(Promise::resolved(1));
    collection.push(sleepy_ok(Duration::from_secs(3600), 2));
    collection.push(sleepy_err(Duration::from_millis(10), "early failure"));

    let started = tokio::time::Instant::now();
    let err = collection
        .all_results_or_first_error(&ctx)
        .await
        .unwrap_err();

    assert!(err.to_string().contains("early failure"));
    assert!(!matches!(err, PromiseError::Aggregate(_)));
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn first_result_ignores_faster_failures() {
    let ctx = Context::background();
    let mut collection = MultiPromise::new();
    collection.push(sleepy_err(Duration::from_millis(5), "fails fast"));
    collection.push(sleepy_ok(Duration::from_millis(50), 99));

    assert_eq!(assert_ok!(collection.first_result(&ctx).await), 99);
}

#[tokio::test]
async fn first_result_over_all_failures_aggregates_them() {
    let ctx = Context::background();
    let mut collection: MultiPromise<i32> = MultiPromise::new();
    collection.push(Promise::rejected(PromiseError::msg("first")));
    collection.push(Promise::rejected(PromiseError::msg("second")));

    let err = collection.first_result(&ctx).await.unwrap_err();
    let PromiseError::Aggregate(aggregate) = err else {
        panic!("expected an aggregate error, got {err}");
    };
    assert_eq!(aggregate.len(), 2);
}

#[tokio::test]
async fn first_result_over_nothing_is_the_dedicated_empty_error() {
    let ctx = Context::background();
    let collection: MultiPromise<i32> = MultiPromise::new();

    let err = collection.first_result(&ctx).await.unwrap_err();
    assert!(matches!(err, PromiseError::Empty));
}

#[tokio::test]
async fn partial_result_keeps_successes_and_failures_keyed() {
    let ctx = Context::background();
    let mut collection = MultiPromise::new();
    collection.push(Promise::resolved(1));
    collection.push(Promise::rejected(PromiseError::msg("middle failed")));
    collection.push(Promise::resolved(3));

    let outcome = collection.partial_result(&ctx).await;

    let keys: Vec<usize> = outcome.results().iter().map(|(key, _)| *key).collect();
    assert_eq!(keys, vec![0, 2]);
    assert_eq!(outcome.available_results(), vec![1, 3]);

    assert_eq!(outcome.errors().len(), 1);
    assert_eq!(outcome.errors()[0].0, 1);
    assert!(outcome.errors()[0].1.to_string().contains("middle failed"));
    assert!(outcome.error().is_some());
}

#[tokio::test(start_paused = true)]
async fn early_exit_leaves_no_producer_stuck() {
    let ctx = Context::background();
    let mut collection = MultiPromise::new();
    collection.push(Promise::resolved(0));
    for index in 1..1000 {
        collection.push(sleepy_ok(Duration::from_millis(10), index));
    }

    assert_eq!(assert_ok!(collection.first_result(&ctx).await), 0);

    // The 999 losers were abandoned mid-flight; every one must still reach
    // completion instead of blocking forever on an unconsumed send.
    for promise in collection.promises() {
        while !promise.is_completed() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn dropping_a_half_consumed_fan_in_unblocks_producers() {
    let ctx = Context::background();
    let promises: Vec<Promise<i32>> = (0..10)
        .map(|index| sleepy_ok(Duration::from_millis(index), i32::try_from(index).unwrap()))
        .collect();

    let pairs: Vec<(usize, Promise<i32>)> = promises.iter().cloned().enumerate().collect();
    let mut results = fan_in(&ctx, pairs);
    assert!(results.next().await.is_some());
    assert!(results.next().await.is_some());
    drop(results);

    for promise in &promises {
        while !promise.is_completed() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

#[tokio::test]
async fn fan_in_stream_yields_every_outcome() {
    let ctx = Context::background();
    let pairs = vec![
        ("a", Promise::resolved(1)),
        ("b", Promise::resolved(2)),
        ("c", Promise::<i32>::rejected(PromiseError::msg("nope"))),
    ];

    let outcomes: Vec<_> = fan_in(&ctx, pairs).into_stream().collect().await;
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes.iter().filter(|item| item.outcome.is_err()).count(), 1);
}

#[tokio::test]
async fn promise_map_all_results_returns_values_under_their_keys() {
    let ctx = Context::background();
    let mut map = PromiseMap::new();
    map.insert("ten", Promise::resolved(10));
    map.insert("twenty", Promise::resolved(20));

    let values = assert_ok!(map.all_results(&ctx).await);
    assert_eq!(values.len(), 2);
    assert_eq!(values["ten"], 10);
    assert_eq!(values["twenty"], 20);
}

#[tokio::test]
async fn promise_map_all_results_orders_failures_by_key() {
    let ctx = Context::background();
    let mut map: PromiseMap<&str, i32> = PromiseMap::new();
    map.insert("zulu", Promise::rejected(PromiseError::msg("zulu broke")));
    map.insert("alpha", Promise::rejected(PromiseError::msg("alpha broke")));

    let err = map.all_results(&ctx).await.unwrap_err();
    let PromiseError::Aggregate(aggregate) = err else {
        panic!("expected an aggregate error, got {err}");
    };
    assert!(aggregate.errors()[0].to_string().contains("alpha broke"));
    assert!(aggregate.errors()[1].to_string().contains("zulu broke"));
}

#[tokio::test(start_paused = true)]
async fn promise_map_first_result_reports_the_winning_key() {
    let ctx = Context::background();
    let mut map = PromiseMap::new();
    map.insert("slow", sleepy_ok(Duration::from_millis(50), 1));
    map.insert("fast", sleepy_ok(Duration::from_millis(5), 2));

    let (key, value) = assert_ok!(map.first_result(&ctx).await);
    assert_eq!(key, "fast");
    assert_eq!(value, 2);
}

#[tokio::test]
async fn promise_map_first_result_over_nothing_is_the_dedicated_empty_error() {
    let ctx = Context::background();
    let map: PromiseMap<&str, i32> = PromiseMap::new();

    let err = map.first_result(&ctx).await.unwrap_err();
    assert!(matches!(err, PromiseError::Empty));
}

#[tokio::test]
async fn promise_map_partial_result_never_fails() {
    let ctx = Context::background();
    let mut map = PromiseMap::new();
    map.insert("good", Promise::resolved(1));
    map.insert("bad", Promise::<i32>::rejected(PromiseError::msg("bad one")));

    let (values, errors) = map.partial_result(&ctx).await;
    assert_eq!(values.len(), 1);
    assert_eq!(values["good"], 1);
    assert_eq!(errors.len(), 1);
    assert!(errors["bad"].to_string().contains("bad one"));
}
