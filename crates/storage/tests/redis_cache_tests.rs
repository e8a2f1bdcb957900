//! Round-trip tests against a live Redis.
//!
//! Run with `REDIS_URL=redis://localhost:6379/0 cargo test -p storage -- --ignored`.

use bytes::Bytes;
use std::time::Duration;
use storage::{CacheKeyCodec, CacheValue, RedisCache, ResponseCache};

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379/0".to_string())
}

#[tokio::test]
#[ignore = "requires a running Redis"]
async fn test_redis_round_trip_and_expiry() {
    let cache = RedisCache::connect(&redis_url()).await.unwrap();
    assert!(cache.ping().await);

    let key = CacheKeyCodec::encode([
        ("test", CacheValue::from("redis_round_trip")),
        ("lat", CacheValue::from(40.0)),
    ]);
    let payload = Bytes::from_static(br#"{"products":{"NO2":{}}}"#);

    cache.set(&key, payload.clone(), Duration::from_secs(1)).await;
    assert_eq!(cache.get(&key).await, Some(payload));

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(cache.get(&key).await.is_none());
}
