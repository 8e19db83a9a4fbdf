//! HTTP layer: the fetch seam, retry policy and response cache

mod cache;
mod client;
mod retry;

pub use cache::{cache_key, decode_entry, encode_entry, CacheClass, CachingFetcher};
pub use client::{build_http_client, FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use retry::RetryPolicy;

#[cfg(test)]
pub(crate) use client::testing;

use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
impl<T: Fetcher + ?Sized> Fetcher for Arc<T> {
    async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
        (**self).get(url).await
    }
}
