//! Offset pagination helpers.

use std::future::Future;

use crate::error::Result;

/// Largest page TIDAL serves.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Upper bound for caller-supplied limits.
pub const MAX_LIMIT: usize = 5000;

/// Clamp `limit` into `1..=max`.
#[must_use]
pub fn bound_limit(limit: usize, max: usize) -> usize {
    limit.clamp(1, max.max(1))
}

/// Fetch up to `limit` items in pages of at most `page_size`.
///
/// `fetch(limit, offset)` is called until `limit` items are collected, a page
/// comes back empty, or a page is shorter than requested.
pub async fn fetch_all_paginated<T, F, Fut>(
    limit: usize,
    page_size: usize,
    mut fetch: F,
) -> Result<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    let page_size = page_size.max(1);
    let mut items = Vec::new();
    let mut offset = 0;

    while items.len() < limit {
        let batch_limit = page_size.min(limit - items.len());
        let batch = fetch(batch_limit, offset).await?;
        let received = batch.len();
        if received == 0 {
            break;
        }

        items.extend(batch);
        if received < batch_limit {
            break;
        }
        offset += received;
    }

    items.truncate(limit);
    Ok(items)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::TidalError;

    #[test]
    fn bound_limit_clamps() {
        assert_eq!(bound_limit(0, 100), 1);
        assert_eq!(bound_limit(50, 100), 50);
        assert_eq!(bound_limit(10_000, MAX_LIMIT), MAX_LIMIT);
    }

    #[tokio::test]
    async fn batches_until_limit() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);

        let items = fetch_all_paginated(120, 50, move |limit, offset| {
            seen.lock().unwrap().push((limit, offset));
            async move { Ok((offset..offset + limit).collect::<Vec<_>>()) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 120);
        assert_eq!(items[119], 119);
        assert_eq!(*calls.lock().unwrap(), vec![(50, 0), (50, 50), (20, 100)]);
    }

    #[tokio::test]
    async fn stops_on_short_page() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);

        let items = fetch_all_paginated(500, 50, move |_, offset| {
            *counter.lock().unwrap() += 1;
            let size = if offset == 0 { 50 } else { 7 };
            async move { Ok(vec![0u8; size]) }
        })
        .await
        .unwrap();

        assert_eq!(items.len(), 57);
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn stops_on_empty_page() {
        let items: Vec<u8> = fetch_all_paginated(10, 5, |_, _| async { Ok(Vec::new()) })
            .await
            .unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn propagates_fetch_errors() {
        let result: Result<Vec<u8>> =
            fetch_all_paginated(10, 5, |_, _| async { Err(TidalError::Timeout) }).await;
        assert!(matches!(result, Err(TidalError::Timeout)));
    }
}
