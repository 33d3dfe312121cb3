//! Isolate-and-collect: run a fallible async operation over an ordered
//! sequence, keep every item's outcome, never stop on a failure.
//!
//! Items are processed one at a time in input order. The output has one
//! entry per processed item, in the same order.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// One item's outcome, paired with the item itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isolated<T, O, E> {
    pub item: T,
    pub result: Result<O, E>,
    /// Wall time spent in the operation for this item
    pub elapsed: Duration,
}

/// Apply `op` to every item.
pub async fn isolate_and_collect<I, T, O, E, F, Fut>(items: I, op: F) -> Vec<Isolated<T, O, E>>
where
    I: IntoIterator<Item = T>,
    F: FnMut(&T) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    isolate_and_collect_while(items, || true, op).await
}

/// Like [`isolate_and_collect`], but checks `keep_going` before each item
/// and stops (without processing the rest) once it returns false.
///
/// A failure never affects `keep_going`; only the caller's own state does.
pub async fn isolate_and_collect_while<I, T, O, E, K, F, Fut>(
    items: I,
    mut keep_going: K,
    mut op: F,
) -> Vec<Isolated<T, O, E>>
where
    I: IntoIterator<Item = T>,
    K: FnMut() -> bool,
    F: FnMut(&T) -> Fut,
    Fut: Future<Output = Result<O, E>>,
{
    let items = items.into_iter();
    let mut collected = Vec::with_capacity(items.size_hint().0);

    for item in items {
        if !keep_going() {
            break;
        }
        let started = Instant::now();
        let result = op(&item).await;
        collected.push(Isolated {
            item,
            result,
            elapsed: started.elapsed(),
        });
    }

    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[tokio::test]
    async fn failures_do_not_stop_the_sequence() {
        let out = isolate_and_collect(1..=5, |n| {
            let n = *n;
            async move { if n % 2 == 0 { Err(format!("even {n}")) } else { Ok(n * 10) } }
        })
        .await;

        let results: Vec<_> = out.iter().map(|i| i.result.clone()).collect();
        assert_eq!(
            results,
            vec![
                Ok(10),
                Err("even 2".to_string()),
                Ok(30),
                Err("even 4".to_string()),
                Ok(50)
            ]
        );
    }

    #[tokio::test]
    async fn keep_going_stops_before_next_item() {
        let mut calls = 0;
        let out = isolate_and_collect_while(
            ["a", "b", "c", "d"],
            || {
                calls += 1;
                calls <= 2
            },
            |s| {
                let s = s.to_string();
                async move { Ok::<_, ()>(s) }
            },
        )
        .await;

        let items: Vec<_> = out.iter().map(|i| i.item).collect();
        assert_eq!(items, ["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_is_measured_per_item() {
        let out = isolate_and_collect([3u64, 1], |secs| {
            let secs = *secs;
            async move {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                Ok::<_, ()>(())
            }
        })
        .await;

        assert_eq!(out[0].elapsed, Duration::from_secs(3));
        assert_eq!(out[1].elapsed, Duration::from_secs(1));
    }

    proptest! {
        #[test]
        fn output_matches_input_order_and_length(failing in proptest::collection::vec(any::<bool>(), 0..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
            let indexed: Vec<(usize, bool)> = failing.iter().copied().enumerate().collect();

            let out = rt.block_on(isolate_and_collect(indexed.clone(), |(i, fail)| {
                let (i, fail) = (*i, *fail);
                async move { if fail { Err(i) } else { Ok(i) } }
            }));

            prop_assert_eq!(out.len(), indexed.len());
            for (pos, entry) in out.iter().enumerate() {
                prop_assert_eq!(entry.item.0, pos);
                let expected = if entry.item.1 { Err(pos) } else { Ok(pos) };
                prop_assert_eq!(&entry.result, &expected);
            }
        }
    }
}
