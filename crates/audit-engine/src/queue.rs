//! Fan-out / fan-in of independent asynchronous tasks.
//!
//! Tasks are polled together on the current task (no spawning). `join` hands back results
//! in submission order whatever order they complete in, and stops at the first error:
//! the remaining tasks are dropped unfinished.

use std::future::Future;

use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;

pub struct CheckQueue<'a, T, E> {
    tasks: Vec<LocalBoxFuture<'a, Result<T, E>>>,
}

impl<'a, T, E> Default for CheckQueue<'a, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, E> CheckQueue<'a, T, E> {
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn defer<F>(&mut self, task: F)
    where
        F: Future<Output = Result<T, E>> + 'a,
    {
        self.tasks.push(task.boxed_local());
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub async fn join(self) -> Result<Vec<T>, E> {
        let total = self.tasks.len();
        let mut pending: FuturesUnordered<_> = self
            .tasks
            .into_iter()
            .enumerate()
            .map(|(index, task)| task.map(move |outcome| (index, outcome)))
            .collect();

        let mut slots: Vec<Option<T>> = (0..total).map(|_| None).collect();
        while let Some((index, outcome)) = pending.next().await {
            slots[index] = Some(outcome?);
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::time::Duration;

    #[tokio::test]
    async fn test_results_keep_submission_order() {
        let finished = RefCell::new(Vec::new());
        let mut queue: CheckQueue<'_, u32, String> = CheckQueue::new();
        for (value, delay) in [(1u32, 30u64), (2, 0), (3, 10)] {
            let finished = &finished;
            queue.defer(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                finished.borrow_mut().push(value);
                Ok(value)
            });
        }

        assert_eq!(queue.join().await.unwrap(), vec![1, 2, 3]);
        assert_eq!(*finished.borrow(), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn test_first_failure_short_circuits() {
        let finished = RefCell::new(Vec::new());
        let mut queue: CheckQueue<'_, u32, String> = CheckQueue::new();
        {
            let finished = &finished;
            queue.defer(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                finished.borrow_mut().push("slow");
                Ok(1)
            });
            queue.defer(async { Err("boom".to_string()) });
        }

        assert_eq!(queue.join().await.unwrap_err(), "boom");
        assert!(finished.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_empty_queue_resolves_immediately() {
        let queue: CheckQueue<'_, (), ()> = CheckQueue::new();
        assert!(queue.is_empty());
        assert_eq!(queue.join().await, Ok(vec![]));
    }
}
