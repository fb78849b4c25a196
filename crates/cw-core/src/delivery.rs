//! Ordered hand-off from the blocking producer to the async consumer.
//!
//! Unbounded, so the producer never blocks; FIFO, so envelopes reach the
//! client in exactly the order the aggregator produced them.

use std::future::Future;

use cw_types::{ChatWeaveError, Result};
use futures::Stream;
use tokio::sync::mpsc;
use tracing::trace;

/// Create a connected sender/receiver pair.
pub fn delivery_queue<T>() -> (DeliverySender<T>, DeliveryReceiver<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (DeliverySender { tx }, DeliveryReceiver { rx })
}

/// Producer half. Cloneable, usable from any thread, never blocks.
#[derive(Debug)]
pub struct DeliverySender<T> {
    tx: mpsc::UnboundedSender<T>,
}

impl<T> Clone for DeliverySender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> DeliverySender<T> {
    /// Enqueue one item. Fails only once the consumer is gone.
    pub fn send(&self, item: T) -> Result<()> {
        self.tx.send(item).map_err(|_| ChatWeaveError::QueueClosed)
    }

    /// True once the receiver has been dropped or closed.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half. Owned by exactly one consumer loop.
#[derive(Debug)]
pub struct DeliveryReceiver<T> {
    rx: mpsc::UnboundedReceiver<T>,
}

impl<T> DeliveryReceiver<T> {
    /// Wait for the next item. `None` once every sender is gone and the
    /// queue is drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next item if one is ready.
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting items. Already-queued items can still be received.
    pub fn close(&mut self) {
        self.rx.close();
    }

    /// View the queue as a stream.
    pub fn into_stream(mut self) -> impl Stream<Item = T> {
        async_stream::stream! {
            while let Some(item) = self.rx.recv().await {
                yield item;
            }
        }
    }

    /// Consumer loop: hand each item to `sink`, one at a time, until the
    /// queue ends or `sink` fails. Returns the number of items delivered.
    pub async fn forward<F, Fut>(mut self, mut sink: F) -> Result<usize>
    where
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut delivered = 0;
        while let Some(item) = self.rx.recv().await {
            sink(item).await?;
            delivered += 1;
            trace!(delivered, "Delivered queued item");
        }
        Ok(delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::time::Duration;

    #[tokio::test]
    async fn fifo_order_single_producer() {
        let (tx, mut rx) = delivery_queue();
        for i in 0..5 {
            tx.send(i).unwrap();
        }
        for i in 0..5 {
            assert_eq!(rx.recv().await, Some(i));
        }
    }

    #[tokio::test]
    async fn order_holds_across_threads_with_interleaved_dequeues() {
        let (tx, mut rx) = delivery_queue();
        let producer = std::thread::spawn(move || {
            for name in ["E1", "E2", "E3"] {
                tx.send(name.to_string()).unwrap();
                std::thread::sleep(Duration::from_millis(5));
            }
        });

        let mut seen = Vec::new();
        while let Some(item) = rx.recv().await {
            seen.push(item);
        }
        producer.join().unwrap();
        assert_eq!(seen, vec!["E1", "E2", "E3"]);
    }

    #[tokio::test]
    async fn recv_ends_when_senders_drop() {
        let (tx, mut rx) = delivery_queue::<u8>();
        let tx2 = tx.clone();
        drop(tx);
        tx2.send(1).unwrap();
        drop(tx2);
        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn send_after_receiver_dropped_fails() {
        let (tx, rx) = delivery_queue::<u8>();
        drop(rx);
        assert!(tx.is_closed());
        assert!(matches!(tx.send(1), Err(ChatWeaveError::QueueClosed)));
    }

    #[tokio::test]
    async fn close_keeps_queued_items() {
        let (tx, mut rx) = delivery_queue();
        tx.send("a").unwrap();
        rx.close();
        assert!(tx.send("b").is_err());
        assert_eq!(rx.try_recv(), Some("a"));
        assert_eq!(rx.try_recv(), None);
    }

    #[tokio::test]
    async fn stream_yields_in_order() {
        let (tx, rx) = delivery_queue();
        tx.send(1).unwrap();
        tx.send(2).unwrap();
        drop(tx);
        let items: Vec<i32> = rx.into_stream().collect().await;
        assert_eq!(items, vec![1, 2]);
    }

    #[tokio::test]
    async fn forward_stops_on_sink_error() {
        let (tx, rx) = delivery_queue();
        for i in 0..4 {
            tx.send(i).unwrap();
        }
        drop(tx);
        let mut got = Vec::new();
        let result = rx
            .forward(|item| {
                got.push(item);
                let fail = item == 2;
                async move {
                    if fail {
                        Err(ChatWeaveError::Other("socket gone".to_string()))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(got, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn forward_counts_delivered() {
        let (tx, rx) = delivery_queue();
        tx.send("x").unwrap();
        tx.send("y").unwrap();
        drop(tx);
        let delivered = rx.forward(|_| async { Ok(()) }).await.unwrap();
        assert_eq!(delivered, 2);
    }
}
