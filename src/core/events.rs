//! 結果事件通道
//!
//! 把單筆檢查結果、完成訊號與定期 keepalive 廣播給目前所有訂閱者。
//! 不保留歷史：晚加入的訂閱者只會收到加入之後發布的事件。
//! 仍連線的訂閱者不會漏掉任何事件；只有已關閉的接收端會被移除。

use crate::domain::model::ChannelEvent;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

type Subscribers = RwLock<HashMap<SubscriberId, mpsc::UnboundedSender<ChannelEvent>>>;

#[derive(Clone)]
pub struct EventChannel {
    subscribers: Arc<Subscribers>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// 註冊新的訂閱者；回傳的 Subscription 被 drop 時自動取消訂閱
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(Uuid::new_v4());
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, sender);
        tracing::debug!("Subscriber {} connected", id);

        Subscription {
            id,
            receiver,
            channel: self.clone(),
        }
    }

    /// 重複呼叫無副作用，回傳是否真的移除了訂閱者
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            tracing::debug!("Subscriber {} disconnected", id);
        }
        removed
    }

    /// 廣播事件，回傳成功送達的訂閱者數量
    ///
    /// 先複製訂閱者清單再逐一送出，發布期間的訂閱/取消互不阻塞。
    /// 佇列不設上限，慢的訂閱者只會累積事件，不會遺失。
    pub fn publish(&self, event: ChannelEvent) -> usize {
        let snapshot: Vec<(SubscriberId, mpsc::UnboundedSender<ChannelEvent>)> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, sender)| (*id, sender.clone()))
            .collect();

        let mut delivered = 0;
        for (id, sender) in snapshot {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                self.unsubscribe(id);
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 依固定間隔對所有訂閱者送出 keepalive
    pub fn spawn_keepalive(&self, every: Duration) -> JoinHandle<()> {
        let channel = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            // 第一次 tick 立即完成，略過
            ticker.tick().await;
            loop {
                ticker.tick().await;
                channel.publish(ChannelEvent::KeepAlive);
            }
        })
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<ChannelEvent>,
    channel: EventChannel,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// 通道被取消訂閱後回傳 None
    pub async fn recv(&mut self) -> Option<ChannelEvent> {
        self.receiver.recv().await
    }

    /// 不等待，取出目前已排隊的事件
    pub fn try_recv(&mut self) -> Option<ChannelEvent> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.channel.unsubscribe(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let channel = EventChannel::new();
        let mut a = channel.subscribe();
        let mut b = channel.subscribe();

        assert_eq!(channel.publish(ChannelEvent::KeepAlive), 2);
        assert_eq!(a.recv().await, Some(ChannelEvent::KeepAlive));
        assert_eq!(b.recv().await, Some(ChannelEvent::KeepAlive));
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_no_history() {
        let channel = EventChannel::new();
        channel.publish(ChannelEvent::KeepAlive);

        let mut late = channel.subscribe();
        let complete = ChannelEvent::Complete {
            session_id: "s1".to_string(),
            total_checks: 0,
            completed: 0,
        };
        channel.publish(complete.clone());

        assert_eq!(late.recv().await, Some(complete));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let channel = EventChannel::new();
        let sub = channel.subscribe();
        let id = sub.id();

        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        drop(sub);
        assert_eq!(channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let channel = EventChannel::new();
        let keep = channel.subscribe();
        {
            let _gone = channel.subscribe();
            assert_eq!(channel.subscriber_count(), 2);
        }
        assert_eq!(channel.subscriber_count(), 1);
        assert_eq!(channel.publish(ChannelEvent::KeepAlive), 1);
        drop(keep);
    }

    #[tokio::test]
    async fn test_slow_subscriber_keeps_every_event() {
        let channel = EventChannel::new();
        let mut slow = channel.subscribe();

        for n in 0..1_000 {
            let event = ChannelEvent::Complete {
                session_id: format!("s{}", n),
                total_checks: 0,
                completed: 0,
            };
            assert_eq!(channel.publish(event), 1);
        }

        let mut received = 0;
        while slow.try_recv().is_some() {
            received += 1;
        }
        assert_eq!(received, 1_000);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_pruned() {
        let channel = EventChannel::new();
        let mut closed = channel.subscribe();
        let _open = channel.subscribe();
        closed.receiver.close();

        assert_eq!(channel.publish(ChannelEvent::KeepAlive), 1);
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keepalive_ticks() {
        let channel = EventChannel::new();
        let mut sub = channel.subscribe();
        let ticker = channel.spawn_keepalive(Duration::from_secs(15));

        tokio::time::advance(Duration::from_secs(16)).await;
        assert_eq!(sub.recv().await, Some(ChannelEvent::KeepAlive));

        ticker.abort();
    }
}
