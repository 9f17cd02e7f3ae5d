use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::{mapref::entry::Entry, DashMap};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::{Message, PullSubscription, Topic};
use crate::{
    error::{BrokerError, PublishError, PullError},
    subscriber::MessageHandler,
};

type TopicKey = Arc<str>;

/// Внутрипроцессный брокер сообщений.
///
/// Поддерживает:
/// - Администрирование тем и подписок (дубликат подписки — ошибка)
/// - Упорядоченную доставку: каждая подписка получает собственную
///   очередь, сообщения читаются по одному в порядке публикации
/// - Статистику публикаций и ошибок доставки
pub struct MemoryBroker {
    /// Тема → очереди всех её подписок.
    topics: DashMap<TopicKey, Vec<mpsc::UnboundedSender<Message>>>,
    /// Подписка → тема (контроль дубликатов).
    subscriptions: DashMap<Arc<str>, TopicKey>,
    /// Счётчик идентификаторов сообщений.
    next_id: AtomicU64,
    /// Общее количество вызовов `publish`.
    pub publish_count: AtomicUsize,
    /// Количество доставок в уже брошенные очереди.
    pub delivery_error_count: AtomicUsize,
}

impl MemoryBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            topics: DashMap::new(),
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(0),
            publish_count: AtomicUsize::new(0),
            delivery_error_count: AtomicUsize::new(0),
        })
    }

    /// Создаёт тему (повторный вызов возвращает ту же тему) и отдаёт
    /// её handle для публикации.
    pub fn create_topic(self: &Arc<Self>, name: &str) -> MemoryTopic {
        let key: TopicKey = Arc::from(name);
        self.topics.entry(key.clone()).or_default();
        MemoryTopic {
            name: key,
            broker: Arc::clone(self),
        }
    }

    /// Создаёт подписку на существующую тему.
    ///
    /// Каждая подписка получает собственную очередь: сообщение,
    /// опубликованное после создания подписки, попадает во все
    /// очереди темы.
    pub fn subscribe(
        &self,
        topic: &str,
        subscription_id: &str,
    ) -> Result<MemorySubscription, BrokerError> {
        let Some(mut senders) = self.topics.get_mut(topic) else {
            return Err(BrokerError::TopicNotFound(topic.to_string()));
        };

        let id: Arc<str> = Arc::from(subscription_id);
        match self.subscriptions.entry(id.clone()) {
            Entry::Occupied(_) => {
                return Err(BrokerError::SubscriptionExists(subscription_id.to_string()))
            }
            Entry::Vacant(slot) => {
                slot.insert(senders.key().clone());
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let topic_key = senders.key().clone();
        senders.value_mut().push(tx);

        Ok(MemorySubscription {
            id,
            topic: topic_key,
            inbox: Mutex::new(rx),
        })
    }

    /// Публикация содержимого в тему; брокер сам собирает `Message`.
    pub fn publish(&self, topic: &str, payload: Bytes) -> Result<(), PublishError> {
        self.publish_message(Message::new(topic, payload))
    }

    /// Публикация готового сообщения (с атрибутами) в его тему.
    pub fn publish_message(&self, mut message: Message) -> Result<(), PublishError> {
        let Some(mut senders) = self.topics.get_mut(&*message.topic) else {
            return Err(PublishError::TopicNotFound(message.topic.to_string()));
        };

        self.publish_count.fetch_add(1, Ordering::Relaxed);
        message.id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;

        // Мёртвые очереди (подписка брошена) выбрасываются на ходу.
        senders.value_mut().retain(|tx| {
            if tx.send(message.clone()).is_err() {
                self.delivery_error_count.fetch_add(1, Ordering::Relaxed);
                false
            } else {
                true
            }
        });

        Ok(())
    }

    /// Удаляет тему вместе с очередями её подписок.
    ///
    /// Активные `receive` этих подписок завершаются с
    /// `PullError::Closed` после исчерпания очереди.
    pub fn delete_topic(&self, name: &str) {
        self.topics.remove(name);
        self.subscriptions.retain(|_, topic| &**topic != name);
    }

    /// Количество зарегистрированных подписок.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

/// Handle темы внутрипроцессного брокера.
pub struct MemoryTopic {
    name: TopicKey,
    broker: Arc<MemoryBroker>,
}

#[async_trait]
impl Topic for MemoryTopic {
    fn id(&self) -> &str {
        &self.name
    }

    async fn publish(&self, mut message: Message) -> Result<(), PublishError> {
        message.topic = self.name.clone();
        self.broker.publish_message(message)
    }
}

/// Подписка внутрипроцессного брокера с собственной очередью.
#[derive(Debug)]
pub struct MemorySubscription {
    id: Arc<str>,
    topic: TopicKey,
    inbox: Mutex<mpsc::UnboundedReceiver<Message>>,
}

impl MemorySubscription {
    /// Забирает следующее сообщение напрямую, без обработчика.
    ///
    /// Удобно в тестах; `None` — очередь закрыта.
    pub async fn pull(&self) -> Option<Message> {
        self.inbox.lock().await.recv().await
    }
}

#[async_trait]
impl PullSubscription for MemorySubscription {
    fn id(&self) -> &str {
        &self.id
    }

    fn topic_id(&self) -> &str {
        &self.topic
    }

    async fn receive(
        &self,
        cancel: CancellationToken,
        handler: MessageHandler,
    ) -> Result<(), PullError> {
        let mut inbox = self.inbox.lock().await;
        loop {
            tokio::select! {
                // Отмена проверяется первой: после её наблюдения новые
                // сообщения из очереди не берутся.
                biased;

                _ = cancel.cancelled() => return Ok(()),
                next = inbox.recv() => match next {
                    Some(message) => {
                        // Ошибка обработчика — забота внешнего
                        // перехватчика (ack/nack), не транспорта.
                        if let Err(err) = handler(cancel.clone(), message).await {
                            tracing::debug!(
                                subscription = %self.id,
                                error = %err,
                                "handler returned an error"
                            );
                        }
                    }
                    None => return Err(PullError::Closed),
                },
            }
        }
    }
}
