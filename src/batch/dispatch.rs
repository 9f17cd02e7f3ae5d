use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    broker::{Message, Topic},
    error::DispatchError,
};

/// Коллаборатор пакетной отправки: принимает упорядоченный срез
/// буфера одного сброса.
///
/// Возвращает общий успех, общий отказ
/// ([`DispatchError::Batch`]) или поэлементную карту отказов
/// ([`DispatchError::Items`]), ключованную позицией элемента в пакете.
#[async_trait]
pub trait BatchDispatcher: Send + Sync {
    async fn dispatch(&self, items: Vec<Bytes>) -> Result<(), DispatchError>;
}

/// Отправка пакета публикацией каждого элемента в тему.
pub struct TopicDispatcher {
    topic: Arc<dyn Topic>,
}

impl TopicDispatcher {
    pub fn new(topic: Arc<dyn Topic>) -> Self {
        Self { topic }
    }
}

#[async_trait]
impl BatchDispatcher for TopicDispatcher {
    async fn dispatch(&self, items: Vec<Bytes>) -> Result<(), DispatchError> {
        let mut failures = HashMap::new();

        for (position, payload) in items.into_iter().enumerate() {
            let message = Message::new(self.topic.id(), payload);
            if let Err(err) = self.topic.publish(message).await {
                failures.insert(position, err.to_string());
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::Items(failures))
        }
    }
}
