use std::{collections::HashMap, sync::Arc};

use bytes::Bytes;

/// Сообщение, доставляемое подписчику или публикуемое в тему.
///
/// Идентификатор присваивается брокером при публикации; атрибуты
/// могут переписываться перехватчиками до вызова бизнес-логики.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Порядковый идентификатор, присвоенный брокером (0 до публикации).
    pub id: u64,
    /// Имя темы, в которую сообщение опубликовано.
    pub topic: Arc<str>,
    /// Содержимое сообщения.
    pub payload: Bytes,
    /// Произвольные метаданные.
    pub attributes: HashMap<String, String>,
}

impl Message {
    pub fn new(topic: impl Into<Arc<str>>, payload: impl Into<Bytes>) -> Self {
        Self {
            id: 0,
            topic: topic.into(),
            payload: payload.into(),
            attributes: HashMap::new(),
        }
    }

    /// Добавляет атрибут, возвращая сообщение (удобно при построении).
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}
