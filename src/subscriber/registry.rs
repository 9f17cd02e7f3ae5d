use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};

use super::{MessageHandler, SubscriptionInfo};
use crate::{broker::PullSubscription, error::SubscribeError};

/// Зарегистрированная подписка: дескриптор, источник и обработчик.
///
/// Создаётся один раз при регистрации и далее не меняется.
#[derive(Clone)]
pub struct RegisteredSubscription {
    pub(crate) info: SubscriptionInfo,
    pub(crate) source: Arc<dyn PullSubscription>,
    pub(crate) handler: MessageHandler,
}

impl RegisteredSubscription {
    pub fn info(&self) -> &SubscriptionInfo {
        &self.info
    }
}

/// Потокобезопасный реестр подписок.
///
/// Идентификатор подписки отображается не более чем в одну запись за
/// всё время жизни реестра: проверка и вставка выполняются одной
/// атомарной операцией над entry, поэтому при конкурентной регистрации
/// одного идентификатора побеждает ровно один вызов, и победивший
/// обработчик никогда не перезаписывается.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: DashMap<Arc<str>, RegisteredSubscription>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Регистрирует обработчик для подписки источника.
    ///
    /// Дубликат идентификатора — единственная ошибка.
    pub fn register(
        &self,
        source: Arc<dyn PullSubscription>,
        handler: MessageHandler,
    ) -> Result<(), SubscribeError> {
        let id: Arc<str> = Arc::from(source.id());
        match self.entries.entry(id.clone()) {
            Entry::Occupied(_) => Err(SubscribeError::AlreadyRegistered(id.to_string())),
            Entry::Vacant(slot) => {
                let info = SubscriptionInfo::new(source.topic_id(), source.id());
                slot.insert(RegisteredSubscription {
                    info,
                    source,
                    handler,
                });
                Ok(())
            }
        }
    }

    /// Регистрирует набор пар (источник, обработчик).
    ///
    /// Каждая пара пробуется независимо от исхода остальных: конфликт
    /// одной не мешает зарегистрировать следующие. Возвращается первая
    /// встреченная ошибка; вставленные записи остаются (отката нет).
    pub fn register_many<I>(&self, pairs: I) -> Result<(), SubscribeError>
    where
        I: IntoIterator<Item = (Arc<dyn PullSubscription>, MessageHandler)>,
    {
        let mut first_error = None;
        for (source, handler) in pairs {
            if let Err(err) = self.register(source, handler) {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Снимок всех записей для запуска конвейера.
    pub(crate) fn snapshot(&self) -> Vec<RegisteredSubscription> {
        self.entries.iter().map(|e| e.value().clone()).collect()
    }
}
