use thiserror::Error;

/// Ошибка администрирования брокера (темы и подписки).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    #[error("subscription '{0}' already exists")]
    SubscriptionExists(String),

    #[error("topic '{0}' not found")]
    TopicNotFound(String),
}

/// Ошибка публикации сообщения.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PublishError {
    #[error("topic '{0}' not found")]
    TopicNotFound(String),

    #[error("broker rejected the message: {0}")]
    Broker(String),
}

/// Ошибка получения сообщений из подписки.
///
/// Отмена не считается ошибкой: `receive` в этом случае возвращает `Ok`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PullError {
    #[error("subscription channel is closed")]
    Closed,

    #[error("broker receive failure: {0}")]
    Broker(String),
}
