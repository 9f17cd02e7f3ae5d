use thiserror::Error;

/// Ошибка регистрации подписки или запуска конвейера.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscribeError {
    #[error("handler for subscription '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("subscriber is already running")]
    AlreadyStarted,

    #[error("subscriber has been stopped and cannot be restarted")]
    Stopped,
}
