//! Граница брокера сообщений.
//!
//! Ядро конвейера потребляет транспорт только через два примитива:
//!
//! - `Topic`: публикация одного сообщения в именованную тему;
//! - `PullSubscription`: pull-получение сообщений подписки с поддержкой
//!   отмены, по одному сообщению за раз и в порядке доставки.
//!
//! Модуль `memory` реализует оба примитива поверх внутрипроцессных
//! каналов и служит тестовым брокером для интеграционных тестов и демо.

pub mod memory;
pub mod message;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{PublishError, PullError},
    subscriber::MessageHandler,
};

pub use memory::{MemoryBroker, MemorySubscription, MemoryTopic};
pub use message::Message;

/// Примитив публикации: именованная тема, принимающая сообщения.
#[async_trait]
pub trait Topic: Send + Sync {
    /// Идентификатор темы.
    fn id(&self) -> &str;

    /// Публикует сообщение в тему.
    async fn publish(&self, message: Message) -> Result<(), PublishError>;
}

/// Примитив pull-получения: именованная подписка на тему.
#[async_trait]
pub trait PullSubscription: Send + Sync {
    /// Идентификатор подписки (уникальный ключ в реестре).
    fn id(&self) -> &str;

    /// Идентификатор темы, к которой привязана подписка.
    fn topic_id(&self) -> &str;

    /// Доставляет сообщения обработчику по одному, в порядке доставки.
    ///
    /// Возвращает `Ok(())` после срабатывания сигнала отмены (уже
    /// начатый вызов обработчика при этом довыполняется) и
    /// `Err(PullError)` при терминальном состоянии брокера. После
    /// наблюдения отмены новые вызовы обработчика не начинаются.
    async fn receive(
        &self,
        cancel: CancellationToken,
        handler: MessageHandler,
    ) -> Result<(), PullError>;
}
