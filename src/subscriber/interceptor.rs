use std::{future::Future, pin::Pin, sync::Arc};

use tokio_util::sync::CancellationToken;

use crate::broker::Message;

/// Результат обработки одного сообщения.
///
/// Бизнес-логика возвращает произвольную ошибку; ядро не принимает по
/// ней никаких решений (ack/nack — забота внешнего перехватчика).
pub type HandlerResult = anyhow::Result<()>;

/// Будущее, возвращаемое обработчиком сообщения.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Терминальный обработчик: единица работы над одним сообщением
/// с отменяемым контекстом исполнения.
pub type MessageHandler = Arc<dyn Fn(CancellationToken, Message) -> HandlerFuture + Send + Sync>;

/// Перехватчик подписки: чистый трансформер обработчика.
///
/// Вызывается один раз на подписку при построении цепочки, а не на
/// каждое сообщение; эффекты возникают только при исполнении
/// результирующего обработчика.
pub type SubscriptionInterceptor =
    Arc<dyn Fn(&SubscriptionInfo, MessageHandler) -> MessageHandler + Send + Sync>;

/// Неизменяемый дескриптор подписки, передаваемый перехватчикам.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionInfo {
    pub topic_id: Arc<str>,
    pub subscription_id: Arc<str>,
}

impl SubscriptionInfo {
    pub fn new(topic_id: impl Into<Arc<str>>, subscription_id: impl Into<Arc<str>>) -> Self {
        Self {
            topic_id: topic_id.into(),
            subscription_id: subscription_id.into(),
        }
    }
}

/// Оборачивает async-замыкание в `MessageHandler`.
pub fn handler_fn<F, Fut>(f: F) -> MessageHandler
where
    F: Fn(CancellationToken, Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |cancel, message| Box::pin(f(cancel, message)))
}

/// Оборачивает замыкание в `SubscriptionInterceptor`.
pub fn interceptor_fn<F>(f: F) -> SubscriptionInterceptor
where
    F: Fn(&SubscriptionInfo, MessageHandler) -> MessageHandler + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Строит эффективный обработчик из упорядоченного списка
/// перехватчиков и терминального обработчика.
///
/// Свёртка идёт от последнего перехватчика к первому, так что первый
/// в списке оказывается внешним слоем: `I1(I2(…In(H)…))`. Пустой
/// список возвращает `H` без изменений.
pub fn chain(
    interceptors: &[SubscriptionInterceptor],
    info: &SubscriptionInfo,
    handler: MessageHandler,
) -> MessageHandler {
    interceptors
        .iter()
        .rev()
        .fold(handler, |next, interceptor| interceptor(info, next))
}
