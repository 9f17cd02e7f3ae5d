use std::{future::Future, pin::Pin, sync::Arc};

use crate::{
    broker::{Message, Topic},
    error::PublishError,
};

/// Будущее, возвращаемое публикацией.
pub type PublishFuture = Pin<Box<dyn Future<Output = Result<(), PublishError>> + Send>>;

/// Терминальная операция публикации одного сообщения.
pub type MessagePublisher = Arc<dyn Fn(Message) -> PublishFuture + Send + Sync>;

/// Перехватчик публикации: чистый трансформер, то же правило
/// композиции, что и у перехватчиков подписки — первый в списке
/// оказывается внешним слоем.
pub type PublishInterceptor = Arc<dyn Fn(MessagePublisher) -> MessagePublisher + Send + Sync>;

/// Оборачивает замыкание в `PublishInterceptor`.
pub fn publish_interceptor_fn<F>(f: F) -> PublishInterceptor
where
    F: Fn(MessagePublisher) -> MessagePublisher + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Публикатор с цепочкой перехватчиков вокруг отправки в тему.
#[derive(Default)]
pub struct Publisher {
    interceptors: Vec<PublishInterceptor>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interceptors(interceptors: Vec<PublishInterceptor>) -> Self {
        Self { interceptors }
    }

    /// Публикует сообщение в тему, пропустив его через цепочку
    /// перехватчиков.
    pub async fn publish(
        &self,
        topic: Arc<dyn Topic>,
        message: Message,
    ) -> Result<(), PublishError> {
        let terminal: MessagePublisher = Arc::new(move |m: Message| {
            let topic = topic.clone();
            Box::pin(async move { topic.publish(m).await }) as PublishFuture
        });

        let effective = self
            .interceptors
            .iter()
            .rev()
            .fold(terminal, |next, interceptor| interceptor(next));

        effective(message).await
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::broker::MemoryBroker;

    /// Перехватчик, заменяющий содержимое сообщения.
    fn overwrite_payload(value: &'static [u8]) -> PublishInterceptor {
        publish_interceptor_fn(move |next| {
            Arc::new(move |mut message: Message| {
                message.payload = Bytes::from_static(value);
                next(message)
            })
        })
    }

    /// Тест проверяет публикацию без перехватчиков.
    #[tokio::test]
    async fn test_publish_without_interceptors() {
        let broker = MemoryBroker::new();
        let topic: Arc<dyn Topic> = Arc::new(broker.create_topic("plain"));
        let sub = broker.subscribe("plain", "plain-sub").unwrap();

        Publisher::new()
            .publish(topic, Message::new("plain", Bytes::from_static(b"test")))
            .await
            .unwrap();

        let msg = sub.pull().await.expect("no message");
        assert_eq!(msg.payload, Bytes::from_static(b"test"));
    }

    /// Тест проверяет, что при нескольких перехватчиках наблюдается
    /// запись последнего из них (он ближе к терминальной операции).
    #[tokio::test]
    async fn test_last_interceptor_wins() {
        let broker = MemoryBroker::new();
        let topic: Arc<dyn Topic> = Arc::new(broker.create_topic("chained"));
        let sub = broker.subscribe("chained", "chained-sub").unwrap();

        let publisher = Publisher::with_interceptors(vec![
            overwrite_payload(b"overwritten by first interceptor"),
            overwrite_payload(b"overwritten by last interceptor"),
        ]);
        publisher
            .publish(topic, Message::new("chained", Bytes::from_static(b"test")))
            .await
            .unwrap();

        let msg = sub.pull().await.expect("no message");
        assert_eq!(
            msg.payload,
            Bytes::from_static(b"overwritten by last interceptor")
        );
    }
}
