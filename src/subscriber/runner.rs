use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::{chain, MessageHandler, SubscriptionInterceptor, SubscriptionRegistry};
use crate::{broker::PullSubscription, error::SubscribeError};

/// Состояние конвейера; переходов назад нет, перезапуск невозможен.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// Конвейер pull-подписок: реестр, цепочка перехватчиков и по одной
/// задаче потребления на подписку.
///
/// Список перехватчиков общий и только для чтения; на каждую подписку
/// из него один раз собирается эффективный обработчик,
/// параметризованный её `SubscriptionInfo`. Задачи изолированы:
/// ошибка получения одной подписки не останавливает остальные.
pub struct Subscriber {
    registry: SubscriptionRegistry,
    interceptors: Vec<SubscriptionInterceptor>,
    cancel: CancellationToken,
    tasks: Mutex<JoinSet<()>>,
    state: Mutex<PipelineState>,
}

impl Default for Subscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber {
    pub fn new() -> Self {
        Self::with_interceptors(Vec::new())
    }

    pub fn with_interceptors(interceptors: Vec<SubscriptionInterceptor>) -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            interceptors,
            cancel: CancellationToken::new(),
            tasks: Mutex::new(JoinSet::new()),
            state: Mutex::new(PipelineState::Created),
        }
    }

    /// Регистрирует обработчик подписки; см. [`SubscriptionRegistry::register`].
    pub fn register(
        &self,
        source: Arc<dyn PullSubscription>,
        handler: MessageHandler,
    ) -> Result<(), SubscribeError> {
        self.registry.register(source, handler)
    }

    /// Регистрирует набор подписок; см. [`SubscriptionRegistry::register_many`].
    pub fn register_many<I>(&self, pairs: I) -> Result<(), SubscribeError>
    where
        I: IntoIterator<Item = (Arc<dyn PullSubscription>, MessageHandler)>,
    {
        self.registry.register_many(pairs)
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn state(&self) -> PipelineState {
        *self.state.lock()
    }

    /// Запускает по одной задаче потребления на каждую
    /// зарегистрированную подписку.
    ///
    /// Запуск без регистраций легален и ничего не делает. Повторный
    /// запуск запрещён; после остановки конвейер не перезапускается —
    /// для нового запуска создаётся новый `Subscriber`. Должен
    /// вызываться внутри рантайма Tokio.
    pub fn run(&self) -> Result<(), SubscribeError> {
        {
            let mut state = self.state.lock();
            match *state {
                PipelineState::Created => *state = PipelineState::Running,
                PipelineState::Running => return Err(SubscribeError::AlreadyStarted),
                PipelineState::Stopping | PipelineState::Stopped => {
                    return Err(SubscribeError::Stopped)
                }
            }
        }

        let mut tasks = self.tasks.lock();
        for registration in self.registry.snapshot() {
            let effective = chain(
                &self.interceptors,
                &registration.info,
                registration.handler.clone(),
            );
            let cancel = self.cancel.clone();
            let info = registration.info.clone();
            let source = registration.source.clone();

            tasks.spawn(async move {
                match source.receive(cancel, effective).await {
                    Ok(()) => {
                        tracing::debug!(
                            subscription = %info.subscription_id,
                            "pull loop cancelled"
                        );
                    }
                    // Терминальная ошибка получения останавливает
                    // только эту подписку.
                    Err(err) => {
                        tracing::error!(
                            subscription = %info.subscription_id,
                            error = %err,
                            "pull loop terminated"
                        );
                    }
                }
            });
        }

        Ok(())
    }

    /// Рассылает сигнал отмены и возвращается немедленно, не дожидаясь
    /// завершения задач: по одному уже начатому вызову обработчика на
    /// подписку может ещё довыполняться.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                PipelineState::Created => *state = PipelineState::Stopped,
                PipelineState::Running => *state = PipelineState::Stopping,
                PipelineState::Stopping | PipelineState::Stopped => {}
            }
        }
        self.cancel.cancel();
    }

    /// Останавливает конвейер и дожидается завершения всех задач
    /// потребления.
    pub async fn shutdown(&self) {
        self.close();

        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        while tasks.join_next().await.is_some() {}

        *self.state.lock() = PipelineState::Stopped;
    }
}
