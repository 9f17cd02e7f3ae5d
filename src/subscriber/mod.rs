//! Конвейер обработки подписок.
//!
//! - `interceptor`: дескриптор подписки, типы обработчиков и построение
//!   цепочки перехватчиков.
//! - `registry`: потокобезопасный реестр «идентификатор подписки →
//!   обработчик» с атомарной защитой от дубликатов.
//! - `runner`: запуск по одной задаче потребления на подписку с общим
//!   сигналом отмены и управляемой остановкой.

pub mod interceptor;
pub mod registry;
pub mod runner;

pub use interceptor::{
    chain, handler_fn, interceptor_fn, HandlerFuture, HandlerResult, MessageHandler,
    SubscriptionInfo, SubscriptionInterceptor,
};
pub use registry::{RegisteredSubscription, SubscriptionRegistry};
pub use runner::{PipelineState, Subscriber};
