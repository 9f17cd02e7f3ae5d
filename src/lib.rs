/// Adaptive batching: Batcher, BatchConfig, dispatch collaborators.
pub mod batch;
/// Broker boundary: Topic/PullSubscription traits, Message, in-memory broker.
pub mod broker;
/// Common error types: subscribe, broker transport, batching.
pub mod error;
/// Publisher with a publish-interceptor chain.
pub mod publisher;
/// Subscription pipeline: interceptors, registry, runner.
pub mod subscriber;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Batch aggregation API.
pub use batch::{BatchConfig, BatchDispatcher, BatchHandle, Batcher, TopicDispatcher};
/// Broker boundary and the in-memory test broker.
pub use broker::{MemoryBroker, MemorySubscription, MemoryTopic, Message, PullSubscription, Topic};
/// Operation errors.
pub use error::{
    BatchConfigError, BatchError, BrokerError, DispatchError, PublishError, PullError,
    SubscribeError,
};
/// Publishing with interceptors.
pub use publisher::{
    publish_interceptor_fn, MessagePublisher, PublishFuture, PublishInterceptor, Publisher,
};
/// Subscription pipeline API.
pub use subscriber::{
    chain, handler_fn, interceptor_fn, HandlerFuture, HandlerResult, MessageHandler, PipelineState,
    RegisteredSubscription, Subscriber, SubscriptionInfo, SubscriptionInterceptor,
    SubscriptionRegistry,
};
