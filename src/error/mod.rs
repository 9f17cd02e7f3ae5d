pub mod batch;
pub mod broker;
pub mod subscribe;

pub use batch::{BatchConfigError, BatchError, DispatchError};
pub use broker::{BrokerError, PublishError, PullError};
pub use subscribe::SubscribeError;
