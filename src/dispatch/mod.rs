//! Delivery dispatch pipeline: validation, composition, attachment
//! resolution, transport send with retry, and outcome logging.

mod backoff;
mod dispatcher;
mod types;

pub use backoff::RetryPolicy;
pub use dispatcher::Dispatcher;
pub use types::{
    CancelHandle, DeliveryOutcome, DeliveryStatus, DispatchError, DispatchRequest, Recipients,
};
