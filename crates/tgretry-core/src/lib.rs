pub mod config;
pub mod logging;

pub mod catalog;
pub mod control;
pub mod retry;

pub use catalog::{ErrorCatalog, ErrorDescriptor, ErrorKey, RetryClass};
pub use control::CancelToken;
pub use retry::{
    ClassifiedError, ErrorClassifier, RawFailure, RetryError, RetryPolicy, RetryScheduler,
};
