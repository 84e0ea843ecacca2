//! Invoice primitives shared by the channel database and its consumers.

mod invoice;
mod payment_request;

pub use invoice::*;
pub use payment_request::*;
