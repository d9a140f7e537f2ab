//! A set of helpers for testing

mod alert;
mod http_client;
mod receiver;

pub use alert::AlertBuilder;
pub use http_client::plain_http_client;
pub use receiver::ReceiverBuilder;
