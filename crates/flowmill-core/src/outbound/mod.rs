//! Outbound transport seams: HTTP dispatch and mail delivery.
//!
//! The engine core never talks to the network directly. Executors go
//! through these traits; `flowmill-infra` provides the reqwest-backed
//! implementations, and tests substitute in-memory fakes.

pub mod http;
pub mod mail;

pub use http::{BoxHttpDispatcher, HttpDispatcher, HttpError, OutboundRequest, OutboundResponse};
pub use mail::{BoxMailSender, MailSender};
