//! Initial-guess advisor adapters.

pub mod http;

pub use http::HttpAdvisor;
