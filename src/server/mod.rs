//! HTTP gateway

pub mod api;
pub mod gateway;
pub mod scratch;
