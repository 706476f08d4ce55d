//! HTTP surface for the host process

pub mod rest;

pub use rest::RestApi;
