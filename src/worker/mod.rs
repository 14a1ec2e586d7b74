//! The job pipeline: validate, upload, submit, poll, resolve.
pub mod handler;
pub mod output;
pub mod poll;
pub mod retry;
pub mod submit;
pub mod upload;
pub mod validate;

pub use handler::Worker;
