//! s3fs-s3: aws-sdk-s3 adapter for s3fs
//!
//! Provides [`S3Client`], whose filesystem-style operations are executed
//! through the s3fs-core retry engine, and [`from_sdk_error`], which turns
//! SDK failures into the backend errors that engine classifies.

mod client;
mod error;
mod object;

pub use client::S3Client;
pub use error::from_sdk_error;
pub use object::ObjectInfo;
