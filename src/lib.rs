//! Portrait Generation Pipeline
//!
//! This library drives the DashScope FaceChain API to turn a set of user
//! photos and an ordered list of style templates into generated portrait
//! URLs: photos are packed into an uncompressed ZIP archive, uploaded,
//! fine-tuned into a face resource, and then one generation request per
//! template is dispatched concurrently and polled to completion.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
