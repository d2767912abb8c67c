//! Serverless worker process bridging a job-invocation framework to a
//! local ComfyUI server.
//!
//! Accepts one job per invocation over HTTP, drives it through the
//! `rendergate-comfyui` executor, and answers with the job contract
//! defined in `rendergate-core`.

pub mod config;
pub mod gpu;
pub mod handler;
pub mod routes;
