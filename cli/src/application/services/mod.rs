//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`, never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod build_host;
pub mod config_service;
pub mod launch;
pub mod pipeline;
pub mod poll;
pub mod registrar;
pub mod retry;
pub mod volume_stager;

#[cfg(test)]
pub mod test_support;
