//! FlagForge is a feature flag evaluation engine: it decides which variation of a flag a request
//! context receives.
//!
//! # Overview
//!
//! A [`Flag`](flags::Flag) has two default payloads and an ordered list of
//! [`TargetingRule`](flags::TargetingRule)s. Each rule has conjunctive conditions over the
//! attributes of a [`Context`] and a percentage rollout. The first rule whose conditions match and
//! whose rollout includes the context wins; otherwise the flag default is served. Rollouts are
//! sticky: the same sticky key (e.g., `userId`) always lands in the same bucket.
//!
//! Flags are evaluated either directly with [`flags::evaluate`], or through a [`Client`] that
//! reads an immutable [`Configuration`] snapshot from a [`ConfigurationStore`]. The client also
//! passes an [`EvaluationEvent`] for every served variation to an [`EvaluationLogger`].
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum.
//!
//! Malformed targeting rules never fail an evaluation: they are skipped and the result reports
//! [`EvaluationReason::Error`](flags::EvaluationReason::Error) if nothing else matched. Errors
//! returned by the client usually indicate a missing snapshot or flag (see
//! [`Error::is_normal`]), in which case the caller should serve its own default.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages, with target `flagforge`. Consider integrating a `log`-compatible logger
//! implementation for better visibility into evaluations.
//!
//! # Examples
//!
//! A runnable example can be found in the `demos/simple` directory of the crate repository.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod attributes;
mod client;
mod config;
mod configuration;
mod configuration_store;
mod error;
mod evaluation_logger;

pub mod domain;
pub mod flags;
pub mod sharder;

pub use attributes::{AttributeValue, Attributes, Context, DEFAULT_STICKY_KEY_ATTRIBUTES};
pub use client::Client;
pub use config::ClientConfig;
pub use configuration::Configuration;
pub use configuration_store::ConfigurationStore;
pub use error::{Error, Result};
pub use evaluation_logger::{EvaluationEvent, EvaluationLogger};
