//! # End-user processor
//!
//! Captures who made a request. Rules point at span attributes such as the
//! `Authorization` header, a cookie or a request body and describe where the
//! user id, role, scope and session live inside them:
//!
//! * `id`, `role`, `scope`, `session`: the attribute value is the fragment.
//! * `authheader`: `Bearer` tokens are decoded as JWTs (the signature is not
//!   verified) and fragments are read from the named claims; `Basic`
//!   credentials yield the user name.
//! * `json`: fragments are selected with JSONPath expressions.
//! * `urlencoded`: fragments are read from form parameters.
//! * `cookie`: fragments are read from cookies, or from a JWT stored in a
//!   cookie when `encoding: jwt`.
//!
//! Session values are hashed (SHA-1 unless configured otherwise) before they
//! are attached as `session.id`.
#![warn(
    future_incompatible,
    missing_debug_implementations,
    missing_docs,
    nonstandard_style,
    rust_2018_idioms,
    unused
)]
#![cfg_attr(docsrs, feature(doc_cfg), deny(rustdoc::broken_intra_doc_links))]

mod config;
mod error;
mod extractor;
mod processor;
pub mod token;

pub use config::{Condition, Config, Encoding, EndUserConfig, EndUserType};
pub use error::{ConfigError, TokenError};
pub use extractor::EndUser;
pub use processor::{EndUserProcessor, ENDUSER_ID, ENDUSER_ROLE, ENDUSER_SCOPE, SESSION_ID};
