#![allow(unreachable_pub)]
#![allow(clippy::needless_pass_by_value)]

//! # Macros
//!
//! Attribute macros shared by every crate of the workspace: error enums with
//! contextual messages, API data models, documented handlers and feature slices.
//!
//! The macros expand to paths such as `::thiserror`, `::serde`, `::utoipa` and
//! `::fauna_kernel`, so consuming crates must depend on those directly.

mod macros;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemFn, ItemStruct, parse_macro_input};

/// Turns an enum into a workspace error type.
///
/// # Injected Behaviors
///
/// * `#[derive(Debug, thiserror::Error)]` unless already derived.
/// * A companion `<Name>Ext` trait with `.context(...)` for `Result<T, Name>` and for
///   `Result<T, Source>` of every variant that wraps a `source` error.
/// * `From<Source>` for every variant that wraps a `source` error.
/// * `From<&'static str>` / `From<String>` when an `Internal` variant exists.
/// * A private `format_context` helper for the `#[error(...)]` strings.
///
/// Variants must use named fields. A variant carrying a `source` must also carry
/// `context: Option<Cow<'static, str>>`.
///
/// # Example
///
/// ```rust,ignore
/// use std::borrow::Cow;
///
/// #[fauna_derive::fauna_error]
/// pub enum PoolError {
///     #[error("Store failure{}: {source}", format_context(.context))]
///     Store { source: sqlx::Error, context: Option<Cow<'static, str>> },
///
///     #[error("Internal pool error{}: {message}", format_context(.context))]
///     Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
/// }
///
/// fn load() -> Result<(), PoolError> {
///     run_query().context("Loading active spawns")?;
///     Ok(())
/// }
/// ```
#[proc_macro_attribute]
pub fn fauna_error(_args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    macros::error::expand(input).into()
}

/// Declares a DTO exchanged over the HTTP API.
///
/// Adds `Debug`, `Serialize` and `Deserialize` when missing, `utoipa::ToSchema`
/// behind the consuming crate's `server` feature, and `#[serde(rename_all = "camelCase")]`.
///
/// # Arguments
///
/// * `rename_all = "..."` - overrides the camelCase policy.
/// * `deny_unknown_fields = true` - rejects unexpected JSON keys (off by default, clients
///   of the game API send extra keys).
///
/// ```rust,ignore
/// #[fauna_derive::api_model(deny_unknown_fields = true)]
/// pub struct ClaimRequest {
///     pub player: String,
/// }
/// ```
#[proc_macro_attribute]
pub fn api_model(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::api::expand_model(attr.into(), input).into()
}

/// Documents an axum handler with `utoipa::path` behind the `server` feature.
///
/// ```rust,ignore
/// #[fauna_derive::api_handler(get, path = "/api/ping", tag = SYSTEM_TAG)]
/// pub async fn ping() -> &'static str {
///     "pong"
/// }
/// ```
#[proc_macro_attribute]
pub fn api_handler(args: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemFn);
    macros::api::expand_handler(args.into(), input).into()
}

/// Turns a struct into a cheaply clonable feature slice.
///
/// The struct body becomes `<Name>Inner`; `<Name>` wraps it in an `Arc`, derefs to it
/// and implements `fauna_kernel::domain::registry::FeatureSlice`.
///
/// ```rust,ignore
/// #[fauna_derive::fauna_slice]
/// pub struct Spawns {
///     pub service: SpawnService,
/// }
///
/// let slice = Spawns::new(SpawnsInner { service });
/// ```
#[proc_macro_attribute]
pub fn fauna_slice(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemStruct);
    macros::slice::expand(input).into()
}
