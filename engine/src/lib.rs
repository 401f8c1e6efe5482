// src/lib.rs
//! A general-purpose HTTP(S) client engine.
//!
//! `Client` builds normalized `Options` for a request; `Options` is run
//! through a retrying, hook-driven orchestrator on top of a single-attempt
//! executor, and can be awaited as a `Call` (one `Response`), consumed as a
//! `StreamCall` (chunked body or server-sent events), or driven through a
//! `PaginationIterator` across repeated requests.
//!
//! # Feature flags
//!
//! - `cache` — in-memory response cache consulted when `Options::cache_namespace` is set.
//! - `cookies` — in-memory cookie jar, automatic `Cookie`/`Set-Cookie` handling.
//! - `compression` — automatic response decompression (gzip, deflate, brotli, zstd).
//!
//! `full` (the default) enables all of the above on top of the base `enabled` feature.

#[ cfg( feature = "enabled" ) ]
use mod_interface::mod_interface;

#[ cfg( feature = "enabled" ) ]
mod private {}

#[ cfg( feature = "enabled" ) ]
crate::mod_interface!
{
  layer error;
  layer cancel;
  layer url;
  layer options;
  layer timeout;
  layer progress;
  layer events;
  layer response;
  layer transport;

  #[ cfg( feature = "cache" ) ]
  layer cache;
  #[ cfg( feature = "cookies" ) ]
  layer cookie_jar;
  #[ cfg( feature = "compression" ) ]
  layer decompress;

  layer retry;
  layer executor;
  layer orchestrator;
  layer call;
  layer stream_call;
  layer pagination;
  layer client;

  exposed use error;
  exposed use cancel;
  exposed use url;
  exposed use options;
  exposed use timeout;
  exposed use progress;
  exposed use events;
  exposed use response;
  exposed use transport;

  #[ cfg( feature = "cache" ) ]
  exposed use cache;
  #[ cfg( feature = "cookies" ) ]
  exposed use cookie_jar;
  #[ cfg( feature = "compression" ) ]
  exposed use decompress;

  exposed use retry;
  exposed use executor;
  exposed use orchestrator;
  exposed use call;
  exposed use stream_call;
  exposed use pagination;
  exposed use client;
}
