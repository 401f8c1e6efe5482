// src/error.rs
//! Error types for the fetch engine.
//!
//! `EngineError` classifies every failure the engine can surface, matching
//! the taxonomy the request lifecycle is built around: construction-time
//! failures, transport failures, timeouts, redirect/protocol violations,
//! cache/read/upload failures, HTTP status failures, body-parse failures
//! and cancellation.

/// Define a private namespace for all its items.
mod private
{
  use core::fmt;
  use error_tools::dependency::thiserror;

  use crate::response::Response;

  /// Which timeout milestone fired (see the timeout watchdog).
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  #[ non_exhaustive ]
  pub enum TimeoutEvent
  {
    /// Whole-request budget exceeded.
    Request,
    /// Socket assignment to response-end budget exceeded.
    Socket,
    /// DNS lookup budget exceeded.
    Lookup,
    /// TCP connect budget exceeded.
    Connect,
    /// TLS handshake budget exceeded.
    SecureConnect,
    /// Upload (send) budget exceeded.
    Send,
    /// Time-to-first-response-byte budget exceeded.
    Response,
  }

  impl fmt::Display for TimeoutEvent
  {
    #[ inline ]
    fn fmt( &self, f : &mut fmt::Formatter< '_ > ) -> fmt::Result
    {
      let name = match self
      {
        Self::Request => "request",
        Self::Socket => "socket",
        Self::Lookup => "lookup",
        Self::Connect => "connect",
        Self::SecureConnect => "secureConnect",
        Self::Send => "send",
        Self::Response => "response",
      };
      f.write_str( name )
    }
  }

  /// Every error the engine can surface to a caller.
  #[ derive( Debug, thiserror::Error ) ]
  #[ non_exhaustive ]
  pub enum EngineError
  {
    /// Transport- or engine-level failure before a response was classified.
    #[ error( "request error : {0}" ) ]
    Request( String ),

    /// One of the timeout watchdog's milestones fired.
    #[ error( "timeout error : {event} exceeded {threshold_ms}ms" ) ]
    Timeout
    {
      /// Which milestone fired.
      event : TimeoutEvent,
      /// The configured threshold, in milliseconds.
      threshold_ms : u64,
    },

    /// Redirect depth exceeded `max_redirects`.
    #[ error( "max redirects ({limit}) exceeded, last hop {last_url}" ) ]
    MaxRedirects
    {
      /// The configured redirect limit.
      limit : usize,
      /// The URL of the last redirect hop that was followed.
      last_url : String,
    },

    /// URL scheme was neither `http` nor `https`.
    #[ error( "unsupported protocol : {0}" ) ]
    UnsupportedProtocol( String ),

    /// Cache adapter failure, distinct from a transport failure.
    #[ error( "cache error : {0}" ) ]
    Cache( String ),

    /// Error while draining the response body.
    #[ error( "read error : {0}" ) ]
    Read( String ),

    /// Error while streaming the request body.
    #[ error( "upload error : {0}" ) ]
    Upload( String ),

    /// Response status the engine classifies as a failure.
    #[ error( "http error : status {status}" ) ]
    Http
    {
      /// HTTP status code of the failing response.
      status : u16,
      /// The captured response, if the body was read.
      response : Box< Response >,
    },

    /// A 2xx response whose body failed to parse under the requested `responseType`.
    #[ error( "parse error : {0}" ) ]
    Parse( String ),

    /// The call was cancelled.
    #[ error( "cancelled" ) ]
    Cancel,

    /// An option or combination of options was invalid.
    #[ error( "invalid argument : {0}" ) ]
    InvalidArgument( String ),
  }

  impl From< reqwest::Error > for EngineError
  {
    #[ inline ]
    fn from( error : reqwest::Error ) -> Self
    {
      if error.is_timeout()
      {
        Self::Timeout { event : TimeoutEvent::Request, threshold_ms : 0 }
      }
      else if error.is_connect() || error.is_request()
      {
        Self::Request( error.to_string() )
      }
      else if error.is_builder()
      {
        Self::InvalidArgument( format!( "http client build error : {error}" ) )
      }
      else
      {
        Self::Request( error.to_string() )
      }
    }
  }

  impl From< serde_json::Error > for EngineError
  {
    #[ inline ]
    fn from( error : serde_json::Error ) -> Self
    {
      Self::Parse( error.to_string() )
    }
  }

  impl From< url::ParseError > for EngineError
  {
    #[ inline ]
    fn from( error : url::ParseError ) -> Self
    {
      Self::InvalidArgument( format!( "invalid url : {error}" ) )
    }
  }

  /// Helper to classify a JSON deserialization failure as a `Parse` error.
  #[ must_use ]
  #[ inline ]
  pub fn map_deserialization_error( error : &serde_json::Error ) -> EngineError
  {
    EngineError::Parse( error.to_string() )
  }

  /// Crate-wide result alias.
  pub type Result< T > = core::result::Result< T, EngineError >;

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    EngineError,
    TimeoutEvent,
    Result,
    map_deserialization_error,
  };
}
