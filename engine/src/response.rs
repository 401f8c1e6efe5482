// src/response.rs
//! The in-flight/completed response record (§3 data model).

mod private
{
  use std::collections::HashMap;
  use core::time::Duration;

  /// Timing milestones captured for one completed call.
  #[ derive( Debug, Clone, Default ) ]
  pub struct Timings
  {
    /// Time spent resolving DNS, if measured.
    pub lookup : Option< Duration >,
    /// Time spent establishing the TCP connection.
    pub connect : Option< Duration >,
    /// Time spent on the TLS handshake, if any.
    pub secure_connect : Option< Duration >,
    /// Time spent streaming the request body.
    pub send : Option< Duration >,
    /// Time until the first response byte.
    pub first_byte : Option< Duration >,
    /// Total wall-clock time for the whole call, including redirects and retries.
    pub total : Option< Duration >,
  }

  /// A received HTTP response, with the request metadata it resulted from.
  #[ derive( Debug, Clone ) ]
  pub struct Response
  {
    /// HTTP status code.
    pub status_code : u16,
    /// HTTP reason phrase, if the transport exposed one.
    pub status_message : Option< String >,
    /// Response headers, lower-cased keys.
    pub headers : HashMap< String, String >,
    /// Accumulated response body (empty for the stream surface).
    pub body : Vec< u8 >,
    /// Final URL after following any redirects.
    pub url : String,
    /// The URL the call was originally made to.
    pub request_url : String,
    /// Every URL hop followed, in order.
    pub redirect_urls : Vec< String >,
    /// Number of retry attempts performed before this response was obtained.
    pub retry_count : u32,
    /// Timing breakdown for the winning attempt.
    pub timings : Timings,
    /// Remote IP address of the server, if known.
    pub ip : Option< String >,
    /// Whether the response was served from the cache adapter.
    pub is_from_cache : bool,
  }

  impl Response
  {
    /// Case-insensitive header lookup.
    #[ must_use ]
    pub fn header( &self, name : &str ) -> Option< &str >
    {
      let lower = name.to_ascii_lowercase();
      self.headers.get( &lower ).map( String::as_str )
    }

    /// Whether the status code is in the `2xx` range.
    #[ must_use ]
    pub fn is_success( &self ) -> bool
    {
      ( 200..300 ).contains( &self.status_code )
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    Response,
    Timings,
  };
}
