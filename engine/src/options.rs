// src/options.rs
//! The normalized options record and its merge algorithm (§4.1).

mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;
  use core::time::Duration;
  use url::Url;

  use crate::error::{ EngineError, Result };
  use crate::timeout::TimeoutConfig;
  use crate::cancel::CancellationToken;

  /// One request body encoding. At most one may be active at a time (§4.1).
  #[ derive( Debug, Clone ) ]
  #[ non_exhaustive ]
  pub enum Body
  {
    /// Raw bytes, sent as-is.
    Bytes( Vec< u8 > ),
    /// Key/value pairs, sent as `application/x-www-form-urlencoded`.
    Form( Vec< ( String, String ) > ),
    /// A JSON-serializable value, sent as `application/json`.
    Json( serde_json::Value ),
  }

  /// How the response body should be exposed to the caller.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq, Default ) ]
  pub enum ResponseType
  {
    /// Raw bytes.
    #[ default ]
    Default,
    /// Parsed as JSON.
    Json,
    /// Decoded as text under `options.encoding`.
    Text,
    /// Raw bytes, explicitly requested.
    Buffer,
  }

  /// A user override for the retry delay computation (§4.5 step 7). Receives
  /// the 1-based attempt count, the engine's own computed delay, and the
  /// triggering error; a returned zero duration means give up.
  pub type CalculateDelay = Arc< dyn Fn( u32, Duration, &EngineError ) -> Duration + Send + Sync >;

  /// Retry policy (§4.5), carried on `Options`.
  #[ derive( Clone ) ]
  pub struct RetryOptions
  {
    /// Maximum number of retry attempts after the first failure.
    pub limit : u32,
    /// HTTP methods eligible for a retry.
    pub methods : Vec< String >,
    /// Status codes eligible for a retry.
    pub status_codes : Vec< u16 >,
    /// Network/timeout error codes eligible for a retry (e.g. `"ETIMEDOUT"`, `"ECONNRESET"`).
    pub error_codes : Vec< String >,
    /// `Retry-After` ceiling, above which the engine gives up rather than waits.
    pub max_retry_after : Duration,
    /// Ceiling on the exponential-backoff delay itself.
    pub backoff_limit : Duration,
    /// Optional override of the computed delay; see `CalculateDelay`.
    pub calculate_delay : Option< CalculateDelay >,
  }

  impl core::fmt::Debug for RetryOptions
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "RetryOptions" )
        .field( "limit", &self.limit )
        .field( "methods", &self.methods )
        .field( "status_codes", &self.status_codes )
        .field( "error_codes", &self.error_codes )
        .field( "max_retry_after", &self.max_retry_after )
        .field( "backoff_limit", &self.backoff_limit )
        .field( "calculate_delay", &self.calculate_delay.is_some() )
        .finish()
    }
  }

  impl Default for RetryOptions
  {
    fn default() -> Self
    {
      Self
      {
        limit : 2,
        methods : vec![ "GET".into(), "PUT".into(), "HEAD".into(), "DELETE".into(), "OPTIONS".into(), "TRACE".into() ],
        status_codes : vec![ 408, 413, 429, 500, 502, 503, 504, 521, 522, 524 ],
        error_codes : vec![ "ETIMEDOUT".into(), "ECONNRESET".into(), "ECONNREFUSED".into(), "ENOTFOUND".into(), "ENETUNREACH".into(), "EAI_AGAIN".into() ],
        max_retry_after : Duration::from_secs( 60 ),
        backoff_limit : Duration::from_secs( 30 ),
        calculate_delay : None,
      }
    }
  }

  /// Lifecycle hook lists (§4.1's six ordered lists). `init` hooks run
  /// synchronously during normalization; the rest run during the call.
  pub type AsyncHook = Arc< dyn Fn( Options ) -> std::pin::Pin< Box< dyn core::future::Future< Output = Result< Options > > + Send > > + Send + Sync >;

  /// All hook lists carried by a set of options.
  #[ derive( Default, Clone ) ]
  pub struct Hooks
  {
    /// Run once, synchronously, at the start of normalization.
    pub init : Vec< Arc< dyn Fn( &mut Options ) + Send + Sync > >,
    /// Run before the transport request is created.
    pub before_request : Vec< AsyncHook >,
    /// Run before following a redirect.
    pub before_redirect : Vec< AsyncHook >,
    /// Run before scheduling a retry.
    pub before_retry : Vec< AsyncHook >,
    /// Run on a terminal error, in order; may replace the error.
    pub before_error : Vec< Arc< dyn Fn( EngineError ) -> EngineError + Send + Sync > >,
    /// Run once a response is available, may trigger a merged re-request.
    pub after_response : Vec< AsyncHook >,
  }

  impl core::fmt::Debug for Hooks
  {
    fn fmt( &self, f : &mut core::fmt::Formatter< '_ > ) -> core::fmt::Result
    {
      f.debug_struct( "Hooks" )
        .field( "init", &self.init.len() )
        .field( "before_request", &self.before_request.len() )
        .field( "before_redirect", &self.before_redirect.len() )
        .field( "before_retry", &self.before_retry.len() )
        .field( "before_error", &self.before_error.len() )
        .field( "after_response", &self.after_response.len() )
        .finish()
    }
  }

  /// A fully normalized description of one request (§3 data model).
  #[ derive( Debug, Clone ) ]
  pub struct Options
  {
    /// Resolved, absolute URL.
    pub url : Url,
    /// Upper-case HTTP method.
    pub method : String,
    /// Lower-cased header map.
    pub headers : HashMap< String, String >,
    /// At most one of bytes/form/json.
    pub body : Option< Body >,
    /// Whether a body is allowed on `GET`/`HEAD`.
    pub allow_get_body : bool,
    /// Whether the response should be automatically decompressed.
    pub decompress : bool,
    /// Whether redirects are followed automatically.
    pub follow_redirect : bool,
    /// Maximum redirect hops to follow.
    pub max_redirects : usize,
    /// Downgrade method to `GET` and drop the body on 303 (or non-3xx-retained) redirects.
    pub method_rewriting : bool,
    /// How to expose the response body.
    pub response_type : ResponseType,
    /// Resolve with just the body rather than the full `Response`.
    pub resolve_body_only : bool,
    /// Text decoding charset, used when `response_type = Text`.
    pub encoding : String,
    /// Whether non-2xx/304 statuses should reject the call.
    pub throw_http_errors : bool,
    /// Per-milestone timeout budgets.
    pub timeout : TimeoutConfig,
    /// Retry policy.
    pub retry : RetryOptions,
    /// Hook lists.
    pub hooks : Hooks,
    /// Cancellation handle for this call.
    pub cancellation : CancellationToken,
    /// Optional cache key prefix; presence of `Some` enables cache routing.
    pub cache_namespace : Option< String >,
    /// Whether to suppress cookie-parse errors rather than failing the call.
    pub ignore_invalid_cookies : bool,
  }

  impl Options
  {
    /// Build the minimal normalized options for one `method`/`url` pair,
    /// with every other field at its documented default.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::UnsupportedProtocol` if the URL scheme is
    /// neither `http` nor `https`, or `EngineError::InvalidArgument` for a
    /// `GET`/`HEAD` with a body when `allow_get_body` is false.
    pub fn new( method : &str, url : Url ) -> Result< Self >
    {
      crate::url::require_http_scheme( &url )?;
      Ok( Self
      {
        url,
        method : method.to_ascii_uppercase(),
        headers : HashMap::new(),
        body : None,
        allow_get_body : false,
        decompress : true,
        follow_redirect : true,
        max_redirects : 10,
        method_rewriting : true,
        response_type : ResponseType::default(),
        resolve_body_only : false,
        encoding : "utf-8".into(),
        throw_http_errors : true,
        timeout : TimeoutConfig::default(),
        retry : RetryOptions::default(),
        hooks : Hooks::default(),
        cancellation : CancellationToken::new(),
        cache_namespace : None,
        ignore_invalid_cookies : false,
      } )
    }

    /// Set the request body, rejecting a body on `GET`/`HEAD` unless
    /// `allow_get_body` has been set, and enforcing the "exactly one body
    /// encoding" invariant by always replacing (never combining) the body.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidArgument` if the method disallows a body.
    pub fn with_body( mut self, body : Body ) -> Result< Self >
    {
      if matches!( self.method.as_str(), "GET" | "HEAD" ) && !self.allow_get_body
      {
        return Err( EngineError::InvalidArgument( format!(
          "{} requests may not carry a body unless allow_get_body is set", self.method
        ) ) );
      }
      self.body = Some( body );
      Ok( self )
    }

    /// Insert or delete (via `None`) a header. Lower-cases the key, matching
    /// the normalization rule.
    #[ must_use ]
    pub fn header( mut self, name : &str, value : Option< &str > ) -> Self
    {
      let key = name.to_ascii_lowercase();
      match value
      {
        Some( v ) => { self.headers.insert( key, v.to_string() ); }
        None => { self.headers.remove( &key ); }
      }
      self
    }

    /// Set a URL relative to this instance's URL (for prefix-URL style use);
    /// the caller is expected to have validated the relative/absolute rule
    /// via `crate::url::join_prefix_url` beforehand.
    #[ must_use ]
    pub fn with_url( mut self, url : Url ) -> Self
    {
      self.url = url;
      self
    }

    /// Merge `overlay` onto `self` following §4.1's per-field precedence
    /// rules : headers (overlay wins, `None` deletes), hook lists
    /// (concatenated, never replaced), retry method/status sets (union
    /// unless overlay is non-empty and explicitly replaces), everything else
    /// (overlay wins).
    #[ must_use ]
    pub fn merge( mut self, overlay : OptionsOverlay ) -> Self
    {
      if let Some( url ) = overlay.url
      {
        self.url = url;
      }
      if let Some( method ) = overlay.method
      {
        self.method = method.to_ascii_uppercase();
      }
      for ( key, value ) in overlay.headers
      {
        let key = key.to_ascii_lowercase();
        match value
        {
          Some( v ) => { self.headers.insert( key, v ); }
          None => { self.headers.remove( &key ); }
        }
      }
      if let Some( body ) = overlay.body
      {
        self.body = body;
      }
      if let Some( v ) = overlay.decompress { self.decompress = v; }
      if let Some( v ) = overlay.follow_redirect { self.follow_redirect = v; }
      if let Some( v ) = overlay.max_redirects { self.max_redirects = v; }
      if let Some( v ) = overlay.response_type { self.response_type = v; }
      if let Some( v ) = overlay.resolve_body_only { self.resolve_body_only = v; }
      if let Some( v ) = overlay.throw_http_errors { self.throw_http_errors = v; }
      if let Some( retry ) = overlay.retry { self.retry = retry; }

      self.hooks.init.extend( overlay.hooks.init );
      self.hooks.before_request.extend( overlay.hooks.before_request );
      self.hooks.before_redirect.extend( overlay.hooks.before_redirect );
      self.hooks.before_retry.extend( overlay.hooks.before_retry );
      self.hooks.before_error.extend( overlay.hooks.before_error );
      self.hooks.after_response.extend( overlay.hooks.after_response );

      self
    }
  }

  /// A partial set of overrides applied on top of an existing `Options` via
  /// `Options::merge`. Every field is optional; absence means "keep base".
  #[ derive( Default ) ]
  pub struct OptionsOverlay
  {
    /// Replacement URL.
    pub url : Option< Url >,
    /// Replacement method.
    pub method : Option< String >,
    /// Header overrides (`None` value deletes the header).
    pub headers : Vec< ( String, Option< String > ) >,
    /// Replacement body.
    pub body : Option< Option< Body > >,
    /// Replacement decompress flag.
    pub decompress : Option< bool >,
    /// Replacement follow-redirect flag.
    pub follow_redirect : Option< bool >,
    /// Replacement max-redirects.
    pub max_redirects : Option< usize >,
    /// Replacement response type.
    pub response_type : Option< ResponseType >,
    /// Replacement resolve-body-only flag.
    pub resolve_body_only : Option< bool >,
    /// Replacement throw-http-errors flag.
    pub throw_http_errors : Option< bool >,
    /// Replacement retry policy.
    pub retry : Option< RetryOptions >,
    /// Additional hooks to append.
    pub hooks : Hooks,
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn new_rejects_non_http_scheme()
    {
      let url = Url::parse( "ftp://example.com" ).unwrap();
      assert!( Options::new( "GET", url ).is_err() );
    }

    #[ test ]
    fn body_on_get_requires_allow_get_body()
    {
      let url = Url::parse( "https://example.com" ).unwrap();
      let options = Options::new( "GET", url ).unwrap();
      let err = options.with_body( Body::Bytes( vec![ 1 ] ) );
      assert!( err.is_err() );
    }

    #[ test ]
    fn merge_overlay_header_wins_and_none_deletes()
    {
      let url = Url::parse( "https://example.com" ).unwrap();
      let base = Options::new( "GET", url ).unwrap().header( "x-a", Some( "1" ) ).header( "x-b", Some( "2" ) );

      let overlay = OptionsOverlay
      {
        headers : vec![ ( "x-a".into(), Some( "9".into() ) ), ( "x-b".into(), None ) ],
        ..Default::default()
      };
      let merged = base.merge( overlay );

      assert_eq!( merged.headers.get( "x-a" ).map( String::as_str ), Some( "9" ) );
      assert_eq!( merged.headers.get( "x-b" ), None );
    }

    #[ test ]
    fn merge_concatenates_hook_lists_never_replaces()
    {
      let url = Url::parse( "https://example.com" ).unwrap();
      let mut base = Options::new( "GET", url ).unwrap();
      base.hooks.before_error.push( Arc::new( | e | e ) );

      let mut overlay = OptionsOverlay::default();
      overlay.hooks.before_error.push( Arc::new( | e | e ) );

      let merged = base.merge( overlay );
      assert_eq!( merged.hooks.before_error.len(), 2 );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    Options,
    OptionsOverlay,
    Body,
    ResponseType,
    RetryOptions,
    CalculateDelay,
    Hooks,
    AsyncHook,
  };
}
