// src/client.rs
//! The `Client` entry point: builder configuration plus thin per-method
//! request helpers, merged into one file rather than split across several
//! (this engine has no provider-specific surface large enough to warrant it).

mod private
{
  use std::sync::Arc;

  use crate::call::Call;
  use crate::error::Result;
  use crate::events::channel;
  use crate::executor::ExecutorContext;
  use crate::options::{ Body, Options, RetryOptions };
  use crate::pagination::{ PaginationConfig, PaginationIterator };
  use crate::stream_call::StreamCall;
  use crate::timeout::TimeoutConfig;
  use crate::transport::{ ReqwestTransport, Transport };
  use crate::url::join_prefix_url;

  #[ cfg( feature = "cache" ) ]
  use crate::cache::CacheAdapter;
  #[ cfg( feature = "cookies" ) ]
  use crate::cookie_jar::CookieJar;

  /// A configured HTTP client: an immutable transport plus optional cache
  /// and cookie jar, and a prefix URL/default options baseline every call is
  /// built from. Cheap to clone (everything inside is `Arc`-shared).
  #[ derive( Clone ) ]
  pub struct Client
  {
    transport : Arc< dyn Transport >,
    #[ cfg( feature = "cache" ) ]
    cache : Option< Arc< dyn CacheAdapter > >,
    #[ cfg( feature = "cookies" ) ]
    cookie_jar : Option< Arc< dyn CookieJar > >,
    prefix_url : Option< url::Url >,
    default_headers : Vec< ( String, String ) >,
    default_timeout : TimeoutConfig,
    default_retry : RetryOptions,
  }

  impl Client
  {
    /// Build a client with the engine's default `reqwest`-backed transport.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidArgument` if the underlying transport
    /// fails to build.
    pub fn new() -> Result< Self >
    {
      Ok( Self::with_transport( Arc::new( ReqwestTransport::with_defaults()? ) ) )
    }

    /// Build a client around a caller-supplied transport, e.g. a fake for tests.
    #[ must_use ]
    pub fn with_transport( transport : Arc< dyn Transport > ) -> Self
    {
      Self
      {
        transport,
        #[ cfg( feature = "cache" ) ] cache : None,
        #[ cfg( feature = "cookies" ) ] cookie_jar : None,
        prefix_url : None,
        default_headers : Vec::new(),
        default_timeout : TimeoutConfig::default(),
        default_retry : RetryOptions::default(),
      }
    }

    /// Attach a cache adapter consulted for every call that sets a cache namespace.
    #[ cfg( feature = "cache" ) ]
    #[ must_use ]
    pub fn with_cache( mut self, cache : Arc< dyn CacheAdapter > ) -> Self
    {
      self.cache = Some( cache );
      self
    }

    /// Attach a cookie jar consulted on every request/response.
    #[ cfg( feature = "cookies" ) ]
    #[ must_use ]
    pub fn with_cookie_jar( mut self, cookie_jar : Arc< dyn CookieJar > ) -> Self
    {
      self.cookie_jar = Some( cookie_jar );
      self
    }

    /// Resolve every relative path against `prefix` instead of requiring an
    /// absolute URL per call.
    #[ must_use ]
    pub fn with_prefix_url( mut self, prefix : url::Url ) -> Self
    {
      self.prefix_url = Some( prefix );
      self
    }

    /// Set a header sent with every request this client issues.
    #[ must_use ]
    pub fn with_default_header( mut self, name : &str, value : &str ) -> Self
    {
      self.default_headers.push( ( name.to_string(), value.to_string() ) );
      self
    }

    /// Override the default per-milestone timeout budgets.
    #[ must_use ]
    pub fn with_timeout( mut self, timeout : TimeoutConfig ) -> Self
    {
      self.default_timeout = timeout;
      self
    }

    /// Override the default retry policy.
    #[ must_use ]
    pub fn with_retry( mut self, retry : RetryOptions ) -> Self
    {
      self.default_retry = retry;
      self
    }

    /// Build normalized `Options` for `method`/`path`, applying this
    /// client's prefix URL, default headers, timeout and retry policy.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidArgument` for a malformed or
    /// prefix-incompatible path; see `join_prefix_url`.
    pub fn request( &self, method : &str, path : &str ) -> Result< Options >
    {
      let url = join_prefix_url( self.prefix_url.as_ref(), path )?;
      let mut options = Options::new( method, url )?;
      options.timeout = self.default_timeout;
      options.retry = self.default_retry.clone();
      for ( name, value ) in &self.default_headers
      {
        options = options.header( name, Some( value ) );
      }
      Ok( options )
    }

    /// `GET path`.
    pub fn get( &self, path : &str ) -> Result< Options > { self.request( "GET", path ) }
    /// `HEAD path`.
    pub fn head( &self, path : &str ) -> Result< Options > { self.request( "HEAD", path ) }
    /// `DELETE path`.
    pub fn delete( &self, path : &str ) -> Result< Options > { self.request( "DELETE", path ) }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidArgument` if `path` is invalid.
    pub fn post( &self, path : &str, body : Body ) -> Result< Options >
    {
      self.request( "POST", path )?.with_body( body )
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidArgument` if `path` is invalid.
    pub fn put( &self, path : &str, body : Body ) -> Result< Options >
    {
      self.request( "PUT", path )?.with_body( body )
    }

    /// `PATCH path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidArgument` if `path` is invalid.
    pub fn patch( &self, path : &str, body : Body ) -> Result< Options >
    {
      self.request( "PATCH", path )?.with_body( body )
    }

    /// Start `options` as a cancellable promise-style call.
    #[ must_use ]
    pub fn call( &self, options : Options ) -> Call
    {
      let ( events, receiver ) = channel();
      Call::new( options, self.executor_context( events ), receiver )
    }

    /// Start `options` as a duplex-stream call.
    #[ must_use ]
    pub fn stream( &self, options : Options ) -> StreamCall
    {
      let ( events, receiver ) = channel();
      StreamCall::new( options, self.executor_context( events ), receiver )
    }

    /// Begin a lazy pagination sequence over repeated calls from `options`.
    #[ must_use ]
    pub fn paginate( &self, options : Options, config : PaginationConfig ) -> PaginationIterator
    {
      let ( events, _receiver ) = channel();
      PaginationIterator::new( options, self.executor_context( events ), config )
    }

    fn executor_context( &self, events : crate::events::EventSender ) -> ExecutorContext
    {
      ExecutorContext
      {
        transport : Arc::clone( &self.transport ),
        #[ cfg( feature = "cache" ) ] cache : self.cache.clone(),
        #[ cfg( feature = "cookies" ) ] cookie_jar : self.cookie_jar.clone(),
        events,
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::transport::{ TransportRequest, TransportResponse };
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;

    struct EchoTransport;

    impl Transport for EchoTransport
    {
      fn call( &self, request : TransportRequest ) -> Pin< Box< dyn Future< Output = Result< TransportResponse > > + Send > >
      {
        Box::pin( async move
        {
          Ok( TransportResponse
          {
            status : 200,
            status_message : Some( "OK".into() ),
            headers : HashMap::new(),
            body : request.url.into_bytes(),
            url : request.url,
            remote_addr : None,
          } )
        } )
      }
    }

    #[ test ]
    fn request_builder_resolves_against_prefix_url()
    {
      let client = Client::with_transport( Arc::new( EchoTransport ) )
        .with_prefix_url( url::Url::parse( "https://api.example.com/v1/" ).unwrap() );
      let options = client.get( "users/42" ).unwrap();
      assert_eq!( options.url.as_str(), "https://api.example.com/v1/users/42" );
    }

    #[ test ]
    fn default_headers_are_applied_to_every_request()
    {
      let client = Client::with_transport( Arc::new( EchoTransport ) )
        .with_default_header( "x-api-key", "secret" );
      let options = client.get( "https://example.com/" ).unwrap();
      assert_eq!( options.headers.get( "x-api-key" ).map( String::as_str ), Some( "secret" ) );
    }

    #[ tokio::test ]
    async fn call_round_trips_through_the_echo_transport()
    {
      let client = Client::with_transport( Arc::new( EchoTransport ) );
      let options = client.get( "https://example.com/ping" ).unwrap();
      let response = client.call( options ).await.unwrap();
      assert_eq!( response.body, b"https://example.com/ping" );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    Client,
  };
}
