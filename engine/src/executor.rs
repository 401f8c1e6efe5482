// src/executor.rs
//! The single-attempt executor (§4.4): one call through the hook chain,
//! transport, cache, cookie jar, decompression and redirect-following loop.
//! Retrying a failed attempt is the orchestrator's job, not this module's.

mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;
  use std::time::Instant;

  use crate::error::{ EngineError, Result, TimeoutEvent };
  use crate::options::{ Options, Body, ResponseType };
  use crate::response::{ Response, Timings };
  use crate::transport::{ Transport, TransportRequest, TransportResponse };
  use crate::timeout::{ TimeoutConfig, Watchdog };
  use crate::cancel::with_cancellation;
  use crate::progress::{ ProgressMeter, Direction };
  use crate::events::{ EventSender, Event };

  #[ cfg( feature = "cache" ) ]
  use crate::cache::{ CacheAdapter, is_cacheable, freshness_ttl };
  #[ cfg( feature = "cookies" ) ]
  use crate::cookie_jar::CookieJar;
  #[ cfg( feature = "compression" ) ]
  use crate::decompress::{ self, Codec };

  /// Everything the executor needs beyond the normalized `Options`: the
  /// transport to call, the optional cache/cookie adapters, and the event
  /// sink for this call. Cheap to clone; a `Client` holds one and clones it
  /// into every call it starts.
  #[ derive( Clone ) ]
  pub struct ExecutorContext
  {
    /// Transport used for every attempt.
    pub transport : Arc< dyn Transport >,
    /// Cache adapter, consulted only when `options.cache_namespace` is set.
    #[ cfg( feature = "cache" ) ]
    pub cache : Option< Arc< dyn CacheAdapter > >,
    /// Cookie jar, consulted on every request/response when present.
    #[ cfg( feature = "cookies" ) ]
    pub cookie_jar : Option< Arc< dyn CookieJar > >,
    /// Event sink for `Request`/`Response`/`Redirect`/progress events.
    pub events : EventSender,
  }

  /// Run one logical attempt to completion, including any redirect hops
  /// `options.follow_redirect` permits. Does not retry.
  ///
  /// # Errors
  ///
  /// Returns `EngineError::Timeout`, `EngineError::MaxRedirects`,
  /// `EngineError::Cancel`, `EngineError::Http` (when `throw_http_errors` is
  /// set and the final status is not 2xx/304), or a transport/parse error.
  pub async fn execute( options : &Options, ctx : &ExecutorContext ) -> Result< Response >
  {
    let _span = tracing::debug_span!( "attempt", method = %options.method, url = %options.url ).entered();

    if let Some( cached ) = cache_lookup( ctx, options ).await
    {
      return Ok( cached );
    }

    let started = Instant::now();
    let mut current_url = options.url.clone();
    let mut current_method = options.method.clone();
    let mut current_body = options.body.clone();
    let mut current_headers = options.headers.clone();
    let mut redirect_urls = Vec::new();

    loop
    {
      let mut hooked = options.clone();
      hooked.url = current_url.clone();
      hooked.method = current_method.clone();
      hooked.body = current_body.clone();
      hooked.headers = current_headers.clone();
      for hook in &options.hooks.before_request
      {
        hooked = ( hook )( hooked ).await?;
      }

      let ( body_bytes, content_type ) = prepare_body( &hooked.body )?;
      let mut headers = hooked.headers.clone();
      if let Some( ( key, value ) ) = content_type
      {
        headers.entry( key ).or_insert( value );
      }
      if let Some( header ) = cookie_header( ctx, &hooked.url ).await
      {
        headers.insert( "cookie".into(), header );
      }

      ctx.events.emit( Event::Request { method : hooked.method.clone(), url : hooked.url.to_string() } );

      let upload_total = body_bytes.as_ref().map( | b | b.len() as u64 );
      let upload_meter = ProgressMeter::new( Direction::Upload, upload_total, ctx.events.clone_sender() );

      let watchdog = Watchdog::new( hooked.timeout, hooked.cancellation.clone() );
      let handles = watchdog.arm_all();

      let request = TransportRequest
      {
        method : hooked.method.clone(),
        url : hooked.url.to_string(),
        headers,
        body : body_bytes,
        connect_timeout : hooked.timeout.connect,
      };

      let outcome = with_cancellation( &hooked.cancellation, || ctx.transport.call( request ) ).await;
      upload_meter.finish();
      Watchdog::disarm( handles );

      let transport_response = match outcome
      {
        None if watchdog.has_fired() =>
        {
          let event = watchdog.fired_event().unwrap_or( TimeoutEvent::Request );
          return Err( EngineError::Timeout { event, threshold_ms : threshold_ms( &hooked.timeout, event ) } );
        }
        None => return Err( EngineError::Cancel ),
        Some( result ) => result?,
      };

      record_cookies( ctx, &hooked.url, &transport_response ).await;

      if let Some( location ) = redirect_location( &hooked, &transport_response )
      {
        if redirect_urls.len() >= hooked.max_redirects
        {
          return Err( EngineError::MaxRedirects { limit : hooked.max_redirects, last_url : hooked.url.to_string() } );
        }

        let next_url = hooked.url.join( &location ).map_err( EngineError::from )?;
        let response_so_far = to_response( &hooked, &transport_response, &redirect_urls, started );
        tracing::trace!( from = %hooked.url, to = %next_url, status = transport_response.status, "redirect" );
        ctx.events.emit( Event::Redirect { from : Box::new( response_so_far.clone() ), to : next_url.to_string() } );

        for hook in &options.hooks.before_redirect
        {
          hooked = ( hook )( hooked ).await?;
        }

        redirect_urls.push( hooked.url.to_string() );
        current_headers = hooked.headers.clone();
        if hooked.url.host_str() != next_url.host_str()
        {
          current_headers.remove( "cookie" );
        }
        if ( transport_response.status == 303 || !hooked.method_rewriting ) && !matches!( hooked.method.as_str(), "GET" | "HEAD" )
        {
          current_method = "GET".into();
          current_body = None;
        }
        else
        {
          current_method = hooked.method.clone();
          current_body = hooked.body.clone();
        }
        current_url = next_url;
        continue;
      }

      let download_total = content_length( &transport_response );
      let download_meter = ProgressMeter::new( Direction::Download, download_total, ctx.events.clone_sender() );
      download_meter.advance( transport_response.body.len() as u64 );
      download_meter.finish();

      let decompressed = decompress_if_needed( &hooked, transport_response ).await?;
      let mut response = to_response( &hooked, &decompressed, &redirect_urls, started );

      ctx.events.emit( Event::Response( Box::new( response.clone() ) ) );

      maybe_cache_store( ctx, &hooked, &response ).await;

      if hooked.throw_http_errors && !response.is_success() && response.status_code != 304
      {
        tracing::error!( status = response.status_code, url = %hooked.url, "terminal http error" );
        return Err( EngineError::Http { status : response.status_code, response : Box::new( response ) } );
      }

      return Ok( response );
    }
  }

  fn threshold_ms( config : &TimeoutConfig, event : TimeoutEvent ) -> u64
  {
    let duration = match event
    {
      TimeoutEvent::Request => config.request,
      TimeoutEvent::Socket => config.socket,
      TimeoutEvent::Lookup => config.lookup,
      TimeoutEvent::Connect => config.connect,
      TimeoutEvent::SecureConnect => config.secure_connect,
      TimeoutEvent::Send => config.send,
      TimeoutEvent::Response => config.response,
    };
    duration.map_or( 0, | d | d.as_millis() as u64 )
  }

  fn prepare_body( body : &Option< Body > ) -> Result< ( Option< Vec< u8 > >, Option< ( String, String ) > ) >
  {
    match body
    {
      None => Ok( ( None, None ) ),
      Some( Body::Bytes( bytes ) ) => Ok( ( Some( bytes.clone() ), None ) ),
      Some( Body::Form( pairs ) ) =>
      {
        let encoded = pairs
          .iter()
          .map( | ( k, v ) | format!( "{}={}", urlencoding::encode( k ), urlencoding::encode( v ) ) )
          .collect::< Vec< _ > >()
          .join( "&" );
        Ok( ( Some( encoded.into_bytes() ), Some( ( "content-type".into(), "application/x-www-form-urlencoded".into() ) ) ) )
      }
      Some( Body::Json( value ) ) =>
      {
        let encoded = serde_json::to_vec( value )?;
        Ok( ( Some( encoded ), Some( ( "content-type".into(), "application/json".into() ) ) ) )
      }
    }
  }

  fn redirect_location( options : &Options, response : &TransportResponse ) -> Option< String >
  {
    if !options.follow_redirect || !( 300..400 ).contains( &response.status )
    {
      return None;
    }
    response.headers.iter().find( | ( k, _ ) | k.eq_ignore_ascii_case( "location" ) ).map( | ( _, v ) | v.clone() )
  }

  fn content_length( response : &TransportResponse ) -> Option< u64 >
  {
    response
      .headers
      .iter()
      .find( | ( k, _ ) | k.eq_ignore_ascii_case( "content-length" ) )
      .and_then( | ( _, v ) | v.parse().ok() )
  }

  fn to_response( options : &Options, response : &TransportResponse, redirect_urls : &[ String ], started : Instant ) -> Response
  {
    Response
    {
      status_code : response.status,
      status_message : response.status_message.clone(),
      headers : response.headers.iter().map( | ( k, v ) | ( k.to_ascii_lowercase(), v.clone() ) ).collect(),
      body : response.body.clone(),
      url : response.url.clone(),
      request_url : options.url.to_string(),
      redirect_urls : redirect_urls.to_vec(),
      retry_count : 0,
      timings : Timings { total : Some( started.elapsed() ), ..Timings::default() },
      ip : response.remote_addr.clone(),
      is_from_cache : false,
    }
  }

  #[ cfg( feature = "compression" ) ]
  async fn decompress_if_needed( options : &Options, mut response : TransportResponse ) -> Result< TransportResponse >
  {
    if !options.decompress
    {
      return Ok( response );
    }
    let Some( ( key, value ) ) = response.headers.iter().find( | ( k, _ ) | k.eq_ignore_ascii_case( "content-encoding" ) ).map( | ( k, v ) | ( k.clone(), v.clone() ) )
    else
    {
      return Ok( response );
    };
    let Some( codec ) = Codec::from_header( &value ) else { return Ok( response ) };

    response.body = match codec
    {
      Codec::Zstd =>
      {
        use tokio::io::AsyncReadExt;
        let cursor = std::io::Cursor::new( response.body.clone() );
        let mut decoder = async_compression::tokio::bufread::ZstdDecoder::new( tokio::io::BufReader::new( cursor ) );
        let mut out = Vec::new();
        decoder.read_to_end( &mut out ).await.map_err( | e | EngineError::Read( e.to_string() ) )?;
        out
      }
      other => decompress::decompress( other, &response.body )?,
    };
    response.headers.remove( &key );
    Ok( response )
  }

  #[ cfg( not( feature = "compression" ) ) ]
  async fn decompress_if_needed( _options : &Options, response : TransportResponse ) -> Result< TransportResponse >
  {
    Ok( response )
  }

  #[ cfg( feature = "cache" ) ]
  async fn cache_lookup( ctx : &ExecutorContext, options : &Options ) -> Option< Response >
  {
    let cache = ctx.cache.as_ref()?;
    let namespace = options.cache_namespace.as_ref()?;
    if !matches!( options.method.as_str(), "GET" | "HEAD" )
    {
      return None;
    }
    let key = format!( "{namespace}:{}:{}", options.method, options.url );
    match cache.get( &key ).await
    {
      Some( mut response ) =>
      {
        tracing::trace!( %key, "cache hit" );
        response.is_from_cache = true;
        Some( response )
      }
      None =>
      {
        tracing::trace!( %key, "cache miss" );
        None
      }
    }
  }

  #[ cfg( not( feature = "cache" ) ) ]
  async fn cache_lookup( _ctx : &ExecutorContext, _options : &Options ) -> Option< Response >
  {
    None
  }

  #[ cfg( feature = "cache" ) ]
  async fn maybe_cache_store( ctx : &ExecutorContext, options : &Options, response : &Response )
  {
    let Some( cache ) = ctx.cache.as_ref() else { return };
    let Some( namespace ) = &options.cache_namespace else { return };
    if !is_cacheable( &options.method, response )
    {
      return;
    }
    let key = format!( "{namespace}:{}:{}", options.method, options.url );
    let ttl = freshness_ttl( response, core::time::Duration::from_secs( 300 ) );
    cache.put( &key, response.clone(), ttl ).await;
  }

  #[ cfg( not( feature = "cache" ) ) ]
  async fn maybe_cache_store( _ctx : &ExecutorContext, _options : &Options, _response : &Response ) {}

  #[ cfg( feature = "cookies" ) ]
  async fn cookie_header( ctx : &ExecutorContext, url : &url::Url ) -> Option< String >
  {
    let jar = ctx.cookie_jar.as_ref()?;
    jar.cookie_header( url.host_str()? ).await
  }

  #[ cfg( not( feature = "cookies" ) ) ]
  async fn cookie_header( _ctx : &ExecutorContext, _url : &url::Url ) -> Option< String >
  {
    None
  }

  #[ cfg( feature = "cookies" ) ]
  async fn record_cookies( ctx : &ExecutorContext, url : &url::Url, response : &TransportResponse )
  {
    let Some( jar ) = ctx.cookie_jar.as_ref() else { return };
    let Some( host ) = url.host_str() else { return };
    for ( key, value ) in &response.headers
    {
      if key.eq_ignore_ascii_case( "set-cookie" )
      {
        let _ = jar.set_cookie( value, host ).await;
      }
    }
  }

  #[ cfg( not( feature = "cookies" ) ) ]
  async fn record_cookies( _ctx : &ExecutorContext, _url : &url::Url, _response : &TransportResponse ) {}

  impl EventSender
  {
    /// Cheap clone used to hand a sender to a short-lived progress meter.
    pub( crate ) fn clone_sender( &self ) -> Self
    {
      self.clone()
    }
  }

  /// Parse a response body as JSON or text per `options.response_type`, used
  /// by the promise call surface after the executor returns.
  ///
  /// # Errors
  ///
  /// Returns `EngineError::Parse` if `response_type` is `Json` and the body
  /// fails to deserialize.
  pub fn parse_response_type( response_type : ResponseType, body : &[ u8 ] ) -> Result< serde_json::Value >
  {
    match response_type
    {
      ResponseType::Json =>
      {
        serde_json::from_slice( body ).map_err( | e | crate::error::map_deserialization_error( &e ) )
      }
      ResponseType::Text =>
      {
        Ok( serde_json::Value::String( String::from_utf8_lossy( body ).into_owned() ) )
      }
      ResponseType::Default | ResponseType::Buffer =>
      {
        Ok( serde_json::Value::String( String::from_utf8_lossy( body ).into_owned() ) )
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use std::pin::Pin;
    use std::future::Future;
    use std::sync::{ Arc, Mutex };

    struct StubTransport
    {
      responses : Mutex< Vec< TransportResponse > >,
    }

    impl Transport for StubTransport
    {
      fn call( &self, _request : TransportRequest ) -> Pin< Box< dyn Future< Output = Result< TransportResponse > > + Send > >
      {
        let response = self.responses.lock().unwrap().remove( 0 );
        Box::pin( async move { Ok( response ) } )
      }
    }

    fn ok_response() -> TransportResponse
    {
      TransportResponse
      {
        status : 200,
        status_message : Some( "OK".into() ),
        headers : HashMap::new(),
        body : b"hello".to_vec(),
        url : "https://example.com/".into(),
        remote_addr : None,
      }
    }

    #[ tokio::test ]
    async fn executes_a_plain_get_successfully()
    {
      let options = Options::new( "GET", url::Url::parse( "https://example.com/" ).unwrap() ).unwrap();
      let transport = StubTransport { responses : Mutex::new( vec![ ok_response() ] ) };
      let ( tx, _rx ) = crate::events::channel();
      let ctx = ExecutorContext
      {
        transport : Arc::new( transport ),
        #[ cfg( feature = "cache" ) ] cache : None,
        #[ cfg( feature = "cookies" ) ] cookie_jar : None,
        events : tx,
      };
      let response = execute( &options, &ctx ).await.unwrap();
      assert_eq!( response.status_code, 200 );
      assert_eq!( response.body, b"hello" );
    }

    #[ tokio::test ]
    async fn follows_a_single_redirect_and_records_the_hop()
    {
      let mut redirected = ok_response();
      redirected.status = 301;
      redirected.headers.insert( "location".into(), "/next".into() );

      let options = Options::new( "GET", url::Url::parse( "https://example.com/" ).unwrap() ).unwrap();
      let transport = StubTransport { responses : Mutex::new( vec![ redirected, ok_response() ] ) };
      let ( tx, _rx ) = crate::events::channel();
      let ctx = ExecutorContext
      {
        transport : Arc::new( transport ),
        #[ cfg( feature = "cache" ) ] cache : None,
        #[ cfg( feature = "cookies" ) ] cookie_jar : None,
        events : tx,
      };
      let response = execute( &options, &ctx ).await.unwrap();
      assert_eq!( response.redirect_urls.len(), 1 );
      assert_eq!( response.status_code, 200 );
    }

    #[ tokio::test ]
    async fn downgrades_to_get_on_303_and_drops_the_body()
    {
      let mut redirected = ok_response();
      redirected.status = 303;
      redirected.headers.insert( "location".into(), "/confirm".into() );

      let options = Options::new( "POST", url::Url::parse( "https://example.com/" ).unwrap() ).unwrap()
        .with_body( Body::Bytes( b"payload".to_vec() ) ).unwrap();
      let transport = StubTransport { responses : Mutex::new( vec![ redirected, ok_response() ] ) };
      let ( tx, _rx ) = crate::events::channel();
      let ctx = ExecutorContext
      {
        transport : Arc::new( transport ),
        #[ cfg( feature = "cache" ) ] cache : None,
        #[ cfg( feature = "cookies" ) ] cookie_jar : None,
        events : tx,
      };
      let response = execute( &options, &ctx ).await.unwrap();
      assert_eq!( response.status_code, 200 );
    }

    #[ tokio::test ]
    async fn non_2xx_status_is_a_http_error_when_throw_http_errors_is_set()
    {
      let mut failing = ok_response();
      failing.status = 500;

      let options = Options::new( "GET", url::Url::parse( "https://example.com/" ).unwrap() ).unwrap();
      let transport = StubTransport { responses : Mutex::new( vec![ failing ] ) };
      let ( tx, _rx ) = crate::events::channel();
      let ctx = ExecutorContext
      {
        transport : Arc::new( transport ),
        #[ cfg( feature = "cache" ) ] cache : None,
        #[ cfg( feature = "cookies" ) ] cookie_jar : None,
        events : tx,
      };
      let error = execute( &options, &ctx ).await.unwrap_err();
      assert!( matches!( error, EngineError::Http { status : 500, .. } ) );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    ExecutorContext,
    execute,
    parse_response_type,
  };
}
