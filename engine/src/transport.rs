// src/transport.rs
//! The transport boundary (§6) : the engine calls only this trait, never
//! `reqwest` directly, so an alternate transport can be substituted in tests
//! or embedders.

mod private
{
  use std::pin::Pin;
  use std::future::Future;
  use std::collections::HashMap;
  use core::time::Duration;

  use crate::error::{ EngineError, Result };

  /// One outgoing request as the transport boundary sees it.
  #[ derive( Debug, Clone ) ]
  pub struct TransportRequest
  {
    /// Upper-case HTTP method.
    pub method : String,
    /// Fully resolved URL.
    pub url : String,
    /// Request headers.
    pub headers : HashMap< String, String >,
    /// Request body bytes, if any.
    pub body : Option< Vec< u8 > >,
    /// Overall connect timeout for this attempt, if configured.
    pub connect_timeout : Option< Duration >,
  }

  /// One received response as the transport boundary sees it.
  #[ derive( Debug, Clone ) ]
  pub struct TransportResponse
  {
    /// HTTP status code.
    pub status : u16,
    /// HTTP reason phrase, if available.
    pub status_message : Option< String >,
    /// Response headers, as received (not yet lower-cased by the caller).
    pub headers : HashMap< String, String >,
    /// Full response body, already drained.
    pub body : Vec< u8 >,
    /// Final URL, after the transport's own redirect handling (the engine
    /// disables transport-level redirect following and does its own, so this
    /// is normally equal to the request URL).
    pub url : String,
    /// Remote peer address, if known.
    pub remote_addr : Option< String >,
  }

  /// A pluggable HTTP transport. The default, production implementation
  /// (`ReqwestTransport`) wraps `reqwest`; test code can substitute a fake.
  pub trait Transport : Send + Sync
  {
    /// Perform one HTTP request and return its response.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Request` (or a timeout/protocol variant) on
    /// failure to obtain a response at all. Non-2xx status codes are not
    /// errors at this layer — that classification happens in the executor.
    fn call( &self, request : TransportRequest )
      -> Pin< Box< dyn Future< Output = Result< TransportResponse > > + Send > >;
  }

  /// `reqwest`-backed transport. Redirect-following is always disabled here —
  /// the engine's single-attempt executor implements redirect resolution
  /// itself (§4.4 step 6) so it can apply method-rewriting and hook rules.
  #[ derive( Debug, Clone ) ]
  pub struct ReqwestTransport
  {
    client : reqwest::Client,
  }

  impl ReqwestTransport
  {
    /// Build a transport from an already-configured `reqwest::Client`.
    /// Callers are responsible for disabling the client's own redirect
    /// policy (`reqwest::redirect::Policy::none()`).
    #[ must_use ]
    pub fn new( client : reqwest::Client ) -> Self
    {
      Self { client }
    }

    /// Build a transport with the engine's recommended defaults : no
    /// transport-level redirects, a generous connection pool, TCP keepalive.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidArgument` if the underlying client fails
    /// to build (e.g. a malformed TLS configuration).
    pub fn with_defaults() -> Result< Self >
    {
      let client = reqwest::Client::builder()
        .redirect( reqwest::redirect::Policy::none() )
        .pool_max_idle_per_host( 10 )
        .pool_idle_timeout( Duration::from_secs( 90 ) )
        .tcp_keepalive( Duration::from_secs( 60 ) )
        .build()
        .map_err( EngineError::from )?;
      Ok( Self::new( client ) )
    }
  }

  impl Transport for ReqwestTransport
  {
    fn call( &self, request : TransportRequest )
      -> Pin< Box< dyn Future< Output = Result< TransportResponse > > + Send > >
    {
      let client = self.client.clone();
      Box::pin( async move
      {
        let method = reqwest::Method::from_bytes( request.method.as_bytes() )
          .map_err( | e | EngineError::InvalidArgument( e.to_string() ) )?;

        let mut builder = client.request( method, &request.url );
        for ( key, value ) in &request.headers
        {
          builder = builder.header( key, value );
        }
        if let Some( body ) = request.body
        {
          builder = builder.body( body );
        }
        if let Some( timeout ) = request.connect_timeout
        {
          builder = builder.timeout( timeout );
        }

        let response = builder.send().await.map_err( EngineError::from )?;

        let status = response.status().as_u16();
        let status_message = response.status().canonical_reason().map( ToString::to_string );
        let url = response.url().to_string();
        let remote_addr = response.remote_addr().map( | a | a.to_string() );
        let headers = response
          .headers()
          .iter()
          .map( | ( k, v ) | ( k.to_string(), v.to_str().unwrap_or_default().to_string() ) )
          .collect();
        let body = response.bytes().await.map_err( EngineError::from )?.to_vec();

        Ok( TransportResponse { status, status_message, headers, body, url, remote_addr } )
      } )
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    Transport,
    TransportRequest,
    TransportResponse,
    ReqwestTransport,
  };
}
