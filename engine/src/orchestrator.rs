// src/orchestrator.rs
//! Drives the single-attempt executor to completion: retries failed
//! attempts per policy (§4.5), runs the `afterResponse` hook chain with
//! bounded `retryWithMergedOptions` recursion (§4.6), and gives
//! `beforeError` hooks the last word on a terminal failure.

mod private
{
  use crate::error::{ EngineError, Result };
  use crate::events::Event;
  use crate::executor::{ self, ExecutorContext };
  use crate::options::Options;
  use crate::response::Response;
  use crate::retry;

  /// `afterResponse` hooks may each trigger one merged re-request; nesting
  /// past this depth is treated as a misbehaving hook chain, not a retry
  /// budget, so it is not configurable.
  const AFTER_RESPONSE_MAX_DEPTH : u32 = 10;

  /// Run `options` to completion: attempt, retry on a retryable failure per
  /// `options.retry`, then resolve the `afterResponse` hook chain.
  ///
  /// # Errors
  ///
  /// Returns the final `EngineError` once retries are exhausted or the
  /// failure is not retryable, after running `beforeError` hooks over it.
  pub async fn run( options : Options, ctx : &ExecutorContext ) -> Result< Response >
  {
    let mut options = options;
    let mut attempt = 0u32;
    loop
    {
      match executor::execute( &options, ctx ).await
      {
        Ok( response ) =>
        {
          let mut response = response;
          response.retry_count = attempt;
          return resolve_after_response( options, ctx, response, 0 ).await;
        }
        Err( error ) =>
        {
          if options.cancellation.is_cancelled()
          {
            return Err( EngineError::Cancel );
          }

          let response_for_delay = match &error
          {
            EngineError::Http { response, .. } => Some( response.as_ref() ),
            _ => None,
          };

          if !retry::should_retry( &options.retry, &options.method, attempt + 1, &error )
          {
            let error = apply_before_error_hooks( &options, error );
            tracing::error!( url = %options.url, %error, "giving up, not retryable" );
            return Err( error );
          }

          let Some( delay ) = retry::compute_delay( &options.retry, attempt, &error, response_for_delay ) else
          {
            let error = apply_before_error_hooks( &options, error );
            tracing::error!( url = %options.url, %error, "giving up, no retry delay available" );
            return Err( error );
          };

          attempt += 1;
          tracing::warn!( url = %options.url, attempt, delay_ms = delay.as_millis() as u64, %error, "retrying" );
          ctx.events.emit( Event::Retry { attempt, delay_ms : delay.as_millis() as u64 } );

          for hook in options.hooks.before_retry.clone()
          {
            options = ( hook )( options ).await?;
          }

          tokio::select!
          {
            () = tokio::time::sleep( delay ) => {}
            () = options.cancellation.cancelled() => return Err( EngineError::Cancel ),
          }
        }
      }
    }
  }

  fn apply_before_error_hooks( options : &Options, error : EngineError ) -> EngineError
  {
    options.hooks.before_error.iter().fold( error, | error, hook | ( hook )( error ) )
  }

  async fn resolve_after_response( options : Options, ctx : &ExecutorContext, response : Response, depth : u32 ) -> Result< Response >
  {
    if depth >= AFTER_RESPONSE_MAX_DEPTH || options.hooks.after_response.is_empty()
    {
      return Ok( response );
    }

    for ( index, hook ) in options.hooks.after_response.iter().enumerate()
    {
      let merged = ( hook )( options.clone() ).await?;
      if options_request_changed( &options, &merged )
      {
        // retryWithMergedOptions: truncate the afterResponse chain to the
        // hooks before this one, so a hook can't re-trigger itself forever.
        let mut merged = merged;
        merged.hooks.after_response.truncate( index );
        merged.throw_http_errors = false;
        merged.resolve_body_only = false;
        merged.response_type = crate::options::ResponseType::Text;
        merged.retry.limit = 0;

        let retried = executor::execute( &merged, ctx ).await?;
        return Box::pin( resolve_after_response( merged, ctx, retried, depth + 1 ) ).await;
      }
    }

    Ok( response )
  }

  fn options_request_changed( before : &Options, after : &Options ) -> bool
  {
    before.url != after.url || before.method != after.method
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::options::Options;
    use crate::transport::{ Transport, TransportRequest, TransportResponse };
    use std::collections::HashMap;
    use std::pin::Pin;
    use std::future::Future;
    use std::sync::{ Arc, Mutex };

    struct ScriptedTransport
    {
      responses : Mutex< Vec< TransportResponse > >,
    }

    impl Transport for ScriptedTransport
    {
      fn call( &self, _request : TransportRequest ) -> Pin< Box< dyn Future< Output = Result< TransportResponse > > + Send > >
      {
        let response = self.responses.lock().unwrap().remove( 0 );
        Box::pin( async move { Ok( response ) } )
      }
    }

    fn response( status : u16 ) -> TransportResponse
    {
      TransportResponse
      {
        status,
        status_message : None,
        headers : HashMap::new(),
        body : vec![],
        url : "https://example.com/".into(),
        remote_addr : None,
      }
    }

    #[ tokio::test ]
    async fn retries_a_503_then_succeeds()
    {
      let options = Options::new( "GET", url::Url::parse( "https://example.com/" ).unwrap() ).unwrap();
      let transport = ScriptedTransport { responses : Mutex::new( vec![ response( 503 ), response( 200 ) ] ) };
      let ( tx, _rx ) = crate::events::channel();
      let ctx = ExecutorContext
      {
        transport : Arc::new( transport ),
        #[ cfg( feature = "cache" ) ] cache : None,
        #[ cfg( feature = "cookies" ) ] cookie_jar : None,
        events : tx,
      };
      let result = run( options, &ctx ).await.unwrap();
      assert_eq!( result.status_code, 200 );
      assert_eq!( result.retry_count, 1 );
    }

    #[ tokio::test ]
    async fn gives_up_after_retry_limit_is_exhausted()
    {
      let mut options = Options::new( "GET", url::Url::parse( "https://example.com/" ).unwrap() ).unwrap();
      options.retry.limit = 1;
      let transport = ScriptedTransport { responses : Mutex::new( vec![ response( 503 ), response( 503 ) ] ) };
      let ( tx, _rx ) = crate::events::channel();
      let ctx = ExecutorContext
      {
        transport : Arc::new( transport ),
        #[ cfg( feature = "cache" ) ] cache : None,
        #[ cfg( feature = "cookies" ) ] cookie_jar : None,
        events : tx,
      };
      let error = run( options, &ctx ).await.unwrap_err();
      assert!( matches!( error, EngineError::Http { status : 503, .. } ) );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    run,
  };
}
