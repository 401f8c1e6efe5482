// src/call.rs
//! The promise-style call surface : a `Call` resolves to one `Response` (or
//! fails), can be cancelled from outside, and exposes its lifecycle events.

mod private
{
  use std::pin::Pin;
  use std::future::Future;
  use std::task::{ Context, Poll };

  use crate::cancel::CancellationToken;
  use crate::error::Result;
  use crate::events::EventReceiver;
  use crate::executor::ExecutorContext;
  use crate::options::Options;
  use crate::orchestrator;
  use crate::response::Response;

  /// A single in-flight (or completed) request. Implements `Future` so it
  /// can be `.await`ed directly; `cancel` and `events` work independently of
  /// polling it to completion.
  pub struct Call
  {
    inner : Pin< Box< dyn Future< Output = Result< Response > > + Send > >,
    cancellation : CancellationToken,
    events : EventReceiver,
  }

  impl Call
  {
    /// Start running `options` against `ctx`. The call begins progressing
    /// only once this `Call` (or its inner future) is polled — there is no
    /// background task here, matching the executor's single-task model.
    #[ must_use ]
    pub fn new( options : Options, ctx : ExecutorContext, events : EventReceiver ) -> Self
    {
      let cancellation = options.cancellation.clone();
      let inner = Box::pin( async move { orchestrator::run( options, &ctx ).await } );
      Self { inner, cancellation, events }
    }

    /// Request cancellation of this call. Idempotent; has no effect once the
    /// call has already resolved.
    pub fn cancel( &self )
    {
      self.cancellation.cancel();
    }

    /// Access the event stream for this call (`Request`, `Response`,
    /// `Redirect`, `Retry`, progress events). Events are emitted in program
    /// order but may arrive slightly after the corresponding milestone.
    pub fn events( &mut self ) -> &mut EventReceiver
    {
      &mut self.events
    }
  }

  impl Future for Call
  {
    type Output = Result< Response >;

    fn poll( mut self : Pin< &mut Self >, cx : &mut Context< '_ > ) -> Poll< Self::Output >
    {
      self.inner.as_mut().poll( cx )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::transport::{ Transport, TransportRequest, TransportResponse };
    use std::collections::HashMap;
    use std::sync::{ Arc, Mutex };

    struct StubTransport
    {
      response : Mutex< Option< TransportResponse > >,
    }

    impl Transport for StubTransport
    {
      fn call( &self, _request : TransportRequest ) -> Pin< Box< dyn Future< Output = Result< TransportResponse > > + Send > >
      {
        let taken = self.response.lock().unwrap().take();
        match taken
        {
          Some( response ) => Box::pin( async move { Ok( response ) } ),
          None => Box::pin( std::future::pending() ),
        }
      }
    }

    #[ tokio::test ]
    async fn call_resolves_to_a_response()
    {
      let options = Options::new( "GET", url::Url::parse( "https://example.com/" ).unwrap() ).unwrap();
      let transport = StubTransport
      {
        response : Mutex::new( Some( TransportResponse
        {
          status : 200,
          status_message : None,
          headers : HashMap::new(),
          body : b"ok".to_vec(),
          url : "https://example.com/".into(),
          remote_addr : None,
        } ) ),
      };
      let ( tx, rx ) = crate::events::channel();
      let ctx = ExecutorContext
      {
        transport : Arc::new( transport ),
        #[ cfg( feature = "cache" ) ] cache : None,
        #[ cfg( feature = "cookies" ) ] cookie_jar : None,
        events : tx,
      };
      let call = Call::new( options, ctx, rx );
      let response = call.await.unwrap();
      assert_eq!( response.status_code, 200 );
    }

    #[ tokio::test ]
    async fn cancel_before_polling_yields_cancel_error()
    {
      let options = Options::new( "GET", url::Url::parse( "https://example.com/" ).unwrap() ).unwrap();
      let transport = StubTransport { response : Mutex::new( None ) };
      let ( tx, rx ) = crate::events::channel();
      let ctx = ExecutorContext
      {
        transport : Arc::new( transport ),
        #[ cfg( feature = "cache" ) ] cache : None,
        #[ cfg( feature = "cookies" ) ] cookie_jar : None,
        events : tx,
      };
      let call = Call::new( options, ctx, rx );
      call.cancel();
      let error = call.await.unwrap_err();
      assert!( matches!( error, crate::error::EngineError::Cancel ) );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    Call,
  };
}
