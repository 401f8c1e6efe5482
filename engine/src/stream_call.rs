// src/stream_call.rs
//! The duplex-stream call surface: the response body (and, for
//! `text/event-stream` responses, parsed SSE events) delivered incrementally
//! over a channel rather than as one accumulated `Response`.

mod private
{
  use bytes::Bytes;
  use futures_core::Stream;
  use tokio::sync::mpsc;
  use tokio_stream::wrappers::UnboundedReceiverStream;
  use eventsource_stream::{ Eventsource, Event as SseEvent };

  use crate::cancel::CancellationToken;
  use crate::error::{ EngineError, Result };
  use crate::events::EventReceiver;
  use crate::executor::ExecutorContext;
  use crate::options::Options;
  use crate::orchestrator;

  const CHUNK_SIZE : usize = 8192;

  /// A request whose response body is exposed as a stream of chunks rather
  /// than accumulated up front. Built on top of the same executor/retry
  /// pipeline; the body is still fully received before chunking begins,
  /// since the transport boundary (§6) hands back a drained body.
  pub struct StreamCall
  {
    chunks : UnboundedReceiverStream< Result< Bytes > >,
    cancellation : CancellationToken,
    events : EventReceiver,
  }

  impl StreamCall
  {
    /// Start `options` against `ctx`, spawning the call on the current
    /// runtime so chunks can be produced as soon as the body is available.
    #[ must_use ]
    pub fn new( options : Options, ctx : ExecutorContext, events : EventReceiver ) -> Self
    {
      let cancellation = options.cancellation.clone();
      let ( tx, rx ) = mpsc::unbounded_channel();

      tokio::spawn( async move
      {
        match orchestrator::run( options, &ctx ).await
        {
          Ok( response ) =>
          {
            for chunk in response.body.chunks( CHUNK_SIZE )
            {
              if tx.send( Ok( Bytes::copy_from_slice( chunk ) ) ).is_err()
              {
                return;
              }
            }
          }
          Err( error ) => { let _ = tx.send( Err( error ) ); }
        }
      } );

      Self { chunks : UnboundedReceiverStream::new( rx ), cancellation, events }
    }

    /// Request cancellation of the underlying call.
    pub fn cancel( &self )
    {
      self.cancellation.cancel();
    }

    /// Access the event stream for this call.
    pub fn events( &mut self ) -> &mut EventReceiver
    {
      &mut self.events
    }

    /// The body as a stream of byte chunks, in order, terminated by the
    /// stream ending or by the first error.
    pub fn body_stream( self ) -> impl Stream< Item = Result< Bytes > >
    {
      self.chunks
    }

    /// Parse the body chunk stream as `text/event-stream`, yielding one
    /// `SseEvent` per `data:`/`event:` block. Malformed frames surface as
    /// `EngineError::Parse`.
    pub fn sse_stream( self ) -> impl Stream< Item = Result< SseEvent > >
    {
      use futures_util::StreamExt;

      self.chunks
        .map( | item | item.map_err( | e | std::io::Error::new( std::io::ErrorKind::Other, e.to_string() ) ) )
        .eventsource()
        .map( | item | item.map_err( | e | EngineError::Parse( e.to_string() ) ) )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::transport::{ Transport, TransportRequest, TransportResponse };
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::{ Arc, Mutex };
    use futures_util::StreamExt;

    struct StubTransport
    {
      response : Mutex< Option< TransportResponse > >,
    }

    impl Transport for StubTransport
    {
      fn call( &self, _request : TransportRequest ) -> Pin< Box< dyn Future< Output = Result< TransportResponse > > + Send > >
      {
        let response = self.response.lock().unwrap().take().unwrap();
        Box::pin( async move { Ok( response ) } )
      }
    }

    #[ tokio::test ]
    async fn body_stream_yields_the_whole_body_as_one_chunk_when_small()
    {
      let options = Options::new( "GET", url::Url::parse( "https://example.com/" ).unwrap() ).unwrap();
      let transport = StubTransport
      {
        response : Mutex::new( Some( TransportResponse
        {
          status : 200,
          status_message : None,
          headers : HashMap::new(),
          body : b"hello world".to_vec(),
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
      let stream_call = StreamCall::new( options, ctx, rx );
      let chunks : Vec< _ > = stream_call.body_stream().collect().await;
      assert_eq!( chunks.len(), 1 );
      assert_eq!( chunks[ 0 ].as_ref().unwrap().as_ref(), b"hello world" );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    StreamCall,
  };
}
