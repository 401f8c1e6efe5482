// src/events.rs
//! Side-channel events emitted while a call runs (§4.4, §5 ordering guarantees).

mod private
{
  use tokio::sync::mpsc;

  use crate::response::Response;

  /// A progress reading, emitted by the upload/download progress meter (§4.3).
  #[ derive( Debug, Clone, Copy, PartialEq ) ]
  pub struct Progress
  {
    /// Fraction complete in `[0.0, 1.0]`. `0.0` if the total is unknown.
    pub percent : f64,
    /// Bytes transferred so far.
    pub transferred : u64,
    /// Total expected bytes, if known.
    pub total : Option< u64 >,
  }

  /// One lifecycle event, emitted in program order for a single call.
  #[ derive( Debug, Clone ) ]
  #[ non_exhaustive ]
  pub enum Event
  {
    /// A transport request was created.
    Request
    {
      /// Method of the request.
      method : String,
      /// URL of the request.
      url : String,
    },
    /// Upload progress update.
    UploadProgress( Progress ),
    /// A response was received (before redirect resolution for intermediate hops).
    Response( Box< Response > ),
    /// Download progress update.
    DownloadProgress( Progress ),
    /// A redirect is being followed.
    Redirect
    {
      /// The response that triggered this redirect.
      from : Box< Response >,
      /// The URL being redirected to.
      to : String,
    },
    /// A retry has been scheduled.
    Retry
    {
      /// 1-indexed attempt number about to run.
      attempt : u32,
      /// Delay before the retry runs.
      delay_ms : u64,
    },
    /// A non-fatal error occurred along the way (e.g. a cookie-jar write failure).
    Error( String ),
  }

  /// Sending half of a call's event side channel.
  #[ derive( Debug, Clone ) ]
  pub struct EventSender
  {
    inner : mpsc::UnboundedSender< Event >,
  }

  impl EventSender
  {
    /// Emit an event, ignoring the error if nobody is listening anymore.
    pub fn emit( &self, event : Event )
    {
      let _ = self.inner.send( event );
    }
  }

  /// Receiving half of a call's event side channel.
  #[ derive( Debug ) ]
  pub struct EventReceiver
  {
    inner : mpsc::UnboundedReceiver< Event >,
  }

  impl EventReceiver
  {
    /// Receive the next event, if any.
    pub async fn recv( &mut self ) -> Option< Event >
    {
      self.inner.recv().await
    }
  }

  /// Create a fresh event channel for one call.
  #[ must_use ]
  pub fn channel() -> ( EventSender, EventReceiver )
  {
    let ( tx, rx ) = mpsc::unbounded_channel();
    ( EventSender { inner : tx }, EventReceiver { inner : rx } )
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    Event,
    Progress,
    EventSender,
    EventReceiver,
    channel,
  };
}
