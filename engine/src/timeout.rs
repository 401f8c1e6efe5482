// src/timeout.rs
//! Per-milestone timeout watchdog (§4.2). One watchdog is attached per attempt;
//! it fires at most one `EngineError::Timeout` and cancels the attempt's
//! cancellation token when it does.

mod private
{
  use core::time::Duration;
  use core::sync::atomic::{ AtomicBool, Ordering };
  use std::sync::Arc;
  use tokio::time;

  use crate::error::TimeoutEvent;
  use crate::cancel::CancellationToken;

  /// Per-milestone timeout thresholds. `None` means "no limit".
  #[ derive( Debug, Clone, Copy, Default ) ]
  pub struct TimeoutConfig
  {
    /// Whole-request budget.
    pub request : Option< Duration >,
    /// Socket-assignment-to-response-end budget.
    pub socket : Option< Duration >,
    /// DNS lookup budget.
    pub lookup : Option< Duration >,
    /// TCP connect budget.
    pub connect : Option< Duration >,
    /// TLS handshake budget.
    pub secure_connect : Option< Duration >,
    /// Upload budget.
    pub send : Option< Duration >,
    /// Time-to-first-response-byte budget.
    pub response : Option< Duration >,
  }

  /// Watches one attempt's milestones and cancels its token on the first
  /// threshold breach. Re-entrant-safe : `arm` on an already-fired watchdog is
  /// a no-op.
  #[ derive( Debug, Clone ) ]
  pub struct Watchdog
  {
    config : TimeoutConfig,
    token : CancellationToken,
    fired : Arc< AtomicBool >,
    fired_event : Arc< std::sync::Mutex< Option< TimeoutEvent > > >,
  }

  impl Watchdog
  {
    /// Create a watchdog for one attempt, tied to `token`.
    #[ must_use ]
    pub fn new( config : TimeoutConfig, token : CancellationToken ) -> Self
    {
      Self
      {
        config,
        token,
        fired : Arc::new( AtomicBool::new( false ) ),
        fired_event : Arc::new( std::sync::Mutex::new( None ) ),
      }
    }

    /// Arm the timer for `event`; when it elapses, cancel the token. Returns a
    /// handle that should be dropped (or let the future abort) when the
    /// corresponding milestone is reached, so the timer never fires late.
    pub fn arm( &self, event : TimeoutEvent, threshold : Option< Duration > ) -> Option< tokio::task::JoinHandle< () > >
    {
      let threshold = threshold?;
      let token = self.token.clone();
      let fired = Arc::clone( &self.fired );
      let fired_event = Arc::clone( &self.fired_event );

      Some( tokio::spawn( async move
      {
        time::sleep( threshold ).await;
        if !fired.swap( true, Ordering::SeqCst )
        {
          *fired_event.lock().unwrap() = Some( event );
          token.cancel();
        }
      } ) )
    }

    /// Arm all seven milestone timers per the attempt's state transitions.
    /// Each threshold begins counting immediately ; callers are expected to
    /// abort the `JoinHandle` for a milestone once it has actually been
    /// reached, per §4.2's start/stop table.
    #[ must_use ]
    pub fn arm_all( &self ) -> Vec< tokio::task::JoinHandle< () > >
    {
      [
        ( TimeoutEvent::Request, self.config.request ),
        ( TimeoutEvent::Socket, self.config.socket ),
        ( TimeoutEvent::Lookup, self.config.lookup ),
        ( TimeoutEvent::Connect, self.config.connect ),
        ( TimeoutEvent::SecureConnect, self.config.secure_connect ),
        ( TimeoutEvent::Send, self.config.send ),
        ( TimeoutEvent::Response, self.config.response ),
      ]
      .into_iter()
      .filter_map( | ( event, threshold ) | self.arm( event, threshold ) )
      .collect()
    }

    /// Whether this watchdog has already fired.
    #[ must_use ]
    pub fn has_fired( &self ) -> bool
    {
      self.fired.load( Ordering::SeqCst )
    }

    /// Which milestone fired, if any.
    #[ must_use ]
    pub fn fired_event( &self ) -> Option< TimeoutEvent >
    {
      *self.fired_event.lock().unwrap()
    }

    /// Cancel every outstanding timer, e.g. because the attempt completed or
    /// errored through another path.
    pub fn disarm( handles : Vec< tokio::task::JoinHandle< () > > )
    {
      for handle in handles
      {
        handle.abort();
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ tokio::test ]
    async fn fires_once_and_cancels_token()
    {
      let token = CancellationToken::new();
      let config = TimeoutConfig { request : Some( Duration::from_millis( 10 ) ), ..Default::default() };
      let watchdog = Watchdog::new( config, token.clone() );
      let handles = watchdog.arm_all();
      tokio::time::sleep( Duration::from_millis( 40 ) ).await;
      assert!( token.is_cancelled() );
      assert!( watchdog.has_fired() );
      assert_eq!( watchdog.fired_event(), Some( TimeoutEvent::Request ) );
      Watchdog::disarm( handles );
    }

    #[ tokio::test ]
    async fn disarm_prevents_late_firing()
    {
      let token = CancellationToken::new();
      let config = TimeoutConfig { request : Some( Duration::from_millis( 20 ) ), ..Default::default() };
      let watchdog = Watchdog::new( config, token.clone() );
      let handles = watchdog.arm_all();
      Watchdog::disarm( handles );
      tokio::time::sleep( Duration::from_millis( 40 ) ).await;
      assert!( !token.is_cancelled() );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    TimeoutConfig,
    Watchdog,
  };
}
