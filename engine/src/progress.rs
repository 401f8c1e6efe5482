// src/progress.rs
//! Byte-counting progress meter inserted into the upload/download path (§4.3).

mod private
{
  use std::sync::Arc;
  use core::sync::atomic::{ AtomicU64, Ordering };

  use crate::events::{ EventSender, Event, Progress };

  /// Which direction a meter is tracking, for the emitted event variant.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum Direction
  {
    /// Bytes being sent as the request body.
    Upload,
    /// Bytes being received as the response body.
    Download,
  }

  /// Tracks bytes transferred in one direction and emits `Progress` events.
  #[ derive( Debug, Clone ) ]
  pub struct ProgressMeter
  {
    direction : Direction,
    transferred : Arc< AtomicU64 >,
    total : Option< u64 >,
    events : EventSender,
  }

  impl ProgressMeter
  {
    /// Create a meter for `direction`, optionally with a known `total` size.
    /// Emits the initial `{0, 0, total}` reading immediately.
    #[ must_use ]
    pub fn new( direction : Direction, total : Option< u64 >, events : EventSender ) -> Self
    {
      let meter = Self
      {
        direction,
        transferred : Arc::new( AtomicU64::new( 0 ) ),
        total,
        events,
      };
      meter.emit( 0 );
      meter
    }

    /// Record that `n` more bytes were transferred, emitting an update.
    pub fn advance( &self, n : u64 )
    {
      let transferred = self.transferred.fetch_add( n, Ordering::Relaxed ) + n;
      self.emit( transferred );
    }

    /// Emit the terminal event : `percent = 1.0`, total reconciled to transferred.
    pub fn finish( &self )
    {
      let transferred = self.transferred.load( Ordering::Relaxed );
      let progress = Progress { percent : 1.0, transferred, total : Some( transferred ) };
      self.send( progress );
    }

    fn emit( &self, transferred : u64 )
    {
      let percent = match self.total
      {
        Some( total ) if total > 0 => ( transferred as f64 / total as f64 ).min( 1.0 ),
        _ => 0.0,
      };
      self.send( Progress { percent, transferred, total : self.total } );
    }

    fn send( &self, progress : Progress )
    {
      let event = match self.direction
      {
        Direction::Upload => Event::UploadProgress( progress ),
        Direction::Download => Event::DownloadProgress( progress ),
      };
      self.events.emit( event );
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use crate::events;

    #[ tokio::test ]
    async fn reports_zero_then_partial_then_terminal_percent_one()
    {
      let ( tx, mut rx ) = events::channel();
      let meter = ProgressMeter::new( Direction::Download, Some( 100 ), tx );
      meter.advance( 50 );
      meter.finish();

      let mut readings = Vec::new();
      while let Ok( Some( event ) ) = tokio::time::timeout( core::time::Duration::from_millis( 50 ), rx.recv() ).await
      {
        if let Event::DownloadProgress( p ) = event
        {
          readings.push( p );
        }
      }

      assert_eq!( readings[ 0 ].percent, 0.0 );
      assert_eq!( readings[ 1 ].transferred, 50 );
      assert_eq!( readings.last().unwrap().percent, 1.0 );
    }

    #[ tokio::test ]
    async fn unknown_total_still_finishes_at_percent_one()
    {
      let ( tx, mut rx ) = events::channel();
      let meter = ProgressMeter::new( Direction::Upload, None, tx );
      meter.advance( 10 );
      meter.finish();

      let mut last = None;
      while let Ok( Some( event ) ) = tokio::time::timeout( core::time::Duration::from_millis( 50 ), rx.recv() ).await
      {
        if let Event::UploadProgress( p ) = event
        {
          last = Some( p );
        }
      }
      assert_eq!( last.unwrap().percent, 1.0 );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    Direction,
    ProgressMeter,
  };
}
