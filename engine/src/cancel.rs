// src/cancel.rs
//! Cancellation primitive shared by every call the engine drives.
//!
//! A single `CancellationToken` is created per logical call and observed at
//! every await point in the executor, retry controller and orchestrator.
//! Cancelling is idempotent and final : once cancelled a token never becomes
//! un-cancelled.

mod private
{
  use std::sync::Arc;
  use core::sync::atomic::{ AtomicBool, Ordering };
  use core::time::Duration;
  use tokio::time;

  /// Cooperative cancellation signal for one call.
  #[ derive( Debug, Clone ) ]
  pub struct CancellationToken
  {
    cancelled : Arc< AtomicBool >,
  }

  impl CancellationToken
  {
    /// Create a fresh, non-cancelled token.
    #[ inline ]
    #[ must_use ]
    pub fn new() -> Self
    {
      Self { cancelled : Arc::new( AtomicBool::new( false ) ) }
    }

    /// Mark the token cancelled. Idempotent.
    #[ inline ]
    pub fn cancel( &self )
    {
      self.cancelled.store( true, Ordering::SeqCst );
    }

    /// Whether `cancel` has been called.
    #[ inline ]
    #[ must_use ]
    pub fn is_cancelled( &self ) -> bool
    {
      self.cancelled.load( Ordering::SeqCst )
    }

    /// Poll until cancelled, yielding control between checks.
    pub async fn cancelled( &self )
    {
      while !self.is_cancelled()
      {
        time::sleep( Duration::from_millis( 5 ) ).await;
      }
    }
  }

  impl Default for CancellationToken
  {
    #[ inline ]
    fn default() -> Self
    {
      Self::new()
    }
  }

  /// Race `operation` against cancellation of `token`. Returns `None` if
  /// cancellation won the race.
  pub async fn with_cancellation< T, F, Fut >( token : &CancellationToken, operation : F ) -> Option< T >
  where
    F : FnOnce() -> Fut,
    Fut : core::future::Future< Output = T >,
  {
    tokio::select!
    {
      result = operation() => Some( result ),
      () = token.cancelled() => None,
    }
  }

  /// Produce a token that cancels as soon as any of `tokens` does.
  #[ must_use ]
  pub fn combine_tokens( tokens : Vec< CancellationToken > ) -> CancellationToken
  {
    let combined = CancellationToken::new();
    let combined_clone = combined.clone();

    tokio::spawn( async move
    {
      loop
      {
        if tokens.iter().any( CancellationToken::is_cancelled )
        {
          combined_clone.cancel();
          return;
        }
        if tokens.is_empty()
        {
          return;
        }
        tokio::time::sleep( Duration::from_millis( 5 ) ).await;
      }
    } );

    combined
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ tokio::test ]
    async fn cancel_is_idempotent_and_observed()
    {
      let token = CancellationToken::new();
      assert!( !token.is_cancelled() );
      token.cancel();
      token.cancel();
      assert!( token.is_cancelled() );
    }

    #[ tokio::test ]
    async fn with_cancellation_returns_none_once_cancelled()
    {
      let token = CancellationToken::new();
      token.cancel();
      let result = with_cancellation( &token, || async {
        tokio::time::sleep( Duration::from_secs( 60 ) ).await;
        42
      } ).await;
      assert_eq!( result, None );
    }

    #[ tokio::test ]
    async fn combine_tokens_cancels_when_any_source_does()
    {
      let a = CancellationToken::new();
      let b = CancellationToken::new();
      let combined = combine_tokens( vec![ a.clone(), b.clone() ] );
      b.cancel();
      tokio::time::sleep( Duration::from_millis( 50 ) ).await;
      assert!( combined.is_cancelled() );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    CancellationToken,
    with_cancellation,
    combine_tokens,
  };
}
