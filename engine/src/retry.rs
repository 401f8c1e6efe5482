// src/retry.rs
//! Retry decision-making and delay computation (§4.5), generalized from the
//! teacher's `enhanced_retry.rs` exponential-backoff-plus-jitter controller.

mod private
{
  use core::time::Duration;
  use rand::Rng;

  use crate::error::EngineError;
  use crate::options::RetryOptions;
  use crate::response::Response;

  /// Decide whether attempt number `attempt` (1-based, the attempt that just
  /// failed) should be retried, given the failure and the configured policy.
  #[ must_use ]
  pub fn should_retry( policy : &RetryOptions, method : &str, attempt : u32, error : &EngineError ) -> bool
  {
    if attempt > policy.limit
    {
      return false;
    }
    if !policy.methods.iter().any( | m | m.eq_ignore_ascii_case( method ) )
    {
      return false;
    }
    match error
    {
      EngineError::Http { status, .. } => policy.status_codes.contains( status ),
      EngineError::Timeout { .. } => policy.error_codes.iter().any( | c | c == "ETIMEDOUT" ),
      EngineError::Request( _ ) => policy.error_codes.iter().any( | c | matches!( c.as_str(), "ECONNRESET" | "ECONNREFUSED" | "ENOTFOUND" | "ENETUNREACH" | "EAI_AGAIN" ) ),
      EngineError::Cancel | EngineError::InvalidArgument( _ ) | EngineError::UnsupportedProtocol( _ ) => false,
      _ => false,
    }
  }

  /// Status codes for which a `Retry-After` header is honored (§4.5 step 5).
  fn honors_retry_after( status : u16 ) -> bool
  {
    matches!( status, 413 | 429 | 503 )
  }

  /// Parse a `Retry-After` header value, as either a delta-seconds integer or
  /// an RFC 1123 HTTP-date. Unparseable values are ignored.
  #[ must_use ]
  pub fn parse_retry_after( value : &str ) -> Option< Duration >
  {
    let trimmed = value.trim();
    if let Ok( seconds ) = trimmed.parse::< u64 >()
    {
      return Some( Duration::from_secs( seconds ) );
    }
    let when = chrono::DateTime::parse_from_rfc2822( trimmed ).ok()?;
    let now = chrono::Utc::now();
    let delta = when.with_timezone( &chrono::Utc ) - now;
    delta.to_std().ok()
  }

  /// Compute the delay before the next attempt, given the just-failed
  /// error/response (for an explicit `Retry-After`) and the attempt's
  /// ordinal. Applies exponential backoff plus `[0,100)ms` jitter, bounded by
  /// `policy.backoff_limit`, and honors an explicit `Retry-After` on
  /// {413,429,503} up to `policy.max_retry_after` — beyond that ceiling the
  /// caller should treat the attempt as exhausted rather than wait. The
  /// computed delay is then run through `policy.calculate_delay`, if set.
  #[ must_use ]
  pub fn compute_delay( policy : &RetryOptions, attempt : u32, error : &EngineError, response : Option< &Response > ) -> Option< Duration >
  {
    let computed = match response.filter( | r | honors_retry_after( r.status_code ) ).and_then( | r | r.header( "retry-after" ) )
    {
      Some( header ) => match parse_retry_after( header )
      {
        Some( delay ) if delay > policy.max_retry_after => return None,
        Some( delay ) => delay,
        None => backoff_delay( policy, attempt ),
      },
      None => backoff_delay( policy, attempt ),
    };

    match &policy.calculate_delay
    {
      Some( calculate ) =>
      {
        let delay = calculate( attempt, computed, error );
        if delay.is_zero() { None } else { Some( delay ) }
      }
      None => Some( computed ),
    }
  }

  /// Exponential backoff with `[0,100)ms` jitter, capped at `policy.backoff_limit`.
  fn backoff_delay( policy : &RetryOptions, attempt : u32 ) -> Duration
  {
    let base_ms = 1000u64.saturating_mul( 1u64 << attempt.saturating_sub( 1 ).min( 16 ) );
    let jitter_ms = rand::thread_rng().gen_range( 0..100 );
    Duration::from_millis( base_ms + jitter_ms ).min( policy.backoff_limit )
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use std::collections::HashMap;

    fn response_with_status( status : u16 ) -> Response
    {
      Response
      {
        status_code : status,
        status_message : None,
        headers : HashMap::new(),
        body : vec![],
        url : "https://example.com/".into(),
        request_url : "https://example.com/".into(),
        redirect_urls : vec![],
        retry_count : 0,
        timings : crate::response::Timings::default(),
        ip : None,
        is_from_cache : false,
      }
    }

    #[ test ]
    fn retries_get_on_503_within_limit()
    {
      let policy = RetryOptions::default();
      let error = EngineError::Http { status : 503, response : Box::new( response_with_status( 503 ) ) };
      assert!( should_retry( &policy, "GET", 1, &error ) );
      assert!( !should_retry( &policy, "GET", policy.limit + 1, &error ) );
    }

    #[ test ]
    fn does_not_retry_non_idempotent_post_by_default()
    {
      let policy = RetryOptions::default();
      let error = EngineError::Http { status : 503, response : Box::new( response_with_status( 503 ) ) };
      assert!( !should_retry( &policy, "POST", 1, &error ) );
    }

    #[ test ]
    fn does_not_retry_unlisted_status()
    {
      let policy = RetryOptions::default();
      let error = EngineError::Http { status : 404, response : Box::new( response_with_status( 404 ) ) };
      assert!( !should_retry( &policy, "GET", 1, &error ) );
    }

    #[ test ]
    fn parses_integer_retry_after()
    {
      assert_eq!( parse_retry_after( "120" ), Some( Duration::from_secs( 120 ) ) );
    }

    #[ test ]
    fn retry_after_above_ceiling_yields_no_delay()
    {
      let mut policy = RetryOptions::default();
      policy.max_retry_after = Duration::from_secs( 10 );
      let mut response = response_with_status( 503 );
      response.headers.insert( "retry-after".into(), "9999".into() );
      let error = EngineError::Http { status : 503, response : Box::new( response.clone() ) };
      assert_eq!( compute_delay( &policy, 1, &error, Some( &response ) ), None );
    }

    #[ test ]
    fn retry_after_is_ignored_for_statuses_outside_the_honored_set()
    {
      let policy = RetryOptions::default();
      let mut response = response_with_status( 500 );
      response.headers.insert( "retry-after".into(), "5".into() );
      let error = EngineError::Http { status : 500, response : Box::new( response.clone() ) };
      let delay = compute_delay( &policy, 1, &error, Some( &response ) ).unwrap();
      assert!( delay >= Duration::from_millis( 1000 ) && delay < Duration::from_millis( 1100 ) );
    }

    #[ test ]
    fn backoff_delay_never_exceeds_limit()
    {
      let policy = RetryOptions::default();
      for attempt in 0..10
      {
        let delay = backoff_delay( &policy, attempt );
        assert!( delay <= policy.backoff_limit );
      }
    }

    #[ test ]
    fn backoff_delay_matches_the_documented_formula()
    {
      let policy = RetryOptions::default();
      let first = backoff_delay( &policy, 1 );
      assert!( first >= Duration::from_millis( 1000 ) && first < Duration::from_millis( 1100 ) );
      let second = backoff_delay( &policy, 2 );
      assert!( second >= Duration::from_millis( 2000 ) && second < Duration::from_millis( 2100 ) );
    }

    #[ test ]
    fn calculate_delay_override_can_force_a_give_up()
    {
      let mut policy = RetryOptions::default();
      policy.calculate_delay = Some( std::sync::Arc::new( | _attempt, _computed, _error | Duration::ZERO ) );
      let error = EngineError::Http { status : 503, response : Box::new( response_with_status( 503 ) ) };
      assert_eq!( compute_delay( &policy, 1, &error, None ), None );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    should_retry,
    parse_retry_after,
    compute_delay,
  };
}
