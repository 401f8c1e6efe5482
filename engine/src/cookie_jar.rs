// src/cookie_jar.rs
//! The cookie-jar boundary (§6) and an in-memory reference implementation
//! built on the `cookie` crate.

#![ cfg( feature = "cookies" ) ]

mod private
{
  use std::collections::HashMap;
  use std::pin::Pin;
  use std::future::Future;
  use tokio::sync::RwLock;
  use cookie::Cookie;

  /// Cookie-jar boundary the executor consumes (§6) : read the `Cookie`
  /// header to send for a host, and record any `Set-Cookie` headers received.
  pub trait CookieJar : Send + Sync
  {
    /// The `Cookie` header value to send for `host`, if any cookies apply.
    fn cookie_header< 'a >( &'a self, host : &'a str ) -> Pin< Box< dyn Future< Output = Option< String > > + Send + 'a > >;

    /// Record a raw `Set-Cookie` header value received from `host`.
    ///
    /// # Errors
    ///
    /// Returns an error message if the cookie fails to parse; callers may
    /// choose to ignore this when `ignore_invalid_cookies` is set.
    fn set_cookie< 'a >( &'a self, raw : &'a str, host : &'a str ) -> Pin< Box< dyn Future< Output = Result< (), String > > + Send + 'a > >;
  }

  /// In-memory cookie jar, keyed by host. Does not implement path scoping or
  /// expiry beyond what `cookie::Cookie` itself reports.
  #[ derive( Debug, Default ) ]
  pub struct InMemoryCookieJar
  {
    by_host : RwLock< HashMap< String, Vec< String > > >,
  }

  impl InMemoryCookieJar
  {
    /// Create an empty jar.
    #[ must_use ]
    pub fn new() -> Self
    {
      Self::default()
    }
  }

  impl CookieJar for InMemoryCookieJar
  {
    fn cookie_header< 'a >( &'a self, host : &'a str ) -> Pin< Box< dyn Future< Output = Option< String > > + Send + 'a > >
    {
      Box::pin( async move
      {
        let by_host = self.by_host.read().await;
        let cookies = by_host.get( host )?;
        if cookies.is_empty()
        {
          return None;
        }
        Some( cookies.join( "; " ) )
      } )
    }

    fn set_cookie< 'a >( &'a self, raw : &'a str, host : &'a str ) -> Pin< Box< dyn Future< Output = Result< (), String > > + Send + 'a > >
    {
      Box::pin( async move
      {
        let parsed = Cookie::parse( raw.to_string() ).map_err( | e | e.to_string() )?;
        let pair = format!( "{}={}", parsed.name(), parsed.value() );

        let mut by_host = self.by_host.write().await;
        let entry = by_host.entry( host.to_string() ).or_default();
        entry.retain( | existing | !existing.starts_with( &format!( "{}=", parsed.name() ) ) );
        entry.push( pair );
        Ok( () )
      } )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ tokio::test ]
    async fn set_then_read_cookie_header()
    {
      let jar = InMemoryCookieJar::new();
      jar.set_cookie( "session=abc123; Path=/", "example.com" ).await.unwrap();
      let header = jar.cookie_header( "example.com" ).await;
      assert_eq!( header.as_deref(), Some( "session=abc123" ) );
    }

    #[ tokio::test ]
    async fn re_setting_same_name_replaces_value()
    {
      let jar = InMemoryCookieJar::new();
      jar.set_cookie( "a=1", "h" ).await.unwrap();
      jar.set_cookie( "a=2", "h" ).await.unwrap();
      let header = jar.cookie_header( "h" ).await.unwrap();
      assert_eq!( header, "a=2" );
    }

    #[ tokio::test ]
    async fn unknown_host_has_no_cookies()
    {
      let jar = InMemoryCookieJar::new();
      assert!( jar.cookie_header( "nowhere.example" ).await.is_none() );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    CookieJar,
    InMemoryCookieJar,
  };
}
