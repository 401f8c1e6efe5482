// src/cache.rs
//! The cache adapter boundary (§6) and an in-memory reference implementation,
//! using a TTL/LRU design reworked around RFC 7234-ish method/status
//! cacheability rather than an LLM-specific request key.

#![ cfg( feature = "cache" ) ]

mod private
{
  use std::collections::HashMap;
  use std::sync::Arc;
  use std::pin::Pin;
  use std::future::Future;
  use core::time::Duration;
  use core::sync::atomic::{ AtomicU32, AtomicU64, Ordering };
  use tokio::sync::RwLock;
  use std::time::Instant;

  use crate::response::Response;

  /// Cache hit/miss/eviction counters.
  #[ derive( Debug, Default ) ]
  pub struct CacheStatistics
  {
    hits : AtomicU64,
    misses : AtomicU64,
    evictions : AtomicU64,
    entries : AtomicU32,
  }

  impl CacheStatistics
  {
    /// Hit rate as a percentage in `[0.0, 100.0]`.
    #[ must_use ]
    pub fn hit_rate( &self ) -> f64
    {
      let hits = self.hits.load( Ordering::Relaxed );
      let misses = self.misses.load( Ordering::Relaxed );
      let total = hits + misses;
      if total == 0 { 0.0 } else { ( hits as f64 / total as f64 ) * 100.0 }
    }

    /// Current entry count.
    #[ must_use ]
    pub fn entries( &self ) -> u32
    {
      self.entries.load( Ordering::Relaxed )
    }
  }

  #[ derive( Debug, Clone ) ]
  struct Entry
  {
    response : Response,
    stored_at : Instant,
    ttl : Duration,
  }

  impl Entry
  {
    fn is_expired( &self ) -> bool
    {
      self.stored_at.elapsed() > self.ttl
    }
  }

  /// Whether a request/response pair is eligible for caching at all, per a
  /// simplified RFC 7234 : only `GET`/`HEAD` requests, only `200`/`203`/`300`/
  /// `301`/`410` responses, and only when no `no-store` cache-control
  /// directive is present.
  #[ must_use ]
  pub fn is_cacheable( method : &str, response : &Response ) -> bool
  {
    if !matches!( method, "GET" | "HEAD" )
    {
      return false;
    }
    if !matches!( response.status_code, 200 | 203 | 300 | 301 | 410 )
    {
      return false;
    }
    if let Some( cache_control ) = response.header( "cache-control" )
    {
      if cache_control.to_ascii_lowercase().contains( "no-store" )
      {
        return false;
      }
    }
    true
  }

  /// Parse a `max-age` or `s-maxage` directive out of a `Cache-Control` header.
  #[ must_use ]
  pub fn freshness_ttl( response : &Response, default_ttl : Duration ) -> Duration
  {
    let Some( header ) = response.header( "cache-control" ) else { return default_ttl };
    for directive in header.split( ',' )
    {
      let directive = directive.trim();
      if let Some( seconds ) = directive.strip_prefix( "max-age=" )
      {
        if let Ok( seconds ) = seconds.trim().parse::< u64 >()
        {
          return Duration::from_secs( seconds );
        }
      }
    }
    default_ttl
  }

  /// Cache adapter boundary the executor consumes (§6). Implementors must
  /// provide their own internal synchronization.
  pub trait CacheAdapter : Send + Sync
  {
    /// Look up a cached response for `key`.
    fn get< 'a >( &'a self, key : &'a str ) -> Pin< Box< dyn Future< Output = Option< Response > > + Send + 'a > >;

    /// Store `response` under `key` with the given time-to-live.
    fn put< 'a >( &'a self, key : &'a str, response : Response, ttl : Duration ) -> Pin< Box< dyn Future< Output = () > + Send + 'a > >;
  }

  /// Simple in-memory `CacheAdapter` with TTL expiry and LRU-by-insertion
  /// eviction once `max_size` is reached.
  #[ derive( Debug ) ]
  pub struct InMemoryCacheAdapter
  {
    entries : RwLock< HashMap< String, Entry > >,
    order : RwLock< Vec< String > >,
    max_size : usize,
    default_ttl : Duration,
    statistics : Arc< CacheStatistics >,
  }

  impl InMemoryCacheAdapter
  {
    /// Create an adapter bounded to `max_size` entries with `default_ttl`
    /// used when a response carries no explicit freshness directive.
    #[ must_use ]
    pub fn new( max_size : usize, default_ttl : Duration ) -> Self
    {
      Self
      {
        entries : RwLock::new( HashMap::new() ),
        order : RwLock::new( Vec::new() ),
        max_size,
        default_ttl,
        statistics : Arc::new( CacheStatistics::default() ),
      }
    }

    /// Access the running hit/miss/eviction counters.
    #[ must_use ]
    pub fn statistics( &self ) -> Arc< CacheStatistics >
    {
      Arc::clone( &self.statistics )
    }

    /// Remove every entry.
    pub async fn clear( &self )
    {
      let mut entries = self.entries.write().await;
      let mut order = self.order.write().await;
      self.statistics.entries.store( 0, Ordering::Relaxed );
      entries.clear();
      order.clear();
    }
  }

  impl Default for InMemoryCacheAdapter
  {
    fn default() -> Self
    {
      Self::new( 1000, Duration::from_secs( 300 ) )
    }
  }

  impl CacheAdapter for InMemoryCacheAdapter
  {
    fn get< 'a >( &'a self, key : &'a str ) -> Pin< Box< dyn Future< Output = Option< Response > > + Send + 'a > >
    {
      Box::pin( async move
      {
        let expired =
        {
          let entries = self.entries.read().await;
          match entries.get( key )
          {
            Some( entry ) if entry.is_expired() => true,
            Some( entry ) =>
            {
              self.statistics.hits.fetch_add( 1, Ordering::Relaxed );
              return Some( entry.response.clone() );
            }
            None =>
            {
              self.statistics.misses.fetch_add( 1, Ordering::Relaxed );
              return None;
            }
          }
        };

        if expired
        {
          let mut entries = self.entries.write().await;
          entries.remove( key );
          self.statistics.entries.fetch_sub( 1, Ordering::Relaxed );
          self.statistics.misses.fetch_add( 1, Ordering::Relaxed );
        }
        None
      } )
    }

    fn put< 'a >( &'a self, key : &'a str, response : Response, ttl : Duration ) -> Pin< Box< dyn Future< Output = () > + Send + 'a > >
    {
      Box::pin( async move
      {
        let mut entries = self.entries.write().await;
        let mut order = self.order.write().await;

        if !entries.contains_key( key ) && entries.len() >= self.max_size && !order.is_empty()
        {
          let oldest = order.remove( 0 );
          entries.remove( &oldest );
          self.statistics.evictions.fetch_add( 1, Ordering::Relaxed );
          self.statistics.entries.fetch_sub( 1, Ordering::Relaxed );
        }

        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        let is_new = entries.insert( key.to_string(), Entry { response, stored_at : Instant::now(), ttl } ).is_none();
        if is_new
        {
          order.push( key.to_string() );
          self.statistics.entries.fetch_add( 1, Ordering::Relaxed );
        }
      } )
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use std::collections::HashMap as Map;

    fn ok_response() -> Response
    {
      Response
      {
        status_code : 200,
        status_message : None,
        headers : Map::new(),
        body : b"hi".to_vec(),
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
    fn get_and_head_are_cacheable_on_200()
    {
      assert!( is_cacheable( "GET", &ok_response() ) );
      assert!( is_cacheable( "HEAD", &ok_response() ) );
      assert!( !is_cacheable( "POST", &ok_response() ) );
    }

    #[ test ]
    fn no_store_disables_caching()
    {
      let mut response = ok_response();
      response.headers.insert( "cache-control".into(), "no-store".into() );
      assert!( !is_cacheable( "GET", &response ) );
    }

    #[ tokio::test ]
    async fn stores_and_retrieves_until_ttl_expires()
    {
      let cache = InMemoryCacheAdapter::new( 10, Duration::from_secs( 60 ) );
      cache.put( "k", ok_response(), Duration::from_millis( 10 ) ).await;
      assert!( cache.get( "k" ).await.is_some() );
      tokio::time::sleep( Duration::from_millis( 30 ) ).await;
      assert!( cache.get( "k" ).await.is_none() );
    }

    #[ tokio::test ]
    async fn evicts_oldest_when_full()
    {
      let cache = InMemoryCacheAdapter::new( 1, Duration::from_secs( 60 ) );
      cache.put( "a", ok_response(), Duration::from_secs( 60 ) ).await;
      cache.put( "b", ok_response(), Duration::from_secs( 60 ) ).await;
      assert!( cache.get( "a" ).await.is_none() );
      assert!( cache.get( "b" ).await.is_some() );
      assert_eq!( cache.statistics().entries(), 1 );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    CacheAdapter,
    InMemoryCacheAdapter,
    CacheStatistics,
    is_cacheable,
    freshness_ttl,
  };
}
