// src/pagination.rs
//! Lazy, bounded pagination over repeated calls (§4.7). Items are JSON
//! values: the default `transform` assumes a JSON array body, and callers
//! needing a typed item can deserialize each yielded value themselves.

mod private
{
  use std::collections::VecDeque;
  use std::sync::Arc;
  use core::time::Duration;

  use serde_json::Value;

  use crate::error::{ EngineError, Result };
  use crate::executor::ExecutorContext;
  use crate::options::{ Options, OptionsOverlay };
  use crate::orchestrator;
  use crate::response::Response;

  /// `transform(response) -> items`.
  pub type TransformFn = Arc< dyn Fn( &Response ) -> Result< Vec< Value > > + Send + Sync >;
  /// `paginate(response, currentItems, allItems) -> Some(overlay)` to continue, `None` to stop.
  pub type PaginateFn = Arc< dyn Fn( &Response, &[ Value ], &[ Value ] ) -> Option< OptionsOverlay > + Send + Sync >;
  /// `filter(item, currentItems, allItems) -> bool`, default always-true.
  pub type FilterFn = Arc< dyn Fn( &Value, &[ Value ], &[ Value ] ) -> bool + Send + Sync >;
  /// `shouldContinue(item, currentItems, allItems) -> bool`, default always-true.
  pub type ShouldContinueFn = Arc< dyn Fn( &Value, &[ Value ], &[ Value ] ) -> bool + Send + Sync >;

  /// User-tunable pagination behavior; every field has the documented default.
  #[ derive( Clone ) ]
  pub struct PaginationConfig
  {
    /// Extracts items from one response.
    pub transform : TransformFn,
    /// Decides the options overlay for the next request, or `None` to stop.
    pub paginate : PaginateFn,
    /// Per-item inclusion predicate.
    pub filter : FilterFn,
    /// Per-item early-stop predicate (checked before the item is yielded).
    pub should_continue : ShouldContinueFn,
    /// Whether to retain every yielded item for `paginate`'s `allItems` view.
    pub stack_all_items : bool,
    /// Hard ceiling on the number of requests this iterator will issue.
    pub request_limit : u32,
    /// Optional ceiling on the number of items yielded in total.
    pub count_limit : Option< u64 >,
    /// Delay between requests after the first.
    pub backoff : Duration,
  }

  impl Default for PaginationConfig
  {
    fn default() -> Self
    {
      Self
      {
        transform : Arc::new( default_transform ),
        paginate : Arc::new( default_paginate ),
        filter : Arc::new( | _, _, _ | true ),
        should_continue : Arc::new( | _, _, _ | true ),
        stack_all_items : false,
        request_limit : 10_000,
        count_limit : None,
        backoff : Duration::ZERO,
      }
    }
  }

  fn default_transform( response : &Response ) -> Result< Vec< Value > >
  {
    let parsed : Value = serde_json::from_slice( &response.body )?;
    match parsed
    {
      Value::Array( items ) => Ok( items ),
      other => Err( EngineError::Parse( format!( "paginate: expected a JSON array body, got {other}" ) ) ),
    }
  }

  fn default_paginate( response : &Response, _current : &[ Value ], _all : &[ Value ] ) -> Option< OptionsOverlay >
  {
    let link = response.header( "link" )?;
    let next_url = parse_link_next( link )?;
    let url = url::Url::parse( &next_url ).ok()?;
    Some( OptionsOverlay { url : Some( url ), ..Default::default() } )
  }

  /// Parse a `Link` header for a `rel="next"` target, per RFC 8288.
  #[ must_use ]
  pub fn parse_link_next( header : &str ) -> Option< String >
  {
    for part in header.split( ',' )
    {
      let mut segments = part.split( ';' );
      let url_segment = segments.next()?.trim();
      let url = url_segment.trim_start_matches( '<' ).trim_end_matches( '>' );
      let is_next = segments.any( | segment | segment.trim().eq_ignore_ascii_case( r#"rel="next""# ) || segment.trim().eq_ignore_ascii_case( "rel=next" ) );
      if is_next
      {
        return Some( url.to_string() );
      }
    }
    None
  }

  /// A lazy, single-consumer pagination sequence built on repeated calls
  /// through the orchestrator. Abandoning it (dropping without draining)
  /// cancels whatever request is in flight via the shared cancellation token.
  pub struct PaginationIterator
  {
    options : Options,
    ctx : ExecutorContext,
    config : PaginationConfig,
    requests_made : u32,
    remaining : Option< u64 >,
    all_items : Vec< Value >,
    pending : VecDeque< Value >,
    finished : bool,
  }

  impl PaginationIterator
  {
    /// Begin paginating `options` against `ctx` under `config`.
    #[ must_use ]
    pub fn new( mut options : Options, ctx : ExecutorContext, config : PaginationConfig ) -> Self
    {
      options.resolve_body_only = false;
      let remaining = config.count_limit;
      Self
      {
        options,
        ctx,
        config,
        requests_made : 0,
        remaining,
        all_items : Vec::new(),
        pending : VecDeque::new(),
        finished : false,
      }
    }

    /// Produce the next item, making additional requests as needed. Returns
    /// `Ok(None)` once the sequence is exhausted.
    ///
    /// # Errors
    ///
    /// Returns whatever error a request attempt produced, or a
    /// `EngineError::Parse` if `transform` rejects the response body.
    pub async fn next( &mut self ) -> Result< Option< Value > >
    {
      loop
      {
        if let Some( item ) = self.pending.pop_front()
        {
          return Ok( Some( item ) );
        }
        if self.finished
        {
          return Ok( None );
        }
        if self.requests_made >= self.config.request_limit
        {
          self.finished = true;
          return Ok( None );
        }

        if self.requests_made > 0 && !self.config.backoff.is_zero()
        {
          tokio::select!
          {
            () = tokio::time::sleep( self.config.backoff ) => {}
            () = self.options.cancellation.cancelled() => { self.finished = true; return Err( EngineError::Cancel ); }
          }
        }

        let response = orchestrator::run( self.options.clone(), &self.ctx ).await?;
        self.requests_made += 1;

        let items = ( self.config.transform )( &response )?;
        let mut current_items = Vec::new();
        let mut stopped_mid_batch = false;

        for item in items
        {
          if !( self.config.filter )( &item, &current_items, &self.all_items )
          {
            continue;
          }
          if !( self.config.should_continue )( &item, &current_items, &self.all_items )
          {
            self.finished = true;
            stopped_mid_batch = true;
            break;
          }

          current_items.push( item.clone() );
          if self.config.stack_all_items
          {
            self.all_items.push( item.clone() );
          }
          self.pending.push_back( item );

          if let Some( remaining ) = self.remaining.as_mut()
          {
            *remaining -= 1;
            if *remaining == 0
            {
              self.finished = true;
              stopped_mid_batch = true;
              break;
            }
          }
        }

        if !stopped_mid_batch
        {
          match ( self.config.paginate )( &response, &current_items, &self.all_items )
          {
            Some( overlay ) => self.options = self.options.clone().merge( overlay ),
            None => self.finished = true,
          }
        }
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn parses_next_link_among_several_relations()
    {
      let header = r#"<https://api.example.com/items?page=2>; rel="next", <https://api.example.com/items?page=1>; rel="prev""#;
      assert_eq!( parse_link_next( header ).as_deref(), Some( "https://api.example.com/items?page=2" ) );
    }

    #[ test ]
    fn returns_none_when_no_next_relation_present()
    {
      let header = r#"<https://api.example.com/items?page=1>; rel="prev""#;
      assert!( parse_link_next( header ).is_none() );
    }

    #[ test ]
    fn default_transform_rejects_non_array_bodies()
    {
      let response = Response
      {
        status_code : 200,
        status_message : None,
        headers : std::collections::HashMap::new(),
        body : b"{}".to_vec(),
        url : "https://example.com/".into(),
        request_url : "https://example.com/".into(),
        redirect_urls : vec![],
        retry_count : 0,
        timings : crate::response::Timings::default(),
        ip : None,
        is_from_cache : false,
      };
      assert!( default_transform( &response ).is_err() );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    PaginationIterator,
    PaginationConfig,
    TransformFn,
    PaginateFn,
    FilterFn,
    ShouldContinueFn,
    parse_link_next,
  };
}
