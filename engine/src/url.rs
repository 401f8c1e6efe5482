// src/url.rs
//! URL resolution helpers : joining a relative path against a prefix URL,
//! and merging search parameters with overlay-wins semantics (§4.1).

mod private
{
  use crate::error::{ EngineError, Result };
  use url::Url;

  /// Join `path` against `prefix`, following the options-merge rule : a
  /// relative path must not start with `/` when a prefix is present.
  ///
  /// # Errors
  ///
  /// Returns `EngineError::InvalidArgument` if `path` is absolute while a
  /// prefix is set, or if the resulting URL fails to parse.
  pub fn join_prefix_url( prefix : Option< &Url >, path : &str ) -> Result< Url >
  {
    match prefix
    {
      Some( base ) =>
      {
        if path.starts_with( '/' )
        {
          return Err( EngineError::InvalidArgument( format!(
            "relative path '{path}' must not start with '/' when a prefix url is set"
          ) ) );
        }
        base.join( path ).map_err( EngineError::from )
      }
      None => Url::parse( path ).map_err( EngineError::from ),
    }
  }

  /// Reject a URL whose scheme is neither `http` nor `https`.
  ///
  /// # Errors
  ///
  /// Returns `EngineError::UnsupportedProtocol` otherwise.
  pub fn require_http_scheme( url : &Url ) -> Result< () >
  {
    match url.scheme()
    {
      "http" | "https" => Ok( () ),
      other => Err( EngineError::UnsupportedProtocol( other.to_string() ) ),
    }
  }

  /// Merge `overlay` query pairs onto `base`'s query string, overlay wins per key.
  #[ must_use ]
  pub fn merge_searchparams( base : &Url, overlay : &[ ( String, String ) ] ) -> Url
  {
    if overlay.is_empty()
    {
      return base.clone();
    }

    let mut pairs : Vec< ( String, String ) > = base.query_pairs().into_owned().collect();
    for ( key, value ) in overlay
    {
      pairs.retain( | ( k, _ ) | k != key );
      pairs.push( ( key.clone(), value.clone() ) );
    }

    let mut result = base.clone();
    if pairs.is_empty()
    {
      result.set_query( None );
    }
    else
    {
      let mut serializer = url::form_urlencoded::Serializer::new( String::new() );
      for ( k, v ) in &pairs
      {
        serializer.append_pair( k, v );
      }
      result.set_query( Some( &serializer.finish() ) );
    }
    result
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;

    #[ test ]
    fn join_prefix_url_resolves_relative_path()
    {
      let prefix = Url::parse( "https://api.example.com/v1/" ).unwrap();
      let joined = join_prefix_url( Some( &prefix ), "users/42" ).unwrap();
      assert_eq!( joined.as_str(), "https://api.example.com/v1/users/42" );
    }

    #[ test ]
    fn join_prefix_url_rejects_absolute_path_with_prefix()
    {
      let prefix = Url::parse( "https://api.example.com/v1/" ).unwrap();
      let err = join_prefix_url( Some( &prefix ), "/users/42" );
      assert!( err.is_err() );
    }

    #[ test ]
    fn require_http_scheme_rejects_other_schemes()
    {
      let url = Url::parse( "ftp://example.com" ).unwrap();
      assert!( require_http_scheme( &url ).is_err() );
    }

    #[ test ]
    fn merge_searchparams_overlay_wins()
    {
      let base = Url::parse( "https://example.com/?a=1&b=2" ).unwrap();
      let merged = merge_searchparams( &base, &[ ( "b".into(), "9".into() ) ] );
      let pairs : Vec< _ > = merged.query_pairs().into_owned().collect();
      assert!( pairs.contains( &( "a".to_string(), "1".to_string() ) ) );
      assert!( pairs.contains( &( "b".to_string(), "9".to_string() ) ) );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    join_prefix_url,
    require_http_scheme,
    merge_searchparams,
  };
}
