// src/decompress.rs
//! Decompression selection by `content-encoding` (§6). The engine is
//! responsible for stripping `content-encoding` from any headers it forwards
//! once it has decompressed the body.

#![ cfg( feature = "compression" ) ]

mod private
{
  use std::io::Read;

  use crate::error::{ EngineError, Result };

  /// Codecs the engine recognizes in a `content-encoding` header.
  #[ derive( Debug, Clone, Copy, PartialEq, Eq ) ]
  pub enum Codec
  {
    /// `gzip`
    Gzip,
    /// `deflate`
    Deflate,
    /// `br` (Brotli)
    Brotli,
    /// `zstd`
    Zstd,
  }

  impl Codec
  {
    /// Recognize a `content-encoding` header value, case-insensitively.
    #[ must_use ]
    pub fn from_header( value : &str ) -> Option< Self >
    {
      match value.trim().to_ascii_lowercase().as_str()
      {
        "gzip" | "x-gzip" => Some( Self::Gzip ),
        "deflate" => Some( Self::Deflate ),
        "br" => Some( Self::Brotli ),
        "zstd" => Some( Self::Zstd ),
        _ => None,
      }
    }
  }

  /// Decompress `body` according to `codec`, synchronously. Used once the
  /// whole response body has been drained (the promise surface always drains
  /// fully before this point; the stream surface decompresses per-chunk via
  /// `async-compression`'s stream adapters, not this function).
  ///
  /// # Errors
  ///
  /// Returns `EngineError::Read` if the body is not validly encoded for the
  /// given codec.
  pub fn decompress( codec : Codec, body : &[ u8 ] ) -> Result< Vec< u8 > >
  {
    match codec
    {
      Codec::Gzip =>
      {
        let mut decoder = flate2::read::GzDecoder::new( body );
        let mut out = Vec::new();
        decoder.read_to_end( &mut out ).map_err( | e | EngineError::Read( e.to_string() ) )?;
        Ok( out )
      }
      Codec::Deflate =>
      {
        let mut decoder = flate2::read::DeflateDecoder::new( body );
        let mut out = Vec::new();
        decoder.read_to_end( &mut out ).map_err( | e | EngineError::Read( e.to_string() ) )?;
        Ok( out )
      }
      Codec::Brotli =>
      {
        let mut out = Vec::new();
        brotli::BrotliDecompress( &mut std::io::Cursor::new( body ), &mut out )
          .map_err( | e | EngineError::Read( e.to_string() ) )?;
        Ok( out )
      }
      Codec::Zstd =>
      {
        // async-compression's sync facilities aren't exposed standalone; the
        // zstd case is handled on the streaming path (executor.rs) via
        // `async_compression::tokio::bufread::ZstdDecoder`. A buffered-body
        // caller should route through that adapter instead of this function.
        Err( EngineError::Read( "zstd decompression requires the streaming path".into() ) )
      }
    }
  }

  #[ cfg( test ) ]
  mod tests
  {
    use super::*;
    use std::io::Write;

    #[ test ]
    fn recognizes_known_codecs_case_insensitively()
    {
      assert_eq!( Codec::from_header( "GZIP" ), Some( Codec::Gzip ) );
      assert_eq!( Codec::from_header( "br" ), Some( Codec::Brotli ) );
      assert_eq!( Codec::from_header( "identity" ), None );
    }

    #[ test ]
    fn round_trips_gzip()
    {
      let mut encoder = flate2::write::GzEncoder::new( Vec::new(), flate2::Compression::fast() );
      encoder.write_all( b"hello world" ).unwrap();
      let compressed = encoder.finish().unwrap();

      let decompressed = decompress( Codec::Gzip, &compressed ).unwrap();
      assert_eq!( decompressed, b"hello world" );
    }
  }

} // end mod private

crate::mod_interface!
{
  exposed use
  {
    Codec,
    decompress,
  };
}
