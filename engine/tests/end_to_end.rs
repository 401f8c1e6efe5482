//! End-to-end scenarios driving the real `reqwest`-backed transport against a
//! local mock server, covering the six testable-property scenarios: a plain
//! happy-path GET, a single redirect, method downgrade on 303, retry on a
//! transient 503, `Retry-After` honoring the configured ceiling, and
//! cancellation mid-flight.

use std::time::Duration;

use wiremock::{ Mock, MockServer, ResponseTemplate };
use wiremock::matchers::{ method, path };

use fetch_engine::{ Client, Body };

fn client() -> Client
{
  Client::new().expect( "default transport builds" )
}

#[ tokio::test ]
async fn plain_get_resolves_with_the_response_body()
{
  let server = MockServer::start().await;
  Mock::given( method( "GET" ) )
    .and( path( "/ok" ) )
    .respond_with( ResponseTemplate::new( 200 ).set_body_string( "hello" ) )
    .mount( &server )
    .await;

  let client = client();
  let options = client.get( &format!( "{}/ok", server.uri() ) ).unwrap();
  let response = client.call( options ).await.unwrap();

  assert_eq!( response.status_code, 200 );
  assert_eq!( response.body, b"hello" );
  assert!( !response.is_from_cache );
}

#[ tokio::test ]
async fn a_single_redirect_is_followed_and_recorded()
{
  let server = MockServer::start().await;
  Mock::given( method( "GET" ) )
    .and( path( "/start" ) )
    .respond_with( ResponseTemplate::new( 301 ).insert_header( "location", "/end" ) )
    .mount( &server )
    .await;
  Mock::given( method( "GET" ) )
    .and( path( "/end" ) )
    .respond_with( ResponseTemplate::new( 200 ).set_body_string( "landed" ) )
    .mount( &server )
    .await;

  let client = client();
  let options = client.get( &format!( "{}/start", server.uri() ) ).unwrap();
  let response = client.call( options ).await.unwrap();

  assert_eq!( response.status_code, 200 );
  assert_eq!( response.body, b"landed" );
  assert_eq!( response.redirect_urls.len(), 1 );
}

#[ tokio::test ]
async fn a_303_redirect_downgrades_the_method_and_drops_the_body()
{
  let server = MockServer::start().await;
  Mock::given( method( "POST" ) )
    .and( path( "/submit" ) )
    .respond_with( ResponseTemplate::new( 303 ).insert_header( "location", "/receipt" ) )
    .mount( &server )
    .await;
  Mock::given( method( "GET" ) )
    .and( path( "/receipt" ) )
    .respond_with( ResponseTemplate::new( 200 ).set_body_string( "confirmed" ) )
    .mount( &server )
    .await;

  let client = client();
  let options = client
    .post( &format!( "{}/submit", server.uri() ), Body::Json( serde_json::json!( { "ok" : true } ) ) )
    .unwrap();
  let response = client.call( options ).await.unwrap();

  assert_eq!( response.status_code, 200 );
  assert_eq!( response.body, b"confirmed" );
}

#[ tokio::test ]
async fn a_transient_503_is_retried_until_it_succeeds()
{
  let server = MockServer::start().await;
  Mock::given( method( "GET" ) )
    .and( path( "/flaky" ) )
    .respond_with( ResponseTemplate::new( 503 ) )
    .up_to_n_times( 1 )
    .mount( &server )
    .await;
  Mock::given( method( "GET" ) )
    .and( path( "/flaky" ) )
    .respond_with( ResponseTemplate::new( 200 ).set_body_string( "recovered" ) )
    .mount( &server )
    .await;

  let client = client();
  let options = client.get( &format!( "{}/flaky", server.uri() ) ).unwrap();
  let response = client.call( options ).await.unwrap();

  assert_eq!( response.status_code, 200 );
  assert_eq!( response.retry_count, 1 );
}

#[ tokio::test ]
async fn retry_after_above_the_ceiling_gives_up_instead_of_waiting()
{
  let server = MockServer::start().await;
  Mock::given( method( "GET" ) )
    .and( path( "/limited" ) )
    .respond_with( ResponseTemplate::new( 503 ).insert_header( "retry-after", "3600" ) )
    .mount( &server )
    .await;

  let client = client();
  let mut options = client.get( &format!( "{}/limited", server.uri() ) ).unwrap();
  options.retry.max_retry_after = Duration::from_secs( 1 );

  let error = client.call( options ).await.unwrap_err();
  assert!( matches!( error, fetch_engine::EngineError::Http { status : 503, .. } ) );
}

#[ tokio::test ]
async fn cancelling_before_the_response_arrives_yields_a_cancel_error()
{
  let server = MockServer::start().await;
  Mock::given( method( "GET" ) )
    .and( path( "/slow" ) )
    .respond_with( ResponseTemplate::new( 200 ).set_delay( Duration::from_secs( 5 ) ) )
    .mount( &server )
    .await;

  let client = client();
  let options = client.get( &format!( "{}/slow", server.uri() ) ).unwrap();
  let call = client.call( options );
  call.cancel();

  let error = call.await.unwrap_err();
  assert!( matches!( error, fetch_engine::EngineError::Cancel ) );
}
