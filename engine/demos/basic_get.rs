//! Plain `GET` against a real endpoint, printed as status + body length.

use fetch_engine::Client;

#[ tokio::main ]
async fn main() -> Result< (), Box< dyn std::error::Error > >
{
  tracing_subscriber::fmt::init();

  let client = Client::new()?;
  let options = client.get( "https://httpbin.org/get" )?;
  let response = client.call( options ).await?;

  println!( "status: {}", response.status_code );
  println!( "body bytes: {}", response.body.len() );

  Ok( () )
}
