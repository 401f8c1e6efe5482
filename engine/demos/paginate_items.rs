//! Walk every item across a `Link: rel="next"`-paginated JSON-array endpoint,
//! stopping once 25 items have been printed.

use fetch_engine::{ Client, PaginationConfig };

#[ tokio::main ]
async fn main() -> Result< (), Box< dyn std::error::Error > >
{
  tracing_subscriber::fmt::init();

  let client = Client::new()?;
  let options = client.get( "https://api.github.com/repos/rust-lang/rust/issues?per_page=10" )?
    .header( "user-agent", Some( "fetch_engine-demo" ) );

  let config = PaginationConfig { count_limit : Some( 25 ), ..PaginationConfig::default() };
  let mut pages = client.paginate( options, config );

  let mut seen = 0u64;
  while let Some( item ) = pages.next().await?
  {
    seen += 1;
    let title = item.get( "title" ).and_then( | v | v.as_str() ).unwrap_or( "<untitled>" );
    println!( "{seen:>3}: {title}" );
  }

  Ok( () )
}
