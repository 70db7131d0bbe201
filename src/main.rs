mod ai;
mod app;
mod config;
mod db;
mod error;
mod feed;
mod models;
mod output;

use app::App;
use config::Config;
use error::Result;

const USAGE: &str = "Usage: rss-digest <command>

Commands:
  add-feed <url>   Register an RSS/Atom feed
  fetch            Download feeds and store new articles
  digest [id]      Summarize pending articles (or one article by id)
  render           Write the weekly Markdown digest
  run              fetch + digest + render";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        println!("{}", USAGE);
        return Ok(());
    };

    let mut config = Config::load()?;
    // provider settings come from the environment when present
    config.apply_env();

    let app = App::new(&config).await?;

    match command.as_str() {
        "add-feed" => {
            let Some(url) = args.get(2) else {
                println!("{}", USAGE);
                return Ok(());
            };
            let feed = app.add_feed(url).await?;
            println!("Added feed \"{}\" ({})", feed.title, feed.url);
        }
        "fetch" => {
            let inserted = app.fetch_articles().await?;
            println!("Fetched {} new articles", inserted);
        }
        "digest" => match args.get(2) {
            Some(id) => {
                let id: i64 = id
                    .parse()
                    .map_err(|_| anyhow::anyhow!("invalid article id: {}", id))?;
                if app.digest_one(id).await? {
                    println!("Digested article {}", id);
                } else {
                    println!("Article {} could not be digested, see log", id);
                }
            }
            None => {
                let (digested, pending, usage) = app.digest_pending().await?;
                println!(
                    "Digested {}/{} articles ({} tokens)",
                    digested, pending, usage.total_tokens
                );
            }
        },
        "render" => {
            let path = app.render_weekly().await?;
            println!("Wrote {}", path.display());
        }
        "run" => {
            let path = app.run().await?;
            println!("Wrote {}", path.display());
        }
        other => {
            println!("Unknown command: {}\n\n{}", other, USAGE);
        }
    }

    Ok(())
}
