use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use docfeed::{
    ContinuationToken, FeedOptions, InMemoryContainer, OffsetContinuationToken, OffsetLimit,
    OffsetLimitPager, TakeContinuationToken, token,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docfeed")]
#[command(about = "Inspect continuation tokens and exercise resumable OFFSET/LIMIT paging")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build an offset continuation token
    EncodeOffset {
        #[arg(long)]
        offset: u64,
        #[arg(long)]
        source_token: Option<String>,
    },
    /// Parse an offset continuation token
    DecodeOffset { token: String },
    /// Build a limit (take) continuation token
    EncodeTake {
        #[arg(long)]
        limit: u64,
        #[arg(long)]
        source_token: Option<String>,
    },
    /// Show the take/offset/source layers of a continuation
    Inspect { token: String },
    /// Page through an in-memory container with OFFSET/LIMIT
    Demo {
        #[arg(long, default_value_t = 25)]
        documents: usize,
        #[arg(long, default_value_t = 0)]
        offset: u64,
        #[arg(long)]
        limit: Option<u64>,
        #[arg(long, default_value_t = 5)]
        page_size: usize,
        /// Stop after this many pages and print the resume token
        #[arg(long)]
        pages: Option<usize>,
        #[arg(long)]
        resume: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::EncodeOffset {
            offset,
            source_token,
        } => {
            println!("{}", OffsetContinuationToken::new(offset, source_token).encode());
            Ok(())
        }
        Command::DecodeOffset { token } => {
            let parsed = OffsetContinuationToken::try_parse(&token)
                .with_context(|| format!("'{}' is not an offset continuation token", token))?;
            println!("offset:       {}", parsed.offset());
            println!("source token: {}", parsed.source_token().unwrap_or("<null>"));
            Ok(())
        }
        Command::EncodeTake {
            limit,
            source_token,
        } => {
            println!("{}", TakeContinuationToken::new(limit, source_token).encode());
            Ok(())
        }
        Command::Inspect { token } => {
            inspect(&token);
            Ok(())
        }
        Command::Demo {
            documents,
            offset,
            limit,
            page_size,
            pages,
            resume,
        } => demo(documents, offset, limit, page_size, pages, resume).await,
    }
}

fn inspect(text: &str) {
    let layers = token::describe(text);
    let show = |value: Option<u64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    println!("limit remaining:  {}", show(layers.limit_count));
    println!("offset remaining: {}", show(layers.offset));
    println!(
        "source token:     {}",
        layers.source_token.as_deref().unwrap_or("<null>")
    );
}

async fn demo(
    documents: usize,
    offset: u64,
    limit: Option<u64>,
    page_size: usize,
    pages: Option<usize>,
    resume: Option<String>,
) -> Result<()> {
    if page_size == 0 {
        bail!("--page-size must be > 0");
    }

    let container = InMemoryContainer::new("demo");
    container
        .upsert_items((0..documents).map(|i| json!({ "id": format!("doc-{:05}", i), "value": i })))
        .await
        .context("Failed to seed demo container")?;

    let clause = OffsetLimit { offset, limit };
    let mut pager = OffsetLimitPager::new(&container, clause)
        .into_pager(FeedOptions::new().max_item_count(page_size));
    if let Some(token) = resume {
        pager = pager.with_continuation(token);
    }

    let mut page_number = 0;
    let mut total_charge = 0.0;
    while let Some(page) = pager.next_page().await.context("Query failed")? {
        page_number += 1;
        total_charge += page.request_charge;

        let ids: Vec<&str> = page
            .results
            .iter()
            .filter_map(|doc| doc.get("id").and_then(|id| id.as_str()))
            .collect();
        println!(
            "page {:>3}: {} item(s) [{}] charge {:.2}",
            page_number,
            ids.len(),
            ids.join(", "),
            page.request_charge
        );

        if pages.is_some_and(|max| page_number >= max) {
            break;
        }
    }

    println!("total charge: {:.2}", total_charge);
    match pager.continuation() {
        Some(token) => println!("resume with: --resume '{}'", token),
        None => println!("query complete"),
    }
    Ok(())
}
