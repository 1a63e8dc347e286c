//! Demo 1: Cross-venue quotes
//!
//! Showcases: one `Exchange` contract over many venues, concurrent requests
//!
//! Run: cargo run --bin quotes -- --pair BTC/USDT binance okex kucoin

use clap::Parser;
use colored::*;
use futures::future::join_all;
use tradewire_venues::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Print the ticker for one pair across several venues")]
struct Args {
    /// Pair as BASE/QUOTE
    #[arg(short, long, default_value = "BTC/USDT")]
    pair: CurrencyPair,

    /// Venues to query; all of them when omitted
    venues: Vec<Venue>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let venues = if args.venues.is_empty() {
        Venue::ALL.to_vec()
    } else {
        args.venues
    };

    println!("{}", "═".repeat(78).cyan());
    println!("{}", format!("  {} ACROSS {} VENUES", args.pair, venues.len()).cyan().bold());
    println!("{}", "═".repeat(78).cyan());
    println!();

    let connected = connect_all(&venues, |_| VenueConfig::new()).await;
    let pair = &args.pair;
    let lookups = connected.iter().map(|(venue, exchange)| async move {
        let ticker = match exchange {
            Ok(exchange) => exchange.get_ticker(pair).await,
            Err(err) => Err(err.clone()),
        };
        (*venue, ticker)
    });
    let results = join_all(lookups).await;

    println!(
        "  {:<14} {:>14} {:>14} {:>14} {:>14}",
        "VENUE".white().bold(),
        "LAST".white().bold(),
        "BID".white().bold(),
        "ASK".white().bold(),
        "VOLUME".white().bold()
    );
    println!("  {}", "─".repeat(74));

    let mut best_bid: Option<(Venue, Decimal)> = None;
    let mut best_ask: Option<(Venue, Decimal)> = None;
    for (venue, ticker) in results {
        match ticker {
            Ok(t) => {
                println!(
                    "  {:<14} {:>14} {:>14} {:>14} {:>14}",
                    venue.to_string(),
                    t.last.normalize().to_string(),
                    t.buy.normalize().to_string().green(),
                    t.sell.normalize().to_string().red(),
                    t.vol.round_dp(2).to_string().dimmed()
                );
                if !t.buy.is_zero() && best_bid.map_or(true, |(_, b)| t.buy > b) {
                    best_bid = Some((venue, t.buy));
                }
                if !t.sell.is_zero() && best_ask.map_or(true, |(_, a)| t.sell < a) {
                    best_ask = Some((venue, t.sell));
                }
            }
            Err(err) if err.is_not_supported() => {
                println!("  {:<14} {}", venue.to_string(), "not supported".dimmed());
            }
            Err(err) => {
                println!("  {:<14} {} {}", venue.to_string(), "✗".red(), err.to_string().red());
            }
        }
    }

    println!();
    if let (Some((bid_venue, bid)), Some((ask_venue, ask))) = (best_bid, best_ask) {
        println!("  {} {} on {}", "Best bid:".green(), bid.normalize(), bid_venue);
        println!("  {} {} on {}", "Best ask:".red(), ask.normalize(), ask_venue);
        if bid > ask {
            println!(
                "  {} {} crossed by {}",
                "⚠".yellow(),
                "Venues are".yellow(),
                (bid - ask).normalize()
            );
        }
    }

    Ok(())
}
