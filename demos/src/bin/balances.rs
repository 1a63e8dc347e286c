//! Demo 3: Balances and Open Orders
//!
//! Showcases: signed requests, credentials from the environment
//!
//! Run: BINANCE_API_KEY=... BINANCE_API_SECRET=... cargo run --bin balances -- binance
//!
//! Venues that need a passphrase or client id read `{VENUE}_PASSPHRASE` and
//! `{VENUE}_CLIENT_ID` as well.

use clap::Parser;
use colored::*;
use tradewire_venues::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Print balances and open orders for one venue")]
struct Args {
    venue: Venue,

    /// Also list open orders for this pair
    #[arg(short, long)]
    pair: Option<CurrencyPair>,

    /// Show zero balances
    #[arg(long)]
    all: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let credentials = Credentials::from_env(args.venue.env_prefix())?;
    let exchange = connect(args.venue, VenueConfig::new().with_credentials(credentials)).await?;

    println!("{}", "═".repeat(60).cyan());
    println!("{}", format!("  {} ACCOUNT", exchange.venue().to_uppercase()).cyan().bold());
    println!("{}", "═".repeat(60).cyan());
    println!();

    let account = exchange.get_account().await?;
    let mut balances: Vec<_> = account
        .sub_accounts
        .values()
        .filter(|sub| args.all || !sub.is_empty())
        .collect();
    balances.sort_by(|a, b| a.currency.to_string().cmp(&b.currency.to_string()));

    println!(
        "  {:<8} {:>16} {:>16} {:>12}",
        "ASSET".white().bold(),
        "AVAILABLE".white().bold(),
        "FROZEN".white().bold(),
        "LOAN".white().bold()
    );
    println!("  {}", "─".repeat(56));
    for sub in &balances {
        println!(
            "  {:<8} {:>16} {:>16} {:>12}",
            sub.currency.to_string(),
            sub.available.normalize().to_string().green(),
            sub.frozen.normalize().to_string().yellow(),
            sub.loan.normalize().to_string().dimmed()
        );
    }
    if balances.is_empty() {
        println!("  {}", "no balances".dimmed());
    }

    if let Some(pair) = args.pair {
        println!();
        println!("{}", format!("  OPEN ORDERS {}", pair).cyan().bold());
        match exchange.get_open_orders(&pair).await {
            Ok(orders) if orders.is_empty() => println!("  {}", "none".dimmed()),
            Ok(orders) => {
                for order in orders {
                    let side = if order.side.is_buy() {
                        order.side.to_string().green()
                    } else {
                        order.side.to_string().red()
                    };
                    println!(
                        "  {:<20} {:<12} {:>14} {:>10}/{:<10} {}",
                        order.order_id,
                        side,
                        order.price.normalize(),
                        order.deal_amount.normalize(),
                        order.amount.normalize(),
                        order.status.to_string().dimmed()
                    );
                }
            }
            Err(err) if err.is_not_supported() => println!("  {}", "not supported".dimmed()),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(())
}
