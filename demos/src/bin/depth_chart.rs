//! Demo 2: ASCII Depth Chart
//!
//! Showcases: normalized depth from any venue, sorted and trimmed
//!
//! Run: cargo run --bin depth_chart -- kraken --pair BTC/USD --levels 10

use clap::Parser;
use colored::*;
use std::time::Duration;
use tradewire_venues::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Poll one venue's order book and draw it")]
struct Args {
    venue: Venue,

    #[arg(short, long, default_value = "BTC/USDT")]
    pair: CurrencyPair,

    /// Levels per side
    #[arg(short, long, default_value_t = 10)]
    levels: usize,

    /// Seconds between polls
    #[arg(short, long, default_value_t = 2)]
    interval: u64,

    /// Number of polls; zero runs until interrupted
    #[arg(short, long, default_value_t = 0)]
    count: u64,
}

fn bar_len(amount: Decimal, max: Decimal, width: usize) -> usize {
    if max.is_zero() {
        return 0;
    }
    ((amount / max) * Decimal::from(width))
        .trunc()
        .to_string()
        .parse::<usize>()
        .unwrap_or(0)
        .min(width)
}

fn draw_depth_chart(depth: &Depth, base: &Currency) {
    let half_width = 25;
    let max_vol = depth
        .bids
        .iter()
        .chain(depth.asks.iter())
        .map(|l| l.amount)
        .max()
        .unwrap_or(Decimal::ONE);

    // Asks highest first
    for level in depth.asks.iter().rev() {
        let len = bar_len(level.amount, max_vol, half_width);
        println!(
            "  {:>12.4} │{}{}│ {:<12}",
            level.amount,
            " ".repeat(half_width - len),
            "█".repeat(len).red(),
            level.price.normalize()
        );
    }

    let spread = depth.spread().map(|s| s.normalize().to_string()).unwrap_or_else(|| "-".into());
    println!(
        "  {:>12} ├{}┤ {}",
        "",
        "─".repeat(half_width * 2),
        format!("SPREAD: {}", spread).yellow()
    );

    for level in &depth.bids {
        let len = bar_len(level.amount, max_vol, half_width);
        println!(
            "  {:>12.4} │{}{}│ {:<12}",
            level.amount,
            "█".repeat(len).green(),
            " ".repeat(half_width - len),
            level.price.normalize()
        );
    }

    println!();
    println!(
        "  {} {:.4} {}  {} {:.4} {}",
        "Bid Vol:".green(),
        depth.bids.iter().map(|l| l.amount).sum::<Decimal>(),
        base,
        "Ask Vol:".red(),
        depth.asks.iter().map(|l| l.amount).sum::<Decimal>(),
        base
    );
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();
    let exchange = connect(args.venue, VenueConfig::new()).await?;
    println!("{} Connected to {}", "✓".green(), exchange.venue());

    let mut polls = 0u64;
    loop {
        match exchange.get_depth(args.levels, &args.pair).await {
            Ok(depth) => {
                // Clear screen
                print!("\x1B[2J\x1B[H");
                println!("{}", "═".repeat(70).cyan());
                println!(
                    "{}{}",
                    format!("  {} DEPTH CHART", args.pair).cyan().bold(),
                    format!("  ({})", exchange.venue()).dimmed()
                );
                println!("{}", "═".repeat(70).cyan());
                println!();
                println!("  {} = Asks (Sell)    {} = Bids (Buy)", "███".red(), "███".green());
                println!();

                draw_depth_chart(&depth, &args.pair.base);

                println!();
                println!("  {} {}", "Updated:".dimmed(), chrono::Local::now().format("%H:%M:%S%.3f"));
            }
            Err(err) if err.is_retryable() => {
                println!("{} {}", "⚠".yellow(), err.to_string().yellow());
            }
            Err(err) => return Err(err.into()),
        }

        polls += 1;
        if args.count > 0 && polls >= args.count {
            break;
        }
        tokio::time::sleep(Duration::from_secs(args.interval)).await;
    }

    Ok(())
}
