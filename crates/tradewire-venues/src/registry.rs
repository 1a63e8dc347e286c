//! Build any venue's adapter behind `dyn Exchange`

use tracing::{info, instrument};
use tradewire_types::ExchangeResult;

use crate::config::VenueConfig;
use crate::exchange::Exchange;
use crate::venue::Venue;
use crate::venues::{Atop, Binance, Bitfinex, Bitstamp, Bittrex, Coinbase, Kraken, KuCoin, OKEx, Poloniex};

/// Construct and connect the adapter for `venue`
///
/// Venues with a server-time endpoint align their clock here. A failed time
/// fetch is logged and the adapter falls back to the local clock.
///
/// # Example
///
/// ```no_run
/// use tradewire_types::CurrencyPair;
/// use tradewire_venues::{connect, Venue, VenueConfig};
///
/// # async fn run() -> tradewire_types::ExchangeResult<()> {
/// let exchange = connect("kraken".parse::<Venue>()?, VenueConfig::new()).await?;
/// let ticker = exchange.get_ticker(&CurrencyPair::BTC_USD).await?;
/// println!("{} last {}", exchange.venue(), ticker.last);
/// # Ok(())
/// # }
/// ```
#[instrument(skip(config))]
pub async fn connect(venue: Venue, config: VenueConfig) -> ExchangeResult<Box<dyn Exchange>> {
    let exchange: Box<dyn Exchange> = match venue {
        Venue::Binance => Box::new(Binance::connect(config).await?),
        Venue::Kraken => Box::new(Kraken::connect(config).await?),
        Venue::OKEx => Box::new(OKEx::connect(config).await?),
        Venue::Bitfinex => Box::new(Bitfinex::connect(config).await?),
        Venue::Bitstamp => Box::new(Bitstamp::connect(config).await?),
        Venue::Poloniex => Box::new(Poloniex::connect(config).await?),
        Venue::Atop => Box::new(Atop::connect(config).await?),
        Venue::KuCoin => Box::new(KuCoin::connect(config).await?),
        Venue::Coinbase => Box::new(Coinbase::connect(config).await?),
        Venue::Bittrex => Box::new(Bittrex::connect(config).await?),
    };
    info!(venue = exchange.venue(), "Connected adapter");
    Ok(exchange)
}

/// Connect several venues with the same settings, in order
pub async fn connect_all(
    venues: &[Venue],
    config: impl Fn(Venue) -> VenueConfig,
) -> Vec<(Venue, ExchangeResult<Box<dyn Exchange>>)> {
    let mut connected = Vec::with_capacity(venues.len());
    for venue in venues {
        connected.push((*venue, connect(*venue, config(*venue)).await));
    }
    connected
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tradewire_auth::FixedClock;
    use tradewire_http::MockHttpClient;

    const NOW: i64 = 1_700_000_000_000;

    fn config(mock: Arc<MockHttpClient>) -> VenueConfig {
        VenueConfig::new()
            .with_http_client(mock)
            .with_clock(Arc::new(FixedClock::new(NOW)))
    }

    #[tokio::test]
    async fn test_every_venue_reports_its_name() {
        for venue in Venue::ALL {
            // Clock syncs that find no queued response are logged, not fatal
            let mock = Arc::new(MockHttpClient::new());
            let exchange = connect(venue, config(mock)).await.unwrap();
            assert_eq!(exchange.venue(), venue.name());
        }
    }

    #[tokio::test]
    async fn test_connect_all_keeps_order() {
        let venues = [Venue::Bittrex, Venue::Coinbase];
        let connected = connect_all(&venues, |_| config(Arc::new(MockHttpClient::new()))).await;
        assert_eq!(connected.len(), 2);
        assert_eq!(connected[0].0, Venue::Bittrex);
        assert_eq!(connected[1].1.as_ref().unwrap().venue(), "coinbase.com");
    }

    #[tokio::test]
    async fn test_unsupported_call_through_registry() {
        let mock = Arc::new(MockHttpClient::new());
        let exchange = connect(Venue::Bittrex, config(mock)).await.unwrap();
        let err = exchange.get_account().await.unwrap_err();
        assert!(err.is_not_supported());
    }
}
