//! Balance snapshots and pagination shapes

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::currency::Currency;
use crate::pair::CurrencyPair;

/// Balance of one currency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubAccount {
    pub currency: Currency,
    pub available: Decimal,
    /// Held by open orders or otherwise locked
    pub frozen: Decimal,
    /// Borrowed amount (margin accounts)
    pub loan: Decimal,
}

impl SubAccount {
    pub fn new(currency: Currency, available: Decimal, frozen: Decimal) -> Self {
        Self {
            currency,
            available,
            frozen,
            loan: Decimal::ZERO,
        }
    }

    pub fn with_loan(mut self, loan: Decimal) -> Self {
        self.loan = loan;
        self
    }

    pub fn total(&self) -> Decimal {
        self.available + self.frozen
    }

    pub fn is_empty(&self) -> bool {
        self.available.is_zero() && self.frozen.is_zero() && self.loan.is_zero()
    }
}

/// Account snapshot; each currency appears once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub venue: String,
    pub sub_accounts: HashMap<Currency, SubAccount>,
}

impl Account {
    pub fn new(venue: impl Into<String>) -> Self {
        Self {
            venue: venue.into(),
            sub_accounts: HashMap::new(),
        }
    }

    /// Add a balance, summing into an existing entry for the same currency
    ///
    /// Venues that split one currency across wallet types (or report an
    /// alias next to the canonical code) collapse into one entry this way.
    pub fn add(&mut self, sub: SubAccount) {
        match self.sub_accounts.get_mut(&sub.currency) {
            Some(existing) => {
                existing.available += sub.available;
                existing.frozen += sub.frozen;
                existing.loan += sub.loan;
            }
            None => {
                self.sub_accounts.insert(sub.currency.clone(), sub);
            }
        }
    }

    pub fn get(&self, currency: &Currency) -> Option<&SubAccount> {
        self.sub_accounts.get(currency)
    }

    /// Available balance, zero when the currency is absent
    pub fn available(&self, currency: &Currency) -> Decimal {
        self.get(currency).map(|s| s.available).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sub_accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_accounts.is_empty()
    }
}

/// Isolated margin balances for one pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginAccount {
    pub pair: CurrencyPair,
    pub base: SubAccount,
    pub quote: SubAccount,
    pub risk_rate: Option<Decimal>,
    pub liquidation_price: Option<Decimal>,
}

/// Page of history results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// True when the venue has more results after this page
    pub has_more: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, has_more: bool) -> Self {
        Self { items, has_more }
    }

    /// For bare-list endpoints: a full page suggests there is more
    pub fn from_limit(items: Vec<T>, limit: usize) -> Self {
        let has_more = limit > 0 && items.len() >= limit;
        Self { items, has_more }
    }
}

/// Requested page; `page` starts at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// Zero-based offset of the first item
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 100,
        }
    }
}
