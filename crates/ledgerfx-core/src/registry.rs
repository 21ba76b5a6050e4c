use serde::{Deserialize, Serialize};

use crate::domain::{Currency, CurrencyPair};

/// One issuing account operated by a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAccount {
    pub address: String,
    pub currencies: Vec<String>,
}

/// A known gateway and the issuing accounts it operates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    pub name: String,
    pub accounts: Vec<GatewayAccount>,
}

/// Read-only lookup table over the known gateways.
///
/// Injected into the engine at construction; the engine never mutates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatewayRegistry {
    gateways: Vec<Gateway>,
}

impl GatewayRegistry {
    pub fn new(gateways: Vec<Gateway>) -> Self {
        Self { gateways }
    }

    /// Loads a registry from a JSON array of gateways.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        let gateways: Vec<Gateway> = serde_json::from_str(payload)?;
        Ok(Self::new(gateways))
    }

    /// Issuing address for a gateway name hosting the given currency code.
    /// Name matching is case-insensitive.
    pub fn name_to_address(&self, name: &str, code: &str) -> Option<&str> {
        let gateway = self
            .gateways
            .iter()
            .find(|gateway| gateway.name.eq_ignore_ascii_case(name))?;
        gateway
            .accounts
            .iter()
            .find(|account| {
                account
                    .currencies
                    .iter()
                    .any(|currency| currency.eq_ignore_ascii_case(code))
            })
            .map(|account| account.address.as_str())
    }

    /// Friendly gateway name for an issuing address, when known.
    pub fn address_to_name(&self, address: &str) -> Option<&str> {
        self.gateways.iter().find_map(|gateway| {
            gateway
                .accounts
                .iter()
                .any(|account| account.address == address)
                .then_some(gateway.name.as_str())
        })
    }

    /// Every known issued currency, scoped to its issuing account.
    pub fn issued_currencies(&self) -> Vec<Currency> {
        self.gateways
            .iter()
            .flat_map(|gateway| {
                gateway.accounts.iter().flat_map(move |account| {
                    account.currencies.iter().map(move |code| Currency::Issued {
                        code: code.to_ascii_uppercase(),
                        issuer: account.address.clone(),
                        name: Some(gateway.name.clone()),
                    })
                })
            })
            .collect()
    }

    /// Every known market pair, each issued currency quoted against the
    /// native unit.
    pub fn market_pairs(&self) -> Vec<CurrencyPair> {
        self.issued_currencies()
            .into_iter()
            .map(CurrencyPair::native_quoted)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.gateways.is_empty()
    }

    /// Small built-in registry for demos and the CLI default.
    pub fn demo() -> Self {
        Self::new(vec![
            Gateway {
                name: "Bitstamp".to_owned(),
                accounts: vec![GatewayAccount {
                    address: "rvYAfWj5gh67oV6fW32ZzP3Aw4Eubs59B".to_owned(),
                    currencies: vec!["USD".to_owned(), "BTC".to_owned()],
                }],
            },
            Gateway {
                name: "LedgerCN".to_owned(),
                accounts: vec![GatewayAccount {
                    address: "rnuF96W4SZoCJmbHYBFoJZpR8eCaxNvekK".to_owned(),
                    currencies: vec!["CNY".to_owned()],
                }],
            },
        ])
    }
}
