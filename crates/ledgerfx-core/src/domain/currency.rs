use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::registry::GatewayRegistry;

/// The ledger's own currency code. The native unit never carries an issuer.
pub const NATIVE_CODE: &str = "XPS";

const MAX_CODE_LEN: usize = 40;

/// Currency/issuer input as it appears on the wire, prior to validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCurrency {
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RawCurrency {
    pub fn new(currency: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            issuer: None,
            name: None,
        }
    }

    pub fn with_issuer(currency: impl Into<String>, issuer: impl Into<String>) -> Self {
        Self {
            currency: currency.into(),
            issuer: Some(issuer.into()),
            name: None,
        }
    }
}

/// Canonical currency identifier.
///
/// Constructed only through [`Currency::parse`], or deserialized from an
/// already-canonical payload. The native unit is a distinct variant so an
/// issued currency without an issuer is unrepresentable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawCurrency", into = "RawCurrency")]
pub enum Currency {
    Native,
    Issued {
        code: String,
        issuer: String,
        name: Option<String>,
    },
}

impl Currency {
    /// Validates raw input against the gateway registry.
    ///
    /// The native code must not carry an issuer. Every other code requires
    /// one, supplied either as a raw ledger address (friendly name resolved
    /// best-effort) or as a registry-known gateway name.
    pub fn parse(raw: &RawCurrency, registry: &GatewayRegistry) -> Result<Self, ValidationError> {
        let code = canonical_code(&raw.currency)?;
        if code == NATIVE_CODE {
            if raw.issuer.is_some() {
                return Err(ValidationError::NativeWithIssuer {
                    native: NATIVE_CODE,
                });
            }
            return Ok(Self::Native);
        }

        let Some(issuer) = raw.issuer.as_deref() else {
            return Err(ValidationError::IssuerRequired { code });
        };

        if is_address(issuer) {
            let name = registry.address_to_name(issuer).map(str::to_owned);
            return Ok(Self::Issued {
                code,
                issuer: issuer.to_owned(),
                name,
            });
        }

        let Some(address) = registry.name_to_address(issuer, &code) else {
            return Err(ValidationError::UnknownGateway {
                name: issuer.to_owned(),
                code,
            });
        };
        let address = address.to_owned();
        let name = registry.address_to_name(&address).map(str::to_owned);
        Ok(Self::Issued {
            code,
            issuer: address,
            name,
        })
    }

    pub const fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Native => NATIVE_CODE,
            Self::Issued { code, .. } => code,
        }
    }

    pub fn issuer(&self) -> Option<&str> {
        match self {
            Self::Native => None,
            Self::Issued { issuer, .. } => Some(issuer),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Native => None,
            Self::Issued { name, .. } => name.as_deref(),
        }
    }
}

// Asset identity is (code, issuer); the friendly name is display-only.
impl PartialEq for Currency {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Native, Self::Native) => true,
            (
                Self::Issued {
                    code: code_a,
                    issuer: issuer_a,
                    ..
                },
                Self::Issued {
                    code: code_b,
                    issuer: issuer_b,
                    ..
                },
            ) => code_a == code_b && issuer_a == issuer_b,
            _ => false,
        }
    }
}

impl Eq for Currency {}

impl Hash for Currency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code().hash(state);
        self.issuer().hash(state);
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Native => f.write_str(NATIVE_CODE),
            Self::Issued { code, issuer, .. } => write!(f, "{code}.{issuer}"),
        }
    }
}

impl TryFrom<RawCurrency> for Currency {
    type Error = ValidationError;

    /// Shape-only conversion used when deserializing canonical payloads.
    /// Registry name resolution is not applied here; see [`Currency::parse`].
    fn try_from(raw: RawCurrency) -> Result<Self, Self::Error> {
        let code = canonical_code(&raw.currency)?;
        if code == NATIVE_CODE {
            return match raw.issuer {
                None => Ok(Self::Native),
                Some(_) => Err(ValidationError::NativeWithIssuer {
                    native: NATIVE_CODE,
                }),
            };
        }
        match raw.issuer {
            Some(issuer) => Ok(Self::Issued {
                code,
                issuer,
                name: raw.name,
            }),
            None => Err(ValidationError::IssuerRequired { code }),
        }
    }
}

impl From<Currency> for RawCurrency {
    fn from(value: Currency) -> Self {
        match value {
            Currency::Native => RawCurrency::new(NATIVE_CODE),
            Currency::Issued { code, issuer, name } => RawCurrency {
                currency: code,
                issuer: Some(issuer),
                name,
            },
        }
    }
}

/// One tradable market, quoted as counter priced in base units.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurrencyPair {
    pub base: Currency,
    pub counter: Currency,
}

/// Currency pair input as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCurrencyPair {
    pub base: RawCurrency,
    pub counter: RawCurrency,
}

impl CurrencyPair {
    /// Requires both sides to validate independently.
    pub fn parse(
        raw: &RawCurrencyPair,
        registry: &GatewayRegistry,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            base: Currency::parse(&raw.base, registry)?,
            counter: Currency::parse(&raw.counter, registry)?,
        })
    }

    /// An issued currency quoted against the native unit.
    pub fn native_quoted(base: Currency) -> Self {
        Self {
            base,
            counter: Currency::Native,
        }
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.counter)
    }
}

fn canonical_code(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyCurrency);
    }
    let code = trimmed.to_ascii_uppercase();
    if code.len() > MAX_CODE_LEN || !code.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidCurrencyCode {
            value: trimmed.to_owned(),
        });
    }
    Ok(code)
}

/// Ledger account addresses are r-prefixed base58, 25 to 35 characters.
fn is_address(input: &str) -> bool {
    let len = input.len();
    input.starts_with('r')
        && (25..=35).contains(&len)
        && input
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() && !matches!(b, b'0' | b'O' | b'I' | b'l'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Gateway, GatewayAccount, GatewayRegistry};

    const BITSTAMP_ADDRESS: &str = "rvYAfWj5gh67oV6fW32ZzP3Aw4Eubs59B";

    fn registry() -> GatewayRegistry {
        GatewayRegistry::new(vec![Gateway {
            name: "Bitstamp".to_owned(),
            accounts: vec![GatewayAccount {
                address: BITSTAMP_ADDRESS.to_owned(),
                currencies: vec!["USD".to_owned(), "BTC".to_owned()],
            }],
        }])
    }

    #[test]
    fn native_never_carries_an_issuer() {
        let parsed = Currency::parse(&RawCurrency::new("xps"), &registry()).expect("must parse");
        assert!(parsed.is_native());

        let err = Currency::parse(
            &RawCurrency::with_issuer("XPS", BITSTAMP_ADDRESS),
            &registry(),
        )
        .expect_err("must fail");
        assert!(matches!(err, ValidationError::NativeWithIssuer { .. }));
    }

    #[test]
    fn issued_currency_requires_an_issuer() {
        let err = Currency::parse(&RawCurrency::new("USD"), &registry()).expect_err("must fail");
        assert!(matches!(err, ValidationError::IssuerRequired { .. }));
    }

    #[test]
    fn address_and_gateway_name_produce_the_same_canonical_currency() {
        let registry = registry();
        let by_address = Currency::parse(
            &RawCurrency::with_issuer("usd", BITSTAMP_ADDRESS),
            &registry,
        )
        .expect("must parse");
        let by_name = Currency::parse(&RawCurrency::with_issuer("USD", "bitstamp"), &registry)
            .expect("must parse");

        assert_eq!(by_address, by_name);
        assert_eq!(by_address.issuer(), Some(BITSTAMP_ADDRESS));
        assert_eq!(by_address.name(), Some("Bitstamp"));
        assert_eq!(by_name.name(), Some("Bitstamp"));
    }

    #[test]
    fn unknown_gateway_name_is_rejected() {
        let err = Currency::parse(&RawCurrency::with_issuer("USD", "nosuch"), &registry())
            .expect_err("must fail");
        assert!(matches!(err, ValidationError::UnknownGateway { .. }));
    }

    #[test]
    fn pair_requires_both_sides_to_validate() {
        let registry = registry();
        let raw = RawCurrencyPair {
            base: RawCurrency::with_issuer("BTC", BITSTAMP_ADDRESS),
            counter: RawCurrency::new("USD"),
        };
        let err = CurrencyPair::parse(&raw, &registry).expect_err("must fail");
        assert!(matches!(err, ValidationError::IssuerRequired { .. }));
    }

    #[test]
    fn equality_ignores_the_friendly_name() {
        let with_name = Currency::Issued {
            code: "USD".to_owned(),
            issuer: BITSTAMP_ADDRESS.to_owned(),
            name: Some("Bitstamp".to_owned()),
        };
        let without_name = Currency::Issued {
            code: "USD".to_owned(),
            issuer: BITSTAMP_ADDRESS.to_owned(),
            name: None,
        };
        assert_eq!(with_name, without_name);
    }

    #[test]
    fn serializes_to_the_wire_shape() {
        let currency = Currency::parse(
            &RawCurrency::with_issuer("USD", BITSTAMP_ADDRESS),
            &registry(),
        )
        .expect("must parse");
        let json = serde_json::to_value(&currency).expect("must serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "currency": "USD",
                "issuer": BITSTAMP_ADDRESS,
                "name": "Bitstamp",
            })
        );

        let native = serde_json::to_value(Currency::Native).expect("must serialize");
        assert_eq!(native, serde_json::json!({ "currency": "XPS" }));
    }
}
