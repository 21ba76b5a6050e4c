mod currency;
mod window;

pub use currency::{Currency, CurrencyPair, RawCurrency, RawCurrencyPair, NATIVE_CODE};
pub use window::{NamedRange, TimeWindow};
