use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, FromRepr};

/// Currencies a `One` node can be denominated in.
///
/// The discriminant is the index used by `Node::One` and by every
/// `CurrencyVector`, so the order here is part of the contract format.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumCount,
    EnumIter,
    FromRepr,
)]
#[strum(ascii_case_insensitive)]
pub enum Currency {
    #[serde(rename = "USD")]
    #[strum(serialize = "USD")]
    Usd = 0,
    #[serde(rename = "EUR")]
    #[strum(serialize = "EUR")]
    Eur = 1,
    #[serde(rename = "GBP")]
    #[strum(serialize = "GBP")]
    Gbp = 2,
    #[serde(rename = "JPY")]
    #[strum(serialize = "JPY")]
    Jpy = 3,
    #[serde(rename = "CNY")]
    #[strum(serialize = "CNY")]
    Cny = 4,
    #[serde(rename = "SGD")]
    #[strum(serialize = "SGD")]
    Sgd = 5,
}

impl Currency {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::from_repr(index)
    }
}

impl From<Currency> for usize {
    fn from(currency: Currency) -> Self {
        currency.index()
    }
}
