use serde::{Deserialize, Serialize};

pub type SecurityId = u64;

/// Listing venue for a security
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Exchange {
    #[default]
    Asx,
    Nyse,
    Nasdaq,
}

impl Exchange {
    pub fn parse(s: &str) -> Option<Exchange> {
        match s.to_uppercase().as_str() {
            "ASX" => Some(Exchange::Asx),
            "NYSE" => Some(Exchange::Nyse),
            "NASDAQ" => Some(Exchange::Nasdaq),
            _ => None,
        }
    }
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Exchange::Asx => "ASX",
            Exchange::Nyse => "NYSE",
            Exchange::Nasdaq => "NASDAQ",
        };
        write!(f, "{}", s)
    }
}

/// Settlement currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    Aud,
    Usd,
}

impl Currency {
    pub fn parse(s: &str) -> Option<Currency> {
        match s.to_uppercase().as_str() {
            "AUD" => Some(Currency::Aud),
            "USD" => Some(Currency::Usd),
            _ => None,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Currency::Aud => "AUD",
            Currency::Usd => "USD",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AssetType {
    #[default]
    Share,
    Etf,
}

impl AssetType {
    pub fn parse(s: &str) -> Option<AssetType> {
        match s.to_uppercase().as_str() {
            "SHARE" => Some(AssetType::Share),
            "ETF" => Some(AssetType::Etf),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AssetType::Share => "SHARE",
            AssetType::Etf => "ETF",
        };
        write!(f, "{}", s)
    }
}

/// A tradable instrument, created on first reference during import.
///
/// Identity is the ticker; descriptive fields may be edited later but
/// everything else is fixed once a transaction references the security.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Security {
    pub id: SecurityId,
    pub ticker: String,
    pub name: String,
    pub exchange: Exchange,
    pub currency: Currency,
    pub asset_type: AssetType,
}

impl std::fmt::Display for Security {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ticker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exchange_parse_case_insensitive() {
        assert_eq!(Exchange::parse("asx"), Some(Exchange::Asx));
        assert_eq!(Exchange::parse("NASDAQ"), Some(Exchange::Nasdaq));
        assert_eq!(Exchange::parse("LSE"), None);
    }

    #[test]
    fn currency_parse() {
        assert_eq!(Currency::parse("aud"), Some(Currency::Aud));
        assert_eq!(Currency::parse("USD"), Some(Currency::Usd));
        assert_eq!(Currency::parse("GBP"), None);
    }

    #[test]
    fn asset_type_roundtrip_display() {
        assert_eq!(AssetType::parse("etf"), Some(AssetType::Etf));
        assert_eq!(AssetType::Etf.to_string(), "ETF");
        assert_eq!(AssetType::Share.to_string(), "SHARE");
    }
}
