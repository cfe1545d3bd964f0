//! Token table with per-chain addresses and decimal overrides.
//!
//! Symbols are canonical (ETH, BTC); the on-chain addresses point at the
//! wrapped representation on each chain. `normalize_symbol` collapses the
//! wrapped spelling CEXs sometimes use so both sides key the same matrix
//! row.

use dashmap::DashMap;

use crate::config::chains::ChainId;

/// Token configuration. Addresses are the wrapped form where the canonical
/// asset is native (WETH for ETH, WBNB for BNB, ...).
#[derive(Debug, Clone, Copy)]
pub struct Token {
    pub symbol: &'static str,
    pub name: &'static str,
    /// Default decimal scale; per-chain overrides win
    pub decimals: u8,
    pub addresses: &'static [(ChainId, &'static str)],
    /// Some bridged representations differ from canonical (USDT/USDC are
    /// 18 decimals on BSC)
    pub chain_decimals: &'static [(ChainId, u8)],
    /// Seed USD price for trade sizing before the first CEX refresh
    pub approx_price_usd: f64,
}

impl Token {
    pub fn address(&self, chain_id: ChainId) -> Option<&'static str> {
        self.addresses
            .iter()
            .find(|(c, _)| *c == chain_id)
            .map(|(_, a)| *a)
    }

    pub fn decimals_on(&self, chain_id: ChainId) -> u8 {
        self.chain_decimals
            .iter()
            .find(|(c, _)| *c == chain_id)
            .map(|(_, d)| *d)
            .unwrap_or(self.decimals)
    }
}

use ChainId::*;

pub static TOKENS: &[Token] = &[
    Token {
        symbol: "ETH",
        name: "Ether (wrapped)",
        decimals: 18,
        addresses: &[
            (Ethereum, "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2"),
            (Arbitrum, "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1"),
            (Optimism, "0x4200000000000000000000000000000000000006"),
            (Base, "0x4200000000000000000000000000000000000006"),
            (Polygon, "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619"),
            (Bsc, "0x2170Ed0880ac9A755fd29B2688956BD959F933F8"),
        ],
        chain_decimals: &[],
        approx_price_usd: 3000.0,
    },
    Token {
        symbol: "BTC",
        name: "Bitcoin (wrapped)",
        decimals: 8,
        addresses: &[
            (Ethereum, "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599"),
            (Polygon, "0x1BFD67037B42Cf73acF2047067bd4F2C47D9BfD6"),
            (Arbitrum, "0x2f2a2543B76A4166549F7aaB2e75Bef0aefC5B0f"),
            (Optimism, "0x68f180fcCe6836688e9084f035309E29Bf0A2095"),
        ],
        chain_decimals: &[],
        approx_price_usd: 65000.0,
    },
    Token {
        symbol: "USDT",
        name: "Tether USD",
        decimals: 6,
        addresses: &[
            (Ethereum, "0xdAC17F958D2ee523a2206206994597C13D831ec7"),
            (Polygon, "0xc2132D05D31c914a87C6611C10748AEb04B58e8F"),
            (Arbitrum, "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9"),
            (Optimism, "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58"),
            (Bsc, "0x55d398326f99059fF775485246999027B3197955"),
            (Avalanche, "0x9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7"),
        ],
        chain_decimals: &[(Bsc, 18)],
        approx_price_usd: 1.0,
    },
    Token {
        symbol: "USDC",
        name: "USD Coin",
        decimals: 6,
        addresses: &[
            (Ethereum, "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
            (Polygon, "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
            (Arbitrum, "0xaf88d065e77c8cC2239327C5EDb3A432268e5831"),
            (Optimism, "0x7F5c764cBc14f9669B88837ca1490cCa17c31607"),
            (Base, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
            (Bsc, "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
            (Avalanche, "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E"),
        ],
        chain_decimals: &[(Bsc, 18)],
        approx_price_usd: 1.0,
    },
    Token {
        symbol: "DAI",
        name: "Dai Stablecoin",
        decimals: 18,
        addresses: &[
            (Ethereum, "0x6B175474E89094C44Da98b954EedeAC495271d0F"),
            (Polygon, "0x8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063"),
            (Arbitrum, "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1"),
            (Optimism, "0xDA10009cBd5D07dd0CeCc66161FC93D7c9000da1"),
        ],
        chain_decimals: &[],
        approx_price_usd: 1.0,
    },
    Token {
        symbol: "BNB",
        name: "BNB (wrapped)",
        decimals: 18,
        addresses: &[(Bsc, "0xbb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c")],
        chain_decimals: &[],
        approx_price_usd: 500.0,
    },
    Token {
        symbol: "MATIC",
        name: "Polygon (wrapped)",
        decimals: 18,
        addresses: &[(Polygon, "0x0d500B1d8E8eF31E21C99d1Db9A6444d3ADf1270")],
        chain_decimals: &[],
        approx_price_usd: 0.80,
    },
    Token {
        symbol: "AVAX",
        name: "Avalanche (wrapped)",
        decimals: 18,
        addresses: &[(Avalanche, "0xB31f66AA3C1e785363F0875A1B74E27b85FD66c7")],
        chain_decimals: &[],
        approx_price_usd: 40.0,
    },
    Token {
        symbol: "FTM",
        name: "Fantom (wrapped)",
        decimals: 18,
        addresses: &[(Fantom, "0x21be370D5312f44cB42ce377BC9b8a0cEF1A4C83")],
        chain_decimals: &[],
        approx_price_usd: 0.50,
    },
    Token {
        symbol: "LINK",
        name: "Chainlink",
        decimals: 18,
        addresses: &[
            (Ethereum, "0x514910771AF9Ca656af840dff83E8264EcF986CA"),
            (Polygon, "0x53E0bca35eC356BD5ddDFebbD1Fc0fD03FaBad39"),
            (Arbitrum, "0xf97f4df75117a78c1A5a0DBb814Af92458539FB4"),
        ],
        chain_decimals: &[],
        approx_price_usd: 15.0,
    },
    Token {
        symbol: "UNI",
        name: "Uniswap",
        decimals: 18,
        addresses: &[
            (Ethereum, "0x1f9840a85d5aF5bf1D1762F925BDADdC4201F984"),
            (Polygon, "0xb33EaAd8d922B1083446DC23f610c2567fB5180f"),
        ],
        chain_decimals: &[],
        approx_price_usd: 8.0,
    },
    Token {
        symbol: "AAVE",
        name: "Aave",
        decimals: 18,
        addresses: &[
            (Ethereum, "0x7Fc66500c84A76Ad7e9c93437bFc5Ac33E2DDaE9"),
            (Polygon, "0xD6DF932A45C0f255f85145f286eA0b292B21C90B"),
        ],
        chain_decimals: &[],
        approx_price_usd: 90.0,
    },
    Token {
        symbol: "ARB",
        name: "Arbitrum",
        decimals: 18,
        addresses: &[(Arbitrum, "0x912CE59144191C1204E64559FE8253a0e49E6548")],
        chain_decimals: &[],
        approx_price_usd: 1.20,
    },
    Token {
        symbol: "OP",
        name: "Optimism",
        decimals: 18,
        addresses: &[(Optimism, "0x4200000000000000000000000000000000000042")],
        chain_decimals: &[],
        approx_price_usd: 3.00,
    },
    Token {
        symbol: "CRV",
        name: "Curve DAO",
        decimals: 18,
        addresses: &[
            (Ethereum, "0xD533a949740bb3306d119CC777fa900bA034cd52"),
            (Polygon, "0x172370d5Cd63279eFa6d502DAB29171933a610AF"),
        ],
        chain_decimals: &[],
        approx_price_usd: 0.50,
    },
];

/// Seed scan universe. The harvester grows this dynamically; these pairs
/// are always included so core tokens never drop out.
pub static TRADING_PAIRS: &[(&str, &str)] = &[
    ("ETH", "USDT"),
    ("ETH", "USDC"),
    ("BTC", "USDT"),
    ("BTC", "USDC"),
    ("BNB", "USDT"),
    ("MATIC", "USDT"),
    ("AVAX", "USDT"),
    ("FTM", "USDT"),
    ("LINK", "USDT"),
    ("UNI", "USDT"),
    ("AAVE", "USDT"),
    ("ARB", "USDT"),
    ("OP", "USDT"),
    ("CRV", "USDT"),
    ("DAI", "USDT"),
];

/// Collapse wrapped-asset spellings to the canonical symbol so CEX and
/// DEX quotes land on the same matrix row.
pub fn normalize_symbol(symbol: &str) -> &str {
    match symbol {
        "WETH" => "ETH",
        "WBTC" => "BTC",
        "WBNB" => "BNB",
        "WMATIC" => "MATIC",
        "WAVAX" => "AVAX",
        "WFTM" => "FTM",
        other => other,
    }
}

/// Static token table plus the per-scan approximate USD prices used for
/// DEX trade sizing. Prices are refreshed from CEX mids each scan; the
/// table itself never changes.
pub struct TokenRegistry {
    approx_prices: DashMap<&'static str, f64>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        let approx_prices = DashMap::new();
        for token in TOKENS {
            approx_prices.insert(token.symbol, token.approx_price_usd);
        }
        Self { approx_prices }
    }

    pub fn get(&self, symbol: &str) -> Option<&'static Token> {
        let canonical = normalize_symbol(symbol);
        TOKENS.iter().find(|t| t.symbol == canonical)
    }

    /// Current approximate USD price for trade sizing. Falls back to the
    /// static seed for unknown symbols.
    pub fn approx_price(&self, symbol: &str) -> f64 {
        let canonical = normalize_symbol(symbol);
        self.approx_prices
            .get(canonical)
            .map(|p| *p)
            .unwrap_or_else(|| self.get(canonical).map(|t| t.approx_price_usd).unwrap_or(1.0))
    }

    /// Update the sizing price from fresh CEX data. Ignores non-positive
    /// and non-finite inputs.
    pub fn set_approx_price(&self, symbol: &str, price: f64) {
        if !price.is_finite() || price <= 0.0 {
            return;
        }
        if let Some(token) = self.get(symbol) {
            self.approx_prices.insert(token.symbol, price);
        }
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_wrapped() {
        assert_eq!(normalize_symbol("WETH"), "ETH");
        assert_eq!(normalize_symbol("WBTC"), "BTC");
        assert_eq!(normalize_symbol("USDT"), "USDT");
    }

    #[test]
    fn decimal_override_bsc_stables() {
        let registry = TokenRegistry::new();
        let usdt = registry.get("USDT").unwrap();
        assert_eq!(usdt.decimals_on(ChainId::Ethereum), 6);
        assert_eq!(usdt.decimals_on(ChainId::Bsc), 18);
    }

    #[test]
    fn registry_lookup_via_wrapped_symbol() {
        let registry = TokenRegistry::new();
        let token = registry.get("WETH").unwrap();
        assert_eq!(token.symbol, "ETH");
    }

    #[test]
    fn approx_price_refresh() {
        let registry = TokenRegistry::new();
        registry.set_approx_price("ETH", 3456.0);
        assert_eq!(registry.approx_price("ETH"), 3456.0);
        // Garbage updates are dropped
        registry.set_approx_price("ETH", -1.0);
        registry.set_approx_price("ETH", f64::NAN);
        assert_eq!(registry.approx_price("ETH"), 3456.0);
    }

    #[test]
    fn token_addresses_parse() {
        for token in TOKENS {
            for (_, addr) in token.addresses {
                assert!(
                    addr.parse::<alloy::primitives::Address>().is_ok(),
                    "bad address for {}",
                    token.symbol
                );
            }
        }
    }
}
