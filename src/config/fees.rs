//! Static CEX withdrawal fee schedule, USD per chain.
//!
//! Conservative estimates for average network conditions. Only charged
//! when an opportunity moves funds off a CEX (CEX->DEX direction).

use crate::config::chains::ChainId;

pub fn withdrawal_fee_usd(chain_id: Option<ChainId>) -> f64 {
    let Some(chain_id) = chain_id else {
        return 0.0;
    };
    match chain_id {
        ChainId::Ethereum => 15.0,
        ChainId::Bsc => 1.0,
        ChainId::Polygon => 0.5,
        ChainId::Arbitrum => 1.0,
        ChainId::Optimism => 1.0,
        ChainId::Avalanche => 0.5,
        ChainId::Fantom => 0.5,
        ChainId::Base => 0.5,
        ChainId::ZkSync => 1.0,
        ChainId::Linea => 1.0,
        ChainId::Scroll => 1.0,
        ChainId::Gnosis => 0.1,
        ChainId::Cronos => 0.5,
        ChainId::Moonbeam => 0.5,
        ChainId::Celo => 0.1,
        ChainId::Kava => 0.2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mainnet_is_the_expensive_one() {
        assert_eq!(withdrawal_fee_usd(Some(ChainId::Ethereum)), 15.0);
        assert!(withdrawal_fee_usd(Some(ChainId::Polygon)) < 1.0);
        assert_eq!(withdrawal_fee_usd(None), 0.0);
    }
}
