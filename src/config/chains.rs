//! Chain configurations with RPC endpoints and router addresses.
//!
//! Every chain carries an ordered endpoint list for failover plus the
//! router/quoter addresses the DEX adapters are built from. Chains with
//! a missing router entry simply get no adapter of that kind.

use std::fmt;

/// EVM chains the scanner watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainId {
    Ethereum = 1,
    Bsc = 56,
    Polygon = 137,
    Arbitrum = 42161,
    Optimism = 10,
    Avalanche = 43114,
    Fantom = 250,
    Base = 8453,
    ZkSync = 324,
    Linea = 59144,
    Scroll = 534352,
    Gnosis = 100,
    Cronos = 25,
    Moonbeam = 1284,
    Celo = 42220,
    Kava = 2222,
}

impl ChainId {
    pub fn name(&self) -> &'static str {
        chain(*self).name
    }

    /// Rollups carry an L1 data cost the execution gas price misses.
    /// The gas estimator applies a flat safety multiplier to these.
    pub fn is_rollup(&self) -> bool {
        matches!(
            self,
            ChainId::Arbitrum
                | ChainId::Optimism
                | ChainId::Base
                | ChainId::Linea
                | ChainId::Scroll
                | ChainId::ZkSync
        )
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// DEX adapter kinds the scanner knows how to quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// Uniswap-V2-style constant product pool (x*y=k)
    ConstantProduct,
    /// Uniswap-V3-style concentrated liquidity, quoted via Quoter contract
    ConcentratedLiquidity,
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AdapterKind::ConstantProduct => write!(f, "V2"),
            AdapterKind::ConcentratedLiquidity => write!(f, "V3"),
        }
    }
}

/// One router (or quoter) deployment on one chain.
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Display name of the DEX, e.g. "QuickSwap"
    pub name: &'static str,
    pub kind: AdapterKind,
    /// Router address for constant-product, quoter address for concentrated
    pub address: &'static str,
    /// Swap fee as a percentage (0.3 = 0.30%). Unused for concentrated
    /// liquidity where the winning fee tier decides.
    pub fee_percent: f64,
}

/// Configuration for one chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainConfig {
    pub chain_id: ChainId,
    pub name: &'static str,
    pub native_token: &'static str,
    pub native_decimals: u8,
    pub rpc_endpoints: &'static [&'static str],
    pub avg_block_time: f64,
    pub routers: &'static [RouterConfig],
}

const fn v2(name: &'static str, address: &'static str, fee_percent: f64) -> RouterConfig {
    RouterConfig {
        name,
        kind: AdapterKind::ConstantProduct,
        address,
        fee_percent,
    }
}

const fn v3(name: &'static str, address: &'static str) -> RouterConfig {
    RouterConfig {
        name,
        kind: AdapterKind::ConcentratedLiquidity,
        address,
        fee_percent: 0.0,
    }
}

/// All supported chains with free public endpoints for failover.
pub static CHAINS: &[ChainConfig] = &[
    ChainConfig {
        chain_id: ChainId::Ethereum,
        name: "Ethereum",
        native_token: "ETH",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://eth.llamarpc.com",
            "https://rpc.ankr.com/eth",
            "https://ethereum.publicnode.com",
            "https://1rpc.io/eth",
            "https://cloudflare-eth.com",
            "https://eth.drpc.org",
        ],
        avg_block_time: 12.0,
        routers: &[
            v2("Uniswap V2", "0x7a250d5630B4cF539739dF2C5dAcb4c659F2488D", 0.3),
            v2("SushiSwap", "0xd9e1cE17f2641f24aE83637ab66a2cca9C378B9F", 0.3),
            v3("Uniswap V3", "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Bsc,
        name: "BSC",
        native_token: "BNB",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://bsc-dataseed.binance.org",
            "https://rpc.ankr.com/bsc",
            "https://bsc.publicnode.com",
            "https://bsc-dataseed1.defibit.io",
            "https://bsc.drpc.org",
        ],
        avg_block_time: 3.0,
        routers: &[
            v2("PancakeSwap V2", "0x10ED43C718714eb63d5aA57B78B54704E256024E", 0.25),
            v2("BiSwap", "0x3a6d8cA21D1CF76F653A67577FA0D27453350dD8", 0.1),
            v3("PancakeSwap V3", "0xB048Bbc1Ee6b733FFfCFb9e9CeF7375518e25997"),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Polygon,
        name: "Polygon",
        native_token: "MATIC",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://polygon-rpc.com",
            "https://rpc.ankr.com/polygon",
            "https://polygon.publicnode.com",
            "https://polygon-mainnet.public.blastapi.io",
            "https://polygon.drpc.org",
        ],
        avg_block_time: 2.0,
        routers: &[
            v2("QuickSwap", "0xa5E0829CaCEd8fFDD4De3c43696c57F7D7A678ff", 0.3),
            v2("SushiSwap", "0x1b02dA8Cb0d097eB8D57A175b88c7D8b47997506", 0.3),
            v3("Uniswap V3", "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Arbitrum,
        name: "Arbitrum",
        native_token: "ETH",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://arb1.arbitrum.io/rpc",
            "https://rpc.ankr.com/arbitrum",
            "https://arbitrum.publicnode.com",
            "https://arbitrum-one.public.blastapi.io",
            "https://arbitrum.drpc.org",
        ],
        avg_block_time: 0.25,
        routers: &[
            v2("Camelot", "0xc873fEcbd354f5A56E00E710B90EF4201db2448d", 0.3),
            v2("SushiSwap", "0x1b02dA8Cb0d097eB8D57A175b88c7D8b47997506", 0.3),
            v3("Uniswap V3", "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Optimism,
        name: "Optimism",
        native_token: "ETH",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://mainnet.optimism.io",
            "https://rpc.ankr.com/optimism",
            "https://optimism.publicnode.com",
            "https://optimism.drpc.org",
        ],
        avg_block_time: 2.0,
        routers: &[
            v2("Velodrome", "0xa062aE8A9c5e11aaA026fc2670B0D65cCc8B2858", 0.02),
            v3("Uniswap V3", "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Avalanche,
        name: "Avalanche",
        native_token: "AVAX",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://api.avax.network/ext/bc/C/rpc",
            "https://rpc.ankr.com/avalanche",
            "https://avalanche.publicnode.com",
            "https://avalanche.drpc.org",
        ],
        avg_block_time: 2.0,
        routers: &[
            v2("TraderJoe", "0x60aE616a2155Ee3d9A68541Ba4544862310933d4", 0.3),
            v2("Pangolin", "0xE54Ca86531e17Ef3616d22Ca28b0D458b6C89106", 0.3),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Fantom,
        name: "Fantom",
        native_token: "FTM",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://rpc.ftm.tools",
            "https://rpc.ankr.com/fantom",
            "https://fantom.publicnode.com",
            "https://fantom.drpc.org",
        ],
        avg_block_time: 1.0,
        routers: &[
            v2("SpookySwap", "0xF491e7B69E4244ad4002BC14e878a34207E38c29", 0.2),
            v2("SpiritSwap", "0x16327E3FbDaCA3bcF7E38F5Af2599D2DDc33aE52", 0.3),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Base,
        name: "Base",
        native_token: "ETH",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://mainnet.base.org",
            "https://rpc.ankr.com/base",
            "https://base.publicnode.com",
            "https://base.drpc.org",
        ],
        avg_block_time: 2.0,
        routers: &[
            v2("Aerodrome", "0xcF77a3Ba9A5CA399B7c97c74d54e5b1Beb874E43", 0.02),
            v2("BaseSwap", "0x327Df1E6de05895d2ab08513aaDD9313Fe505d86", 0.25),
            v3("Uniswap V3", "0x3d4e44Eb1374240CE5F1B871ab261CD16335B76a"),
        ],
    },
    ChainConfig {
        chain_id: ChainId::ZkSync,
        name: "zkSync Era",
        native_token: "ETH",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://mainnet.era.zksync.io",
            "https://rpc.ankr.com/zksync_era",
            "https://zksync-era.drpc.org",
        ],
        avg_block_time: 1.0,
        routers: &[
            v2("SyncSwap", "0x2da10A1e27bF85cEdD8FFb1AbBe97e53391C0295", 0.3),
            v2("Mute.io", "0x8B791913eB07C32779a16750e3868aA8495F5964", 0.3),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Linea,
        name: "Linea",
        native_token: "ETH",
        native_decimals: 18,
        rpc_endpoints: &["https://rpc.linea.build", "https://linea.drpc.org"],
        avg_block_time: 2.0,
        routers: &[v2("SyncSwap", "0x80e38291e06339d10AAB483C65695D004dBD5C69", 0.3)],
    },
    ChainConfig {
        chain_id: ChainId::Scroll,
        name: "Scroll",
        native_token: "ETH",
        native_decimals: 18,
        rpc_endpoints: &["https://rpc.scroll.io", "https://scroll.drpc.org"],
        avg_block_time: 3.0,
        routers: &[v2("SyncSwap", "0x80e38291e06339d10AAB483C65695D004dBD5C69", 0.3)],
    },
    ChainConfig {
        chain_id: ChainId::Gnosis,
        name: "Gnosis",
        native_token: "xDAI",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://rpc.gnosischain.com",
            "https://rpc.ankr.com/gnosis",
            "https://gnosis.drpc.org",
        ],
        avg_block_time: 5.0,
        routers: &[
            v2("SushiSwap", "0x1b02dA8Cb0d097eB8D57A175b88c7D8b47997506", 0.3),
            v2("Honeyswap", "0x1C232F01118CB8B424793ae03F870aa7D0ac7f77", 0.3),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Cronos,
        name: "Cronos",
        native_token: "CRO",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://evm.cronos.org",
            "https://rpc.ankr.com/cronos",
            "https://cronos.drpc.org",
        ],
        avg_block_time: 6.0,
        routers: &[
            v2("VVS Finance", "0x145863Eb42cf62847A6Ca784e6416C1682b1b2Ae", 0.3),
            v2("MM.Finance", "0x145677FC4d9b8F19B5D56d1820c48e0443049a30", 0.17),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Moonbeam,
        name: "Moonbeam",
        native_token: "GLMR",
        native_decimals: 18,
        rpc_endpoints: &[
            "https://rpc.api.moonbeam.network",
            "https://rpc.ankr.com/moonbeam",
            "https://moonbeam.publicnode.com",
        ],
        avg_block_time: 12.0,
        routers: &[
            v2("StellaSwap", "0xd3b39828414594c7C0C764A85375A2d574213702", 0.25),
            v2("BeamSwap", "0x96b27695D71C1021bc789e5300B553259508BBD7", 0.3),
        ],
    },
    ChainConfig {
        chain_id: ChainId::Celo,
        name: "Celo",
        native_token: "CELO",
        native_decimals: 18,
        rpc_endpoints: &["https://forno.celo.org", "https://rpc.ankr.com/celo"],
        avg_block_time: 5.0,
        routers: &[v2("Ubeswap", "0xE3D8bd6Aed4F159bc8000a9cD47CffDb95F96121", 0.3)],
    },
    ChainConfig {
        chain_id: ChainId::Kava,
        name: "Kava",
        native_token: "KAVA",
        native_decimals: 18,
        rpc_endpoints: &["https://evm.kava.io", "https://rpc.ankr.com/kava_evm"],
        avg_block_time: 6.0,
        routers: &[v2("Equilibre", "0xA138FAFc30f6Ec6980aAd22656F2F11888151068", 0.05)],
    },
];

/// Look up a chain's configuration.
pub fn chain(chain_id: ChainId) -> &'static ChainConfig {
    CHAINS
        .iter()
        .find(|c| c.chain_id == chain_id)
        .expect("all ChainId variants present in CHAINS")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_chain_id_has_a_config() {
        // chain() panics on a missing entry; touch them all
        for cfg in CHAINS {
            assert_eq!(chain(cfg.chain_id).chain_id, cfg.chain_id);
            assert!(!cfg.rpc_endpoints.is_empty());
        }
    }

    #[test]
    fn rollup_classification() {
        assert!(ChainId::Arbitrum.is_rollup());
        assert!(ChainId::Base.is_rollup());
        assert!(!ChainId::Ethereum.is_rollup());
        assert!(!ChainId::Polygon.is_rollup());
    }

    #[test]
    fn router_addresses_parse() {
        for cfg in CHAINS {
            for router in cfg.routers {
                assert!(
                    router.address.parse::<alloy::primitives::Address>().is_ok(),
                    "bad address for {} on {}",
                    router.name,
                    cfg.name
                );
            }
        }
    }
}
