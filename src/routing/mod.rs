//! CCTP chain catalogue and the static route table.

use serde::Serialize;
use tracing::{debug, warn};

use crate::core::TransferIntent;

/// Flat CCTP fee charged on every route, in USDC.
pub const CCTP_FEE: f64 = 0.001;
/// Cheapest chain to land on and the one with the best yield.
pub const PREFERRED_CHAIN: &str = "base";

pub const TOKEN_MESSENGER: &str = "0x9f3b8679c73c2fef8b59b4f3444d4e156fb70aa5";

pub const SUPPORTED_CHAIN_IDS: [&str; 3] = ["ethereum", "base", "arbitrum"];

const SUPPORTED_NETWORKS: [&str; 3] = ["ethereum-sepolia", "base-sepolia", "arbitrum-sepolia"];

/// CCTP testnet deployment of one chain.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub id: &'static str,
    pub domain: u32,
    pub token_messenger: &'static str,
    pub usdc: &'static str,
    pub rpc: String,
}

impl ChainConfig {
    /// Capitalised id, as shown to users.
    pub fn display_name(&self) -> String {
        let mut chars = self.id.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

pub fn chain_catalogue(infura_project_id: Option<&str>) -> Vec<ChainConfig> {
    vec![
        ChainConfig {
            id: "ethereum",
            domain: 0,
            token_messenger: TOKEN_MESSENGER,
            usdc: "0x1c7D4B196Cb0C7B01d743Fbc6116a902379C7238",
            rpc: format!("https://sepolia.infura.io/v3/{}", infura_project_id.unwrap_or_default()),
        },
        ChainConfig {
            id: "base",
            domain: 6,
            token_messenger: TOKEN_MESSENGER,
            usdc: "0x036CbD53842c5426634e7929541eC2318f3dCF7c",
            rpc: "https://sepolia.base.org".to_string(),
        },
        ChainConfig {
            id: "arbitrum",
            domain: 3,
            token_messenger: TOKEN_MESSENGER,
            usdc: "0x75faf114eafb1BDbe2F0316E893AE4e7A6D6a2A6",
            rpc: "https://sepolia-rollup.arbitrum.io/rpc".to_string(),
        },
    ]
}

pub fn find_chain(id: &str, infura_project_id: Option<&str>) -> Option<ChainConfig> {
    chain_catalogue(infura_project_id).into_iter().find(|c| c.id == id)
}

fn testnet_name(chain: &str) -> String {
    match chain {
        "ethereum" | "base" | "arbitrum" => format!("{}-sepolia", chain),
        other => other.to_string(),
    }
}

/// Both ends must be one of the three CCTP testnets, by short or `-sepolia` name.
pub fn validate_chain_configuration(source_chain: &str, destination_chain: &str) -> bool {
    let src = testnet_name(source_chain);
    let dst = testnet_name(destination_chain);
    let ok = SUPPORTED_NETWORKS.contains(&src.as_str()) && SUPPORTED_NETWORKS.contains(&dst.as_str());
    if !ok {
        warn!(
            source_chain,
            destination_chain,
            supported = %SUPPORTED_NETWORKS.join(", "),
            "Chain validation failed"
        );
    }
    ok
}

/// One number per supported chain.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ChainTable {
    pub ethereum: f64,
    pub base: f64,
    pub arbitrum: f64,
}

impl ChainTable {
    pub fn get(&self, chain: &str) -> Option<f64> {
        match chain {
            "ethereum" => Some(self.ethereum),
            "base" => Some(self.base),
            "arbitrum" => Some(self.arbitrum),
            _ => None,
        }
    }
}

/// Gas price per chain in gwei.
pub fn gas_prices() -> ChainTable {
    ChainTable { ethereum: 25.0, base: 0.005, arbitrum: 0.008 }
}

/// Best lending yield per chain, as a fraction.
pub fn yield_rates() -> ChainTable {
    ChainTable { ethereum: 0.045, base: 0.052, arbitrum: 0.038 }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PoolLiquidity {
    pub usdc: f64,
    pub volume24h: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LiquidityData {
    pub ethereum: PoolLiquidity,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteData {
    pub optimal_chain: String,
    pub estimated_fees: f64,
    pub suggested_actions: Vec<String>,
    pub gas_data: ChainTable,
    pub yield_data: ChainTable,
    pub liquidity_data: LiquidityData,
}

/// Pick the landing chain for a transfer from its intent.
pub fn calculate_optimal_route(
    amount: f64,
    source_chain: &str,
    destination_chain: &str,
    intent: TransferIntent,
) -> RouteData {
    let mut optimal_chain = destination_chain.to_string();
    let mut suggested_actions = Vec::new();

    match intent {
        TransferIntent::MaximizeYield => {
            if source_chain != PREFERRED_CHAIN {
                optimal_chain = PREFERRED_CHAIN.to_string();
                suggested_actions.push(format!(
                    "Auto-deposit to {} for 5.2% APY via CCTP V2",
                    PREFERRED_CHAIN
                ));
            }
        }
        TransferIntent::MinimizeFees => {
            optimal_chain = PREFERRED_CHAIN.to_string();
            suggested_actions.push(format!(
                "Route via {} for lowest fees using Circle CCTP V2",
                PREFERRED_CHAIN
            ));
        }
        TransferIntent::Standard => {}
    }

    debug!(amount, source_chain, destination_chain, %intent, optimal_chain = %optimal_chain, "Route calculated");

    RouteData {
        optimal_chain,
        estimated_fees: CCTP_FEE,
        suggested_actions,
        gas_data: gas_prices(),
        yield_data: yield_rates(),
        liquidity_data: LiquidityData {
            ethereum: PoolLiquidity { usdc: 1_000_000.0, volume24h: 500_000.0 },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("ethereum", "base", true ; "short names")]
    #[test_case("base-sepolia", "arbitrum", true ; "mixed names")]
    #[test_case("arbitrum", "arbitrum", true ; "same chain")]
    #[test_case("polygon", "base", false ; "unsupported source")]
    #[test_case("ethereum", "solana", false ; "unsupported destination")]
    #[test_case("ethereum-mainnet", "base", false ; "mainnet name")]
    fn test_validate_chain_configuration(src: &str, dst: &str, expected: bool) {
        assert_eq!(validate_chain_configuration(src, dst), expected);
    }

    #[test]
    fn test_standard_route_keeps_destination() {
        let route = calculate_optimal_route(100.0, "ethereum", "arbitrum", TransferIntent::Standard);
        assert_eq!(route.optimal_chain, "arbitrum");
        assert_eq!(route.estimated_fees, 0.001);
        assert!(route.suggested_actions.is_empty());
    }

    #[test]
    fn test_maximize_yield_routes_to_base() {
        let route = calculate_optimal_route(100.0, "ethereum", "arbitrum", TransferIntent::MaximizeYield);
        assert_eq!(route.optimal_chain, "base");
        assert_eq!(route.suggested_actions, vec!["Auto-deposit to base for 5.2% APY via CCTP V2"]);

        let from_base = calculate_optimal_route(100.0, "base", "arbitrum", TransferIntent::MaximizeYield);
        assert_eq!(from_base.optimal_chain, "arbitrum");
        assert!(from_base.suggested_actions.is_empty());
    }

    #[test]
    fn test_minimize_fees_always_base() {
        let route = calculate_optimal_route(5.0, "base", "ethereum", TransferIntent::MinimizeFees);
        assert_eq!(route.optimal_chain, "base");
        assert_eq!(
            route.suggested_actions,
            vec!["Route via base for lowest fees using Circle CCTP V2"]
        );
    }

    #[test]
    fn test_route_json_shape() {
        let route = calculate_optimal_route(1.0, "ethereum", "base", TransferIntent::Standard);
        let v = serde_json::to_value(&route).unwrap();
        assert_eq!(v["optimalChain"], "base");
        assert_eq!(v["gasData"]["ethereum"], 25.0);
        assert_eq!(v["yieldData"]["base"], 0.052);
        assert_eq!(v["liquidityData"]["ethereum"]["volume24h"], 500000.0);
    }

    #[test]
    fn test_catalogue() {
        let chains = chain_catalogue(Some("abc123"));
        assert_eq!(chains.len(), 3);
        assert_eq!(chains[0].rpc, "https://sepolia.infura.io/v3/abc123");
        assert_eq!(chains[0].display_name(), "Ethereum");
        let base = find_chain("base", None).unwrap();
        assert_eq!(base.domain, 6);
        assert!(find_chain("polygon", None).is_none());
        assert_eq!(gas_prices().get("arbitrum"), Some(0.008));
        assert_eq!(gas_prices().get("polygon"), None);
    }
}
