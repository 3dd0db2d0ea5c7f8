//! Static DeFi protocol data, yield recommendations and simulated CCTP hooks.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;
use tracing::info;

use crate::core::domain::generate_tx_hash;
use crate::core::errors::BorderHopError;
use crate::core::Transfer;
use crate::routing::{gas_prices, ChainTable, CCTP_FEE, SUPPORTED_CHAIN_IDS};

/// Gas fee quoted when the chain has no gas price entry.
pub const DEFAULT_GAS_FEE: f64 = 0.01;
pub const MAX_RECOMMENDATIONS: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// A tolerance accepts every protocol at or below its own level.
    pub fn accepts(&self, protocol_risk: RiskLevel) -> bool {
        protocol_risk <= *self
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DefiProtocol {
    pub id: &'static str,
    pub name: &'static str,
    pub apy: ChainTable,
    pub min_deposit: f64,
    pub risk: RiskLevel,
}

impl DefiProtocol {
    pub fn average_apy(&self) -> f64 {
        (self.apy.ethereum + self.apy.base + self.apy.arbitrum) / 3.0
    }

    /// APY on `chain`; zero counts as unsupported.
    pub fn apy_on(&self, chain: &str) -> Option<f64> {
        self.apy.get(chain).filter(|apy| *apy > 0.0)
    }
}

static PROTOCOLS: Lazy<Vec<DefiProtocol>> = Lazy::new(|| {
    vec![
        DefiProtocol {
            id: "aave",
            name: "Aave",
            apy: ChainTable { ethereum: 0.045, base: 0.052, arbitrum: 0.038 },
            min_deposit: 100.0,
            risk: RiskLevel::Low,
        },
        DefiProtocol {
            id: "compound",
            name: "Compound",
            apy: ChainTable { ethereum: 0.042, base: 0.048, arbitrum: 0.035 },
            min_deposit: 50.0,
            risk: RiskLevel::Low,
        },
        DefiProtocol {
            id: "curve",
            name: "Curve Finance",
            apy: ChainTable { ethereum: 0.038, base: 0.045, arbitrum: 0.032 },
            min_deposit: 200.0,
            risk: RiskLevel::Medium,
        },
        DefiProtocol {
            id: "uniswap",
            name: "Uniswap V3",
            apy: ChainTable { ethereum: 0.055, base: 0.062, arbitrum: 0.048 },
            min_deposit: 500.0,
            risk: RiskLevel::High,
        },
    ]
});

pub fn protocols() -> &'static [DefiProtocol] {
    &PROTOCOLS
}

pub fn find_protocol(id: &str) -> Option<&'static DefiProtocol> {
    protocols().iter().find(|p| p.id == id)
}

pub fn supported_chains() -> Vec<&'static str> {
    SUPPORTED_CHAIN_IDS.to_vec()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YieldRecommendation {
    pub id: &'static str,
    pub name: &'static str,
    pub apy: f64,
    pub min_deposit: f64,
    pub risk: RiskLevel,
    pub estimated_yearly_return: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct YieldAnalysis {
    pub amount: f64,
    pub chain: String,
    pub risk_tolerance: RiskLevel,
    pub gas_fee: f64,
    pub total_protocols: usize,
    pub suitable_protocols: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct YieldOptimization {
    pub recommendations: Vec<YieldRecommendation>,
    pub analysis: YieldAnalysis,
}

/// Protocols within the risk tolerance that run on `chain`, best yearly
/// return first, limited to those the amount can enter.
pub fn optimize_yield(amount: f64, chain: &str, risk_tolerance: RiskLevel) -> YieldOptimization {
    let mut suitable: Vec<YieldRecommendation> = protocols()
        .iter()
        .filter(|p| risk_tolerance.accepts(p.risk))
        .filter_map(|p| {
            p.apy_on(chain).map(|apy| YieldRecommendation {
                id: p.id,
                name: p.name,
                apy,
                min_deposit: p.min_deposit,
                risk: p.risk,
                estimated_yearly_return: amount * apy,
            })
        })
        .collect();
    suitable.sort_by(|a, b| {
        b.estimated_yearly_return
            .partial_cmp(&a.estimated_yearly_return)
            .unwrap_or(Ordering::Equal)
    });

    let suitable_count = suitable.len();
    let recommendations = suitable
        .into_iter()
        .filter(|r| amount >= r.min_deposit)
        .take(MAX_RECOMMENDATIONS)
        .collect();

    YieldOptimization {
        recommendations,
        analysis: YieldAnalysis {
            amount,
            chain: chain.to_string(),
            risk_tolerance,
            gas_fee: gas_prices().get(chain).unwrap_or(DEFAULT_GAS_FEE),
            total_protocols: suitable_count,
            suitable_protocols: suitable_count,
        },
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HookType {
    DefiDeposit,
    TreasuryRebalancing,
    LiquidityProvision,
}

/// Action run on the destination chain once a transfer lands.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PostTransferHook {
    #[serde(rename = "type")]
    pub hook_type: HookType,
    pub protocol: String,
    pub chain: String,
    pub amount: f64,
    pub parameters: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HookExecutionResult {
    pub success: bool,
    pub hook_id: String,
    pub result: Value,
    pub timestamp: DateTime<Utc>,
}

/// Pretend to run `hook`. No transaction is sent.
pub fn simulate_hook(reference: &str, hook: &PostTransferHook, now: DateTime<Utc>) -> HookExecutionResult {
    info!(reference, protocol = %hook.protocol, chain = %hook.chain, "Simulating post-transfer hook");
    HookExecutionResult {
        success: true,
        hook_id: format!("hook_{}", reference),
        result: json!({
            "type": hook.hook_type,
            "protocol": hook.protocol,
            "chain": hook.chain,
            "depositedAmount": hook.amount,
            "parameters": hook.parameters,
            "txHash": generate_tx_hash(),
            "simulated": true,
        }),
        timestamp: now,
    }
}

/// Auto-deposit run when a yield-maximising transfer completes: the
/// best-paying low-risk protocol on the destination chain.
pub fn yield_hook_for(transfer: &Transfer, now: DateTime<Utc>) -> Option<HookExecutionResult> {
    let best = protocols()
        .iter()
        .filter(|p| p.risk == RiskLevel::Low)
        .filter_map(|p| p.apy_on(&transfer.destination_chain).map(|apy| (p, apy)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal))?;

    let hook = PostTransferHook {
        hook_type: HookType::DefiDeposit,
        protocol: best.0.id.to_string(),
        chain: transfer.destination_chain.clone(),
        amount: transfer.amount,
        parameters: json!({ "autoCompound": true, "riskLevel": best.0.risk, "estimatedAPY": best.1 }),
    };
    Some(simulate_hook(&transfer.transfer_id, &hook, now))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Returns {
    pub daily: f64,
    pub monthly: f64,
    pub yearly: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeeBreakdown {
    pub cctp: f64,
    pub gas: f64,
    pub protocol: f64,
    pub total: f64,
}

impl FeeBreakdown {
    pub fn standard() -> Self {
        let (gas, protocol) = (0.005, 0.002);
        Self { cctp: CCTP_FEE, gas, protocol, total: CCTP_FEE + gas + protocol }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DepositSimulation {
    pub protocol: &'static str,
    pub chain: String,
    pub amount: f64,
    pub apy: f64,
    pub returns: Returns,
    pub fees: FeeBreakdown,
    pub net_returns: Returns,
    pub hook: HookExecutionResult,
    pub timestamp: DateTime<Utc>,
}

pub fn simulate_deposit(
    protocol_id: &str,
    chain: &str,
    amount: f64,
    auto_compound: bool,
    now: DateTime<Utc>,
) -> Result<DepositSimulation, BorderHopError> {
    let protocol = find_protocol(protocol_id)
        .ok_or_else(|| BorderHopError::ValidationError("Protocol not found".into()))?;
    let apy = protocol.apy_on(chain).ok_or_else(|| {
        BorderHopError::ValidationError("Protocol not supported on this chain".into())
    })?;

    let yearly = amount * apy;
    let returns = Returns { daily: yearly / 365.0, monthly: yearly / 12.0, yearly };
    let fees = FeeBreakdown::standard();
    let net_returns = Returns {
        daily: returns.daily - fees.total / 365.0,
        monthly: returns.monthly - fees.total / 12.0,
        yearly: returns.yearly - fees.total,
    };

    let hook = PostTransferHook {
        hook_type: HookType::DefiDeposit,
        protocol: protocol.id.to_string(),
        chain: chain.to_string(),
        amount,
        parameters: json!({
            "autoCompound": auto_compound,
            "riskLevel": protocol.risk,
            "estimatedAPY": apy,
        }),
    };
    let hook = simulate_hook(&format!("SIM_{}", now.timestamp_millis()), &hook, now);

    Ok(DepositSimulation {
        protocol: protocol.name,
        chain: chain.to_string(),
        amount,
        apy,
        returns,
        fees,
        net_returns,
        hook,
        timestamp: now,
    })
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradingPair {
    pub pair: &'static str,
    pub liquidity: f64,
    pub volume24h: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChainLiquidity {
    pub total_liquidity: f64,
    pub usdc_liquidity: f64,
    pub volume24h: f64,
    pub top_pairs: Vec<TradingPair>,
}

fn pair(pair: &'static str, liquidity: f64, volume24h: f64) -> TradingPair {
    TradingPair { pair, liquidity, volume24h }
}

pub fn liquidity(chain: &str) -> Option<ChainLiquidity> {
    let data = match chain {
        "ethereum" => ChainLiquidity {
            total_liquidity: 2_500_000.0,
            usdc_liquidity: 1_000_000.0,
            volume24h: 500_000.0,
            top_pairs: vec![
                pair("USDC/ETH", 500_000.0, 200_000.0),
                pair("USDC/USDT", 300_000.0, 150_000.0),
                pair("USDC/DAI", 200_000.0, 100_000.0),
            ],
        },
        "base" => ChainLiquidity {
            total_liquidity: 1_200_000.0,
            usdc_liquidity: 500_000.0,
            volume24h: 200_000.0,
            top_pairs: vec![
                pair("USDC/ETH", 250_000.0, 100_000.0),
                pair("USDC/USDbC", 150_000.0, 60_000.0),
                pair("USDC/DAI", 100_000.0, 40_000.0),
            ],
        },
        "arbitrum" => ChainLiquidity {
            total_liquidity: 1_800_000.0,
            usdc_liquidity: 750_000.0,
            volume24h: 300_000.0,
            top_pairs: vec![
                pair("USDC/ETH", 400_000.0, 150_000.0),
                pair("USDC/USDT", 250_000.0, 100_000.0),
                pair("USDC/ARB", 100_000.0, 50_000.0),
            ],
        },
        _ => return None,
    };
    Some(data)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FarmingOpportunity {
    pub protocol: &'static str,
    pub pool: &'static str,
    pub apy: f64,
    pub tvl: f64,
    pub risk: RiskLevel,
    pub rewards: Vec<&'static str>,
}

fn lending_pool(protocol: &'static str, pool: &'static str, apy: f64, tvl: f64, rewards: Vec<&'static str>) -> FarmingOpportunity {
    FarmingOpportunity { protocol, pool, apy, tvl, risk: RiskLevel::Low, rewards }
}

/// Empty for chains without known pools.
pub fn farming_opportunities(chain: &str) -> Vec<FarmingOpportunity> {
    match chain {
        "ethereum" => vec![
            lending_pool("Aave", "USDC Lending Pool", 0.045, 500_000.0, vec!["AAVE", "stkAAVE"]),
            lending_pool("Compound", "USDC Market", 0.042, 400_000.0, vec!["COMP"]),
        ],
        "base" => vec![lending_pool("Aave", "USDC Lending Pool", 0.052, 300_000.0, vec!["AAVE"])],
        "arbitrum" => vec![lending_pool("Aave", "USDC Lending Pool", 0.038, 350_000.0, vec!["AAVE"])],
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GasStrategy {
    pub name: &'static str,
    pub description: &'static str,
    pub gas_savings: f64,
    pub complexity: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GasOptimization {
    pub current_gas_price: f64,
    pub strategies: Vec<GasStrategy>,
    pub recommendations: Vec<GasStrategy>,
}

pub fn gas_optimization(chain: &str) -> GasOptimization {
    let strategies = vec![
        GasStrategy {
            name: "Batch Transactions",
            description: "Combine multiple operations into a single transaction",
            gas_savings: 0.3,
            complexity: "medium",
        },
        GasStrategy {
            name: "Use CCTP V2 Fast Transfers",
            description: "Leverage Circle's optimized cross-chain transfers",
            gas_savings: 0.4,
            complexity: "low",
        },
        GasStrategy {
            name: "Choose Optimal Chain",
            description: "Route to chains with lower gas fees",
            gas_savings: 0.6,
            complexity: "low",
        },
    ];

    let mut recommendations: Vec<GasStrategy> =
        strategies.iter().filter(|s| s.complexity == "low").cloned().collect();
    recommendations
        .sort_by(|a, b| b.gas_savings.partial_cmp(&a.gas_savings).unwrap_or(Ordering::Equal));

    GasOptimization {
        current_gas_price: gas_prices().get(chain).unwrap_or(0.0),
        strategies,
        recommendations,
    }
}
