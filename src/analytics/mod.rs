//! Store-backed analytics: totals, distributions and fee savings against
//! traditional remittance services.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::core::Transfer;
use crate::storage::{TransferStats, TransferStore};

/// Average fee rate of traditional remittance services.
pub const TRADITIONAL_FEE_RATE: f64 = 0.065;
pub const TRADITIONAL_FEE_PERCENT: f64 = 6.5;
/// Fee rate quoted for BorderHop.
pub const BORDERHOP_FEE_RATE: f64 = 0.001;
pub const BORDERHOP_FEE_PERCENT: f64 = 0.1;

pub const DASHBOARD_RECENT: usize = 7;
pub const REALTIME_RECENT: usize = 3;
/// Volume above which the trend is reported as `high`.
pub const HIGH_VOLUME_THRESHOLD: f64 = 1000.0;

const AVERAGE_PROCESSING_TIME: &str = "2.5 minutes";

/// `1234.5` → `$1,234.5`: grouped thousands, at most three fraction digits.
pub fn format_usd(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let fixed = format!("{:.3}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let frac = frac_part.trim_end_matches('0');
    let sign = if rounded < 0.0 { "-" } else { "" };
    if frac.is_empty() {
        format!("${}{}", sign, grouped)
    } else {
        format!("${}{}.{}", sign, grouped, frac)
    }
}

fn average(total: f64, count: u64) -> f64 {
    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

fn fees_saved(stats: &TransferStats) -> f64 {
    stats.total_volume * TRADITIONAL_FEE_RATE - stats.total_fees
}

/// Keys sorted by count, highest first. Ties keep key order.
fn ranked(distribution: &BTreeMap<String, u64>) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> =
        distribution.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub date: String,
    pub transfers: u32,
    pub volume: f64,
    pub fees_saved: f64,
}

impl ActivityEntry {
    fn from_transfer(t: &Transfer, fees_saved: f64) -> Self {
        Self {
            date: t.created_at.format("%Y-%m-%d").to_string(),
            transfers: 1,
            volume: t.amount,
            fees_saved,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_transfers: u64,
    pub total_volume: String,
    pub total_fees_saved: String,
    pub average_transfer_size: String,
    pub savings_percentage: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub overview: Overview,
    pub chain_distribution: BTreeMap<String, u64>,
    pub intent_distribution: BTreeMap<String, u64>,
    pub recent_activity: Vec<ActivityEntry>,
}

pub fn build_dashboard(stats: TransferStats, recent: &[Transfer]) -> Dashboard {
    let saved = fees_saved(&stats);
    let savings_percentage = if stats.total_volume > 0.0 {
        format!("{:.2}%", saved / stats.total_volume * 100.0)
    } else {
        "0%".to_string()
    };

    Dashboard {
        overview: Overview {
            total_transfers: stats.total_transfers,
            total_volume: format_usd(stats.total_volume),
            total_fees_saved: format_usd(saved),
            average_transfer_size: format!(
                "${:.2}",
                average(stats.total_volume, stats.total_transfers)
            ),
            savings_percentage,
        },
        recent_activity: recent
            .iter()
            .map(|t| ActivityEntry::from_transfer(t, t.estimated_fees))
            .collect(),
        chain_distribution: stats.by_destination_chain,
        intent_distribution: stats.by_intent,
    }
}

pub async fn dashboard(store: &dyn TransferStore) -> Result<Dashboard> {
    let (stats, recent) = futures::try_join!(store.stats(), store.recent(DASHBOARD_RECENT))?;
    Ok(build_dashboard(stats, &recent))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeeSide {
    pub total_fees: f64,
    pub percentage: f64,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Savings {
    pub amount: f64,
    pub percentage: f64,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SavingsAnalysis {
    pub transfers: u64,
    pub average_savings_per_transfer: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SavingsComparison {
    pub traditional: FeeSide,
    pub borderhop: FeeSide,
    pub savings: Savings,
    pub analysis: SavingsAnalysis,
}

pub fn build_savings_comparison(stats: &TransferStats) -> SavingsComparison {
    let traditional_fees = stats.total_volume * TRADITIONAL_FEE_RATE;
    let total_savings = traditional_fees - stats.total_fees;
    let percentage = if stats.total_volume > 0.0 {
        total_savings / traditional_fees * 100.0
    } else {
        0.0
    };

    SavingsComparison {
        traditional: FeeSide {
            total_fees: traditional_fees,
            percentage: TRADITIONAL_FEE_PERCENT,
            description: "Traditional remittance services (Western Union, MoneyGram)",
        },
        borderhop: FeeSide {
            total_fees: stats.total_fees,
            percentage: BORDERHOP_FEE_PERCENT,
            description: "BorderHop with Circle CCTP V2",
        },
        savings: Savings {
            amount: total_savings,
            percentage,
            description: "Total savings using BorderHop",
        },
        analysis: SavingsAnalysis {
            transfers: stats.total_transfers,
            average_savings_per_transfer: average(total_savings, stats.total_transfers),
            volume: stats.total_volume,
        },
    }
}

pub async fn savings_comparison(store: &dyn TransferStore) -> Result<SavingsComparison> {
    Ok(build_savings_comparison(&store.stats().await?))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransferPerformance {
    pub total: u64,
    pub successful: u64,
    pub success_rate: f64,
    pub average_processing_time: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VolumePerformance {
    pub total: f64,
    pub average: f64,
    pub largest: f64,
    pub trend: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeePerformance {
    pub total_paid: f64,
    pub average_per_transfer: f64,
    pub savings: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChainPerformance {
    pub most_popular: String,
    pub distribution: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Performance {
    pub transfers: TransferPerformance,
    pub volume: VolumePerformance,
    pub fees: FeePerformance,
    pub chains: ChainPerformance,
}

pub fn build_performance(stats: TransferStats) -> Performance {
    let most_popular = ranked(&stats.by_destination_chain)
        .first()
        .map(|(chain, _)| chain.to_string())
        .unwrap_or_else(|| "ethereum".to_string());

    Performance {
        // every recorded transfer counts as successful
        transfers: TransferPerformance {
            total: stats.total_transfers,
            successful: stats.total_transfers,
            success_rate: 100.0,
            average_processing_time: AVERAGE_PROCESSING_TIME,
        },
        volume: VolumePerformance {
            total: stats.total_volume,
            average: average(stats.total_volume, stats.total_transfers),
            largest: stats.total_volume.max(0.0),
            trend: "increasing",
        },
        fees: FeePerformance {
            total_paid: stats.total_fees,
            average_per_transfer: average(stats.total_fees, stats.total_transfers),
            savings: fees_saved(&stats),
        },
        chains: ChainPerformance { most_popular, distribution: stats.by_destination_chain },
    }
}

pub async fn performance(store: &dyn TransferStore) -> Result<Performance> {
    Ok(build_performance(store.stats().await?))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChainRank {
    pub chain: String,
    pub transfers: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserBehavior {
    pub most_popular_intent: String,
    pub average_transfer_size: f64,
    pub volume_trend: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub impact: &'static str,
    pub action: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MarketOpportunity {
    pub region: &'static str,
    pub opportunity: &'static str,
    pub potential: &'static str,
    pub strategy: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    pub top_performing_chains: Vec<ChainRank>,
    pub user_behavior: UserBehavior,
    pub recommendations: Vec<Recommendation>,
    pub market_opportunities: Vec<MarketOpportunity>,
}

fn static_recommendations() -> Vec<Recommendation> {
    vec![
        Recommendation {
            kind: "chain_optimization",
            title: "Optimize for Base Chain",
            description: "Base shows highest DeFi yields (5.2% APY)",
            impact: "high",
            action: "Route more transfers to Base for yield optimization",
        },
        Recommendation {
            kind: "fee_optimization",
            title: "Use CCTP V2 Hooks",
            description: "Implement post-transfer DeFi deposits",
            impact: "medium",
            action: "Enable auto-deposit hooks for yield maximization",
        },
        Recommendation {
            kind: "user_experience",
            title: "Intent-Based Routing",
            description: "Users prefer yield maximization",
            impact: "high",
            action: "Promote yield optimization features",
        },
    ]
}

fn market_opportunities() -> Vec<MarketOpportunity> {
    vec![
        MarketOpportunity {
            region: "Latin America",
            opportunity: "High remittance volume, low competition",
            potential: "high",
            strategy: "Focus on Base chain for low fees",
        },
        MarketOpportunity {
            region: "Southeast Asia",
            opportunity: "Growing DeFi adoption",
            potential: "medium",
            strategy: "Promote yield farming features",
        },
    ]
}

pub fn build_insights(stats: &TransferStats) -> Insights {
    let top_performing_chains = ranked(&stats.by_destination_chain)
        .into_iter()
        .take(3)
        .map(|(chain, transfers)| ChainRank { chain: chain.to_string(), transfers })
        .collect();
    let most_popular_intent = ranked(&stats.by_intent)
        .first()
        .map(|(intent, _)| intent.to_string())
        .unwrap_or_else(|| "standard".to_string());

    Insights {
        top_performing_chains,
        user_behavior: UserBehavior {
            most_popular_intent,
            average_transfer_size: average(stats.total_volume, stats.total_transfers),
            volume_trend: if stats.total_volume > HIGH_VOLUME_THRESHOLD { "high" } else { "low" },
        },
        recommendations: static_recommendations(),
        market_opportunities: market_opportunities(),
    }
}

pub async fn insights(store: &dyn TransferStore) -> Result<Insights> {
    Ok(build_insights(&store.stats().await?))
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentStats {
    pub total_transfers: u64,
    pub total_volume: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveMetrics {
    pub transfers_today: usize,
    pub volume_today: f64,
    pub average_processing_time: &'static str,
    pub system_status: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Realtime {
    pub current_stats: CurrentStats,
    pub recent_activity: Vec<ActivityEntry>,
    pub live_metrics: LiveMetrics,
}

/// "Today" is the UTC calendar day of `now`, counted over the recent window only.
pub fn build_realtime(stats: &TransferStats, recent: &[Transfer], now: DateTime<Utc>) -> Realtime {
    let today = now.date_naive();
    let todays: Vec<&Transfer> =
        recent.iter().filter(|t| t.created_at.date_naive() == today).collect();

    Realtime {
        current_stats: CurrentStats {
            total_transfers: stats.total_transfers,
            total_volume: stats.total_volume,
        },
        recent_activity: recent
            .iter()
            .map(|t| ActivityEntry::from_transfer(t, BORDERHOP_FEE_RATE))
            .collect(),
        live_metrics: LiveMetrics {
            transfers_today: todays.len(),
            volume_today: todays.iter().map(|t| t.amount).sum(),
            average_processing_time: AVERAGE_PROCESSING_TIME,
            system_status: "healthy",
        },
    }
}

pub async fn realtime(store: &dyn TransferStore, now: DateTime<Utc>) -> Result<Realtime> {
    let (stats, recent) = futures::try_join!(store.stats(), store.recent(REALTIME_RECENT))?;
    Ok(build_realtime(&stats, &recent, now))
}
