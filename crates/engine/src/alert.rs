//! Low-balance alerting.

use crate::collector::Collector;
use crate::statistics::SpendEstimator;
use crate::store::BalanceStore;
use balance_core::{
    format_alert_line, format_balance_line, AlertReport, BalanceListing, BalanceStatus,
    NetworkGroup,
};
use chrono::{Local, NaiveDateTime};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// A balance below `estimate * ALERT_MULTIPLIER` is low.
pub const ALERT_MULTIPLIER: f64 = 1.3;

#[inline]
pub fn alert_threshold(estimate: f64) -> f64 {
    estimate * ALERT_MULTIPLIER
}

/// Strictly below the threshold is low; equal is normal.
#[inline]
pub fn classify(balance: f64, estimate: f64) -> BalanceStatus {
    if balance < alert_threshold(estimate) {
        BalanceStatus::Low
    } else {
        BalanceStatus::Normal
    }
}

/// Build a report from live balances and estimates.
///
/// Only partners present in both maps get an entry. A partner with an
/// estimate but no live balance is logged and left out.
pub fn assemble_report(
    network: &str,
    balances: &BTreeMap<String, f64>,
    estimates: &BTreeMap<String, f64>,
    generated_at: NaiveDateTime,
) -> AlertReport {
    let mut report = AlertReport::new(network, generated_at);
    for (partner, &estimate) in estimates {
        let Some(&balance) = balances.get(partner) else {
            error!(network, partner = %partner, "No live balance, skipping partner");
            continue;
        };
        let status = classify(balance, estimate);
        if status.is_low() {
            warn!(
                network,
                partner = %partner,
                balance = balance,
                threshold = alert_threshold(estimate),
                "Low balance"
            );
        }
        report.insert(partner.clone(), format_alert_line(balance, estimate, status));
    }
    report
}

/// Plain listing of live balances.
pub fn assemble_listing(
    network: &str,
    balances: &BTreeMap<String, f64>,
    generated_at: NaiveDateTime,
) -> BalanceListing {
    let mut listing = BalanceListing::new(network, generated_at);
    for (partner, &balance) in balances {
        listing.insert(partner.clone(), format_balance_line(balance));
    }
    listing
}

/// Compares live balances to expected spend and renders reports.
pub struct AlertEngine {
    collector: Arc<Collector>,
    store: Arc<dyn BalanceStore>,
    lookback_days: u32,
}

impl AlertEngine {
    pub fn new(collector: Arc<Collector>, store: Arc<dyn BalanceStore>, lookback_days: u32) -> Self {
        Self {
            collector,
            store,
            lookback_days,
        }
    }

    /// Alert report for the group, stamped with local time.
    pub async fn build_report(&self, group: &NetworkGroup) -> AlertReport {
        self.build_report_at(group, Local::now().naive_local()).await
    }

    pub async fn build_report_at(&self, group: &NetworkGroup, now: NaiveDateTime) -> AlertReport {
        let estimator = SpendEstimator::new(self.store.as_ref(), self.lookback_days);
        let estimates = estimator.estimate_group(group).await;

        // Only partners with an estimate are worth a live fetch.
        let candidates = group.retain(|p| estimates.contains_key(p.name()));
        let balances = self.collector.collect_group(&candidates).await;

        let report = assemble_report(group.name(), &balances, &estimates, now);
        info!(
            network = group.name(),
            partners = group.len(),
            entries = report.len(),
            "Built alert report"
        );
        report
    }

    /// Current balances for the group, stamped with local time.
    pub async fn build_balance_listing(&self, group: &NetworkGroup) -> BalanceListing {
        self.build_balance_listing_at(group, Local::now().naive_local()).await
    }

    pub async fn build_balance_listing_at(
        &self,
        group: &NetworkGroup,
        now: NaiveDateTime,
    ) -> BalanceListing {
        let balances = self.collector.collect_group(group).await;
        assemble_listing(group.name(), &balances, now)
    }
}
