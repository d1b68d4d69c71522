//! Rule evaluation over a fingerprint's observation history.
//!
//! Rules run in the fixed order of [`InsightKind::EVALUATION_ORDER`]
//! so a single observation that satisfies several rules always yields
//! insights in a deterministic sequence. Each kind carries an
//! independent cooldown: the most recent insight of that kind for the
//! fingerprint must be older than the configured window before the rule
//! may fire again.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::config::EngineConfig;
use crate::domain::{Insight, InsightKind, PriceObservation};
use crate::store::{Repository, StoreError};

/// The new observation plus the context the rules need.
#[derive(Debug)]
pub struct ObservationContext<'a> {
    /// The observation that was just appended.
    pub observation: &'a PriceObservation,
    /// Prior observations within the lowest-price window, ascending by
    /// `observed_at`, excluding `observation` itself.
    pub history: &'a [PriceObservation],
    /// Most recent prior observation regardless of the window; `None`
    /// only for a fingerprint's first observation.
    pub previous: Option<&'a PriceObservation>,
    /// Promotional banner text extracted alongside the price, if any.
    pub promo_banner: Option<&'a str>,
    /// Voucher code extracted alongside the price, if any.
    pub voucher_code: Option<&'a str>,
}

/// Evaluates insight rules after each stored observation.
#[derive(Debug, Clone)]
pub struct InsightEngine {
    repo: Arc<dyn Repository>,
    price_drop_threshold_pct: f64,
    lowest_window_days: i64,
    risk_window_len: usize,
    risk_rise_threshold_pct: f64,
    cooldown: Duration,
}

impl InsightEngine {
    /// Builds an engine with thresholds taken from configuration.
    #[must_use]
    pub fn new(repo: Arc<dyn Repository>, config: &EngineConfig) -> Self {
        Self {
            repo,
            price_drop_threshold_pct: config.price_drop_threshold_pct,
            lowest_window_days: config.lowest_window_days,
            risk_window_len: config.risk_window_len,
            risk_rise_threshold_pct: config.risk_rise_threshold_pct,
            cooldown: Duration::hours(config.insight_cooldown_hours),
        }
    }

    /// Runs every rule in order and persists the insights that fired.
    ///
    /// Returns the created insights, in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] when the cooldown lookup or the insert
    /// fails; already-created insights from earlier rules stay persisted.
    pub async fn evaluate(
        &self,
        ctx: &ObservationContext<'_>,
    ) -> Result<Vec<Insight>, StoreError> {
        let mut created = Vec::new();
        for kind in InsightKind::EVALUATION_ORDER {
            let Some(insight) = self.rule(kind, ctx) else {
                continue;
            };
            if self.in_cooldown(ctx, kind).await? {
                tracing::debug!(
                    fingerprint = %ctx.observation.fingerprint_id,
                    %kind,
                    "insight suppressed by cooldown"
                );
                continue;
            }
            self.repo.insert_insight(&insight).await?;
            tracing::info!(
                fingerprint = %ctx.observation.fingerprint_id,
                %kind,
                summary = %insight.summary,
                "insight created"
            );
            created.push(insight);
        }
        Ok(created)
    }

    async fn in_cooldown(
        &self,
        ctx: &ObservationContext<'_>,
        kind: InsightKind,
    ) -> Result<bool, StoreError> {
        let last = self
            .repo
            .last_insight_at(&ctx.observation.fingerprint_id, kind)
            .await?;
        Ok(last.is_some_and(|at| Utc::now() - at < self.cooldown))
    }

    fn rule(&self, kind: InsightKind, ctx: &ObservationContext<'_>) -> Option<Insight> {
        match kind {
            InsightKind::LowestInXDays => self.lowest_in_window(ctx),
            InsightKind::PriceDropPercent => self.price_drop(ctx),
            InsightKind::RiskRising => self.risk_rising(ctx),
            InsightKind::NewCampaignDetected => Self::campaign(ctx),
            InsightKind::VoucherSpotted => Self::voucher(ctx),
        }
    }

    /// New price is strictly below every prior observation in the
    /// window. Needs at least two prior observations there: a series
    /// that barely exists is not evidence of a bargain.
    fn lowest_in_window(&self, ctx: &ObservationContext<'_>) -> Option<Insight> {
        if ctx.history.len() < 2 {
            return None;
        }
        let prior_min = ctx
            .history
            .iter()
            .map(|o| o.lowest_price_minor)
            .min()?;
        let current = ctx.observation.lowest_price_minor;
        if current >= prior_min {
            return None;
        }
        Some(Insight::new(
            ctx.observation.fingerprint_id.clone(),
            InsightKind::LowestInXDays,
            format!(
                "Lowest price in {} days: {}",
                self.lowest_window_days,
                format_minor(current, ctx.observation)
            ),
            serde_json::json!({
                "window_days": self.lowest_window_days,
                "current_price_minor": current,
                "previous_minimum_minor": prior_min,
            }),
        ))
    }

    /// Relative drop versus the immediately preceding observation, no
    /// matter how far back that observation lies.
    fn price_drop(&self, ctx: &ObservationContext<'_>) -> Option<Insight> {
        let previous = ctx.previous?.lowest_price_minor;
        let current = ctx.observation.lowest_price_minor;
        if previous <= 0 || current >= previous {
            return None;
        }
        let drop_pct = percent_change(previous, current).abs();
        if drop_pct < self.price_drop_threshold_pct {
            return None;
        }
        Some(Insight::new(
            ctx.observation.fingerprint_id.clone(),
            InsightKind::PriceDropPercent,
            format!(
                "Price dropped {drop_pct:.1}% to {}",
                format_minor(current, ctx.observation)
            ),
            serde_json::json!({
                "previous_price_minor": previous,
                "current_price_minor": current,
                "drop_pct": drop_pct,
            }),
        ))
    }

    /// Mean of the most recent K observations (including the new one)
    /// versus the mean of the K before them.
    fn risk_rising(&self, ctx: &ObservationContext<'_>) -> Option<Insight> {
        let k = self.risk_window_len;
        // Need K-1 recent plus K older observations in history.
        if k == 0 || ctx.history.len() < 2 * k - 1 {
            return None;
        }
        let split = ctx.history.len() - (k - 1);
        let recent: Vec<i64> = ctx
            .history
            .get(split..)?
            .iter()
            .map(|o| o.lowest_price_minor)
            .chain(std::iter::once(ctx.observation.lowest_price_minor))
            .collect();
        let older: Vec<i64> = ctx
            .history
            .get(split.checked_sub(k)?..split)?
            .iter()
            .map(|o| o.lowest_price_minor)
            .collect();

        let recent_mean = mean(&recent)?;
        let older_mean = mean(&older)?;
        if older_mean <= 0.0 {
            return None;
        }
        let rise_pct = (recent_mean - older_mean) / older_mean * 100.0;
        if rise_pct < self.risk_rise_threshold_pct {
            return None;
        }
        Some(Insight::new(
            ctx.observation.fingerprint_id.clone(),
            InsightKind::RiskRising,
            format!("Prices trending up {rise_pct:.1}% over recent checks"),
            serde_json::json!({
                "window_len": k,
                "recent_mean_minor": recent_mean,
                "older_mean_minor": older_mean,
                "rise_pct": rise_pct,
            }),
        ))
    }

    fn campaign(ctx: &ObservationContext<'_>) -> Option<Insight> {
        let banner = ctx.promo_banner?;
        Some(Insight::new(
            ctx.observation.fingerprint_id.clone(),
            InsightKind::NewCampaignDetected,
            format!("Campaign spotted: {banner}"),
            serde_json::json!({ "banner": banner }),
        ))
    }

    fn voucher(ctx: &ObservationContext<'_>) -> Option<Insight> {
        let code = ctx.voucher_code?;
        Some(Insight::new(
            ctx.observation.fingerprint_id.clone(),
            InsightKind::VoucherSpotted,
            format!("Voucher code spotted: {code}"),
            serde_json::json!({ "code": code }),
        ))
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i64 = values.iter().sum();
    Some(sum as f64 / values.len() as f64)
}

fn percent_change(previous: i64, current: i64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let change = (current - previous) as f64 / previous as f64 * 100.0;
    change
}

fn format_minor(minor: i64, observation: &PriceObservation) -> String {
    format!(
        "{}{}.{:02}",
        observation.currency.symbol(),
        minor / 100,
        (minor % 100).abs()
    )
}
