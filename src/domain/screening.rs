//! Screening run: snapshot, rule evaluation and ranking over a universe.
//!
//! Per-symbol work only reads that symbol's history (and the shared,
//! read-only benchmark slice), so the universe is fanned out over a rayon
//! pool and merged back in symbol order.

use crate::domain::error::ArascanError;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::ranking::{self, RankConfig};
use crate::domain::rule::{RuleConfig, RuleName};
use crate::domain::rule_eval::{classify, evaluate, LabelThresholds, StatusLabel};
use crate::domain::series_store::SeriesStore;
use crate::domain::snapshot::{compute_snapshot, IndicatorParams, IndicatorSnapshot};
use crate::domain::universe::{Diagnostics, SkipReason};
use crate::ports::reference_port::{NoReferenceData, ReferenceDataPort};
use chrono::NaiveDate;
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningResult {
    pub symbol: String,
    pub reference_date: NaiveDate,
    pub snapshot: IndicatorSnapshot,
    pub passed: bool,
    pub failed_rules: Vec<RuleName>,
    pub status: StatusLabel,
    pub rank_score: f64,
}

#[derive(Debug, Clone)]
pub struct ScreenReport {
    pub shortlist: Vec<ScreeningResult>,
    /// Every processed symbol, passing or not, in symbol order.
    pub results: Vec<ScreeningResult>,
    pub diagnostics: Diagnostics,
}

impl ScreenReport {
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }
}

/// Everything a run needs besides the store and the rule set.
pub struct ScreenContext<'a> {
    pub params: IndicatorParams,
    pub thresholds: LabelThresholds,
    /// Benchmark index symbol inside the store.
    pub benchmark: Option<String>,
    pub reference: &'a dyn ReferenceDataPort,
    pub cancel: Option<&'a AtomicBool>,
    /// Worker count; `0` uses rayon's default.
    pub threads: usize,
}

impl Default for ScreenContext<'_> {
    fn default() -> Self {
        Self {
            params: IndicatorParams::default(),
            thresholds: LabelThresholds::default(),
            benchmark: None,
            reference: &NoReferenceData,
            cancel: None,
            threads: 0,
        }
    }
}

impl ScreenContext<'_> {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Run `f` on a dedicated pool when a worker count is pinned.
pub(crate) fn with_pool<T: Send>(threads: usize, f: impl FnOnce() -> T + Send) -> Result<T, ArascanError> {
    if threads == 0 {
        return Ok(f());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| ArascanError::invalid("engine", "threads", e.to_string()))?;
    Ok(pool.install(f))
}

pub fn run(
    store: &SeriesStore,
    universe: &[String],
    reference_date: NaiveDate,
    rules: &RuleConfig,
    rank: &RankConfig,
    ctx: &ScreenContext<'_>,
) -> Result<ScreenReport, ArascanError> {
    rules.validate()?;

    let benchmark = ctx
        .benchmark
        .as_deref()
        .map(|code| store.history(code, reference_date))
        .filter(|bars| !bars.is_empty());
    if rules.needs_benchmark() && benchmark.is_none() {
        info!("benchmark unavailable; relative strength rule will fail every symbol");
    }

    let mut codes: Vec<&String> = universe
        .iter()
        .filter(|c| ctx.benchmark.as_deref() != Some(c.as_str()))
        .collect();
    codes.sort();
    codes.dedup();

    let outcomes: Vec<(String, Result<ScreeningResult, SkipReason>)> = with_pool(ctx.threads, || {
        codes
            .par_iter()
            .map(|code| {
                if ctx.is_cancelled() {
                    return ((*code).clone(), Err(SkipReason::Cancelled));
                }
                let history = store.history(code, reference_date);
                let outcome = screen_symbol(code, history, benchmark, reference_date, rules, rank, ctx);
                ((*code).clone(), outcome)
            })
            .collect()
    })?;

    let mut diagnostics = Diagnostics::default();
    let mut results = Vec::with_capacity(outcomes.len());
    for (code, outcome) in outcomes {
        match outcome {
            Ok(result) => {
                diagnostics.processed += 1;
                results.push(result);
            }
            Err(reason) => {
                debug!(code = %code, reason = ?reason, "skipped");
                diagnostics.record_skip(&code, reason);
            }
        }
    }

    let shortlist = ranking::select(&results, rank);

    info!(
        processed = diagnostics.processed,
        passed = results.iter().filter(|r| r.passed).count(),
        shortlisted = shortlist.len(),
        skipped_insufficient_history = diagnostics.skipped_insufficient_history,
        skipped_no_data = diagnostics.skipped_no_data,
        profile = %rules.name,
        "screening complete"
    );

    Ok(ScreenReport {
        shortlist,
        results,
        diagnostics,
    })
}

fn screen_symbol(
    code: &str,
    history: &[OhlcvBar],
    benchmark: Option<&[OhlcvBar]>,
    reference_date: NaiveDate,
    rules: &RuleConfig,
    rank: &RankConfig,
    ctx: &ScreenContext<'_>,
) -> Result<ScreeningResult, SkipReason> {
    let snapshot = compute_snapshot(history, benchmark, &ctx.params)?;
    let reference = ctx.reference.get(code);
    let evaluation = evaluate(rules, &snapshot, reference.as_ref());
    let status = classify(&snapshot, &ctx.thresholds);
    let rank_score = rank.method.score(&snapshot);

    Ok(ScreeningResult {
        symbol: code.to_string(),
        reference_date,
        snapshot,
        passed: evaluation.passed,
        failed_rules: evaluation.failed_rules,
        status,
        rank_score,
    })
}
