//! Stress CLI command.
//!
//! Runs many threads against one resolver, each asking for the same set of
//! caller names, and reports how often the computation actually ran.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, ValueEnum};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;
use tracing::{debug, info, instrument};

use crate::adapters::lifetime::TaskSlot;
use crate::cli::output::{key_value_table, output, CommandOutput};
use crate::domain::models::{Config, LifetimeKind, Scope};
use crate::services::{CacheStats, ScopeResolver};

#[derive(Args, Debug)]
pub struct StressArgs {
    /// Number of worker threads
    #[arg(short, long, default_value_t = 8)]
    pub threads: usize,
    /// Distinct caller names each worker asks for
    #[arg(short, long, default_value_t = 16)]
    pub names: usize,
    /// Passes over the caller names per worker
    #[arg(short, long, default_value_t = 100)]
    pub rounds: usize,
    /// Cache tier to exercise
    #[arg(short, long, value_enum, default_value_t = ScopeArg::Instance)]
    pub scope: ScopeArg,
    /// Owner token of the resolver
    #[arg(long, default_value = "stress")]
    pub owner: String,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeArg {
    Instance,
    ProcessWide,
    Lifetime,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Instance => Self::Instance,
            ScopeArg::ProcessWide => Self::ProcessWide,
            ScopeArg::Lifetime => Self::ExternalLifetime,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StressOutput {
    pub scope: Scope,
    pub lifetime: LifetimeKind,
    pub threads: usize,
    pub calls: usize,
    pub computes: usize,
    /// Computations beyond the first one per caller name.
    pub duplicate_computes: usize,
    pub elapsed_ms: u64,
    /// Counters of the cache that served the scope, when it exists on the
    /// calling thread.
    pub stats: Option<CacheStats>,
}

impl CommandOutput for StressOutput {
    fn to_human(&self) -> String {
        let mut rows = vec![
            ("scope", self.scope.to_string()),
            ("lifetime", self.lifetime.as_str().to_string()),
            ("threads", self.threads.to_string()),
            ("calls", self.calls.to_string()),
            ("computes", self.computes.to_string()),
            ("duplicate computes", self.duplicate_computes.to_string()),
            ("elapsed (ms)", self.elapsed_ms.to_string()),
        ];
        if let Some(stats) = self.stats {
            rows.push(("hits", stats.hits.to_string()));
            rows.push(("misses", stats.misses.to_string()));
            rows.push(("entries", stats.entries.to_string()));
            rows.push(("hit rate", format!("{:.1}%", stats.hit_rate() * 100.0)));
        }

        format!("Stress run complete\n{}", key_value_table(("Metric", "Value"), rows))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Expected value for the `index`-th caller name.
const fn expected_value(index: usize) -> usize {
    index * 31 + 7
}

pub fn execute(args: &StressArgs, config: &Config, json: bool) -> Result<()> {
    let result = run(args, config)?;
    output(&result, json);
    Ok(())
}

/// Perform the stress run without printing anything.
#[instrument(skip_all, fields(owner = %args.owner))]
pub fn run(args: &StressArgs, config: &Config) -> Result<StressOutput> {
    if args.threads == 0 {
        bail!("--threads must be at least 1");
    }
    if args.names == 0 {
        bail!("--names must be at least 1");
    }
    let Some(calls) = args
        .threads
        .checked_mul(args.names)
        .and_then(|per_round| per_round.checked_mul(args.rounds))
    else {
        bail!(
            "{} threads x {} names x {} rounds overflows the call count",
            args.threads,
            args.names,
            args.rounds
        );
    };

    let scope = Scope::from(args.scope);
    let resolver = ScopeResolver::from_config(args.owner.clone(), config);
    let computes = AtomicUsize::new(0);
    let names: Vec<String> = (0..args.names).map(|i| format!("caller_{i}")).collect();

    info!(
        scope = %scope,
        threads = args.threads,
        names = args.names,
        rounds = args.rounds,
        "starting stress run"
    );
    let started = Instant::now();

    thread::scope(|s| -> Result<()> {
        let workers: Vec<_> = (0..args.threads)
            .map(|worker| {
                let resolver = &resolver;
                let names = &names;
                let computes = &computes;
                s.spawn(move || {
                    let body = || hammer(resolver, scope, names, args.rounds, computes);
                    // Task-scoped slots only hold values inside a task-local scope.
                    let outcome = if config.lifetime == LifetimeKind::Task {
                        TaskSlot::sync_scope(body)
                    } else {
                        body()
                    };
                    debug!(worker, "stress worker finished");
                    outcome
                })
            })
            .collect();

        for worker in workers {
            worker
                .join()
                .map_err(|_| anyhow!("Stress worker panicked"))??;
        }
        Ok(())
    })?;

    let elapsed = started.elapsed();
    let computes = computes.load(Ordering::SeqCst);
    let stats = match scope {
        Scope::Instance => Some(resolver.instance().stats()),
        Scope::ProcessWide => Some(resolver.process_wide().stats()),
        Scope::ExternalLifetime => resolver.lifetime_cache().map(|cache| cache.stats()),
    };

    Ok(StressOutput {
        scope,
        lifetime: config.lifetime,
        threads: args.threads,
        calls,
        computes,
        duplicate_computes: computes.saturating_sub(args.names),
        elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        stats,
    })
}

fn hammer(
    resolver: &ScopeResolver,
    scope: Scope,
    names: &[String],
    rounds: usize,
    computes: &AtomicUsize,
) -> Result<()> {
    for _ in 0..rounds {
        for (index, name) in names.iter().enumerate() {
            let value: usize = resolver
                .get_or_compute(scope, name, || {
                    computes.fetch_add(1, Ordering::SeqCst);
                    expected_value(index)
                })
                .with_context(|| format!("Lookup of '{name}' failed"))?;

            if value != expected_value(index) {
                bail!(
                    "Caller '{name}' returned {value}, expected {}",
                    expected_value(index)
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(scope: ScopeArg, owner: &str) -> StressArgs {
        StressArgs {
            threads: 4,
            names: 5,
            rounds: 10,
            scope,
            owner: owner.to_string(),
        }
    }

    fn quiet_config(lifetime: LifetimeKind) -> Config {
        let mut config = Config::default();
        config.lifetime = lifetime;
        config.instrumentation.enabled = false;
        config
    }

    #[test]
    fn test_instance_scope_computes_at_least_once_per_name() {
        let result = run(&args(ScopeArg::Instance, "stress-instance"), &quiet_config(LifetimeKind::Container)).unwrap();

        assert_eq!(result.calls, 4 * 5 * 10);
        assert!(result.computes >= 5);
        assert!(result.computes <= 4 * 5);
        let stats = result.stats.unwrap();
        assert_eq!(stats.entries, 5);
        assert!(stats.hits > 0);
    }

    #[test]
    fn test_thread_lifetime_has_no_cache_on_calling_thread() {
        let result = run(&args(ScopeArg::Lifetime, "stress-thread"), &quiet_config(LifetimeKind::Thread)).unwrap();

        // Each worker thread owns its own lifetime cache.
        assert!(result.computes >= 4 * 5);
        assert!(result.stats.is_none());
    }

    #[test]
    fn test_task_lifetime_runs_inside_task_scope() {
        let result = run(&args(ScopeArg::Lifetime, "stress-task"), &quiet_config(LifetimeKind::Task)).unwrap();

        // One compute per name per worker: the scope persists across rounds.
        assert_eq!(result.computes, 4 * 5);
    }

    #[test]
    fn test_rejects_zero_threads() {
        let mut bad = args(ScopeArg::Instance, "stress-zero");
        bad.threads = 0;
        assert!(run(&bad, &quiet_config(LifetimeKind::Container)).is_err());
    }

    #[test]
    fn test_rejects_overflowing_call_count() {
        let mut bad = args(ScopeArg::Instance, "stress-overflow");
        bad.threads = 2;
        bad.names = usize::MAX;
        bad.rounds = 2;

        let err = run(&bad, &quiet_config(LifetimeKind::Container)).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_human_output_includes_stats() {
        let result = run(&args(ScopeArg::ProcessWide, "stress-human"), &quiet_config(LifetimeKind::Container)).unwrap();
        let human = result.to_human();

        assert!(human.contains("process_wide"));
        assert!(human.contains("hit rate"));
    }
}
