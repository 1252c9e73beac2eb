use crate::config::Config;
use crate::constants::MAX_PROBE_FAILURES;
use crate::evictor;
use crate::logging::format_bytes;
use crate::model::{CleanupOutcome, StopReason};
use crate::probe::{DiskProbe, ProbeError, UsageProbe};
use crate::scanner;
use std::path::PathBuf;
use std::thread;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("cannot read usage of {}: {source}", mount_point.display())]
    ProbeUnavailable {
        mount_point: PathBuf,
        #[source]
        source: ProbeError,
    },
    #[error(
        "lost usage readings for {} after {failures} consecutive failures, sweep abandoned",
        mount_point.display()
    )]
    ProbeLost { mount_point: PathBuf, failures: u32 },
}

/// Runs one reclamation pass against the configured volume.
pub fn run(config: &Config, dry_run: bool) -> Result<CleanupOutcome, RunError> {
    Controller::new(config, DiskProbe).run(dry_run)
}

/// Decides whether to clean, then drains directories in priority order
/// until usage drops to the target or nothing eligible is left.
pub struct Controller<'a, P> {
    config: &'a Config,
    probe: P,
}

impl<'a, P: UsageProbe> Controller<'a, P> {
    pub fn new(config: &'a Config, probe: P) -> Self {
        Self { config, probe }
    }

    pub fn run(&self, dry_run: bool) -> Result<CleanupOutcome, RunError> {
        let config = self.config;
        let usage = self
            .probe
            .measure(&config.mount_point)
            .map_err(|source| RunError::ProbeUnavailable {
                mount_point: config.mount_point.clone(),
                source,
            })?;
        let outcome = CleanupOutcome::new(usage);

        if usage < config.trigger_threshold {
            info!(
                usage,
                trigger = config.trigger_threshold,
                "usage below trigger, nothing to do"
            );
            let outcome = outcome.stopped(StopReason::BelowTrigger);
            report(&outcome, dry_run);
            return Ok(outcome);
        }

        info!(
            usage,
            trigger = config.trigger_threshold,
            target = config.target_threshold,
            dry_run,
            "usage at or above trigger, starting sweep"
        );

        let outcome = self.sweep(outcome, dry_run)?;
        let outcome = if dry_run {
            outcome
        } else {
            self.with_final_usage(outcome)
        };

        report(&outcome, dry_run);
        Ok(outcome)
    }

    fn sweep(
        &self,
        mut outcome: CleanupOutcome,
        dry_run: bool,
    ) -> Result<CleanupOutcome, RunError> {
        let config = self.config;
        let mut probe_failures = 0;

        for (priority, dir) in config.directories.iter().enumerate() {
            info!(dir = %dir.display(), priority = priority + 1, "sweeping directory");
            let mut round = 0u32;

            loop {
                match self.probe.measure(&config.mount_point) {
                    Ok(usage) if usage <= config.target_threshold => {
                        info!(usage, target = config.target_threshold, "target reached");
                        return Ok(outcome.stopped(StopReason::TargetReached));
                    }
                    Ok(usage) => {
                        probe_failures = 0;
                        debug!(usage, dir = %dir.display(), round, "still above target");
                    }
                    Err(e) => {
                        probe_failures += 1;
                        warn!(
                            error = %e,
                            failures = probe_failures,
                            "usage check failed, treating target as not reached"
                        );
                        if probe_failures >= MAX_PROBE_FAILURES {
                            error!(failures = probe_failures, "giving up on usage readings");
                            report(&outcome.stopped(StopReason::ProbeLost), dry_run);
                            return Err(RunError::ProbeLost {
                                mount_point: config.mount_point.clone(),
                                failures: probe_failures,
                            });
                        }
                    }
                }

                round += 1;
                let batch =
                    scanner::scan(dir, config.retention, config.batch_size, &config.protect);
                info!(dir = %dir.display(), round, eligible = batch.len(), "scanned");
                if batch.is_empty() {
                    break;
                }

                let considered = batch.len();
                let tally = evictor::evict(batch, dry_run);
                outcome = outcome.absorb(considered, tally);

                if dry_run {
                    info!(
                        dir = %dir.display(),
                        would_delete = tally.deleted,
                        bytes = %format_bytes(tally.bytes),
                        "dry run batch"
                    );
                    break;
                }

                info!(
                    dir = %dir.display(),
                    round,
                    deleted = tally.deleted,
                    failed = tally.failed,
                    skipped = tally.skipped,
                    bytes = %format_bytes(tally.bytes),
                    "batch evicted"
                );

                if tally.deleted == 0 {
                    warn!(dir = %dir.display(), "nothing deleted in batch, moving on");
                    break;
                }

                // Let the filesystem's accounting catch up before re-measuring.
                thread::sleep(config.settle_delay);
            }
        }

        Ok(outcome.stopped(StopReason::DirectoriesExhausted))
    }

    fn with_final_usage(&self, outcome: CleanupOutcome) -> CleanupOutcome {
        match self.probe.measure(&self.config.mount_point) {
            Ok(usage) => CleanupOutcome {
                final_usage: Some(usage),
                ..outcome
            },
            Err(e) => {
                warn!(error = %e, "could not re-measure usage after cleanup");
                outcome
            }
        }
    }
}

fn report(outcome: &CleanupOutcome, dry_run: bool) {
    info!(
        dry_run,
        considered = outcome.files_considered,
        deleted = outcome.files_deleted,
        bytes = %format_bytes(outcome.bytes_deleted),
        failed = outcome.files_failed,
        skipped = outcome.files_skipped,
        initial_usage = ?outcome.initial_usage,
        final_usage = ?outcome.final_usage,
        reason = outcome.stop_reason.name(),
        "cleanup finished"
    );
}
