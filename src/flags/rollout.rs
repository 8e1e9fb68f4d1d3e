//! Rollout bucketing.
//!
//! A context is mapped into one of [`TOTAL_BUCKETS`] buckets by hashing
//! `"{flag_key}-{rule_id}-{seed}-{sticky_key}"` with MD5 (see [`crate::sharder`]). It is included
//! in the rollout iff `bucket < percentage * 100`. The mapping only depends on its inputs, so a
//! sticky key lands in the same bucket across calls, processes and releases.
use rand::{thread_rng, Rng};

use crate::sharder::PreSaltedSharder;

use super::{InvalidRuleError, Rollout};

/// Number of buckets a rollout population is divided into. One bucket is 0.01%.
pub const TOTAL_BUCKETS: u64 = 10_000;

#[derive(Debug)]
pub(crate) enum CompiledRollout {
    /// 0%: never activates.
    Never,
    /// 100%: always activates.
    Always,
    Partial {
        /// `percentage * 100`, compared against the bucket.
        threshold: f64,
        sharder: PreSaltedSharder,
    },
}

/// Outcome of bucketing a single context.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Bucketing {
    pub included: bool,
    /// Bucket the context landed in. `None` if no bucket had to be computed.
    pub bucket: Option<u32>,
}

impl CompiledRollout {
    pub(crate) fn compile(
        flag_key: &str,
        rule_id: &str,
        rollout: &Rollout,
    ) -> Result<CompiledRollout, InvalidRuleError> {
        let percentage = rollout.percentage;
        if !(0.0..=100.0).contains(&percentage) {
            // NaN lands here too.
            return Err(InvalidRuleError::InvalidRolloutPercentage(percentage));
        }

        Ok(if percentage == 0.0 {
            CompiledRollout::Never
        } else if percentage == 100.0 {
            CompiledRollout::Always
        } else {
            let seed = rollout.seed.to_string();
            CompiledRollout::Partial {
                threshold: percentage * 100.0,
                sharder: PreSaltedSharder::new(
                    &[
                        flag_key.as_bytes(),
                        b"-",
                        rule_id.as_bytes(),
                        b"-",
                        seed.as_bytes(),
                        b"-",
                    ],
                    TOTAL_BUCKETS,
                ),
            }
        })
    }

    /// Decide whether the context identified by `sticky_key` is included.
    ///
    /// Anonymous contexts (no sticky key) get a fresh random bucket on every call.
    pub(crate) fn bucket(&self, sticky_key: Option<&str>) -> Bucketing {
        match self {
            CompiledRollout::Never => Bucketing {
                included: false,
                bucket: None,
            },
            CompiledRollout::Always => Bucketing {
                included: true,
                bucket: None,
            },
            CompiledRollout::Partial { threshold, sharder } => {
                let bucket = match sticky_key {
                    Some(key) => sharder.get_shard(key),
                    None => {
                        log::trace!(target: "flagforge", "no sticky key, using random bucket");
                        thread_rng().gen_range(0..TOTAL_BUCKETS)
                    }
                };
                Bucketing {
                    included: (bucket as f64) < *threshold,
                    bucket: Some(bucket as u32),
                }
            }
        }
    }
}

/// Return `true` if the context identified by `sticky_key` falls into `rollout` of the rule
/// `rule_id` of flag `flag_key`.
///
/// This is the same decision the evaluation engine makes. It fails only if the rollout
/// percentage is outside of `[0, 100]`.
///
/// ```
/// # use flagforge::flags::{in_bucket, Rollout};
/// let rollout = Rollout { percentage: 50.0, seed: 1 };
/// let first = in_bucket("new-checkout", "rule-1", &rollout, Some("u1")).unwrap();
/// assert_eq!(in_bucket("new-checkout", "rule-1", &rollout, Some("u1")).unwrap(), first);
/// ```
pub fn in_bucket(
    flag_key: &str,
    rule_id: &str,
    rollout: &Rollout,
    sticky_key: Option<&str>,
) -> Result<bool, InvalidRuleError> {
    Ok(CompiledRollout::compile(flag_key, rule_id, rollout)?
        .bucket(sticky_key)
        .included)
}
