//! Timestamp convention discovery and monotonicity enforcement.
//!
//! DataFlash logs carry their time axis in-band: whichever of the known
//! timestamp labels shows up first in an FMT record fixes the convention for
//! the whole log. Descriptors seen before that point are parked and flushed
//! once the convention is known.

use tracing::{debug, warn};

use super::descriptor::TypeDescriptor;
use crate::status::ParseStatus;
use crate::value::{NameValuePair, Value};

/// A timestamp field name together with the divisor converting raw ticks to
/// seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampConvention {
    pub name: String,
    pub divisor: f64,
}

impl TimestampConvention {
    pub(crate) fn new(name: &str, divisor: f64) -> Self {
        Self {
            name: name.to_string(),
            divisor,
        }
    }
}

/// Non-monotonic warnings logged verbosely before suppression kicks in.
const VERBOSE_TIME_ERRORS: u64 = 50;

pub(crate) struct TimestampManager {
    candidates: Vec<TimestampConvention>,
    active: Option<TimestampConvention>,
    deferred: Vec<TypeDescriptor>,
    last_valid: u64,
    error_count: u64,
}

impl TimestampManager {
    pub fn new() -> Self {
        Self {
            candidates: vec![
                TimestampConvention::new("TimeUS", 1_000_000.0),
                TimestampConvention::new("TimeMS", 1_000.0),
            ],
            active: None,
            deferred: Vec::new(),
            last_valid: 0,
            error_count: 0,
        }
    }

    pub fn active(&self) -> Option<&TimestampConvention> {
        self.active.as_ref()
    }

    /// Last non-decreasing raw timestamp observed.
    pub fn last_valid(&self) -> u64 {
        self.last_valid
    }

    /// The active convention, discovering it from this descriptor's labels
    /// on first match. Candidate order wins; once set it never changes.
    pub fn establish(&mut self, desc: &TypeDescriptor) -> Option<TimestampConvention> {
        if self.active.is_none() {
            self.active = self
                .candidates
                .iter()
                .find(|candidate| desc.labels.iter().any(|label| *label == candidate.name))
                .cloned();
            if let Some(ts) = &self.active {
                debug!("timestamp convention {} established by {}", ts.name, desc.name);
            }
        }
        self.active.clone()
    }

    /// Park a descriptor that arrived before the convention was known.
    pub fn defer(&mut self, desc: TypeDescriptor) {
        self.deferred.push(desc);
    }

    /// Drain the deferred queue in arrival order.
    pub fn take_deferred(&mut self) -> Vec<TypeDescriptor> {
        std::mem::take(&mut self.deferred)
    }

    /// Enforce non-decreasing time on the value at `index`.
    ///
    /// A regressing value is rewritten to the last valid timestamp and
    /// recorded as a corrupt-time incident. The warning log is verbose for
    /// the first [`VERBOSE_TIME_ERRORS`] occurrences only; the status keeps
    /// counting all of them.
    pub fn enforce_monotonic(
        &mut self,
        values: &mut [NameValuePair],
        index: usize,
        message_counter: u64,
        status: &mut ParseStatus,
    ) {
        let Some(pair) = values.get_mut(index) else {
            return;
        };
        let raw = pair.1.as_u64();
        if raw >= self.last_valid {
            self.last_valid = raw;
            return;
        }

        if self.error_count < VERBOSE_TIME_ERRORS {
            warn!(
                "log time is not increasing, last valid time stamp {} but read {}",
                self.last_valid, raw
            );
        } else if self.error_count == VERBOSE_TIME_ERRORS {
            warn!("suppressing further time-is-not-increasing warnings");
        }
        self.error_count += 1;
        status.corrupt_time(
            message_counter,
            format!(
                "Log time is not increasing! Last Time:{} new Time:{}",
                self.last_valid, raw
            ),
        );
        pair.1 = Value::UInt(self.last_valid);
    }
}
