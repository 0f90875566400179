//! Per-node time stamps.
//!
//! Every group and entry carries a [`TimeInfo`]. All instants are UTC.
//! Runtime timestamps keep sub-second precision, but the persisted format
//! only stores whole seconds, so comparisons that must survive a save and
//! reload cycle go through [`Precision::Serialized`].

use crate::CompareOptions;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Precision at which a timestamp is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    /// Full runtime precision.
    #[default]
    High,
    /// Truncated to whole seconds, as stored on disk.
    Serialized,
}

/// Truncates an instant to the precision of the persisted format.
#[must_use]
pub fn serialized(time: DateTime<Utc>) -> DateTime<Utc> {
    time.trunc_subsecs(0)
}

fn at_precision(time: DateTime<Utc>, precision: Precision) -> DateTime<Utc> {
    match precision {
        Precision::High => time,
        Precision::Serialized => serialized(time),
    }
}

fn compare_time(lhs: DateTime<Utc>, rhs: DateTime<Utc>, options: CompareOptions) -> Ordering {
    if options.ignore_milliseconds {
        serialized(lhs).cmp(&serialized(rhs))
    } else {
        lhs.cmp(&rhs)
    }
}

/// Creation, modification, access, expiry and relocation stamps of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInfo {
    creation_time: DateTime<Utc>,
    last_modification_time: DateTime<Utc>,
    last_access_time: DateTime<Utc>,
    expiry_time: DateTime<Utc>,
    expires: bool,
    usage_count: u32,
    location_changed: DateTime<Utc>,
}

impl TimeInfo {
    /// Creates a time info with every stamp set to `now`, not expiring.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            creation_time: now,
            last_modification_time: now,
            last_access_time: now,
            expiry_time: now,
            expires: false,
            usage_count: 0,
            location_changed: now,
        }
    }

    #[must_use]
    pub fn creation_time(&self, precision: Precision) -> DateTime<Utc> {
        at_precision(self.creation_time, precision)
    }

    #[must_use]
    pub fn last_modification_time(&self, precision: Precision) -> DateTime<Utc> {
        at_precision(self.last_modification_time, precision)
    }

    #[must_use]
    pub fn last_access_time(&self, precision: Precision) -> DateTime<Utc> {
        at_precision(self.last_access_time, precision)
    }

    #[must_use]
    pub fn expiry_time(&self, precision: Precision) -> DateTime<Utc> {
        at_precision(self.expiry_time, precision)
    }

    #[must_use]
    pub fn expires(&self) -> bool {
        self.expires
    }

    #[must_use]
    pub fn usage_count(&self) -> u32 {
        self.usage_count
    }

    /// When the node last changed parent.
    #[must_use]
    pub fn location_changed(&self, precision: Precision) -> DateTime<Utc> {
        at_precision(self.location_changed, precision)
    }

    pub fn set_creation_time(&mut self, time: DateTime<Utc>) {
        self.creation_time = time;
    }

    pub fn set_last_modification_time(&mut self, time: DateTime<Utc>) {
        self.last_modification_time = time;
    }

    pub fn set_last_access_time(&mut self, time: DateTime<Utc>) {
        self.last_access_time = time;
    }

    pub fn set_expiry_time(&mut self, time: DateTime<Utc>) {
        self.expiry_time = time;
    }

    pub fn set_expires(&mut self, expires: bool) {
        self.expires = expires;
    }

    pub fn set_usage_count(&mut self, count: u32) {
        self.usage_count = count;
    }

    pub fn set_location_changed(&mut self, time: DateTime<Utc>) {
        self.location_changed = time;
    }

    /// Compares two time infos under the given options.
    ///
    /// Access time and usage count are statistics: they are skipped when
    /// `ignore_statistics` is set. The expiry time is only compared once both
    /// sides agree on whether the node expires at all.
    #[must_use]
    pub fn equals(&self, other: &Self, options: CompareOptions) -> bool {
        if compare_time(self.last_modification_time, other.last_modification_time, options)
            != Ordering::Equal
        {
            return false;
        }
        if compare_time(self.creation_time, other.creation_time, options) != Ordering::Equal {
            return false;
        }
        if !options.ignore_statistics
            && compare_time(self.last_access_time, other.last_access_time, options)
                != Ordering::Equal
        {
            return false;
        }
        if self.expires != other.expires
            || compare_time(self.expiry_time, other.expiry_time, options) != Ordering::Equal
        {
            return false;
        }
        if !options.ignore_statistics && self.usage_count != other.usage_count {
            return false;
        }
        compare_time(self.location_changed, other.location_changed, options) == Ordering::Equal
    }
}
