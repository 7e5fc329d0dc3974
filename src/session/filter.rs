//! Request URL filters that decide which network requests are analytics hits.

use regex::{Regex, RegexSet};

use crate::config::HitPattern;
use crate::utils::{BrokerError, Result};

/// One include pattern plus any number of exclusions.
///
/// `regex` has no look-around, so "google collect, but not behind a Kwai
/// proxy" is written as include `google.*collect` and exclude `kwai.*google`.
#[derive(Debug, Clone)]
pub struct HitFilter {
    include: Regex,
    exclude: RegexSet,
}

impl HitFilter {
    pub fn new(pattern: &HitPattern) -> Result<Self> {
        let include = Regex::new(&pattern.include).map_err(|e| {
            BrokerError::configuration(format!("invalid hit pattern {:?}: {e}", pattern.include))
        })?;
        let exclude = RegexSet::new(&pattern.exclude).map_err(|e| {
            BrokerError::configuration(format!("invalid hit exclusion {:?}: {e}", pattern.exclude))
        })?;
        Ok(Self { include, exclude })
    }

    pub fn accepts(&self, url: &str) -> bool {
        self.include.is_match(url) && !self.exclude.is_match(url)
    }
}
