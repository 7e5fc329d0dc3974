use serde::Deserialize;

/// Top-level configuration for a page session.
///
/// Includes wait defaults, the hit filters that route network requests to the
/// GA4 and GA3 streams, and the log level.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub wait: WaitSettings,
    pub hits: HitSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct WaitSettings {
    pub default_timeout_ms: u64,
}

/// Which request URLs count as analytics hits.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HitSettings {
    pub ga4: HitPattern,
    pub ga3: HitPattern,
}

/// A URL is a hit when it matches `include` and none of `exclude`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HitPattern {
    pub include: String,
    pub exclude: Vec<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub wait: Option<PartialWaitSettings>,
    pub hits: Option<PartialHitSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialWaitSettings {
    pub default_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHitSettings {
    pub ga4: Option<PartialHitPattern>,
    pub ga3: Option<PartialHitPattern>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHitPattern {
    pub include: Option<String>,
    pub exclude: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl PartialHitPattern {
    fn merge(pattern: Option<&Self>, default: HitPattern) -> HitPattern {
        HitPattern {
            include: pattern
                .and_then(|p| p.include.clone())
                .unwrap_or(default.include),
            exclude: pattern
                .and_then(|p| p.exclude.clone())
                .unwrap_or(default.exclude),
        }
    }
}

impl PartialSettings {
    /// Fill every missing value from `default`.
    pub fn merge(self, default: Settings) -> Settings {
        let hits = self.hits.as_ref();
        Settings {
            wait: WaitSettings {
                default_timeout_ms: self
                    .wait
                    .as_ref()
                    .and_then(|w| w.default_timeout_ms)
                    .unwrap_or(default.wait.default_timeout_ms),
            },
            hits: HitSettings {
                ga4: PartialHitPattern::merge(hits.and_then(|h| h.ga4.as_ref()), default.hits.ga4),
                ga3: PartialHitPattern::merge(hits.and_then(|h| h.ga3.as_ref()), default.hits.ga3),
            },
            logging: LoggingSettings {
                level: self
                    .logging
                    .as_ref()
                    .and_then(|l| l.level.clone())
                    .unwrap_or(default.logging.level),
            },
        }
    }
}

/// Provides default values for `Settings`.
///
/// The hit patterns skip Kwai pixels that proxy Google collect calls. GA3
/// (Universal Analytics) hits are any collect call that is not GA4's `v=2`.
impl Default for Settings {
    fn default() -> Self {
        Self {
            wait: WaitSettings {
                default_timeout_ms: 5000,
            },
            hits: HitSettings {
                ga4: HitPattern {
                    include: r"google.*collect\?v=2".to_string(),
                    exclude: vec![r"kwai.*google".to_string()],
                },
                ga3: HitPattern {
                    include: r"google.*collect".to_string(),
                    exclude: vec![r"kwai.*google".to_string(), r"collect\?v=2".to_string()],
                },
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
