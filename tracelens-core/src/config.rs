//! Layout and session configuration.
//!
//! Every value has a default and can be overridden from `TRACELENS_*`
//! environment variables. Values that do not parse or fail validation fall
//! back to the default.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

use crate::error::{Error, Result};

/// Layout constants shared by the view adapters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Horizontal distance between decision-tree depth columns.
    pub level_spacing: f64,
    /// Vertical distance between adjacent decision-tree slots.
    pub min_vertical_gap: f64,
    /// Smallest waterfall bar width, in percent of the trace.
    pub min_visible_width_pct: f64,
    /// Labels longer than this are cut and suffixed with `...`.
    pub label_max_chars: usize,
    /// Tree-of-thought canvas width.
    pub tot_width: f64,
    /// Tree-of-thought canvas height.
    pub tot_height: f64,
    /// Number of waterfall ruler intervals.
    pub waterfall_tick_count: usize,
    /// Bars narrower than this (percent) hide their label.
    pub waterfall_label_min_pct: f64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            level_spacing: 180.0,
            min_vertical_gap: 60.0,
            min_visible_width_pct: 0.5,
            label_max_chars: 30,
            tot_width: 900.0,
            tot_height: 500.0,
            waterfall_tick_count: 10,
            waterfall_label_min_pct: 5.0,
        }
    }
}

impl ViewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            level_spacing: parse_or(
                &lookup,
                "TRACELENS_LEVEL_SPACING",
                d.level_spacing,
                is_positive,
            ),
            min_vertical_gap: parse_or(
                &lookup,
                "TRACELENS_MIN_VERTICAL_GAP",
                d.min_vertical_gap,
                is_positive,
            ),
            min_visible_width_pct: parse_or(
                &lookup,
                "TRACELENS_MIN_VISIBLE_WIDTH_PCT",
                d.min_visible_width_pct,
                is_width_pct,
            ),
            label_max_chars: parse_or(
                &lookup,
                "TRACELENS_LABEL_MAX_CHARS",
                d.label_max_chars,
                is_nonzero,
            ),
            tot_width: parse_or(&lookup, "TRACELENS_TOT_WIDTH", d.tot_width, is_positive),
            tot_height: parse_or(&lookup, "TRACELENS_TOT_HEIGHT", d.tot_height, is_positive),
            waterfall_tick_count: parse_or(
                &lookup,
                "TRACELENS_WATERFALL_TICKS",
                d.waterfall_tick_count,
                is_nonzero,
            ),
            waterfall_label_min_pct: parse_or(
                &lookup,
                "TRACELENS_WATERFALL_LABEL_MIN_PCT",
                d.waterfall_label_min_pct,
                is_label_pct,
            ),
        }
    }

    /// Set decision-tree column spacing.
    pub fn level_spacing(mut self, spacing: f64) -> Self {
        self.level_spacing = spacing;
        self
    }

    /// Set decision-tree row gap.
    pub fn min_vertical_gap(mut self, gap: f64) -> Self {
        self.min_vertical_gap = gap;
        self
    }

    pub fn min_visible_width_pct(mut self, pct: f64) -> Self {
        self.min_visible_width_pct = pct;
        self
    }

    pub fn label_max_chars(mut self, max: usize) -> Self {
        self.label_max_chars = max;
        self
    }

    /// Set the tree-of-thought canvas size.
    pub fn tot_canvas(mut self, width: f64, height: f64) -> Self {
        self.tot_width = width;
        self.tot_height = height;
        self
    }

    pub fn waterfall_tick_count(mut self, count: usize) -> Self {
        self.waterfall_tick_count = count;
        self
    }

    pub fn waterfall_label_min_pct(mut self, pct: f64) -> Self {
        self.waterfall_label_min_pct = pct;
        self
    }

    /// Check that all dimensions are usable.
    ///
    /// A zero gap or spacing would stack nodes on top of each other, and a
    /// non-finite percentage would leak NaN into the waterfall.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("level_spacing", self.level_spacing),
            ("min_vertical_gap", self.min_vertical_gap),
            ("tot_width", self.tot_width),
            ("tot_height", self.tot_height),
        ];
        for (name, value) in positive {
            if !is_positive(&value) {
                return Err(Error::config(format!("{} must be positive, got {}", name, value)));
            }
        }
        if !is_width_pct(&self.min_visible_width_pct) {
            return Err(Error::config(format!(
                "min_visible_width_pct must be in (0, 100], got {}",
                self.min_visible_width_pct
            )));
        }
        if !is_label_pct(&self.waterfall_label_min_pct) {
            return Err(Error::config(format!(
                "waterfall_label_min_pct must be in [0, 100], got {}",
                self.waterfall_label_min_pct
            )));
        }
        if self.label_max_chars == 0 {
            return Err(Error::config("label_max_chars must be at least 1"));
        }
        if self.waterfall_tick_count == 0 {
            return Err(Error::config("waterfall_tick_count must be at least 1"));
        }
        Ok(())
    }
}

/// Trace session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub views: ViewConfig,
    /// Capacity of the session event broadcast channel.
    pub event_channel_capacity: usize,
    /// Initial tree-of-thought filter.
    pub show_only_selected: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            views: ViewConfig::default(),
            event_channel_capacity: 64,
            show_only_selected: false,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            views: ViewConfig::from_lookup(&lookup),
            event_channel_capacity: parse_or(
                &lookup,
                "TRACELENS_EVENT_CAPACITY",
                d.event_channel_capacity,
                is_nonzero,
            ),
            show_only_selected: lookup("TRACELENS_SHOW_ONLY_SELECTED")
                .map(|s| s == "1" || s.eq_ignore_ascii_case("true"))
                .unwrap_or(d.show_only_selected),
        }
    }

    pub fn views(mut self, views: ViewConfig) -> Self {
        self.views = views;
        self
    }

    /// Set event channel capacity.
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn show_only_selected(mut self, enabled: bool) -> Self {
        self.show_only_selected = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.views.validate()?;
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event_channel_capacity must be at least 1"));
        }
        Ok(())
    }
}

fn parse_or<T: FromStr + Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
    valid: fn(&T) -> bool,
) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if valid(&value) => value,
        _ => {
            warn!(key, value = %raw, default = %default, "ignoring invalid config value");
            default
        }
    }
}

fn is_positive(value: &f64) -> bool {
    value.is_finite() && *value > 0.0
}

fn is_width_pct(value: &f64) -> bool {
    *value > 0.0 && *value <= 100.0
}

fn is_label_pct(value: &f64) -> bool {
    (0.0..=100.0).contains(value)
}

fn is_nonzero(value: &usize) -> bool {
    *value > 0
}
