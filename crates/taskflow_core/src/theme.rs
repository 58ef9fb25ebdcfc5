//! Light/dark display mode and the chart colors derived from it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const THEME_ATTRIBUTE: &str = "data-theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// Grid-line and text colors handed to the charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartColors {
    pub grid: &'static str,
    pub text: &'static str,
}

impl ChartColors {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Light => Self {
                grid: "rgba(0, 0, 0, 0.06)",
                text: "#64748b",
            },
            Theme::Dark => Self {
                grid: "rgba(148, 163, 184, 0.08)",
                text: "#94a3b8",
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThemeController {
    current: Theme,
}

impl ThemeController {
    pub fn new(current: Theme) -> Self {
        Self { current }
    }

    pub fn current(&self) -> Theme {
        self.current
    }

    /// Attribute applied to the document root for the active mode.
    pub fn root_attribute(&self) -> (&'static str, &'static str) {
        (THEME_ATTRIBUTE, self.current.as_str())
    }

    pub fn colors(&self) -> ChartColors {
        ChartColors::for_theme(self.current)
    }

    pub fn toggle(&mut self) -> Theme {
        self.current = self.current.toggled();
        self.current
    }
}
