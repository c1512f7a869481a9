use serde::{Deserialize, Serialize};

use super::types::{Chat, Millis, TimeWindow};

const DAY_MS: Millis = 24 * 60 * 60 * 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeSelector {
    #[default]
    Day,
    Week,
    Month,
    Quarter,
    Year,
    All,
    Custom,
}

impl RangeSelector {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Some(Self::Day),
            "week" => Some(Self::Week),
            "month" => Some(Self::Month),
            "quarter" => Some(Self::Quarter),
            "year" => Some(Self::Year),
            "all" => Some(Self::All),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
            Self::All => "all",
            Self::Custom => "custom",
        }
    }

    fn fixed_days(&self) -> Option<Millis> {
        match self {
            Self::Day => Some(1),
            Self::Week => Some(7),
            Self::Month => Some(30),
            Self::Quarter => Some(90),
            Self::Year => Some(365),
            Self::All | Self::Custom => None,
        }
    }
}

/// Caller-supplied bounds for [`RangeSelector::Custom`]. Ignored otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomBounds {
    pub from: Option<Millis>,
    pub to: Option<Millis>,
}

/// Maps a range selector to a concrete window ending at `now`.
pub fn resolve_window(
    range: RangeSelector,
    custom: CustomBounds,
    chats: &[Chat],
    now: Millis,
) -> TimeWindow {
    let day_default = now - DAY_MS;

    let (from, to) = match range {
        RangeSelector::All => (earliest_activity(chats).unwrap_or(0), now),
        RangeSelector::Custom => (
            custom.from.unwrap_or(day_default),
            custom.to.unwrap_or(now),
        ),
        fixed => {
            let days = fixed.fixed_days().unwrap_or(1);
            (now - days * DAY_MS, now)
        }
    };

    let from = if from <= 0 { day_default } else { from };
    TimeWindow::new(from, to)
}

fn earliest_activity(chats: &[Chat]) -> Option<Millis> {
    chats
        .iter()
        .flat_map(|c| [c.started_at, c.last_message_at])
        .flatten()
        .filter(|ts| *ts > 0)
        .min()
}
