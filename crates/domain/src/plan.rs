//! Travel plans saved from the chat planner.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, require};

/// Longest generated title, in characters, before `...` is appended.
pub const PLAN_TITLE_CHARS: usize = 30;
const UNTITLED: &str = "Untitled plan";

/// A chat reply the user kept, stored in the `TravelPlan` collection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPlan {
    pub id: String,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub user_id: String,
    pub title: String,
}

impl TravelPlan {
    pub fn paragraphs(&self) -> Vec<&str> {
        paragraphs(&self.content)
    }
}

/// Body of `POST /api/plans`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewPlan {
    #[serde(default)]
    pub content: String,
}

impl NewPlan {
    pub fn validate(&self) -> Result<()> {
        require("Content", &self.content)
    }

    pub fn into_plan(self, user_id: impl Into<String>, timestamp: DateTime<Utc>) -> TravelPlan {
        TravelPlan {
            id: String::new(),
            title: plan_title(&self.content),
            content: self.content,
            timestamp: Some(timestamp),
            user_id: user_id.into(),
        }
    }
}

/// Title shown in the saved plan list: the first non-blank line of the reply,
/// without Markdown heading or emphasis markers, cut to [`PLAN_TITLE_CHARS`].
pub fn plan_title(content: &str) -> String {
    let Some(line) = content
        .lines()
        .map(|line| line.trim().trim_start_matches('#').trim().trim_matches('*').trim())
        .find(|line| !line.is_empty())
    else {
        return UNTITLED.to_owned();
    };
    if line.chars().count() <= PLAN_TITLE_CHARS {
        return line.to_owned();
    }
    let mut title: String = line.chars().take(PLAN_TITLE_CHARS).collect();
    title.truncate(title.trim_end().len());
    title.push_str("...");
    title
}

/// Split a reply into display paragraphs: one per non-blank line, trimmed.
pub fn paragraphs(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}
