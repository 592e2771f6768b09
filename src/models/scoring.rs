// Lead scoring state. One score row per lead, created lazily on the first
// recorded activity and recomputed on every mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Score at or above which a lead is auto-converted into a deal.
pub const AUTO_CONVERT_THRESHOLD: i32 = 80;

/// Activity signals that feed the score buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    EmailOpen,
    EmailClick,
    WebsiteVisit,
    FormSubmit,
}

impl ActivityKind {
    /// Parses the wire name of an activity. Unknown names return `None`;
    /// callers treat that as a no-op rather than an error.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "EMAIL_OPEN" => Some(Self::EmailOpen),
            "EMAIL_CLICK" => Some(Self::EmailClick),
            "WEBSITE_VISIT" => Some(Self::WebsiteVisit),
            "FORM_SUBMIT" => Some(Self::FormSubmit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn for_score(total: i32) -> Self {
        if total >= 80 {
            Self::A
        } else if total >= 60 {
            Self::B
        } else if total >= 40 {
            Self::C
        } else {
            Self::D
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeadScore {
    pub score_id: Uuid,
    pub org_id: Uuid,
    pub lead_id: Uuid,
    pub engagement_score: i32,
    pub demographic_score: i32,
    pub behavior_score: i32,
    pub total_score: i32,
    pub grade: Grade,
    pub email_opens: i32,
    pub email_clicks: i32,
    pub website_visits: i32,
    pub form_submissions: i32,
    pub last_activity_at: Option<DateTime<Utc>>,
    /// Monotonic: flips false -> true exactly once, on auto-conversion.
    pub auto_converted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadScore {
    pub fn new(org_id: Uuid, lead_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            score_id: Uuid::new_v4(),
            org_id,
            lead_id,
            engagement_score: 0,
            demographic_score: 0,
            behavior_score: 0,
            total_score: 0,
            grade: Grade::D,
            email_opens: 0,
            email_clicks: 0,
            website_visits: 0,
            form_submissions: 0,
            last_activity_at: None,
            auto_converted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies one activity signal to the counters and score buckets.
    pub fn apply(&mut self, kind: ActivityKind) {
        match kind {
            ActivityKind::EmailOpen => {
                self.email_opens += 1;
                self.engagement_score += 5;
            }
            ActivityKind::EmailClick => {
                self.email_clicks += 1;
                self.engagement_score += 10;
            }
            ActivityKind::WebsiteVisit => {
                self.website_visits += 1;
                self.behavior_score += 3;
            }
            ActivityKind::FormSubmit => {
                self.form_submissions += 1;
                self.behavior_score += 15;
            }
        }
        self.recalculate();
    }

    /// Recomputes the derived total and grade from the three buckets.
    pub fn recalculate(&mut self) {
        self.total_score = self.engagement_score + self.demographic_score + self.behavior_score;
        self.grade = Grade::for_score(self.total_score);
        self.updated_at = Utc::now();
    }
}
