//! Per-note access gate.
//!
//! A note can be opened when it is free, the viewer is subscribed or an admin,
//! or the viewer still has free views left. The free-view counter lives on the
//! backend; callers refresh the user after every view instead of counting
//! locally.

use crate::models::{Note, Role, User};
use chrono::{DateTime, Utc};

/// Number of non-free notes a user without a subscription may open.
pub const FREE_VIEW_LIMIT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    FreeNote,
    Subscriber,
    Admin,
    /// Allowed by consuming one free view; `used` is the count before this view.
    FreeView { used: u32 },
    Denied { subscriptions_enabled: bool },
}

impl AccessDecision {
    pub fn is_granted(self) -> bool {
        !matches!(self, AccessDecision::Denied { .. })
    }

    /// Label of the card's primary action, `None` when there is no action.
    pub fn action_label(self) -> Option<String> {
        match self {
            AccessDecision::FreeView { used } => {
                Some(format!("View (Free {}/{})", used, FREE_VIEW_LIMIT))
            }
            AccessDecision::Denied { subscriptions_enabled: true } => Some("Subscribe".to_string()),
            AccessDecision::Denied { subscriptions_enabled: false } => None,
            _ => Some("View Note".to_string()),
        }
    }

    /// Explanation shown instead of a paywall.
    pub fn denial_message(self) -> Option<&'static str> {
        match self {
            AccessDecision::Denied { subscriptions_enabled: false } => Some(
                "Subscriptions are currently disabled, and you have used all of your free views.",
            ),
            AccessDecision::Denied { subscriptions_enabled: true } => {
                Some("You have used all of your free views. Subscribe to keep reading.")
            }
            _ => None,
        }
    }
}

pub fn evaluate(note: &Note, user: &User, now: DateTime<Utc>) -> AccessDecision {
    if note.is_free {
        AccessDecision::FreeNote
    } else if user.is_subscribed(now) {
        AccessDecision::Subscriber
    } else if user.role == Role::Admin {
        AccessDecision::Admin
    } else if user.free_views < FREE_VIEW_LIMIT {
        AccessDecision::FreeView {
            used: user.free_views,
        }
    } else {
        AccessDecision::Denied {
            subscriptions_enabled: user.is_subscription_enabled,
        }
    }
}

pub fn can_view(note: &Note, user: &User, now: DateTime<Utc>) -> bool {
    evaluate(note, user, now).is_granted()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApprovalStatus;
    use chrono::Duration;

    fn note(is_free: bool) -> Note {
        Note {
            id: "n1".to_string(),
            title: "Organic Chemistry".to_string(),
            created_at: Utc::now(),
            approval_status: ApprovalStatus::Approved,
            rejection_reason: None,
            is_free,
            view_count: 0,
            user_id: None,
            thumbnail: None,
        }
    }

    fn user(free_views: u32) -> User {
        User {
            id: "u1".to_string(),
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            role: Role::User,
            subscription_expiry: None,
            free_views,
            is_subscription_enabled: true,
        }
    }

    #[test]
    fn test_free_views_exhausted_is_denied() {
        let now = Utc::now();
        assert!(!can_view(&note(false), &user(2), now));
        assert!(can_view(&note(false), &user(1), now));
        assert_eq!(
            evaluate(&note(false), &user(1), now),
            AccessDecision::FreeView { used: 1 }
        );
    }

    #[test]
    fn test_free_note_always_viewable() {
        assert_eq!(
            evaluate(&note(true), &user(5), Utc::now()),
            AccessDecision::FreeNote
        );
    }

    #[test]
    fn test_active_subscription() {
        let now = Utc::now();
        let mut u = user(2);
        u.subscription_expiry = Some(now + Duration::days(30));
        assert_eq!(evaluate(&note(false), &u, now), AccessDecision::Subscriber);

        u.subscription_expiry = Some(now - Duration::days(1));
        assert!(!can_view(&note(false), &u, now));
    }

    #[test]
    fn test_admin_bypasses_gate() {
        let mut u = user(10);
        u.role = Role::Admin;
        assert_eq!(evaluate(&note(false), &u, Utc::now()), AccessDecision::Admin);
    }

    #[test]
    fn test_denied_without_subscriptions_explains() {
        let mut u = user(2);
        u.is_subscription_enabled = false;
        let decision = evaluate(&note(false), &u, Utc::now());
        assert_eq!(
            decision,
            AccessDecision::Denied {
                subscriptions_enabled: false
            }
        );
        assert_eq!(decision.action_label(), None);
        assert!(decision.denial_message().unwrap().contains("disabled"));
    }

    #[test]
    fn test_action_labels() {
        assert_eq!(
            AccessDecision::FreeView { used: 0 }.action_label().as_deref(),
            Some("View (Free 0/2)")
        );
        assert_eq!(AccessDecision::Admin.action_label().as_deref(), Some("View Note"));
        assert_eq!(
            AccessDecision::Denied { subscriptions_enabled: true }.action_label().as_deref(),
            Some("Subscribe")
        );
    }
}
