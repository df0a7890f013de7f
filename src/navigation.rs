//! Role-gated navigation.
//!
//! Builds the menu a signed-in user sees from their role. Hiding an entry is purely a
//! convenience: the client enforces nothing, and the backend remains the sole authority on
//! what any role may read or change. A hidden view can still be opened by key; the server
//! is expected to refuse it.

use crate::identity::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    Only(&'static [Role]),
}

impl Audience {
    pub fn admits(&self, role: Role) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Only(roles) => roles.contains(&role),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavEntry {
    pub key: &'static str,
    pub label: &'static str,
    pub audience: Audience,
}

const fn entry(key: &'static str, label: &'static str, audience: Audience) -> NavEntry {
    NavEntry { key, label, audience }
}

/// Full menu in display order.
pub const MENU: &[NavEntry] = &[
    entry("dashboard", "Dashboard", Audience::Everyone),
    entry("students", "Students", Audience::Only(&[Role::Admin, Role::Teacher, Role::Registrar])),
    entry("courses", "Courses", Audience::Everyone),
    entry("grades", "Grades", Audience::Everyone),
    entry("payments", "Payments", Audience::Everyone),
    entry("notifications", "Notifications", Audience::Everyone),
    entry("children", "Children", Audience::Only(&[Role::Parent])),
    entry("teaching", "Teaching", Audience::Only(&[Role::Teacher])),
    entry("enrollments", "Enrollments", Audience::Only(&[Role::Admin, Role::Registrar])),
    entry("attendance", "Attendance", Audience::Only(&[Role::Parent, Role::Admin])),
    entry("admin", "Admin", Audience::Only(&[Role::Admin])),
    entry("reports", "Reports", Audience::Only(&[Role::Admin, Role::Finance])),
    entry("users", "Users", Audience::Only(&[Role::Admin])),
    entry("ai-advisor", "AI Advisor", Audience::Everyone),
];

pub fn visible_menu_for(role: Role) -> Vec<NavEntry> {
    MENU.iter().copied().filter(|e| e.audience.admits(role)).collect()
}

pub fn is_visible(key: &str, role: Role) -> bool {
    MENU.iter().any(|e| e.key == key && e.audience.admits(role))
}
