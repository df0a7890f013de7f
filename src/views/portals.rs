//! Role landing pages: the dashboard every role starts on, plus the parent, teacher and
//! admin portals.

use serde_json::Value;

use super::academic::grades_table;
use super::{date, field, mean, number, page_footer, table_or_empty, with_query, AlertLevel, Block, Card, Display, Table, ViewContext, ViewSpec};
use crate::api::Page;
use crate::identity::Role;
use crate::navigation;

pub const DASHBOARD: ViewSpec = ViewSpec {
    key: "dashboard",
    title: "Dashboard",
    sources: |_| Vec::new(),
    project: project_dashboard,
};

pub fn portal_title(role: Role) -> &'static str {
    match role {
        Role::Admin => "Admin Dashboard",
        Role::Teacher => "Teacher Dashboard",
        Role::Student => "Student Portal",
        Role::Parent => "Parent Portal",
        Role::Registrar => "Registrar Dashboard",
        Role::Finance => "Finance Dashboard",
    }
}

fn project_dashboard(ctx: &ViewContext, _pages: &[Page]) -> Display {
    let shortcuts: Vec<String> = navigation::visible_menu_for(ctx.user.role)
        .into_iter()
        .filter(|e| e.key != DASHBOARD.key)
        .map(|e| format!("{} ({})", e.label, e.key))
        .collect();
    Display::new(DASHBOARD.key, portal_title(ctx.user.role))
        .push(Block::Text(format!("Welcome, {}. Select an option from the menu to get started.", ctx.user.display_name)))
        .push(Block::Cards(vec![Card { title: "Available views".into(), lines: shortcuts }]))
}

pub const CHILDREN: ViewSpec = ViewSpec {
    key: "children",
    title: "Parent Portal",
    sources: |ctx| {
        let mut v = vec!["/students/".to_string()];
        if let Some(child) = ctx.param("child") {
            v.push(with_query("/grades/", &[("student", Some(child))]));
        }
        v
    },
    project: project_children,
};

fn project_children(ctx: &ViewContext, pages: &[Page]) -> Display {
    let children = pages.first().cloned().unwrap_or_default();
    let mut t = Table::new(&["ID", "Name", "Grade"]);
    for c in &children.results {
        t.push(vec![field(c, "id"), field(c, "user_name"), format!("Grade {}", field(c, "grade_level"))]);
    }
    let mut d = Display::new(CHILDREN.key, CHILDREN.title)
        .push(Block::Text("Monitor your child's academic progress and manage payments.".into()))
        .push(table_or_empty(t, "No children are linked to this account."));

    let Some(child_id) = ctx.param("child") else {
        if !children.is_empty() {
            d = d.push(Block::Text("Open a child's record with: children child=<ID>".into()));
        }
        return d;
    };
    let name = children
        .results
        .iter()
        .find(|c| field(c, "id") == child_id)
        .map(|c| field(c, "user_name"))
        .unwrap_or_else(|| format!("Student {}", child_id));
    let grades = pages.get(1).cloned().unwrap_or_default();
    let average = mean(&grades.results, "score").unwrap_or(0.0);
    d.push(Block::Heading(format!("{}'s Grades", name)))
        .push(Block::Cards(vec![
            Card { title: format!("{:.1}", average), lines: vec!["Average Score".into()] },
            Card { title: grades.results.len().to_string(), lines: vec!["Completed Courses".into()] },
        ]))
        .push(table_or_empty(grades_table(&grades), "No grades recorded yet."))
        .push(Block::Text(format!(
            "See also: attendance student={}  payments student={}  enrollments student={}",
            child_id, child_id, child_id
        )))
}

pub const TEACHING: ViewSpec = ViewSpec {
    key: "teaching",
    title: "Teacher Dashboard",
    sources: |ctx| {
        let mut v = vec!["/courses/".to_string()];
        if let Some(course) = ctx.param("course") {
            v.push(format!("/courses/{}/students/", urlencoding::encode(&course)));
        }
        v
    },
    project: project_teaching,
};

fn project_teaching(ctx: &ViewContext, pages: &[Page]) -> Display {
    let courses = pages.first().cloned().unwrap_or_default();
    let mut t = Table::new(&["ID", "Course Code", "Course Name", "Credits", "Students"]);
    for c in &courses.results {
        t.push(vec![field(c, "id"), field(c, "code"), field(c, "name"), field(c, "credits"), field(c, "enrollments")]);
    }
    let mut d = Display::new(TEACHING.key, TEACHING.title)
        .push(Block::Heading("My Courses".into()))
        .push(table_or_empty(t, "You have no assigned courses."));
    if let Some(course) = ctx.param("course") {
        let roster = pages.get(1).cloned().unwrap_or_default();
        let mut r = Table::new(&["ID", "Name", "Email", "Status"]);
        for s in &roster.results {
            r.push(vec![field(s, "id"), field(s, "name"), field(s, "email"), field(s, "enrollmentStatus")]);
        }
        d = d.push(Block::Heading(format!("Class Roster (course {})", course)))
            .push(table_or_empty(r, "No students enrolled in this course."));
    } else if !courses.is_empty() {
        d = d.push(Block::Text("Show a roster with: teaching course=<ID>".into()));
    }
    d
}

pub const ADMIN: ViewSpec = ViewSpec {
    key: "admin",
    title: "Administration Panel",
    sources: |_| vec!["/students/".to_string(), "/courses/".to_string()],
    project: project_admin,
};

fn project_admin(_ctx: &ViewContext, pages: &[Page]) -> Display {
    let total = |i: usize| pages.get(i).map(|p| p.count.to_string()).unwrap_or_else(|| "N/A".into());
    Display::new(ADMIN.key, ADMIN.title)
        .push(Block::Heading("System Statistics".into()))
        .push(Block::Cards(vec![
            Card { title: total(0), lines: vec!["Total Students".into()] },
            Card { title: total(1), lines: vec!["Active Courses".into()] },
        ]))
        .push(Block::Text("Related views: users, enrollments, attendance, reports".into()))
}

pub const REPORTS: ViewSpec = ViewSpec {
    key: "reports",
    title: "Reports",
    sources: |_| vec!["/payments/".to_string(), "/grades/".to_string()],
    project: project_reports,
};

fn dollars(amount: f64) -> String { format!("${:.2}", amount) }

/// Financial totals over completed and pending payments, then recorded grades.
fn project_reports(_ctx: &ViewContext, pages: &[Page]) -> Display {
    let payments = pages.first().cloned().unwrap_or_default();
    let grades = pages.get(1).cloned().unwrap_or_default();

    let total_for = |status: &str| -> f64 {
        payments
            .results
            .iter()
            .filter(|p| field(p, "status").eq_ignore_ascii_case(status))
            .filter_map(|p| number(p, "amount"))
            .sum()
    };
    let mut pt = Table::new(&["Student", "Amount ($)", "Status", "Date"]);
    for p in &payments.results {
        pt.push(vec![field(p, "student"), field(p, "amount"), field(p, "status"), date(p, "payment_date")]);
    }
    let mut gt = Table::new(&["Course", "Score", "Grade", "Date"]);
    for g in &grades.results {
        gt.push(vec![field(g, "enrollment"), field(g, "score"), field(g, "grade_letter"), date(g, "created_at")]);
    }
    let average = mean(&grades.results, "score").map(|a| format!("{:.1}", a)).unwrap_or_else(|| "N/A".into());

    let mut d = Display::new(REPORTS.key, REPORTS.title)
        .push(Block::Heading("Financial Report".into()))
        .push(Block::Cards(vec![
            Card { title: dollars(total_for("completed")), lines: vec!["Total Collected".into()] },
            Card { title: dollars(total_for("pending")), lines: vec!["Pending Payments".into()] },
            Card { title: payments.count.to_string(), lines: vec!["Total Transactions".into()] },
        ]))
        .push(table_or_empty(pt, "No payments on record."));
    if let Some(f) = page_footer(&payments) { d = d.push(f); }
    d = d
        .push(Block::Heading("Performance Report".into()))
        .push(Block::Cards(vec![Card { title: average, lines: vec!["Average Score".into()] }]))
        .push(table_or_empty(gt, "No grades recorded yet."));
    if let Some(f) = page_footer(&grades) { d = d.push(f); }
    d
}

pub const USERS: ViewSpec = ViewSpec {
    key: "users",
    title: "User Management",
    sources: |ctx| vec![with_query("/users/", &[("page", ctx.param("page"))])],
    project: project_users,
};

fn project_users(_ctx: &ViewContext, pages: &[Page]) -> Display {
    let page = pages.first().cloned().unwrap_or_default();
    let mut t = Table::new(&["Username", "Email", "Role", "Approved"]);
    for u in &page.results {
        let approved = match u.get("is_approved") {
            Some(Value::Bool(true)) => "yes",
            Some(Value::Bool(false)) => "no",
            _ => "N/A",
        };
        t.push(vec![field(u, "username"), field(u, "email"), field(u, "role"), approved.to_string()]);
    }
    let pending = page.results.iter().filter(|u| u.get("is_approved") == Some(&Value::Bool(false))).count();
    let mut d = Display::new(USERS.key, USERS.title);
    if pending > 0 {
        d = d.push(Block::Alert { level: AlertLevel::Info, text: format!("{} account(s) awaiting approval", pending) });
    }
    d = d.push(table_or_empty(t, "No users found."));
    if let Some(f) = page_footer(&page) { d = d.push(f); }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::UserProfile;
    use crate::views::ViewParams;
    use serde_json::json;

    fn profile(role: Role) -> UserProfile { UserProfile { id: 2, username: "u".into(), display_name: "Hana".into(), role } }

    #[test]
    fn dashboard_title_follows_role() {
        let params = ViewParams::new();
        for (role, title) in [(Role::Admin, "Admin Dashboard"), (Role::Parent, "Parent Portal"), (Role::Student, "Student Portal")] {
            let u = profile(role);
            let d = (DASHBOARD.project)(&ViewContext { user: &u, params: &params }, &[]);
            assert_eq!(d.title, title);
        }
    }

    #[test]
    fn dashboard_lists_only_visible_views() {
        let params = ViewParams::new();
        let u = profile(Role::Student);
        let d = (DASHBOARD.project)(&ViewContext { user: &u, params: &params }, &[]);
        let Block::Cards(cards) = &d.blocks[1] else { panic!("expected cards") };
        assert!(cards[0].lines.iter().any(|l| l == "Grades (grades)"));
        assert!(!cards[0].lines.iter().any(|l| l.starts_with("Admin")));
    }

    #[test]
    fn children_with_selection_fetches_child_grades() {
        let u = profile(Role::Parent);
        let mut params = ViewParams::new();
        params.insert("child".into(), json!(4));
        let ctx = ViewContext { user: &u, params: &params };
        assert_eq!((CHILDREN.sources)(&ctx), vec!["/students/", "/grades/?student=4"]);

        let kids = Page::from_value(json!({"count": 1, "results": [{"id": 4, "user_name": "Liya", "grade_level": 5}]})).unwrap();
        let grades = Page::from_value(json!({"count": 1, "results": [{"enrollment": "Mathematics", "score": 91, "grade_letter": "A", "feedback": null}]})).unwrap();
        let d = (CHILDREN.project)(&ctx, &[kids, grades]);
        assert!(d.blocks.contains(&Block::Heading("Liya's Grades".into())));
    }

    #[test]
    fn child_grades_show_average_and_count() {
        let u = profile(Role::Parent);
        let mut params = ViewParams::new();
        params.insert("child".into(), json!(4));
        let ctx = ViewContext { user: &u, params: &params };
        let kids = Page::from_value(json!([{"id": 4, "user_name": "Liya", "grade_level": 5}])).unwrap();
        let grades = Page::from_value(json!([
            {"enrollment": "Mathematics", "score": "91.00", "grade_letter": "A"},
            {"enrollment": "Physics", "score": 78, "grade_letter": "C"}
        ]))
        .unwrap();
        let d = (CHILDREN.project)(&ctx, &[kids, grades]);
        assert!(d.blocks.contains(&Block::Cards(vec![
            Card { title: "84.5".into(), lines: vec!["Average Score".into()] },
            Card { title: "2".into(), lines: vec!["Completed Courses".into()] },
        ])));
    }

    #[test]
    fn reports_total_payments_by_status() {
        let u = profile(Role::Admin);
        let params = ViewParams::new();
        let ctx = ViewContext { user: &u, params: &params };
        assert_eq!((REPORTS.sources)(&ctx), vec!["/payments/", "/grades/"]);
        let payments = Page::from_value(json!([
            {"student": "Abel", "amount": "5000.00", "status": "completed", "payment_date": "2024-11-10"},
            {"student": "Liya", "amount": "1250.50", "status": "completed", "payment_date": "2024-11-12"},
            {"student": "Hana", "amount": 300, "status": "pending", "payment_date": null},
            {"student": "Sami", "amount": "99.00", "status": "failed", "payment_date": null}
        ]))
        .unwrap();
        let grades = Page::from_value(json!({"count": 1, "results": [
            {"enrollment": "Chemistry", "score": 88, "grade_letter": "B", "created_at": "2024-12-01T09:00:00Z"}
        ]}))
        .unwrap();
        let d = (REPORTS.project)(&ctx, &[payments, grades]);
        let Block::Cards(money) = &d.blocks[1] else { panic!("expected cards") };
        assert_eq!(money[0].title, "$6250.50");
        assert_eq!(money[1].title, "$300.00");
        assert_eq!(money[2].title, "4");
        let Block::Cards(perf) = &d.blocks[4] else { panic!("expected cards") };
        assert_eq!(perf[0].title, "88.0");
        match &d.blocks[5] {
            Block::Table(t) => assert_eq!(t.rows[0], vec!["Chemistry", "88", "B", "Dec 01, 2024"]),
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn teaching_roster_path() {
        let u = profile(Role::Teacher);
        let mut params = ViewParams::new();
        params.insert("course".into(), json!("7"));
        let ctx = ViewContext { user: &u, params: &params };
        assert_eq!((TEACHING.sources)(&ctx), vec!["/courses/", "/courses/7/students/"]);
    }

    #[test]
    fn admin_stats_use_server_totals() {
        let u = profile(Role::Admin);
        let params = ViewParams::new();
        let ctx = ViewContext { user: &u, params: &params };
        let students = Page::from_value(json!({"count": 412, "results": []})).unwrap();
        let courses = Page::from_value(json!({"count": 18, "results": []})).unwrap();
        let d = (ADMIN.project)(&ctx, &[students, courses]);
        let Block::Cards(cards) = &d.blocks[1] else { panic!("expected cards") };
        assert_eq!(cards[0].title, "412");
        assert_eq!(cards[1].title, "18");
    }

    #[test]
    fn users_flags_pending_approvals() {
        let u = profile(Role::Admin);
        let params = ViewParams::new();
        let ctx = ViewContext { user: &u, params: &params };
        let page = Page::from_value(json!([
            {"username": "a", "email": "a@x", "role": "student", "is_approved": false},
            {"username": "b", "email": "b@x", "role": "teacher", "is_approved": true}
        ]))
        .unwrap();
        let d = (USERS.project)(&ctx, &[page]);
        assert_eq!(d.alerts().next(), Some("1 account(s) awaiting approval"));
    }
}
