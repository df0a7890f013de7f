use serde_json::Value;

use super::{date, field, field_or, page_footer, table_or_empty, with_query, Block, Card, Display, Table, ViewContext, ViewSpec};
use crate::api::Page;

fn first(pages: &[Page]) -> Page { pages.first().cloned().unwrap_or_default() }

fn listing(ctx: &ViewContext, path: &str) -> Vec<String> {
    vec![with_query(path, &[("student", ctx.param("student")), ("page", ctx.param("page"))])]
}

pub const STUDENTS: ViewSpec = ViewSpec {
    key: "students",
    title: "Students",
    sources: |ctx| vec![with_query("/students/", &[("page", ctx.param("page"))])],
    project: project_students,
};

fn project_students(_ctx: &ViewContext, pages: &[Page]) -> Display {
    let page = first(pages);
    let mut t = Table::new(&["Student ID", "Name", "Grade", "Email", "Status"]);
    for s in &page.results {
        let active = s.get("is_active").and_then(Value::as_bool).unwrap_or(false);
        t.push(vec![
            field(s, "student_id"),
            field(s, "user_name"),
            format!("Grade {}", field(s, "grade_level")),
            field(s, "user_email"),
            if active { "Active" } else { "Inactive" }.to_string(),
        ]);
    }
    let mut d = Display::new(STUDENTS.key, STUDENTS.title).push(table_or_empty(t, "No students found."));
    if let Some(f) = page_footer(&page) { d = d.push(f); }
    d
}

pub const COURSES: ViewSpec = ViewSpec {
    key: "courses",
    title: "Courses",
    sources: |ctx| vec![with_query("/courses/", &[("page", ctx.param("page"))])],
    project: project_courses,
};

fn project_courses(_ctx: &ViewContext, pages: &[Page]) -> Display {
    let page = first(pages);
    let cards: Vec<Card> = page
        .results
        .iter()
        .map(|c| Card {
            title: field(c, "code"),
            lines: vec![field(c, "name"), field_or(c, "description", "No description"), format!("Credits: {}", field(c, "credits"))],
        })
        .collect();
    let body = if cards.is_empty() {
        table_or_empty(Table::default(), "No courses available.")
    } else {
        Block::Cards(cards)
    };
    let mut d = Display::new(COURSES.key, COURSES.title).push(body);
    if let Some(f) = page_footer(&page) { d = d.push(f); }
    d
}

pub const GRADES: ViewSpec = ViewSpec {
    key: "grades",
    title: "Grades",
    sources: |ctx| listing(ctx, "/grades/"),
    project: project_grades,
};

pub(crate) fn grades_table(page: &Page) -> Table {
    let mut t = Table::new(&["Course", "Score", "Grade", "Feedback"]);
    for g in &page.results {
        t.push(vec![field(g, "enrollment"), field(g, "score"), field(g, "grade_letter"), field(g, "feedback")]);
    }
    t
}

fn project_grades(_ctx: &ViewContext, pages: &[Page]) -> Display {
    let page = first(pages);
    let mut d = Display::new(GRADES.key, GRADES.title).push(table_or_empty(grades_table(&page), "No grades recorded yet."));
    if let Some(f) = page_footer(&page) { d = d.push(f); }
    d
}

pub const PAYMENTS: ViewSpec = ViewSpec {
    key: "payments",
    title: "Payments",
    sources: |ctx| listing(ctx, "/payments/"),
    project: project_payments,
};

fn project_payments(_ctx: &ViewContext, pages: &[Page]) -> Display {
    let page = first(pages);
    let mut t = Table::new(&["Amount", "Status", "Due Date", "Payment Date"]);
    let mut outstanding = 0usize;
    for p in &page.results {
        let status = field(p, "status");
        if !status.eq_ignore_ascii_case("completed") { outstanding += 1; }
        t.push(vec![field(p, "amount"), status, date(p, "due_date"), date(p, "payment_date")]);
    }
    let mut d = Display::new(PAYMENTS.key, PAYMENTS.title);
    if outstanding > 0 {
        d = d.push(Block::Alert { level: super::AlertLevel::Warning, text: format!("{} payment(s) not completed", outstanding) });
    }
    d = d.push(table_or_empty(t, "No payments on record."));
    if let Some(f) = page_footer(&page) { d = d.push(f); }
    d
}

pub const NOTIFICATIONS: ViewSpec = ViewSpec {
    key: "notifications",
    title: "Notifications",
    sources: |_| vec!["/notifications/unread/".to_string()],
    project: project_notifications,
};

fn project_notifications(_ctx: &ViewContext, pages: &[Page]) -> Display {
    let page = first(pages);
    let cards: Vec<Card> = page
        .results
        .iter()
        .map(|n| Card { title: field(n, "title"), lines: vec![field(n, "message"), date(n, "created_at")] })
        .collect();
    let body = if cards.is_empty() {
        table_or_empty(Table::default(), "You have no unread notifications.")
    } else {
        Block::Cards(cards)
    };
    Display::new(NOTIFICATIONS.key, NOTIFICATIONS.title).push(body)
}

pub const ENROLLMENTS: ViewSpec = ViewSpec {
    key: "enrollments",
    title: "Enrollment Report",
    sources: |ctx| listing(ctx, "/courses/enrollments/"),
    project: project_enrollments,
};

fn project_enrollments(_ctx: &ViewContext, pages: &[Page]) -> Display {
    let page = first(pages);
    let mut t = Table::new(&["Student", "Course", "Enrolled Date", "Status"]);
    for e in &page.results {
        t.push(vec![field(e, "student"), field(e, "course"), date(e, "enrolled_at"), field(e, "status")]);
    }
    let mut d = Display::new(ENROLLMENTS.key, ENROLLMENTS.title).push(table_or_empty(t, "No enrollments found."));
    if let Some(f) = page_footer(&page) { d = d.push(f); }
    d
}

pub const ATTENDANCE: ViewSpec = ViewSpec {
    key: "attendance",
    title: "Attendance",
    sources: |ctx| listing(ctx, "/students/attendance/"),
    project: project_attendance,
};

const RECENT_ATTENDANCE: usize = 10;

fn presence(rec: &Value) -> &'static str {
    if rec.get("present").and_then(Value::as_bool).unwrap_or(false) { "Present" } else { "Absent" }
}

/// With `student=<ID>`: that student's rate and latest days. Without: the school-wide record.
fn project_attendance(ctx: &ViewContext, pages: &[Page]) -> Display {
    let page = first(pages);
    let mut d = Display::new(ATTENDANCE.key, ATTENDANCE.title);
    if ctx.param("student").is_none() {
        let mut t = Table::new(&["Student", "Date", "Status"]);
        for a in &page.results {
            t.push(vec![field(a, "student"), date(a, "date"), presence(a).to_string()]);
        }
        d = d.push(Block::Heading("Attendance Report".into())).push(table_or_empty(t, "No attendance recorded."));
        if let Some(f) = page_footer(&page) { d = d.push(f); }
        return d;
    }

    let total = page.results.len();
    let present = page.results.iter().filter(|a| presence(a) == "Present").count();
    let rate = if total > 0 { format!("{:.1}%", present as f64 / total as f64 * 100.0) } else { "0%".to_string() };
    let mut t = Table::new(&["Date", "Status"]);
    for a in page.results.iter().rev().take(RECENT_ATTENDANCE) {
        t.push(vec![date(a, "date"), presence(a).to_string()]);
    }
    d.push(Block::Cards(vec![
        Card { title: rate, lines: vec!["Attendance Rate".into()] },
        Card { title: present.to_string(), lines: vec!["Days Present".into()] },
        Card { title: (total - present).to_string(), lines: vec!["Days Absent".into()] },
    ]))
    .push(Block::Heading("Recent Attendance".into()))
    .push(table_or_empty(t, "No attendance recorded."))
}
