use super::{Block, ChatTurn, Display, Table, ViewContext, ViewSpec};
use crate::api::advisor::{conversations_in, CONVERSATIONS_PATH};
use crate::api::Page;

pub const AI_ADVISOR: ViewSpec = ViewSpec {
    key: "ai-advisor",
    title: "AI Academic Advisor",
    sources: |_| vec![CONVERSATIONS_PATH.to_string()],
    project: project_advisor,
};

const GREETING: &str = "Ask me anything about your courses, grades, or academic path!";

fn project_advisor(ctx: &ViewContext, pages: &[Page]) -> Display {
    let convs = pages.first().map(conversations_in).unwrap_or_default();
    let wanted = ctx.param("conversation").and_then(|c| c.parse::<i64>().ok());
    let active = match wanted {
        Some(id) => convs.iter().find(|c| c.id == id),
        None => convs.first(),
    };

    let mut d = Display::new(AI_ADVISOR.key, AI_ADVISOR.title);
    let turns: Vec<ChatTurn> = active
        .map(|c| c.messages.iter().map(|m| ChatTurn { from_user: m.is_user, text: m.content.clone() }).collect())
        .unwrap_or_default();
    if turns.is_empty() {
        d = d.push(Block::Text(GREETING.into()));
    } else {
        d = d.push(Block::Chat(turns));
    }
    d = d.push(Block::Text("Send a question with: ask <message>".into()));

    if convs.len() > 1 {
        let mut t = Table::new(&["ID", "Title", "Started", "Messages"]);
        for c in &convs {
            t.push(vec![
                c.id.to_string(),
                c.title.clone().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| "Untitled".into()),
                c.created_at.clone().unwrap_or_else(|| "N/A".into()),
                c.messages.len().to_string(),
            ]);
        }
        d = d.push(Block::Heading("Conversations".into())).push(Block::Table(t));
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Role, UserProfile};
    use crate::views::ViewParams;
    use serde_json::json;

    fn convs() -> Page {
        Page::from_value(json!({"count": 2, "results": [
            {"id": 9, "title": "Study plan", "messages": [
                {"content": "What should I take next?", "is_user": true},
                {"content": "Advanced Mathematics.", "is_user": false}
            ]},
            {"id": 3, "title": "", "messages": [{"content": "Hi", "is_user": true}]}
        ]}))
        .unwrap()
    }

    #[test]
    fn shows_most_recent_conversation_by_default() {
        let u = UserProfile { id: 1, username: "a".into(), display_name: "A".into(), role: Role::Student };
        let params = ViewParams::new();
        let d = (AI_ADVISOR.project)(&ViewContext { user: &u, params: &params }, &[convs()]);
        let Block::Chat(turns) = &d.blocks[0] else { panic!("expected chat") };
        assert_eq!(turns.len(), 2);
        assert!(!turns[1].from_user);
        assert!(d.blocks.iter().any(|b| matches!(b, Block::Table(t) if t.rows[1][1] == "Untitled")));
    }

    #[test]
    fn conversation_param_selects_thread() {
        let u = UserProfile { id: 1, username: "a".into(), display_name: "A".into(), role: Role::Student };
        let mut params = ViewParams::new();
        params.insert("conversation".into(), json!(3));
        let d = (AI_ADVISOR.project)(&ViewContext { user: &u, params: &params }, &[convs()]);
        assert_eq!(d.blocks[0], Block::Chat(vec![ChatTurn { from_user: true, text: "Hi".into() }]));
    }

    #[test]
    fn empty_history_shows_greeting() {
        let u = UserProfile { id: 1, username: "a".into(), display_name: "A".into(), role: Role::Student };
        let params = ViewParams::new();
        let d = (AI_ADVISOR.project)(&ViewContext { user: &u, params: &params }, &[Page::default()]);
        assert_eq!(d.blocks[0], Block::Text(GREETING.into()));
    }
}
