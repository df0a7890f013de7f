//!
//! View router
//! -----------
//! Holds the active view and decides what the content region shows.
//!
//! Two phases: `Unauthenticated` (login or registration form only) and `Authenticated`
//! (shell + active view). Every navigation bumps a generation counter; a fetch that completes
//! after the user has moved on carries an older generation and its result is dropped instead
//! of overwriting the newer view. Requests are never aborted, only ignored.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::api::{Page, ResourceSource};
use crate::error::{ClientError, ClientResult};
use crate::identity::SessionStore;
use crate::navigation::{self, NavEntry};
use crate::views::{self, Block, Display, ViewContext, ViewParams, HOME_VIEW};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthForm {
    Login,
    Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unauthenticated(AuthForm),
    Authenticated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub active: String,
    pub params: ViewParams,
}

impl ViewState {
    pub fn home() -> Self { Self { active: HOME_VIEW.to_string(), params: ViewParams::new() } }
}

/// Issued per navigation; a render may only commit while its ticket is current.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    generation: u64,
    view: ViewState,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Applied(Display),
    /// The user navigated elsewhere (or signed out) before the data arrived.
    Discarded,
}

struct RouterState {
    phase: Phase,
    view: ViewState,
    generation: u64,
    content: Option<Display>,
}

pub struct ViewRouter {
    session: Arc<SessionStore>,
    state: Mutex<RouterState>,
}

impl ViewRouter {
    /// Starts authenticated when the session store already holds a token.
    pub fn new(session: Arc<SessionStore>) -> Self {
        let phase = if session.is_authenticated() { Phase::Authenticated } else { Phase::Unauthenticated(AuthForm::Login) };
        Self { session, state: Mutex::new(RouterState { phase, view: ViewState::home(), generation: 0, content: None }) }
    }

    pub fn phase(&self) -> Phase { self.state.lock().phase }
    pub fn current_view(&self) -> ViewState { self.state.lock().view.clone() }
    pub fn generation(&self) -> u64 { self.state.lock().generation }

    /// Last committed content, if any.
    pub fn content(&self) -> Option<Display> { self.state.lock().content.clone() }

    /// Menu for the signed-in role; empty while unauthenticated.
    pub fn menu(&self) -> Vec<NavEntry> {
        match (self.phase(), self.session.user()) {
            (Phase::Authenticated, Some(u)) => navigation::visible_menu_for(u.role),
            _ => Vec::new(),
        }
    }

    /// Move into the shell after a successful login. Refused unless the session holds a token.
    pub fn enter_authenticated(&self) -> bool {
        if !self.session.is_authenticated() { return false; }
        let mut st = self.state.lock();
        st.phase = Phase::Authenticated;
        st.view = ViewState::home();
        st.generation += 1;
        st.content = None;
        info!(target: "sims::router", "entered authenticated shell");
        true
    }

    /// Switch between the login and registration forms; ignored once signed in.
    pub fn show_form(&self, form: AuthForm) -> bool {
        let mut st = self.state.lock();
        if st.phase == Phase::Authenticated { return false; }
        st.phase = Phase::Unauthenticated(form);
        true
    }

    pub fn sign_out(&self) {
        self.session.logout();
        self.to_login("signed out");
    }

    fn to_login(&self, why: &str) {
        let mut st = self.state.lock();
        st.phase = Phase::Unauthenticated(AuthForm::Login);
        st.view = ViewState::home();
        st.generation += 1;
        st.content = None;
        info!(target: "sims::router", "returning to login: {}", why);
    }

    /// Record a new active view and hand out the ticket its render must present.
    /// `None` while unauthenticated: there is no shell to navigate in.
    pub fn begin_navigation(&self, key: &str, params: ViewParams) -> Option<Ticket> {
        let mut st = self.state.lock();
        if st.phase != Phase::Authenticated { return None; }
        st.generation += 1;
        st.view = ViewState { active: key.to_string(), params };
        debug!(target: "sims::router", "navigate view={} gen={}", key, st.generation);
        Some(Ticket { generation: st.generation, view: st.view.clone() })
    }

    /// Set the active view and re-render the content region.
    pub async fn navigate<S: ResourceSource>(&self, source: &S, key: &str, params: ViewParams) -> ClientResult<Rendered> {
        match self.begin_navigation(key, params) {
            Some(ticket) => self.render_ticket(source, ticket).await,
            None => self.render_current(source).await,
        }
    }

    /// Re-render whatever is active now. While unauthenticated this is the current form.
    pub async fn render_current<S: ResourceSource>(&self, source: &S) -> ClientResult<Rendered> {
        let ticket = {
            let st = self.state.lock();
            match st.phase {
                Phase::Unauthenticated(form) => return Ok(Rendered::Applied(auth_form_display(form))),
                Phase::Authenticated => Ticket { generation: st.generation, view: st.view.clone() },
            }
        };
        self.render_ticket(source, ticket).await
    }

    /// Fetch and project the ticket's view; commit only if the ticket is still current.
    /// `AuthExpired` from any fetch drops the router back to the login form.
    pub async fn render_ticket<S: ResourceSource>(&self, source: &S, ticket: Ticket) -> ClientResult<Rendered> {
        let Some(user) = self.session.user() else {
            self.to_login("session is empty");
            return Err(ClientError::AuthExpired);
        };
        let spec = views::resolve(&ticket.view.active);
        if spec.key != ticket.view.active {
            debug!(target: "sims::router", "unknown view '{}', showing {}", ticket.view.active, spec.key);
        }
        let ctx = ViewContext { user: &user, params: &ticket.view.params };

        let mut pages: Vec<Page> = Vec::new();
        let mut failure: Option<ClientError> = None;
        for path in (spec.sources)(&ctx) {
            match source.fetch(&path).await.and_then(Page::from_value) {
                Ok(p) => pages.push(p),
                Err(ClientError::AuthExpired) => {
                    self.session.logout();
                    self.to_login("credentials rejected");
                    return Err(ClientError::AuthExpired);
                }
                Err(e) => {
                    debug!(target: "sims::router", "view {} fetch {} failed: {}", spec.key, path, e);
                    failure = Some(e);
                    break;
                }
            }
        }
        let display = match &failure {
            Some(e) => views::error_display(spec, e),
            None => (spec.project)(&ctx, &pages),
        };

        let mut st = self.state.lock();
        if st.phase != Phase::Authenticated || st.generation != ticket.generation {
            debug!(
                target: "sims::router",
                "discarding stale render view={} gen={} current_gen={}", ticket.view.active, ticket.generation, st.generation
            );
            return Ok(Rendered::Discarded);
        }
        st.content = Some(display.clone());
        Ok(Rendered::Applied(display))
    }
}

pub fn auth_form_display(form: AuthForm) -> Display {
    match form {
        AuthForm::Login => Display::new("login", "SIMS - Student Information Management System")
            .push(Block::Text("login <username> <password>".into()))
            .push(Block::Text("Don't have an account? register <username> <email> <password> <student|parent>".into())),
        AuthForm::Register => Display::new("register", "Create Account")
            .push(Block::Text("register <username> <email> <password> <student|parent>".into()))
            .push(Block::Text("Already have an account? login <username> <password>".into())),
    }
}
