use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::task::JoinHandle;

use sims_portal::api::ApiClient;
use sims_portal::cli::{Reply, Shell};
use sims_portal::config::PortalConfig;
use sims_portal::error::ClientError;
use sims_portal::identity::{FileStorage, RegistrationRequest, Role, SessionStore};
use sims_portal::navigation::visible_menu_for;

// ---- mock backend ----

#[derive(Clone, Default)]
struct Backend {
    revoked: Arc<AtomicBool>,
    conversations: Arc<Mutex<Vec<Value>>>,
    usernames: Arc<Mutex<Vec<String>>>,
}

type Answer = (StatusCode, Json<Value>);

fn answer(status: StatusCode, body: Value) -> Answer { (status, Json(body)) }

/// Role behind the bearer token, or the 401 a DRF-style backend would send.
fn caller(b: &Backend, headers: &HeaderMap) -> Result<&'static str, Answer> {
    let token = headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or("");
    let role = match token {
        "tok-alice" => "student",
        "tok-root" => "admin",
        _ => "",
    };
    if role.is_empty() || b.revoked.load(Ordering::SeqCst) {
        return Err(answer(StatusCode::UNAUTHORIZED, json!({"detail": "Given token not valid for any token type"})));
    }
    Ok(role)
}

async fn token(Json(body): Json<Value>) -> Answer {
    match (body["username"].as_str(), body["password"].as_str()) {
        (Some("alice"), Some("pw")) => answer(StatusCode::OK, json!({"access": "tok-alice", "refresh": "r"})),
        (Some("root"), Some("pw")) => answer(
            StatusCode::OK,
            json!({"access": "tok-root", "user": {"id": 7, "username": "root", "first_name": "", "last_name": "", "role": "admin"}}),
        ),
        _ => answer(StatusCode::UNAUTHORIZED, json!({"detail": "No active account found with the given credentials"})),
    }
}

async fn profile(State(b): State<Backend>, headers: HeaderMap) -> Answer {
    match caller(&b, &headers) {
        Ok(_) => answer(
            StatusCode::OK,
            json!({"id": 1, "username": "alice", "email": "alice@school.test", "first_name": "Alice", "last_name": "Bekele", "role": "student"}),
        ),
        Err(e) => e,
    }
}

async fn register(State(b): State<Backend>, Json(body): Json<Value>) -> Answer {
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let mut taken = b.usernames.lock();
    if taken.contains(&username) {
        return answer(StatusCode::BAD_REQUEST, json!({"username": ["A user with that username already exists."]}));
    }
    taken.push(username.clone());
    answer(StatusCode::CREATED, json!({"id": 40 + taken.len(), "username": username, "email": body["email"]}))
}

async fn students(State(b): State<Backend>, headers: HeaderMap) -> Answer {
    match caller(&b, &headers) {
        Ok("admin") => answer(StatusCode::OK, json!({"count": 412, "next": null, "previous": null, "results": []})),
        Ok(_) => answer(StatusCode::FORBIDDEN, json!({"detail": "You do not have permission to perform this action."})),
        Err(e) => e,
    }
}

async fn courses(State(b): State<Backend>, headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Answer {
    if let Err(e) = caller(&b, &headers) { return e; }
    if q.get("page").map(String::as_str) == Some("99") {
        return answer(StatusCode::NOT_FOUND, json!({"detail": "Invalid page."}));
    }
    answer(
        StatusCode::OK,
        json!({"count": 1, "next": null, "previous": null, "results": [
            {"id": 3, "code": "CS101", "name": "Introduction to Programming", "description": "Basics", "credits": 3}
        ]}),
    )
}

async fn grades(State(b): State<Backend>, headers: HeaderMap) -> Answer {
    if let Err(e) = caller(&b, &headers) { return e; }
    answer(
        StatusCode::OK,
        json!({"count": 1, "results": [{"enrollment": "Physics", "score": 95, "grade_letter": "A", "feedback": "Excellent"}]}),
    )
}

async fn payments(State(b): State<Backend>, headers: HeaderMap) -> Answer {
    if let Err(e) = caller(&b, &headers) { return e; }
    answer(
        StatusCode::OK,
        json!([
            {"amount": "5000.00", "status": "completed", "due_date": "2024-11-15", "payment_date": "2024-11-10"},
            {"amount": "5000.00", "status": "pending", "due_date": "2024-12-25", "payment_date": null}
        ]),
    )
}

async fn list_conversations(State(b): State<Backend>, headers: HeaderMap) -> Answer {
    if let Err(e) = caller(&b, &headers) { return e; }
    let convs = b.conversations.lock().clone();
    answer(StatusCode::OK, Value::Array(convs))
}

async fn create_conversation(State(b): State<Backend>, headers: HeaderMap) -> Answer {
    if let Err(e) = caller(&b, &headers) { return e; }
    let mut convs = b.conversations.lock();
    let conv = json!({"id": convs.len() + 1, "title": null, "created_at": "2024-12-15T10:00:00Z", "messages": []});
    convs.insert(0, conv.clone());
    answer(StatusCode::CREATED, conv)
}

async fn send_message(State(b): State<Backend>, headers: HeaderMap, Path(id): Path<i64>, Json(body): Json<Value>) -> Answer {
    if let Err(e) = caller(&b, &headers) { return e; }
    let question = body["message"].as_str().unwrap_or_default().to_string();
    let reply = "Consider Advanced Mathematics next term.";
    let mut convs = b.conversations.lock();
    let Some(conv) = convs.iter_mut().find(|c| c["id"] == json!(id)) else {
        return answer(StatusCode::NOT_FOUND, json!({"detail": "Not found."}));
    };
    if let Some(msgs) = conv["messages"].as_array_mut() {
        msgs.push(json!({"content": question, "is_user": true}));
        msgs.push(json!({"content": reply, "is_user": false}));
    }
    answer(StatusCode::OK, json!({"user_message": question, "ai_response": reply, "timestamp": "2024-12-15T10:01:00Z"}))
}

async fn start_backend(b: Backend) -> (JoinHandle<()>, String) {
    let app = Router::new()
        .route("/api/auth/token/", post(token))
        .route("/api/users/profile/", get(profile))
        .route("/api/users/register/", post(register))
        .route("/api/students/", get(students))
        .route("/api/courses/", get(courses))
        .route("/api/grades/", get(grades))
        .route("/api/payments/", get(payments))
        .route("/api/ai/conversations/", get(list_conversations).post(create_conversation))
        .route("/api/ai/conversations/{id}/send_message/", post(send_message))
        .with_state(b);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("mock backend error: {e:?}");
        }
    });
    (handle, format!("http://{}/api", addr))
}

struct Guard(JoinHandle<()>);
impl Drop for Guard { fn drop(&mut self) { self.0.abort(); } }

fn client_for(base: &str, tmp: &TempDir) -> ApiClient {
    let cfg = PortalConfig::new(base, tmp.path().join("session.json"), 5_000).unwrap();
    let storage = Arc::new(FileStorage::new(cfg.session_file.clone()));
    ApiClient::new(&cfg, Arc::new(SessionStore::restore(storage))).unwrap()
}

fn text(r: Reply) -> String {
    match r {
        Reply::Print(s) => s,
        Reply::Quit => panic!("unexpected quit"),
    }
}

// ---- tests ----

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn student_login_persists_session_and_hides_admin() {
    let tmp = tempfile::tempdir().unwrap();
    let (srv, base) = start_backend(Backend::default()).await;
    let _g = Guard(srv);
    let client = client_for(&base, &tmp);

    let user = client.session().login(&client, "alice", "pw").await.expect("login");
    assert_eq!(user.role, Role::Student);
    assert_eq!(user.display_name, "Alice Bekele");
    assert!(!visible_menu_for(user.role).iter().any(|e| e.label == "Admin"));

    // a fresh process reading the same file sees the same session
    let reopened = SessionStore::restore(Arc::new(FileStorage::new(tmp.path().join("session.json"))));
    assert_eq!(reopened.snapshot(), client.session().snapshot());
    assert_eq!(reopened.token().as_deref(), Some("tok-alice"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn wrong_password_is_an_auth_error() {
    let tmp = tempfile::tempdir().unwrap();
    let (srv, base) = start_backend(Backend::default()).await;
    let _g = Guard(srv);
    let client = client_for(&base, &tmp);

    let err = client.session().login(&client, "alice", "nope").await.unwrap_err();
    assert_eq!(err, ClientError::auth("No active account found with the given credentials"));
    assert!(!client.session().is_authenticated());
    assert!(!tmp.path().join("session.json").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn revoked_token_expires_session() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Backend::default();
    let (srv, base) = start_backend(backend.clone()).await;
    let _g = Guard(srv);
    let client = client_for(&base, &tmp);

    client.session().login(&client, "root", "pw").await.expect("login");
    assert_eq!(client.get_page("/students/").await.unwrap().count, 412);

    backend.revoked.store(true, Ordering::SeqCst);
    let err = client.get("/students/").await.unwrap_err();
    assert_eq!(err, ClientError::AuthExpired);
    assert!(!client.session().is_authenticated());
    assert!(!tmp.path().join("session.json").exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_error_detail_is_surfaced() {
    let tmp = tempfile::tempdir().unwrap();
    let (srv, base) = start_backend(Backend::default()).await;
    let _g = Guard(srv);
    let client = client_for(&base, &tmp);
    client.session().login(&client, "alice", "pw").await.unwrap();

    let err = client.get("/courses/?page=99").await.unwrap_err();
    assert_eq!(err, ClientError::api(404, "Invalid page."));
    assert!(client.session().is_authenticated());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bare_array_listing_is_normalized() {
    let tmp = tempfile::tempdir().unwrap();
    let (srv, base) = start_backend(Backend::default()).await;
    let _g = Guard(srv);
    let client = client_for(&base, &tmp);
    client.session().login(&client, "alice", "pw").await.unwrap();

    let page = client.get_page("/payments/").await.unwrap();
    assert_eq!(page.count, 2);
    assert_eq!(page.results.len(), 2);
    assert!(!page.is_partial());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_backend_is_a_network_error() {
    let tmp = tempfile::tempdir().unwrap();
    // reserve then free a port so nothing is listening on it
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let client = client_for(&format!("http://127.0.0.1:{}/api", port), &tmp);

    assert!(matches!(client.get("/courses/").await, Err(ClientError::Network { .. })));
    assert!(matches!(client.session().login(&client, "alice", "pw").await, Err(ClientError::Network { .. })));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registration_needs_a_separate_login() {
    let tmp = tempfile::tempdir().unwrap();
    let (srv, base) = start_backend(Backend::default()).await;
    let _g = Guard(srv);
    let client = client_for(&base, &tmp);
    let req = RegistrationRequest {
        username: "liya".into(),
        email: "liya@school.test".into(),
        password: "pw12345".into(),
        role: Role::Parent,
        first_name: Some("Liya".into()),
        last_name: None,
    };

    let account = client.session().register(&client, &req).await.expect("register");
    assert_eq!(account.username.as_deref(), Some("liya"));
    assert!(!client.session().is_authenticated());

    let err = client.session().register(&client, &req).await.unwrap_err();
    assert_eq!(err, ClientError::auth("username: A user with that username already exists."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shell_renders_views_for_the_signed_in_role() {
    let tmp = tempfile::tempdir().unwrap();
    let (srv, base) = start_backend(Backend::default()).await;
    let _g = Guard(srv);
    let shell = Shell::new(client_for(&base, &tmp));

    assert!(shell.start().await.contains("login <username> <password>"));
    assert_eq!(text(shell.execute("open grades").await), "Please log in first.");

    let out = text(shell.execute("login alice pw").await);
    assert!(out.contains("Student Portal"));
    assert!(!out.contains("Admin"));

    let out = text(shell.execute("grades").await);
    assert!(out.contains("[Grades]"));
    assert!(out.contains("Physics"));

    let out = text(shell.execute("payments").await);
    assert!(out.contains("[warning] 1 payment(s) not completed"));
    assert!(out.contains("Dec 25, 2024"));

    let out = text(shell.execute("open courses page=99").await);
    assert!(out.contains("The server refused this request (404): Invalid page."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn forbidden_view_drops_back_to_login() {
    let tmp = tempfile::tempdir().unwrap();
    let (srv, base) = start_backend(Backend::default()).await;
    let _g = Guard(srv);
    let shell = Shell::new(client_for(&base, &tmp));
    text(shell.execute("login alice pw").await);

    // hidden from students, but reachable by key; the server has the final say
    let out = text(shell.execute("open admin").await);
    assert!(out.contains("Your session has expired"));
    assert!(!shell.session().is_authenticated());
    assert_eq!(text(shell.execute("whoami").await), "not signed in");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn advisor_question_round_trip() {
    let tmp = tempfile::tempdir().unwrap();
    let backend = Backend::default();
    let (srv, base) = start_backend(backend.clone()).await;
    let _g = Guard(srv);
    let shell = Shell::new(client_for(&base, &tmp));
    text(shell.execute("login alice pw").await);

    let out = text(shell.execute("ask What should I take next?").await);
    assert!(out.contains("you> What should I take next?"));
    assert!(out.contains("advisor> Consider Advanced Mathematics next term."));

    // the second question reuses the conversation
    text(shell.execute("ask And after that?").await);
    let convs = backend.conversations.lock();
    assert_eq!(convs.len(), 1);
    assert_eq!(convs[0]["messages"].as_array().map(Vec::len), Some(4));
}
