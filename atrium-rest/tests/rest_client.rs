use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use atrium_core::{
    ApiError, CancellationToken, EntityService, ErrorKind, Params, ParentRef, RequestContext,
};
use atrium_model::{Message, NewProject, NewTeamMember, Project, UploadFile, User};
use atrium_rest::{MemoryTokenStore, RestClient, RestClientOptions, RestService, Session};
use axum::extract::{Multipart, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base: &str, token: Option<&str>) -> RestClient {
    let store = match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::new(),
    };
    let session = Session::new(Arc::new(store)).with_login_route("/login");
    RestClient::new(RestClientOptions::new(base), Arc::new(session)).unwrap()
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn find_sends_bearer_token_and_request_id() {
    let router = Router::new().route(
        "/users",
        get(|headers: HeaderMap| async move {
            assert_eq!(bearer(&headers).as_deref(), Some("Bearer secret"));
            let request_id = headers
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Json(json!([
                {"_id": "u1", "username": "ada", "role": "Admin", "isPremium": true},
                {"_id": "u2", "username": request_id}
            ]))
        }),
    );
    let base = serve(router).await;
    let users: RestService<User> = RestService::new(client(&base, Some("secret")));

    let ctx = RequestContext::new();
    let list = users.find(&ctx, Params::new()).await.unwrap();

    assert_eq!(list.len(), 2);
    assert!(list[0].is_premium);
    assert_eq!(list[1].username, ctx.request_id);
}

#[tokio::test]
async fn unauthorized_clears_token_and_navigates_to_login() {
    let router = Router::new().route(
        "/projects",
        get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({"message": "jwt expired"}))) }),
    );
    let base = serve(router).await;

    let redirects = Arc::new(AtomicUsize::new(0));
    let seen = redirects.clone();
    let session = Session::new(Arc::new(MemoryTokenStore::with_token("stale")))
        .with_login_route("/login")
        .with_navigator(Arc::new(move |route| {
            assert_eq!(route, "/login");
            seen.fetch_add(1, Ordering::SeqCst);
        }));
    let session = Arc::new(session);
    let rest = RestClient::new(RestClientOptions::new(&base), session.clone()).unwrap();
    let projects: RestService<Project> = RestService::new(rest);

    let err = projects
        .find(&RequestContext::new(), Params::new())
        .await
        .unwrap_err();
    let api = ApiError::normalize(err);

    assert_eq!(api.kind, ErrorKind::NotAuthenticated);
    assert_eq!(api.message, "jwt expired");
    assert_eq!(session.token(), None);
    assert_eq!(redirects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn backend_error_message_is_surfaced() {
    let router = Router::new().route(
        "/projects/{id}",
        axum::routing::put(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"message": "Name already taken", "errors": {"name": ["taken"]}})),
            )
        }),
    );
    let base = serve(router).await;
    let projects: RestService<Project> = RestService::new(client(&base, Some("t")));

    let err = projects
        .update(&RequestContext::new(), "p1", json!({"name": "dup"}))
        .await
        .unwrap_err();
    let api = ApiError::normalize(err);

    assert_eq!(api.code(), Some(422));
    assert_eq!(api.message, "Name already taken");
    assert_eq!(api.errors, Some(json!({"name": ["taken"]})));
}

#[tokio::test]
async fn plain_text_errors_and_missing_entities() {
    let router = Router::new()
        .route("/tasks/{id}", get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }))
        .route("/users/{id}", get(|| async { Json(Value::Null) }));
    let base = serve(router).await;
    let rest = client(&base, Some("t"));

    let tasks: RestService<atrium_model::Task> = RestService::new(rest.clone());
    let api = ApiError::normalize(tasks.get(&RequestContext::new(), "t1").await.unwrap_err());
    assert_eq!(api.code(), Some(502));
    assert_eq!(api.message, "upstream down");

    let users: RestService<User> = RestService::new(rest);
    let api = ApiError::normalize(users.get(&RequestContext::new(), "ghost").await.unwrap_err());
    assert_eq!(api.kind, ErrorKind::NotFound);
}

#[tokio::test]
async fn malformed_entity_is_a_decode_error() {
    let router = Router::new().route(
        "/users",
        get(|| async { Json(json!([{"_id": "u1", "email": "not-an-email"}])) }),
    );
    let base = serve(router).await;
    let users: RestService<User> = RestService::new(client(&base, None));

    let api = ApiError::normalize(
        users
            .find(&RequestContext::new(), Params::new())
            .await
            .unwrap_err(),
    );
    assert_eq!(api.kind, ErrorKind::Decode);
    assert!(api.errors.unwrap().get("[0].email").is_some());
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let rest = RestClient::new(
        RestClientOptions::new("http://127.0.0.1:9").timeout(Duration::from_secs(2)),
        Arc::new(Session::in_memory()),
    )
    .unwrap();
    let users: RestService<User> = RestService::new(rest);

    let api = ApiError::normalize(
        users
            .find(&RequestContext::new(), Params::new())
            .await
            .unwrap_err(),
    );
    assert_eq!(api.kind, ErrorKind::Transport);
}

#[tokio::test]
async fn cancellation_abandons_a_slow_request() {
    let router = Router::new().route(
        "/users",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!([]))
        }),
    );
    let base = serve(router).await;
    let users: RestService<User> = RestService::new(client(&base, None));

    let token = CancellationToken::new();
    let ctx = RequestContext::with_token(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let api = ApiError::normalize(users.find(&ctx, Params::new()).await.unwrap_err());
    canceller.await.unwrap();
    assert_eq!(api.kind, ErrorKind::Cancelled);
}

#[tokio::test]
async fn nested_and_search_paths_reach_the_backend() {
    let router = Router::new()
        .route(
            "/messages/chat/{chat}",
            get(|Path(chat): Path<String>| async move {
                Json(json!([{"_id": "m1", "sender": "u1", "chat": chat, "content": "hi"}]))
            }),
        )
        .route(
            "/messages/chat/{chat}/search",
            get(
                |Path(chat): Path<String>, Query(q): Query<HashMap<String, String>>| async move {
                    let content = q.get("query").cloned().unwrap_or_default();
                    Json(json!([{"_id": "m9", "sender": "u1", "chat": chat, "content": content}]))
                },
            ),
        )
        .route(
            "/messages/{id}/read",
            post(|Path(id): Path<String>| async move {
                Json(json!({"_id": id, "sender": "u1", "chat": "c1", "isRead": true, "readBy": ["u2"]}))
            }),
        );
    let base = serve(router).await;
    let messages: RestService<Message> = RestService::new(client(&base, Some("t")));
    let ctx = RequestContext::new();

    let listed = messages
        .find(&ctx, Params::under(ParentRef::chat("c1")))
        .await
        .unwrap();
    assert_eq!(listed[0].chat_id(), "c1");

    let mut search = Params::under(ParentRef::chat("c1")).with_query("query", "deploy");
    search.variant = Some("search");
    let found = messages.find(&ctx, search).await.unwrap();
    assert_eq!(found[0].content, "deploy");

    let read = messages.custom(&ctx, "read", "m1", json!({})).await.unwrap();
    assert!(read.is_read);
    assert_eq!(read.read_by, vec!["u2".to_string()]);
}

#[tokio::test]
async fn project_with_files_goes_out_as_multipart() {
    let router = Router::new().route(
        "/projects",
        post(|mut form: Multipart| async move {
            let mut name = String::new();
            let mut members = String::new();
            let mut files = Vec::new();
            while let Some(field) = form.next_field().await.unwrap() {
                let field_name = field.name().unwrap_or_default().to_string();
                match field_name.as_str() {
                    "files" => {
                        let label = format!(
                            "{}|{}",
                            field.file_name().unwrap_or_default(),
                            field.content_type().unwrap_or_default()
                        );
                        let bytes = field.bytes().await.unwrap();
                        files.push(format!("{label}|{}", bytes.len()));
                    }
                    "name" => name = field.text().await.unwrap(),
                    "teamMembers" => members = field.text().await.unwrap(),
                    _ => {}
                }
            }
            let members: Value = serde_json::from_str(&members).unwrap();
            Json(json!({
                "_id": "p1",
                "name": name,
                "teamMembers": members,
                "tags": files,
            }))
        }),
    );
    let base = serve(router).await;
    let projects: RestService<Project> = RestService::new(client(&base, Some("t")));

    let draft = NewProject {
        name: "Apollo".into(),
        description: String::new(),
        organization: Some("o1".into()),
        team_members: vec![NewTeamMember {
            user: "u1".into(),
            role: Some("Developer".into()),
            added_at: None,
            added_by: None,
        }],
        files: vec![UploadFile::from_bytes("brief.pdf", "pdf", b"%PDF-1.4")],
    };

    let created = projects
        .create_with_attachments(
            &RequestContext::new(),
            draft.form_fields(),
            draft.attachments().unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(created.name, "Apollo");
    assert!(created.member("u1").is_some());
    assert_eq!(created.tags, vec!["brief.pdf|application/pdf|8".to_string()]);
}

#[tokio::test]
async fn relationship_endpoint_returns_updated_project() {
    let router = Router::new().route(
        "/projects/{id}/add_user",
        post(|Path(id): Path<String>, Json(body): Json<Value>| async move {
            Json(json!({
                "_id": id,
                "name": "Apollo",
                "teamMembers": [{"user": body["userId"], "role": body["role"]}],
            }))
        }),
    );
    let base = serve(router).await;
    let projects: RestService<Project> = RestService::new(client(&base, Some("t")));

    let payload = serde_json::to_value(atrium_model::AddUserToProject {
        user_id: "u7".into(),
        role: Some("Developer".into()),
        added_by: None,
    })
    .unwrap();
    let updated = projects
        .custom(&RequestContext::new(), "add_user", "p1", payload)
        .await
        .unwrap();

    assert_eq!(updated.id, "p1");
    assert_eq!(updated.member("u7").unwrap().role.as_deref(), Some("Developer"));
}
