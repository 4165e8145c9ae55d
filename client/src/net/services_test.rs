use std::rc::Rc;

use super::*;
use crate::auth::manager::SessionManager;
use crate::net::provider::MockProvider;
use crate::net::transport::{HttpResponse, Method, MockTransport};
use crate::state::token_store::{MemoryStorage, TokenStore};
use crate::util::clock::ManualClock;
use futures::executor::block_on;
use serde_json::json;

fn endpoints() -> ServiceEndpoints {
    ServiceEndpoints {
        courses: "http://courses.test".to_owned(),
        videos: "http://videos.test".to_owned(),
        users: "http://users.test".to_owned(),
        ai: "http://ai.test".to_owned(),
    }
}

fn backend() -> (Backend, MockTransport, SessionManager) {
    let clock = ManualClock::new(1_700_000_000);
    let manager = SessionManager::new(
        Rc::new(MockProvider::new(Rc::new(clock.clone()))),
        TokenStore::new(Rc::new(MemoryStorage::new())),
        Rc::new(clock),
    );
    let transport = MockTransport::new();
    let api = ApiClient::new(Rc::new(transport.clone()), manager.clone());
    (Backend::new(api, endpoints()), transport, manager)
}

#[test]
fn endpoint_paths() {
    assert_eq!(courses_endpoint("http://c"), "http://c/api/courses");
    assert_eq!(course_endpoint("http://c", 4), "http://c/api/courses/4");
    assert_eq!(course_search_endpoint("http://c", "rust & go"), "http://c/api/courses/search?keyword=rust%20%26%20go");
    assert_eq!(course_videos_endpoint("http://v", 4), "http://v/api/videos?courseId=4");
    assert_eq!(video_endpoint("http://v", 9), "http://v/api/videos/9");
    assert_eq!(user_endpoint("http://u", "a/b"), "http://u/api/users/a%2Fb");
    assert_eq!(ai_ask_endpoint("http://a"), "http://a/api/ai/ask");
}

#[test]
fn list_courses_decodes_catalog() {
    let (backend, transport, _) = backend();
    transport.respond(
        "http://courses.test/api/courses",
        HttpResponse::json(
            200,
            &json!([
                { "id": 1, "title": "Rust Basics", "level": "BEGINNER", "price": 0.0 },
                { "id": 2, "title": "Async Rust", "instructorName": "Ana" },
            ]),
        ),
    );

    let courses = block_on(backend.list_courses()).unwrap();
    assert_eq!(courses.len(), 2);
    assert_eq!(courses[1].instructor_name.as_deref(), Some("Ana"));
}

#[test]
fn course_not_found_is_status_404() {
    let (backend, transport, _) = backend();
    transport.respond("http://courses.test/api/courses/77", HttpResponse::new(404, ""));

    let err = block_on(backend.course(77)).unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 404, .. }));
    assert_eq!(err.user_message(), "Resource not found.");
}

#[test]
fn create_update_delete_use_expected_methods() {
    let (backend, transport, manager) = backend();
    block_on(manager.login("ana", "x")).unwrap();
    let course = json!({ "id": 5, "title": "New" });
    transport.respond("http://courses.test/api/courses", HttpResponse::json(201, &course));
    transport.respond("http://courses.test/api/courses/5", HttpResponse::json(200, &course));

    let draft = CourseDraft { title: "New".to_owned(), ..CourseDraft::default() };
    assert_eq!(block_on(backend.create_course(&draft)).unwrap().id, 5);
    assert_eq!(block_on(backend.update_course(5, &draft)).unwrap().title, "New");
    block_on(backend.delete_course(5)).unwrap();

    let methods: Vec<Method> = transport.requests().iter().map(|r| r.method).collect();
    assert_eq!(methods, vec![Method::Post, Method::Put, Method::Delete]);
    assert_eq!(transport.requests()[0].body.as_deref(), Some(r#"{"title":"New"}"#));
}

#[test]
fn videos_by_course_and_stream_url() {
    let (backend, transport, _) = backend();
    transport.respond(
        "http://videos.test/api/videos?courseId=3",
        HttpResponse::json(200, &json!({ "success": true, "data": [{ "id": 8, "title": "Intro" }] })),
    );

    let videos = block_on(backend.course_videos(3)).unwrap();
    assert_eq!(videos[0].title, "Intro");
    assert_eq!(backend.video_stream_url(8), "http://videos.test/api/videos/8/stream");
}

#[test]
fn ask_fills_user_id_from_profile() {
    let (backend, transport, manager) = backend();
    block_on(manager.login("ana", "x")).unwrap();
    transport.respond("http://ai.test/api/ai/ask", HttpResponse::json(200, &json!({ "answer": "Use Rc." })));

    let answer = block_on(backend.ask(AiQuestion { question: "Shared ownership?".to_owned(), ..AiQuestion::default() }))
        .unwrap();
    assert_eq!(answer.answer, "Use Rc.");
    let body: serde_json::Value = serde_json::from_str(transport.requests()[0].body.as_deref().unwrap()).unwrap();
    assert_eq!(body["userId"], "mock-ana");
    assert!(body.get("courseId").is_none());
}

#[test]
fn unsuccessful_answer_is_an_error() {
    let (backend, transport, _) = backend();
    transport.respond(
        "http://ai.test/api/ai/ask",
        HttpResponse::json(200, &json!({ "success": false, "errorMessage": "model offline" })),
    );

    let err = block_on(backend.ask(AiQuestion { question: "?".to_owned(), ..AiQuestion::default() })).unwrap_err();
    assert_eq!(err, ClientError::Status { status: 200, message: "model offline".to_owned() });
}

#[test]
fn courses_by_category_encodes_name() {
    let (backend, transport, _) = backend();
    transport.respond(
        "http://courses.test/api/courses/category/Web%20Development",
        HttpResponse::json(200, &json!([{ "id": 5, "title": "HTML", "category": "Web Development" }])),
    );

    let courses = block_on(backend.courses_by_category("Web Development")).unwrap();
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].id, 5);
    assert_eq!(course_category_endpoint("http://c", "a/b"), "http://c/api/courses/category/a%2Fb");
}

#[test]
fn ai_health_accepts_plain_text() {
    let (backend, transport, _) = backend();
    transport.respond("http://ai.test/api/ai/health", HttpResponse::new(200, "AI Service is running"));
    assert!(block_on(backend.ai_health()));
    assert_eq!(transport.requests()[0].method, Method::Get);
}

#[test]
fn ai_health_is_false_on_failure() {
    let (backend, transport, _) = backend();
    transport.respond("http://ai.test/api/ai/health", HttpResponse::new(503, ""));
    assert!(!block_on(backend.ai_health()));

    transport.fail("http://ai.test/api/ai/health", "connection refused");
    assert!(!block_on(backend.ai_health()));
}
