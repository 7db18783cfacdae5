use std::time::Duration;

use coursescrape::{Catalog, Error};
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn entry() -> serde_json::Value {
    json!({
        "__passedCatalogQuery": true,
        "pid": "ByxA8Ta2V",
        "title": "Fundamentals of Programming I",
        "__catalogCourseId": "CSC110",
        "description": "<p>Introduction to designing and writing programs.</p>",
        "preAndCorequisites": "<ul><li>Complete MATH 100</li><li>Complete MATH 109</li></ul>",
        "supplementalNotes": "<p>Credit will be granted for only one of CSC 110, CSC 111.</p>",
        "credits": {"credits": {"min": "1.5", "max": "1.5"}, "value": "1.5", "chosen": "fixed"},
        "subjectCode": {"name": "CSC", "description": "Computer Science", "id": "1"}
    })
}

async fn catalog_with(body: ResponseTemplate) -> (MockServer, Catalog) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/catalog/ByxA8Ta2V"))
        .respond_with(body)
        .mount(&server)
        .await;

    let catalog = Catalog::new(format!("{}/catalog", server.uri()), Duration::from_secs(5)).unwrap();
    (server, catalog)
}

#[tokio::test]
async fn test_fetch_object_response() {
    let (_server, catalog) = catalog_with(ResponseTemplate::new(200).set_body_json(entry())).await;

    let info = catalog.fetch("ByxA8Ta2V").await.unwrap();

    assert_eq!(info.catalog_course_id, "CSC110");
    assert_eq!(info.credits.display(), "1.5");
    assert_eq!(
        info.prerequisites_text(),
        "• Complete MATH 100\n• Complete MATH 109"
    );
    assert_eq!(
        info.notes_text(),
        "Credit will be granted for only one of CSC 110, CSC 111."
    );
}

#[tokio::test]
async fn test_fetch_array_response() {
    let (_server, catalog) =
        catalog_with(ResponseTemplate::new(200).set_body_json(json!([entry()]))).await;

    let info = catalog.fetch("ByxA8Ta2V").await.unwrap();

    assert_eq!(info.title, "Fundamentals of Programming I");
}

#[tokio::test]
async fn test_fetch_empty_array() {
    let (_server, catalog) =
        catalog_with(ResponseTemplate::new(200).set_body_json(json!([]))).await;

    assert!(matches!(
        catalog.fetch("ByxA8Ta2V").await,
        Err(Error::EmptyResult(_))
    ));
}

#[tokio::test]
async fn test_fetch_unknown_pid() {
    let (_server, catalog) = catalog_with(ResponseTemplate::new(200).set_body_json(entry())).await;

    assert!(matches!(
        catalog.fetch("missing").await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_fetch_server_error() {
    let (_server, catalog) = catalog_with(ResponseTemplate::new(502)).await;

    match catalog.fetch("ByxA8Ta2V").await {
        Err(Error::Status { status, .. }) => assert_eq!(status.as_u16(), 502),
        other => panic!("unexpected result: {other:?}"),
    }
}
