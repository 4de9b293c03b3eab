mod common;

use actix_web::{test, web, App};
use blogpost_server::configure;
use chrono::DateTime;

#[actix_web::test]
async fn test_health_check() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(common::test_state()))
            .configure(configure)
    ).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let json: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(json["status"], "healthy");
    assert!(DateTime::parse_from_rfc3339(
        json["timestamp"].as_str().unwrap()
    ).is_ok());
}

#[actix_web::test]
async fn test_index_lists_endpoints() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(common::test_state()))
            .configure(configure)
    ).await;

    let req = test::TestRequest::get().uri("/").to_request();
    let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
    assert!(json["endpoints"].get("POST /api/auth/signup").is_some());
    assert!(json["endpoints"].get("DELETE /api/posts/{id}").is_some());
}
