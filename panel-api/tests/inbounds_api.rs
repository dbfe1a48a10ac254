mod common;

use axum::http::StatusCode;
use common::{body_json, sample_panel, spawn_app, API_KEY};
use panel_api::middleware::API_KEY_HEADER;
use serde_json::json;

const AUTH: (&str, &str) = (API_KEY_HEADER, API_KEY);

#[tokio::test]
async fn lists_and_gets_inbounds() {
    let app = spawn_app(Some(API_KEY), "/", sample_panel());

    let list = body_json(app.get("/api/list", &[AUTH]).await).await;
    assert_eq!(list["success"], true);
    let protocols: Vec<&str> = list["obj"]
        .as_array()
        .unwrap()
        .iter()
        .map(|ib| ib["protocol"].as_str().unwrap())
        .collect();
    assert_eq!(protocols, ["vmess", "trojan", "wireguard"]);

    let one = body_json(app.get("/api/get/2", &[AUTH]).await).await;
    assert_eq!(one["obj"]["protocol"], "trojan");

    let missing = app.get("/api/get/99", &[AUTH]).await;
    assert_eq!(missing.status(), StatusCode::OK);
    assert_eq!(
        body_json(missing).await,
        json!({"success": false, "msg": "inbound not found", "obj": null})
    );
}

#[tokio::test]
async fn adds_client_from_json_body() {
    let app = spawn_app(Some(API_KEY), "/", sample_panel());

    let settings = json!({"clients": [{"id": "c-uuid", "email": "C", "enable": true}]});
    let response = app
        .post_json(
            "/api/addClient",
            &[AUTH],
            json!({"id": 1, "settings": settings.to_string()}),
        )
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let users = body_json(app.get("/api/stats/users", &[AUTH]).await).await;
    assert_eq!(users["obj"]["count"], 7);
}

#[tokio::test]
async fn adds_client_from_form_body() {
    let app = spawn_app(Some(API_KEY), "/", sample_panel());

    // settings={"clients":[{"id":"d-uuid","email":"D","enable":true}]}
    let body = "id=2&settings=%7B%22clients%22%3A%5B%7B%22id%22%3A%22d-uuid%22%2C%22email%22%3A%22D%22%2C%22enable%22%3Atrue%7D%5D%7D";
    let response = app.post_form("/api/addClient", &[AUTH], body).await;

    assert_eq!(body_json(response).await["success"], true);
    let trojan = &app.panel.inbounds().await[1];
    let emails: Vec<String> = trojan.clients().unwrap().into_iter().map(|c| c.email).collect();
    assert_eq!(emails, ["A", "D"]);
}

#[tokio::test]
async fn rejects_invalid_client_payloads() {
    let app = spawn_app(Some(API_KEY), "/", sample_panel());

    let empty = app
        .post_json(
            "/api/addClient",
            &[AUTH],
            json!({"id": 1, "settings": "{\"clients\":[]}"}),
        )
        .await;
    assert_eq!(empty.status(), StatusCode::OK);
    assert_eq!(body_json(empty).await["success"], false);

    let malformed = app
        .post_json("/api/addClient", &[AUTH], json!({"settings": 5}))
        .await;
    assert_eq!(malformed.status(), StatusCode::OK);
    assert_eq!(body_json(malformed).await["success"], false);

    let duplicate = app
        .post_json(
            "/api/addClient",
            &[AUTH],
            json!({"id": 3, "settings": json!({"clients": [{"email": "A"}]}).to_string()}),
        )
        .await;
    let duplicate = body_json(duplicate).await;
    assert_eq!(duplicate["success"], false);
    assert_eq!(duplicate["msg"], "Duplicate email: A");
}

#[tokio::test]
async fn updates_and_deletes_clients_by_protocol_key() {
    let app = spawn_app(Some(API_KEY), "/", sample_panel());

    let settings = json!({"clients": [{"password": "a-pass", "email": "A", "enable": false}]});
    let updated = app
        .post_json(
            "/api/updateClient/a-pass",
            &[AUTH],
            json!({"id": 2, "settings": settings.to_string()}),
        )
        .await;
    assert_eq!(body_json(updated).await["success"], true);
    assert!(!app.panel.inbounds().await[1].clients().unwrap()[0].enable);

    let deleted = app
        .post_json("/api/1/delClient/b-uuid", &[AUTH], json!({}))
        .await;
    assert_eq!(body_json(deleted).await["success"], true);
    assert_eq!(app.panel.inbounds().await[0].clients().unwrap().len(), 1);

    let again = app
        .post_json("/api/1/delClient/b-uuid", &[AUTH], json!({}))
        .await;
    let again = body_json(again).await;
    assert_eq!(again["success"], false);
    assert_eq!(again["msg"], "Client Not Found");
}

#[tokio::test]
async fn mutations_require_login() {
    let app = spawn_app(Some(API_KEY), "/", sample_panel());

    let response = app
        .post_json("/api/1/delClient/a-uuid", &[], json!({}))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.panel.inbounds().await[0].clients().unwrap().len(), 2);
}
