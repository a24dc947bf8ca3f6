//! End-to-end scenarios against a live server.

use std::time::Duration;

use serde_json::{json, Value};

use apilint::{ServerConfig, ValidationConfig};

use crate::server::{fixture, RulesetHost, TestServer};

fn items(body: &Value) -> &Vec<Value> {
    body["items"].as_array().expect("items array")
}

fn error_codes(body: &Value) -> Vec<&str> {
    items(body)
        .iter()
        .filter_map(|item| item["errorCode"].as_str())
        .collect()
}

#[tokio::test]
async fn empty_ruleset_produces_no_problems() {
    let server = TestServer::start().await.unwrap();
    let (status, body) = server.validate("{}", r#"{"rules":{}}"#).await.unwrap();
    assert_eq!(status, 200);
    assert_eq!(body, json!({"items": []}));
}

#[tokio::test]
async fn single_rule_violation_is_reported() {
    let server = TestServer::start().await.unwrap();
    let (status, body) = server
        .validate(
            &fixture("petstore.yaml").unwrap(),
            &fixture("rulesets/contact-error.yaml").unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(status, 200, "{}", body);
    assert_eq!(
        body,
        json!({
            "items": [{
                "errorCode": "info-contact",
                "nodePath": "/info",
                "message": "Info object must have a contact",
                "property": "info",
                "severity": "high"
            }]
        })
    );
}

#[tokio::test]
async fn missing_remote_ruleset_is_not_found() {
    let host = RulesetHost::start().await;
    host.serve_status("/missing.json", 404, "").await;
    let server = TestServer::start().await.unwrap();

    let url = host.url("/missing.json");
    let (status, body) = server.validate("{}", &url).await.unwrap();
    assert_eq!(status, 404);
    assert_eq!(
        body,
        json!({
            "code": "RULESET_NOT_FOUND",
            "title": "Ruleset not found",
            "detail": format!("No ruleset found at location: {}", url),
            "statusCode": 404
        })
    );
}

#[tokio::test]
async fn not_found_detail_keeps_the_reference_as_sent() {
    let host = RulesetHost::start().await;
    let server = TestServer::start().await.unwrap();

    let url = host.url("/team/My Rules.json");
    let (status, body) = server.validate("{}", &url).await.unwrap();
    assert_eq!(status, 404, "{}", body);
    assert_eq!(
        body["detail"],
        format!("No ruleset found at location: {}", url)
    );
    assert_eq!(host.request_count().await, 1);
}

#[tokio::test]
async fn missing_document_field_is_a_bad_request() {
    let server = TestServer::start().await.unwrap();
    let resp = server
        .post_raw(json!({"ruleset": "{}"}).to_string())
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_REQUEST_BODY");
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn mixed_severities_and_templated_messages() {
    let server = TestServer::start().await.unwrap();
    let document = fixture("petstore.yaml")
        .unwrap()
        .replace("listPets", "list_pets");
    let (status, body) = server
        .validate(&document, &fixture("rulesets/contact-warn.yaml").unwrap())
        .await
        .unwrap();
    assert_eq!(status, 200, "{}", body);

    let mut found: Vec<(String, String, String)> = items(&body)
        .iter()
        .map(|item| {
            (
                item["errorCode"].as_str().unwrap().to_string(),
                item["nodePath"].as_str().unwrap().to_string(),
                item["severity"].as_str().unwrap().to_string(),
            )
        })
        .collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            ("info-contact".into(), "/info".into(), "medium".into()),
            (
                "operation-id-camel".into(),
                "/paths//pets/get/operationId".into(),
                "low".into()
            ),
        ]
    );

    let camel = items(&body)
        .iter()
        .find(|item| item["errorCode"] == "operation-id-camel")
        .unwrap();
    assert_eq!(camel["property"], "operationId");
    assert_eq!(
        camel["message"],
        "operationId is not camel case: list_pets"
    );
}

const CONTACT_ERROR_JSON: &str = r#"{
  "rules": {
    "info-contact": {
      "description": "Info object must have a contact",
      "severity": "error",
      "given": "$.info",
      "then": { "field": "contact", "function": "truthy" }
    }
  }
}"#;

#[tokio::test]
async fn json_and_yaml_rulesets_agree() {
    let server = TestServer::start().await.unwrap();
    let document = fixture("petstore.yaml").unwrap();

    let (_, from_yaml) = server
        .validate(&document, &fixture("rulesets/contact-error.yaml").unwrap())
        .await
        .unwrap();
    let (_, from_json) = server
        .validate(&document, CONTACT_ERROR_JSON)
        .await
        .unwrap();

    assert_eq!(error_codes(&from_yaml), vec!["info-contact"]);
    assert_eq!(from_yaml, from_json);
}

#[tokio::test]
async fn remote_extends_resolve_relative_to_the_parent() {
    let host = RulesetHost::start().await;
    host.serve("/rules/base.json", &fixture("rulesets/base.json").unwrap())
        .await;
    host.serve("/rules/all.yaml", "extends: [[base.json, all]]\nrules: {}\n")
        .await;
    host.serve(
        "/rules/recommended.yaml",
        "extends: [[base.json, recommended]]\nrules: {}\n",
    )
    .await;

    let server = TestServer::start().await.unwrap();
    let document = fixture("petstore.yaml").unwrap();

    let (status, all) = server
        .validate(&document, &host.url("/rules/all.yaml"))
        .await
        .unwrap();
    assert_eq!(status, 200, "{}", all);
    let mut codes = error_codes(&all);
    codes.sort();
    assert_eq!(codes, vec!["info-contact", "info-description"]);

    let (status, recommended) = server
        .validate(&document, &host.url("/rules/recommended.yaml"))
        .await
        .unwrap();
    assert_eq!(status, 200, "{}", recommended);
    assert_eq!(error_codes(&recommended), vec!["info-contact"]);
}

#[tokio::test]
async fn inline_ruleset_can_extend_a_remote_one() {
    let host = RulesetHost::start().await;
    host.serve("/base.json", &fixture("rulesets/base.json").unwrap())
        .await;
    let server = TestServer::start().await.unwrap();

    let ruleset = format!(
        "extends: '{}'\nrules:\n  info-contact: error\n",
        host.url("/base.json")
    );
    let (status, body) = server
        .validate(&fixture("petstore.yaml").unwrap(), &ruleset)
        .await
        .unwrap();
    assert_eq!(status, 200, "{}", body);
    assert_eq!(error_codes(&body), vec!["info-contact"]);
    assert_eq!(items(&body)[0]["severity"], "high");
}

#[tokio::test]
async fn repeated_requests_return_identical_results() {
    let server = TestServer::start().await.unwrap();
    let document = fixture("petstore.yaml").unwrap();
    let ruleset = fixture("rulesets/contact-warn.yaml").unwrap();

    let (_, first) = server.validate(&document, &ruleset).await.unwrap();
    for _ in 0..3 {
        let (_, again) = server.validate(&document, &ruleset).await.unwrap();
        assert_eq!(first, again);
    }
}

#[tokio::test]
async fn ruleset_cache_skips_refetching() {
    let host = RulesetHost::start().await;
    host.serve("/contact.yaml", &fixture("rulesets/contact-error.yaml").unwrap())
        .await;
    let server = TestServer::with_config(ServerConfig {
        validation: ValidationConfig {
            cache_ttl: Some(Duration::from_secs(60)),
            ..ValidationConfig::default()
        },
        ..ServerConfig::default()
    })
    .await
    .unwrap();

    let url = host.url("/contact.yaml");
    for _ in 0..3 {
        let (status, _) = server.validate("{}", &url).await.unwrap();
        assert_eq!(status, 200);
    }
    assert_eq!(host.request_count().await, 1);
}

#[tokio::test]
async fn unparseable_document_is_reported_as_a_problem() {
    let server = TestServer::start().await.unwrap();
    let (status, body) = server
        .validate("openapi: [unclosed", r#"{"rules":{}}"#)
        .await
        .unwrap();
    assert_eq!(status, 200, "{}", body);
    let problems = items(&body);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0]["errorCode"], "parser");
    assert_eq!(problems[0]["nodePath"], "/");
    assert_eq!(problems[0]["property"], "");
    assert_eq!(problems[0]["severity"], "high");
}

#[tokio::test]
async fn cors_preflight_for_configured_origin() {
    let origin = "http://apicurio.example.test";
    let server = TestServer::with_config(ServerConfig {
        allowed_origins: apilint::parse_origins(None, Some(origin)),
        ..ServerConfig::default()
    })
    .await
    .unwrap();

    let resp = server
        .request(
            reqwest::Method::OPTIONS,
            "/validate",
            &[
                ("origin", origin),
                ("access-control-request-method", "POST"),
                ("access-control-request-headers", "content-type"),
            ],
        )
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert_eq!(
        resp.headers()["access-control-allow-origin"],
        origin
    );
}

#[tokio::test]
async fn metrics_reflect_served_traffic() {
    let host = RulesetHost::start().await;
    host.serve_status("/missing.yaml", 404, "").await;
    let server = TestServer::start().await.unwrap();

    server.validate("{}", r#"{"rules":{}}"#).await.unwrap();
    server
        .validate("{}", &host.url("/missing.yaml"))
        .await
        .unwrap();

    let resp = server.get("/metrics").await.unwrap();
    assert_eq!(resp.status(), 200);
    let text = resp.text().await.unwrap();
    assert!(text.contains(r#"apilint_validations_total{outcome="ok"} 1"#), "{}", text);
    assert!(text.contains("RULESET_NOT_FOUND"), "{}", text);
    assert!(text.contains(r#"apilint_ruleset_fetches_total{outcome="not_found"} 1"#), "{}", text);
}
