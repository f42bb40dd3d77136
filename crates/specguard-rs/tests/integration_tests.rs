//! End-to-end tests through the public prelude

use serde_json::{json, Value};
use specguard_rs::prelude::*;
use specguard_rs::{TestClient, TestRequest};

#[derive(Debug, Deserialize, Serialize)]
struct Order {
    item: String,
    quantity: u32,
}

async fn place_order(ValidatedJson(order): ValidatedJson<Order>) -> Created<Order> {
    Created(order)
}

fn order_schema() -> RequestSchema {
    RequestSchema::new()
        .headers(ObjectSchema::new().key(
            "x-tenant",
            Schema::string().when("$body.scope", "tenant", Presence::Required),
        ))
        .body(
            ObjectSchema::new()
                .key("item", Schema::string().required().valid(["tea", "coffee"]))
                .key("quantity", Schema::integer().required().min(1.0).max(10.0))
                .key("scope", Schema::string().valid(["public", "tenant"]).default_value("public")),
        )
        .options(
            OptionsOverride::new()
                .context_request(true)
                .allow_unknown(Location::Body, false),
        )
}

fn shop() -> SpecGuard {
    let responses: ResponseModels = serde_json::from_value(json!({
        "201": {"item": "string", "quantity": "integer"}
    }))
    .unwrap();

    SpecGuard::new()
        .route(
            "/orders",
            post(place_order)
                .validate(order_schema())
                .unwrap()
                .describe(RequestModel::new("Order", "orders").description("Place an order"))
                .responses(responses),
        )
        .docs_with_config(
            OpenApiConfig::new("Shop", "3.1.0")
                .description("Coffee shop")
                .route_version("v1"),
        )
}

#[tokio::test]
async fn accepted_order_gets_defaults() {
    let client = TestClient::new(shop());

    let response = client
        .post_json("/orders", &json!({"item": "tea", "quantity": "2"}))
        .await;

    response.assert_status(201);
    response.assert_json(&json!({"item": "tea", "quantity": 2}));
}

#[tokio::test]
async fn context_conditions_see_the_whole_request() {
    let client = TestClient::new(shop());

    let response = client
        .post_json("/orders", &json!({"item": "tea", "quantity": 1, "scope": "tenant"}))
        .await;
    response.assert_status(400);
    let body: Value = response.json().unwrap();
    assert_eq!(body["errors"][0]["location"], "headers");
    assert_eq!(body["errors"][0]["field"], "x-tenant");

    client
        .request(
            TestRequest::post("/orders")
                .header("x-tenant", "acme")
                .json(&json!({"item": "tea", "quantity": 1, "scope": "tenant"})),
        )
        .await
        .assert_status(201);
}

#[tokio::test]
async fn every_problem_is_reported() {
    let client = TestClient::new(shop());

    let response = client
        .post_json("/orders", &json!({"item": "juice", "quantity": 0, "gift": true}))
        .await;

    response.assert_status(400);
    let body: Value = response.json().unwrap();
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["item", "quantity", "gift"]);
    assert_eq!(body["errors"][2]["types"], json!(["object.unknown"]));
}

#[tokio::test]
async fn document_is_served_at_configured_path() {
    let client = TestClient::new(shop());

    let doc: Value = client.get("/openapi.json").await.json().unwrap();
    assert_eq!(doc["info"]["title"], "Shop");
    assert_eq!(doc["info"]["version"], "3.1.0");

    let op = &doc["paths"]["/orders"]["post"];
    assert_eq!(op["tags"], json!(["orders-v1"]));
    assert_eq!(op["responses"]["201"]["description"], "Created");
    assert_eq!(
        op["responses"]["400"]["content"]["application/json"]["schema"]["$ref"],
        "#/components/schemas/ValidationFailureSchema"
    );
    assert_eq!(
        doc["components"]["schemas"]["OrderModel"]["properties"]["item"]["enum"],
        json!(["tea", "coffee"])
    );
    assert_eq!(op["parameters"][0]["name"], "x-tenant");
    assert_eq!(op["parameters"][0]["required"], false);

    client.get("/docs").await.assert_status(200);
}

#[test]
fn invalid_patterns_fail_at_route_construction() {
    async fn noop() {}

    let schema = RequestSchema::new()
        .query(ObjectSchema::new().key("sku", Schema::string().pattern("[unclosed")));
    let err = get(noop).validate(schema).err().unwrap();
    assert!(matches!(err, ConfigurationError::InvalidPattern { .. }));
}
