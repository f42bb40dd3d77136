//! Process-wide options live in a global; this binary holds a single test.

use serde_json::{json, Value};
use specguard_rs::prelude::*;
use specguard_rs::TestClient;

async fn echo(Validated(inputs): Validated) -> Json<Value> {
    Json(inputs.body.unwrap_or(Value::Null))
}

fn app() -> SpecGuard {
    let schema = RequestSchema::new()
        .body(ObjectSchema::new().key("name", Schema::string().required()));
    SpecGuard::new().route("/echo", post(echo).validate(schema).unwrap())
}

#[tokio::test]
async fn process_options_apply_per_request() {
    let client = TestClient::new(app());
    client.post_json("/echo", &json!({})).await.assert_status(400);

    std::env::set_var("SPECGUARD_STATUS", "422");
    std::env::set_var("SPECGUARD_FLATTEN", "true");
    let app = app().validation_options_from_env().unwrap();
    std::env::remove_var("SPECGUARD_STATUS");
    std::env::remove_var("SPECGUARD_FLATTEN");

    // an already-built client picks the new options up on its next request
    let response = client.post_json("/echo", &json!({})).await;
    response.assert_status(422);
    response.assert_json(&json!(["\"name\" is required"]));

    let doc = app.openapi_spec().unwrap().to_json();
    let failure = &doc["paths"]["/echo"]["post"]["responses"]["422"];
    assert_eq!(failure["content"]["application/json"]["schema"]["type"], "array");

    // later calls only fill options that are still unset
    set_options(Some(OptionsOverride::new().status(409).status_text("Conflict")));
    let response = client.post_json("/echo", &json!({})).await;
    response.assert_status(422);
    assert!(response.json::<Value>().unwrap().is_array());

    set_options(None);
    client.post_json("/echo", &json!({})).await.assert_status(400);
    client
        .post_json("/echo", &json!({"name": "Ada"}))
        .await
        .assert_status(200)
        .assert_json(&json!({"name": "Ada"}));
}
