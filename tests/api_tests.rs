//! API integration tests. They expect a running server with a migrated
//! database (RUN_MODE=development defaults) and provision their own
//! catalog rows.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

async fn create_type(client: &Client, body: Value) -> i64 {
    let response = client
        .post(format!("{}/equipment-types", BASE_URL))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No type ID")
}

async fn create_location(client: &Client, name: &str) -> i64 {
    let response = client
        .post(format!("{}/locations", BASE_URL))
        .json(&json!({ "name": name }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No location ID")
}

async fn create_unit(client: &Client, equipment_id: &str, type_id: i64, location_id: i64) {
    let response = client
        .post(format!("{}/equipment/individual", BASE_URL))
        .json(&json!({
            "equipment_id": equipment_id,
            "type_id": type_id,
            "location_id": location_id
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
}

async fn create_job(client: &Client, body: Value) -> i64 {
    let response = client
        .post(format!("{}/jobs", BASE_URL))
        .json(&body)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    body["id"].as_i64().expect("No job ID")
}

async fn delete_path(client: &Client, path: String) {
    let _ = client.delete(format!("{}{}", BASE_URL, path)).send().await;
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_readiness_probe() {
    let client = Client::new();

    let response = client
        .get(format!("{}/ready", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
#[ignore]
async fn test_equipment_type_next_id_flow() {
    let client = Client::new();
    let type_id = create_type(
        &client,
        json!({
            "name": "Next Id Test Box",
            "requires_individual_tracking": true,
            "id_prefix": "NI"
        }),
    )
    .await;
    let location_id = create_location(&client, "Next Id Test Yard").await;

    let response = client
        .get(format!("{}/equipment-types/{}/next-id", BASE_URL, type_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["equipment_id"], "NI0001");

    create_unit(&client, "NI0001", type_id, location_id).await;

    let response = client
        .get(format!("{}/equipment-types/{}/next-id", BASE_URL, type_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["equipment_id"], "NI0002");

    // An id outside the prefix convention is refused
    let response = client
        .post(format!("{}/equipment/individual", BASE_URL))
        .json(&json!({
            "equipment_id": "WRONG-001",
            "type_id": type_id,
            "location_id": location_id
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 400);

    delete_path(&client, "/equipment/individual/NI0001".to_string()).await;
    delete_path(&client, format!("/equipment-types/{}", type_id)).await;
    delete_path(&client, format!("/locations/{}", location_id)).await;
}

#[tokio::test]
#[ignore]
async fn test_allocation_conflict_and_resolution_flow() {
    let client = Client::new();
    let type_id = create_type(
        &client,
        json!({
            "name": "Conflict Test Box",
            "requires_individual_tracking": true
        }),
    )
    .await;
    let location_id = create_location(&client, "Conflict Test Yard").await;
    create_unit(&client, "CF-BOX-1", type_id, location_id).await;
    let job_a = create_job(&client, json!({ "name": "Permian 42 Frac" })).await;
    let job_b = create_job(&client, json!({ "name": "Eagle Ford 7 Wireline" })).await;

    // Unknown ids are a plain not-found, no conflict involved
    let response = client
        .post(format!("{}/allocations", BASE_URL))
        .json(&json!({ "equipment_id": "NO-SUCH-UNIT", "job_id": job_a }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 404);

    // First allocation wins
    let response = client
        .post(format!("{}/allocations", BASE_URL))
        .json(&json!({ "equipment_id": "CF-BOX-1", "job_id": job_a }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["equipment_id"], "CF-BOX-1");
    assert_eq!(body["job_id"], job_a);

    // Validation from the other job reports the double-booking
    let response = client
        .post(format!("{}/allocations/validate", BASE_URL))
        .json(&json!({ "equipment_id": "CF-BOX-1", "job_id": job_b }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["available"], false);
    assert!(body["conflict"]["id"].is_string());

    // Allocating anyway returns the conflict as a 409
    let response = client
        .post(format!("{}/allocations", BASE_URL))
        .json(&json!({ "equipment_id": "CF-BOX-1", "job_id": job_b }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.expect("Failed to parse response");
    let conflict_id = body["conflict"]["id"].as_str().expect("No conflict ID").to_string();

    let response = client
        .get(format!("{}/allocations/conflicts", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body
        .as_array()
        .expect("Conflict list is not an array")
        .iter()
        .any(|c| c["id"] == conflict_id.as_str()));

    // Keeping the current holder discards the conflict and changes nothing
    let response = client
        .post(format!(
            "{}/allocations/conflicts/{}/resolve",
            BASE_URL, conflict_id
        ))
        .json(&json!({ "resolution": "keepCurrent" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["allocation"].is_null());

    // Second round: transfer to the requester this time
    let response = client
        .post(format!("{}/allocations", BASE_URL))
        .json(&json!({ "equipment_id": "CF-BOX-1", "job_id": job_b }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 409);

    let body: Value = response.json().await.expect("Failed to parse response");
    let conflict_id = body["conflict"]["id"].as_str().expect("No conflict ID").to_string();

    let response = client
        .post(format!(
            "{}/allocations/conflicts/{}/resolve",
            BASE_URL, conflict_id
        ))
        .json(&json!({ "resolution": "transferToRequester" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["allocation"]["job_id"], job_b);

    let response = client
        .get(format!("{}/jobs/{}/allocations", BASE_URL, job_b))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body.as_array().expect("Not an array").len(), 1);

    // Release and clean up
    let response = client
        .post(format!("{}/allocations/release", BASE_URL))
        .json(&json!({ "equipment_id": "CF-BOX-1", "job_id": job_b }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    delete_path(&client, "/equipment/individual/CF-BOX-1".to_string()).await;
    delete_path(&client, format!("/jobs/{}", job_a)).await;
    delete_path(&client, format!("/jobs/{}", job_b)).await;
    delete_path(&client, format!("/equipment-types/{}", type_id)).await;
    delete_path(&client, format!("/locations/{}", location_id)).await;
}

#[tokio::test]
#[ignore]
async fn test_red_tagged_equipment_rejected_without_conflict() {
    let client = Client::new();
    let type_id = create_type(
        &client,
        json!({
            "name": "Red Tag Test Gauge",
            "requires_individual_tracking": true
        }),
    )
    .await;
    let location_id = create_location(&client, "Red Tag Test Yard").await;
    create_unit(&client, "RT-GAUGE-1", type_id, location_id).await;
    let job_id = create_job(&client, json!({ "name": "Midland 9 Workover" })).await;

    let response = client
        .post(format!("{}/equipment/individual/RT-GAUGE-1/red-tag", BASE_URL))
        .json(&json!({ "reason": "Cracked housing" }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .get(format!("{}/equipment/RT-GAUGE-1/status", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "red-tagged");

    // Terminal status: refused outright, no conflict record
    let response = client
        .post(format!("{}/allocations", BASE_URL))
        .json(&json!({ "equipment_id": "RT-GAUGE-1", "job_id": job_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 422);

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["conflict"].is_null());

    let response = client
        .get(format!("{}/allocations/conflicts", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(!body
        .as_array()
        .expect("Conflict list is not an array")
        .iter()
        .any(|c| c["equipment_id"] == "RT-GAUGE-1"));

    // Lifting the tag returns the unit to the pool
    let response = client
        .delete(format!("{}/equipment/individual/RT-GAUGE-1/red-tag", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], 0);

    delete_path(&client, "/equipment/individual/RT-GAUGE-1".to_string()).await;
    delete_path(&client, format!("/jobs/{}", job_id)).await;
    delete_path(&client, format!("/equipment-types/{}", type_id)).await;
    delete_path(&client, format!("/locations/{}", location_id)).await;
}

#[tokio::test]
#[ignore]
async fn test_job_manifest_sync_flow() {
    let client = Client::new();
    let type_id = create_type(
        &client,
        json!({
            "name": "Manifest Test Box",
            "requires_individual_tracking": true
        }),
    )
    .await;
    let location_id = create_location(&client, "Manifest Test Yard").await;
    create_unit(&client, "MF-BOX-1", type_id, location_id).await;
    create_unit(&client, "MF-BOX-2", type_id, location_id).await;
    create_unit(&client, "MF-COMP-1", type_id, location_id).await;

    // Creating a job with a manifest deploys its equipment immediately
    let job_id = create_job(
        &client,
        json!({
            "name": "Delaware 12 Frac",
            "equipment_manifest": {
                "box_ids": ["MF-BOX-1", "MF-BOX-2"],
                "computer_ids": ["MF-COMP-1"]
            }
        }),
    )
    .await;

    let response = client
        .get(format!("{}/jobs/{}/allocations", BASE_URL, job_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body.as_array().expect("Not an array").len(), 3);

    // Shrinking the manifest releases the dropped unit on the next sync
    let response = client
        .put(format!("{}/jobs/{}", BASE_URL, job_id))
        .json(&json!({
            "equipment_manifest": {
                "box_ids": ["MF-BOX-1"],
                "computer_ids": ["MF-COMP-1"]
            }
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let response = client
        .post(format!("{}/jobs/{}/sync-equipment", BASE_URL, job_id))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["failure_count"], 0);

    let response = client
        .get(format!("{}/jobs/{}/allocations", BASE_URL, job_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let held: Vec<&str> = body
        .as_array()
        .expect("Not an array")
        .iter()
        .filter_map(|a| a["equipment_id"].as_str())
        .collect();
    assert!(held.contains(&"MF-BOX-1"));
    assert!(held.contains(&"MF-COMP-1"));
    assert!(!held.contains(&"MF-BOX-2"));

    // Deleting the job returns everything to the pool
    let response = client
        .delete(format!("{}/jobs/{}", BASE_URL, job_id))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    let response = client
        .get(format!("{}/equipment/MF-BOX-1/status", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "available");

    delete_path(&client, "/equipment/individual/MF-BOX-1".to_string()).await;
    delete_path(&client, "/equipment/individual/MF-BOX-2".to_string()).await;
    delete_path(&client, "/equipment/individual/MF-COMP-1".to_string()).await;
    delete_path(&client, format!("/equipment-types/{}", type_id)).await;
    delete_path(&client, format!("/locations/{}", location_id)).await;
}

#[tokio::test]
#[ignore]
async fn test_bulk_split_and_consolidate_flow() {
    let client = Client::new();
    let type_id = create_type(
        &client,
        json!({ "name": "Consolidate Test Hose" }),
    )
    .await;
    let location_id = create_location(&client, "Consolidate Test Yard").await;

    let response = client
        .post(format!("{}/equipment/bulk", BASE_URL))
        .json(&json!({
            "type_id": type_id,
            "location_id": location_id,
            "quantity": 10
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let row_id = body["id"].as_i64().expect("No row ID");

    let job_id = create_job(&client, json!({ "name": "Howard 3 Coil" })).await;

    // Partial allocation splits the row; the ledger tracks the split-off part
    let response = client
        .post(format!("{}/allocations", BASE_URL))
        .json(&json!({
            "equipment_id": row_id.to_string(),
            "job_id": job_id,
            "quantity": 4
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);

    let body: Value = response.json().await.expect("Failed to parse response");
    let deployed_id = body["equipment_id"].as_str().expect("No equipment ID").to_string();

    let response = client
        .get(format!("{}/equipment/bulk?job_id={}", BASE_URL, job_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let rows = body.as_array().expect("Not an array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["quantity"], 4);

    let response = client
        .post(format!("{}/allocations/release", BASE_URL))
        .json(&json!({ "equipment_id": deployed_id, "job_id": job_id }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 204);

    // Both halves are available again; consolidation merges them back
    let response = client
        .post(format!("{}/equipment/consolidate", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["merged"].as_u64().expect("No merged count") >= 1);

    let response = client
        .get(format!("{}/equipment/bulk?type_id={}", BASE_URL, type_id))
        .send()
        .await
        .expect("Failed to send request");
    let body: Value = response.json().await.expect("Failed to parse response");
    let rows = body.as_array().expect("Not an array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["quantity"], 10);

    let keeper_id = rows[0]["id"].as_i64().expect("No row ID");
    delete_path(&client, format!("/equipment/bulk/{}", keeper_id)).await;
    delete_path(&client, format!("/jobs/{}", job_id)).await;
    delete_path(&client, format!("/equipment-types/{}", type_id)).await;
    delete_path(&client, format!("/locations/{}", location_id)).await;
}

#[tokio::test]
#[ignore]
async fn test_unknown_equipment_status_is_unavailable() {
    let client = Client::new();

    let response = client
        .get(format!("{}/equipment/NO-SUCH-UNIT/status", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "unavailable");
}
