// tests/calendar_tests.rs

mod common;

use common::{AuthUser, register_and_login, spawn_app};

async fn create_task(
    client: &reqwest::Client,
    address: &str,
    user: &AuthUser,
    title: &str,
    date: &str,
) -> i64 {
    let response = client
        .post(format!("{}/api/farming-calendar", address))
        .header("Authorization", format!("Bearer {}", user.token))
        .json(&serde_json::json!({
            "title": title,
            "description": "Check soil moisture first",
            "date": date,
            "task_type": "irrigation",
            "crop": "maize",
            "priority": "high"
        }))
        .send()
        .await
        .expect("Create task failed");
    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.unwrap();
    body["task"]["id"].as_i64().unwrap()
}

#[tokio::test]
async fn toggle_stamps_and_clears_completed_at() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = register_and_login(&client, &app.address, "farmer").await;
    let task_id = create_task(&client, &app.address, &user, "Water beds", "2025-06-10T06:00:00Z").await;

    // Act: complete
    let toggled: serde_json::Value = client
        .patch(format!("{}/api/farming-calendar/{}/toggle", app.address, task_id))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(toggled["task"]["completed"], true);
    assert!(toggled["task"]["completed_at"].is_string());

    // Act: reopen
    let toggled_back: serde_json::Value = client
        .patch(format!("{}/api/farming-calendar/{}/toggle", app.address, task_id))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(toggled_back["task"]["completed"], false);
    assert!(toggled_back["task"]["completed_at"].is_null());
}

#[tokio::test]
async fn month_filter_restricts_listing() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = register_and_login(&client, &app.address, "farmer").await;
    create_task(&client, &app.address, &user, "March planting", "2025-03-05T09:00:00Z").await;
    create_task(&client, &app.address, &user, "April weeding", "2025-04-02T09:00:00Z").await;

    // Act
    let march: Vec<serde_json::Value> = client
        .get(format!("{}/api/farming-calendar?month=2025-03", app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(march.len(), 1);
    assert_eq!(march[0]["title"], "March planting");

    // Act: garbage month
    let bad = client
        .get(format!("{}/api/farming-calendar?month=soonish", app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(bad.status().as_u16(), 400);
}

#[tokio::test]
async fn tasks_are_scoped_to_their_owner() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_and_login(&client, &app.address, "farmer").await;
    let intruder = register_and_login(&client, &app.address, "farmer").await;
    let task_id = create_task(&client, &app.address, &owner, "Fertilize plot 3", "2025-05-01T07:00:00Z").await;

    // Act: the other user cannot see or update it
    let listing: Vec<serde_json::Value> = client
        .get(format!("{}/api/farming-calendar", app.address))
        .header("Authorization", format!("Bearer {}", intruder.token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let update = client
        .put(format!("{}/api/farming-calendar/{}", app.address, task_id))
        .header("Authorization", format!("Bearer {}", intruder.token))
        .json(&serde_json::json!({ "title": "Hijacked" }))
        .send()
        .await
        .unwrap();

    // Assert
    assert!(listing.is_empty());
    assert_eq!(update.status().as_u16(), 404);
}

#[tokio::test]
async fn stats_count_current_month_only() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = register_and_login(&client, &app.address, "farmer").await;

    let this_month = chrono::Utc::now()
        .format("%Y-%m-15T08:00:00Z")
        .to_string();
    let task_id = create_task(&client, &app.address, &user, "Harvest plot 1", &this_month).await;
    create_task(&client, &app.address, &user, "Old task", "2020-01-10T08:00:00Z").await;

    client
        .patch(format!("{}/api/farming-calendar/{}/toggle", app.address, task_id))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .unwrap();

    // Act
    let stats: serde_json::Value = client
        .get(format!("{}/api/farming-calendar/stats", app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(stats["total_tasks"], 1);
    assert_eq!(stats["completed_tasks"], 1);
    assert_eq!(stats["high_priority_tasks"], 1);
    assert_eq!(stats["tasks_by_type"][0]["task_type"], "irrigation");
}

#[tokio::test]
async fn upcoming_excludes_completed_and_past_tasks() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = register_and_login(&client, &app.address, "farmer").await;

    let future = (chrono::Utc::now() + chrono::Duration::days(3))
        .to_rfc3339();
    let future_done = (chrono::Utc::now() + chrono::Duration::days(4))
        .to_rfc3339();

    create_task(&client, &app.address, &user, "Spray next week", &future).await;
    let done_id = create_task(&client, &app.address, &user, "Already handled", &future_done).await;
    create_task(&client, &app.address, &user, "Long gone", "2020-01-01T08:00:00Z").await;

    client
        .patch(format!("{}/api/farming-calendar/{}/toggle", app.address, done_id))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .unwrap();

    // Act
    let upcoming: Vec<serde_json::Value> = client
        .get(format!("{}/api/farming-calendar/upcoming", app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(upcoming.len(), 1);
    assert_eq!(upcoming[0]["title"], "Spray next week");
}
