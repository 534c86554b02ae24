// tests/pest_alert_tests.rs

mod common;

use std::path::PathBuf;

use common::{AuthUser, register_and_login, spawn_app, TestApp};

fn image_on_disk(app: &TestApp, url_path: &str) -> PathBuf {
    let relative = url_path
        .strip_prefix("/uploads/")
        .expect("image path should live under /uploads/");
    app.upload_dir.join(relative)
}

fn alert_form(title: &str) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new()
        .text("title", title.to_string())
        .text("description", "Chewed leaf margins across the north field")
        .text("severity", "warning")
        .text("crop", "maize")
        .text("location", "Oyo")
        .text("symptoms", r#"["chewed leaves", "", "frass on stems"]"#)
        .text("controlMeasures", r#"["neem spray"]"#)
}

fn png_part() -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A])
        .file_name("leaf.png")
        .mime_str("image/png")
        .unwrap()
}

async fn create_alert_with_image(
    client: &reqwest::Client,
    app: &TestApp,
    user: &AuthUser,
) -> serde_json::Value {
    let response = client
        .post(format!("{}/api/pest-alerts", app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .multipart(alert_form("Armyworm outbreak").part("image", png_part()))
        .send()
        .await
        .expect("Create alert failed");
    assert_eq!(response.status().as_u16(), 201);
    response.json().await.unwrap()
}

#[tokio::test]
async fn create_stores_image_and_drops_blank_symptoms() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = register_and_login(&client, &app.address, "farmer").await;

    // Act
    let alert = create_alert_with_image(&client, &app, &user).await;

    // Assert
    let image_url = alert["image"].as_str().unwrap();
    assert!(image_url.starts_with("/uploads/pest-alerts/"));
    assert!(image_on_disk(&app, image_url).exists());

    let symptoms: Vec<String> = serde_json::from_value(alert["symptoms"].clone()).unwrap();
    assert_eq!(symptoms, vec!["chewed leaves", "frass on stems"]);
    assert_eq!(alert["posted_by"], user.id);
}

#[tokio::test]
async fn non_image_upload_is_rejected() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let user = register_and_login(&client, &app.address, "farmer").await;

    let part = reqwest::multipart::Part::bytes(b"#!/bin/sh".to_vec())
        .file_name("script.sh")
        .mime_str("text/x-shellscript")
        .unwrap();

    // Act
    let response = client
        .post(format!("{}/api/pest-alerts", app.address))
        .header("Authorization", format!("Bearer {}", user.token))
        .multipart(alert_form("Bad upload").part("image", part))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn non_owner_update_is_forbidden_and_changes_nothing() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_and_login(&client, &app.address, "farmer").await;
    let intruder = register_and_login(&client, &app.address, "farmer").await;
    let alert = create_alert_with_image(&client, &app, &owner).await;
    let alert_id = alert["id"].as_i64().unwrap();

    // Act
    let response = client
        .put(format!("{}/api/pest-alerts/{}", app.address, alert_id))
        .header("Authorization", format!("Bearer {}", intruder.token))
        .multipart(alert_form("Hijacked title"))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 403);

    let unchanged: serde_json::Value = client
        .get(format!("{}/api/pest-alerts/{}", app.address, alert_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(unchanged["title"], "Armyworm outbreak");
}

#[tokio::test]
async fn delete_removes_the_stored_image() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_and_login(&client, &app.address, "farmer").await;
    let alert = create_alert_with_image(&client, &app, &owner).await;
    let alert_id = alert["id"].as_i64().unwrap();
    let on_disk = image_on_disk(&app, alert["image"].as_str().unwrap());
    assert!(on_disk.exists());

    // Act
    let response = client
        .delete(format!("{}/api/pest-alerts/{}", app.address, alert_id))
        .header("Authorization", format!("Bearer {}", owner.token))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    assert!(!on_disk.exists());

    let gone = client
        .get(format!("{}/api/pest-alerts/{}", app.address, alert_id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);
}

#[tokio::test]
async fn delete_without_image_is_a_noop_on_disk() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_and_login(&client, &app.address, "farmer").await;

    let created: serde_json::Value = client
        .post(format!("{}/api/pest-alerts", app.address))
        .header("Authorization", format!("Bearer {}", owner.token))
        .multipart(alert_form("No image here"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let alert_id = created["id"].as_i64().unwrap();
    assert!(created["image"].is_null());

    // Act
    let response = client
        .delete(format!("{}/api/pest-alerts/{}", app.address, alert_id))
        .header("Authorization", format!("Bearer {}", owner.token))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn comments_join_their_author() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_and_login(&client, &app.address, "farmer").await;
    let alert = create_alert_with_image(&client, &app, &owner).await;
    let alert_id = alert["id"].as_i64().unwrap();

    // Act
    let detail: serde_json::Value = client
        .post(format!("{}/api/pest-alerts/{}/comments", app.address, alert_id))
        .header("Authorization", format!("Bearer {}", owner.token))
        .json(&serde_json::json!({ "text": "Seen in Kwara as well." }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assert
    assert_eq!(detail["comments_count"], 1);
    assert_eq!(detail["comments"][0]["text"], "Seen in Kwara as well.");
    assert_eq!(detail["comments"][0]["user_name"], "Test User");
}

#[tokio::test]
async fn status_updates_are_validated() {
    // Arrange
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let owner = register_and_login(&client, &app.address, "farmer").await;
    let alert = create_alert_with_image(&client, &app, &owner).await;
    let alert_id = alert["id"].as_i64().unwrap();

    let status_url = format!("{}/api/pest-alerts/{}/status", app.address, alert_id);

    // Act
    let ok: serde_json::Value = client
        .patch(&status_url)
        .header("Authorization", format!("Bearer {}", owner.token))
        .json(&serde_json::json!({ "status": "resolved" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let bad = client
        .patch(&status_url)
        .header("Authorization", format!("Bearer {}", owner.token))
        .json(&serde_json::json!({ "status": "eradicated" }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(ok["status"], "resolved");
    assert_eq!(bad.status().as_u16(), 400);
}
