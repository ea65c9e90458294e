//! Integration tests for posts, comments, likes and profiles.

mod common;

use axum::http::{Method, StatusCode};
use common::{Part, TestApp, str_field};
use serde_json::{Value, json};
use uuid::Uuid;

/// Two signed-up users; returns their access tokens and ids.
async fn two_users(app: &TestApp) -> ((String, String), (String, String)) {
    let a = app.signup("a@x.com", "pw123456").await;
    let b = app.signup("b@x.com", "pw123456").await;
    (
        (
            str_field(&a, "accessToken").to_string(),
            str_field(&a, "userId").to_string(),
        ),
        (
            str_field(&b, "accessToken").to_string(),
            str_field(&b, "userId").to_string(),
        ),
    )
}

fn uploaded_files(app: &TestApp) -> usize {
    std::fs::read_dir(app.uploads.path())
        .map(|entries| entries.count())
        .unwrap_or(0)
}

async fn update_post(app: &TestApp, token: &str, id: &str, content: &str) -> (StatusCode, Value) {
    app.multipart(
        Method::PUT,
        &format!("/posts/{id}"),
        Some(token),
        &[Part::Text("content", content)],
    )
    .await
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new();
    let profile_uri = format!("/users/{}", Uuid::new_v4());
    for uri in ["/posts", "/comments", profile_uri.as_str()] {
        let (status, body) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["message"], "Token is required");
    }
}

#[tokio::test]
async fn post_ownership_is_enforced() {
    let app = TestApp::new();
    let ((a_token, a_id), (b_token, _)) = two_users(&app).await;
    let post_id = app.create_post(&a_token, "first light").await;

    let (status, body) = update_post(&app, &b_token, &post_id, "hijacked").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Action not allowed");

    let (status, body) = update_post(&app, &a_token, &post_id, "edited").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "edited");
    assert_eq!(body["author"], a_id.as_str());

    let (status, _) = app.delete(&format!("/posts/{post_id}"), Some(&b_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.delete(&format!("/posts/{post_id}"), Some(&a_token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = app.get(&format!("/posts/{post_id}"), Some(&a_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");
}

#[tokio::test]
async fn missing_post_is_not_found_for_every_mutation() {
    let app = TestApp::new();
    let ((token, _), _) = two_users(&app).await;
    let missing = Uuid::new_v4().to_string();

    let (status, _) = update_post(&app, &token, &missing, "x").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.delete(&format!("/posts/{missing}"), Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_ids_and_unknown_filters_are_bad_requests() {
    let app = TestApp::new();
    let ((token, _), _) = two_users(&app).await;

    let (status, _) = app.get("/posts/not-a-uuid", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/posts?$where=1", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get("/comments?author=nobody", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_post_requires_image() {
    let app = TestApp::new();
    let ((token, _), _) = two_users(&app).await;

    let (status, body) = app
        .multipart(
            Method::POST,
            "/posts",
            Some(&token),
            &[Part::Text("content", "no picture")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Image is required");
}

#[tokio::test]
async fn posts_are_listed_newest_first_with_pages() {
    let app = TestApp::new();
    let ((a_token, _), (b_token, b_id)) = two_users(&app).await;
    app.create_post(&a_token, "one").await;
    app.create_post(&a_token, "two").await;
    app.create_post(&b_token, "three").await;

    let (status, body) = app.get("/posts?limit=2", Some(&a_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currentPage"], 1);
    assert_eq!(body["totalPages"], 2);
    let posts = body["posts"].as_array().unwrap();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["content"], "three");
    assert_eq!(posts[1]["content"], "two");

    let (_, body) = app.get("/posts?limit=2&page=2", Some(&a_token)).await;
    assert_eq!(body["posts"][0]["content"], "one");

    let (_, body) = app
        .get(&format!("/posts?author={b_id}"), Some(&a_token))
        .await;
    assert_eq!(body["posts"].as_array().unwrap().len(), 1);
    assert_eq!(body["totalPages"], 1);
}

#[tokio::test]
async fn replacing_and_deleting_post_images_cleans_up_files() {
    let app = TestApp::new();
    let ((token, _), _) = two_users(&app).await;
    let before = uploaded_files(&app);

    let post_id = app.create_post(&token, "with image").await;
    assert_eq!(uploaded_files(&app), before + 1);

    let (status, body) = app
        .multipart(
            Method::PUT,
            &format!("/posts/{post_id}"),
            Some(&token),
            &[
                Part::Text("content", "new image"),
                Part::File("image", "new.gif", b"gif bytes"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(str_field(&body, "image").ends_with(".gif"));
    assert_eq!(uploaded_files(&app), before + 1);

    app.delete(&format!("/posts/{post_id}"), Some(&token)).await;
    assert_eq!(uploaded_files(&app), before);
}

#[tokio::test]
async fn likes_are_unique_per_user() {
    let app = TestApp::new();
    let ((a_token, _), (b_token, _)) = two_users(&app).await;
    let post_id = app.create_post(&a_token, "like me").await;
    let like_uri = format!("/posts/{post_id}/like");

    let (status, body) = app
        .json(Method::POST, &like_uri, Some(&b_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Post liked successfully");

    let (status, body) = app
        .json(Method::POST, &like_uri, Some(&b_token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "You have already liked this post");

    let (_, likes) = app
        .get(&format!("/posts/{post_id}/likes"), Some(&b_token))
        .await;
    assert_eq!(likes, json!({ "likes": 1, "likedByMe": true }));

    let (_, likes) = app
        .get(&format!("/posts/{post_id}/likes"), Some(&a_token))
        .await;
    assert_eq!(likes, json!({ "likes": 1, "likedByMe": false }));

    let (_, post) = app.get(&format!("/posts/{post_id}"), Some(&b_token)).await;
    assert_eq!(post["likes"], 1);
    assert_eq!(post["likedByMe"], true);

    let unlike_uri = format!("/posts/{post_id}/unlike");
    let (status, _) = app.delete(&unlike_uri, Some(&b_token)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.delete(&unlike_uri, Some(&b_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Like not found");
}

#[tokio::test]
async fn liking_a_missing_post_is_not_found() {
    let app = TestApp::new();
    let ((token, _), _) = two_users(&app).await;

    let (status, body) = app
        .json(
            Method::POST,
            &format!("/posts/{}/like", Uuid::new_v4()),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");
}

#[tokio::test]
async fn comment_lifecycle_and_ownership() {
    let app = TestApp::new();
    let ((a_token, a_id), (b_token, _)) = two_users(&app).await;
    let post_id = app.create_post(&b_token, "discuss").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/comments",
            Some(&a_token),
            json!({ "post": Uuid::new_v4(), "content": "orphan" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");

    let (status, comment) = app
        .json(
            Method::POST,
            "/comments",
            Some(&a_token),
            json!({ "post": post_id, "content": "nice" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["author"], a_id.as_str());
    let comment_uri = format!("/comments/{}", str_field(&comment, "id"));

    let (status, _) = app
        .json(
            Method::PUT,
            &comment_uri,
            Some(&b_token),
            json!({ "content": "edited by b" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(
            Method::PUT,
            &comment_uri,
            Some(&a_token),
            json!({ "content": "very nice" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "very nice");

    let (status, _) = app.delete(&comment_uri, Some(&b_token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&comment_uri, Some(&a_token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&comment_uri, Some(&a_token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn comments_page_reports_has_more() {
    let app = TestApp::new();
    let ((token, _), _) = two_users(&app).await;
    let post_id = app.create_post(&token, "busy thread").await;
    for n in 0..3 {
        app.json(
            Method::POST,
            "/comments",
            Some(&token),
            json!({ "post": post_id, "content": format!("comment {n}") }),
        )
        .await;
    }

    let (status, body) = app
        .get(&format!("/comments?post={post_id}&limit=2"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["limit"], 2);
    assert_eq!(body["hasMore"], true);
    assert_eq!(body["items"][0]["content"], "comment 2");

    let (_, body) = app
        .get(&format!("/comments?post={post_id}&limit=2&page=2"), Some(&token))
        .await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["hasMore"], false);
}

#[tokio::test]
async fn comment_page_bounds_are_enforced() {
    let app = TestApp::new();
    let ((token, _), _) = two_users(&app).await;

    let (status, body) = app.get("/comments?limit=51", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "\"limit\" must be less than or equal to 50");

    for uri in ["/comments?limit=0", "/comments?page=0"] {
        let (status, _) = app.get(uri, Some(&token)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
    }

    let (status, body) = app.get("/comments?limit=50", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["limit"], 50);
}

#[tokio::test]
async fn deleting_a_post_removes_its_comments() {
    let app = TestApp::new();
    let ((token, _), _) = two_users(&app).await;
    let post_id = app.create_post(&token, "short lived").await;
    app.json(
        Method::POST,
        "/comments",
        Some(&token),
        json!({ "post": post_id, "content": "bye" }),
    )
    .await;

    app.delete(&format!("/posts/{post_id}"), Some(&token)).await;

    let (_, body) = app
        .get(&format!("/comments?post={post_id}"), Some(&token))
        .await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn profiles_are_readable_and_only_self_editable() {
    let app = TestApp::new();
    let ((a_token, a_id), (b_token, _)) = two_users(&app).await;
    let profile_uri = format!("/users/{a_id}");

    let (status, profile) = app.get(&profile_uri, Some(&b_token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "a@x.com");
    assert_eq!(profile["fullName"], "Test User");
    assert!(profile.get("password").is_none());
    let old_avatar = str_field(&profile, "avatar").to_string();

    let (status, body) = app
        .multipart(
            Method::PUT,
            &profile_uri,
            Some(&b_token),
            &[Part::Text("fullName", "Mallory")],
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized to update this user");

    let files_before = uploaded_files(&app);
    let (status, body) = app
        .multipart(
            Method::PUT,
            &profile_uri,
            Some(&a_token),
            &[
                Part::Text("fullName", "Alice"),
                Part::File("avatar", "new.png", b"new avatar"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fullName"], "Alice");
    assert_ne!(body["avatar"], old_avatar.as_str());
    assert_eq!(uploaded_files(&app), files_before);

    let (status, _) = app
        .get(&format!("/users/{}", Uuid::new_v4()), Some(&a_token))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
