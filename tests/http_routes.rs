//! Integration tests for the web UI and JSON API.
//!
//! The router runs against the offline model backend, so no weights are
//! needed; a fixed seed makes every response reproducible.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use innovation_lab::{
    config::{Config, ModelBackend},
    models::load_models,
    random_concept::RANDOM_CONCEPTS,
    server::{AppState, build_router},
};
use serde_json::{Value, json};
use std::io::Cursor;
use tower::ServiceExt;

const BOUNDARY: &str = "innovation-lab-test-boundary";

fn app() -> Router {
    let mut config = Config::default();
    config.models.backend = ModelBackend::Offline;
    config.runtime.seed = Some(7);
    let models = load_models(&config).expect("offline models load");
    build_router(AppState::new(config, models))
}

fn png_bytes(shade: u8) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(16, 16, image::Rgb([shade, shade, shade]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("encode png");
    out
}

/// Build a multipart/form-data body from (name, optional (filename, content type), data) parts
fn multipart(parts: &[(&str, Option<(&str, &str)>, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, file, data) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match file {
            Some((filename, content_type)) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
            }
            None => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
            }
        }
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn health_is_ok() {
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn info_reports_backend_and_sampling() {
    let req = Request::get("/info").body(Body::empty()).unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["models"]["backend"], "offline");
    assert_eq!(v["generation"]["max_length"], 200);
    assert_eq!(v["generation"]["top_p"], 0.95);
    assert_eq!(v["generation"]["top_k"], 50);
}

#[tokio::test]
async fn index_renders_selected_mode() {
    let req = Request::get("/?mode=csv&context=Education")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Upload a CSV file"));
    assert!(body.contains("class=\"active\" href=\"/?mode=csv"));
}

#[tokio::test]
async fn text_form_generates_idea_with_context() {
    let req = Request::post("/generate")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(
            "problem=Reduce+plastic+waste+in+oceans&context=Sustainability",
        ))
        .unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Innovative Solution:"));
    assert!(body.contains("Context: Sustainability."));
    assert!(body.contains("Problem: Reduce plastic waste in oceans."));
}

#[tokio::test]
async fn blank_problem_is_a_warning_not_an_error() {
    let req = Request::post("/generate")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from("problem=+++&context=General"))
        .unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("notice warning"));
    assert!(body.contains("Please enter a valid problem statement or idea."));
    assert!(!body.contains("Innovative Solution:"));
}

#[tokio::test]
async fn image_form_ranks_and_generates() {
    let png = png_bytes(250);
    let body = multipart(&[
        ("context", None, &b"Healthcare"[..]),
        ("image", Some(("device.png", "image/png")), png.as_slice()),
    ]);
    let (status, html) = send(app(), multipart_request("/analyze/image", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Top Relevant Concepts:"));
    assert_eq!(html.matches("Probability: ").count(), 3);
    assert!(html.contains("Generated Idea:"));
    assert!(html.contains("Context: Healthcare."));
}

#[tokio::test]
async fn corrupt_image_is_reported_and_server_keeps_serving() {
    let router = app();
    let body = multipart(&[("image", Some(("broken.jpg", "image/jpeg")), &b"\xff\xd8garbage"[..])]);
    let (status, html) = send(router.clone(), multipart_request("/analyze/image", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("notice error"));
    assert!(html.contains("Error analyzing image"));

    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, _) = send(router, req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unsupported_image_type_is_a_warning() {
    let body = multipart(&[("image", Some(("anim.gif", "image/gif")), &b"GIF89a"[..])]);
    let (_, html) = send(app(), multipart_request("/analyze/image", body)).await;
    assert!(html.contains("notice warning"));
    assert!(html.contains("JPG/PNG"));
}

#[tokio::test]
async fn csv_form_renders_insights() {
    let csv = b"region,units,price\nnorth,10,2.5\nsouth,20,3.5\neast,30,4.5\n";
    let body = multipart(&[("file", Some(("sales.csv", "text/csv")), &csv[..])]);
    let (status, html) = send(app(), multipart_request("/analyze/csv", body)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("<strong>3 rows</strong> and <strong>3 columns</strong>"));
    assert!(html.contains("Key columns: region, units, price"));
    assert!(html.contains("&quot;units&quot;"));
    assert!(!html.contains("&quot;region&quot;"));
    assert!(html.contains("predictive analytics models"));
    assert!(html.contains("<td>north</td>"));
}

#[tokio::test]
async fn overlong_csv_row_is_a_request_failure() {
    let csv = b"a,b\n1,2\n3,4,5\n";
    let body = multipart(&[("file", Some(("bad.csv", "text/csv")), &csv[..])]);
    let (_, html) = send(app(), multipart_request("/analyze/csv", body)).await;
    assert!(html.contains("notice error"));
    assert!(html.contains("Error analyzing data"));
}

#[tokio::test]
async fn random_form_shows_a_listed_concept() {
    let req = Request::post("/random").body(Body::empty()).unwrap();
    let (status, html) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        RANDOM_CONCEPTS
            .iter()
            .any(|c| html.contains(c.idea) && html.contains(c.use_case))
    );
}

#[tokio::test]
async fn api_generate_round_trip() {
    let req = Request::post("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"problem": "Reduce plastic waste in oceans", "context": "sustainability"})
                .to_string(),
        ))
        .unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["context"], "sustainability");
    let idea = v["idea"].as_str().unwrap();
    assert!(idea.starts_with("Context: Sustainability."));
    assert_eq!(idea, idea.trim());
}

#[tokio::test]
async fn api_generate_rejects_blank_and_unknown_context() {
    let blank = Request::post("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"problem": ""}).to_string()))
        .unwrap();
    let (status, body) = send(app(), blank).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("\"kind\":\"validation\""));

    let unknown = Request::post("/api/generate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"problem": "x", "context": "mars"}).to_string()))
        .unwrap();
    let (status, _) = send(app(), unknown).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_image_returns_three_sorted_concepts() {
    let png = png_bytes(0);
    let body = multipart(&[("image", Some(("dark.png", "image/png")), png.as_slice())]);
    let (status, body) = send(app(), multipart_request("/api/image", body)).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    let concepts = v["concepts"].as_array().unwrap();
    assert_eq!(concepts.len(), 3);
    let probs: Vec<f64> = concepts
        .iter()
        .map(|c| c["probability"].as_f64().unwrap())
        .collect();
    assert!(probs.windows(2).all(|w| w[0] >= w[1]));
    // A black image peaks on the first vocabulary entry with the offline scorer
    assert_eq!(concepts[0]["concept"], "healthcare");
}

#[tokio::test]
async fn api_csv_counts_numeric_columns_only() {
    let req = Request::post("/api/csv")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from("name,score\nada,90\nlin,85\n"))
        .unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["row_count"], 2);
    assert_eq!(v["column_count"], 2);
    assert_eq!(v["statistics"].as_object().unwrap().len(), 1);
    assert_eq!(v["statistics"]["score"]["mean"], 87.5);
}

#[tokio::test]
async fn api_csv_failure_is_unprocessable() {
    let req = Request::post("/api/csv")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from("a,b\n1,2\n3,4,5\n"))
        .unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body.contains("data_analysis"));
}

#[tokio::test]
async fn api_random_is_seed_stable() {
    let a = send(app(), Request::get("/api/random").body(Body::empty()).unwrap()).await;
    let b = send(app(), Request::get("/api/random").body(Body::empty()).unwrap()).await;
    assert_eq!(a, b);
    let v: Value = serde_json::from_str(&a.1).unwrap();
    assert!(RANDOM_CONCEPTS.iter().any(|c| v["idea"] == c.idea));
}

#[tokio::test]
async fn api_csv_accepts_short_rows() {
    let req = Request::post("/api/csv")
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from("a,b\n1,2\n3\n"))
        .unwrap();
    let (status, body) = send(app(), req).await;
    assert_eq!(status, StatusCode::OK);
    let v: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(v["row_count"], 2);
    assert_eq!(v["statistics"]["b"]["count"], 1.0);
}
