use actix_web::{http::StatusCode, test, web, App};
use grade_tracker::database::Database;
use grade_tracker::{api, GradingConfig};
use serde_json::{json, Value};

macro_rules! app {
    () => {{
        let db = Database::in_memory().await.unwrap();
        test::init_service(
            App::new()
                .app_data(web::Data::new(db))
                .app_data(web::Data::new(GradingConfig::default()))
                .configure(api::configure),
        )
        .await
    }};
}

macro_rules! create_student {
    ($app:expr, $body:expr) => {{
        let req = test::TestRequest::post().uri("/students").set_json($body).to_request();
        let created: Value = test::call_and_read_body_json(&$app, req).await;
        created["id"].as_i64().unwrap()
    }};
}

macro_rules! add_grade {
    ($app:expr, $id:expr, $subject:expr, $grade:expr) => {{
        let req = test::TestRequest::post()
            .uri(&format!("/students/{}/subjects", $id))
            .set_json(json!({"subject": $subject, "grade": $grade}))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }};
}

#[actix_web::test]
async fn health_and_homepage() {
    let app = app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert!(resp.status().is_success());
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn student_flow() {
    let app = app!();

    let req = test::TestRequest::post()
        .uri("/students")
        .set_json(json!({"name": "Ana", "index": "101", "city": "Skopje"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_i64().unwrap();

    for (subject, grade) in [("Math", 6.0), ("Physics", 7.0), ("History", 8.0)] {
        let req = test::TestRequest::post()
            .uri(&format!("/students/{}/subjects", id))
            .set_json(json!({"subject": subject, "grade": grade}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get().uri(&format!("/students/{}?sort=asc", id)).to_request();
    let report: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(report["avg"], 7.0);
    // 8 * 4 - 21 = 11, out of reach
    assert!(report["required_grade"].is_null());
    assert_eq!(report["subjects"][0]["subject"], "Math");
    assert_eq!(report["weak_subjects"].as_array().unwrap().len(), 1);

    let req = test::TestRequest::get().uri(&format!("/predict/{}?x=ordinal", id)).to_request();
    let prediction: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(prediction["student_id"], id);
    assert_eq!(prediction["prediction"], 9.0);
    assert_eq!(prediction["baseline_average"], 7.0);

    let req = test::TestRequest::get().uri("/students?search=skop").to_request();
    let overview: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(overview["students"][0]["name"], "Ana");
    assert_eq!(overview["students"][0]["subjects_count"], 3);
    assert_eq!(overview["highest_avg_student"]["name"], "Ana");
}

#[actix_web::test]
async fn invalid_grade_is_rejected() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/students")
        .set_json(json!({"name": "Marko"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/students/{}/subjects", id))
        .set_json(json!({"subject": "Math", "grade": 11.0}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = test::read_body(resp).await;
    assert_eq!(body, "Error: Grade must be 6-10");
}

#[actix_web::test]
async fn blank_student_name_is_rejected() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/students")
        .set_json(json!({"name": "  "}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_student_is_not_found() {
    let app = app!();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/students/99").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = test::call_service(&app, test::TestRequest::get().uri("/export/99/csv").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn predict_without_grades_has_no_data() {
    let app = app!();
    let req = test::TestRequest::get().uri("/predict/5").to_request();
    let prediction: Value = test::call_and_read_body_json(&app, req).await;
    assert!(prediction["prediction"].is_null());
    assert!(prediction["baseline_average"].is_null());
    assert_eq!(prediction["explanation"], "no data");
}

#[actix_web::test]
async fn export_formats() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/students")
        .set_json(json!({"name": "Ana"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_i64().unwrap();

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/export/{}/csv", id)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp.headers().get("content-disposition").unwrap().to_str().unwrap().to_string();
    assert!(disposition.contains("Ana_subjects.csv"));
    let body = test::read_body(resp).await;
    assert_eq!(body, "Subject,Grade,Date Added\n");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/export/{}/xlsx", id)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"PK"));

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/export/{}/pdf", id)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers().get("content-type").unwrap(), "application/pdf");
    let disposition = resp.headers().get("content-disposition").unwrap().to_str().unwrap().to_string();
    assert!(disposition.contains("Ana_subjects.pdf"));
    let body = test::read_body(resp).await;
    assert!(body.starts_with(b"%PDF"));

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/export/{}/docx", id)).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn search_ignores_case_of_cyrillic_text() {
    let app = app!();
    let ana = create_student!(app, json!({"name": "Ана", "city": "Скопје"}));
    create_student!(app, json!({"name": "Марко", "city": "Битола"}));
    add_grade!(app, ana, "Математика", 9.0);
    add_grade!(app, ana, "Историја", 7.0);

    for term in ["ана", "Ана", "скопје"] {
        let uri = format!("/students?search={}", urlencode(term));
        let overview: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        let students = overview["students"].as_array().unwrap();
        assert_eq!(students.len(), 1, "search {}", term);
        assert_eq!(students[0]["name"], "Ана");
    }

    let uri = format!("/students/{}?search={}", ana, urlencode("математика"));
    let report: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    let subjects = report["subjects"].as_array().unwrap();
    assert_eq!(subjects.len(), 1);
    assert_eq!(subjects[0]["subject"], "Математика");
}

#[actix_web::test]
async fn search_wildcards_match_literally() {
    let app = app!();
    let ana = create_student!(app, json!({"name": "Ana", "city": "Skopje"}));
    create_student!(app, json!({"name": "Marko_B", "city": "Bitola"}));
    add_grade!(app, ana, "Math", 9.0);

    let overview: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/students?search=_").to_request(),
    )
    .await;
    let students = overview["students"].as_array().unwrap();
    assert_eq!(students.len(), 1);
    assert_eq!(students[0]["name"], "Marko_B");

    let overview: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri("/students?search=%25").to_request(),
    )
    .await;
    assert!(overview["students"].as_array().unwrap().is_empty());

    let uri = format!("/students/{}?search=M_th", ana);
    let report: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert!(report["subjects"].as_array().unwrap().is_empty());
}

#[actix_web::test]
async fn required_grade_is_rounded_in_report() {
    let app = app!();
    let id = create_student!(app, json!({"name": "Iva"}));
    add_grade!(app, id, "Math", 7.3);
    add_grade!(app, id, "Art", 8.1);

    let report: Value = test::call_and_read_body_json(
        &app,
        test::TestRequest::get().uri(&format!("/students/{}", id)).to_request(),
    )
    .await;
    assert_eq!(report["required_grade"], 8.6);
}

fn urlencode(term: &str) -> String {
    term.bytes().map(|b| format!("%{:02X}", b)).collect()
}

#[actix_web::test]
async fn deleting_student_and_subject() {
    let app = app!();
    let req = test::TestRequest::post()
        .uri("/students")
        .set_json(json!({"name": "Iva"}))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let id = created["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri(&format!("/students/{}/subjects", id))
        .set_json(json!({"subject": "Art", "grade": 9.0}))
        .to_request();
    let subject: Value = test::call_and_read_body_json(&app, req).await;
    let subject_id = subject["id"].as_i64().unwrap();

    let uri = format!("/students/{}/subjects/{}", id, subject_id);
    let resp = test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let uri = format!("/students/{}", id);
    let resp = test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
