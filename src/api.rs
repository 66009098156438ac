use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::analytics::{self, SortOrder};
use crate::config::GradingConfig;
use crate::data::{self, ExportFormat};
use crate::database::{Database, NewStudent, NewSubject};
use crate::error::{Error, Result};
use crate::model::{PredictionResult, TrendPredictor, XSource};

#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    search: String,
}

#[derive(Deserialize)]
pub struct StudentQuery {
    #[serde(default)]
    search: String,
    #[serde(default)]
    sort: SortOrder,
}

#[derive(Deserialize)]
pub struct PredictQuery {
    #[serde(default)]
    x: XSource,
}

#[derive(Serialize)]
struct PredictResponse {
    student_id: i64,
    #[serde(flatten)]
    result: PredictionResult,
}

fn checked_subject(subject: NewSubject, grading: &GradingConfig) -> Result<NewSubject> {
    if subject.subject.trim().is_empty() {
        return Err(Error::Validation("Subject name required!".to_string()));
    }
    grading.validate_grade(subject.grade)?;
    Ok(subject)
}

// Student list with class-wide averages
async fn list_students(
    query: web::Query<ListQuery>,
    db: web::Data<Database>,
    grading: web::Data<GradingConfig>,
) -> Result<HttpResponse> {
    let students = db.list_students(&query.search).await?;
    let mut summaries = Vec::with_capacity(students.len());
    for student in students {
        let subjects = db.subjects_for(student.id).await?;
        summaries.push(analytics::summarize_student(student, &subjects, &grading));
    }
    Ok(HttpResponse::Ok().json(analytics::class_overview(summaries, query.search.trim())))
}

async fn add_student(
    body: web::Json<NewStudent>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let student = db.insert_student(&body).await?;
    Ok(HttpResponse::Created().json(student))
}

async fn edit_student(
    path: web::Path<i64>,
    body: web::Json<NewStudent>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let student = db.update_student(path.into_inner(), &body).await?;
    Ok(HttpResponse::Ok().json(student))
}

async fn delete_student(path: web::Path<i64>, db: web::Data<Database>) -> Result<HttpResponse> {
    db.delete_student(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// Detail view: subjects, average and the grade needed to reach the target
async fn student_page(
    path: web::Path<i64>,
    query: web::Query<StudentQuery>,
    db: web::Data<Database>,
    grading: web::Data<GradingConfig>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let student = db.get_student(id).await?;
    let subjects = db.search_subjects(id, &query.search).await?;
    let report = analytics::student_report(student, subjects, query.search.trim(), query.sort, &grading);
    Ok(HttpResponse::Ok().json(report))
}

async fn add_subject(
    path: web::Path<i64>,
    body: web::Json<NewSubject>,
    db: web::Data<Database>,
    grading: web::Data<GradingConfig>,
) -> Result<HttpResponse> {
    let student_id = path.into_inner();
    db.get_student(student_id).await?;
    let subject = checked_subject(body.into_inner(), &grading)?;
    let created = db.insert_subject(student_id, &subject).await?;
    Ok(HttpResponse::Created().json(created))
}

async fn edit_subject(
    path: web::Path<(i64, i64)>,
    body: web::Json<NewSubject>,
    db: web::Data<Database>,
    grading: web::Data<GradingConfig>,
) -> Result<HttpResponse> {
    let (student_id, subject_id) = path.into_inner();
    let subject = checked_subject(body.into_inner(), &grading)?;
    db.update_subject(student_id, subject_id, &subject).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn delete_subject(path: web::Path<(i64, i64)>, db: web::Data<Database>) -> Result<HttpResponse> {
    let (student_id, subject_id) = path.into_inner();
    db.delete_subject(student_id, subject_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

// Next-grade prediction from the student's history
async fn predict(
    path: web::Path<i64>,
    query: web::Query<PredictQuery>,
    db: web::Data<Database>,
    grading: web::Data<GradingConfig>,
) -> Result<HttpResponse> {
    let student_id = path.into_inner();
    let subjects = db.subjects_for(student_id).await?;
    let history = data::history_from_subjects(&subjects, query.x);
    let result = TrendPredictor::new(**grading).predict(&history);

    Ok(HttpResponse::Ok().json(PredictResponse { student_id, result }))
}

async fn export_student(
    path: web::Path<(i64, String)>,
    db: web::Data<Database>,
) -> Result<HttpResponse> {
    let (student_id, fmt) = path.into_inner();
    let format: ExportFormat = fmt.parse()?;
    let student = db.get_student(student_id).await?;
    let subjects = db.subjects_for(student_id).await?;
    let export = data::export_sheet(&student, &subjects, format)?;

    Ok(HttpResponse::Ok()
        .content_type(export.mime_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(export.file_name)],
        })
        .body(export.body))
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().body("Grade Tracker is running!")
}

async fn serve_homepage() -> HttpResponse {
    HttpResponse::Ok().content_type("text/html").body(HOMEPAGE)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(serve_homepage))
        .route("/health", web::get().to(health_check))
        .route("/students", web::get().to(list_students))
        .route("/students", web::post().to(add_student))
        .route("/students/{id}", web::get().to(student_page))
        .route("/students/{id}", web::put().to(edit_student))
        .route("/students/{id}", web::delete().to(delete_student))
        .route("/students/{id}/subjects", web::post().to(add_subject))
        .route("/students/{id}/subjects/{subject_id}", web::put().to(edit_subject))
        .route("/students/{id}/subjects/{subject_id}", web::delete().to(delete_subject))
        .route("/predict/{id}", web::get().to(predict))
        .route("/export/{id}/{fmt}", web::get().to(export_student));
}

const HOMEPAGE: &str = r#"
<!DOCTYPE html>
<html>
<head>
    <title>Grade Tracker</title>
    <style>
        body { font-family: Arial, sans-serif; max-width: 900px; margin: 40px auto; padding: 20px; }
        .container { background: #f5f5f5; padding: 25px; border-radius: 10px; }
        input { padding: 8px; border: 1px solid #ddd; border-radius: 4px; margin: 4px; }
        button { background: #007bff; color: white; padding: 8px 16px; border: none; border-radius: 4px; cursor: pointer; margin: 4px; }
        table { width: 100%; border-collapse: collapse; margin: 15px 0; }
        th, td { padding: 8px; text-align: left; border-bottom: 1px solid #ddd; }
        th { background: #f2f2f2; }
        .fail { color: #dc3545; font-weight: bold; }
        .panel { background: white; padding: 15px; border-radius: 8px; margin: 15px 0; display: none; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Grade Tracker</h1>
        <div>
            <input id="search" placeholder="Search by name or city">
            <button onclick="loadStudents()">Search</button>
        </div>
        <div>
            <input id="name" placeholder="Name">
            <input id="index" placeholder="Index">
            <input id="city" placeholder="City">
            <button onclick="addStudent()">Add student</button>
        </div>
        <p id="summary"></p>
        <table>
            <thead><tr><th>Name</th><th>Index</th><th>City</th><th>Subjects</th><th>Average</th><th></th></tr></thead>
            <tbody id="students"></tbody>
        </table>

        <div id="detail" class="panel">
            <h3 id="detail-title"></h3>
            <p id="detail-stats"></p>
            <p id="detail-prediction"></p>
            <div>
                <input id="subject" placeholder="Subject">
                <input id="grade" type="number" step="0.5" placeholder="Grade">
                <button onclick="addSubject()">Add grade</button>
            </div>
            <table>
                <thead><tr><th>Subject</th><th>Grade</th><th>Date Added</th></tr></thead>
                <tbody id="subjects"></tbody>
            </table>
            <p id="exports"></p>
        </div>
    </div>

    <script>
        let current = null;

        async function loadStudents() {
            const search = encodeURIComponent(document.getElementById('search').value);
            const data = await (await fetch('/students?search=' + search)).json();
            document.getElementById('summary').innerHTML =
                `Class average: <strong>${data.avg_all}</strong> | Highest: ${data.highest_avg_student.name} (${data.highest_avg_student.avg})` +
                ` | Lowest: ${data.lowest_avg_student.name} (${data.lowest_avg_student.avg})`;
            document.getElementById('students').innerHTML = data.students.map(s => `
                <tr>
                    <td class="${s.has_fail ? 'fail' : ''}">${s.name}</td>
                    <td>${s.index}</td><td>${s.city}</td>
                    <td>${s.subjects_count}</td><td>${s.avg}</td>
                    <td><button onclick="showStudent(${s.id})">Open</button>
                        <button onclick="deleteStudent(${s.id})" style="background:#dc3545">Delete</button></td>
                </tr>`).join('');
        }

        async function addStudent() {
            const body = {
                name: document.getElementById('name').value,
                index: document.getElementById('index').value,
                city: document.getElementById('city').value,
            };
            const response = await fetch('/students', {
                method: 'POST', headers: {'Content-Type': 'application/json'}, body: JSON.stringify(body)
            });
            if (!response.ok) { alert(await response.text()); return; }
            loadStudents();
        }

        async function deleteStudent(id) {
            await fetch('/students/' + id, { method: 'DELETE' });
            loadStudents();
        }

        async function showStudent(id) {
            current = id;
            const data = await (await fetch('/students/' + id)).json();
            const prediction = await (await fetch('/predict/' + id)).json();
            document.getElementById('detail').style.display = 'block';
            document.getElementById('detail-title').textContent = data.student.name;
            document.getElementById('detail-stats').innerHTML =
                `Average: <strong>${data.avg}</strong> | Target: ${data.target_avg} | ` +
                `Needed next: ${data.required_grade === null ? 'not reachable with one grade' : data.required_grade} | ` +
                `Weak subjects: ${data.weak_subjects.map(s => s.subject).join(', ') || '-'}`;
            document.getElementById('detail-prediction').textContent =
                `Predicted next grade: ${prediction.prediction ?? '-'} (${prediction.explanation})`;
            document.getElementById('subjects').innerHTML = data.subjects.map(s =>
                `<tr><td>${s.subject}</td><td>${s.grade}</td><td>${s.date_added}</td></tr>`).join('');
            document.getElementById('exports').innerHTML =
                `<a href="/export/${id}/csv">CSV</a> | <a href="/export/${id}/xlsx">XLSX</a> | ` +
                `<a href="/export/${id}/pdf">PDF</a> | <a href="/export/${id}/json">JSON</a>`;
        }

        async function addSubject() {
            const body = {
                subject: document.getElementById('subject').value,
                grade: parseFloat(document.getElementById('grade').value),
            };
            const response = await fetch('/students/' + current + '/subjects', {
                method: 'POST', headers: {'Content-Type': 'application/json'}, body: JSON.stringify(body)
            });
            if (!response.ok) { alert(await response.text()); return; }
            showStudent(current);
            loadStudents();
        }

        loadStudents();
    </script>
</body>
</html>
"#;
