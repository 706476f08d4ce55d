use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

use crate::error::MedicalError;
use crate::medical::{AlertNotifier, CheckOutcome, MedicalService};
use crate::patient::{BloodPressure, NewPatient};
use crate::storage::PatientRepository;

const MAX_BODY_BYTES: u64 = 16 * 1024;

#[derive(Debug, Serialize, Deserialize)]
pub struct TemperatureReading {
    pub temperature: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

pub struct RestApi<R, N> {
    service: Arc<MedicalService<R, N>>,
}

impl<R, N> RestApi<R, N>
where
    R: PatientRepository + Send + Sync + 'static,
    N: AlertNotifier + Send + Sync + 'static,
{
    pub fn new(service: Arc<MedicalService<R, N>>) -> Self {
        RestApi { service }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        // Registration and lookup first, then the two reading checks
        self.post_patient()
            .or(self.get_patient())
            .or(self.check_blood_pressure())
            .or(self.check_temperature())
    }

    fn post_patient(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let service = Arc::clone(&self.service);

        warp::path!("patients")
            .and(warp::post())
            .and(json_body::<NewPatient>())
            .map(move |patient: NewPatient| match service.register_patient(patient) {
                Ok(id) => success(
                    StatusCode::CREATED,
                    "Patient registered",
                    serde_json::json!({ "id": id }),
                ),
                Err(err) => failure(&err),
            })
    }

    fn get_patient(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let service = Arc::clone(&self.service);

        warp::path!("patients" / String)
            .and(warp::get())
            .map(move |id: String| {
                // Unknown ids become a 404 through failure()
                let record = match service.patient(&id) {
                    Ok(record) => record,
                    Err(err) => return failure(&err),
                };
                match serde_json::to_value(&record) {
                    Ok(data) => success(StatusCode::OK, "Patient found", data),
                    Err(err) => reply(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "error",
                        format!("Failed to encode patient: {}", err),
                        None,
                    ),
                }
            })
    }

    fn check_blood_pressure(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let service = Arc::clone(&self.service);

        warp::path!("patients" / String / "blood-pressure")
            .and(warp::post())
            .and(json_body::<BloodPressure>())
            .map(move |id: String, reading: BloodPressure| {
                check_reply(&id, service.check_blood_pressure(&id, reading))
            })
    }

    fn check_temperature(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let service = Arc::clone(&self.service);

        warp::path!("patients" / String / "temperature")
            .and(warp::post())
            .and(json_body::<TemperatureReading>())
            .map(move |id: String, reading: TemperatureReading| {
                check_reply(&id, service.check_temperature(&id, reading.temperature))
            })
    }
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::json())
}

fn check_reply(id: &str, result: Result<CheckOutcome, MedicalError>) -> WithStatus<Json> {
    match result {
        Ok(outcome) => {
            // A normal reading is still a successful check
            let message = if outcome.alerted() {
                "Reading outside baseline, alert sent"
            } else {
                "Reading within baseline"
            };
            success(
                StatusCode::OK,
                message,
                serde_json::json!({ "patient_id": id, "alert": outcome.alerted() }),
            )
        }
        Err(err) => failure(&err),
    }
}

fn success(status: StatusCode, message: &str, data: serde_json::Value) -> WithStatus<Json> {
    reply(status, "success", message.to_string(), Some(data))
}

fn failure(err: &MedicalError) -> WithStatus<Json> {
    let status = match err {
        MedicalError::PatientNotFound(_) => StatusCode::NOT_FOUND,
        MedicalError::InvalidRecord(_) | MedicalError::InvalidReading(_) => StatusCode::BAD_REQUEST,
        MedicalError::Storage(_) | MedicalError::InvalidThresholds(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "request failed");
    }
    reply(status, "error", err.to_string(), None)
}

fn reply(
    status: StatusCode,
    outcome: &str,
    message: String,
    data: Option<serde_json::Value>,
) -> WithStatus<Json> {
    let response = ApiResponse {
        status: outcome.to_string(),
        message,
        data,
    };
    warp::reply::with_status(warp::reply::json(&response), status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::PatientStore;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl AlertNotifier for RecordingNotifier {
        fn send(&self, message: &str) {
            self.sent.lock().unwrap().push(message.to_string());
        }
    }

    type TestApi = RestApi<PatientStore, Arc<RecordingNotifier>>;

    fn create_test_api() -> (TempDir, TestApi, Arc<RecordingNotifier>) {
        let dir = tempfile::tempdir().unwrap();
        let store = PatientStore::open(dir.path().join("patients.txt")).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let service = MedicalService::new(store, Arc::clone(&notifier));
        (dir, RestApi::new(Arc::new(service)), notifier)
    }

    fn body(response: &warp::http::Response<warp::hyper::body::Bytes>) -> Value {
        serde_json::from_slice(response.body()).unwrap()
    }

    async fn register(api: &TestApi) -> String {
        let response = warp::test::request()
            .method("POST")
            .path("/patients")
            .json(&json!({
                "first_name": "Ivan",
                "last_name": "Petrov",
                "birth_date": "1980-11-26",
                "baseline": {
                    "normal_temperature": 36.65,
                    "normal_blood_pressure": { "systolic": 120, "diastolic": 80 }
                }
            }))
            .reply(&api.routes())
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        body(&response)["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_register_and_fetch_patient() {
        let (_dir, api, _) = create_test_api();
        let id = register(&api).await;

        let response = warp::test::request()
            .method("GET")
            .path(&format!("/patients/{}", id))
            .reply(&api.routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body(&response);
        assert_eq!(body["status"], "success");
        assert_eq!(body["data"]["id"], id.as_str());
        assert_eq!(body["data"]["last_name"], "Petrov");
    }

    #[tokio::test]
    async fn test_unknown_patient_is_404() {
        let (_dir, api, notifier) = create_test_api();

        let response = warp::test::request()
            .method("POST")
            .path("/patients/nobody/temperature")
            .json(&json!({ "temperature": 41.0 }))
            .reply(&api.routes())
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&response)["status"], "error");
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blood_pressure_check_reports_alert() {
        let (_dir, api, notifier) = create_test_api();
        let id = register(&api).await;

        let response = warp::test::request()
            .method("POST")
            .path(&format!("/patients/{}/blood-pressure", id))
            .json(&json!({ "systolic": 121, "diastolic": 79 }))
            .reply(&api.routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["data"]["alert"], true);
        assert_eq!(
            *notifier.sent.lock().unwrap(),
            vec![format!("Warning, patient with id: {}, need help", id)]
        );
    }

    #[tokio::test]
    async fn test_normal_temperature_reports_no_alert() {
        let (_dir, api, notifier) = create_test_api();
        let id = register(&api).await;

        let response = warp::test::request()
            .method("POST")
            .path(&format!("/patients/{}/temperature", id))
            .json(&json!({ "temperature": 36.65 }))
            .reply(&api.routes())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body(&response)["data"]["alert"], false);
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_patient_is_400() {
        let (_dir, api, _) = create_test_api();

        let response = warp::test::request()
            .method("POST")
            .path("/patients")
            .json(&json!({
                "first_name": "",
                "last_name": "Petrov",
                "birth_date": "1980-11-26",
                "baseline": {
                    "normal_temperature": 36.6,
                    "normal_blood_pressure": { "systolic": 120, "diastolic": 80 }
                }
            }))
            .reply(&api.routes())
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body(&response)["status"], "error");
    }
}
