use actix_web::{guard, web, HttpRequest, HttpResponse};
use database::{
    database::request_manager::{CreatePersonOutcome, GetPersonOutcome, RequestManager},
    model::filter::PersonFilter,
    validation::{parse_request, CreatePersonRequest, ListPersonsRequest, PersonIdPath},
};
use futures_util::StreamExt;

use crate::{
    errors::{ApiError, ApiResult, ErrorTranslator},
    response::{
        DataResponse, HealthResponse, ListResponse, MessageResponse, RejectedResponse,
    },
};

/// Request bodies larger than this are refused before they are decoded
pub const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Registers every route. Resources are guarded by method so a mismatch falls
/// through to the next resource and finally to [`not_found`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").guard(get_or_head()).to(health))
        .service(
            web::resource("/person/list")
                .guard(guard::Post())
                .to(get_persons_list),
        )
        .service(
            web::resource("/person/{id}")
                .guard(get_or_head())
                .to(get_person_by_id),
        )
        .service(web::resource("/person").guard(guard::Post()).to(create_person));
}

fn get_or_head() -> impl guard::Guard {
    guard::Any(guard::Get()).or(guard::Head())
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse::now())
}

pub async fn not_found(req: HttpRequest) -> HttpResponse {
    log::warn!("Route not found: {} {}", req.method(), req.uri());

    HttpResponse::NotFound().json(MessageResponse::failure("Route not found"))
}

/// Collects the request body, giving up as soon as it grows past [`BODY_LIMIT`]
async fn read_body(mut payload: web::Payload) -> ApiResult<web::BytesMut> {
    let mut body = web::BytesMut::new();

    while let Some(chunk) = payload.next().await {
        let chunk = chunk?;

        if body.len() + chunk.len() > BODY_LIMIT {
            return Err(ApiError::BodyTooLarge { limit: BODY_LIMIT });
        }

        body.extend_from_slice(&chunk);
    }

    Ok(body)
}

async fn get_person_by_id(
    req: HttpRequest,
    path: web::Path<PersonIdPath>,
    request_manager: web::Data<RequestManager>,
    translator: web::Data<ErrorTranslator>,
) -> HttpResponse {
    let result = try_get_person_by_id(&path, &request_manager).await;

    translator.respond(&req, result)
}

async fn try_get_person_by_id(
    path: &PersonIdPath,
    request_manager: &RequestManager,
) -> ApiResult<HttpResponse> {
    let id = path.person_id()?;

    let response = match request_manager.get_person_by_id(id).await? {
        GetPersonOutcome::Found(person) => HttpResponse::Ok().json(DataResponse::new(person)),
        GetPersonOutcome::NotFound => {
            HttpResponse::NotFound().json(MessageResponse::failure("Person not found"))
        }
    };

    Ok(response)
}

async fn get_persons_list(
    req: HttpRequest,
    payload: web::Payload,
    request_manager: web::Data<RequestManager>,
    translator: web::Data<ErrorTranslator>,
) -> HttpResponse {
    let result = try_get_persons_list(payload, &request_manager).await;

    translator.respond(&req, result)
}

async fn try_get_persons_list(
    payload: web::Payload,
    request_manager: &RequestManager,
) -> ApiResult<HttpResponse> {
    let body = read_body(payload).await?;
    let request: ListPersonsRequest = parse_request(&body)?;

    let list = request_manager
        .get_persons_list(PersonFilter::from(request))
        .await?;

    Ok(HttpResponse::Ok().json(ListResponse::new(list.data, list.count)))
}

async fn create_person(
    req: HttpRequest,
    payload: web::Payload,
    request_manager: web::Data<RequestManager>,
    translator: web::Data<ErrorTranslator>,
) -> HttpResponse {
    let result = try_create_person(payload, &request_manager).await;

    translator.respond(&req, result)
}

async fn try_create_person(
    payload: web::Payload,
    request_manager: &RequestManager,
) -> ApiResult<HttpResponse> {
    let body = read_body(payload).await?;
    let request: CreatePersonRequest = parse_request(&body)?;

    let response = match request_manager
        .create_person(request.into_new_person())
        .await?
    {
        CreatePersonOutcome::Created(person) => {
            HttpResponse::Created().json(DataResponse::new(person))
        }
        CreatePersonOutcome::NotCreated { reason, message } => {
            HttpResponse::BadRequest().json(RejectedResponse::new(message, reason))
        }
    };

    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{
        http::{header::ContentType, Method, StatusCode},
        middleware, test, App,
    };
    use async_trait::async_trait;
    use database::{
        consts::consts::PersonId,
        model::{
            filter::PersonFilter,
            person::{NewPerson, Person},
        },
        persistence::storage::{
            memory::MemoryStorage, PersonStorage, StorageError, StorageResult,
        },
    };
    use serde_json::{json, Value};

    use super::*;
    use crate::errors::RunMode;

    async fn send(
        storage: Arc<dyn PersonStorage>,
        run_mode: RunMode,
        request: test::TestRequest,
    ) -> (StatusCode, Value) {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(RequestManager::new(storage)))
                .app_data(web::Data::new(ErrorTranslator::new(run_mode)))
                .configure(configure)
                .default_service(web::to(not_found))
                .wrap(middleware::NormalizePath::trim()),
        )
        .await;

        let response = test::call_service(&app, request.to_request()).await;
        let status = response.status();
        let body: Value = test::read_body_json(response).await;

        (status, body)
    }

    /// Sends against the seeded storage: 1 Mickey Mouse, 2 Minnie Mouse, 3 Donald Duck
    async fn send_seeded(request: test::TestRequest) -> (StatusCode, Value) {
        send(
            Arc::new(MemoryStorage::new_test()),
            RunMode::Production,
            request,
        )
        .await
    }

    fn list(body: Value) -> test::TestRequest {
        test::TestRequest::post().uri("/person/list").set_json(body)
    }

    fn create(body: Value) -> test::TestRequest {
        test::TestRequest::post().uri("/person").set_json(body)
    }

    /// Fails every call with the error built by the wrapped constructor
    struct FailingStorage(fn() -> StorageError);

    #[async_trait]
    impl PersonStorage for FailingStorage {
        async fn find_by_id(&self, _: PersonId) -> StorageResult<Option<Person>> {
            Err((self.0)())
        }

        async fn find_filtered(&self, _: &PersonFilter) -> StorageResult<Vec<Person>> {
            Err((self.0)())
        }

        async fn find_by_name(&self, _: &str, _: &str) -> StorageResult<Option<Person>> {
            Err((self.0)())
        }

        async fn insert(&self, _: &NewPerson) -> StorageResult<Person> {
            Err((self.0)())
        }
    }

    mod general {
        use super::*;

        #[test_log::test(actix_web::test)]
        async fn health_check() {
            let (status, body) = send_seeded(test::TestRequest::get().uri("/health")).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["message"], "API is running");
            assert!(body["timestamp"].is_string());
        }

        #[test_log::test(actix_web::test)]
        async fn health_check_does_not_touch_the_store() {
            let storage = Arc::new(FailingStorage(|| {
                StorageError::Unavailable(anyhow::anyhow!("connection refused"))
            }));

            let (status, body) = send(
                storage,
                RunMode::Production,
                test::TestRequest::get().uri("/health"),
            )
            .await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
        }

        #[test_log::test(actix_web::test)]
        async fn head_is_answered_like_get() {
            for uri in ["/health", "/person/1"] {
                let request = test::TestRequest::default().method(Method::HEAD).uri(uri);

                let (status, _) = send_seeded(request).await;

                assert_eq!(status, StatusCode::OK, "{uri}");
            }
        }

        #[test_log::test(actix_web::test)]
        async fn unknown_routes_are_not_found() {
            for request in [
                test::TestRequest::get().uri("/unknown-route"),
                test::TestRequest::delete().uri("/person/1"),
                test::TestRequest::post().uri("/health"),
            ] {
                let (status, body) = send_seeded(request).await;

                assert_eq!(status, StatusCode::NOT_FOUND);
                assert_eq!(body["success"], false);
                assert_eq!(body["message"], "Route not found");
            }
        }
    }

    mod get_person_by_id {
        use super::*;
        use rstest::rstest;

        #[test_log::test(actix_web::test)]
        async fn returns_person_by_valid_id() {
            let (status, body) = send_seeded(test::TestRequest::get().uri("/person/1")).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["data"]["id"], 1);
            assert_eq!(body["data"]["firstName"], "Mickey");
            assert_eq!(body["data"]["lastName"], "Mouse");
        }

        #[test_log::test(actix_web::test)]
        async fn missing_person_is_not_found() {
            let (status, body) = send_seeded(test::TestRequest::get().uri("/person/999")).await;

            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Person not found");
        }

        #[rstest]
        #[case("/person/invalid", "\"id\" must be a number")]
        #[case("/person/-1", "\"id\" must be a positive number")]
        #[case("/person/0", "\"id\" must be a positive number")]
        #[case("/person/1.5", "\"id\" must be an integer")]
        #[actix_web::test]
        async fn invalid_ids_are_rejected(#[case] uri: &str, #[case] message: &str) {
            let (status, body) = send_seeded(test::TestRequest::get().uri(uri)).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["success"], false);
            assert_eq!(body["message"], "Validation error");
            assert_eq!(body["errors"], json!([message]));
        }

        #[test_log::test(actix_web::test)]
        async fn get_on_list_path_is_an_invalid_id() {
            let (status, body) = send_seeded(test::TestRequest::get().uri("/person/list")).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["errors"], json!(["\"id\" must be a number"]));
        }
    }

    mod get_persons_list {
        use super::*;

        #[test_log::test(actix_web::test)]
        async fn filters_by_first_name() {
            let (status, body) = send_seeded(list(json!({ "firstName": "Mickey" }))).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["count"], 1);
            assert_eq!(body["data"][0]["firstName"], "Mickey");
        }

        #[test_log::test(actix_web::test)]
        async fn filters_by_last_name() {
            let (status, body) = send_seeded(list(json!({ "lastName": "Mouse" }))).await;

            assert_eq!(status, StatusCode::OK);
            let data = body["data"].as_array().unwrap();
            assert_eq!(data.len(), 2);
            assert!(data.iter().all(|person| person["lastName"] == "Mouse"));
        }

        #[test_log::test(actix_web::test)]
        async fn both_fields_must_match_and_results_are_ordered_by_id() {
            let (_, body) =
                send_seeded(list(json!({ "firstName": "Donald", "lastName": "Duck" }))).await;

            assert_eq!(body["count"], 1);
            assert_eq!(body["data"][0]["id"], 3);

            let (_, body) =
                send_seeded(list(json!({ "firstName": "i", "lastName": "mouse" }))).await;

            let ids: Vec<i64> = body["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|person| person["id"].as_i64().unwrap())
                .collect();
            assert_eq!(ids, vec![1, 2]);
        }

        #[test_log::test(actix_web::test)]
        async fn matching_is_case_insensitive_substring() {
            for needle in ["mic", "MIC", "Mickey"] {
                let (status, body) = send_seeded(list(json!({ "firstName": needle }))).await;

                assert_eq!(status, StatusCode::OK);
                assert_eq!(body["data"][0]["firstName"], "Mickey", "{needle}");
            }
        }

        #[test_log::test(actix_web::test)]
        async fn no_match_returns_empty_list() {
            let (status, body) = send_seeded(list(json!({ "firstName": "NonExistent" }))).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["data"], json!([]));
            assert_eq!(body["count"], 0);
        }

        #[test_log::test(actix_web::test)]
        async fn empty_filter_is_rejected() {
            for filter in [json!({}), json!({ "firstName": "" })] {
                let (status, body) = send_seeded(list(filter)).await;

                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body["success"], false);
                assert_eq!(body["message"], "Validation error");
            }
        }

        #[test_log::test(actix_web::test)]
        async fn malformed_json_is_rejected() {
            let request = test::TestRequest::post()
                .uri("/person/list")
                .insert_header(ContentType::json())
                .set_payload("{\"firstName\":");

            let (status, body) = send_seeded(request).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["errors"], json!(["\"value\" must be valid JSON"]));
        }
    }

    mod create_person {
        use super::*;

        #[test_log::test(actix_web::test)]
        async fn creates_a_new_person() {
            let storage = Arc::new(MemoryStorage::new_test());

            let (status, body) = send(
                storage.clone(),
                RunMode::Production,
                create(json!({ "firstName": "TestUser", "lastName": "UniqueLastName" })),
            )
            .await;

            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["success"], true);
            assert_eq!(body["data"]["firstName"], "TestUser");
            assert_eq!(body["data"]["lastName"], "UniqueLastName");
            assert!(body["data"]["createdAt"].is_string());

            // And the record can be read back unchanged
            let uri = format!("/person/{}", body["data"]["id"]);
            let (status, fetched) =
                send(storage, RunMode::Production, test::TestRequest::get().uri(&uri)).await;

            assert_eq!(status, StatusCode::OK);
            assert_eq!(fetched["data"], body["data"]);
        }

        #[test_log::test(actix_web::test)]
        async fn duplicate_name_is_rejected_without_insert() {
            let storage = Arc::new(MemoryStorage::new_test());

            for (first_name, last_name) in [("Mickey", "Mouse"), ("mickey", "MOUSE")] {
                let (status, body) = send(
                    storage.clone(),
                    RunMode::Production,
                    create(json!({ "firstName": first_name, "lastName": last_name })),
                )
                .await;

                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(body["success"], false);
                assert_eq!(body["reason"], "DUPLICATE_NAME");
                assert_eq!(body["message"], "A person with this name already exists");
            }

            assert_eq!(storage.len().await, 3);
        }

        #[test_log::test(actix_web::test)]
        async fn names_are_trimmed() {
            let request = create(json!({ "firstName": "  Jane  ", "lastName": "  Smith  " }));

            let (status, body) = send_seeded(request).await;

            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["data"]["firstName"], "Jane");
            assert_eq!(body["data"]["lastName"], "Smith");
        }

        #[test_log::test(actix_web::test)]
        async fn trailing_slash_is_ignored() {
            let request = test::TestRequest::post()
                .uri("/person/")
                .set_json(json!({ "firstName": "Jane", "lastName": "Doe" }));

            let (status, _) = send_seeded(request).await;

            assert_eq!(status, StatusCode::CREATED);
        }

        #[test_log::test(actix_web::test)]
        async fn invalid_bodies_are_rejected() {
            for body in [
                json!({ "lastName": "Doe" }),
                json!({ "firstName": "John" }),
                json!({ "firstName": "", "lastName": "Doe" }),
                json!({ "firstName": "a".repeat(101), "lastName": "Doe" }),
                json!({ "firstName": "John", "lastName": "a".repeat(101) }),
                json!(["John", "Doe"]),
            ] {
                let (status, response) = send_seeded(create(body.clone())).await;

                assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
                assert_eq!(response["success"], false);
                assert_eq!(response["message"], "Validation error");
            }
        }

        #[test_log::test(actix_web::test)]
        async fn hundred_character_name_is_accepted() {
            let request = create(json!({ "firstName": "a".repeat(100), "lastName": "Doe" }));

            let (status, body) = send_seeded(request).await;

            assert_eq!(status, StatusCode::CREATED);
            assert_eq!(body["data"]["firstName"].as_str().unwrap().len(), 100);
        }

        #[test_log::test(actix_web::test)]
        async fn unknown_keys_are_rejected() {
            let request = create(json!({ "firstName": "Jane", "lastName": "Doe", "age": 30 }));

            let (status, body) = send_seeded(request).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Validation error");
            assert!(body["errors"][0].as_str().unwrap().contains("age"));
        }

        #[test_log::test(actix_web::test)]
        async fn oversized_body_is_rejected_with_an_envelope() {
            for run_mode in [RunMode::Production, RunMode::Development] {
                let request = test::TestRequest::post()
                    .uri("/person/list")
                    .insert_header(ContentType::json())
                    .set_payload(vec![b'a'; BODY_LIMIT + 1]);

                let (status, body) =
                    send(Arc::new(MemoryStorage::new_test()), run_mode, request).await;

                assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
                assert_eq!(body["success"], false);
                assert!(body["message"].is_string());
            }
        }

        #[test_log::test(actix_web::test)]
        async fn empty_body_reports_both_fields() {
            let request = test::TestRequest::post().uri("/person");

            let (status, body) = send_seeded(request).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(
                body["errors"],
                json!(["\"firstName\" is required", "\"lastName\" is required"])
            );
        }
    }

    mod storage_failures {
        use super::*;

        #[test_log::test(actix_web::test)]
        async fn unreachable_store_is_service_unavailable() {
            let storage = Arc::new(FailingStorage(|| {
                StorageError::Unavailable(anyhow::Error::new(std::io::Error::from(
                    std::io::ErrorKind::ConnectionRefused,
                )))
            }));

            let (status, body) = send(
                storage,
                RunMode::Production,
                test::TestRequest::get().uri("/person/1"),
            )
            .await;

            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(body["success"], false);
            assert_eq!(
                body["message"],
                "Database connection error. Please try again later."
            );
        }

        #[test_log::test(actix_web::test)]
        async fn constraint_violation_is_bad_request() {
            let storage = Arc::new(FailingStorage(|| {
                StorageError::ConstraintViolation(anyhow::anyhow!("duplicate key value"))
            }));

            let (status, body) = send(
                storage,
                RunMode::Production,
                create(json!({ "firstName": "Jane", "lastName": "Doe" })),
            )
            .await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Database constraint violation");
        }

        #[test_log::test(actix_web::test)]
        async fn validation_runs_before_the_store_is_touched() {
            let storage = Arc::new(FailingStorage(|| {
                StorageError::Unavailable(anyhow::anyhow!("connection refused"))
            }));

            let (status, body) = send(storage, RunMode::Production, list(json!({}))).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(body["message"], "Validation error");
        }

        #[test_log::test(actix_web::test)]
        async fn unclassified_failure_detail_depends_on_run_mode() {
            let make =
                || StorageError::Query(anyhow::anyhow!("column \"first_name\" does not exist"));

            let (status, body) = send(
                Arc::new(FailingStorage(make)),
                RunMode::Production,
                list(json!({ "firstName": "mic" })),
            )
            .await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body["message"], "Internal server error");
            assert!(body.get("stack").is_none());

            let (status, body) = send(
                Arc::new(FailingStorage(make)),
                RunMode::Development,
                list(json!({ "firstName": "mic" })),
            )
            .await;

            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(body["message"]
                .as_str()
                .unwrap()
                .contains("column \"first_name\" does not exist"));
            assert!(body["stack"].is_string());
        }
    }
}
