use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{FromRef, FromRequest, FromRequestParts, Path, Request, State},
    http::{self, HeaderMap, HeaderName, HeaderValue, Method, request::Parts},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use platform_api::{ApiError, ApiResult, Envelope};
use platform_authn::CsrfToken;
use products_hr::{
    AccessGate, Caller, Directory, EmployeePatch, HrPatch, NewEmployee, NewHoliday, NewHr,
    NewLeave, NewProjectManager, ProjectManagerPatch,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use time::Duration as TimeDuration;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{config::AppConfig, graphql::SchemaType};

const SESSION_COOKIE: &str = "hr_session";
const CSRF_COOKIE: &str = "csrftoken";
const CSRF_HEADER: &str = "x-csrftoken";

#[derive(Clone)]
pub struct AppState {
    pub directory: Directory,
    pub gate: AccessGate,
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.config.cookie_key.clone()
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "hr server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    let cors = CorsLayer::new()
        .allow_headers([
            http::header::CONTENT_TYPE,
            HeaderName::from_static(CSRF_HEADER),
        ])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(allow_origin);
    // Credentialed CORS cannot be combined with a wildcard origin.
    if origins.is_empty() {
        cors
    } else {
        cors.allow_credentials(true)
    }
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .route("/set-csrf-token", get(csrf_token_handler))
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/logout", post(logout_handler))
        .route("/hr/update", put(update_own_hr_handler))
        .route("/hrs", get(list_hrs_handler))
        .route(
            "/hr/{username}",
            get(get_hr_handler).delete(delete_hr_handler),
        )
        .route("/employees", get(list_employees_handler))
        .route("/employees/create", post(create_employee_handler))
        .route(
            "/employees/{username}",
            get(get_employee_handler)
                .put(update_employee_handler)
                .delete(delete_employee_handler),
        )
        .route("/employees/{username}/leaves", get(user_leaves_handler))
        .route("/project_managers", get(list_project_managers_handler))
        .route(
            "/project_managers/create",
            post(create_project_manager_handler),
        )
        .route(
            "/project_managers/{username}",
            get(get_project_manager_handler)
                .put(update_project_manager_handler)
                .delete(delete_project_manager_handler),
        )
        .route("/leaves", get(list_leaves_handler))
        .route("/leaves/create", post(create_leave_handler))
        .route("/holidays", get(list_holidays_handler))
        .route("/holidays/create", post(create_holiday_handler))
        .route("/graphql", post(graphql_handler))
        .layer(middleware::from_fn_with_state(state.clone(), csrf_guard))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

/// Every handler answers 200 with an envelope; failures carry
/// `success: false`.
type Reply = Json<Value>;

fn reply(result: ApiResult<Envelope>) -> Reply {
    Json(match result {
        Ok(envelope) => envelope.into_value(),
        Err(err) => err.envelope(),
    })
}

fn done(message: &str) -> impl FnOnce(bool) -> Envelope + '_ {
    move |_| Envelope::success().message(message)
}

/// The caller behind the request's session cookie, if any.
pub struct CurrentCaller {
    caller: Caller,
    session_id: Option<Uuid>,
}

impl CurrentCaller {
    fn username(&self) -> String {
        self.caller
            .session()
            .map(|session| session.username.clone())
            .unwrap_or_default()
    }
}

impl FromRequestParts<AppState> for CurrentCaller {
    type Rejection = Reply;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.config.cookie_key.clone());
        let Some(session_id) = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
        else {
            return Ok(Self {
                caller: Caller::Anonymous,
                session_id: None,
            });
        };
        let caller = state
            .gate
            .resolve(session_id)
            .await
            .map_err(|err| Json(err.envelope()))?;
        Ok(Self {
            caller,
            session_id: Some(session_id),
        })
    }
}

/// JSON body whose decode failures become a validation envelope.
pub struct JsonBody<T>(T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Reply;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(Json(ApiError::validation(rejection.body_text()).envelope())),
        }
    }
}

/// Double-submit check: state-changing requests must echo the token held in
/// the private `csrftoken` cookie through the `X-CSRFToken` header.
async fn csrf_guard(jar: PrivateCookieJar, request: Request, next: Next) -> Response {
    let guarded = matches!(
        *request.method(),
        Method::POST | Method::PUT | Method::DELETE | Method::PATCH
    );
    if guarded {
        let submitted = request
            .headers()
            .get(CSRF_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let valid = jar
            .get(CSRF_COOKIE)
            .is_some_and(|cookie| CsrfToken::from_cookie(cookie.value()).matches(submitted));
        if !valid {
            warn!(
                method = %request.method(),
                path = %request.uri().path(),
                "csrf verification failed"
            );
            return Json(Envelope::failure("CSRF verification failed").into_value())
                .into_response();
        }
    }
    next.run(request).await
}

fn cookie(
    config: &AppConfig,
    name: &'static str,
    value: String,
    max_age: TimeDuration,
) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .build()
}

async fn csrf_token_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, Reply) {
    let token = jar
        .get(CSRF_COOKIE)
        .map(|cookie| CsrfToken::from_cookie(cookie.value()))
        .filter(|token| !token.as_str().is_empty())
        .unwrap_or_else(CsrfToken::generate);
    let jar = jar.add(cookie(
        &state.config,
        CSRF_COOKIE,
        token.as_str().to_string(),
        TimeDuration::days(365),
    ));
    let body = Envelope::success().with("csrftoken", token.as_str());
    (jar, Json(body.into_value()))
}

async fn register_handler(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<NewHr>,
) -> Reply {
    reply(state.directory.register_hr(input).await.map(|username| {
        Envelope::success()
            .message("HR registered successfully")
            .with("username", username)
    }))
}

#[derive(Debug, Default, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

async fn login_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    headers: HeaderMap,
    JsonBody(body): JsonBody<LoginRequest>,
) -> (PrivateCookieJar, Reply) {
    let user_agent = headers
        .get(http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    match state.gate.login(&body.username, &body.password, user_agent).await {
        Ok(outcome) => {
            let jar = jar.add(cookie(
                &state.config,
                SESSION_COOKIE,
                outcome.session_id.to_string(),
                TimeDuration::seconds(state.gate.ttl().num_seconds()),
            ));
            let body = Envelope::success()
                .message(outcome.welcome())
                .with("username", &outcome.session.username);
            (jar, Json(body.into_value()))
        }
        Err(err) => (jar, Json(err.envelope())),
    }
}

async fn logout_handler(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    current: CurrentCaller,
) -> (PrivateCookieJar, Reply) {
    match state.gate.logout(&current.caller, current.session_id).await {
        Ok(username) => {
            let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
            let body = Envelope::success().message(format!("{username} Logged out"));
            (jar, Json(body.into_value()))
        }
        Err(err) => (jar, Json(err.envelope())),
    }
}

async fn update_own_hr_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    JsonBody(patch): JsonBody<HrPatch>,
) -> Reply {
    let username = current.username();
    let result = state
        .directory
        .update_hr(&current.caller, &username, patch)
        .await
        .map(|()| Envelope::success().message("HR profile updated"));
    reply(result)
}

async fn list_hrs_handler(State(state): State<AppState>, current: CurrentCaller) -> Reply {
    let result = state.directory.list_hrs(&current.caller).await;
    reply(result.map(|hrs| Envelope::success().with("hrs", hrs)))
}

async fn get_hr_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    Path(username): Path<String>,
) -> Reply {
    let result = state.directory.get_hr(&current.caller, &username).await;
    reply(result.map(|hr| Envelope::success().with("hr", hr)))
}

async fn delete_hr_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    Path(username): Path<String>,
) -> Reply {
    let result = state.directory.delete_hr(&current.caller, &username).await;
    reply(result.map(done("HR deleted")))
}

async fn list_employees_handler(State(state): State<AppState>, current: CurrentCaller) -> Reply {
    let result = state.directory.list_employees(&current.caller).await;
    reply(result.map(|employees| Envelope::success().with("employees", employees)))
}

async fn create_employee_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    JsonBody(input): JsonBody<NewEmployee>,
) -> Reply {
    let result = state.directory.create_employee(&current.caller, input).await;
    reply(result.map(|username| {
        Envelope::success()
            .message("Employee created")
            .with("username", username)
    }))
}

async fn get_employee_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    Path(username): Path<String>,
) -> Reply {
    let result = state.directory.get_employee(&current.caller, &username).await;
    reply(result.map(|employee| Envelope::success().with("employee", employee)))
}

async fn update_employee_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    Path(username): Path<String>,
    JsonBody(patch): JsonBody<EmployeePatch>,
) -> Reply {
    let result = state
        .directory
        .update_employee(&current.caller, &username, patch)
        .await
        .map(|()| Envelope::success().message("Employee updated"));
    reply(result)
}

async fn delete_employee_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    Path(username): Path<String>,
) -> Reply {
    let result = state
        .directory
        .delete_employee(&current.caller, &username)
        .await;
    reply(result.map(done("Employee deleted")))
}

async fn user_leaves_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    Path(username): Path<String>,
) -> Reply {
    let result = state
        .directory
        .list_leaves_for_user(&current.caller, &username)
        .await;
    reply(result.map(|leaves| Envelope::success().with("leaves", leaves)))
}

async fn list_project_managers_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
) -> Reply {
    let result = state.directory.list_project_managers(&current.caller).await;
    reply(result.map(|managers| Envelope::success().with("project_managers", managers)))
}

async fn create_project_manager_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    JsonBody(input): JsonBody<NewProjectManager>,
) -> Reply {
    let result = state
        .directory
        .create_project_manager(&current.caller, input)
        .await;
    reply(result.map(|username| {
        Envelope::success()
            .message("Project Manager created")
            .with("username", username)
    }))
}

async fn get_project_manager_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    Path(username): Path<String>,
) -> Reply {
    let result = state
        .directory
        .get_project_manager(&current.caller, &username)
        .await;
    reply(result.map(|manager| Envelope::success().with("project_manager", manager)))
}

async fn update_project_manager_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    Path(username): Path<String>,
    JsonBody(patch): JsonBody<ProjectManagerPatch>,
) -> Reply {
    let result = state
        .directory
        .update_project_manager(&current.caller, &username, patch)
        .await
        .map(|()| Envelope::success().message("Project Manager updated"));
    reply(result)
}

async fn delete_project_manager_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    Path(username): Path<String>,
) -> Reply {
    let result = state
        .directory
        .delete_project_manager(&current.caller, &username)
        .await;
    reply(result.map(done("Project Manager deleted")))
}

async fn list_leaves_handler(State(state): State<AppState>, current: CurrentCaller) -> Reply {
    let result = state.directory.list_leaves(&current.caller).await;
    reply(result.map(|leaves| Envelope::success().with("leaves", leaves)))
}

async fn create_leave_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    JsonBody(input): JsonBody<NewLeave>,
) -> Reply {
    let result = state.directory.create_leave(&current.caller, input).await;
    reply(result.map(|leave| {
        Envelope::success()
            .message("Leave created")
            .with("leave", leave)
    }))
}

async fn list_holidays_handler(State(state): State<AppState>, current: CurrentCaller) -> Reply {
    let result = state.directory.list_holidays(&current.caller).await;
    reply(result.map(|holidays| Envelope::success().with("holidays", holidays)))
}

async fn create_holiday_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    JsonBody(input): JsonBody<NewHoliday>,
) -> Reply {
    let result = state.directory.create_holiday(&current.caller, input).await;
    reply(result.map(|holiday| {
        Envelope::success()
            .message("Holiday created")
            .with("holiday", holiday)
    }))
}

async fn graphql_handler(
    State(state): State<AppState>,
    current: CurrentCaller,
    request: GraphQLRequest,
) -> GraphQLResponse {
    let request = request.into_inner().data(current.caller);
    state.schema.execute(request).await.into()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = platform_db::ping(state.directory.db()).await;
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
