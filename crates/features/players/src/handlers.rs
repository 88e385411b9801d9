use crate::Players;
use crate::error::PlayerError;
use crate::model::{NewPlayer, PlayerProfile};
use axum::extract::State;
use fauna_derive::{api_handler, api_model};
use fauna_domain::constants::PLAYERS_TAG;
use fauna_kernel::prelude::{ApiError, ApiJson, ApiResult, ApiState, FieldIssue, Success};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

impl From<PlayerError> for ApiError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::Validation { field, message } => Self::validation(field, message),
            PlayerError::Conflict { message } => Self::Conflict { message },
            PlayerError::Unauthorized { message } => Self::Unauthorized { message },
            err @ PlayerError::Storage { .. } => {
                Self::Internal { message: "Storage failure".into(), context: Some(err.to_string().into()) }
            }
            err @ PlayerError::Crypto { .. } => {
                Self::Internal { message: "Crypto failure".into(), context: Some(err.to_string().into()) }
            }
        }
    }
}

#[api_model]
pub struct SignupRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[api_model]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[api_handler(
    post,
    path = "/api/players/signup",
    request_body = SignupRequest,
    responses(
        (status = OK, description = "Account created", body = PlayerProfile),
        (status = BAD_REQUEST, description = "Invalid field", body = Vec<FieldIssue>),
        (status = CONFLICT, description = "Email already registered", body = Vec<FieldIssue>),
    ),
    tag = PLAYERS_TAG,
)]
pub async fn signup_handler(
    State(players): State<Players>,
    ApiJson(request): ApiJson<SignupRequest>,
) -> ApiResult<PlayerProfile> {
    let input = NewPlayer {
        first_name: request.first_name,
        last_name: request.last_name,
        email: request.email,
        password: request.password,
    };
    Ok(Success(players.service.signup(input).await?))
}

#[api_handler(
    post,
    path = "/api/players/login",
    request_body = LoginRequest,
    responses(
        (status = OK, description = "Credentials accepted", body = PlayerProfile),
        (status = UNAUTHORIZED, description = "Unknown email or wrong password", body = Vec<FieldIssue>),
    ),
    tag = PLAYERS_TAG,
)]
pub async fn login_handler(
    State(players): State<Players>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<PlayerProfile> {
    Ok(Success(players.service.login(&request.email, &request.password).await?))
}

pub fn router(players: Players) -> OpenApiRouter<ApiState> {
    OpenApiRouter::new().routes(routes!(signup_handler)).routes(routes!(login_handler)).with_state(players)
}
