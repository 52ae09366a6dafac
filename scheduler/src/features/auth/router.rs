use salvo::{oapi::extract::JsonBody, prelude::*};
use validator::Validate;

use crate::core::{
    dtos::auth::login_dto::LoginDto,
    types::{errors::auth_error::AuthError, responses::auth_response::AuthResponse},
    utils::{jwt_utils::JwtUtils, time_utils::civil_now, wx_utils::WxClient},
};

use super::service::{AuthService, AuthServiceImpl};

pub fn get_auth_router(jwt_utils: JwtUtils) -> Router {
    let refresh_router = Router::with_path("refresh")
        .hoop(jwt_utils.refresh_token_middleware())
        .post(refresh_token);

    Router::with_path("auth")
        .push(Router::with_path("login").post(login))
        .push(refresh_router)
}

/// Exchanges a mini-program login code for a signed token pair,
/// creating the user on first sight.
#[endpoint(tags("auth"), status_codes(201, 400, 401, 500))]
async fn login(
    _res: &mut Response,
    data: JsonBody<LoginDto>,
    depot: &mut Depot,
) -> Result<AuthResponse, AuthError> {
    let auth_service = depot.obtain::<AuthServiceImpl>().unwrap();
    let wx_client = depot.obtain::<WxClient>().unwrap();
    let jwt_utils = depot.obtain::<JwtUtils>().unwrap();

    let login_dto = data.0;
    login_dto
        .validate()
        .map_err(|err| AuthError::CodeRejected(err.to_string()))?;

    let openid = wx_client
        .jscode_to_openid(&login_dto.code)
        .await
        .map_err(|err| AuthError::CodeRejected(err.to_string()))?;

    let response = auth_service
        .login(
            &openid,
            login_dto.nickname.as_deref(),
            login_dto.avatar.as_deref(),
            jwt_utils.clone(),
            civil_now(),
        )
        .await?;

    Ok(response)
}

/// Issues a fresh token pair from a valid refresh token.
#[endpoint(tags("auth"), status_codes(201, 401, 500))]
async fn refresh_token(
    _res: &mut Response,
    depot: &mut Depot,
) -> Result<AuthResponse, AuthError> {
    let auth_service = depot.obtain::<AuthServiceImpl>().unwrap();
    let jwt_utils = depot.obtain::<JwtUtils>().unwrap();
    let user_id = depot.get::<String>("user_id").unwrap();

    let response = auth_service
        .refresh_token(jwt_utils.clone(), user_id.parse().unwrap())
        .await?;

    Ok(response)
}
