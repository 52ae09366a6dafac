use chrono::NaiveDateTime;
use salvo::async_trait;

use crate::core::{
    entities::models::{NewUser, UserLevel},
    types::{errors::auth_error::AuthError, responses::auth_response::AuthResponse},
    utils::jwt_utils::JwtUtils,
};

use super::repository::{UserRepository, UserRepositoryImpl};

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(
        &self,
        openid: &str,
        nickname: Option<&str>,
        avatar: Option<&str>,
        jwt_utils: JwtUtils,
        now: NaiveDateTime,
    ) -> Result<AuthResponse, AuthError>;

    async fn refresh_token(
        &self,
        jwt_utils: JwtUtils,
        user_id: i32,
    ) -> Result<AuthResponse, AuthError>;
}

#[derive(Debug, Clone)]
pub struct AuthServiceImpl<R: UserRepository = UserRepositoryImpl> {
    repository: R,
}

impl<R: UserRepository> AuthServiceImpl<R> {
    pub fn new(repository: R) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R: UserRepository + Send + Sync> AuthService for AuthServiceImpl<R> {
    async fn login(
        &self,
        openid: &str,
        nickname: Option<&str>,
        avatar: Option<&str>,
        jwt_utils: JwtUtils,
        now: NaiveDateTime,
    ) -> Result<AuthResponse, AuthError> {
        let user = match self.repository.get_user_by_openid(openid).await {
            Ok(user) => {
                // Returning users may bring a fresher profile along.
                if nickname.is_some() || avatar.is_some() {
                    self.repository
                        .update_profile(user.id, nickname, avatar)
                        .await
                        .unwrap_or(user)
                } else {
                    user
                }
            }
            Err(_) => {
                let new_user = NewUser {
                    nickname: nickname.unwrap_or("wechat user"),
                    gitee_name: None,
                    avatar,
                    openid: Some(openid),
                    level: UserLevel::Member as i32,
                    created_at: now,
                };

                self.repository.create_user(new_user).await.map_err(|_| {
                    AuthError::UnexpectedError("Failed to create new user".to_string())
                })?
            }
        };

        let token = jwt_utils.generate_token(&user.id.to_string());
        let refresh_token = jwt_utils.generate_refresh_token(&user.id.to_string());

        Ok(AuthResponse {
            user: Some((&user).into()),
            token,
            refresh_token,
        })
    }

    async fn refresh_token(
        &self,
        jwt_utils: JwtUtils,
        user_id: i32,
    ) -> Result<AuthResponse, AuthError> {
        let token = jwt_utils.generate_token(&user_id.to_string());
        let refresh_token = jwt_utils.generate_refresh_token(&user_id.to_string());

        Ok(AuthResponse {
            user: None,
            token,
            refresh_token,
        })
    }
}
