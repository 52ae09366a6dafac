use diesel::{
    ExpressionMethods, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper, insert_into,
    r2d2::{ConnectionManager, Pool, PooledConnection},
    update,
};
use salvo::async_trait;

use crate::core::{
    database::schema::users,
    entities::models::{NewUser, User},
    types::errors::{auth_error::AuthError, general::GeneralError},
};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user_by_id(&self, user_id: i32) -> Result<User, AuthError>;

    async fn get_user_by_openid(&self, openid: &str) -> Result<User, AuthError>;

    async fn create_user(&self, user: NewUser<'_>) -> Result<User, AuthError>;

    async fn update_profile(
        &self,
        user_id: i32,
        nickname: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, AuthError>;
}

#[derive(Debug, Clone)]
pub struct UserRepositoryImpl {
    pool: Pool<ConnectionManager<PgConnection>>,
}

impl UserRepositoryImpl {
    pub fn new(pool: Pool<ConnectionManager<PgConnection>>) -> Self {
        Self { pool }
    }

    fn get_conn(&self) -> Result<PooledConnection<ConnectionManager<PgConnection>>, GeneralError> {
        self.pool.get().map_err(|_| GeneralError::DbConnectionError)
    }
}

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn get_user_by_id(&self, user_id: i32) -> Result<User, AuthError> {
        let mut conn = self.get_conn()?;

        users::table
            .filter(users::id.eq(user_id))
            .first::<User>(&mut conn)
            .map_err(|_| AuthError::UnexpectedError(format!("User {user_id} not found")))
    }

    async fn get_user_by_openid(&self, openid: &str) -> Result<User, AuthError> {
        let mut conn = self.get_conn()?;

        users::table
            .filter(users::openid.eq(openid))
            .first::<User>(&mut conn)
            .map_err(|_| AuthError::UnexpectedError("User not found".to_string()))
    }

    async fn create_user(&self, user: NewUser<'_>) -> Result<User, AuthError> {
        let mut conn = self.get_conn()?;

        insert_into(users::table)
            .values(&user)
            .returning(User::as_select())
            .get_result(&mut conn)
            .map_err(|err| AuthError::UnexpectedError(err.to_string()))
    }

    async fn update_profile(
        &self,
        user_id: i32,
        nickname: Option<&str>,
        avatar: Option<&str>,
    ) -> Result<User, AuthError> {
        let mut conn = self.get_conn()?;

        let user = users::table
            .filter(users::id.eq(user_id))
            .first::<User>(&mut conn)
            .map_err(|_| AuthError::UnexpectedError(format!("User {user_id} not found")))?;

        update(users::table)
            .filter(users::id.eq(user_id))
            .set((
                users::nickname.eq(nickname.unwrap_or(&user.nickname)),
                users::avatar.eq(avatar.or(user.avatar.as_deref())),
            ))
            .returning(User::as_select())
            .get_result(&mut conn)
            .map_err(|err| AuthError::UnexpectedError(err.to_string()))
    }
}
