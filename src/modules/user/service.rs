use log::info;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    api::error,
    configs::CacheStore,
    constants::USER_CACHE_TTL,
    modules::user::{
        model::{InsertUser, SignInModel, SignUpModel, UpdateUserModel, UserResponse},
        repository::UserRepository,
        schema::UserEntity,
    },
    utils::{hash_password, verify_password, Claims, TypeClaims},
    ENV,
};

fn user_key(id: &Uuid) -> String {
    format!("user:{id}")
}

fn refresh_key(jti: &Uuid) -> String {
    format!("refresh_token:{jti}")
}

/// Signing secret and lifetimes (seconds) for issued tokens.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub access_expiration: u64,
    pub refresh_expiration: u64,
}

impl TokenSettings {
    pub fn from_env() -> Self {
        TokenSettings {
            secret: ENV.jwt_secret.clone(),
            access_expiration: ENV.access_token_expiration,
            refresh_expiration: ENV.refresh_token_expiration,
        }
    }
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository + Send + Sync>,
    cache: Arc<dyn CacheStore + Send + Sync>,
    tokens: TokenSettings,
}

impl UserService {
    pub fn with_dependencies(
        repo: Arc<dyn UserRepository + Send + Sync>,
        cache: Arc<dyn CacheStore + Send + Sync>,
        tokens: TokenSettings,
    ) -> Self {
        info!("UserService initialized with dependencies");
        UserService { repo, cache, tokens }
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<UserResponse, error::SystemError> {
        let key = user_key(&id);
        if let Some(cached_user) = self.cache.get::<UserResponse>(&key).await? {
            info!("User {} found in cache", id);
            return Ok(cached_user);
        }

        let entity = self
            .repo
            .find_by_id(&id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let response = UserResponse::from(entity);
        self.cache.set(&key, &response, USER_CACHE_TTL).await?;
        info!("User {} cached", id);
        Ok(response)
    }

    pub async fn update_user(
        &self,
        id: Uuid,
        user: UpdateUserModel,
    ) -> Result<UserResponse, error::SystemError> {
        if user.is_empty() {
            return Err(error::SystemError::bad_request("No fields to update"));
        }

        let updated = self.repo.update(&id, &user.into()).await?;
        self.cache.delete(&user_key(&id)).await?;
        Ok(UserResponse::from(updated))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), error::SystemError> {
        if !self.repo.delete(&id).await? {
            return Err(error::SystemError::not_found("User not found"));
        }
        self.cache.delete(&user_key(&id)).await?;
        Ok(())
    }

    pub async fn sign_up(&self, user: SignUpModel) -> Result<Uuid, error::SystemError> {
        let hash_password = hash_password(&user.password)?;

        let new_user = InsertUser {
            username: user.username,
            email: user.email,
            hash_password,
            first_name: user.first_name,
            last_name: user.last_name,
        };

        let user_id = self.repo.create(&new_user).await?;
        info!("User {} signed up", user_id);
        Ok(user_id)
    }

    pub async fn sign_in(&self, user: SignInModel) -> Result<(String, String), error::SystemError> {
        let user_entity = self
            .repo
            .find_by_username(&user.username)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("Invalid username or password"))?;

        if !verify_password(&user_entity.hash_password, &user.password)? {
            return Err(error::SystemError::unauthorized("Invalid username or password"));
        }

        self.issue_tokens(&user_entity).await
    }

    /// Rotates the refresh session: the presented token is consumed.
    pub async fn refresh(
        &self,
        refresh_token: Option<String>,
    ) -> Result<(String, String), error::SystemError> {
        let token = refresh_token
            .ok_or_else(|| error::SystemError::unauthorized("Refresh token missing"))?;

        let claims = Claims::decode(&token, self.tokens.secret.as_bytes())
            .map_err(|_| error::SystemError::forbidden("Token Invalid or Expired"))?;

        let jti = match (&claims._type, claims.jti) {
            (Some(TypeClaims::RefreshToken), Some(jti)) => jti,
            _ => return Err(error::SystemError::forbidden("Token Invalid or Expired")),
        };

        let key = refresh_key(&jti);
        let owner = self.cache.get::<Uuid>(&key).await?;
        if owner != Some(claims.sub) {
            return Err(error::SystemError::forbidden("Token Invalid or Expired"));
        }
        self.cache.delete(&key).await?;

        let user_entity = self
            .repo
            .find_by_id(&claims.sub)
            .await?
            .ok_or_else(|| error::SystemError::unauthorized("User not found"))?;

        self.issue_tokens(&user_entity).await
    }

    pub async fn sign_out(&self, refresh_token: Option<String>) -> Result<(), error::SystemError> {
        let Some(token) = refresh_token else {
            return Ok(());
        };

        // an expired or forged cookie still signs the caller out
        let claims = Claims::decode(&token, self.tokens.secret.as_bytes());
        if let Ok(Claims { jti: Some(jti), .. }) = claims {
            self.cache.delete(&refresh_key(&jti)).await?;
        }
        Ok(())
    }

    async fn issue_tokens(
        &self,
        user: &UserEntity,
    ) -> Result<(String, String), error::SystemError> {
        let secret = self.tokens.secret.as_bytes();
        let access_token = Claims::new(&user.id, &user.role, self.tokens.access_expiration)
            .with_type(TypeClaims::AccessToken)
            .encode(secret)?;

        let jti = Uuid::now_v7();
        let refresh_token = Claims::new(&user.id, &user.role, self.tokens.refresh_expiration)
            .with_jti(jti)
            .with_type(TypeClaims::RefreshToken)
            .encode(secret)?;

        let ttl = self.tokens.refresh_expiration as usize;
        self.cache.set(&refresh_key(&jti), &user.id, ttl).await?;

        Ok((access_token, refresh_token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{user_service, MemoryCache, MemoryStore, TEST_SECRET};

    fn sign_up_model(username: &str) -> SignUpModel {
        SignUpModel {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password: "hunter22".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
        }
    }

    fn sign_in_model(username: &str, password: &str) -> SignInModel {
        SignInModel { username: username.to_string(), password: password.to_string() }
    }

    async fn signed_in(svc: &UserService) -> (Uuid, String, String) {
        let id = svc.sign_up(sign_up_model("annlee")).await.unwrap();
        let (access, refresh) = svc.sign_in(sign_in_model("annlee", "hunter22")).await.unwrap();
        (id, access, refresh)
    }

    #[actix_web::test]
    async fn test_sign_in_issues_access_and_refresh_tokens() {
        let (store, cache) = (MemoryStore::new(), Arc::new(MemoryCache::default()));
        let svc = user_service(&store, &cache);

        let (id, access, refresh) = signed_in(&svc).await;

        let access = Claims::decode(&access, TEST_SECRET.as_bytes()).unwrap();
        assert_eq!(access.sub, id);
        assert_eq!(access._type, Some(TypeClaims::AccessToken));

        let refresh = Claims::decode(&refresh, TEST_SECRET.as_bytes()).unwrap();
        assert_eq!(refresh._type, Some(TypeClaims::RefreshToken));
        assert!(cache.contains(&refresh_key(&refresh.jti.unwrap())));
    }

    #[actix_web::test]
    async fn test_sign_in_rejects_wrong_password() {
        let (store, cache) = (MemoryStore::new(), Arc::new(MemoryCache::default()));
        let svc = user_service(&store, &cache);
        svc.sign_up(sign_up_model("annlee")).await.unwrap();

        let err = svc.sign_in(sign_in_model("annlee", "wrong-password")).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));

        let err = svc.sign_in(sign_in_model("nobody", "hunter22")).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));
    }

    #[actix_web::test]
    async fn test_refresh_consumes_presented_token() {
        let (store, cache) = (MemoryStore::new(), Arc::new(MemoryCache::default()));
        let svc = user_service(&store, &cache);
        let (_, _, first) = signed_in(&svc).await;

        let (_, second) = svc.refresh(Some(first.clone())).await.unwrap();

        let err = svc.refresh(Some(first)).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
        assert!(svc.refresh(Some(second)).await.is_ok());
    }

    #[actix_web::test]
    async fn test_refresh_rejects_access_token_and_missing_cookie() {
        let (store, cache) = (MemoryStore::new(), Arc::new(MemoryCache::default()));
        let svc = user_service(&store, &cache);
        let (_, access, _) = signed_in(&svc).await;

        let err = svc.refresh(Some(access)).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));

        let err = svc.refresh(None).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Unauthorized(_)));
    }

    #[actix_web::test]
    async fn test_sign_out_revokes_refresh_session() {
        let (store, cache) = (MemoryStore::new(), Arc::new(MemoryCache::default()));
        let svc = user_service(&store, &cache);
        let (_, _, refresh) = signed_in(&svc).await;

        svc.sign_out(Some(refresh.clone())).await.unwrap();

        let err = svc.refresh(Some(refresh)).await.unwrap_err();
        assert!(matches!(err, error::SystemError::Forbidden(_)));
        assert!(svc.sign_out(None).await.is_ok());
    }

    #[actix_web::test]
    async fn test_profile_cache_dropped_on_update() {
        let (store, cache) = (MemoryStore::new(), Arc::new(MemoryCache::default()));
        let svc = user_service(&store, &cache);
        let (id, _, _) = signed_in(&svc).await;

        svc.get_by_id(id).await.unwrap();
        assert!(cache.contains(&user_key(&id)));

        let update = UpdateUserModel {
            username: None,
            email: None,
            first_name: Some("Anna".to_string()),
            last_name: None,
            avatar_url: None,
            bio: None,
        };
        svc.update_user(id, update).await.unwrap();
        assert!(!cache.contains(&user_key(&id)));
        assert_eq!(svc.get_by_id(id).await.unwrap().first_name, "Anna");
    }
}
