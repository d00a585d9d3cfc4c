//! In-memory stand-ins for the Postgres repositories, shared by the unit
//! and handler tests.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    HttpMessage,
};
use uuid::Uuid;

use crate::{
    api::error,
    configs::CacheStore,
    modules::{
        friend::{
            repository::FriendRequestRepository,
            schema::{FriendRequestEntity, FriendRequestStatus},
            service::FriendService,
        },
        user::{
            model::{InsertUser, UpdateUser},
            repository::UserRepository,
            schema::{UserEntity, UserRole},
            service::{TokenSettings, UserService},
        },
    },
    utils::{Claims, TypeClaims},
};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<Vec<UserEntity>>,
    requests: Mutex<Vec<FriendRequestEntity>>,
    /// Array writes on this user's document fail, to leave pairs half linked.
    broken_user: Mutex<Option<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_user(&self, first_name: &str, last_name: &str) -> Uuid {
        let id = Uuid::now_v7();
        let now = chrono::Utc::now();
        self.users.lock().unwrap().push(UserEntity {
            id,
            username: format!("{}{}", first_name.to_lowercase(), id.simple()),
            email: format!("{}@example.com", id.simple()),
            hash_password: String::new(),
            role: UserRole::User,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            avatar_url: None,
            bio: None,
            friends: Vec::new(),
            blocked_users: Vec::new(),
            deleted_at: None,
            created_at: now,
            updated_at: now,
        });
        id
    }

    pub fn user(&self, id: &Uuid) -> UserEntity {
        self.users.lock().unwrap().iter().find(|u| u.id == *id).cloned().unwrap()
    }

    pub fn friends_of(&self, id: &Uuid) -> Vec<Uuid> {
        self.user(id).friends
    }

    pub fn requests(&self) -> Vec<FriendRequestEntity> {
        self.requests.lock().unwrap().clone()
    }

    pub fn break_user(&self, id: Option<Uuid>) {
        *self.broken_user.lock().unwrap() = id;
    }

    /// Writes a friends array directly, bypassing the service.
    pub fn set_friends(&self, id: &Uuid, friends: Vec<Uuid>) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == *id) {
            user.friends = friends;
        }
    }

    pub fn soft_delete(&self, id: &Uuid) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|u| u.id == *id) {
            user.deleted_at = Some(chrono::Utc::now());
        }
    }

    fn check_writable(&self, id: &Uuid) -> Result<(), error::SystemError> {
        if *self.broken_user.lock().unwrap() == Some(*id) {
            return Err(error::SystemError::DatabaseError("connection reset".into()));
        }
        Ok(())
    }

    fn update_array<F>(&self, id: &Uuid, f: F) -> Result<bool, error::SystemError>
    where
        F: FnOnce(&mut UserEntity) -> bool,
    {
        self.check_writable(id)?;
        let mut users = self.users.lock().unwrap();
        Ok(users.iter_mut().find(|u| u.id == *id).map(f).unwrap_or(false))
    }
}

fn live(user: &UserEntity) -> bool {
    user.deleted_at.is_none()
}

fn same_pair(r: &FriendRequestEntity, a: &Uuid, b: &Uuid) -> bool {
    (r.from_user_id == *a && r.to_user_id == *b) || (r.from_user_id == *b && r.to_user_id == *a)
}

#[async_trait::async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == *id && live(u)).cloned())
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<UserEntity>, error::SystemError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| ids.contains(&u.id) && live(u))
            .cloned()
            .collect())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username) && live(u))
            .cloned())
    }

    async fn create(&self, user: &InsertUser) -> Result<Uuid, error::SystemError> {
        let id = self.add_user(&user.first_name, &user.last_name);
        let mut users = self.users.lock().unwrap();
        if let Some(entity) = users.iter_mut().find(|u| u.id == id) {
            entity.username = user.username.clone();
            entity.email = user.email.clone();
            entity.hash_password = user.hash_password.clone();
        }
        Ok(id)
    }

    async fn update(&self, id: &Uuid, user: &UpdateUser) -> Result<UserEntity, error::SystemError> {
        let mut users = self.users.lock().unwrap();
        let entity = users
            .iter_mut()
            .find(|u| u.id == *id && live(u))
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;
        if let Some(first_name) = &user.first_name {
            entity.first_name = first_name.clone();
        }
        if let Some(last_name) = &user.last_name {
            entity.last_name = last_name.clone();
        }
        if let Some(bio) = &user.bio {
            entity.bio = bio.clone();
        }
        Ok(entity.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, error::SystemError> {
        let found = self.find_by_id(id).await?.is_some();
        self.soft_delete(id);
        Ok(found)
    }

    async fn push_friend(
        &self,
        user_id: &Uuid,
        friend_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        self.update_array(user_id, |u| {
            if u.friends.contains(friend_id) {
                return false;
            }
            u.friends.push(*friend_id);
            true
        })
    }

    async fn pull_friend(
        &self,
        user_id: &Uuid,
        friend_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        self.update_array(user_id, |u| {
            let before = u.friends.len();
            u.friends.retain(|id| id != friend_id);
            before != u.friends.len()
        })
    }

    async fn push_blocked(
        &self,
        user_id: &Uuid,
        blocked_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        self.update_array(user_id, |u| {
            if u.blocked_users.contains(blocked_id) {
                return false;
            }
            u.blocked_users.push(*blocked_id);
            true
        })
    }

    async fn pull_blocked(
        &self,
        user_id: &Uuid,
        blocked_id: &Uuid,
    ) -> Result<bool, error::SystemError> {
        self.update_array(user_id, |u| {
            let before = u.blocked_users.len();
            u.blocked_users.retain(|id| id != blocked_id);
            before != u.blocked_users.len()
        })
    }

    async fn find_new_people(
        &self,
        exclude: &[Uuid],
        search: &str,
        limit: i64,
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let needle = search.to_lowercase();
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .filter(|u| live(u) && !exclude.contains(&u.id))
            .filter(|u| {
                u.first_name.to_lowercase().contains(&needle)
                    || u.last_name.to_lowercase().contains(&needle)
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl FriendRequestRepository for MemoryStore {
    async fn find_directed(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
        statuses: &[FriendRequestStatus],
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|r| {
                r.from_user_id == *from_user_id
                    && r.to_user_id == *to_user_id
                    && statuses.contains(&r.status)
            })
            .cloned())
    }

    async fn find_involving(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.from_user_id == *user_id || r.to_user_id == *user_id)
            .cloned()
            .collect())
    }

    async fn find_sent(
        &self,
        user_id: &Uuid,
        status: FriendRequestStatus,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.from_user_id == *user_id && r.status == status)
            .cloned()
            .collect())
    }

    async fn find_received(
        &self,
        user_id: &Uuid,
        status: FriendRequestStatus,
    ) -> Result<Vec<FriendRequestEntity>, error::SystemError> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|r| r.to_user_id == *user_id && r.status == status)
            .cloned()
            .collect())
    }

    async fn create_pending(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        let mut requests = self.requests.lock().unwrap();
        // mirrors friend_requests_open_pair
        let open = |r: &FriendRequestEntity| {
            matches!(r.status, FriendRequestStatus::Pending | FriendRequestStatus::Blocked)
        };
        if requests.iter().any(|r| same_pair(r, from_user_id, to_user_id) && open(r)) {
            return Err(error::SystemError::Duplicate(None));
        }

        let now = chrono::Utc::now();
        let request = FriendRequestEntity {
            id: Uuid::now_v7(),
            from_user_id: *from_user_id,
            to_user_id: *to_user_id,
            status: FriendRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        requests.push(request.clone());
        Ok(request)
    }

    async fn transition(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
        current: FriendRequestStatus,
        next: FriendRequestStatus,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let mut requests = self.requests.lock().unwrap();
        Ok(requests
            .iter_mut()
            .find(|r| {
                r.from_user_id == *from_user_id
                    && r.to_user_id == *to_user_id
                    && r.status == current
            })
            .map(|r| {
                r.status = next;
                r.updated_at = chrono::Utc::now();
                r.clone()
            }))
    }

    async fn delete_directed(
        &self,
        from_user_id: &Uuid,
        to_user_id: &Uuid,
        status: FriendRequestStatus,
    ) -> Result<Option<FriendRequestEntity>, error::SystemError> {
        let mut requests = self.requests.lock().unwrap();
        let position = requests.iter().position(|r| {
            r.from_user_id == *from_user_id && r.to_user_id == *to_user_id && r.status == status
        });
        Ok(position.map(|i| requests.remove(i)))
    }

    async fn delete_between(
        &self,
        user_id_a: &Uuid,
        user_id_b: &Uuid,
    ) -> Result<u64, error::SystemError> {
        let mut requests = self.requests.lock().unwrap();
        let before = requests.len();
        requests.retain(|r| !same_pair(r, user_id_a, user_id_b));
        Ok((before - requests.len()) as u64)
    }
}

pub fn friend_service(store: &Arc<MemoryStore>) -> FriendService {
    FriendService::with_dependencies(store.clone(), store.clone(), 20)
}

/// Cache without expiry.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, error::SystemError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        _expiration: usize,
    ) -> Result<(), error::SystemError> {
        self.entries.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), error::SystemError> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }
}

pub const TEST_SECRET: &str = "test-secret";

pub fn user_service(store: &Arc<MemoryStore>, cache: &Arc<MemoryCache>) -> UserService {
    let tokens = TokenSettings {
        secret: TEST_SECRET.to_string(),
        access_expiration: 900,
        refresh_expiration: 3600,
    };
    UserService::with_dependencies(store.clone(), cache.clone(), tokens)
}

/// Trusts an `x-user-id` header instead of a signed token.
pub async fn header_authentication<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<B>, actix_web::Error>
where
    B: MessageBody + 'static,
{
    let user_id = req
        .headers()
        .get("x-user-id")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| error::Error::unauthorized("Access Denied"))?;

    let claims =
        Claims::new(&user_id, &UserRole::User, 60).with_type(TypeClaims::AccessToken);
    req.extensions_mut().insert(claims);

    next.call(req).await
}
