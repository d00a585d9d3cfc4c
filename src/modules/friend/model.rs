use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::{
    friend::schema::{FriendRequestEntity, FriendRequestStatus},
    user::schema::UserEntity,
};

/// Names-only projection of a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
}

impl From<UserEntity> for FriendResponse {
    fn from(user: UserEntity) -> Self {
        FriendResponse { id: user.id, first_name: user.first_name, last_name: user.last_name }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedUserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<UserEntity> for BlockedUserResponse {
    fn from(user: UserEntity) -> Self {
        BlockedUserResponse {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdOrInfo {
    Id(Uuid),
    Info(FriendResponse),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestResponse {
    pub id: Uuid,
    pub status: FriendRequestStatus,
    pub from: IdOrInfo,
    pub to: IdOrInfo,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl FriendRequestResponse {
    /// `other` is the counterpart's profile when it could be loaded.
    pub fn from_entity(
        request: FriendRequestEntity,
        viewer: &Uuid,
        other: Option<FriendResponse>,
    ) -> Self {
        let counterpart = match other {
            Some(info) => IdOrInfo::Info(info),
            None => IdOrInfo::Id(request.counterpart(viewer)),
        };

        let (from, to) = if request.from_user_id == *viewer {
            (IdOrInfo::Id(*viewer), counterpart)
        } else {
            (counterpart, IdOrInfo::Id(*viewer))
        };

        FriendRequestResponse {
            id: request.id,
            status: request.status,
            from,
            to,
            created_at: request.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewPeopleQuery {
    #[validate(length(max = 100, message = "Search must be at most 100 characters long"))]
    pub search: Option<String>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SearchPeopleQuery {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Search must be between 1 and 100 characters long"
    ))]
    pub search: String,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconcileReport {
    /// Half-linked pairs completed because an accepted record backs them.
    pub repaired: usize,
    /// Half-linked pairs dropped because nothing backs them.
    pub removed: usize,
}
