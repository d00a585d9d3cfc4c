use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use uuid::Uuid;

use crate::{
    api::error,
    constants::NEW_PEOPLE_MAX_LIMIT,
    modules::{
        friend::{
            model::{BlockedUserResponse, FriendRequestResponse, FriendResponse, ReconcileReport},
            repository::FriendRequestRepository,
            schema::{FriendRequestEntity, FriendRequestStatus},
        },
        user::{repository::UserRepository, schema::UserEntity},
    },
};

use FriendRequestStatus::{Accepted, Blocked, Pending};

fn ensure_distinct(a: &Uuid, b: &Uuid, message: &'static str) -> Result<(), error::SystemError> {
    if a == b {
        return Err(error::SystemError::bad_request(message));
    }
    Ok(())
}

/// Friend request lifecycle, friends list, block list and discovery.
///
/// A friendship is recorded twice: the directed request record (kept as
/// `accepted`) and the `friends` arrays of both users. The store only gives
/// per-document atomicity, so the two array writes of a link or unlink can
/// be left half done; [`FriendService::reconcile_friends`] repairs that.
#[derive(Clone)]
pub struct FriendService {
    friend_repo: Arc<dyn FriendRequestRepository + Send + Sync>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    new_people_limit: i64,
}

impl FriendService {
    pub fn with_dependencies(
        friend_repo: Arc<dyn FriendRequestRepository + Send + Sync>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        new_people_limit: i64,
    ) -> Self {
        log::info!("FriendService initialized with dependencies");
        FriendService { friend_repo, user_repo, new_people_limit }
    }

    async fn find_user(&self, user_id: &Uuid) -> Result<UserEntity, error::SystemError> {
        self.user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))
    }

    pub async fn send_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        ensure_distinct(&sender_id, &receiver_id, "You can't send friend request to yourself")?;

        let (existing, receiver, reverse) = tokio::try_join!(
            self.friend_repo.find_directed(&sender_id, &receiver_id, &[Pending, Accepted, Blocked]),
            self.user_repo.find_by_id(&receiver_id),
            self.friend_repo.find_directed(&receiver_id, &sender_id, &[Pending, Blocked]),
        )?;

        if let Some(existing) = existing {
            return Err(match existing.status {
                Pending => error::SystemError::conflict("Friend request already sent"),
                Accepted => error::SystemError::conflict("You are already friends"),
                Blocked => error::SystemError::forbidden("You are blocked"),
            });
        }

        let receiver = receiver.ok_or_else(|| error::SystemError::not_found("User not found"))?;
        if receiver.is_friend_of(&sender_id) {
            return Err(error::SystemError::conflict("You are already friends"));
        }

        match reverse.map(|r| r.status) {
            Some(Pending) => {
                return Err(error::SystemError::conflict("Friend request already sent"));
            }
            Some(_) => {
                return Err(error::SystemError::conflict(
                    "Unblock this user's friend request first",
                ));
            }
            None => {}
        }

        let request = match self.friend_repo.create_pending(&sender_id, &receiver_id).await {
            Ok(request) => request,
            // lost the race against a concurrent request for the same pair
            Err(e) if e.is_duplicate() => {
                return Err(error::SystemError::conflict("Friend request already sent"));
            }
            Err(e) => return Err(e),
        };

        tracing::info!(from = %sender_id, to = %receiver_id, "friend request sent");
        Ok(request)
    }

    pub async fn accept_friend_request(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        ensure_distinct(&receiver_id, &sender_id, "You can't accept a request from yourself")?;

        let Some(request) =
            self.friend_repo.transition(&sender_id, &receiver_id, Pending, Accepted).await?
        else {
            let accepted =
                self.friend_repo.find_directed(&sender_id, &receiver_id, &[Accepted]).await?;
            return Err(match accepted {
                Some(_) => error::SystemError::conflict("Friend request already accepted"),
                None => error::SystemError::not_found("Friend request not found"),
            });
        };

        self.link_friends(&receiver_id, &sender_id).await?;

        tracing::info!(from = %sender_id, to = %receiver_id, "friend request accepted");
        Ok(request)
    }

    pub async fn decline_friend_request(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        ensure_distinct(&receiver_id, &sender_id, "You can't decline a request from yourself")?;

        let request = self
            .friend_repo
            .delete_directed(&sender_id, &receiver_id, Pending)
            .await?
            .ok_or_else(|| error::SystemError::conflict("Friend request already declined"))?;

        tracing::info!(from = %sender_id, to = %receiver_id, "friend request declined");
        Ok(request)
    }

    pub async fn cancel_friend_request(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        ensure_distinct(&sender_id, &receiver_id, "You can't cancel a request to yourself")?;

        let request = self
            .friend_repo
            .delete_directed(&sender_id, &receiver_id, Pending)
            .await?
            .ok_or_else(|| error::SystemError::conflict("Friend request already cancelled"))?;

        tracing::info!(from = %sender_id, to = %receiver_id, "friend request cancelled");
        Ok(request)
    }

    pub async fn block_friend_request(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        ensure_distinct(&receiver_id, &sender_id, "You can't block a request from yourself")?;

        let request = self
            .friend_repo
            .transition(&sender_id, &receiver_id, Pending, Blocked)
            .await?
            .ok_or_else(|| error::SystemError::not_found("No pending friend request to block"))?;

        tracing::info!(from = %sender_id, to = %receiver_id, "friend request blocked");
        Ok(request)
    }

    pub async fn unblock_friend_request(
        &self,
        receiver_id: Uuid,
        sender_id: Uuid,
    ) -> Result<FriendRequestEntity, error::SystemError> {
        ensure_distinct(&receiver_id, &sender_id, "You can't unblock a request from yourself")?;

        let request = self
            .friend_repo
            .delete_directed(&sender_id, &receiver_id, Blocked)
            .await?
            .ok_or_else(|| error::SystemError::conflict("Friend request already unblocked"))?;

        tracing::info!(from = %sender_id, to = %receiver_id, "friend request unblocked");
        Ok(request)
    }

    /// The request records are deleted even when an array pull fails, so a
    /// half-unlinked pair is never backed by an accepted record afterwards.
    pub async fn unfriend(&self, user_id: Uuid, friend_id: Uuid) -> Result<(), error::SystemError> {
        ensure_distinct(&user_id, &friend_id, "You can't unfriend yourself")?;

        let unlinked = self.unlink_friends(&user_id, &friend_id).await;
        let removed = self.friend_repo.delete_between(&user_id, &friend_id).await;

        unlinked?;
        let removed = removed?;
        if removed == 0 {
            return Err(error::SystemError::conflict("Friend request already cancelled"));
        }

        tracing::info!(user = %user_id, friend = %friend_id, removed, "unfriended");
        Ok(())
    }

    async fn link_friends(&self, a: &Uuid, b: &Uuid) -> Result<(), error::SystemError> {
        self.user_repo.push_friend(a, b).await?;
        if let Err(e) = self.user_repo.push_friend(b, a).await {
            tracing::warn!(user = %a, friend = %b, "half-linked friendship left after accept");
            return Err(e);
        }
        Ok(())
    }

    async fn unlink_friends(&self, a: &Uuid, b: &Uuid) -> Result<(), error::SystemError> {
        self.user_repo.pull_friend(a, b).await?;
        if let Err(e) = self.user_repo.pull_friend(b, a).await {
            tracing::warn!(user = %a, friend = %b, "half-unlinked friendship left after unfriend");
            return Err(e);
        }
        Ok(())
    }

    /// Repairs pairs whose `friends` arrays disagree with the request records.
    ///
    /// A pair backed by an accepted request is linked on both sides, even
    /// when neither side was written. A half-linked pair without one has the
    /// dangling entry dropped.
    pub async fn reconcile_friends(
        &self,
        user_id: Uuid,
    ) -> Result<ReconcileReport, error::SystemError> {
        let (user, requests) = tokio::try_join!(
            self.find_user(&user_id),
            self.friend_repo.find_involving(&user_id),
        )?;

        let accepted: HashSet<Uuid> = requests
            .iter()
            .filter(|r| r.status == Accepted)
            .map(|r| r.counterpart(&user_id))
            .collect();

        let mut candidates: Vec<Uuid> = user.friends.clone();
        candidates.extend(accepted.iter().filter(|id| !user.is_friend_of(id)));

        let others: HashMap<Uuid, UserEntity> = self
            .user_repo
            .find_by_ids(&candidates)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let mut report = ReconcileReport::default();
        for other_id in candidates {
            let Some(other) = others.get(&other_id) else {
                continue;
            };

            let backed = accepted.contains(&other_id);
            match (user.is_friend_of(&other_id), other.is_friend_of(&user_id), backed) {
                (true, true, _) => {}
                (false, false, false) => {}
                (true, false, true) => {
                    self.user_repo.push_friend(&other_id, &user_id).await?;
                    report.repaired += 1;
                }
                (false, true, true) => {
                    self.user_repo.push_friend(&user_id, &other_id).await?;
                    report.repaired += 1;
                }
                (false, false, true) => {
                    self.link_friends(&user_id, &other_id).await?;
                    report.repaired += 1;
                }
                (true, false, false) => {
                    self.user_repo.pull_friend(&user_id, &other_id).await?;
                    report.removed += 1;
                }
                (false, true, false) => {
                    self.user_repo.pull_friend(&other_id, &user_id).await?;
                    report.removed += 1;
                }
            }
        }

        if report != ReconcileReport::default() {
            tracing::info!(
                user = %user_id,
                repaired = report.repaired,
                removed = report.removed,
                "friend links reconciled"
            );
        }
        Ok(report)
    }

    async fn profiles(
        &self,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, FriendResponse>, error::SystemError> {
        let users = self.user_repo.find_by_ids(ids).await?;
        Ok(users.into_iter().map(|u| (u.id, FriendResponse::from(u))).collect())
    }

    async fn with_profiles(
        &self,
        user_id: &Uuid,
        requests: Vec<FriendRequestEntity>,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let ids: Vec<Uuid> = requests.iter().map(|r| r.counterpart(user_id)).collect();
        let mut profiles = self.profiles(&ids).await?;

        Ok(requests
            .into_iter()
            .map(|r| {
                let other = profiles.remove(&r.counterpart(user_id));
                FriendRequestResponse::from_entity(r, user_id, other)
            })
            .collect())
    }

    pub async fn get_received_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let requests = self.friend_repo.find_received(&user_id, Pending).await?;
        self.with_profiles(&user_id, requests).await
    }

    pub async fn get_sent_requests(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendRequestResponse>, error::SystemError> {
        let requests = self.friend_repo.find_sent(&user_id, Pending).await?;
        self.with_profiles(&user_id, requests).await
    }

    /// Friends of `user_id` in acceptance order.
    pub async fn get_friends(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<FriendResponse>, error::SystemError> {
        let user = self.find_user(&user_id).await?;
        let mut profiles = self.profiles(&user.friends).await?;

        Ok(user.friends.iter().filter_map(|id| profiles.remove(id)).collect())
    }

    /// People the caller has no relationship with yet: not the caller, not
    /// a friend, not blocked by the caller, and not on the other side of any
    /// friend request involving the caller.
    pub async fn get_new_people(
        &self,
        user_id: Uuid,
        search: Option<String>,
        limit: Option<i64>,
    ) -> Result<Vec<FriendResponse>, error::SystemError> {
        let (user, requests) = tokio::try_join!(
            self.find_user(&user_id),
            self.friend_repo.find_involving(&user_id),
        )?;

        let exclude: HashSet<Uuid> = std::iter::once(user_id)
            .chain(user.friends.iter().copied())
            .chain(user.blocked_users.iter().copied())
            .chain(requests.iter().map(|r| r.counterpart(&user_id)))
            .collect();
        let exclude: Vec<Uuid> = exclude.into_iter().collect();

        let limit = limit.unwrap_or(self.new_people_limit).clamp(1, NEW_PEOPLE_MAX_LIMIT);
        let search = search.as_deref().map(str::trim).unwrap_or_default();

        let people = self.user_repo.find_new_people(&exclude, search, limit).await?;
        Ok(people.into_iter().map(FriendResponse::from).collect())
    }

    pub async fn search_people(
        &self,
        user_id: Uuid,
        search: String,
        limit: Option<i64>,
    ) -> Result<Vec<FriendResponse>, error::SystemError> {
        if search.trim().is_empty() {
            return Err(error::SystemError::bad_request("Search cannot be empty"));
        }
        self.get_new_people(user_id, Some(search), limit).await
    }

    pub async fn block_user(
        &self,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), error::SystemError> {
        ensure_distinct(&user_id, &target_id, "You can't block yourself")?;

        let (user, _target) =
            tokio::try_join!(self.find_user(&user_id), self.find_user(&target_id))?;
        if user.has_blocked(&target_id) {
            return Err(error::SystemError::conflict("User already blocked"));
        }

        if !self.user_repo.push_blocked(&user_id, &target_id).await? {
            return Err(error::SystemError::conflict("User already blocked"));
        }

        tracing::info!(user = %user_id, blocked = %target_id, "user blocked");
        Ok(())
    }

    pub async fn unblock_user(
        &self,
        user_id: Uuid,
        target_id: Uuid,
    ) -> Result<(), error::SystemError> {
        if !self.user_repo.pull_blocked(&user_id, &target_id).await? {
            return Err(error::SystemError::conflict("User not blocked"));
        }

        tracing::info!(user = %user_id, unblocked = %target_id, "user unblocked");
        Ok(())
    }

    /// Blocked users sorted by id.
    pub async fn get_blocked_users(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<BlockedUserResponse>, error::SystemError> {
        let user = self.find_user(&user_id).await?;
        let mut blocked: Vec<BlockedUserResponse> = self
            .user_repo
            .find_by_ids(&user.blocked_users)
            .await?
            .into_iter()
            .map(BlockedUserResponse::from)
            .collect();

        blocked.sort_by_key(|u| u.id);
        Ok(blocked)
    }
}
