use actix_web::{delete, get, post, put, web, HttpRequest};
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_claims,
    modules::friend::{
        model::{
            BlockedUserResponse, FriendRequestResponse, FriendResponse, NewPeopleQuery,
            ReconcileReport, SearchPeopleQuery,
        },
        schema::FriendRequestEntity,
        service::FriendService,
    },
    utils::ValidatedQuery,
};

type Response<T> = Result<success::Success<T>, error::Error>;

#[post("/send/{to_user_id}")]
pub async fn send_friend_request(
    friend_service: web::Data<FriendService>,
    to_user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Response<FriendRequestEntity> {
    let sender_id = get_claims(&req)?.sub;
    let request = friend_service.send_friend_request(sender_id, *to_user_id).await?;
    Ok(success::Success::created(Some(request)).message("Friend request sent"))
}

#[put("/accept/{from_user_id}")]
pub async fn accept_friend_request(
    friend_service: web::Data<FriendService>,
    from_user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Response<FriendRequestEntity> {
    let receiver_id = get_claims(&req)?.sub;
    let request = friend_service.accept_friend_request(receiver_id, *from_user_id).await?;
    Ok(success::Success::ok(Some(request)).message("Friend request accepted"))
}

#[put("/decline/{from_user_id}")]
pub async fn decline_friend_request(
    friend_service: web::Data<FriendService>,
    from_user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Response<FriendRequestEntity> {
    let receiver_id = get_claims(&req)?.sub;
    let request = friend_service.decline_friend_request(receiver_id, *from_user_id).await?;
    Ok(success::Success::ok(Some(request)).message("Friend request declined"))
}

#[put("/cancel/{to_user_id}")]
pub async fn cancel_friend_request(
    friend_service: web::Data<FriendService>,
    to_user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Response<FriendRequestEntity> {
    let sender_id = get_claims(&req)?.sub;
    let request = friend_service.cancel_friend_request(sender_id, *to_user_id).await?;
    Ok(success::Success::ok(Some(request)).message("Friend request cancelled"))
}

#[put("/block/{from_user_id}")]
pub async fn block_friend_request(
    friend_service: web::Data<FriendService>,
    from_user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Response<FriendRequestEntity> {
    let receiver_id = get_claims(&req)?.sub;
    let request = friend_service.block_friend_request(receiver_id, *from_user_id).await?;
    Ok(success::Success::ok(Some(request)).message("Friend request blocked"))
}

#[put("/unblock/{from_user_id}")]
pub async fn unblock_friend_request(
    friend_service: web::Data<FriendService>,
    from_user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Response<()> {
    let receiver_id = get_claims(&req)?.sub;
    friend_service.unblock_friend_request(receiver_id, *from_user_id).await?;
    Ok(success::Success::ok(None).message("Friend request unblocked"))
}

#[put("/unfriend/{user_id}")]
pub async fn unfriend(
    friend_service: web::Data<FriendService>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Response<()> {
    let caller_id = get_claims(&req)?.sub;
    friend_service.unfriend(caller_id, *user_id).await?;
    Ok(success::Success::ok(None).message("Unfriended"))
}

#[put("/reconcile")]
pub async fn reconcile_friends(
    friend_service: web::Data<FriendService>,
    req: HttpRequest,
) -> Response<ReconcileReport> {
    let user_id = get_claims(&req)?.sub;
    let report = friend_service.reconcile_friends(user_id).await?;
    Ok(success::Success::ok(Some(report)).message("Friend links reconciled"))
}

#[get("/receive/friendreqs")]
pub async fn list_received_requests(
    friend_service: web::Data<FriendService>,
    req: HttpRequest,
) -> Response<Vec<FriendRequestResponse>> {
    let user_id = get_claims(&req)?.sub;
    let requests = friend_service.get_received_requests(user_id).await?;
    let total = requests.len();
    Ok(success::Success::ok(Some(requests)).total(total))
}

#[get("/send/friendreqs")]
pub async fn list_sent_requests(
    friend_service: web::Data<FriendService>,
    req: HttpRequest,
) -> Response<Vec<FriendRequestResponse>> {
    let user_id = get_claims(&req)?.sub;
    let requests = friend_service.get_sent_requests(user_id).await?;
    let total = requests.len();
    Ok(success::Success::ok(Some(requests)).total(total))
}

#[get("/newpeople")]
pub async fn new_people(
    friend_service: web::Data<FriendService>,
    query: ValidatedQuery<NewPeopleQuery>,
    req: HttpRequest,
) -> Response<Vec<FriendResponse>> {
    let user_id = get_claims(&req)?.sub;
    let NewPeopleQuery { search, limit } = query.0;
    let people = friend_service.get_new_people(user_id, search, limit).await?;
    Ok(success::Success::ok(Some(people)))
}

#[get("/search")]
pub async fn search_people(
    friend_service: web::Data<FriendService>,
    query: ValidatedQuery<SearchPeopleQuery>,
    req: HttpRequest,
) -> Response<Vec<FriendResponse>> {
    let user_id = get_claims(&req)?.sub;
    let SearchPeopleQuery { search, limit } = query.0;
    let people = friend_service.search_people(user_id, search, limit).await?;
    Ok(success::Success::ok(Some(people)))
}

#[get("/all/{user_id}")]
pub async fn list_friends(
    friend_service: web::Data<FriendService>,
    user_id: web::Path<Uuid>,
) -> Response<Vec<FriendResponse>> {
    let friends = friend_service.get_friends(*user_id).await?;
    let total = friends.len();
    Ok(success::Success::ok(Some(friends)).total(total))
}

#[get("")]
pub async fn list_blocked_users(
    friend_service: web::Data<FriendService>,
    req: HttpRequest,
) -> Response<Vec<BlockedUserResponse>> {
    let user_id = get_claims(&req)?.sub;
    let blocked = friend_service.get_blocked_users(user_id).await?;
    let total = blocked.len();
    Ok(success::Success::ok(Some(blocked)).total(total))
}

#[post("/{user_id}")]
pub async fn block_user(
    friend_service: web::Data<FriendService>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Response<()> {
    let caller_id = get_claims(&req)?.sub;
    friend_service.block_user(caller_id, *user_id).await?;
    Ok(success::Success::ok(None).message(format!("User {} blocked", user_id)))
}

#[delete("/{user_id}")]
pub async fn unblock_user(
    friend_service: web::Data<FriendService>,
    user_id: web::Path<Uuid>,
    req: HttpRequest,
) -> Response<()> {
    let caller_id = get_claims(&req)?.sub;
    friend_service.unblock_user(caller_id, *user_id).await?;
    Ok(success::Success::ok(None).message(format!("User {} unblocked", user_id)))
}
