use crate::modules::friend::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/friendreq")
            .service(list_sent_requests)
            .service(list_received_requests)
            .service(send_friend_request)
            .service(accept_friend_request)
            .service(decline_friend_request)
            .service(cancel_friend_request)
            .service(block_friend_request)
            .service(unblock_friend_request)
            .service(unfriend)
            .service(reconcile_friends)
            .service(new_people)
            .service(search_people)
            .service(list_friends),
    )
    .service(
        scope("/blocked").service(list_blocked_users).service(block_user).service(unblock_user),
    );
}
