use actix_web::{web, HttpRequest, HttpResponse, Responder};
use liap_core::Position;
use liap_persist::GameRepository;
use liap_rooms::{Lobby, RoomError};
use serde::Deserialize;

fn room_error_response(err: RoomError) -> HttpResponse {
    match err {
        RoomError::NotFound => HttpResponse::NotFound().body(err.to_string()),
        RoomError::Full | RoomError::AtCapacity | RoomError::NameTaken(_) | RoomError::SeatOccupied(_) | RoomError::NotABot(_) => {
            HttpResponse::Conflict().body(err.to_string())
        }
        RoomError::NotHost => HttpResponse::Forbidden().body(err.to_string()),
        RoomError::Token(_) => HttpResponse::Unauthorized().body(err.to_string()),
        RoomError::Game(_) => HttpResponse::BadRequest().body(err.to_string()),
    }
}

pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

pub async fn room_list<R: GameRepository + 'static>(lobby: web::Data<Lobby<R>>) -> impl Responder {
    HttpResponse::Ok().json(lobby.room_list().await)
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub room_name: String,
    pub player_name: String,
    #[serde(default)]
    pub is_public: bool,
}

pub async fn create_room<R: GameRepository + 'static>(
    lobby: web::Data<Lobby<R>>,
    body: web::Json<CreateRoomRequest>,
) -> impl Responder {
    let body = body.into_inner();
    match lobby.create_room(body.room_name, &body.player_name, body.is_public).await {
        Ok((room, position)) => HttpResponse::Ok().json(serde_json::json!({ "room_id": room.code, "position": position })),
        Err(e) => room_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub player_name: String,
}

pub async fn join_room<R: GameRepository + 'static>(
    lobby: web::Data<Lobby<R>>,
    path: web::Path<String>,
    body: web::Json<JoinRoomRequest>,
) -> impl Responder {
    match lobby.join_room(&path.into_inner(), &body.player_name).await {
        Ok((room, position)) => HttpResponse::Ok().json(serde_json::json!({ "room_id": room.code, "position": position })),
        Err(e) => room_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct SeatRequest {
    pub position: Position,
}

pub async fn leave_room<R: GameRepository + 'static>(
    lobby: web::Data<Lobby<R>>,
    path: web::Path<String>,
    body: web::Json<SeatRequest>,
) -> impl Responder {
    let Some(room) = lobby.get_by_code(&path.into_inner()).await else {
        return room_error_response(RoomError::NotFound);
    };
    match lobby.leave_room(room.id, body.position).await {
        Ok(outcome) => HttpResponse::Ok().json(serde_json::json!({ "outcome": format!("{outcome:?}") })),
        Err(e) => room_error_response(e),
    }
}

pub async fn start_game<R: GameRepository + 'static>(
    lobby: web::Data<Lobby<R>>,
    path: web::Path<String>,
    body: web::Json<SeatRequest>,
) -> impl Responder {
    let Some(room) = lobby.get_by_code(&path.into_inner()).await else {
        return room_error_response(RoomError::NotFound);
    };
    match lobby.start_game(room.id, body.position).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(e) => room_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct BotRequest {
    pub requester: Position,
    pub target: Position,
}

pub async fn add_bot<R: GameRepository + 'static>(
    lobby: web::Data<Lobby<R>>,
    path: web::Path<String>,
    body: web::Json<BotRequest>,
) -> impl Responder {
    let Some(room) = lobby.get_by_code(&path.into_inner()).await else {
        return room_error_response(RoomError::NotFound);
    };
    match lobby.add_bot(room.id, body.requester, body.target).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(e) => room_error_response(e),
    }
}

pub async fn remove_bot<R: GameRepository + 'static>(
    lobby: web::Data<Lobby<R>>,
    path: web::Path<String>,
    body: web::Json<BotRequest>,
) -> impl Responder {
    let Some(room) = lobby.get_by_code(&path.into_inner()).await else {
        return room_error_response(RoomError::NotFound);
    };
    match lobby.remove_bot(room.id, body.requester, body.target).await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(e) => room_error_response(e),
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub position: Position,
}

/// Upgrades to a WebSocket and bridges it to the seat named in the query
/// string. The seat must already exist via a prior `create_room`/`join_room`
/// call — this endpoint never assigns one.
pub async fn connect<R: GameRepository + 'static>(
    lobby: web::Data<Lobby<R>>,
    path: web::Path<String>,
    query: web::Query<ConnectQuery>,
    body: web::Payload,
    req: HttpRequest,
) -> impl Responder {
    let Some(room) = lobby.get_by_code(&path.into_inner()).await else {
        return room_error_response(RoomError::NotFound);
    };
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            let lobby = lobby.into_inner();
            let position = query.position;
            tokio::spawn(async move { lobby.bridge(room, position, session, stream).await });
            response
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ReconnectQuery {
    pub token: String,
}

/// Upgrades to a WebSocket and redeems a reconnection token minted on an
/// earlier `connected` frame, resuming whichever seat it names.
pub async fn reconnect<R: GameRepository + 'static>(
    lobby: web::Data<Lobby<R>>,
    query: web::Query<ReconnectQuery>,
    body: web::Payload,
    req: HttpRequest,
) -> impl Responder {
    match actix_ws::handle(&req, body) {
        Ok((response, session, stream)) => {
            let lobby = lobby.into_inner();
            let token = query.into_inner().token;
            tokio::spawn(async move {
                if let Err(e) = lobby.reconnect(&token, session, stream).await {
                    log::debug!("reconnect failed: {e}");
                }
            });
            response
        }
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
