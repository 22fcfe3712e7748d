use std::sync::Arc;
use rocket::{State, get, post, catchers, routes, http::Status, serde::json::Json, Build, Rocket};
use tracing::{info, warn, instrument};
use shared::{models::*, user_info::UserInfo};
use crate::{
    catchers::{bad_request, internal_error, not_found, too_many_requests, unauthorized, unprocessable},
    config::Config,
    cors::Cors,
    error::ApiError,
    ledger::MemberLedger,
    raffle::RaffleEngine,
    rate_limiter::LoginThrottle,
    session::{Admin, AdminGate},
    store::RowStore,
    utils::run_blocking,
};

pub struct AppState {
    pub ledger: Arc<MemberLedger>,
    pub raffle: Arc<RaffleEngine>,
    pub admin: AdminGate,
    pub login_throttle: LoginThrottle,
}

impl AppState {
    pub fn new(store: Arc<dyn RowStore>, config: &Config) -> Self {
        Self {
            ledger: Arc::new(MemberLedger::new(Arc::clone(&store), config.members.clone())),
            raffle: Arc::new(RaffleEngine::new(store, config.raffle.clone())),
            admin: AdminGate::new(config.admin_password.clone(), config.session_ttl),
            login_throttle: LoginThrottle::default(),
        }
    }
}

#[instrument(skip(state, request, user_info))]
#[post("/admin/login", format = "json", data = "<request>")]
pub async fn login(
    state: &State<AppState>,
    request: Json<LoginRequest>,
    user_info: UserInfo,
) -> Result<Json<AdminSession>, ApiError> {
    let throttle_key = format!("login:{}", user_info.ip);
    state.login_throttle
        .check(&throttle_key)
        .map_err(|e| ApiError::RateLimited(e.to_string()))?;

    match state.admin.login(&request.password) {
        Ok(session) => {
            state.login_throttle.reset(&throttle_key);
            info!("🔐 Admin login from {}", user_info.ip);
            Ok(Json(session))
        }
        Err(e) => {
            state.login_throttle.record_failure(&throttle_key);
            warn!(
                "Failed admin login from {} [{}] ({} attempts left)",
                user_info.ip,
                user_info.fingerprint,
                state.login_throttle.remaining_attempts(&throttle_key)
            );
            Err(e.into())
        }
    }
}

#[post("/admin/logout")]
pub async fn logout(state: &State<AppState>, admin: Admin) -> Status {
    state.admin.logout(admin.token());
    Status::NoContent
}

#[get("/leaderboard")]
pub async fn leaderboard(state: &State<AppState>) -> Result<Json<Leaderboard>, ApiError> {
    let ledger = Arc::clone(&state.ledger);
    run_blocking(move || ledger.list_ranked()).await.map(Json)
}

#[get("/members")]
pub async fn list_members(state: &State<AppState>, _admin: Admin) -> Result<Json<Vec<Member>>, ApiError> {
    let ledger = Arc::clone(&state.ledger);
    run_blocking(move || ledger.list()).await.map(Json)
}

#[post("/members", format = "json", data = "<request>")]
pub async fn register_member(
    state: &State<AppState>,
    _admin: Admin,
    request: Json<RegisterMemberRequest>,
) -> Result<(Status, Json<Member>), ApiError> {
    let ledger = Arc::clone(&state.ledger);
    let nickname = request.into_inner().nickname;
    run_blocking(move || ledger.register(&nickname))
        .await
        .map(|member| (Status::Created, Json(member)))
}

#[post("/members/<nickname>/points", format = "json", data = "<request>")]
pub async fn apply_points(
    state: &State<AppState>,
    _admin: Admin,
    nickname: &str,
    request: Json<PointsDeltaRequest>,
) -> Result<Json<Member>, ApiError> {
    let ledger = Arc::clone(&state.ledger);
    let nickname = nickname.to_string();
    let delta = request.delta;
    run_blocking(move || ledger.apply_delta(&nickname, delta)).await.map(Json)
}

#[post("/raffle/entrants", format = "json", data = "<request>")]
pub async fn register_entrant(
    state: &State<AppState>,
    request: Json<RegisterEntrantRequest>,
) -> Result<(Status, Json<RaffleEntrant>), ApiError> {
    let raffle = Arc::clone(&state.raffle);
    let RegisterEntrantRequest { name, email } = request.into_inner();
    run_blocking(move || raffle.register(&name, &email))
        .await
        .map(|entrant| (Status::Created, Json(entrant)))
}

#[get("/raffle/entrants")]
pub async fn list_entrants(state: &State<AppState>, _admin: Admin) -> Result<Json<Vec<RaffleEntrant>>, ApiError> {
    let raffle = Arc::clone(&state.raffle);
    run_blocking(move || raffle.entrants()).await.map(Json)
}

#[get("/raffle/pool")]
pub async fn eligible_pool(state: &State<AppState>, _admin: Admin) -> Result<Json<Vec<RaffleEntrant>>, ApiError> {
    let raffle = Arc::clone(&state.raffle);
    run_blocking(move || raffle.eligible_pool()).await.map(Json)
}

#[post("/raffle/draw", format = "json", data = "<request>")]
pub async fn draw(
    state: &State<AppState>,
    _admin: Admin,
    request: Json<DrawRequest>,
) -> Result<Json<RaffleDraw>, ApiError> {
    let raffle = Arc::clone(&state.raffle);
    let count = request.count;
    run_blocking(move || raffle.draw(count, &mut rand::thread_rng())).await.map(Json)
}

#[post("/raffle/commit", format = "json", data = "<request>")]
pub async fn commit(
    state: &State<AppState>,
    _admin: Admin,
    request: Json<CommitRequest>,
) -> Result<Json<CommitReport>, ApiError> {
    let raffle = Arc::clone(&state.raffle);
    let winners = request.into_inner().winners;
    run_blocking(move || raffle.commit(&winners)).await.map(Json)
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

pub fn build_rocket(state: AppState, cors: Cors) -> Rocket<Build> {
    rocket::build()
        .attach(cors)
        .manage(state)
        .mount(
            "/api",
            routes![
                login,
                logout,
                leaderboard,
                list_members,
                register_member,
                apply_points,
                register_entrant,
                list_entrants,
                eligible_pool,
                draw,
                commit,
                all_options
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                not_found,
                unprocessable,
                too_many_requests,
                internal_error
            ],
        )
}
