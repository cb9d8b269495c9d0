// src/api.rs
use crate::auth::{self, CredentialVerifier, Identity, JwtVerifier};
use crate::db::{
    add_watchlist, delete_position, find_user, get_position, insert_user, list_portfolio,
    list_watchlist, remove_watchlist, upsert_position, DbError,
};
use crate::error::ApiError;
use crate::models::{CoinData, Credentials, PortfolioUpdateRequest, User, WatchlistRequest};
use crate::portfolio::{apply_delta, PositionChange};
use log::{error, info};
use scylla::Session;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use warp::{Filter, Rejection, Reply};

pub fn routes(
    session: Arc<Session>,
    verifier: Arc<JwtVerifier>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let guard = auth::with_auth(verifier.clone() as Arc<dyn CredentialVerifier>);

    let liveness = warp::path::end().and(warp::get()).map(|| "API is running");

    let register = warp::path!("register")
        .and(warp::post())
        .and(with_session(session.clone()))
        .and(warp::body::json())
        .and_then(register_handler);

    let login = warp::path!("login")
        .and(warp::post())
        .and(with_session(session.clone()))
        .and(with_verifier(verifier))
        .and(warp::body::json())
        .and_then(login_handler);

    let watchlist = warp::path!("watchlist")
        .and(warp::get())
        .and(guard.clone())
        .and(with_session(session.clone()))
        .and_then(watchlist_handler);

    let watchlist_add = warp::path!("watchlist" / "add")
        .and(warp::put())
        .and(guard.clone())
        .and(with_session(session.clone()))
        .and(warp::body::json())
        .and_then(watchlist_add_handler);

    let watchlist_remove = warp::path!("watchlist" / "remove")
        .and(warp::put())
        .and(guard.clone())
        .and(with_session(session.clone()))
        .and(warp::body::json())
        .and_then(watchlist_remove_handler);

    let portfolio = warp::path!("portfolio")
        .and(warp::get())
        .and(guard.clone())
        .and(with_session(session.clone()))
        .and_then(portfolio_handler);

    let portfolio_update = warp::path!("portfolio" / "update")
        .and(warp::put())
        .and(guard)
        .and(with_session(session))
        .and(warp::body::json())
        .and_then(portfolio_update_handler);

    liveness
        .or(register)
        .or(login)
        .or(watchlist)
        .or(watchlist_add)
        .or(watchlist_remove)
        .or(portfolio)
        .or(portfolio_update)
}

fn with_session(
    session: Arc<Session>,
) -> impl Filter<Extract = (Arc<Session>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || session.clone())
}

fn with_verifier(
    verifier: Arc<JwtVerifier>,
) -> impl Filter<Extract = (Arc<JwtVerifier>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || verifier.clone())
}

fn db_rejection(e: DbError) -> Rejection {
    error!("Data store error: {}", e);
    warp::reject::custom(ApiError::Database(e.to_string()))
}

async fn register_handler(
    session: Arc<Session>,
    credentials: Credentials,
) -> Result<impl Reply, Rejection> {
    match find_user(&session, &credentials.username).await {
        Ok(Some(_)) => Err(warp::reject::custom(ApiError::Conflict(
            "User Already Exists".to_string(),
        ))),
        Ok(None) => {
            let password_hash =
                auth::hash_password(&credentials.password).map_err(warp::reject::custom)?;
            let user = User {
                id: Uuid::new_v4().to_string(),
                username: credentials.username,
                password_hash,
            };
            match insert_user(&session, &user).await {
                Ok(()) => {
                    info!("Registered user {}", user.username);
                    Ok(warp::reply::json(
                        &json!({ "message": "User Registered Successfully" }),
                    ))
                }
                Err(e) => Err(db_rejection(e)),
            }
        }
        Err(e) => Err(db_rejection(e)),
    }
}

async fn login_handler(
    session: Arc<Session>,
    verifier: Arc<JwtVerifier>,
    credentials: Credentials,
) -> Result<impl Reply, Rejection> {
    let user = find_user(&session, &credentials.username)
        .await
        .map_err(db_rejection)?;

    // Unknown usernames and wrong passwords fail identically.
    let user = match user {
        Some(user) if auth::verify_password(&credentials.password, &user.password_hash) => user,
        _ => return Err(warp::reject::custom(ApiError::Credentials)),
    };

    let identity = Identity {
        id: user.id,
        username: user.username,
    };
    let token = verifier
        .create_token(&identity)
        .map_err(warp::reject::custom)?;

    info!("User {} logged in", identity.username);
    Ok(warp::reply::json(&json!({
        "message": "Login successful",
        "token": token,
        "user": { "id": identity.id, "username": identity.username },
    })))
}

async fn watchlist_handler(user: Identity, session: Arc<Session>) -> Result<impl Reply, Rejection> {
    let coins = list_watchlist(&session, &user.id)
        .await
        .map_err(db_rejection)?;
    Ok(warp::reply::json(&json!({ "watchlist": coins })))
}

async fn watchlist_add_handler(
    user: Identity,
    session: Arc<Session>,
    request: WatchlistRequest,
) -> Result<impl Reply, Rejection> {
    add_watchlist(&session, &user.id, &request.coin)
        .await
        .map_err(db_rejection)?;
    info!("User {} is now watching {}", user.username, request.coin);
    let coins = list_watchlist(&session, &user.id)
        .await
        .map_err(db_rejection)?;
    Ok(warp::reply::json(&json!({ "watchlist": coins })))
}

async fn watchlist_remove_handler(
    user: Identity,
    session: Arc<Session>,
    request: WatchlistRequest,
) -> Result<impl Reply, Rejection> {
    // Removing an absent coin is not an error.
    remove_watchlist(&session, &user.id, &request.coin)
        .await
        .map_err(db_rejection)?;
    info!("User {} stopped watching {}", user.username, request.coin);
    let coins = list_watchlist(&session, &user.id)
        .await
        .map_err(db_rejection)?;
    Ok(warp::reply::json(&json!({ "watchlist": coins })))
}

async fn fetch_portfolio(
    session: &Session,
    user_id: &str,
) -> Result<HashMap<String, CoinData>, DbError> {
    Ok(list_portfolio(session, user_id).await?.into_iter().collect())
}

async fn portfolio_handler(user: Identity, session: Arc<Session>) -> Result<impl Reply, Rejection> {
    let portfolio = fetch_portfolio(&session, &user.id)
        .await
        .map_err(db_rejection)?;
    Ok(warp::reply::json(&portfolio))
}

async fn portfolio_update_handler(
    user: Identity,
    session: Arc<Session>,
    request: PortfolioUpdateRequest,
) -> Result<impl Reply, Rejection> {
    if request.coin.is_empty() {
        return Err(warp::reject::custom(ApiError::Invalid(
            "Invalid input data".to_string(),
        )));
    }

    let existing = get_position(&session, &user.id, &request.coin)
        .await
        .map_err(db_rejection)?;
    let change = apply_delta(existing, request.coin_data).map_err(warp::reject::custom)?;

    match change {
        PositionChange::Write(position) => {
            upsert_position(&session, &user.id, &request.coin, position)
                .await
                .map_err(db_rejection)?;
            info!(
                "User {} now holds {} {} ({} invested)",
                user.username, position.coins, request.coin, position.total_investment
            );
        }
        PositionChange::Remove => {
            delete_position(&session, &user.id, &request.coin)
                .await
                .map_err(db_rejection)?;
            info!("User {} closed position in {}", user.username, request.coin);
        }
        PositionChange::Noop => {}
    }

    let portfolio = fetch_portfolio(&session, &user.id)
        .await
        .map_err(db_rejection)?;
    Ok(warp::reply::json(&portfolio))
}
