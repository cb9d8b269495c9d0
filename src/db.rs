// src/db.rs
use crate::models::{CoinData, User};
use log::info;
use scylla::frame::response::result::Row;
use scylla::{query::Query, Session, SessionBuilder};

pub type DbError = Box<dyn std::error::Error + Send + Sync>;

pub async fn init(node: &str) -> Result<Session, DbError> {
    let session = SessionBuilder::new().known_node(node).build().await?;

    // Create keyspace and tables if they don't exist
    session.query("CREATE KEYSPACE IF NOT EXISTS crypto_tracker WITH REPLICATION = {'class': 'SimpleStrategy', 'replication_factor': 1}", &[]).await?;
    session.query("CREATE TABLE IF NOT EXISTS crypto_tracker.users (username TEXT PRIMARY KEY, id TEXT, password_hash TEXT)", &[]).await?;
    session.query("CREATE TABLE IF NOT EXISTS crypto_tracker.watchlist (user_id TEXT, coin TEXT, PRIMARY KEY (user_id, coin))", &[]).await?;
    session.query("CREATE TABLE IF NOT EXISTS crypto_tracker.portfolio (user_id TEXT, coin TEXT, total_investment DOUBLE, coins DOUBLE, PRIMARY KEY (user_id, coin))", &[]).await?;

    info!("Successfully connected to ScyllaDB.");
    Ok(session)
}

fn read_text(row: &Row, idx: usize) -> Result<String, DbError> {
    row.columns[idx]
        .as_ref()
        .and_then(|value| value.as_text())
        .map(|text| text.to_string())
        .ok_or_else(|| format!("Missing text value in column {}", idx).into())
}

fn read_double(row: &Row, idx: usize) -> Result<f64, DbError> {
    row.columns[idx]
        .as_ref()
        .and_then(|value| value.as_double())
        .ok_or_else(|| format!("Missing double value in column {}", idx).into())
}

pub async fn find_user(session: &Session, username: &str) -> Result<Option<User>, DbError> {
    let query =
        Query::new("SELECT username, id, password_hash FROM crypto_tracker.users WHERE username = ?");
    let result = session.query(query, (username,)).await?;
    let row = match result.rows.and_then(|rows| rows.into_iter().next()) {
        Some(row) => row,
        None => return Ok(None),
    };
    Ok(Some(User {
        username: read_text(&row, 0)?,
        id: read_text(&row, 1)?,
        password_hash: read_text(&row, 2)?,
    }))
}

pub async fn insert_user(session: &Session, user: &User) -> Result<(), DbError> {
    let query =
        Query::new("INSERT INTO crypto_tracker.users (username, id, password_hash) VALUES (?, ?, ?)");
    session
        .query(
            query,
            (
                user.username.as_str(),
                user.id.as_str(),
                user.password_hash.as_str(),
            ),
        )
        .await?;
    Ok(())
}

pub async fn list_watchlist(session: &Session, user_id: &str) -> Result<Vec<String>, DbError> {
    let query = Query::new("SELECT coin FROM crypto_tracker.watchlist WHERE user_id = ?");
    let result = session.query(query, (user_id,)).await?;
    let mut coins = Vec::new();
    if let Some(rows) = result.rows {
        for row in rows {
            coins.push(read_text(&row, 0)?);
        }
    }
    Ok(coins)
}

// CQL INSERT is an upsert, which gives watchlist add its idempotency.
pub async fn add_watchlist(session: &Session, user_id: &str, coin: &str) -> Result<(), DbError> {
    let query = Query::new("INSERT INTO crypto_tracker.watchlist (user_id, coin) VALUES (?, ?)");
    session.query(query, (user_id, coin)).await?;
    Ok(())
}

pub async fn remove_watchlist(session: &Session, user_id: &str, coin: &str) -> Result<(), DbError> {
    let query = Query::new("DELETE FROM crypto_tracker.watchlist WHERE user_id = ? AND coin = ?");
    session.query(query, (user_id, coin)).await?;
    Ok(())
}

pub async fn get_position(
    session: &Session,
    user_id: &str,
    coin: &str,
) -> Result<Option<CoinData>, DbError> {
    let query = Query::new(
        "SELECT total_investment, coins FROM crypto_tracker.portfolio WHERE user_id = ? AND coin = ?",
    );
    let result = session.query(query, (user_id, coin)).await?;
    let row = match result.rows.and_then(|rows| rows.into_iter().next()) {
        Some(row) => row,
        None => return Ok(None),
    };
    Ok(Some(CoinData {
        total_investment: read_double(&row, 0)?,
        coins: read_double(&row, 1)?,
    }))
}

pub async fn upsert_position(
    session: &Session,
    user_id: &str,
    coin: &str,
    position: CoinData,
) -> Result<(), DbError> {
    let query = Query::new(
        "INSERT INTO crypto_tracker.portfolio (user_id, coin, total_investment, coins) VALUES (?, ?, ?, ?)",
    );
    session
        .query(
            query,
            (user_id, coin, position.total_investment, position.coins),
        )
        .await?;
    Ok(())
}

pub async fn delete_position(session: &Session, user_id: &str, coin: &str) -> Result<(), DbError> {
    let query = Query::new("DELETE FROM crypto_tracker.portfolio WHERE user_id = ? AND coin = ?");
    session.query(query, (user_id, coin)).await?;
    Ok(())
}

pub async fn list_portfolio(
    session: &Session,
    user_id: &str,
) -> Result<Vec<(String, CoinData)>, DbError> {
    let query = Query::new(
        "SELECT coin, total_investment, coins FROM crypto_tracker.portfolio WHERE user_id = ?",
    );
    let result = session.query(query, (user_id,)).await?;
    let mut positions = Vec::new();
    if let Some(rows) = result.rows {
        for row in rows {
            let coin = read_text(&row, 0)?;
            let position = CoinData {
                total_investment: read_double(&row, 1)?,
                coins: read_double(&row, 2)?,
            };
            positions.push((coin, position));
        }
    }
    Ok(positions)
}
