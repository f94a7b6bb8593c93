//! Startup data: the bootstrap admin account and, optionally, sample
//! stadiums, matches and seat categories for an empty database.

use chrono::{Duration, Utc};
use sqlx::{types::Json, PgPool};
use tracing::info;

use crate::{
    config::Config,
    error::AppResult,
    models::{PriceHistory, User},
    services::auth::hash_password,
};

struct SampleStadium {
    name: &'static str,
    city: &'static str,
    country: &'static str,
    capacity: i32,
    rows: i32,
    seats_per_row: i32,
    pitch_type: &'static str,
    amenities: &'static [&'static str],
}

struct SampleMatch {
    team1: &'static str,
    team2: &'static str,
    /// Index into `STADIUMS`.
    stadium: usize,
    days_ahead: i64,
    match_type: &'static str,
    tournament: &'static str,
    prices: (f64, f64, f64),
    weather: &'static str,
}

const STADIUMS: [SampleStadium; 3] = [
    SampleStadium {
        name: "Lord's Cricket Ground",
        city: "London",
        country: "England",
        capacity: 30000,
        rows: 30,
        seats_per_row: 50,
        pitch_type: "Batting",
        amenities: &["Premium Restaurant", "VIP Lounge", "Museum", "Wi-Fi"],
    },
    SampleStadium {
        name: "Melbourne Cricket Ground",
        city: "Melbourne",
        country: "Australia",
        capacity: 100000,
        rows: 40,
        seats_per_row: 60,
        pitch_type: "Balanced",
        amenities: &["Food Courts", "Sports Bar", "Medical Center"],
    },
    SampleStadium {
        name: "Eden Gardens",
        city: "Kolkata",
        country: "India",
        capacity: 66000,
        rows: 35,
        seats_per_row: 55,
        pitch_type: "Bowling",
        amenities: &["Fan Shop", "Press Box", "Player Lounge"],
    },
];

const MATCHES: [SampleMatch; 4] = [
    SampleMatch {
        team1: "England",
        team2: "Australia",
        stadium: 0,
        days_ahead: 5,
        match_type: "ODI",
        tournament: "Cricket World Cup 2025",
        prices: (75.0, 150.0, 250.0),
        weather: "Sunny, 26°C",
    },
    SampleMatch {
        team1: "India",
        team2: "Pakistan",
        stadium: 1,
        days_ahead: 10,
        match_type: "T20",
        tournament: "Asia Cup 2025",
        prices: (85.0, 170.0, 300.0),
        weather: "Cloudy, 24°C",
    },
    SampleMatch {
        team1: "New Zealand",
        team2: "South Africa",
        stadium: 2,
        days_ahead: 15,
        match_type: "Test",
        tournament: "Championship Test",
        prices: (65.0, 130.0, 200.0),
        weather: "Clear, 28°C",
    },
    SampleMatch {
        team1: "Australia",
        team2: "West Indies",
        stadium: 0,
        days_ahead: 20,
        match_type: "T20",
        tournament: "ICC T20 Series",
        prices: (70.0, 140.0, 220.0),
        weather: "Overcast, 22°C",
    },
];

const SEAT_CATEGORIES: [(&str, &str, &[&str], &str); 3] = [
    ("Regular", "Standard stand seating", &["Great view of the pitch"], "#28a745"),
    ("VIP", "Covered seating close to the pavilion", &["Covered stand", "Complimentary snacks"], "#ffc107"),
    ("Premium", "Hospitality boxes", &["Lounge access", "Catered meals", "Reserved parking"], "#6f42c1"),
];

pub async fn run(pool: &PgPool, config: &Config) -> AppResult<()> {
    ensure_admin(pool, config).await?;
    if config.features.seed_sample_data {
        seed_sample_data(pool).await?;
    }
    Ok(())
}

async fn ensure_admin(pool: &PgPool, config: &Config) -> AppResult<()> {
    if User::find_by_email(&config.auth.admin_email, pool).await?.is_some() {
        return Ok(());
    }

    let hash = hash_password(config.auth.admin_password.clone(), config.auth.bcrypt_cost).await?;
    User::insert(pool, "Admin", &config.auth.admin_email, &hash, None, true).await?;
    info!("Admin user {} created", config.auth.admin_email);
    Ok(())
}

async fn seed_sample_data(pool: &PgPool) -> AppResult<()> {
    let has_stadiums: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM stadiums)")
        .fetch_one(pool)
        .await?;
    if has_stadiums {
        return Ok(());
    }

    let mut tx = pool.begin().await?;

    let mut stadium_ids = Vec::with_capacity(STADIUMS.len());
    for stadium in &STADIUMS {
        let amenities: Vec<String> = stadium.amenities.iter().map(|a| a.to_string()).collect();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO stadiums (name, city, country, capacity, rows, seats_per_row, pitch_type, amenities)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING id",
        )
        .bind(stadium.name)
        .bind(stadium.city)
        .bind(stadium.country)
        .bind(stadium.capacity)
        .bind(stadium.rows)
        .bind(stadium.seats_per_row)
        .bind(stadium.pitch_type)
        .bind(Json(amenities))
        .fetch_one(&mut *tx)
        .await?;
        stadium_ids.push(id);
    }

    let now = Utc::now().naive_utc();
    for sample in &MATCHES {
        let (regular, vip, premium) = sample.prices;
        let match_id: i64 = sqlx::query_scalar(
            "INSERT INTO matches
                (team1, team2, stadium_id, match_date, match_type, tournament,
                 ticket_price, vip_price, premium_price, weather_forecast, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 'Upcoming')
             RETURNING id",
        )
        .bind(sample.team1)
        .bind(sample.team2)
        .bind(stadium_ids[sample.stadium])
        .bind(now + Duration::days(sample.days_ahead))
        .bind(sample.match_type)
        .bind(sample.tournament)
        .bind(regular)
        .bind(vip)
        .bind(premium)
        .bind(sample.weather)
        .fetch_one(&mut *tx)
        .await?;

        PriceHistory::record(
            &mut *tx,
            match_id,
            &[("Regular", regular), ("VIP", vip), ("Premium", premium)],
            "Initial price",
        )
        .await?;
    }

    for (name, description, benefits, color) in SEAT_CATEGORIES {
        let benefits: Vec<String> = benefits.iter().map(|b| b.to_string()).collect();
        sqlx::query(
            "INSERT INTO seat_categories (name, description, benefits, color_code) VALUES ($1, $2, $3, $4)",
        )
        .bind(name)
        .bind(description)
        .bind(Json(benefits))
        .bind(color)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    info!(
        "Sample data added: {} stadiums, {} matches, {} seat categories",
        STADIUMS.len(),
        MATCHES.len(),
        SEAT_CATEGORIES.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_matches_point_at_sample_stadiums() {
        assert!(MATCHES.iter().all(|m| m.stadium < STADIUMS.len()));
        assert!(MATCHES.iter().all(|m| m.days_ahead > 0));
    }

    #[test]
    fn sample_capacity_covers_the_seat_grid() {
        for stadium in &STADIUMS {
            assert!(stadium.rows * stadium.seats_per_row <= stadium.capacity, "{}", stadium.name);
        }
    }
}
