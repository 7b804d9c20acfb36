//! Synthetic records for the `users` and `orders` demo tables

use chrono::{Duration, Local, NaiveDateTime};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use sqlh_core::{Error, Record, Result, record};

const FIRST_NAMES: &[&str] = &["Alice", "Bob", "Charlie", "Diana", "Eve", "Frank"];
const LAST_NAMES: &[&str] = &["Smith", "Johnson", "Williams", "Brown", "Jones"];
const ORDER_STATUSES: &[&str] = &["pending", "processing", "shipped", "delivered", "cancelled"];

/// Random record source; seed it for reproducible values
pub struct SampleDataGenerator {
    rng: StdRng,
}

impl Default for SampleDataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleDataGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Users with ids `1..=count`, created within the last year
    pub fn generate_users(&mut self, count: usize) -> Vec<Record> {
        let now = Local::now().naive_local();
        (1..=count)
            .map(|i| {
                record! {
                    "id" => i as i64,
                    "username" => format!("user{}", i),
                    "email" => format!("user{}@example.com", i),
                    "first_name" => self.pick(FIRST_NAMES),
                    "last_name" => self.pick(LAST_NAMES),
                    "age" => self.rng.random_range(18..=80i64),
                    "active" => self.rng.random_bool(0.5),
                    "created_at" => self.days_before(now, 365),
                }
            })
            .collect()
    }

    /// Orders with ids `1..=count`, each owned by one of `user_ids`
    pub fn generate_orders(&mut self, count: usize, user_ids: &[i64]) -> Result<Vec<Record>> {
        if count > 0 && user_ids.is_empty() {
            return Err(Error::validation(
                "Cannot generate orders without any user ids",
            ));
        }

        let now = Local::now().naive_local();
        let orders = (1..=count)
            .map(|i| {
                let user_id = user_ids[self.rng.random_range(0..user_ids.len())];
                let amount = self.rng.random_range(10.0..=500.0f64);
                record! {
                    "id" => i as i64,
                    "user_id" => user_id,
                    "total_amount" => (amount * 100.0).round() / 100.0,
                    "status" => self.pick(ORDER_STATUSES),
                    "created_at" => self.days_before(now, 90),
                }
            })
            .collect();
        Ok(orders)
    }

    fn pick(&mut self, choices: &[&'static str]) -> &'static str {
        choices.choose(&mut self.rng).copied().unwrap_or_default()
    }

    fn days_before(&mut self, now: NaiveDateTime, max_days: i64) -> NaiveDateTime {
        now - Duration::days(self.rng.random_range(0..=max_days))
    }
}
