//! Probabilistic "email already registered?" check in front of the database.

use anyhow::{Context, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

// a panic while holding the lock leaves the filter usable
fn read() -> RwLockReadGuard<'static, CuckooFilter<String>> {
    EMAIL_FILTER.read().unwrap_or_else(|e| e.into_inner())
}

fn write() -> RwLockWriteGuard<'static, CuckooFilter<String>> {
    EMAIL_FILTER.write().unwrap_or_else(|e| e.into_inner())
}

/// False positives possible, false negatives not.
pub fn might_exist(email: &str) -> bool {
    read().contains(&normalize(email))
}

pub fn insert(email: &str) {
    write().add(&normalize(email));
}

/// Streams every registered email into the filter.
pub async fn warmup_email_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM workers").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row.context("worker email fetch failed")?;
        batch.push(normalize(&email));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    tracing::info!(total, "Email filter warmup complete");
    Ok(())
}

fn insert_batch(emails: &[String]) {
    let mut filter = write();
    for email in emails {
        filter.add(email);
    }
}
