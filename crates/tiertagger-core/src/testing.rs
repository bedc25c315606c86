//! In-memory `RankingSource` used by the cache tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tokio::time::Instant;

use crate::api::payload::parse_profile;
use crate::api::{parse_leaderboard, FetchError, Leaderboard, RankingSource};
use crate::models::RankingRecord;

pub const FOO_LEADERBOARD: &str = r#"{"leaderboard":[{"ingameName":"Foo","region":"NA","ranks":{"sword":{"rank":"HT1"}}}]}"#;

pub const TWO_PLAYER_LEADERBOARD: &str = r#"{"leaderboard":[
    {"ingameName":"Foo","region":"EU","totalPoints":50,"ranks":{"sword":{"rank":"LT2"}}},
    {"ingameName":"Bar","region":"AS","totalPoints":20,"ranks":{"cpvp":{"rank":"HT3","retired":true}}}
]}"#;

#[derive(Debug, Clone)]
pub enum BulkReply {
    Body(String),
    Fail,
    Hang,
}

#[derive(Debug, Clone)]
pub enum ProfileReply {
    Found(RankingRecord),
    /// Parsed like a real profile response, for the name that was requested.
    FromBody(String),
    NotFound,
    Fail,
}

#[derive(Default)]
pub struct FakeSource {
    bulk: Mutex<VecDeque<BulkReply>>,
    bulk_default: Mutex<Option<BulkReply>>,
    bulk_calls: Mutex<Vec<Instant>>,
    profiles: Mutex<HashMap<String, ProfileReply>>,
    profile_requests: Mutex<Vec<String>>,
    profile_gate: Option<Arc<Semaphore>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Profile fetches wait for a permit on `gate` before answering.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            profile_gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn push_bulk(&self, reply: BulkReply) -> &Self {
        self.bulk.lock().expect("lock").push_back(reply);
        self
    }

    /// Reply used once the queued replies run out. Defaults to `Fail`.
    pub fn bulk_default(&self, reply: BulkReply) -> &Self {
        *self.bulk_default.lock().expect("lock") = Some(reply);
        self
    }

    /// Profiles are matched case-insensitively, like the real service.
    pub fn set_profile(&self, name: &str, reply: ProfileReply) -> &Self {
        self.profiles
            .lock()
            .expect("lock")
            .insert(name.to_lowercase(), reply);
        self
    }

    pub fn bulk_calls(&self) -> usize {
        self.bulk_calls.lock().expect("lock").len()
    }

    pub fn bulk_call_times(&self) -> Vec<Instant> {
        self.bulk_calls.lock().expect("lock").clone()
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_requests.lock().expect("lock").len()
    }

    /// Names passed to `fetch_one`, in call order.
    pub fn profile_requests(&self) -> Vec<String> {
        self.profile_requests.lock().expect("lock").clone()
    }

    fn unavailable() -> FetchError {
        FetchError::from_status(StatusCode::SERVICE_UNAVAILABLE, "down for maintenance")
    }
}

#[async_trait]
impl RankingSource for FakeSource {
    async fn fetch_bulk(&self) -> Result<Leaderboard, FetchError> {
        self.bulk_calls.lock().expect("lock").push(Instant::now());
        let reply = self.bulk.lock().expect("lock").pop_front().unwrap_or_else(|| {
            self.bulk_default
                .lock()
                .expect("lock")
                .clone()
                .unwrap_or(BulkReply::Fail)
        });

        match reply {
            BulkReply::Body(raw) => {
                let players = parse_leaderboard(&raw)?;
                Ok(Leaderboard { players, raw })
            }
            BulkReply::Fail => Err(Self::unavailable()),
            BulkReply::Hang => std::future::pending().await,
        }
    }

    async fn fetch_one(&self, name: &str) -> Result<Option<RankingRecord>, FetchError> {
        self.profile_requests.lock().expect("lock").push(name.to_string());
        if let Some(gate) = &self.profile_gate {
            gate.acquire().await.expect("gate open").forget();
        }

        let reply = self
            .profiles
            .lock()
            .expect("lock")
            .get(&name.to_lowercase())
            .cloned()
            .unwrap_or(ProfileReply::NotFound);

        match reply {
            ProfileReply::Found(record) => Ok(Some(record)),
            ProfileReply::FromBody(body) => parse_profile(&body, name),
            ProfileReply::NotFound => Ok(None),
            ProfileReply::Fail => Err(Self::unavailable()),
        }
    }
}
