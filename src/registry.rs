//! Active table registry: the only cross-worker shared state.
//!
//! Tables are keyed by a word id drawn from the fixed dictionary. Each entry
//! carries the actor address plus the latest summary pushed by the table, so
//! lobby listings never have to query actors.

use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use dashmap::DashMap;
use rand::Rng;
use tracing::info;

use crate::domain::GameType;
use crate::table::actor::{SweepCheck, TableActor};
use crate::table::state::TableState;
use crate::utils::table_id::random_word;
use crate::ws::protocol::{TableOptions, TableSummary};

const ID_RETRIES: usize = 100;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct TableEntry {
    addr: Addr<TableActor>,
    summary: TableSummary,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListFilter {
    pub game_type: Option<GameType>,
    pub include_in_progress: bool,
}

#[derive(Default)]
pub struct TableRegistry {
    tables: DashMap<String, TableEntry>,
}

impl TableRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a table and start its actor. Must run inside an actix system.
    pub fn create_table(
        self: &Arc<Self>,
        game_type: GameType,
        options: TableOptions,
    ) -> (String, Addr<TableActor>) {
        let id = self.generate_id();
        let state = TableState::new(id.clone(), game_type, options);
        let summary = state.summary();
        let addr = TableActor::new(state, self.clone()).start();
        self.tables.insert(
            id.clone(),
            TableEntry {
                addr: addr.clone(),
                summary,
            },
        );
        info!(table_id = %id, game_type = ?game_type, "table created");
        (id, addr)
    }

    pub fn get(&self, id: &str) -> Option<Addr<TableActor>> {
        self.tables.get(id).map(|entry| entry.addr.clone())
    }

    pub fn remove(&self, id: &str) {
        if self.tables.remove(id).is_some() {
            info!(table_id = %id, "table removed from registry");
        }
    }

    pub fn update_summary(&self, id: &str, summary: TableSummary) {
        if let Some(mut entry) = self.tables.get_mut(id) {
            entry.summary = summary;
        }
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Tables matching the lobby filter: waiting tables always, in-progress
    /// tables when requested, and takeover-joinable tables regardless.
    pub fn list(&self, filter: ListFilter) -> Vec<TableSummary> {
        let mut tables: Vec<TableSummary> = self
            .tables
            .iter()
            .map(|entry| entry.summary.clone())
            .filter(|s| {
                if filter.game_type.is_some_and(|gt| gt != s.game_type) {
                    return false;
                }
                let waiting = !s.in_progress && s.player_count < 4;
                waiting
                    || (s.in_progress && filter.include_in_progress)
                    || !s.takeover_seats.is_empty()
            })
            .collect();
        tables.sort_by(|a, b| a.id.cmp(&b.id));
        tables
    }

    /// Draw a word id, retrying on collision; after 100 misses fall back to
    /// a numeric suffix.
    fn generate_id(&self) -> String {
        let mut rng = rand::thread_rng();
        for _ in 0..ID_RETRIES {
            let word = random_word(&mut rng);
            if !self.tables.contains_key(word) {
                return word.to_string();
            }
        }
        loop {
            let id = format!("{}-{}", random_word(&mut rng), rng.gen_range(0..10_000));
            if !self.tables.contains_key(&id) {
                return id;
            }
        }
    }

    /// Periodic sweep destroying tables that stayed abandoned past their
    /// grace period.
    pub fn start_sweeper(self: &Arc<Self>) {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                for entry in registry.tables.iter() {
                    entry.addr.do_send(SweepCheck);
                }
            }
        });
    }
}
