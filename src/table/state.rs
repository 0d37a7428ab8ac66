//! Table controller core: seats, spectators, timers, and broadcast policy.
//!
//! `TableState` is deliberately free of actix types: every mutation returns
//! a list of [`Effect`]s which the table actor interprets (sending events,
//! arming cancellable timers, scheduling delayed advances). That keeps the
//! whole broadcast and timeout policy testable without a running system.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::engine::{GameEngine, GameType};
use crate::domain::hearts::{HeartsEngine, HeartsPhase, HeartsRoundEnd};
use crate::domain::king::{Contract, KingEngine, KingGameEnd};
use crate::domain::snapshot::{project, Viewer};
use crate::domain::spades::{SpadesBid, SpadesEngine, SpadesRoundEnd};
use crate::domain::{Card, CompletedTrick, Seat};
use crate::errors::GameError;
use crate::table::chat::{sanitize_chat, TypingRoster, TYPING_TTL};
use crate::ws::protocol::{PlayerPublic, ServerMsg, TableOptions, TableSummary};

pub const TURN_TIMEOUT: Duration = Duration::from_secs(30);
pub const TURN_WARNING_AFTER: Duration = Duration::from_secs(20);
pub const PASS_TIMEOUT: Duration = Duration::from_secs(30);
pub const SELECT_TIMEOUT: Duration = Duration::from_secs(45);
pub const BID_TIMEOUT: Duration = Duration::from_secs(30);
pub const TRICK_GAP: Duration = Duration::from_millis(500);
pub const CLEANUP_AFTER: Duration = Duration::from_secs(60);

pub const DEFAULT_ENDING_SCORE: i32 = 50;

/// Pause between `trickEnd` and `roundEnd` so clients can animate.
fn round_gap(game_type: GameType) -> Duration {
    match game_type {
        GameType::Hearts => Duration::from_millis(2000),
        GameType::King => Duration::from_millis(2500),
        GameType::Spades => Duration::from_millis(2000),
    }
}

pub fn now_ms() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Turn,
    Pass,
    Select,
    Bid,
}

fn timer_duration(kind: TimerKind) -> Duration {
    match kind {
        TimerKind::Turn => TURN_TIMEOUT,
        TimerKind::Pass => PASS_TIMEOUT,
        TimerKind::Select => SELECT_TIMEOUT,
        TimerKind::Bid => BID_TIMEOUT,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayKind {
    TrickGap,
    RoundGap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    Conn(Uuid),
    Seat(Seat),
    Spectators,
    Room,
    RoomExcept(Uuid),
}

/// One interpreted side effect of a table mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(Audience, ServerMsg),
    /// Replace the single outstanding action timer.
    ArmTimer {
        kind: TimerKind,
        duration: Duration,
        gen: u64,
    },
    CancelTimer,
    Delay {
        kind: DelayKind,
        duration: Duration,
        gen: u64,
    },
    ScheduleTypingSweep(Duration),
    ScheduleCleanup(Duration),
    CancelCleanup,
    SummaryChanged,
    Destroy,
}

#[derive(Debug, Clone)]
pub struct PlayerSlot {
    pub conn: Uuid,
    pub name: String,
    pub connected: bool,
}

#[derive(Debug, Clone)]
pub struct SpectatorSlot {
    pub conn: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ActiveTimer {
    kind: TimerKind,
    gen: u64,
    deadline_ms: i64,
}

#[derive(Debug, Clone)]
enum PendingRound {
    Hearts(HeartsRoundEnd),
    King(KingGameEnd),
    Spades(SpadesRoundEnd),
}

struct PlayedOutcome {
    trick: Option<(Seat, i32, CompletedTrick)>,
    round: Option<PendingRound>,
}

pub struct TableState {
    pub id: String,
    pub game_type: GameType,
    pub options: TableOptions,
    pub players: [Option<PlayerSlot>; 4],
    pub spectators: Vec<SpectatorSlot>,
    pub engine: Option<GameEngine>,
    rematch_votes: [Option<bool>; 4],
    typing: TypingRoster,
    animating: bool,
    pending_trick: Option<ServerMsg>,
    pending_round: Option<PendingRound>,
    timer: Option<ActiveTimer>,
    timer_gen: u64,
    delay_gen: u64,
    party_number: u32,
    cleanup_deadline: Option<Instant>,
    pub created_at: OffsetDateTime,
    rng: StdRng,
}

impl TableState {
    pub fn new(id: String, game_type: GameType, options: TableOptions) -> Self {
        Self::with_rng(id, game_type, options, StdRng::from_entropy())
    }

    pub fn with_rng(
        id: String,
        game_type: GameType,
        options: TableOptions,
        rng: StdRng,
    ) -> Self {
        Self {
            id,
            game_type,
            options,
            players: Default::default(),
            spectators: Vec::new(),
            engine: None,
            rematch_votes: [None; 4],
            typing: TypingRoster::default(),
            animating: false,
            pending_trick: None,
            pending_round: None,
            timer: None,
            timer_gen: 0,
            delay_gen: 0,
            party_number: 1,
            cleanup_deadline: None,
            created_at: OffsetDateTime::now_utc(),
            rng,
        }
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            id: self.id.clone(),
            game_type: self.game_type,
            player_count: self.players.iter().flatten().count(),
            spectator_count: self.spectators.len(),
            in_progress: self.engine.is_some(),
            takeover_seats: self.takeover_seats(),
            players: self
                .players
                .iter()
                .flatten()
                .map(|p| p.name.clone())
                .collect(),
        }
    }

    fn takeover_seats(&self) -> Vec<Seat> {
        if self.engine.is_none() {
            return Vec::new();
        }
        (0..4u8)
            .filter(|&s| {
                self.players[s as usize]
                    .as_ref()
                    .is_some_and(|p| !p.connected)
            })
            .collect()
    }

    pub fn players_public(&self) -> Vec<PlayerPublic> {
        (0..4u8)
            .filter_map(|s| {
                self.players[s as usize].as_ref().map(|p| PlayerPublic {
                    name: p.name.clone(),
                    seat: s,
                    connected: p.connected,
                })
            })
            .collect()
    }

    fn seat_of(&self, conn: Uuid) -> Option<Seat> {
        (0..4u8).find(|&s| {
            self.players[s as usize]
                .as_ref()
                .is_some_and(|p| p.conn == conn)
        })
    }

    fn participant_name(&self, conn: Uuid) -> Option<(String, Option<Seat>)> {
        if let Some(seat) = self.seat_of(conn) {
            let name = self.players[seat as usize].as_ref()?.name.clone();
            return Some((name, Some(seat)));
        }
        self.spectators
            .iter()
            .find(|s| s.conn == conn)
            .map(|s| (s.name.clone(), None))
    }

    /// All seats empty or disconnected: the table is dying.
    pub fn is_abandoned(&self) -> bool {
        self.players
            .iter()
            .all(|p| p.as_ref().map_or(true, |slot| !slot.connected))
    }

    // ------------------------------------------------------------------
    // Membership
    // ------------------------------------------------------------------

    pub fn join(&mut self, conn: Uuid, name: &str) -> Result<Vec<Effect>, GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::NameRequired);
        }

        if self.engine.is_some() {
            return self.takeover(conn, name);
        }

        let Some(seat) = (0..4u8).find(|&s| self.players[s as usize].is_none()) else {
            return Err(GameError::TableFull);
        };
        self.players[seat as usize] = Some(PlayerSlot {
            conn,
            name: name.to_string(),
            connected: true,
        });

        let mut fx = vec![
            Effect::Send(
                Audience::Conn(conn),
                ServerMsg::TableJoined {
                    table_id: self.id.clone(),
                    seat,
                    game_type: self.game_type,
                    ending_score: self.options.ending_score,
                    players: self.players_public(),
                },
            ),
            Effect::Send(
                Audience::Room,
                ServerMsg::UpdatePlayers {
                    players: self.players_public(),
                },
            ),
        ];
        fx.extend(self.cleanup_effects());

        if self.players.iter().all(|p| p.is_some()) {
            self.start_engine();
            fx.extend(self.deal_effects());
        }
        fx.push(Effect::SummaryChanged);
        Ok(fx)
    }

    /// Rebind a disconnected seat to a new connection and replay the minimum
    /// state it needs: hand snapshot and the running timer deadline.
    fn takeover(&mut self, conn: Uuid, name: &str) -> Result<Vec<Effect>, GameError> {
        let Some(seat) = self.takeover_seats().first().copied() else {
            return Err(if self.players.iter().all(|p| p.is_some()) {
                GameError::GameInProgress
            } else {
                GameError::TableFull
            });
        };
        self.players[seat as usize] = Some(PlayerSlot {
            conn,
            name: name.to_string(),
            connected: true,
        });

        let mut fx = vec![Effect::Send(
            Audience::Conn(conn),
            ServerMsg::TableJoined {
                table_id: self.id.clone(),
                seat,
                game_type: self.game_type,
                ending_score: self.options.ending_score,
                players: self.players_public(),
            },
        )];
        if let Some(engine) = &self.engine {
            fx.push(Effect::Send(
                Audience::Conn(conn),
                ServerMsg::UpdateGame {
                    game_state: project(engine, Viewer::Seat(seat)),
                },
            ));
        }
        if let Some(replay) = self.timer_replay_event() {
            fx.push(Effect::Send(Audience::Conn(conn), replay));
        }
        fx.push(Effect::Send(
            Audience::Room,
            ServerMsg::UpdatePlayers {
                players: self.players_public(),
            },
        ));
        fx.extend(self.cleanup_effects());
        fx.push(Effect::SummaryChanged);
        Ok(fx)
    }

    /// The timer event a late joiner needs to render the live countdown.
    fn timer_replay_event(&self) -> Option<ServerMsg> {
        let timer = self.timer?;
        let engine = self.engine.as_ref()?;
        let msg = match timer.kind {
            TimerKind::Turn => ServerMsg::TurnStart {
                player: engine.current_player()?,
                timeout_at: timer.deadline_ms,
            },
            TimerKind::Pass => ServerMsg::PassTimerStart {
                timeout_at: timer.deadline_ms,
            },
            TimerKind::Select => {
                let GameEngine::King(e) = engine else {
                    return None;
                };
                ServerMsg::SelectTimerStart {
                    timeout_at: timer.deadline_ms,
                    selector_seat: e.selector_seat(),
                }
            }
            TimerKind::Bid => {
                let GameEngine::Spades(e) = engine else {
                    return None;
                };
                ServerMsg::BidTimerStart {
                    player: e.current_bidder(),
                    timeout_at: timer.deadline_ms,
                }
            }
        };
        Some(msg)
    }

    pub fn spectate(&mut self, conn: Uuid, name: Option<&str>) -> Vec<Effect> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("guest")
            .to_string();
        self.spectators.push(SpectatorSlot { conn, name });

        vec![
            Effect::Send(
                Audience::Conn(conn),
                ServerMsg::SpectateJoined {
                    table_id: self.id.clone(),
                    game_type: self.game_type,
                    players: self.players_public(),
                    game_state: self
                        .engine
                        .as_ref()
                        .map(|e| project(e, Viewer::Spectator)),
                },
            ),
            Effect::Send(
                Audience::Room,
                ServerMsg::SpectatorUpdate {
                    game_state: None,
                    spectator_count: Some(self.spectators.len()),
                },
            ),
            Effect::SummaryChanged,
        ]
    }

    /// A leave and a dropped connection are handled the same way: pre-game
    /// the seat is freed, mid-game the seat is kept for takeover.
    pub fn remove_participant(&mut self, conn: Uuid) -> Vec<Effect> {
        self.typing.remove(conn);

        if let Some(pos) = self.spectators.iter().position(|s| s.conn == conn) {
            self.spectators.remove(pos);
            return vec![
                Effect::Send(
                    Audience::Room,
                    ServerMsg::SpectatorUpdate {
                        game_state: None,
                        spectator_count: Some(self.spectators.len()),
                    },
                ),
                Effect::SummaryChanged,
            ];
        }

        let Some(seat) = self.seat_of(conn) else {
            return Vec::new();
        };
        if self.engine.is_some() {
            if let Some(slot) = self.players[seat as usize].as_mut() {
                slot.connected = false;
            }
        } else {
            self.players[seat as usize] = None;
        }

        let mut fx = vec![Effect::Send(
            Audience::Room,
            ServerMsg::UpdatePlayers {
                players: self.players_public(),
            },
        )];
        fx.extend(self.cleanup_effects());
        fx.push(Effect::SummaryChanged);
        fx
    }

    fn cleanup_effects(&mut self) -> Vec<Effect> {
        if self.is_abandoned() {
            if self.cleanup_deadline.is_none() {
                self.cleanup_deadline = Some(Instant::now() + CLEANUP_AFTER);
                return vec![Effect::ScheduleCleanup(CLEANUP_AFTER)];
            }
        } else if self.cleanup_deadline.take().is_some() {
            return vec![Effect::CancelCleanup];
        }
        Vec::new()
    }

    pub fn on_cleanup_fired(&mut self) -> Vec<Effect> {
        if self.is_abandoned() {
            vec![Effect::Destroy]
        } else {
            self.cleanup_deadline = None;
            Vec::new()
        }
    }

    /// Periodic registry sweep: destroy if the grace period has lapsed, and
    /// start the clock for abandoned tables that never scheduled one (e.g. a
    /// created table nobody ever joined).
    pub fn on_sweep(&mut self) -> Vec<Effect> {
        if !self.is_abandoned() {
            return Vec::new();
        }
        match self.cleanup_deadline {
            Some(deadline) if deadline <= Instant::now() => vec![Effect::Destroy],
            Some(_) => Vec::new(),
            None => {
                self.cleanup_deadline = Some(Instant::now() + CLEANUP_AFTER);
                vec![Effect::ScheduleCleanup(CLEANUP_AFTER)]
            }
        }
    }

    // ------------------------------------------------------------------
    // Game lifecycle
    // ------------------------------------------------------------------

    fn start_engine(&mut self) {
        self.rematch_votes = [None; 4];
        self.animating = false;
        self.pending_trick = None;
        self.pending_round = None;
        let engine = match self.game_type {
            GameType::Hearts => GameEngine::Hearts(HeartsEngine::new(
                self.options.ending_score.unwrap_or(DEFAULT_ENDING_SCORE),
                &mut self.rng,
            )),
            GameType::King => GameEngine::King(KingEngine::new(
                self.options.initial_selector_seat.unwrap_or(0),
                &mut self.rng,
            )),
            GameType::Spades => GameEngine::Spades(SpadesEngine::new(
                self.options
                    .win_threshold
                    .unwrap_or(crate::domain::spades::DEFAULT_WIN_THRESHOLD),
                &mut self.rng,
            )),
        };
        self.engine = Some(engine);
    }

    /// Events and timer for a freshly dealt round/game, whatever phase the
    /// engine opens in.
    fn deal_effects(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        let Some(engine) = &self.engine else {
            return fx;
        };
        match engine {
            GameEngine::Hearts(e) => {
                let passing = e.phase() == HeartsPhase::Passing;
                let phase = if passing { "passing" } else { "playing" };
                let direction = e.pass_direction();
                let current_player = e.current_player();
                for seat in 0..4u8 {
                    fx.push(Effect::Send(
                        Audience::Seat(seat),
                        ServerMsg::StartGame {
                            hand: e.hand(seat).to_vec(),
                            pass_direction: Some(direction),
                            phase,
                            current_player,
                            game_type: GameType::Hearts,
                        },
                    ));
                }
                if passing {
                    let (arm, timeout_at) = self.arm_timer(TimerKind::Pass);
                    fx.push(Effect::Send(
                        Audience::Room,
                        ServerMsg::PassTimerStart { timeout_at },
                    ));
                    fx.push(arm);
                } else {
                    let (arm, timeout_at) = self.arm_timer(TimerKind::Turn);
                    fx.push(Effect::Send(
                        Audience::Room,
                        ServerMsg::TurnStart {
                            player: current_player,
                            timeout_at,
                        },
                    ));
                    fx.push(arm);
                }
            }
            GameEngine::King(e) => {
                let selector = e.selector_seat();
                let available = e.available_contracts();
                let game_number = e.game_number();
                let party_number = self.party_number;
                for seat in 0..4u8 {
                    fx.push(Effect::Send(
                        Audience::Seat(seat),
                        ServerMsg::StartGame {
                            hand: e.hand(seat).to_vec(),
                            pass_direction: None,
                            phase: "selecting",
                            current_player: selector,
                            game_type: GameType::King,
                        },
                    ));
                    fx.push(Effect::Send(
                        Audience::Seat(seat),
                        ServerMsg::ContractSelectionStart {
                            selector,
                            available_contracts: available.clone(),
                            game_number,
                            party_number,
                            hand: e.hand(seat).to_vec(),
                        },
                    ));
                }
                let (arm, timeout_at) = self.arm_timer(TimerKind::Select);
                fx.push(Effect::Send(
                    Audience::Room,
                    ServerMsg::SelectTimerStart {
                        timeout_at,
                        selector_seat: selector,
                    },
                ));
                fx.push(arm);
            }
            GameEngine::Spades(e) => {
                let current_bidder = e.current_bidder();
                let round_number = e.round_number();
                for seat in 0..4u8 {
                    fx.push(Effect::Send(
                        Audience::Seat(seat),
                        ServerMsg::StartGame {
                            hand: e.hand(seat).to_vec(),
                            pass_direction: None,
                            phase: "bidding",
                            current_player: current_bidder,
                            game_type: GameType::Spades,
                        },
                    ));
                    fx.push(Effect::Send(
                        Audience::Seat(seat),
                        ServerMsg::BiddingStart {
                            hand: e.hand(seat).to_vec(),
                            current_bidder,
                            round_number,
                        },
                    ));
                }
                let (arm, timeout_at) = self.arm_timer(TimerKind::Bid);
                fx.push(Effect::Send(
                    Audience::Room,
                    ServerMsg::BidTimerStart {
                        player: current_bidder,
                        timeout_at,
                    },
                ));
                fx.push(arm);
            }
        }
        fx.extend(self.snapshots());
        fx
    }

    /// One idempotent snapshot per participant after any engine mutation.
    fn snapshots(&self) -> Vec<Effect> {
        let Some(engine) = &self.engine else {
            return Vec::new();
        };
        let mut fx = Vec::new();
        for seat in 0..4u8 {
            if self.players[seat as usize].is_some() {
                fx.push(Effect::Send(
                    Audience::Seat(seat),
                    ServerMsg::UpdateGame {
                        game_state: project(engine, Viewer::Seat(seat)),
                    },
                ));
            }
        }
        if !self.spectators.is_empty() {
            fx.push(Effect::Send(
                Audience::Spectators,
                ServerMsg::SpectatorUpdate {
                    game_state: Some(project(engine, Viewer::Spectator)),
                    spectator_count: None,
                },
            ));
        }
        fx
    }

    fn arm_timer(&mut self, kind: TimerKind) -> (Effect, i64) {
        self.timer_gen += 1;
        let duration = timer_duration(kind);
        let deadline_ms = now_ms() + duration.as_millis() as i64;
        self.timer = Some(ActiveTimer {
            kind,
            gen: self.timer_gen,
            deadline_ms,
        });
        (
            Effect::ArmTimer {
                kind,
                duration,
                gen: self.timer_gen,
            },
            deadline_ms,
        )
    }

    fn clear_timer(&mut self) -> Effect {
        self.timer = None;
        self.timer_gen += 1;
        Effect::CancelTimer
    }

    fn schedule_delay(&mut self, kind: DelayKind, duration: Duration) -> Effect {
        self.delay_gen += 1;
        Effect::Delay {
            kind,
            duration,
            gen: self.delay_gen,
        }
    }

    // ------------------------------------------------------------------
    // Player actions
    // ------------------------------------------------------------------

    pub fn play_card(&mut self, conn: Uuid, card: Card) -> Result<Vec<Effect>, GameError> {
        let seat = self.seat_of(conn).ok_or(GameError::NotYourTurn)?;
        self.play_by_seat(seat, card)
    }

    fn play_by_seat(&mut self, seat: Seat, card: Card) -> Result<Vec<Effect>, GameError> {
        if self.animating {
            return Err(GameError::PhaseError);
        }
        let engine = self.engine.as_mut().ok_or(GameError::PhaseError)?;
        let outcome = match engine {
            GameEngine::Hearts(e) => {
                let out = e.play_card(seat, card)?;
                PlayedOutcome {
                    trick: out.trick.map(|t| (t.winner, t.points, t.trick)),
                    round: out.round.map(PendingRound::Hearts),
                }
            }
            GameEngine::King(e) => {
                let out = e.play_card(seat, card)?;
                PlayedOutcome {
                    trick: out.trick.map(|t| (t.winner, t.points, t.trick)),
                    round: out.game.map(PendingRound::King),
                }
            }
            GameEngine::Spades(e) => {
                let out = e.play_card(seat, card)?;
                PlayedOutcome {
                    trick: out.trick.map(|t| (t.winner, 0, t.trick)),
                    round: out.round.map(PendingRound::Spades),
                }
            }
        };

        let mut fx = Vec::new();
        match outcome.trick {
            None => {
                let (current_trick, next) = match self.engine.as_ref() {
                    Some(engine) => (
                        engine.current_trick_plays(),
                        engine.current_player().unwrap_or(seat),
                    ),
                    None => (Vec::new(), seat),
                };
                fx.push(Effect::Send(
                    Audience::Room,
                    ServerMsg::CardPlayed {
                        seat,
                        card,
                        current_trick,
                        trick_complete: None,
                        winner: None,
                    },
                ));
                fx.extend(self.snapshots());
                let (arm, timeout_at) = self.arm_timer(TimerKind::Turn);
                fx.push(Effect::Send(
                    Audience::Room,
                    ServerMsg::TurnStart {
                        player: next,
                        timeout_at,
                    },
                ));
                fx.push(arm);
            }
            Some((winner, points, trick)) => {
                fx.push(Effect::Send(
                    Audience::Room,
                    ServerMsg::CardPlayed {
                        seat,
                        card,
                        current_trick: trick.plays.clone(),
                        trick_complete: Some(true),
                        winner: Some(winner),
                    },
                ));
                fx.extend(self.snapshots());
                fx.push(self.clear_timer());
                self.animating = true;
                self.pending_trick = Some(ServerMsg::TrickEnd {
                    winner,
                    points,
                    last_trick: trick,
                });
                self.pending_round = outcome.round;
                fx.push(self.schedule_delay(DelayKind::TrickGap, TRICK_GAP));
            }
        }
        Ok(fx)
    }

    pub fn submit_pass(&mut self, conn: Uuid, cards: &[Card]) -> Result<Vec<Effect>, GameError> {
        let seat = self.seat_of(conn).ok_or(GameError::NotYourTurn)?;
        let cards: [Card; 3] = cards.try_into().map_err(|_| GameError::BadPass)?;
        let Some(GameEngine::Hearts(e)) = self.engine.as_mut() else {
            return Err(GameError::PhaseError);
        };
        let exchanged = e.submit_pass(seat, cards)?;

        let mut fx = Vec::new();
        if exchanged {
            fx.extend(self.pass_exchange_effects());
        } else {
            fx.extend(self.snapshots());
        }
        Ok(fx)
    }

    /// After the atomic exchange: play begins at the 2♣ holder.
    fn pass_exchange_effects(&mut self) -> Vec<Effect> {
        let mut fx = vec![self.clear_timer()];
        let Some(GameEngine::Hearts(e)) = self.engine.as_ref() else {
            return fx;
        };
        let player = e.current_player();
        fx.extend(self.snapshots());
        let (arm, timeout_at) = self.arm_timer(TimerKind::Turn);
        fx.push(Effect::Send(
            Audience::Room,
            ServerMsg::TurnStart { player, timeout_at },
        ));
        fx.push(arm);
        fx
    }

    pub fn select_contract(
        &mut self,
        conn: Uuid,
        contract: Contract,
    ) -> Result<Vec<Effect>, GameError> {
        let seat = self.seat_of(conn).ok_or(GameError::NotYourTurn)?;
        let Some(GameEngine::King(e)) = self.engine.as_mut() else {
            return Err(GameError::PhaseError);
        };
        e.select_contract(seat, contract)?;
        Ok(self.contract_selected_effects(contract))
    }

    fn contract_selected_effects(&mut self, contract: Contract) -> Vec<Effect> {
        let mut fx = vec![self.clear_timer()];
        let Some(GameEngine::King(e)) = self.engine.as_ref() else {
            return fx;
        };
        let game_number = e.game_number();
        let player = e.current_player();
        fx.push(Effect::Send(
            Audience::Room,
            ServerMsg::ContractSelected {
                contract,
                game_number,
            },
        ));
        fx.extend(self.snapshots());
        let (arm, timeout_at) = self.arm_timer(TimerKind::Turn);
        fx.push(Effect::Send(
            Audience::Room,
            ServerMsg::TurnStart { player, timeout_at },
        ));
        fx.push(arm);
        fx
    }

    pub fn submit_bid(&mut self, conn: Uuid, bid: SpadesBid) -> Result<Vec<Effect>, GameError> {
        let seat = self.seat_of(conn).ok_or(GameError::NotYourTurn)?;
        self.bid_by_seat(seat, bid)
    }

    fn bid_by_seat(&mut self, seat: Seat, bid: SpadesBid) -> Result<Vec<Effect>, GameError> {
        let Some(GameEngine::Spades(e)) = self.engine.as_mut() else {
            return Err(GameError::PhaseError);
        };
        let outcome = e.submit_bid(seat, bid)?;
        let bids = e.bids();

        let mut fx = vec![Effect::Send(
            Audience::Room,
            ServerMsg::BidSubmitted {
                seat,
                bid,
                bids,
                next_bidder: outcome.next_bidder,
            },
        )];
        fx.extend(self.snapshots());
        if outcome.all_bids_in {
            let Some(GameEngine::Spades(e)) = self.engine.as_ref() else {
                return Ok(fx);
            };
            let player = e.current_player();
            let (arm, timeout_at) = self.arm_timer(TimerKind::Turn);
            fx.push(Effect::Send(
                Audience::Room,
                ServerMsg::TurnStart { player, timeout_at },
            ));
            fx.push(arm);
        } else if let Some(next) = outcome.next_bidder {
            let (arm, timeout_at) = self.arm_timer(TimerKind::Bid);
            fx.push(Effect::Send(
                Audience::Room,
                ServerMsg::BidTimerStart {
                    player: next,
                    timeout_at,
                },
            ));
            fx.push(arm);
        }
        Ok(fx)
    }

    pub fn rematch(&mut self, conn: Uuid, vote: bool) -> Result<Vec<Effect>, GameError> {
        let seat = self.seat_of(conn).ok_or(GameError::NotYourTurn)?;
        if !self.engine.as_ref().is_some_and(|e| e.is_terminal()) {
            return Err(GameError::PhaseError);
        }
        self.rematch_votes[seat as usize] = Some(vote);

        let mut fx = vec![Effect::Send(
            Audience::Room,
            ServerMsg::RematchStatus {
                votes: self.rematch_votes,
            },
        )];
        if self.rematch_votes.iter().all(|v| *v == Some(true)) {
            if self.game_type == GameType::King {
                self.party_number += 1;
            }
            self.start_engine();
            fx.extend(self.deal_effects());
            fx.push(Effect::SummaryChanged);
        }
        Ok(fx)
    }

    pub fn chat(&mut self, conn: Uuid, text: &str) -> Vec<Effect> {
        let Some((from, seat)) = self.participant_name(conn) else {
            return Vec::new();
        };
        let Some(text) = sanitize_chat(text) else {
            return Vec::new();
        };
        vec![Effect::Send(
            Audience::Room,
            ServerMsg::Chat {
                from,
                seat,
                text,
                timestamp: now_ms(),
            },
        )]
    }

    pub fn typing(&mut self, conn: Uuid, is_typing: bool) -> Vec<Effect> {
        let Some((name, _)) = self.participant_name(conn) else {
            return Vec::new();
        };
        self.typing.set(conn, name, is_typing);
        let mut fx = vec![Effect::Send(
            Audience::RoomExcept(conn),
            ServerMsg::TypingUpdate {
                players: self.typing.names(Some(conn)),
            },
        )];
        if !self.typing.is_empty() {
            fx.push(Effect::ScheduleTypingSweep(
                TYPING_TTL + Duration::from_millis(100),
            ));
        }
        fx
    }

    pub fn on_typing_sweep(&mut self) -> Vec<Effect> {
        let mut fx = Vec::new();
        if self.typing.prune() {
            fx.push(Effect::Send(
                Audience::Room,
                ServerMsg::TypingUpdate {
                    players: self.typing.names(None),
                },
            ));
        }
        if !self.typing.is_empty() {
            fx.push(Effect::ScheduleTypingSweep(
                TYPING_TTL + Duration::from_millis(100),
            ));
        }
        fx
    }

    // ------------------------------------------------------------------
    // Timers and delayed advances
    // ------------------------------------------------------------------

    pub fn on_timer_fired(
        &mut self,
        kind: TimerKind,
        gen: u64,
    ) -> Result<Vec<Effect>, GameError> {
        // Stale fire: a newer timer (or none) superseded this one.
        if self.timer.map_or(true, |t| t.kind != kind || t.gen != gen) {
            return Ok(Vec::new());
        }
        self.timer = None;
        match kind {
            TimerKind::Turn => self.auto_play(),
            TimerKind::Pass => self.auto_pass(),
            TimerKind::Select => self.auto_select(),
            TimerKind::Bid => self.auto_bid(),
        }
    }

    pub fn on_warning_fired(&mut self, gen: u64) -> Vec<Effect> {
        match self.timer {
            Some(timer) if timer.kind == TimerKind::Turn && timer.gen == gen => {
                vec![Effect::Send(Audience::Room, ServerMsg::TimerWarning {})]
            }
            _ => Vec::new(),
        }
    }

    fn auto_play(&mut self) -> Result<Vec<Effect>, GameError> {
        let engine = self.engine.as_ref().ok_or(GameError::PhaseError)?;
        let Some(seat) = engine.current_player() else {
            return Ok(Vec::new());
        };
        let card = engine
            .lowest_legal_card(seat)
            .ok_or_else(|| GameError::internal("turn timeout with no legal card"))?;
        let mut fx = vec![Effect::Send(Audience::Seat(seat), ServerMsg::AutoPlay { card })];
        fx.extend(self.play_by_seat(seat, card)?);
        Ok(fx)
    }

    fn auto_pass(&mut self) -> Result<Vec<Effect>, GameError> {
        let mut fx = Vec::new();
        let mut exchanged = false;
        for seat in 0..4u8 {
            let Some(GameEngine::Hearts(e)) = self.engine.as_ref() else {
                return Err(GameError::PhaseError);
            };
            if e.has_passed(seat) {
                continue;
            }
            let hand = e.hand(seat).to_vec();
            let picked: Vec<Card> = hand
                .choose_multiple(&mut self.rng, 3)
                .copied()
                .collect();
            let cards: [Card; 3] = picked
                .as_slice()
                .try_into()
                .map_err(|_| GameError::internal("short hand during auto-pass"))?;
            let Some(GameEngine::Hearts(e)) = self.engine.as_mut() else {
                return Err(GameError::PhaseError);
            };
            exchanged = e.submit_pass(seat, cards)?;
            fx.push(Effect::Send(
                Audience::Seat(seat),
                ServerMsg::AutoPassSubmitted {
                    cards: cards.to_vec(),
                },
            ));
        }
        if exchanged {
            fx.extend(self.pass_exchange_effects());
        }
        Ok(fx)
    }

    fn auto_select(&mut self) -> Result<Vec<Effect>, GameError> {
        let Some(GameEngine::King(e)) = self.engine.as_ref() else {
            return Err(GameError::PhaseError);
        };
        let selector = e.selector_seat();
        let available = e.available_contracts();
        let penalties: Vec<Contract> = available
            .iter()
            .copied()
            .filter(Contract::is_penalty)
            .collect();
        let trumps: Vec<Contract> = available
            .iter()
            .copied()
            .filter(|c| !c.is_penalty())
            .collect();
        let pick = penalties
            .choose(&mut self.rng)
            .or_else(|| trumps.choose(&mut self.rng))
            .copied()
            .ok_or_else(|| GameError::internal("no contract available to auto-select"))?;

        let Some(GameEngine::King(e)) = self.engine.as_mut() else {
            return Err(GameError::PhaseError);
        };
        e.select_contract(selector, pick)?;
        Ok(self.contract_selected_effects(pick))
    }

    fn auto_bid(&mut self) -> Result<Vec<Effect>, GameError> {
        let Some(GameEngine::Spades(e)) = self.engine.as_ref() else {
            return Err(GameError::PhaseError);
        };
        let seat = e.current_bidder();
        self.bid_by_seat(seat, SpadesBid::Number(2))
    }

    pub fn on_delay_fired(&mut self, kind: DelayKind, gen: u64) -> Vec<Effect> {
        if gen != self.delay_gen {
            return Vec::new();
        }
        match kind {
            DelayKind::TrickGap => self.after_trick_gap(),
            DelayKind::RoundGap => self.after_round_gap(),
        }
    }

    fn after_trick_gap(&mut self) -> Vec<Effect> {
        self.animating = false;
        let mut fx = Vec::new();
        if let Some(trick_end) = self.pending_trick.take() {
            fx.push(Effect::Send(Audience::Room, trick_end));
        }
        if self.pending_round.is_some() {
            fx.push(self.schedule_delay(DelayKind::RoundGap, round_gap(self.game_type)));
            return fx;
        }
        let Some(engine) = &self.engine else {
            return fx;
        };
        if let Some(player) = engine.current_player() {
            let (arm, timeout_at) = self.arm_timer(TimerKind::Turn);
            fx.push(Effect::Send(
                Audience::Room,
                ServerMsg::TurnStart { player, timeout_at },
            ));
            fx.push(arm);
        }
        fx
    }

    fn after_round_gap(&mut self) -> Vec<Effect> {
        let Some(pending) = self.pending_round.take() else {
            return Vec::new();
        };
        let mut fx = Vec::new();
        match pending {
            PendingRound::Hearts(data) => {
                fx.push(Effect::Send(
                    Audience::Room,
                    ServerMsg::RoundEnd {
                        round_scores: data.round_scores.to_vec(),
                        cumulative_scores: data.cumulative_scores.to_vec(),
                        moon_shooter: data.moon_shooter,
                        point_cards_taken: Some(data.point_cards_taken.clone()),
                        game_number: None,
                        bags: None,
                        game_over: data.game_over,
                        game_winner: data.game_over.then(|| data.winners.clone()),
                    },
                ));
                if data.game_over {
                    fx.push(Effect::Send(
                        Audience::Room,
                        ServerMsg::GameEnd {
                            winner: data.winners,
                            final_scores: data.cumulative_scores.to_vec(),
                        },
                    ));
                    fx.extend(self.snapshots());
                } else if let Some(GameEngine::Hearts(e)) = self.engine.as_mut() {
                    e.start_next_round(&mut self.rng);
                    fx.extend(self.deal_effects());
                }
            }
            PendingRound::King(data) => {
                fx.push(Effect::Send(
                    Audience::Room,
                    ServerMsg::RoundEnd {
                        round_scores: data.game_scores.to_vec(),
                        cumulative_scores: data.cumulative_scores.to_vec(),
                        moon_shooter: None,
                        point_cards_taken: None,
                        game_number: Some(data.game_number),
                        bags: None,
                        game_over: data.party_over,
                        game_winner: data.party_over.then(|| data.winners.clone()),
                    },
                ));
                if data.party_over {
                    fx.push(Effect::Send(
                        Audience::Room,
                        ServerMsg::GameEnd {
                            winner: data.winners,
                            final_scores: data.cumulative_scores.to_vec(),
                        },
                    ));
                    fx.extend(self.snapshots());
                } else if let Some(GameEngine::King(e)) = self.engine.as_mut() {
                    e.start_next_game(&mut self.rng);
                    fx.extend(self.deal_effects());
                }
            }
            PendingRound::Spades(data) => {
                fx.push(Effect::Send(
                    Audience::Room,
                    ServerMsg::RoundEnd {
                        round_scores: data.round_scores.to_vec(),
                        cumulative_scores: data.cumulative_scores.to_vec(),
                        moon_shooter: None,
                        point_cards_taken: None,
                        game_number: None,
                        bags: Some(data.bags),
                        game_over: data.game_over,
                        game_winner: data
                            .game_over
                            .then(|| data.winners.iter().map(|&t| t as Seat).collect()),
                    },
                ));
                if data.game_over {
                    fx.push(Effect::Send(
                        Audience::Room,
                        ServerMsg::GameEnd {
                            winner: data.winners.iter().map(|&t| t as Seat).collect(),
                            final_scores: data.cumulative_scores.to_vec(),
                        },
                    ));
                    fx.extend(self.snapshots());
                } else if let Some(GameEngine::Spades(e)) = self.engine.as_mut() {
                    e.start_next_round(&mut self.rng);
                    fx.extend(self.deal_effects());
                }
            }
        }
        fx
    }
}
