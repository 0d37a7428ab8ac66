//! Table actor: the single logical worker for one table.
//!
//! Client events, timer expiries, and delayed broadcasts all arrive as
//! messages on this actor's mailbox, so mutations are serialized per table.
//! The actor interprets the [`Effect`] lists produced by [`TableState`]:
//! sending events to connection recipients, arming cancellable timers
//! (retained `SpawnHandle`s, cancelled on re-arm), and stopping itself on
//! destruction.

use std::collections::HashMap;
use std::sync::Arc;

use actix::prelude::*;
use tracing::{debug, error, info};

use crate::domain::king::Contract;
use crate::domain::spades::SpadesBid;
use crate::domain::Card;
use crate::errors::{ErrorCode, GameError};
use crate::registry::TableRegistry;
use crate::table::state::{
    Audience, DelayKind, Effect, TableState, TimerKind, TURN_WARNING_AFTER,
};
use crate::ws::protocol::ServerMsg;
use uuid::Uuid;

/// A protocol event bound for one websocket session.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct Outbound(pub ServerMsg);

#[derive(Message)]
#[rtype(result = "Result<(), GameError>")]
pub struct Join {
    pub conn: Uuid,
    pub name: String,
    pub addr: Recipient<Outbound>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Spectate {
    pub conn: Uuid,
    pub name: Option<String>,
    pub addr: Recipient<Outbound>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Leave {
    pub conn: Uuid,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnected {
    pub conn: Uuid,
}

/// In-game client action, validated against table state.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Action {
    pub conn: Uuid,
    pub kind: ActionKind,
}

pub enum ActionKind {
    PlayCard(Card),
    SubmitPass(Vec<Card>),
    SelectContract(Contract),
    SubmitBid(SpadesBid),
    Rematch(bool),
    Chat(String),
    Typing(bool),
}

/// Periodic registry sweep probe.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SweepCheck;

pub struct TableActor {
    state: TableState,
    registry: Arc<TableRegistry>,
    recipients: HashMap<Uuid, Recipient<Outbound>>,
    timer_handle: Option<SpawnHandle>,
    warning_handle: Option<SpawnHandle>,
    delay_handle: Option<SpawnHandle>,
    typing_handle: Option<SpawnHandle>,
    cleanup_handle: Option<SpawnHandle>,
}

impl TableActor {
    pub fn new(state: TableState, registry: Arc<TableRegistry>) -> Self {
        Self {
            state,
            registry,
            recipients: HashMap::new(),
            timer_handle: None,
            warning_handle: None,
            delay_handle: None,
            typing_handle: None,
            cleanup_handle: None,
        }
    }

    fn dispatch(&self, audience: Audience, msg: ServerMsg) {
        let send_to = |conn: &Uuid| {
            if let Some(recipient) = self.recipients.get(conn) {
                recipient.do_send(Outbound(msg.clone()));
            }
        };
        match audience {
            Audience::Conn(conn) => send_to(&conn),
            Audience::Seat(seat) => {
                if let Some(slot) = self.state.players[seat as usize]
                    .as_ref()
                    .filter(|p| p.connected)
                {
                    send_to(&slot.conn);
                }
            }
            Audience::Spectators => {
                for spectator in &self.state.spectators {
                    send_to(&spectator.conn);
                }
            }
            Audience::Room | Audience::RoomExcept(_) => {
                let except = match audience {
                    Audience::RoomExcept(conn) => Some(conn),
                    _ => None,
                };
                for slot in self.state.players.iter().flatten() {
                    if slot.connected && Some(slot.conn) != except {
                        send_to(&slot.conn);
                    }
                }
                for spectator in &self.state.spectators {
                    if Some(spectator.conn) != except {
                        send_to(&spectator.conn);
                    }
                }
            }
        }
    }

    fn cancel_action_timer(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.timer_handle.take() {
            ctx.cancel_future(handle);
        }
        if let Some(handle) = self.warning_handle.take() {
            ctx.cancel_future(handle);
        }
    }

    fn apply(&mut self, effects: Vec<Effect>, ctx: &mut Context<Self>) {
        for effect in effects {
            match effect {
                Effect::Send(audience, msg) => self.dispatch(audience, msg),
                Effect::ArmTimer {
                    kind,
                    duration,
                    gen,
                } => {
                    self.cancel_action_timer(ctx);
                    self.timer_handle = Some(ctx.run_later(duration, move |actor, ctx| {
                        actor.timer_handle = None;
                        match actor.state.on_timer_fired(kind, gen) {
                            Ok(fx) => actor.apply(fx, ctx),
                            Err(err) => actor.report_background_error(&err),
                        }
                    }));
                    if kind == TimerKind::Turn {
                        self.warning_handle =
                            Some(ctx.run_later(TURN_WARNING_AFTER, move |actor, ctx| {
                                actor.warning_handle = None;
                                let fx = actor.state.on_warning_fired(gen);
                                actor.apply(fx, ctx);
                            }));
                    }
                }
                Effect::CancelTimer => self.cancel_action_timer(ctx),
                Effect::Delay {
                    kind,
                    duration,
                    gen,
                } => {
                    if let Some(handle) = self.delay_handle.take() {
                        ctx.cancel_future(handle);
                    }
                    self.delay_handle = Some(ctx.run_later(duration, move |actor, ctx| {
                        actor.delay_handle = None;
                        let fx = actor.state.on_delay_fired(kind, gen);
                        actor.apply(fx, ctx);
                    }));
                }
                Effect::ScheduleTypingSweep(duration) => {
                    if let Some(handle) = self.typing_handle.take() {
                        ctx.cancel_future(handle);
                    }
                    self.typing_handle = Some(ctx.run_later(duration, |actor, ctx| {
                        actor.typing_handle = None;
                        let fx = actor.state.on_typing_sweep();
                        actor.apply(fx, ctx);
                    }));
                }
                Effect::ScheduleCleanup(duration) => {
                    if let Some(handle) = self.cleanup_handle.take() {
                        ctx.cancel_future(handle);
                    }
                    self.cleanup_handle = Some(ctx.run_later(duration, |actor, ctx| {
                        actor.cleanup_handle = None;
                        let fx = actor.state.on_cleanup_fired();
                        actor.apply(fx, ctx);
                    }));
                }
                Effect::CancelCleanup => {
                    if let Some(handle) = self.cleanup_handle.take() {
                        ctx.cancel_future(handle);
                    }
                }
                Effect::SummaryChanged => {
                    self.registry
                        .update_summary(&self.state.id, self.state.summary());
                }
                Effect::Destroy => {
                    info!(table_id = %self.state.id, "table destroyed");
                    ctx.stop();
                }
            }
        }
    }

    fn report_action_error(&self, conn: Uuid, err: &GameError) {
        if err.is_internal() {
            error!(
                table_id = %self.state.id,
                code = %ErrorCode::from(err),
                error = %err,
                "internal error handling table action"
            );
        } else {
            debug!(
                table_id = %self.state.id,
                code = %ErrorCode::from(err),
                "rejected table action"
            );
        }
        if let Some(recipient) = self.recipients.get(&conn) {
            recipient.do_send(Outbound(ServerMsg::error(err)));
        }
    }

    fn report_background_error(&self, err: &GameError) {
        error!(
            table_id = %self.state.id,
            code = %ErrorCode::from(err),
            error = %err,
            "internal error in table timer"
        );
    }
}

impl Actor for TableActor {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Self::Context) {
        info!(
            table_id = %self.state.id,
            game_type = ?self.state.game_type,
            "table started"
        );
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.registry.remove(&self.state.id);
        info!(table_id = %self.state.id, "table stopped");
    }
}

impl Handler<Join> for TableActor {
    type Result = Result<(), GameError>;

    fn handle(&mut self, msg: Join, ctx: &mut Self::Context) -> Self::Result {
        match self.state.join(msg.conn, &msg.name) {
            Ok(fx) => {
                self.recipients.insert(msg.conn, msg.addr);
                info!(table_id = %self.state.id, name = %msg.name, "player joined");
                self.apply(fx, ctx);
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

impl Handler<Spectate> for TableActor {
    type Result = ();

    fn handle(&mut self, msg: Spectate, ctx: &mut Self::Context) {
        self.recipients.insert(msg.conn, msg.addr);
        let fx = self.state.spectate(msg.conn, msg.name.as_deref());
        self.apply(fx, ctx);
    }
}

impl Handler<Leave> for TableActor {
    type Result = ();

    fn handle(&mut self, msg: Leave, ctx: &mut Self::Context) {
        let fx = self.state.remove_participant(msg.conn);
        self.recipients.remove(&msg.conn);
        self.apply(fx, ctx);
    }
}

impl Handler<Disconnected> for TableActor {
    type Result = ();

    fn handle(&mut self, msg: Disconnected, ctx: &mut Self::Context) {
        let fx = self.state.remove_participant(msg.conn);
        self.recipients.remove(&msg.conn);
        self.apply(fx, ctx);
    }
}

impl Handler<Action> for TableActor {
    type Result = ();

    fn handle(&mut self, msg: Action, ctx: &mut Self::Context) {
        let result = match msg.kind {
            ActionKind::PlayCard(card) => self.state.play_card(msg.conn, card),
            ActionKind::SubmitPass(cards) => self.state.submit_pass(msg.conn, &cards),
            ActionKind::SelectContract(contract) => {
                self.state.select_contract(msg.conn, contract)
            }
            ActionKind::SubmitBid(bid) => self.state.submit_bid(msg.conn, bid),
            ActionKind::Rematch(vote) => self.state.rematch(msg.conn, vote),
            ActionKind::Chat(text) => Ok(self.state.chat(msg.conn, &text)),
            ActionKind::Typing(is_typing) => Ok(self.state.typing(msg.conn, is_typing)),
        };
        match result {
            Ok(fx) => self.apply(fx, ctx),
            Err(err) => self.report_action_error(msg.conn, &err),
        }
    }
}

impl Handler<SweepCheck> for TableActor {
    type Result = ();

    fn handle(&mut self, _msg: SweepCheck, ctx: &mut Self::Context) {
        let fx = self.state.on_sweep();
        self.apply(fx, ctx);
    }
}
