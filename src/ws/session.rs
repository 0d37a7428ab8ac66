//! Websocket session actor: one per client connection.
//!
//! The session parses inbound events, routes lobby requests to the registry
//! and table actions to the table actor it is attached to, and writes every
//! [`Outbound`] event back as a JSON text frame. A malformed inbound event
//! is dropped with a single `error` reply.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::GameError;
use crate::registry::{ListFilter, TableRegistry};
use crate::state::app_state::AppState;
use crate::table::actor::{
    Action, ActionKind, Disconnected, Join, Leave, Outbound, Spectate, TableActor,
};
use crate::ws::protocol::{contract_from_fields, ClientMsg, ServerMsg};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(40);

pub async fn upgrade(
    req: HttpRequest,
    stream: web::Payload,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(app_state.registry());
    ws::start(session, &req, stream)
}

pub struct WsSession {
    conn_id: Uuid,
    registry: Arc<TableRegistry>,
    table: Option<Addr<TableActor>>,
    last_heartbeat: Instant,
}

impl WsSession {
    fn new(registry: Arc<TableRegistry>) -> Self {
        Self {
            conn_id: Uuid::new_v4(),
            registry,
            table: None,
            last_heartbeat: Instant::now(),
        }
    }

    fn send_json(ctx: &mut ws::WebsocketContext<Self>, msg: &ServerMsg) {
        match serde_json::to_string(msg) {
            Ok(payload) => ctx.text(payload),
            Err(err) => warn!(error = %err, "failed to serialize outbound event"),
        }
    }

    fn send_error(ctx: &mut ws::WebsocketContext<Self>, err: &GameError) {
        Self::send_json(ctx, &ServerMsg::error(err));
    }

    fn start_heartbeat(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |actor, ctx| {
            if Instant::now().duration_since(actor.last_heartbeat) > CLIENT_TIMEOUT {
                warn!(conn_id = %actor.conn_id, "heartbeat timed out");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Normal)));
                ctx.stop();
                return;
            }
            ctx.ping(b"keepalive");
        });
    }

    fn leave_current_table(&mut self) {
        if let Some(addr) = self.table.take() {
            addr.do_send(Leave {
                conn: self.conn_id,
            });
        }
    }

    /// Send a `Join` and attach to the table only once it succeeds.
    fn join_table(&self, addr: Addr<TableActor>, name: String, ctx: &mut ws::WebsocketContext<Self>) {
        let conn = self.conn_id;
        let recipient = ctx.address().recipient::<Outbound>();
        ctx.spawn(
            addr.send(Join {
                conn,
                name,
                addr: recipient,
            })
            .into_actor(self)
            .map(move |res, actor, ctx| match res {
                Ok(Ok(())) => {
                    actor.table = Some(addr);
                }
                Ok(Err(err)) => Self::send_error(ctx, &err),
                Err(err) => {
                    // Table actor died between lookup and join.
                    warn!(conn_id = %actor.conn_id, error = %err, "join delivery failed");
                    Self::send_error(ctx, &GameError::TableNotFound);
                }
            }),
        );
    }

    fn forward_action(&self, kind: ActionKind, ctx: &mut ws::WebsocketContext<Self>) {
        match &self.table {
            Some(addr) => addr.do_send(Action {
                conn: self.conn_id,
                kind,
            }),
            None => Self::send_error(ctx, &GameError::TableNotFound),
        }
    }

    fn handle_client_msg(&mut self, msg: ClientMsg, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMsg::ListTables {
                game_type,
                include_in_progress,
            } => {
                let tables = self.registry.list(ListFilter {
                    game_type,
                    include_in_progress,
                });
                Self::send_json(ctx, &ServerMsg::TablesList { tables });
            }

            ClientMsg::CreateTable {
                player_name,
                game_type,
                options,
            } => {
                if player_name.trim().is_empty() {
                    Self::send_error(ctx, &GameError::NameRequired);
                    return;
                }
                self.leave_current_table();
                let (_, addr) = self.registry.create_table(game_type, options);
                self.join_table(addr, player_name, ctx);
            }

            ClientMsg::JoinTable {
                table_id,
                player_name,
            } => {
                let Some(addr) = self.registry.get(&table_id) else {
                    Self::send_error(ctx, &GameError::TableNotFound);
                    return;
                };
                self.leave_current_table();
                self.join_table(addr, player_name, ctx);
            }

            ClientMsg::SpectateTable {
                table_id,
                player_name,
            } => {
                let Some(addr) = self.registry.get(&table_id) else {
                    Self::send_error(ctx, &GameError::TableNotFound);
                    return;
                };
                self.leave_current_table();
                addr.do_send(Spectate {
                    conn: self.conn_id,
                    name: player_name,
                    addr: ctx.address().recipient::<Outbound>(),
                });
                self.table = Some(addr);
            }

            ClientMsg::LeaveTable {} | ClientMsg::LeaveSpectate {} => {
                self.leave_current_table();
            }

            ClientMsg::SubmitPass { cards } => {
                self.forward_action(ActionKind::SubmitPass(cards), ctx)
            }

            ClientMsg::SelectContract {
                contract_type,
                contract_name,
                trump_suit,
            } => match contract_from_fields(contract_type, contract_name, trump_suit) {
                Ok(contract) => self.forward_action(ActionKind::SelectContract(contract), ctx),
                Err(err) => Self::send_error(ctx, &err),
            },

            ClientMsg::SubmitBid { bid } => self.forward_action(ActionKind::SubmitBid(bid), ctx),
            ClientMsg::PlayCard { card } => self.forward_action(ActionKind::PlayCard(card), ctx),
            ClientMsg::Rematch { vote } => self.forward_action(ActionKind::Rematch(vote), ctx),
            ClientMsg::ChatMessage { text } => self.forward_action(ActionKind::Chat(text), ctx),
            ClientMsg::Typing { is_typing } => {
                self.forward_action(ActionKind::Typing(is_typing), ctx)
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(conn_id = %self.conn_id, "session started");
        self.start_heartbeat(ctx);
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        if let Some(addr) = self.table.take() {
            addr.do_send(Disconnected {
                conn: self.conn_id,
            });
        }
        info!(conn_id = %self.conn_id, "session stopped");
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(payload)) => {
                self.last_heartbeat = Instant::now();
                ctx.pong(&payload);
            }
            Ok(ws::Message::Pong(_)) => {
                self.last_heartbeat = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.last_heartbeat = Instant::now();
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(parsed) => self.handle_client_msg(parsed, ctx),
                    Err(err) => {
                        warn!(conn_id = %self.conn_id, error = %err, "malformed client event");
                        Self::send_json(
                            ctx,
                            &ServerMsg::Error {
                                message: "unrecognized event".to_string(),
                            },
                        );
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.last_heartbeat = Instant::now();
                Self::send_json(
                    ctx,
                    &ServerMsg::Error {
                        message: "binary frames not supported".to_string(),
                    },
                );
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {
                self.last_heartbeat = Instant::now();
            }
            Err(err) => {
                warn!(conn_id = %self.conn_id, error = %err, "websocket protocol error");
                ctx.close(Some(ws::CloseReason::from(ws::CloseCode::Error)));
                ctx.stop();
            }
        }
    }
}

impl Handler<Outbound> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        Self::send_json(ctx, &msg.0);
    }
}
