//! Table controller: lifecycle, seats, spectators, timers, and broadcast.

pub mod actor;
pub mod chat;
pub mod state;

#[cfg(test)]
mod tests_state;
