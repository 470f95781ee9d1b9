#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SupervisorError {
    #[error("session restart budget of {max_restarts} exhausted: {reason}")]
    RestartBudgetExhausted { max_restarts: u32, reason: String },
    #[error("session supervisor is closed")]
    Closed,
}
