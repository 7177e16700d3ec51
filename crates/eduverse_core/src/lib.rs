pub mod domain;
pub mod gateway;
pub mod history;
pub mod ports;
pub mod prompt;
pub mod quota;

pub use domain::{
    CareerRequest, ChatReply, ChatRequest, DailyHistory, JobsRequest, Language, UsageCounter,
};
pub use gateway::{Gateway, GatewayError};
pub use history::DailyHistoryService;
pub use ports::{
    CompletionError, CompletionResult, CompletionService, HistoryStore, PortError, PortResult,
    Translator, UsageStore, UserDirectory,
};
pub use quota::{QuotaTracker, DAILY_LIMIT};
