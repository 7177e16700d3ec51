pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::{
    career_guidance_handler, chat_handler, government_jobs_handler, history_status_handler,
    recent_histories_handler, regenerate_history_handler, todays_history_handler,
};
