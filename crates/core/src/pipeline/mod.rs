pub mod config;
pub mod frame_mailbox;
pub mod frame_pipeline;
pub mod live_pipeline;
pub mod pipeline_logger;
pub mod pipeline_stats;
