pub mod analysis_executor;
pub mod analysis_logger;
pub mod detection_orchestrator;
pub mod infrastructure;
pub mod qr_analyzer;
pub mod report;
