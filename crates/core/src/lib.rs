//! Candidate QR region analysis for live camera streams.
//!
//! Frames are rate-limited by a [`capture::frame_gatekeeper::FrameGatekeeper`],
//! analyzed by a [`analysis::detection_orchestrator::DetectionOrchestrator`]
//! running injected vision capabilities, and reported through a
//! [`analysis::report::ReportSink`].

pub mod analysis;
pub mod capture;
pub mod detection;
pub mod error;
pub mod quality;
pub mod shared;
