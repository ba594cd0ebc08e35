//! Presentation: terminal views and the HTML dashboard export.

pub mod generator;
pub mod html;

pub use generator::{
    missing_file_notice, render_insights, render_sample_questions, render_table,
    render_transcript,
};
pub use html::render_dashboard_html;
