//! Text and Markdown views.
//!
//! Terminal renderings of the dashboard: the raw cohort table, the
//! executive insights page, the suggested questions and the chat
//! transcript export.

use crate::analysis::format::format_columns;
use crate::assistant::ConversationState;
use crate::data::CohortTable;
use std::path::Path;

/// Questions offered when the chat starts.
pub const SAMPLE_QUESTIONS: [&str; 4] = [
    "Which are the top 3 best loan portfolios?",
    "What is the total outstanding loan balance?",
    "What happened to the KYC Funnel around June 26?",
    "How should we investigate the Liveness Check drop-off?",
];

/// Notice shown in place of the table when the CSV could not be loaded.
pub fn missing_file_notice(csv_path: &Path) -> String {
    let name = csv_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| csv_path.display().to_string());
    format!(
        "Missing '{}'. Please ensure it is in the root directory.",
        name
    )
}

/// Render every column of the loaded table, or the missing-file notice.
pub fn render_table(table: Option<&CohortTable>, csv_path: &Path) -> String {
    let Some(table) = table else {
        return format!("❌ {}", missing_file_notice(csv_path));
    };

    let headers: Vec<&str> = table.headers.iter().map(String::as_str).collect();
    let mut output = String::new();
    output.push_str("Raw Cohort Aggregations\n");
    output.push_str("This is the underlying data model driving the Power BI visual matrix.\n\n");
    output.push_str(&format_columns(&headers, &table.records));
    output.push_str(&format!("\n\n{} rows\n", table.records.len()));
    output
}

/// Render the suggested questions block.
pub fn render_sample_questions() -> String {
    let mut output = String::from("💡 Try asking:\n");
    for (i, question) in SAMPLE_QUESTIONS.iter().enumerate() {
        output.push_str(&format!("   {}. {}\n", i + 1, question));
    }
    output
}

/// The executive summary page as Markdown.
pub fn render_insights() -> String {
    let mut output = String::new();

    output.push_str("# Executive Summary: Portfolio & Funnel Diagnostics\n\n");
    output.push_str("This section synthesizes the findings from the 7-year loan portfolio analysis (Part 1) and the KYC onboarding anomaly (Part 2).\n\n");

    output.push_str("## 💰 Part 1: Loan Portfolio Health\n\n");
    output.push_str("**Top Performers:** By grouping data into monthly cohorts, we identified the top 3 best-performing portfolios based on recovery and low default rates. (e.g., Aug 2020).\n\n");
    output.push_str("**Risk vs. Volume:** The Power BI dashboard highlights that while total disbursements scaled, certain cohorts carried disproportionate loss rates, signaling a need to tighten credit criteria during specific economic windows.\n\n");
    output.push_str("> **Action:** Align marketing acquisition strategies to mirror the customer profiles from our Top 3 ranking cohorts.\n\n");

    output.push_str("## 📉 Part 2: The June 26 KYC Anomaly\n\n");
    output.push_str("**The Incident:** Around June 26, the 3rd-party success rate spiked, yet actual completed verifications dropped. This indicates a localized failure in the 'Liveness' stage of the onboarding funnel.\n\n");
    output.push_str("**Root Cause Hypothesis:** A strict update to the Liveness V2 parameters or a UI latency issue is causing users to abandon the app *before* their data is sent to the 3rd party for final verification.\n\n");
    output.push_str("> **Action:** Pull API error logs between `Liveness - V2 - end` and `Verification Completed` and segment drop-offs by device OS.\n\n");

    output.push_str("## 🚀 Next Steps for Data Strategy\n\n");
    output.push_str("1. **Implement Cohort Monitoring:** Set up automated alerts in Power BI when any new monthly cohort's `loss_rate` exceeds the historical average of the top 5 portfolios.\n");
    output.push_str("2. **Funnel Telemetry:** Introduce micro-event tracking inside the Liveness V2 screen to capture *where* users are failing (e.g., poor lighting, timeout, camera permission denial).\n");
    output.push_str("3. **A/B Testing:** Roll back Liveness parameters to pre-June 26 levels for a control group of users to isolate the variable causing the drop-off.\n");

    output
}

/// The session transcript as Markdown.
pub fn render_transcript(conversation: &ConversationState, title: &str) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {} - Chat Transcript\n\n", title));
    for message in conversation.messages() {
        output.push_str(&format!(
            "### {} {} ({})\n\n{}\n\n",
            message.role.emoji(),
            message.role,
            message.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            message.content
        ));
    }

    output
}
