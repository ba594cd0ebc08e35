//! System prompt assembly.
//!
//! The prompt is the KYC funnel narrative, the loan section produced by the
//! aggregator, and the persona instruction, concatenated in that order. It
//! is built once per session and sent unchanged with every request.

/// Who the assistant speaks for.
#[derive(Debug, Clone, PartialEq)]
pub struct Persona {
    /// Company the analysis was produced for.
    pub company: String,
    /// Analyst the assistant represents.
    pub analyst: String,
}

#[cfg(test)]
impl Default for Persona {
    fn default() -> Self {
        Self {
            company: "Fido".to_string(),
            analyst: "Gloria Odamten".to_string(),
        }
    }
}

impl Persona {
    /// First name, used in the persona instruction and the greeting.
    pub fn analyst_first_name(&self) -> &str {
        self.analyst.split_whitespace().next().unwrap_or(&self.analyst)
    }
}

const KYC_FUNNEL_KNOWLEDGE: &str = "\
KYC FUNNEL ANALYSIS (PART 2 KNOWLEDGE):
- Observation: Around June 26, the 3rd-party KYC success rate trended UP (Graph 2), but the Verification Completed view trended DOWN (Graph 1).
- Possible Reasons:
    1. An update to the Liveness V2 SDK made it stricter, causing genuine users to fail or abandon the flow before hitting the 3rd party.
    2. The 3rd party API improved their pass rate for *submitted* images, but our internal UI bug prevented users from successfully submitting them.
    3. Network timeouts or latency issues between the Liveness End step and the Verification Completed view.
- Investigation Steps:
    1. Query API error logs between Step 3 (Liveness End) and Step 4 (Verification).
    2. Segment the drop-off data by Device Type (iOS vs Android) and App Version.
    3. Check average session time between Liveness Start and Liveness End to see if users are getting stuck.";

/// Build the system prompt.
pub fn compose_system_prompt(persona: &Persona, loan_section: &str) -> String {
    let first_name = persona.analyst_first_name();
    let mut prompt = String::new();

    prompt.push_str(&format!(
        "You are the Senior Data Assistant for {}, built by Data Analyst {}.\n",
        persona.company, persona.analyst
    ));
    prompt.push_str(
        "You have complete knowledge of the Loan Portfolio Power BI dashboard and the KYC Funnel analysis.\n\n",
    );
    prompt.push_str(KYC_FUNNEL_KNOWLEDGE);
    prompt.push_str("\n\nLOAN PORTFOLIO (PART 1 KNOWLEDGE):\n");
    prompt.push_str(loan_section);
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "Always answer as {}'s highly analytical AI assistant. Be concise. Use {}'s business context. \
         If asked to rank the best portfolios, cite the Top 3 from the PRE-CALCULATED LOAN AGGREGATIONS.",
        first_name, persona.company
    ));

    prompt
}

/// Opening assistant message of every session.
pub fn greeting(persona: &Persona) -> String {
    format!(
        "Hello! I am {}'s AI Assistant. I have analyzed the {} loan cohorts and the KYC funnel anomalies. How can I help you today?",
        persona.analyst_first_name(),
        persona.company
    )
}
