//! Effects produced by state transitions

pub const TABLE_EMERGENCIES: &str = "Emergencies";
pub const TABLE_APPOINTMENTS: &str = "Appointments";

/// Side effects to be dispatched to the notification sink after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Append one record to a named table
    AppendRecord { table: String, fields: Vec<String> },

    /// Send an alert to the fixed recipient
    Notify { subject: String, body: String },
}

impl Effect {
    pub fn append(table: &str, fields: Vec<String>) -> Self {
        Effect::AppendRecord {
            table: table.to_string(),
            fields,
        }
    }

    pub fn notify(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Effect::Notify {
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Short name for logs and failure annotations
    pub fn kind(&self) -> &'static str {
        match self {
            Effect::AppendRecord { .. } => "append",
            Effect::Notify { .. } => "notify",
        }
    }
}
