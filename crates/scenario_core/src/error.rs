use thiserror::Error;

/// How a caller should present a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Total probability for {actor} is 0. Please adjust.")]
    ZeroTotal { actor: String },

    #[error("Total for {actor} = {total}{unit}. Should be {expected}{unit}.")]
    NonNormalized {
        actor: String,
        total: f64,
        expected: f64,
        unit: &'static str,
    },

    #[error("Invalid trial count: {n} (must be greater than zero)")]
    InvalidTrialCount { n: usize },

    #[error("Unknown actor: {actor}")]
    UnknownActor { actor: String },

    #[error("Unknown posture for {actor}: {posture}")]
    UnknownPosture { actor: String, posture: String },

    #[error("No distribution supplied for {actor}")]
    MissingDistribution { actor: String },

    #[error("Invalid weight for {actor} - {posture}: {value}")]
    InvalidWeight {
        actor: String,
        posture: String,
        value: f64,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid scenario model: {0}")]
    InvalidModel(String),

    #[error("Invalid rule table: {0}")]
    InvalidRuleTable(String),

    #[error("Malformed table: {0}")]
    TableFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ScenarioError {
    /// Input problems the caller can fix and retry.
    pub fn is_recoverable(&self) -> bool {
        match self {
            ScenarioError::ZeroTotal { .. } => true,
            ScenarioError::NonNormalized { .. } => true,
            ScenarioError::InvalidTrialCount { .. } => true,
            ScenarioError::UnknownActor { .. } => true,
            ScenarioError::UnknownPosture { .. } => true,
            ScenarioError::MissingDistribution { .. } => true,
            ScenarioError::InvalidWeight { .. } => true,
            ScenarioError::Io(_) => true,
            _ => false,
        }
    }

    /// A non-normalized total is shown as a warning, everything else as an error.
    /// Both still block the run.
    pub fn severity(&self) -> Severity {
        match self {
            ScenarioError::NonNormalized { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Actor the error refers to, if any.
    pub fn actor(&self) -> Option<&str> {
        match self {
            ScenarioError::ZeroTotal { actor }
            | ScenarioError::NonNormalized { actor, .. }
            | ScenarioError::UnknownActor { actor }
            | ScenarioError::UnknownPosture { actor, .. }
            | ScenarioError::MissingDistribution { actor }
            | ScenarioError::InvalidWeight { actor, .. } => Some(actor),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ScenarioError>;
