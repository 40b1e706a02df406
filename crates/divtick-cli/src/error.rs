use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] divtick_core::ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Ingest(#[from] divtick_core::IngestError),

    #[error(transparent)]
    Warehouse(#[from] divtick_core::WarehouseError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Ingest(divtick_core::IngestError::Config(_)) => 2,
            Self::Ingest(_) => 3,
            Self::Serialization(_) | Self::Csv(_) => 4,
            Self::Warehouse(_) | Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_problems_exit_like_bad_input() {
        let error = CliError::from(divtick_core::IngestError::Config(String::from(
            "SUPABASE_URL is not configured",
        )));
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn runtime_ingestion_failures_exit_with_three() {
        let error = CliError::from(divtick_core::IngestError::Transport(String::from("reset")));
        assert_eq!(error.exit_code(), 3);
    }
}
