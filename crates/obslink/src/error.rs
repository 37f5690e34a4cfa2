use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("could not reach OBS within {0}s")]
    ConnectTimeout(u64),

    #[error("no {0} available from OBS")]
    NoData(&'static str),

    #[error(transparent)]
    Core(#[from] obslink_core::CoreError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectTimeout(_) => 2,
            Self::NoData(_) => 3,
            Self::Core(_) | Self::Json(_) => 1,
        }
    }
}
