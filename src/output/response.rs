//! CLI response formatting and output.
//!
//! Provides JSON envelope, printing, and exit code mapping.

use serde::Serialize;
use slipway::error::Hint;
use slipway::{Error, ErrorCode, Result};

#[derive(Debug, Serialize)]
pub struct CliResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CliError>,
}

#[derive(Debug, Serialize)]
pub struct CliError {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hints: Option<Vec<Hint>>,
}

impl<T: Serialize> CliResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| {
            Error::internal_json(e.to_string(), Some("serialize response".to_string()))
        })
    }
}

impl CliResponse<()> {
    pub fn from_error(err: &Error) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(CliError {
                code: err.code.as_str().to_string(),
                message: err.message.clone(),
                details: err.details.clone(),
                hints: if err.hints.is_empty() {
                    None
                } else {
                    Some(err.hints.clone())
                },
            }),
        }
    }
}

fn print_response<T: Serialize>(response: &CliResponse<T>) -> Result<()> {
    use std::io::{self, Write};

    let payload = response.to_json()?;
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", payload) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            return Ok(()); // Exit gracefully on SIGPIPE
        }
        return Err(Error::internal_io(
            e.to_string(),
            Some("write stdout".to_string()),
        ));
    }
    Ok(())
}

pub fn print_success<T: Serialize>(data: T) -> Result<()> {
    print_response(&CliResponse::success(data))
}

pub fn map_cmd_result_to_json<T: Serialize>(
    result: Result<(T, i32)>,
) -> (Result<serde_json::Value>, i32) {
    match result {
        Ok((data, exit_code)) => match serde_json::to_value(data) {
            Ok(value) => (Ok(value), exit_code),
            Err(err) => (
                Err(Error::internal_json(
                    err.to_string(),
                    Some("serialize response".to_string()),
                )),
                1,
            ),
        },
        Err(err) => {
            let exit_code = exit_code_for_error(err.code);
            (Err(err), exit_code)
        }
    }
}

/// One exit code per failing class so callers can branch on the reason.
fn exit_code_for_error(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::ConfigMissingFile
        | ErrorCode::ConfigInvalidJson
        | ErrorCode::ConfigInvalidValue
        | ErrorCode::ValidationInvalidArgument => 2,

        ErrorCode::TargetNotFound => 4,

        ErrorCode::SshIdentityFileNotFound | ErrorCode::TransportConnectFailed => 10,

        ErrorCode::DeployStepFailed => 20,
        ErrorCode::DeployStepTimeout => 21,
        ErrorCode::DeployLockHeld => 22,

        ErrorCode::InternalIoError | ErrorCode::InternalJsonError | ErrorCode::InternalUnexpected => {
            1
        }
    }
}

pub fn print_json_result(result: Result<serde_json::Value>) -> Result<()> {
    match result {
        Ok(data) => print_success(data),
        Err(err) => print_response(&CliResponse::<()>::from_error(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slipway::error::StepFailedDetails;

    fn step_failure(exit_code: i32) -> Error {
        Error::step_failed(StepFailedDetails {
            step: "build_indexes".to_string(),
            target: "staging".to_string(),
            release_id: Some("20230110083000".to_string()),
            command: "rake create_indexes".to_string(),
            exit_code,
            stdout: "some stdout".to_string(),
            stderr: "some stderr".to_string(),
        })
    }

    #[test]
    fn step_failed_serializes_stdout_stderr() {
        let json = CliResponse::<()>::from_error(&step_failure(127))
            .to_json()
            .unwrap();

        assert!(json.contains("\"code\": \"deploy.step_failed\""));
        assert!(json.contains("some stdout"));
        assert!(json.contains("some stderr"));
        assert!(json.contains("\"exitCode\": 127"));
        assert!(json.contains("\"releaseId\": \"20230110083000\""));
    }

    #[test]
    fn step_failed_maps_to_exit_code_20() {
        let (_value, exit_code) =
            map_cmd_result_to_json::<serde_json::Value>(Err(step_failure(1)));
        assert_eq!(exit_code, 20);
    }

    #[test]
    fn timeout_and_lock_get_their_own_exit_codes() {
        assert_eq!(exit_code_for_error(ErrorCode::DeployStepTimeout), 21);
        assert_eq!(exit_code_for_error(ErrorCode::DeployLockHeld), 22);
        assert_eq!(exit_code_for_error(ErrorCode::TransportConnectFailed), 10);
        assert_eq!(exit_code_for_error(ErrorCode::TargetNotFound), 4);
        assert_eq!(exit_code_for_error(ErrorCode::ConfigMissingFile), 2);
    }

    #[test]
    fn lock_held_envelope_carries_the_stale_lock_hint() {
        let err = Error::lock_held("staging", "/projects/alarms/.slipway-lock");
        let json = CliResponse::<()>::from_error(&err).to_json().unwrap();

        assert!(json.contains("\"code\": \"deploy.lock_held\""));
        assert!(json.contains("rmdir /projects/alarms/.slipway-lock"));
    }

    #[test]
    fn success_keeps_the_handler_exit_code() {
        let (value, exit_code) =
            map_cmd_result_to_json(Ok((serde_json::json!({"ok": true}), 0)));
        assert_eq!(exit_code, 0);
        assert_eq!(value.unwrap()["ok"], true);
    }
}
