use serde::{Deserialize, Serialize};

/// Result codes shared by every fault executor and the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
    Ok,
    HandlerNotFound,
    DuplicateError,
    ServerError,
    DatabaseError,
    EnvironmentError,
    ParameterLess,
    IllegalParameters,
    IllegalCommand,
    ExecCommandError,
    DataNotFound,
}

impl Code {
    pub fn code(self) -> u32 {
        match self {
            Code::Ok => 200,
            Code::HandlerNotFound => 404,
            Code::DuplicateError => 406,
            Code::ServerError => 500,
            Code::DatabaseError => 605,
            Code::EnvironmentError => 606,
            Code::ParameterLess => 607,
            Code::IllegalParameters => 608,
            Code::IllegalCommand => 609,
            Code::ExecCommandError => 610,
            Code::DataNotFound => 611,
        }
    }

    pub fn default_msg(self) -> &'static str {
        match self {
            Code::Ok => "success",
            Code::HandlerNotFound => "handler not found",
            Code::DuplicateError => "duplicate experiment",
            Code::ServerError => "server error",
            Code::DatabaseError => "database error",
            Code::EnvironmentError => "environment error",
            Code::ParameterLess => "less parameter",
            Code::IllegalParameters => "illegal parameters",
            Code::IllegalCommand => "illegal command",
            Code::ExecCommandError => "exec command error",
            Code::DataNotFound => "data not found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub code: u32,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

impl Response {
    pub fn ok(result: serde_json::Value) -> Self {
        Self {
            code: Code::Ok.code(),
            success: true,
            err: None,
            result: Some(result),
        }
    }

    pub fn fail(code: Code, msg: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            success: false,
            err: Some(msg.into()),
            result: None,
        }
    }

    pub fn fail_default(code: Code) -> Self {
        Self::fail(code, code.default_msg())
    }

    pub fn is_code(&self, code: Code) -> bool {
        self.code == code.code()
    }

    /// Error text, or an empty string for successful responses.
    pub fn err_msg(&self) -> &str {
        self.err.as_deref().unwrap_or_default()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"code":{},"success":false,"err":"encode response: {}"}}"#,
                Code::ServerError.code(),
                e
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_response_serializes_result() {
        let resp = Response::ok(serde_json::json!("abc"));
        assert_eq!(resp.to_json(), r#"{"code":200,"success":true,"result":"abc"}"#);
    }

    #[test]
    fn test_fail_response_carries_code_and_message() {
        let resp = Response::fail(Code::IllegalParameters, "bad flag");
        assert!(!resp.success);
        assert!(resp.is_code(Code::IllegalParameters));
        assert_eq!(resp.err_msg(), "bad flag");
        assert_eq!(resp.to_json(), r#"{"code":608,"success":false,"err":"bad flag"}"#);
    }
}
