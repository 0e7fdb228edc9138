use std::fmt;

/// Stable error codes reported by every fallible operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TypeNotSupported,
    NumberOverflow,
    ScannerEvaluate,
    DstStructureInvalid,
    ArgumentInvalid,
    ScannerFailed,
    InvalidField,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TypeNotSupported => "ERROR_MORPH_CONVERTOR_TYPE_NOT_SUPPORTED",
            ErrorCode::NumberOverflow => "ERROR_MORPH_CONVERTOR_NUMBER_OVERFLOW",
            ErrorCode::ScannerEvaluate => "ERROR_MORPH_SCANNER_EVALUATE",
            ErrorCode::DstStructureInvalid => "ERROR_MORPH_SCANNER_DST_STRUCTURE_INVALID",
            ErrorCode::ArgumentInvalid => "ERROR_MORPH_SCANNER_ARGUMENT_INVALID",
            ErrorCode::ScannerFailed => "ERROR_MORPH_SCANNER_FAILED",
            ErrorCode::InvalidField => "ERROR_MORPH_INVALID_FIELD",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion and mapping error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvertError {
    #[error("type not supported: cannot convert {src_type} `{src}` to {dst_type}{}", reason_suffix(.reason))]
    TypeNotSupported {
        src: String,
        src_type: String,
        dst_type: String,
        reason: Option<String>,
    },

    #[error("number overflow: {from_type} `{value}` does not fit into {to_type}")]
    NumberOverflow {
        from_type: String,
        to_type: String,
        value: String,
    },

    #[error("unable to evaluate {element_type}: {reason}")]
    Evaluate { element_type: String, reason: String },

    #[error("{caller}: destination must be {expected}")]
    DstStructureInvalid {
        caller: &'static str,
        expected: &'static str,
    },

    #[error("{caller}: invalid argument: {reason}")]
    ArgumentInvalid { caller: &'static str, reason: String },

    #[error("failed to scan value into {record}: {reason}")]
    ScanFailed { record: String, reason: String },

    #[error("invalid field '{field}' on {record}")]
    InvalidField { record: String, field: String },
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(" ({reason})"),
        None => String::new(),
    }
}

pub type Result<T, E = ConvertError> = std::result::Result<T, E>;

impl ConvertError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ConvertError::TypeNotSupported { .. } => ErrorCode::TypeNotSupported,
            ConvertError::NumberOverflow { .. } => ErrorCode::NumberOverflow,
            ConvertError::Evaluate { .. } => ErrorCode::ScannerEvaluate,
            ConvertError::DstStructureInvalid { .. } => ErrorCode::DstStructureInvalid,
            ConvertError::ArgumentInvalid { .. } => ErrorCode::ArgumentInvalid,
            ConvertError::ScanFailed { .. } => ErrorCode::ScannerFailed,
            ConvertError::InvalidField { .. } => ErrorCode::InvalidField,
        }
    }

    /// Key/value payload of the error, in a stable order.
    pub fn details(&self) -> Vec<(&'static str, String)> {
        match self {
            ConvertError::TypeNotSupported { src, src_type, dst_type, reason } => {
                let mut details = vec![
                    ("src", src.clone()),
                    ("src_type", src_type.clone()),
                    ("dst_type", dst_type.clone()),
                ];
                if let Some(reason) = reason {
                    details.push(("reason", reason.clone()));
                }
                details
            }
            ConvertError::NumberOverflow { from_type, to_type, value } => vec![
                ("from_type", from_type.clone()),
                ("to_type", to_type.clone()),
                ("value", value.clone()),
            ],
            ConvertError::Evaluate { element_type, reason } => vec![
                ("element_type", element_type.clone()),
                ("reason", reason.clone()),
            ],
            ConvertError::DstStructureInvalid { caller, expected } => vec![
                ("caller", caller.to_string()),
                ("expected", expected.to_string()),
            ],
            ConvertError::ArgumentInvalid { caller, reason } => {
                vec![("caller", caller.to_string()), ("reason", reason.clone())]
            }
            ConvertError::ScanFailed { record, reason } => {
                vec![("record", record.clone()), ("reason", reason.clone())]
            }
            ConvertError::InvalidField { record, field } => {
                vec![("record", record.clone()), ("field", field.clone())]
            }
        }
    }

    /// Add context to the error.
    ///
    /// Variants carrying a free-form reason get the context prepended to it.
    /// Other variants are returned unchanged, so the code and payload stay stable.
    pub fn with_context(self, ctx: impl fmt::Display) -> Self {
        match self {
            ConvertError::TypeNotSupported { src, src_type, dst_type, reason } => {
                ConvertError::TypeNotSupported {
                    src,
                    src_type,
                    dst_type,
                    reason: Some(match reason {
                        Some(reason) => format!("{ctx}: {reason}"),
                        None => ctx.to_string(),
                    }),
                }
            }
            ConvertError::ArgumentInvalid { caller, reason } => ConvertError::ArgumentInvalid {
                caller,
                reason: format!("{ctx}: {reason}"),
            },
            ConvertError::ScanFailed { record, reason } => ConvertError::ScanFailed {
                record,
                reason: format!("{ctx}: {reason}"),
            },
            ConvertError::Evaluate { element_type, reason } => ConvertError::Evaluate {
                element_type,
                reason: format!("{ctx}: {reason}"),
            },
            other => other,
        }
    }

    // ---------------------------------------------------------------------------
    // Constructors used across the engine
    // ---------------------------------------------------------------------------

    pub(crate) fn unsupported(src: &crate::Value, dst_type: impl fmt::Display) -> Self {
        ConvertError::TypeNotSupported {
            src: src.to_string(),
            src_type: src.type_name(),
            dst_type: dst_type.to_string(),
            reason: None,
        }
    }

    pub(crate) fn unsupported_because(
        src: &crate::Value,
        dst_type: impl fmt::Display,
        reason: impl fmt::Display,
    ) -> Self {
        ConvertError::TypeNotSupported {
            src: src.to_string(),
            src_type: src.type_name(),
            dst_type: dst_type.to_string(),
            reason: Some(reason.to_string()),
        }
    }

    pub(crate) fn overflow(src: &crate::Value, to_type: impl fmt::Display) -> Self {
        ConvertError::NumberOverflow {
            from_type: src.type_name(),
            to_type: to_type.to_string(),
            value: src.to_string(),
        }
    }
}
