use crate::types::encoding::DecodeError;
use xcvm_derive::Error;

/// Errors raised while composing, validating or decoding an XCVM program.
///
/// Every error is fatal to the construction call that produced it and is
/// returned unchanged to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum XcvmError {
    /// A compose operation received a node of the wrong kind.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
    /// A binding cannot be placed at its position.
    #[error("invalid binding position {position}: {reason}")]
    InvalidBindingPosition { position: u32, reason: BindingFault },
    /// An instruction that moves funds was given no assets.
    #[error("{instruction} requires at least one asset")]
    EmptyAssetList { instruction: &'static str },
    /// A ratio with a zero denominator.
    #[error("invalid ratio: denominator is {denominator}")]
    InvalidRatio { denominator: u64 },
    /// Bytes do not match the wire layout.
    #[error("decoding error: {0}")]
    Decode(DecodeError),
    /// Spawned programs nest deeper than the configured limit allows.
    #[error("spawn nesting of {depth} exceeds depth limit {limit}")]
    DepthExceeded { depth: usize, limit: usize },
    /// Assembly source error with line number context.
    #[error("line {line}: {message}")]
    Assembly { line: usize, message: String },
    /// File I/O error while reading or writing a program.
    #[error("io error: {0}")]
    Io(String),
}

/// Why a binding position was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BindingFault {
    /// Another binding in the same call already targets this position.
    #[error("duplicate position")]
    Duplicate,
    /// The position is not inside the call payload.
    #[error("outside payload of {len} bytes")]
    OutsidePayload { len: usize },
    /// `result(i)` does not name an instruction that runs before the call.
    #[error("result({result}) does not precede instruction {index}")]
    ForwardResult { result: u32, index: usize },
}

/// Invariant violations found while decoding surface as the original error.
impl From<DecodeError> for XcvmError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Invariant(inner) => *inner,
            other => XcvmError::Decode(other),
        }
    }
}

impl From<XcvmError> for DecodeError {
    fn from(err: XcvmError) -> Self {
        match err {
            XcvmError::Decode(inner) => inner,
            other => DecodeError::Invariant(Box::new(other)),
        }
    }
}

impl From<std::io::Error> for XcvmError {
    fn from(err: std::io::Error) -> Self {
        XcvmError::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mismatch_message() {
        let err = XcvmError::TypeMismatch {
            expected: "Absolute|Unit|Ratio",
            actual: "Relayer",
        };
        assert_eq!(
            err.to_string(),
            "type mismatch: expected Absolute|Unit|Ratio, got Relayer"
        );
    }

    #[test]
    fn binding_fault_is_rendered_inline() {
        let err = XcvmError::InvalidBindingPosition {
            position: 4,
            reason: BindingFault::ForwardResult {
                result: 3,
                index: 2,
            },
        };
        assert_eq!(
            err.to_string(),
            "invalid binding position 4: result(3) does not precede instruction 2"
        );
    }

    #[test]
    fn decode_error_converts() {
        let err: XcvmError = DecodeError::BadMagic.into();
        assert_eq!(err, XcvmError::Decode(DecodeError::BadMagic));
        assert_eq!(err.to_string(), "decoding error: bad magic");
    }

    #[test]
    fn invariant_violation_unwraps_on_conversion() {
        let invariant = XcvmError::InvalidRatio { denominator: 0 };
        let decode: DecodeError = invariant.clone().into();
        assert_eq!(decode, DecodeError::Invariant(Box::new(invariant.clone())));
        assert_eq!(decode.to_string(), "invalid ratio: denominator is 0");
        assert_eq!(XcvmError::from(decode), invariant);
    }
}
