//! Mapping of backend failures to filesystem-style errors
//!
//! Applied once, to the error that finally propagates out of the retry
//! executor. Retry decisions never see the mapped form.

use crate::backend_error::BackendError;
use crate::error::Error;

type Constructor = fn(String) -> Error;

fn for_code(code: &str) -> Option<Constructor> {
    let ctor: Constructor = match code {
        "NoSuchBucket"
        | "NoSuchBucketPolicy"
        | "NoSuchKey"
        | "NoSuchLifecycleConfiguration"
        | "NoSuchUpload"
        | "NoSuchVersion"
        | "NotFound" => Error::NotFound,

        "AccessDenied"
        | "AccountProblem"
        | "AllAccessDisabled"
        | "CrossLocationLoggingProhibited"
        | "ExpiredToken"
        | "IllegalLocationConstraintException"
        | "InvalidAccessKeyId"
        | "InvalidBucketState"
        | "InvalidObjectState"
        | "InvalidPayer"
        | "InvalidSecurity"
        | "MethodNotAllowed"
        | "NotSignedUp"
        | "RequestTimeTooSkewed"
        | "SignatureDoesNotMatch" => Error::PermissionDenied,

        "BucketAlreadyExists" | "BucketAlreadyOwnedByYou" => Error::AlreadyExists,

        "BucketNotEmpty" => Error::NotEmpty,

        "AmbiguousGrantByEmailAddress"
        | "AuthorizationHeaderMalformed"
        | "BadDigest"
        | "CredentialsNotSupported"
        | "EntityTooLarge"
        | "EntityTooSmall"
        | "IllegalVersioningConfigurationException"
        | "IncompleteBody"
        | "IncorrectNumberOfFilesInPostRequest"
        | "InlineDataTooLarge"
        | "InvalidAddressingHeader"
        | "InvalidArgument"
        | "InvalidBucketName"
        | "InvalidDigest"
        | "InvalidEncryptionAlgorithmError"
        | "InvalidLocationConstraint"
        | "InvalidPart"
        | "InvalidPartOrder"
        | "InvalidPolicyDocument"
        | "InvalidRange"
        | "InvalidRequest"
        | "InvalidSOAPRequest"
        | "InvalidStorageClass"
        | "InvalidTargetBucketForLogging"
        | "InvalidToken"
        | "InvalidURI"
        | "KeyTooLongError"
        | "MalformedACLError"
        | "MalformedPOSTRequest"
        | "MalformedXML"
        | "MaxMessageLengthExceeded"
        | "MaxPostPreDataLengthExceededError"
        | "MetadataTooLarge"
        | "MissingAttachment"
        | "MissingContentLength"
        | "MissingRequestBodyError"
        | "MissingSecurityElement"
        | "MissingSecurityHeader"
        | "NoLoggingStatusForKey"
        | "PermanentRedirect"
        | "PreconditionFailed"
        | "Redirect"
        | "RequestIsNotMultiPartContent"
        | "RequestTorrentOfBucketError"
        | "RestoreAlreadyInProgress"
        | "TemporaryRedirect"
        | "TokenRefreshRequired"
        | "TooManyBuckets"
        | "UnexpectedContent"
        | "UnresolvableGrantByEmailAddress"
        | "UserKeyMustBeSpecified" => Error::InvalidArgument,

        "RequestTimeout" => Error::Timeout,

        "ServiceUnavailable" | "SlowDown" => Error::ConnectionRefused,

        "OperationAborted" => Error::Aborted,

        "InternalError" => Error::Io,

        "NotImplemented" => Error::UnsupportedFeature,

        _ => return None,
    };
    Some(ctor)
}

fn for_status(status: u16) -> Option<Constructor> {
    let ctor: Constructor = match status {
        301 | 307 | 400 | 412 | 416 => Error::InvalidArgument,
        403 | 405 => Error::PermissionDenied,
        404 => Error::NotFound,
        500 => Error::Io,
        501 => Error::UnsupportedFeature,
        503 => Error::ConnectionRefused,
        _ => return None,
    };
    Some(ctor)
}

/// Map the error that is about to propagate to its externally visible form.
///
/// Errors with no known code or status stay [`Error::Backend`].
pub fn translate_error(error: BackendError) -> Error {
    if error.is_cancelled() {
        return Error::Cancelled;
    }

    let ctor = match error.code() {
        Some(code) => for_code(code).or_else(|| error.status().and_then(for_status)),
        None => error.status().and_then(for_status),
    };

    match ctor {
        Some(ctor) => {
            let message = error
                .message()
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            ctor(message)
        }
        None => Error::Backend(error),
    }
}
