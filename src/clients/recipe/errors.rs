//! Provider error classification driving the fallback wrappers.

use crate::util::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProviderErrorClass {
    RateLimit,
    CreditExhausted,
    ServerError,
    ClientError,
    Unknown,
}

impl ProviderErrorClass {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ProviderErrorClass::RateLimit => "rate_limit",
            ProviderErrorClass::CreditExhausted => "credit_exhausted",
            ProviderErrorClass::ServerError => "server_error",
            ProviderErrorClass::ClientError => "client_error",
            ProviderErrorClass::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ClassifiedError {
    pub(crate) class: ProviderErrorClass,
    #[allow(dead_code)]
    pub(crate) message: String,
    #[allow(dead_code)]
    pub(crate) provider: String,
}

const RATE_LIMIT_MARKERS: &[&str] = &["status 429", "http 429", "rate limit", "too many requests"];
const CREDIT_MARKERS: &[&str] = &[
    "status 402",
    "http 402",
    "insufficient credit",
    "credit exhausted",
    "billing",
];
const SERVER_MARKERS: &[&str] = &["status 5", "http 5", "server error", "internal error"];
const CLIENT_MARKERS: &[&str] = &["status 4", "http 4", "bad request", "unauthorized", "forbidden"];

fn contains_any(message: &str, markers: &[&str]) -> bool {
    markers.iter().any(|marker| message.contains(marker))
}

/// Classify a provider error. Rules apply in order: rate limit and credit
/// markers win over the generic status buckets, and a typed status beats
/// message sniffing.
pub(crate) fn classify(error: &AppError, provider: &str) -> ClassifiedError {
    let message = error.to_string();
    let lower = message.to_lowercase();

    let class = if contains_any(&lower, RATE_LIMIT_MARKERS) {
        ProviderErrorClass::RateLimit
    } else if contains_any(&lower, CREDIT_MARKERS) {
        ProviderErrorClass::CreditExhausted
    } else if let Some(status) = error.upstream_status() {
        if status >= 500 {
            ProviderErrorClass::ServerError
        } else if status >= 400 {
            ProviderErrorClass::ClientError
        } else {
            ProviderErrorClass::Unknown
        }
    } else if contains_any(&lower, SERVER_MARKERS) {
        ProviderErrorClass::ServerError
    } else if contains_any(&lower, CLIENT_MARKERS) {
        ProviderErrorClass::ClientError
    } else {
        ProviderErrorClass::Unknown
    };

    ClassifiedError {
        class,
        message,
        provider: provider.to_string(),
    }
}

/// Retryable classes route to the secondary provider.
pub(crate) fn is_retryable_class(class: ProviderErrorClass) -> bool {
    matches!(
        class,
        ProviderErrorClass::RateLimit
            | ProviderErrorClass::CreditExhausted
            | ProviderErrorClass::ServerError
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_429_wins_over_the_4xx_bucket() {
        let error = AppError::generation("upstream said status 429", 429);
        assert_eq!(classify(&error, "groq").class, ProviderErrorClass::RateLimit);
    }

    #[test]
    fn status_500_is_a_server_error() {
        let error = AppError::generation("status 500", 500);
        assert_eq!(classify(&error, "groq").class, ProviderErrorClass::ServerError);
    }

    #[test]
    fn status_402_is_credit_exhaustion() {
        let error = AppError::generation("payment required", 402);
        // display embeds "status 402"
        assert_eq!(
            classify(&error, "openai").class,
            ProviderErrorClass::CreditExhausted
        );
    }

    #[test]
    fn billing_message_is_credit_exhaustion() {
        let error = AppError::Internal("Billing hard limit reached".to_string());
        assert_eq!(
            classify(&error, "openai").class,
            ProviderErrorClass::CreditExhausted
        );
    }

    #[test]
    fn typed_status_beats_message_sniffing() {
        let error = AppError::generation("something odd happened", 503);
        assert_eq!(classify(&error, "cerebras").class, ProviderErrorClass::ServerError);
    }

    #[test]
    fn unauthorized_is_a_client_error() {
        let error = AppError::Internal("unauthorized: bad key".to_string());
        assert_eq!(classify(&error, "groq").class, ProviderErrorClass::ClientError);
    }

    #[test]
    fn unclassified_messages_are_unknown_and_not_retryable() {
        let error = AppError::Internal("weird".to_string());
        let classified = classify(&error, "groq");
        assert_eq!(classified.class, ProviderErrorClass::Unknown);
        assert!(!is_retryable_class(classified.class));
    }

    #[test]
    fn retryable_classes_match_the_fallback_policy() {
        assert!(is_retryable_class(ProviderErrorClass::RateLimit));
        assert!(is_retryable_class(ProviderErrorClass::CreditExhausted));
        assert!(is_retryable_class(ProviderErrorClass::ServerError));
        assert!(!is_retryable_class(ProviderErrorClass::ClientError));
        assert!(!is_retryable_class(ProviderErrorClass::Unknown));
    }
}
