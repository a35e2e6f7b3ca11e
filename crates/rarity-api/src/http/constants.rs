//! Shared HTTP constants (problem URIs, content types).

pub(crate) const PROBLEM_INTERNAL: &str = "https://rarity.dev/problems/internal";
pub(crate) const PROBLEM_BAD_REQUEST: &str = "https://rarity.dev/problems/bad-request";
pub(crate) const PROBLEM_NOT_FOUND: &str = "https://rarity.dev/problems/not-found";
pub(crate) const PROBLEM_TIMEOUT: &str = "https://rarity.dev/problems/timeout";
pub(crate) const PROBLEM_UPSTREAM: &str = "https://rarity.dev/problems/upstream";
pub(crate) const PROBLEM_ENGINE: &str = "https://rarity.dev/problems/engine";
pub(crate) const PROBLEM_SERVICE_UNAVAILABLE: &str =
    "https://rarity.dev/problems/service-unavailable";

pub(crate) const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";
