// kubeintent-core/src/fallback.rs

//! Known-good substitute commands for requests whose generated commands all failed.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

/// Keyword → command table. First match wins; the order is not a contract,
/// any matched entry is an acceptable fallback.
const FALLBACK_TABLE: &[(&str, &str)] = &[
    ("crashing", "kubectl get pods -A | grep -E 'CrashLoopBackOff|Error'"),
    ("crashloop", "kubectl get pods -A | grep -E 'CrashLoopBackOff|Error'"),
    ("failing", "kubectl get pods -A | grep -E 'CrashLoopBackOff|Error'"),
    ("failed", "kubectl get pods -A | grep -E 'CrashLoopBackOff|Error'"),
    ("pending", "kubectl get pods -A --field-selector=status.phase=Pending"),
    ("helm list", "helm list -A"),
    ("namespaces", "kubectl get namespaces"),
    ("nodes", "kubectl get nodes -o wide"),
    ("pods", "kubectl get pods -A"),
];

lazy_static! {
    static ref NAMESPACE_PATTERN: Regex =
        Regex::new(r"\bin\s+([a-z0-9]([-a-z0-9]*[a-z0-9])?)\s+namespace\b")
            .expect("namespace pattern is valid");
}

/// Maps `query` to a substitute command, or `None` when nothing matches.
pub fn select_fallback(query: &str) -> Option<String> {
    let lowered = query.to_lowercase();

    if lowered.contains("pods") {
        if let Some(namespace) = namespace_in(&lowered) {
            debug!(namespace = %namespace, "Using namespaced pod listing as fallback");
            return Some(format!("kubectl get pods -n {}", namespace));
        }
    }

    FALLBACK_TABLE
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(keyword, command)| {
            debug!(keyword = %keyword, command = %command, "Matched fallback keyword");
            command.to_string()
        })
}

/// Extracts `<token>` from "in `<token>` namespace".
fn namespace_in(lowered_query: &str) -> Option<&str> {
    NAMESPACE_PATTERN
        .captures(lowered_query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crashing_pods_maps_to_crashloop_filter() {
        let fallback = select_fallback("show me crashing pods").unwrap();
        assert!(fallback.contains("CrashLoopBackOff"), "{}", fallback);
    }

    #[test]
    fn test_failure_words_share_the_crashloop_filter() {
        let expected = "kubectl get pods -A | grep -E 'CrashLoopBackOff|Error'";
        for query in [
            "which jobs failed",
            "my deployment is failing",
            "pods in crashloop",
            "app keeps crashing",
        ] {
            assert_eq!(select_fallback(query).as_deref(), Some(expected), "{}", query);
        }
    }

    #[test]
    fn test_namespaced_pods() {
        assert_eq!(
            select_fallback("list pods in billing namespace").as_deref(),
            Some("kubectl get pods -n billing")
        );
        assert_eq!(
            select_fallback("List PODS in Team-A namespace please").as_deref(),
            Some("kubectl get pods -n team-a")
        );
    }

    #[test]
    fn test_namespace_without_pods_uses_table() {
        assert_eq!(
            select_fallback("show nodes in billing namespace").as_deref(),
            Some("kubectl get nodes -o wide")
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            select_fallback("which pods are pending?").as_deref(),
            Some("kubectl get pods -A --field-selector=status.phase=Pending")
        );
        assert_eq!(select_fallback("run helm list for me").as_deref(), Some("helm list -A"));
        assert_eq!(
            select_fallback("what namespaces exist").as_deref(),
            Some("kubectl get namespaces")
        );
        assert_eq!(select_fallback("get all pods").as_deref(), Some("kubectl get pods -A"));
    }

    #[test]
    fn test_no_match() {
        assert!(select_fallback("explain what a service mesh is").is_none());
        assert!(select_fallback("").is_none());
    }
}
