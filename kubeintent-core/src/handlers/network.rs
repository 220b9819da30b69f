// kubeintent-core/src/handlers/network.rs

//! Network diagnostic workflows.
//!
//! Only the pod-to-node lookup is executed. Everything else is returned as
//! guidance, since captures and `exec` sessions are not safe to fire blindly.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::models::response::{NetworkTarget, NetworkWorkflow, NetworkWorkflowResult};
use crate::orchestrator::Orchestrator;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_INTERFACE: &str = "eth0";

const DEBUG_IMAGE: &str = "nicolaka/netshoot";

lazy_static! {
    static ref POD_PATTERN: Regex =
        Regex::new(r"(?i)\bpods?(?:/|:\s*|\s+(?:named\s+|called\s+)?)([a-z0-9]([-a-z0-9.]*[a-z0-9])?)")
            .expect("pod pattern is valid");
    static ref NAMESPACE_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)\bin\s+(?:the\s+)?([a-z0-9]([-a-z0-9]*[a-z0-9])?)\s+namespace\b")
            .expect("namespace pattern is valid"),
        Regex::new(r"(?i)(?:\bnamespace|\s-n)[:=\s]+([a-z0-9]([-a-z0-9]*[a-z0-9])?)")
            .expect("namespace flag pattern is valid"),
    ];
    static ref INTERFACE_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:interface|iface|dev)[:=\s]+([a-z0-9@._-]+)|\b(eth\d+|ens\w+|enp\w+|cni\d+|tun\d+|vxlan\w*|flannel\.\d+|cali\w+|br-\w+|lo)\b"
    )
    .expect("interface pattern is valid");
}

/// Words that follow "pod" in prose but are not pod names.
const NOT_POD_NAMES: &[&str] = &[
    "is", "are", "can", "cannot", "to", "in", "on", "and", "the", "a", "an", "from", "with",
    "network", "networking", "connectivity", "traffic", "dns", "ip", "logs",
];

pub fn detect_workflow(query: &str) -> NetworkWorkflow {
    let lowered = query.to_lowercase();
    let has = |terms: &[&str]| terms.iter().any(|t| lowered.contains(t));
    if has(&["tcpdump", "packet", "capture", "pcap"]) {
        NetworkWorkflow::PacketCapture
    } else if has(&["dns", "nslookup", "resolv"]) {
        NetworkWorkflow::Dns
    } else if has(&["socket", "netstat", "port", "listening"]) {
        NetworkWorkflow::SocketStats
    } else if has(&["connectivity", "reachab", "ping", "traceroute", "latency", "timeout"]) {
        NetworkWorkflow::Connectivity
    } else {
        NetworkWorkflow::General
    }
}

pub fn extract_target(query: &str) -> NetworkTarget {
    let pod = POD_PATTERN
        .captures_iter(query)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .find(|name| !NOT_POD_NAMES.contains(&name.as_str()));

    let namespace = NAMESPACE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(query).and_then(|caps| caps.get(1)))
        .map(|m| m.as_str().to_lowercase())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());

    let interface = INTERFACE_PATTERN
        .captures(query)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());

    NetworkTarget {
        pod,
        namespace,
        interface,
    }
}

/// The node lookup for `pod`. Safe to run unattended.
pub fn discovery_command(pod: &str, namespace: &str) -> String {
    format!(
        "kubectl get pod {} -n {} -o jsonpath={{.spec.nodeName}}",
        pod, namespace
    )
}

/// Canned commands for `workflow`. Unknown pod or node names are left as
/// `<pod>` / `<node>` placeholders.
pub fn guidance_commands(
    workflow: NetworkWorkflow,
    target: &NetworkTarget,
    node: Option<&str>,
) -> Vec<String> {
    let ns = &target.namespace;
    let pod = target.pod.as_deref().unwrap_or("<pod>");
    let node = node.unwrap_or("<node>");
    let iface = &target.interface;

    match workflow {
        NetworkWorkflow::Dns => vec![
            format!(
                "kubectl exec -n {} {} -- nslookup kubernetes.default.svc.cluster.local",
                ns, pod
            ),
            format!("kubectl exec -n {} {} -- cat /etc/resolv.conf", ns, pod),
            "kubectl get pods -n kube-system -l k8s-app=kube-dns -o wide".to_string(),
            "kubectl logs -n kube-system -l k8s-app=kube-dns --tail=50".to_string(),
        ],
        NetworkWorkflow::Connectivity => vec![
            format!("kubectl get pod {} -n {} -o wide", pod, ns),
            format!("kubectl exec -n {} {} -- ping -c 3 <target-ip>", ns, pod),
            format!(
                "kubectl exec -n {} {} -- curl -sv --max-time 5 http://<service>:<port>",
                ns, pod
            ),
            format!("kubectl get endpoints -n {}", ns),
            format!("kubectl get networkpolicies -n {}", ns),
        ],
        NetworkWorkflow::PacketCapture => vec![
            format!(
                "kubectl debug -n {} {} -it --image={} -- tcpdump -i {} -nn -c 100",
                ns, pod, DEBUG_IMAGE, iface
            ),
            format!(
                "kubectl debug node/{} -it --image={} -- tcpdump -i {} -nn -c 100 -w /tmp/capture.pcap",
                node, DEBUG_IMAGE, iface
            ),
        ],
        NetworkWorkflow::SocketStats => vec![
            format!("kubectl exec -n {} {} -- ss -tunap", ns, pod),
            format!("kubectl exec -n {} {} -- netstat -tulpn", ns, pod),
            format!("kubectl debug node/{} -it --image={} -- ss -s", node, DEBUG_IMAGE),
        ],
        NetworkWorkflow::General => vec![
            format!("kubectl get pods -n {} -o wide", ns),
            format!("kubectl get svc -n {}", ns),
            "kubectl get networkpolicies -A".to_string(),
            format!("kubectl get events -n {} --sort-by=.lastTimestamp", ns),
        ],
    }
}

pub async fn run_network_workflow(
    orchestrator: &Orchestrator,
    query: &str,
) -> NetworkWorkflowResult {
    let workflow = detect_workflow(query);
    let target = extract_target(query);
    debug!(workflow = ?workflow, target = ?target, "Network workflow selected");

    let discovery = match &target.pod {
        Some(pod) => Some(
            orchestrator
                .execute(&discovery_command(pod, &target.namespace))
                .await,
        ),
        None => None,
    };
    let node = discovery
        .as_ref()
        .filter(|o| o.success())
        .map(|o| o.output.trim().trim_matches('\'').to_string())
        .filter(|n| !n.is_empty());

    let guidance = guidance_commands(workflow, &target, node.as_deref());
    let summary = match (&target.pod, &node, &discovery) {
        (Some(pod), Some(node), _) => format!(
            "Pod '{}' in namespace '{}' is scheduled on node '{}'. {} suggested command(s) follow.",
            pod,
            target.namespace,
            node,
            guidance.len()
        ),
        (Some(pod), None, Some(outcome)) => format!(
            "Could not resolve the node for pod '{}' in namespace '{}': {}. {} suggested command(s) follow.",
            pod,
            target.namespace,
            outcome.failure_reason(),
            guidance.len()
        ),
        _ => format!(
            "No pod was named, so nothing was executed. {} suggested command(s) follow.",
            guidance.len()
        ),
    };

    info!(workflow = ?workflow, node = ?node, "Network workflow finished");
    NetworkWorkflowResult {
        query: query.to_string(),
        workflow,
        target,
        discovery,
        node,
        guidance,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLog;
    use crate::tools::ProcessRunner;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_detect_workflow() {
        assert_eq!(detect_workflow("capture packets on web-1"), NetworkWorkflow::PacketCapture);
        assert_eq!(detect_workflow("run tcpdump on pod api"), NetworkWorkflow::PacketCapture);
        assert_eq!(detect_workflow("DNS lookups are failing"), NetworkWorkflow::Dns);
        assert_eq!(detect_workflow("which ports are listening"), NetworkWorkflow::SocketStats);
        assert_eq!(detect_workflow("is the db reachable"), NetworkWorkflow::Connectivity);
        assert_eq!(detect_workflow("debug the network"), NetworkWorkflow::General);
    }

    #[test]
    fn test_extract_target() {
        let target = extract_target(
            "capture packets on pod web-7f9c in payments namespace on interface eth1",
        );
        assert_eq!(target.pod.as_deref(), Some("web-7f9c"));
        assert_eq!(target.namespace, "payments");
        assert_eq!(target.interface, "eth1");

        let target = extract_target("check dns from pod/api-0 -n staging");
        assert_eq!(target.pod.as_deref(), Some("api-0"));
        assert_eq!(target.namespace, "staging");
        assert_eq!(target.interface, DEFAULT_INTERFACE);
    }

    #[test]
    fn test_extract_target_defaults() {
        let target = extract_target("pod network is slow");
        assert_eq!(target.pod, None);
        assert_eq!(target.namespace, DEFAULT_NAMESPACE);
        assert_eq!(target.interface, DEFAULT_INTERFACE);
    }

    #[test]
    fn test_discovery_command_is_safe_and_direct() {
        let command = discovery_command("web-1", "prod");
        assert_eq!(command, "kubectl get pod web-1 -n prod -o jsonpath={.spec.nodeName}");
        assert!(crate::safety::is_safe(&command));
        assert_eq!(
            crate::tools::execution_mode(&command),
            crate::models::execution::ExecutionMode::Direct
        );
    }

    #[test]
    fn test_guidance_uses_target() {
        let target = NetworkTarget {
            pod: Some("web-1".to_string()),
            namespace: "prod".to_string(),
            interface: "eth1".to_string(),
        };
        let commands = guidance_commands(NetworkWorkflow::PacketCapture, &target, Some("worker-3"));
        assert!(commands.iter().all(|c| c.contains("-i eth1")));
        assert!(commands[1].contains("node/worker-3"));

        let unknown = NetworkTarget {
            pod: None,
            ..target
        };
        let commands = guidance_commands(NetworkWorkflow::SocketStats, &unknown, None);
        assert!(commands[0].contains("<pod>"));
        assert!(commands[2].contains("node/<node>"));
    }

    /// An orchestrator whose PATH ends with a directory holding a fake
    /// `kubectl` with the given script body. `None` when a real kubectl is
    /// already on PATH and would shadow the fake.
    #[cfg(unix)]
    fn orchestrator_with_kubectl(dir: &std::path::Path, body: &str) -> Option<Orchestrator> {
        use std::os::unix::fs::PermissionsExt;

        let shadowed = std::env::var_os("PATH")
            .map(|path| std::env::split_paths(&path).any(|d| d.join("kubectl").is_file()))
            .unwrap_or(false);
        if shadowed {
            return None;
        }
        let script = dir.join("kubectl");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let runner = ProcessRunner::new(vec![dir.to_path_buf()]);
        Some(Orchestrator::new(runner, Duration::from_secs(5), Arc::new(AuditLog::new())))
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_named_pod_resolves_node() {
        let dir = tempfile::tempdir().unwrap();
        let Some(orch) = orchestrator_with_kubectl(dir.path(), "echo \"'worker-3'\"") else {
            return;
        };
        let result =
            run_network_workflow(&orch, "capture packets on pod web-1 in payments namespace").await;

        assert_eq!(result.workflow, NetworkWorkflow::PacketCapture);
        assert_eq!(result.node.as_deref(), Some("worker-3"));
        let discovery = result.discovery.as_ref().unwrap();
        assert_eq!(
            discovery.command,
            "kubectl get pod web-1 -n payments -o jsonpath={.spec.nodeName}"
        );
        assert!(discovery.success());
        assert!(result.guidance.iter().any(|c| c.contains("node/worker-3")));
        assert!(result.guidance.iter().all(|c| !c.contains("<node>")));
        assert!(
            result
                .summary
                .starts_with("Pod 'web-1' in namespace 'payments' is scheduled on node 'worker-3'."),
            "{}",
            result.summary
        );
        assert_eq!(orch.audit().len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_lookup_keeps_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let body = "echo 'Error from server (NotFound): pods \"web-1\" not found' >&2\nexit 1";
        let Some(orch) = orchestrator_with_kubectl(dir.path(), body) else {
            return;
        };
        let result = run_network_workflow(&orch, "which ports is pod web-1 listening on").await;

        assert_eq!(result.workflow, NetworkWorkflow::SocketStats);
        assert!(result.node.is_none());
        assert_eq!(result.discovery.as_ref().map(|o| o.exit_code), Some(1));
        assert!(result.guidance.iter().any(|c| c.contains("node/<node>")));
        assert!(
            result
                .summary
                .starts_with("Could not resolve the node for pod 'web-1' in namespace 'default'"),
            "{}",
            result.summary
        );
        assert_eq!(orch.audit().len(), 1);
    }

    #[tokio::test]
    async fn test_no_pod_runs_nothing() {
        let orch = Orchestrator::new(
            ProcessRunner::default(),
            Duration::from_secs(5),
            Arc::new(AuditLog::new()),
        );
        let result = run_network_workflow(&orch, "dns seems broken").await;

        assert_eq!(result.workflow, NetworkWorkflow::Dns);
        assert!(result.discovery.is_none());
        assert!(result.node.is_none());
        assert!(!result.guidance.is_empty());
        assert!(orch.audit().is_empty());
        assert!(result.summary.starts_with("No pod was named"));
    }
}
