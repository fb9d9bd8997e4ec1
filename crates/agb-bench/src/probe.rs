// SPDX-License-Identifier: MIT OR Apache-2.0
//! Health probes gating benchmark participation.

use crate::config::AgentEndpoint;
use std::collections::HashMap;
use std::time::Duration;
use tracing::info;

/// Probe one health endpoint; any 200 within the timeout counts.
pub async fn check_health(client: &reqwest::Client, url: &str, timeout: Duration) -> bool {
    match client.get(url).timeout(timeout).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}

/// Probe every agent, checking each port once (multi-model agents share a
/// process). Returns the agents that answered healthy, in table order.
pub async fn healthy_agents(
    client: &reqwest::Client,
    agents: &[AgentEndpoint],
    timeout: Duration,
) -> Vec<AgentEndpoint> {
    let mut port_status: HashMap<u16, bool> = HashMap::new();
    let mut healthy = Vec::new();

    for agent in agents {
        let ok = match port_status.get(&agent.port) {
            Some(ok) => *ok,
            None => {
                let ok = check_health(client, &agent.health, timeout).await;
                port_status.insert(agent.port, ok);
                ok
            }
        };
        if ok {
            info!(agent = %agent.name, port = agent.port, "healthy");
            healthy.push(agent.clone());
        } else {
            info!(agent = %agent.name, port = agent.port, "not reachable");
        }
    }

    healthy
}
