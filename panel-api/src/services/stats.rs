//! Cross-protocol user counts.
//!
//! Every inbound contributes independently: an inbound whose client list cannot be
//! read adds zero and never affects the others. Only failing to enumerate the
//! inbounds (or to fetch the online set) fails a whole count.

use std::collections::HashSet;
use std::sync::Arc;

use super::{InboundStore, OnlineTracker, ServiceError};
use crate::models::{Inbound, Membership};

/// Provisioned principals of one inbound, whether or not it is enabled.
pub fn provisioned(inbound: &Inbound) -> usize {
    match inbound.protocol.membership() {
        Membership::Clients => match inbound.clients() {
            Ok(clients) => clients.len(),
            Err(e) => {
                tracing::warn!(
                    inbound_id = inbound.id,
                    protocol = %inbound.protocol,
                    error = %e,
                    "Unreadable client list, counting zero"
                );
                0
            }
        },
        Membership::Peers => inbound.peer_count().unwrap_or(0),
        Membership::Untracked => 0,
    }
}

pub fn total_provisioned(inbounds: &[Inbound]) -> usize {
    inbounds.iter().map(provisioned).sum()
}

/// Emails of enabled clients on enabled inbounds that appear in `online`.
///
/// An email present under several inbounds is returned once.
pub fn online_identities(inbounds: &[Inbound], online: &HashSet<String>) -> HashSet<String> {
    let mut identities = HashSet::new();

    for inbound in inbounds.iter().filter(|ib| ib.enable) {
        match inbound.protocol.membership() {
            Membership::Clients => {
                let clients = match inbound.clients() {
                    Ok(clients) => clients,
                    Err(e) => {
                        tracing::warn!(
                            inbound_id = inbound.id,
                            protocol = %inbound.protocol,
                            error = %e,
                            "Unreadable client list, skipping for online count"
                        );
                        continue;
                    }
                };
                identities.extend(
                    clients
                        .into_iter()
                        .filter(|c| c.enable && online.contains(&c.email))
                        .map(|c| c.email),
                );
            }
            // Peers have no email, and nothing maps a peer to an online identity yet.
            // They count towards provisioned users only.
            Membership::Peers => {}
            Membership::Untracked => {}
        }
    }

    identities
}

/// The two aggregate endpoints over the panel's inbounds.
pub struct StatsService {
    inbounds: Arc<dyn InboundStore>,
    online: Arc<dyn OnlineTracker>,
}

impl StatsService {
    pub fn new(inbounds: Arc<dyn InboundStore>, online: Arc<dyn OnlineTracker>) -> Self {
        Self { inbounds, online }
    }

    pub async fn count_users(&self) -> Result<usize, ServiceError> {
        let inbounds = self.inbounds.all_inbounds().await?;
        let total = total_provisioned(&inbounds);
        tracing::debug!(inbounds = inbounds.len(), total, "Counted provisioned users");
        Ok(total)
    }

    pub async fn count_online(&self) -> Result<usize, ServiceError> {
        let inbounds = self.inbounds.all_inbounds().await?;
        let online: HashSet<String> = self.online.online_clients().await?.into_iter().collect();
        let count = online_identities(&inbounds, &online).len();
        tracing::debug!(online = online.len(), count, "Counted online users");
        Ok(count)
    }
}
