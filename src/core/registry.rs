//! Per-client request accounting.

use std::collections::HashMap;

use crate::core::AdmissionError;
use crate::util::ids::{ClientId, RequestId};

/// Tracks which requests each client currently has in the system.
///
/// A client's entry exists only while it owns at least one request.
#[derive(Debug)]
pub struct ClientRegistry {
    max_client_requests: usize,
    clients: HashMap<ClientId, Vec<RequestId>>,
}

impl ClientRegistry {
    /// Create a registry enforcing `max_client_requests` per client.
    #[must_use]
    pub fn new(max_client_requests: usize) -> Self {
        Self {
            max_client_requests,
            clients: HashMap::new(),
        }
    }

    /// Record `request` against `client`.
    ///
    /// # Errors
    ///
    /// [`AdmissionError::ClientLimitExceeded`] when the client is already at
    /// its limit. Nothing is recorded in that case.
    pub fn register(&mut self, client: &ClientId, request: RequestId) -> Result<(), AdmissionError> {
        if self.size(client) >= self.max_client_requests {
            return Err(AdmissionError::ClientLimitExceeded {
                client: client.clone(),
                limit: self.max_client_requests,
            });
        }
        let requests = self.clients.entry(client.clone()).or_default();
        if !requests.contains(&request) {
            requests.push(request);
        }
        Ok(())
    }

    /// Forget `request`. Unknown pairs are ignored.
    pub fn unregister(&mut self, client: &ClientId, request: RequestId) {
        let Some(requests) = self.clients.get_mut(client) else {
            return;
        };
        requests.retain(|r| *r != request);
        if requests.is_empty() {
            self.clients.remove(client);
        }
    }

    /// Requests currently held by `client` (0 if unknown).
    #[must_use]
    pub fn size(&self, client: &ClientId) -> usize {
        self.clients.get(client).map_or(0, Vec::len)
    }

    /// Number of clients with at least one request.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Per-client request counts.
    pub fn counts(&self) -> impl Iterator<Item = (&ClientId, usize)> {
        self.clients.iter().map(|(c, r)| (c, r.len()))
    }
}
