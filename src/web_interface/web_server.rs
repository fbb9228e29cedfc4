use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use log::info;

use super::routes::routes;
use crate::configuration::WebConfig;
use crate::error_handling::types::WebError;
use crate::vault::Vault;

/// Local HTTP surface for listing and downloading vaulted recordings.
pub struct WebServer {
    vault: Arc<Vault>,
}

impl WebServer {
    pub fn new(vault: Arc<Vault>) -> Self {
        Self { vault }
    }

    /// Socket address for `config`, rejecting an unparsable bind address.
    pub fn address(config: &WebConfig) -> Result<SocketAddr, WebError> {
        let ip: IpAddr = config.bind_address.parse().map_err(|e| {
            WebError::BindFailed(format!("invalid bind address {}: {}", config.bind_address, e))
        })?;
        Ok(SocketAddr::new(ip, config.port))
    }

    /// Serves until the process exits.
    pub async fn start(&self, addr: SocketAddr) -> Result<(), WebError> {
        info!("Web interface listening on http://{}", addr);
        warp::serve(routes(self.vault.clone())).run(addr).await;
        Ok(())
    }
}
