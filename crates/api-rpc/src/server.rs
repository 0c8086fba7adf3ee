//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP on localhost.

use crate::handler::RpcHandler;
use crate::types::{
    MaintenanceRequest, ProcessRequest, ResetRequest, StatusRequest, TailLogsRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9627;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to register {method}: {reason}")]
    Register { method: &'static str, reason: String },
}

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

/// Register `$method`, parsing params into `$req` and delegating to `$call`
macro_rules! register {
    ($module:expr, $handler:expr, $method:literal, $req:ty, $call:ident) => {{
        let handler = Arc::clone(&$handler);
        $module
            .register_async_method($method, move |params, _, _| {
                let handler = Arc::clone(&handler);
                async move {
                    let req: $req = params.parse()?;
                    handler.$call(req).await
                }
            })
            .map_err(|e| ServerError::Register {
                method: $method,
                reason: e.to_string(),
            })?;
    }};
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: RpcHandler) -> Self {
        Self {
            config,
            handler: Arc::new(handler),
        }
    }

    /// Build the method table
    pub fn module(&self) -> Result<RpcModule<()>, ServerError> {
        let mut module = RpcModule::new(());

        register!(module, self.handler, "batch.process.v1", ProcessRequest, process);
        register!(module, self.handler, "batch.status.v1", StatusRequest, status);
        register!(module, self.handler, "batch.reset.v1", ResetRequest, reset);
        register!(module, self.handler, "logs.tail.v1", TailLogsRequest, tail_logs);
        register!(
            module,
            self.handler,
            "admin.maintenance.v1",
            MaintenanceRequest,
            maintenance
        );

        Ok(module)
    }

    /// Start the JSON-RPC server.
    /// Returns the bound address (useful with port 0) and the server handle.
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let module = self.module()?;

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = server.local_addr().map_err(|source| ServerError::Bind {
            addr: addr.clone(),
            source,
        })?;

        info!(addr = %local_addr, "JSON-RPC server listening");

        Ok((local_addr, server.start(module)))
    }
}
