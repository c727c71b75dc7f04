//! The shared HTTP mux.

use std::collections::BTreeMap;

use {
    axum::Router,
    tokio::net::TcpListener,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info},
};

use crate::{Error, Result};

/// Collects module routers under their prefixes.
#[derive(Default)]
pub(crate) struct MuxBuilder {
    router: Router,
    owners: BTreeMap<String, String>,
}

impl MuxBuilder {
    pub(crate) fn mount(&mut self, module: &str, prefix: &str, router: Router) -> Result<()> {
        validate_prefix(module, prefix)?;
        if let Some(owner) = self.owners.get(prefix) {
            return Err(Error::HttpPrefix {
                module: module.to_string(),
                prefix: prefix.to_string(),
                reason: if owner == module {
                    "mounted twice"
                } else {
                    "already mounted by another module"
                },
            });
        }

        debug!(module, prefix, "mounting module routes");
        self.router = std::mem::take(&mut self.router).nest(prefix, router);
        self.owners.insert(prefix.to_string(), module.to_string());
        Ok(())
    }

    /// Finish the mux. `fallback` (the transport's own endpoints) answers
    /// every request no module route claimed.
    pub(crate) fn finish(self, fallback: Option<Router>) -> Router {
        match fallback {
            Some(fallback) => self.router.fallback_service(fallback),
            None => self.router,
        }
    }
}

/// Check a module's mount point.
pub fn validate_prefix(module: &str, prefix: &str) -> Result<()> {
    let reason = if !prefix.starts_with('/') {
        Some("must start with '/'")
    } else if prefix == "/" {
        Some("must not be the root")
    } else if prefix.ends_with('/') {
        Some("must not end with '/'")
    } else if prefix.contains(['{', '}', '*']) {
        Some("must not contain path parameters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(Error::HttpPrefix {
            module: module.to_string(),
            prefix: prefix.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Accept `":8080"` as shorthand for every interface.
pub(crate) fn normalize_addr(addr: &str) -> String {
    if addr.starts_with(':') {
        format!("0.0.0.0{addr}")
    } else {
        addr.to_string()
    }
}

/// Serve `router` on `addr` until `cancel` fires.
pub(crate) async fn serve(addr: String, router: Router, cancel: CancellationToken) -> Result<()> {
    let addr = normalize_addr(&addr);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::Http {
            addr: addr.clone(),
            source,
        })?;
    let bound = listener
        .local_addr()
        .map_or_else(|_| addr.clone(), |a| a.to_string());

    info!(addr = %bound, "starting HTTP server");
    axum::serve(listener, router)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|source| Error::Http {
            addr: bound.clone(),
            source,
        })?;
    info!(addr = %bound, "HTTP server stopped");
    Ok(())
}
