pub mod api;
pub mod rate_limit;

use crate::cli::Args;
use crate::relay::ChatRelay;
use self::api::AppState;
use self::rate_limit::build_limiter;

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use log::{ info, error };

pub struct Server {
    addr: String,
    state: AppState,
    rate_limit_window: Duration,
    args: Args,
}

impl Server {
    pub fn new(relay: ChatRelay, args: Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let rate_limit_window = Duration::from_secs(args.rate_limit_window_secs);
        let limiter = build_limiter(rate_limit_window, args.rate_limit_max_requests)?;
        info!(
            "Rate limit: {} requests per {}s per client (trust proxy: {})",
            args.rate_limit_max_requests,
            args.rate_limit_window_secs,
            args.trust_proxy
        );

        Ok(Self {
            addr: args.server_addr.clone(),
            state: AppState {
                relay,
                limiter: Arc::new(limiter),
                trust_proxy: args.trust_proxy,
            },
            rate_limit_window,
            args,
        })
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;
        self.spawn_limiter_housekeeping();

        let app = api::router(self.state.clone()).into_make_service_with_connect_info::<SocketAddr>();

        if self.args.enable_tls {
            let (cert_path, key_path) = match (&self.args.tls_cert_path, &self.args.tls_key_path) {
                (Some(cert_path), Some(key_path)) => (cert_path, key_path),
                (Some(_), None) | (None, Some(_)) => {
                    error!("Both --tls-cert-path and --tls-key-path must be provided to enable TLS.");
                    return Err("Missing TLS certificate or key path".into());
                }
                (None, None) => {
                    error!("--enable-tls was set but no certificate/key paths provided.");
                    return Err("TLS enabled without cert/key".into());
                }
            };
            info!("TLS enabled. Loading certificate from '{}' and key from '{}'", cert_path, key_path);

            // Both ring and aws-lc-rs are compiled in; pick one explicitly.
            let _ = rustls::crypto::ring::default_provider().install_default();
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            info!("HTTPS server listening on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config).serve(app).await?;
        } else {
            let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
                error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
                e
            })?;
            info!("HTTP server listening on: http://{}", addr);
            axum::serve(listener, app).await?;
        }

        Ok(())
    }

    /// Drops limiter entries for clients that have been idle for a full window.
    fn spawn_limiter_housekeeping(&self) {
        let limiter = Arc::clone(&self.state.limiter);
        let period = self.rate_limit_window.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                limiter.retain_recent();
            }
        });
    }
}
