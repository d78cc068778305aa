//! Dev server assembly and accept loop.
//!
//! [`DevServer::new`] merges the caller's configuration over documented
//! defaults, normalizes the proxy tables, compiles wildcard filters and mock
//! scripts, and wires up the request pipeline. The returned instance is
//! ready to start; binding and running it is the caller's call.

mod client;
mod forward;
mod handler;
mod static_files;

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use http_body_util::combinators::BoxBody;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::mock::MockRouter;
use crate::routing::{normalize, RoutePlanner};

pub struct DevServer {
    config: Config,
    planner: RoutePlanner,
    mocks: MockRouter,
    client: client::HttpClient,
    content_base: PathBuf,
}

impl DevServer {
    /// Assemble a ready-to-start server from configuration.
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        config.validate()?;

        let (file_table, ajax_table) = normalize(&config)?;
        let mocks = MockRouter::build(&ajax_table, &config.cwd);
        let planner = RoutePlanner::new(
            file_table,
            config.protocol,
            config.hostname.clone(),
            config.port,
        );
        let client = client::create_http_client();
        let content_base = config.cwd.join(&config.content_base);

        Ok(Self {
            config,
            planner,
            mocks,
            client,
            content_base,
        })
    }

    /// Bind the listener without accepting yet; exposes the local address.
    pub async fn bind(self) -> Result<BoundServer, anyhow::Error> {
        let listener =
            TcpListener::bind((self.config.hostname.as_str(), self.config.port)).await?;
        let local_addr = listener.local_addr()?;
        Ok(BoundServer {
            server: Arc::new(self),
            listener,
            local_addr,
        })
    }

    /// Bind and serve until the process is stopped.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        self.bind().await?.serve().await
    }

    async fn handle(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<BoxBody<Bytes, hyper::Error>>, Infallible> {
        let ctx = handler::RequestHandlerContext {
            planner: &self.planner,
            mocks: &self.mocks,
            client: &self.client,
            content_base: &self.content_base,
        };
        handler::handle_request(&ctx, req).await
    }
}

pub struct BoundServer {
    server: Arc<DevServer>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections and handle requests until the task is dropped.
    pub async fn serve(self) -> Result<(), anyhow::Error> {
        let BoundServer {
            server,
            listener,
            local_addr,
        } = self;

        info!(
            "Listening on {}://{}",
            server.config.protocol.as_str(),
            local_addr
        );
        info!("Serving static content from {}", server.content_base.display());
        if !server.mocks.is_empty() {
            info!("Installed {} ajax mock route(s)", server.mocks.len());
        }
        debug!(
            "hot={} inline={} stats.colors={} (build watching is external)",
            server.config.hot, server.config.inline, server.config.stats.colors
        );

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let server = Arc::clone(&server);

            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req| {
                    let server = Arc::clone(&server);
                    async move { server.handle(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection from {}: {}", remote_addr, err);
                }
            });
        }
    }
}
