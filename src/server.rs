use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, field, info, instrument};

use crate::codec::FrameCodec;
use crate::commands::{self, Fakes, Handler, Registry};
use crate::connection::Connection;
use crate::frame;
use crate::Error;

/// Listens for clients and serves every connection from its own task.
pub struct Server {
    listener: TcpListener,
    state: Arc<State>,
    shutdown: CancellationToken,
}

/// Everything connections share. It is never mutated once the server is built.
struct State {
    registry: Registry,
    fakes: Fakes,
    max_frame_size: usize,
    max_depth: usize,
}

pub struct ServerBuilder {
    registry: Registry,
    fakes: Fakes,
    max_frame_size: usize,
    max_depth: usize,
}

/// Stops a running [`Server`]. Connections already accepted are left to finish on their own.
#[derive(Clone, Debug)]
pub struct StopHandle(CancellationToken);

impl StopHandle {
    pub fn stop(&self) {
        self.0.cancel();
    }
}

impl ServerBuilder {
    /// Registers `handler` for the command `name`.
    pub fn handler<H: Handler + 'static>(mut self, name: &str, handler: H) -> Self {
        self.registry.register(name, Arc::new(handler));
        self
    }

    /// Registers one handler instance for several commands.
    pub fn handlers(mut self, names: &[&str], handler: Arc<dyn Handler>) -> Self {
        for name in names {
            self.registry.register(name, handler.clone());
        }
        self
    }

    /// Replaces the default fake configuration and canned replies.
    pub fn fakes(mut self, fakes: Fakes) -> Self {
        self.fakes = fakes;
        self
    }

    pub fn max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// How many levels aggregates in a request may nest. A deeper request closes its connection.
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub async fn bind<A: ToSocketAddrs>(self, addr: A) -> Result<Server, Error> {
        let listener = TcpListener::bind(addr).await?;

        Ok(Server {
            listener,
            state: Arc::new(State {
                registry: self.registry,
                fakes: self.fakes,
                max_frame_size: self.max_frame_size,
                max_depth: self.max_depth,
            }),
            shutdown: CancellationToken::new(),
        })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        ServerBuilder {
            registry: Registry::new(),
            fakes: Fakes::default(),
            max_frame_size: FrameCodec::DEFAULT_MAX_FRAME_SIZE,
            max_depth: frame::DEFAULT_MAX_DEPTH,
        }
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.listener.local_addr()?)
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.shutdown.clone())
    }

    /// Accepts connections until stopped. A failure to accept is fatal and returned, after the
    /// listening socket is closed.
    pub async fn run(self) -> Result<(), Error> {
        let Server {
            listener,
            state,
            shutdown,
        } = self;

        info!(
            "Redis server listening on {} with handlers for {:?}",
            listener.local_addr()?,
            state.registry
        );

        loop {
            let (socket, client_address) = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted?,
            };
            let state = state.clone();
            info!("Accepted connection from {:?}", client_address);

            tokio::spawn(async move {
                if let Err(e) = handle_connection(socket, client_address, state).await {
                    error!(error = %e, "Connection closed");
                }
            });
        }

        drop(listener);
        info!("Stop finished");
        Ok(())
    }
}

/// Runs a server on `127.0.0.1:port` with no handlers and the default fakes.
pub async fn run(port: u16) -> Result<(), Error> {
    let _ = tracing_subscriber::fmt()
        .try_init()
        .map_err(|e| debug!("Failed to initialize global tracing: {}", e));

    Server::builder().bind(("127.0.0.1", port)).await?.run().await
}

#[instrument(
    name = "connection",
    skip(stream, client_address, state),
    fields(connection_id, client_address)
)]
async fn handle_connection(
    stream: TcpStream,
    client_address: SocketAddr,
    state: Arc<State>,
) -> Result<(), Error> {
    let codec = FrameCodec::with_max_frame_size(state.max_frame_size).max_depth(state.max_depth);
    let mut conn = Connection::with_codec(stream, codec);

    tracing::Span::current()
        .record("connection_id", field::display(conn.id))
        .record("client_address", field::display(client_address));

    // Requests are answered one at a time, in the order they arrive.
    while let Some(frame) = conn.read_frame().await? {
        debug!("Received frame from client: {}", frame);
        let reply = commands::dispatch(&frame, &state.registry, &state.fakes)?;
        debug!("Sending response to client: {}", reply.escape_debug());

        conn.write_all(reply.as_bytes()).await?;
    }

    info!("Connection closed");
    Ok(())
}
