//! Connection establishment and single-flight exchanges.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use resp_protocol::{Command, ProtocolError, Value};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::codec::Framed;

use crate::codec::RespCodec;
use crate::config::Config;
use crate::error::{Error, Result};

/// Process-unique connection ids, used by pools to tell connections apart.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// One established session to the store.
///
/// Carries the authentication and database-selection state negotiated at
/// creation time, plus the timeout policy applied to every exchange. The
/// exchange methods take `&mut self`: a connection serves exactly one
/// in-flight request/response at a time.
///
/// The connection tracks its own health. A timeout, transport fault, or
/// protocol-level surprise marks it broken; [`Connection::is_healthy`] is
/// what a pool consults when the connection is released back to it.
/// Dropping the connection closes the transport.
pub struct Connection {
    framed: Framed<TcpStream, RespCodec>,
    command_timeout: Duration,
    healthy: bool,
    id: u64,
}

impl Connection {
    /// Establish a new session: TCP connect, then AUTH and SELECT as the
    /// configuration requires.
    ///
    /// Every phase is time-bounded — the TCP connect by
    /// `timeouts.connect_timeout`, each handshake exchange by
    /// `timeouts.command_timeout`. A failed handshake aborts creation and
    /// the partially-open transport is closed before this returns.
    pub async fn connect(config: &Config) -> Result<Self> {
        let addr = config.addr();
        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = config.database,
            "connecting to store"
        );

        let stream = timeout(config.timeouts.connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| Error::Connect(format!("connect to {addr} timed out")))?
            .map_err(|e| Error::Connect(format!("connect to {addr} failed: {e}")))?;
        stream
            .set_nodelay(true)
            .map_err(|e| Error::Connect(format!("set_nodelay on {addr} failed: {e}")))?;

        let mut conn = Self {
            framed: Framed::new(stream, RespCodec::new()),
            command_timeout: config.timeouts.command_timeout,
            healthy: true,
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
        };
        conn.handshake(config).await?;

        tracing::debug!(id = conn.id, "connection established");
        Ok(conn)
    }

    async fn handshake(&mut self, config: &Config) -> Result<()> {
        if let Some(password) = &config.password {
            let cmd = match &config.username {
                Some(user) => Command::new("AUTH").arg(user).arg(password),
                None => Command::new("AUTH").arg(password),
            };
            match self.raw_exchange(&cmd).await? {
                Value::Error(message) => return Err(Error::Auth(message)),
                _ => tracing::debug!(id = self.id, "authenticated"),
            }
        }

        if config.database != 0 {
            let cmd = Command::new("SELECT").arg_int(i64::from(config.database));
            match self.raw_exchange(&cmd).await? {
                Value::Error(message) => {
                    return Err(Error::Connect(format!(
                        "selecting database {} failed: {message}",
                        config.database
                    )));
                }
                _ => tracing::debug!(id = self.id, database = config.database, "database selected"),
            }
        }

        Ok(())
    }

    /// Process-unique identifier for this connection.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether every exchange so far completed cleanly.
    ///
    /// A broken connection must be discarded, never reused: its session
    /// state (pending bytes, request/reply pairing) is unknown.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.healthy
    }

    /// Issue one command and return its decoded reply.
    ///
    /// The full round trip is bounded by the configured command timeout. An
    /// error reply from the server surfaces as
    /// [`ProtocolError::Server`] and marks the connection broken, as do
    /// timeouts and transport faults.
    pub async fn command(&mut self, cmd: &Command) -> Result<Value> {
        match self.raw_exchange(cmd).await? {
            Value::Error(message) => {
                self.healthy = false;
                Err(ProtocolError::Server(message).into())
            }
            value => Ok(value),
        }
    }

    /// Liveness probe: PING, expecting PONG.
    pub async fn ping(&mut self) -> Result<()> {
        match self.command(&Command::new("PING")).await? {
            Value::Simple(s) if s == "PONG" => Ok(()),
            other => Err(self.poison(ProtocolError::UnexpectedReply {
                expected: "PONG",
                found: other.type_name(),
            })),
        }
    }

    /// One bounded request/response exchange. Unlike [`Connection::command`]
    /// this hands error replies back as values, which the handshake needs in
    /// order to classify them.
    async fn raw_exchange(&mut self, cmd: &Command) -> Result<Value> {
        let framed = &mut self.framed;
        let exchange = async {
            framed.send(cmd).await?;
            match framed.next().await {
                Some(reply) => reply,
                None => Err(Error::ConnectionClosed),
            }
        };

        match timeout(self.command_timeout, exchange).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                if e.poisons_connection() {
                    self.healthy = false;
                }
                Err(e)
            }
            Err(_elapsed) => {
                self.healthy = false;
                tracing::debug!(
                    id = self.id,
                    command = %String::from_utf8_lossy(cmd.name()),
                    "exchange timed out"
                );
                Err(Error::Timeout)
            }
        }
    }

    /// Record a decode failure against this connection and convert it.
    pub(crate) fn poison(&mut self, error: ProtocolError) -> Error {
        self.healthy = false;
        error.into()
    }

    /// Run a typed decode, marking the connection broken on mismatch.
    pub(crate) fn decoded<T>(
        &mut self,
        result: std::result::Result<T, ProtocolError>,
    ) -> Result<T> {
        result.map_err(|e| self.poison(e))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("healthy", &self.healthy)
            .finish_non_exhaustive()
    }
}
