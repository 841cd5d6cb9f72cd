//! Mock Redis server for unit testing.
//!
//! An in-process async RESP server backed by an in-memory table of strings,
//! hashes, and sets, with lazy per-key expiry. It implements the command set
//! the driver issues (plus SADD to seed sets and `DEBUG SLEEP` to provoke
//! timeouts) and two fault hooks: severing all live client sockets and
//! graceful shutdown.
//!
//! Simplifications relative to a real store: SELECT validates the database
//! index but all databases share one keyspace, and AUTH checks only the
//! password part of the credential.
//!
//! ## Example
//!
//! ```rust,ignore
//! use redis_driver_testing::MockRedisServer;
//!
//! #[tokio::test]
//! async fn test_against_mock() {
//!     let server = MockRedisServer::builder()
//!         .password("secret")
//!         .seed_string("greeting", b"hello")
//!         .start()
//!         .await
//!         .unwrap();
//!
//!     let addr = server.addr();
//!     // Connect your client to addr...
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use parking_lot::Mutex;
use resp_protocol::Value;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

/// Error type for mock server operations.
#[derive(Debug, Error)]
pub enum MockServerError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for mock server operations.
pub type Result<T> = std::result::Result<T, MockServerError>;

/// A stored value: the three shapes the driver works with.
#[derive(Debug, Clone)]
enum Data {
    Str(Vec<u8>),
    Hash(HashMap<Vec<u8>, Vec<u8>>),
    Set(HashSet<Vec<u8>>),
}

#[derive(Debug, Clone)]
struct Entry {
    data: Data,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(data: Data) -> Self {
        Self {
            data,
            expires_at: None,
        }
    }
}

struct Shared {
    password: Option<String>,
    databases: u32,
    store: Mutex<HashMap<Vec<u8>, Entry>>,
}

/// Builder for [`MockRedisServer`].
#[derive(Default)]
pub struct MockRedisServerBuilder {
    password: Option<String>,
    databases: u32,
    seed: HashMap<Vec<u8>, Entry>,
}

impl MockRedisServerBuilder {
    /// Require this password via AUTH before any other command.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Number of selectable databases (default 16). SELECT with an index at
    /// or beyond this answers with an error.
    #[must_use]
    pub fn databases(mut self, databases: u32) -> Self {
        self.databases = databases;
        self
    }

    /// Seed a string key.
    #[must_use]
    pub fn seed_string(mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.seed.insert(
            key.as_ref().to_vec(),
            Entry::new(Data::Str(value.as_ref().to_vec())),
        );
        self
    }

    /// Seed a hash key.
    #[must_use]
    pub fn seed_hash<'a>(
        mut self,
        key: impl AsRef<[u8]>,
        entries: impl IntoIterator<Item = (&'a str, &'a [u8])>,
    ) -> Self {
        let hash = entries
            .into_iter()
            .map(|(f, v)| (f.as_bytes().to_vec(), v.to_vec()))
            .collect();
        self.seed
            .insert(key.as_ref().to_vec(), Entry::new(Data::Hash(hash)));
        self
    }

    /// Seed a set key.
    #[must_use]
    pub fn seed_set<'a>(
        mut self,
        key: impl AsRef<[u8]>,
        members: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let set = members
            .into_iter()
            .map(|m| m.as_bytes().to_vec())
            .collect();
        self.seed
            .insert(key.as_ref().to_vec(), Entry::new(Data::Set(set)));
        self
    }

    /// Bind to an ephemeral local port and start serving.
    pub async fn start(self) -> Result<MockRedisServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let shared = Arc::new(Shared {
            password: self.password,
            databases: if self.databases == 0 {
                16
            } else {
                self.databases
            },
            store: Mutex::new(self.seed),
        });

        let (shutdown_tx, _) = broadcast::channel(1);
        let (kick_tx, _) = broadcast::channel(1);

        let accept_shared = Arc::clone(&shared);
        let accept_shutdown = shutdown_tx.clone();
        let accept_kick = kick_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = accept_shutdown.subscribe();
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            tracing::trace!(%peer, "mock server accepted connection");
                            let shared = Arc::clone(&accept_shared);
                            let shutdown_rx = accept_shutdown.subscribe();
                            let kick_rx = accept_kick.subscribe();
                            tokio::spawn(serve_connection(
                                stream,
                                shared,
                                shutdown_rx,
                                kick_rx,
                            ));
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "mock server accept failed");
                            break;
                        }
                    },
                }
            }
            tracing::debug!(%addr, "mock server stopped accepting");
        });

        Ok(MockRedisServer {
            addr,
            shutdown: shutdown_tx,
            kick: kick_tx,
        })
    }
}

/// An in-process mock server bound to an ephemeral local port.
///
/// Stops serving when dropped.
pub struct MockRedisServer {
    addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
    kick: broadcast::Sender<()>,
}

impl MockRedisServer {
    /// Start building a server.
    #[must_use]
    pub fn builder() -> MockRedisServerBuilder {
        MockRedisServerBuilder::default()
    }

    /// Start a server with no password and an empty keyspace.
    pub async fn start() -> Result<Self> {
        Self::builder().start().await
    }

    /// Address the server is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Abruptly sever every live client connection. New connections are
    /// still accepted, so clients see established sessions die while
    /// reconnects succeed.
    pub fn kill_connections(&self) {
        let _ = self.kick.send(());
    }

    /// Stop accepting and close all connections.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }
}

impl Drop for MockRedisServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    shared: Arc<Shared>,
    mut shutdown_rx: broadcast::Receiver<()>,
    mut kick_rx: broadcast::Receiver<()>,
) {
    let mut buf = BytesMut::with_capacity(4096);
    let mut authed = shared.password.is_none();

    loop {
        // Drain every complete command currently buffered.
        loop {
            match Value::decode(&mut buf) {
                Ok(Some(request)) => {
                    let reply = handle_command(&request, &mut authed, &shared).await;
                    let mut out = BytesMut::new();
                    reply.encode(&mut out);
                    if stream.write_all(&out).await.is_err() {
                        return;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::debug!(error = %e, "mock server closing malformed connection");
                    let mut out = BytesMut::new();
                    Value::Error(format!("ERR protocol error: {e}")).encode(&mut out);
                    let _ = stream.write_all(&out).await;
                    return;
                }
            }
        }

        tokio::select! {
            _ = shutdown_rx.recv() => return,
            _ = kick_rx.recv() => return,
            read = stream.read_buf(&mut buf) => match read {
                Ok(0) | Err(_) => return,
                Ok(_) => {}
            },
        }
    }
}

/// Interpret one inbound request (a RESP array of bulk strings) and produce
/// the reply.
async fn handle_command(request: &Value, authed: &mut bool, shared: &Shared) -> Value {
    let Some(args) = request_args(request) else {
        return err("ERR invalid request format");
    };
    let Some((name, args)) = args.split_first() else {
        return err("ERR empty command");
    };
    let name = name.to_ascii_uppercase();

    if name == b"AUTH" {
        return auth(args, authed, shared);
    }
    if shared.password.is_some() && !*authed {
        return err("NOAUTH Authentication required.");
    }

    match name.as_slice() {
        b"PING" => Value::Simple("PONG".into()),
        b"SELECT" => select(args, shared),
        b"DEBUG" => debug(args).await,
        b"SET" => with_store(shared, |store| set(store, args)),
        b"GET" => with_store(shared, |store| get(store, args)),
        b"EXISTS" => with_store(shared, |store| exists(store, args)),
        b"INCR" => with_store(shared, |store| incr(store, args)),
        b"EXPIRE" => with_store(shared, |store| expire(store, args)),
        b"DEL" => with_store(shared, |store| del(store, args)),
        b"STRLEN" => with_store(shared, |store| strlen(store, args)),
        b"HSET" | b"HMSET" => with_store(shared, |store| hset(store, args, &name)),
        b"HGET" => with_store(shared, |store| hget(store, args)),
        b"HMGET" => with_store(shared, |store| hmget(store, args)),
        b"HDEL" => with_store(shared, |store| hdel(store, args)),
        b"HEXISTS" => with_store(shared, |store| hexists(store, args)),
        b"HLEN" => with_store(shared, |store| hlen(store, args)),
        b"SADD" => with_store(shared, |store| sadd(store, args)),
        b"SMEMBERS" => with_store(shared, |store| smembers(store, args)),
        b"SCARD" => with_store(shared, |store| scard(store, args)),
        other => err(&format!(
            "ERR unknown command '{}'",
            String::from_utf8_lossy(other)
        )),
    }
}

type Store = HashMap<Vec<u8>, Entry>;

fn with_store(shared: &Shared, f: impl FnOnce(&mut Store) -> Value) -> Value {
    f(&mut shared.store.lock())
}

fn request_args(request: &Value) -> Option<Vec<Vec<u8>>> {
    let Value::Array(items) = request else {
        return None;
    };
    items
        .iter()
        .map(|item| match item {
            Value::Bulk(b) => Some(b.to_vec()),
            _ => None,
        })
        .collect()
}

fn err(message: &str) -> Value {
    Value::Error(message.to_string())
}

fn ok() -> Value {
    Value::Simple("OK".into())
}

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";
const NOT_AN_INTEGER: &str = "ERR value is not an integer or out of range";

fn auth(args: &[Vec<u8>], authed: &mut bool, shared: &Shared) -> Value {
    // One arg is `AUTH password`, two is the ACL form `AUTH user password`;
    // only the password part is checked.
    let supplied = match args {
        [password] => password,
        [_user, password] => password,
        _ => return err("ERR wrong number of arguments for 'auth' command"),
    };
    match &shared.password {
        None => err("ERR Client sent AUTH, but no password is set"),
        Some(expected) if expected.as_bytes() == supplied.as_slice() => {
            *authed = true;
            ok()
        }
        Some(_) => err("ERR invalid password"),
    }
}

fn select(args: &[Vec<u8>], shared: &Shared) -> Value {
    let [index] = args else {
        return err("ERR wrong number of arguments for 'select' command");
    };
    match parse_int(index) {
        Some(index) if index >= 0 && (index as u64) < u64::from(shared.databases) => ok(),
        Some(_) => err("ERR DB index is out of range"),
        None => err(NOT_AN_INTEGER),
    }
}

async fn debug(args: &[Vec<u8>]) -> Value {
    // DEBUG SLEEP <seconds> stalls the reply, which is how tests provoke
    // command timeouts.
    match args {
        [sub, seconds] if sub.eq_ignore_ascii_case(b"SLEEP") => {
            let Ok(seconds) = std::str::from_utf8(seconds)
                .unwrap_or("")
                .parse::<f64>()
            else {
                return err(NOT_AN_INTEGER);
            };
            tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
            ok()
        }
        _ => err("ERR unsupported DEBUG subcommand"),
    }
}

/// Fetch a live entry, purging it first if its TTL has lapsed.
fn live_entry<'a>(store: &'a mut Store, key: &[u8]) -> Option<&'a mut Entry> {
    let expired = store
        .get(key)
        .and_then(|e| e.expires_at)
        .is_some_and(|at| at <= Instant::now());
    if expired {
        store.remove(key);
        return None;
    }
    store.get_mut(key)
}

fn parse_int(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

fn set(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key, value] = args else {
        return err("ERR wrong number of arguments for 'set' command");
    };
    store.insert(key.clone(), Entry::new(Data::Str(value.clone())));
    ok()
}

fn get(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key] = args else {
        return err("ERR wrong number of arguments for 'get' command");
    };
    match live_entry(store, key) {
        None => Value::Nil,
        Some(entry) => match &entry.data {
            Data::Str(v) => Value::Bulk(v.clone().into()),
            _ => err(WRONGTYPE),
        },
    }
}

fn exists(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let count = args
        .iter()
        .filter(|key| live_entry(store, key.as_slice()).is_some())
        .count();
    Value::Integer(count as i64)
}

fn incr(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key] = args else {
        return err("ERR wrong number of arguments for 'incr' command");
    };
    let current = match live_entry(store, key) {
        None => None,
        Some(entry) => match &entry.data {
            Data::Str(v) => Some(parse_int(v)),
            _ => return err(WRONGTYPE),
        },
    };
    match current {
        None => {
            store.insert(key.clone(), Entry::new(Data::Str(b"1".to_vec())));
            Value::Integer(1)
        }
        Some(None) => err(NOT_AN_INTEGER),
        Some(Some(n)) => {
            let next = n + 1;
            // Replacing only the data keeps any TTL on the key intact.
            if let Some(entry) = store.get_mut(key.as_slice()) {
                entry.data = Data::Str(next.to_string().into_bytes());
            }
            Value::Integer(next)
        }
    }
}

fn expire(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key, seconds] = args else {
        return err("ERR wrong number of arguments for 'expire' command");
    };
    let Some(seconds) = parse_int(seconds) else {
        return err(NOT_AN_INTEGER);
    };
    if live_entry(store, key).is_none() {
        return Value::Integer(0);
    }
    // A non-positive TTL deletes the key, as the real store does.
    if seconds <= 0 {
        store.remove(key);
        return Value::Integer(1);
    }
    if let Some(entry) = store.get_mut(key) {
        entry.expires_at = Some(Instant::now() + Duration::from_secs(seconds as u64));
    }
    Value::Integer(1)
}

fn del(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let count = args
        .iter()
        .filter(|key| {
            live_entry(store, key.as_slice()).is_some()
                && store.remove(key.as_slice()).is_some()
        })
        .count();
    Value::Integer(count as i64)
}

fn strlen(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key] = args else {
        return err("ERR wrong number of arguments for 'strlen' command");
    };
    match live_entry(store, key) {
        None => Value::Integer(0),
        Some(entry) => match &entry.data {
            Data::Str(v) => Value::Integer(v.len() as i64),
            _ => err(WRONGTYPE),
        },
    }
}

fn hash_entry<'a>(
    store: &'a mut Store,
    key: &[u8],
) -> std::result::Result<&'a mut HashMap<Vec<u8>, Vec<u8>>, Value> {
    if live_entry(store, key).is_none() {
        store.insert(
            key.to_vec(),
            Entry::new(Data::Hash(HashMap::new())),
        );
    }
    match store.get_mut(key).map(|e| &mut e.data) {
        Some(Data::Hash(hash)) => Ok(hash),
        _ => Err(err(WRONGTYPE)),
    }
}

fn hset(store: &mut Store, args: &[Vec<u8>], name: &[u8]) -> Value {
    let Some((key, pairs)) = args.split_first() else {
        return err("ERR wrong number of arguments for 'hset' command");
    };
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return err("ERR wrong number of arguments for 'hset' command");
    }
    let hash = match hash_entry(store, key) {
        Ok(hash) => hash,
        Err(reply) => return reply,
    };
    let mut added = 0;
    for pair in pairs.chunks_exact(2) {
        if hash.insert(pair[0].clone(), pair[1].clone()).is_none() {
            added += 1;
        }
    }
    // HMSET is the legacy batched form and answers +OK, not a count.
    if name == b"HMSET" {
        ok()
    } else {
        Value::Integer(added)
    }
}

fn hget(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key, field] = args else {
        return err("ERR wrong number of arguments for 'hget' command");
    };
    match live_entry(store, key) {
        None => Value::Nil,
        Some(entry) => match &entry.data {
            Data::Hash(hash) => hash
                .get(field)
                .map_or(Value::Nil, |v| Value::Bulk(v.clone().into())),
            _ => err(WRONGTYPE),
        },
    }
}

fn hmget(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let Some((key, fields)) = args.split_first() else {
        return err("ERR wrong number of arguments for 'hmget' command");
    };
    if fields.is_empty() {
        return err("ERR wrong number of arguments for 'hmget' command");
    }
    match live_entry(store, key) {
        None => Value::Array(fields.iter().map(|_| Value::Nil).collect()),
        Some(entry) => match &entry.data {
            Data::Hash(hash) => Value::Array(
                fields
                    .iter()
                    .map(|field| {
                        hash.get(field)
                            .map_or(Value::Nil, |v| Value::Bulk(v.clone().into()))
                    })
                    .collect(),
            ),
            _ => err(WRONGTYPE),
        },
    }
}

fn hdel(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let Some((key, fields)) = args.split_first() else {
        return err("ERR wrong number of arguments for 'hdel' command");
    };
    let outcome = match live_entry(store, key) {
        None => None,
        Some(entry) => match &mut entry.data {
            Data::Hash(hash) => {
                let removed = fields
                    .iter()
                    .filter(|f| hash.remove(f.as_slice()).is_some())
                    .count();
                Some((removed, hash.is_empty()))
            }
            _ => return err(WRONGTYPE),
        },
    };
    match outcome {
        None => Value::Integer(0),
        Some((removed, empty)) => {
            // The real store drops container keys that become empty.
            if empty {
                store.remove(key);
            }
            Value::Integer(removed as i64)
        }
    }
}

fn hexists(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key, field] = args else {
        return err("ERR wrong number of arguments for 'hexists' command");
    };
    match live_entry(store, key) {
        None => Value::Integer(0),
        Some(entry) => match &entry.data {
            Data::Hash(hash) => Value::Integer(i64::from(hash.contains_key(field))),
            _ => err(WRONGTYPE),
        },
    }
}

fn hlen(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key] = args else {
        return err("ERR wrong number of arguments for 'hlen' command");
    };
    match live_entry(store, key) {
        None => Value::Integer(0),
        Some(entry) => match &entry.data {
            Data::Hash(hash) => Value::Integer(hash.len() as i64),
            _ => err(WRONGTYPE),
        },
    }
}

fn sadd(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let Some((key, members)) = args.split_first() else {
        return err("ERR wrong number of arguments for 'sadd' command");
    };
    if members.is_empty() {
        return err("ERR wrong number of arguments for 'sadd' command");
    }
    if live_entry(store, key).is_none() {
        store.insert(key.to_vec(), Entry::new(Data::Set(HashSet::new())));
    }
    match store.get_mut(key).map(|e| &mut e.data) {
        Some(Data::Set(set)) => {
            let added = members.iter().filter(|m| set.insert(m.to_vec())).count();
            Value::Integer(added as i64)
        }
        _ => err(WRONGTYPE),
    }
}

fn smembers(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key] = args else {
        return err("ERR wrong number of arguments for 'smembers' command");
    };
    match live_entry(store, key) {
        None => Value::Array(Vec::new()),
        Some(entry) => match &entry.data {
            Data::Set(set) => Value::Array(
                set.iter().map(|m| Value::Bulk(m.clone().into())).collect(),
            ),
            _ => err(WRONGTYPE),
        },
    }
}

fn scard(store: &mut Store, args: &[Vec<u8>]) -> Value {
    let [key] = args else {
        return err("ERR wrong number of arguments for 'scard' command");
    };
    match live_entry(store, key) {
        None => Value::Integer(0),
        Some(entry) => match &entry.data {
            Data::Set(set) => Value::Integer(set.len() as i64),
            _ => err(WRONGTYPE),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store_with(key: &[u8], entry: Entry) -> Store {
        let mut store = Store::new();
        store.insert(key.to_vec(), entry);
        store
    }

    #[test]
    fn incr_counts_from_absent() {
        let mut store = Store::new();
        assert_eq!(incr(&mut store, &[b"n".to_vec()]), Value::Integer(1));
        assert_eq!(incr(&mut store, &[b"n".to_vec()]), Value::Integer(2));
    }

    #[test]
    fn incr_rejects_non_numeric() {
        let mut store = store_with(b"k", Entry::new(Data::Str(b"abc".to_vec())));
        assert_eq!(
            incr(&mut store, &[b"k".to_vec()]),
            Value::Error(NOT_AN_INTEGER.into())
        );
    }

    #[test]
    fn expire_with_non_positive_ttl_deletes() {
        let mut store = store_with(b"k", Entry::new(Data::Str(b"v".to_vec())));
        assert_eq!(
            expire(&mut store, &[b"k".to_vec(), b"0".to_vec()]),
            Value::Integer(1)
        );
        assert_eq!(get(&mut store, &[b"k".to_vec()]), Value::Nil);
    }

    #[test]
    fn expired_entries_are_purged_lazily() {
        let mut store = store_with(b"k", Entry::new(Data::Str(b"v".to_vec())));
        store.get_mut(&b"k"[..]).unwrap().expires_at =
            Some(Instant::now() - Duration::from_secs(1));
        assert_eq!(get(&mut store, &[b"k".to_vec()]), Value::Nil);
        assert!(store.is_empty());
    }

    #[test]
    fn hmget_preserves_field_order() {
        let mut store = Store::new();
        hset(
            &mut store,
            &[b"h".to_vec(), b"a".to_vec(), b"1".to_vec()],
            b"HSET",
        );
        let reply = hmget(&mut store, &[b"h".to_vec(), b"b".to_vec(), b"a".to_vec()]);
        assert_eq!(
            reply,
            Value::Array(vec![Value::Nil, Value::Bulk("1".into())])
        );
    }

    #[test]
    fn type_mismatch_is_wrongtype() {
        let mut store = store_with(b"k", Entry::new(Data::Str(b"v".to_vec())));
        assert_eq!(
            scard(&mut store, &[b"k".to_vec()]),
            Value::Error(WRONGTYPE.into())
        );
    }
}
