use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::connection::Connection;

use super::ConnectionPool;

/// A checked-out connection; returns to its pool when dropped.
pub struct PooledConnection {
    conn: Arc<Connection>,
    pool: ConnectionPool,
}

impl PooledConnection {
    pub(super) fn new(conn: Arc<Connection>, pool: ConnectionPool) -> Self {
        Self { conn, pool }
    }

    /// Pool this connection belongs to.
    #[must_use]
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.conn
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.pool.give_back(Arc::clone(&self.conn));
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledConnection").field(&*self.conn).finish()
    }
}
