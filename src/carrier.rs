//! Per-connection metadata carrier.
use crate::constants::ComponentKind;

/// Identifying facts about a traced database connection.
///
/// Built once when the connection object is constructed and immutable from
/// then on, so it can be shared across threads without synchronisation.
/// No validation is performed: absent or zero values are legal and tolerated
/// by consumers (an empty remote peer or database name is allowed).
#[derive(Clone, Debug)]
pub struct ConnectionInfo {
    hosts: Option<String>,
    host: String,
    port: u16,
    database_name: String,
    component: ComponentKind,
    db_type: String,
}

impl ConnectionInfo {
    /// Start building a [`ConnectionInfo`] record.
    pub fn builder() -> ConnectionInfoBuilder {
        ConnectionInfoBuilder::default()
    }

    /// Comma-joined multi-host form of the remote address, if known.
    pub fn hosts(&self) -> Option<&str> {
        self.hosts.as_deref()
    }

    /// Single-host form of the remote address.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port paired with [`ConnectionInfo::host`].
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Name of the database the connection is scoped to.
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Database component the connection talks to.
    pub fn component(&self) -> ComponentKind {
        self.component
    }

    /// Logical vendor tag (for example "mysql" or "postgresql").
    pub fn db_type(&self) -> &str {
        &self.db_type
    }

    /// Resolve the remote peer string for spans describing this connection.
    ///
    /// The multi-host form takes precedence when present and non-empty,
    /// otherwise the peer is the `host:port` pair.
    pub fn remote_peer(&self) -> String {
        match &self.hosts {
            Some(hosts) if !hosts.is_empty() => hosts.clone(),
            _ => format!("{}:{}", self.host, self.port),
        }
    }
}

/// Builder for [`ConnectionInfo`] records.
#[derive(Clone, Debug)]
pub struct ConnectionInfoBuilder {
    hosts: Option<String>,
    host: String,
    port: u16,
    database_name: String,
    component: ComponentKind,
    db_type: String,
}

impl Default for ConnectionInfoBuilder {
    fn default() -> Self {
        ConnectionInfoBuilder {
            hosts: None,
            host: String::new(),
            port: 0,
            database_name: String::new(),
            component: ComponentKind::Unknown,
            db_type: String::new(),
        }
    }
}

impl ConnectionInfoBuilder {
    /// Set the comma-joined multi-host address form.
    pub fn hosts<S: Into<String>>(mut self, hosts: S) -> Self {
        self.hosts = Some(hosts.into());
        self
    }

    /// Set the single-host address form.
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = host.into();
        self
    }

    /// Set the port paired with the single-host address form.
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the name of the database the connection is scoped to.
    pub fn database_name<S: Into<String>>(mut self, database_name: S) -> Self {
        self.database_name = database_name.into();
        self
    }

    /// Set the database component the connection talks to.
    pub fn component(mut self, component: ComponentKind) -> Self {
        self.component = component;
        self
    }

    /// Set the logical vendor tag.
    pub fn db_type<S: Into<String>>(mut self, db_type: S) -> Self {
        self.db_type = db_type.into();
        self
    }

    /// Finalise the immutable [`ConnectionInfo`] record.
    pub fn build(self) -> ConnectionInfo {
        ConnectionInfo {
            hosts: self.hosts,
            host: self.host,
            port: self.port,
            database_name: self.database_name,
            component: self.component,
            db_type: self.db_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConnectionInfo;
    use crate::constants::ComponentKind;

    #[test]
    fn remote_peer_from_host_and_port() {
        let info = ConnectionInfo::builder()
            .host("db1")
            .port(5432)
            .database_name("orders")
            .component(ComponentKind::Postgresql)
            .db_type("postgresql")
            .build();
        assert_eq!(info.remote_peer(), "db1:5432");
    }

    #[test]
    fn remote_peer_prefers_hosts() {
        let info = ConnectionInfo::builder()
            .hosts("db1:5432,db2:5432")
            .host("db1")
            .port(5432)
            .build();
        assert_eq!(info.remote_peer(), "db1:5432,db2:5432");
    }

    #[test]
    fn remote_peer_ignores_empty_hosts() {
        let info = ConnectionInfo::builder().hosts("").host("db1").port(5432).build();
        assert_eq!(info.remote_peer(), "db1:5432");
    }

    #[test]
    fn defaults_are_tolerated() {
        let info = ConnectionInfo::builder().build();
        assert_eq!(info.hosts(), None);
        assert_eq!(info.remote_peer(), ":0");
        assert_eq!(info.database_name(), "");
        assert_eq!(info.component(), ComponentKind::Unknown);
    }
}
