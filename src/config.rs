//! Configuration ingestion — §4.9. Deserializes the structured tree
//! §6 describes as an external collaborator into a typed
//! `config::tree::ServerConfig`, then turns it into a frozen
//! [`crate::registry::OptionRegistry`] and a linearized
//! [`crate::pipeline::Pipeline`] via [`PipelineBuilder`].
//!
//! The grammar and file-watching loader stay out of scope (§1); this
//! module only defines the shape `serde_yaml` deserializes into and
//! the construction step that follows.

use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::sync::Arc;

use ipnet::Ipv6Net;
use serde::{Deserialize, Deserializer};

use crate::duid::Duid;
use crate::error::ConfigError;
use crate::filter::{linearize, Filter, FilterNode};
use crate::handler::{builtin, Handler};
use crate::pipeline::Pipeline;
use crate::registry::{OptionRegistry, OptionRegistryBuilder};

/// the typed shape of the configuration tree, one-to-one with §6's
/// recognized top-level sections. Unknown top-level keys are a fatal
/// `ConfigError` (`deny_unknown_fields`).
pub mod tree {
    use super::*;

    #[derive(Debug, Clone, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct ServerConfig {
        /// this server's DUID, written into every response by
        /// `ServerIdHandler`
        #[serde(rename = "server-id")]
        pub server_id: Duid,
        pub listener: ListenerConfig,
        #[serde(rename = "worker-pool")]
        pub worker_pool: WorkerPoolConfig,
        pub statistics: StatisticsConfig,
        #[serde(rename = "control-socket")]
        pub control_socket: ControlSocketConfig,
        #[serde(default)]
        pub pipeline: Vec<FilterNodeConfig>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct ListenerConfig {
        /// interfaces to bind one socket per entry to; empty binds a
        /// single wildcard socket
        #[serde(default)]
        pub interface: Vec<String>,
        #[serde(default = "unspecified_v6")]
        pub address: Ipv6Addr,
        #[serde(default = "default_port")]
        pub port: u16,
        #[serde(rename = "multicast-join", default)]
        pub multicast_join: Vec<Ipv6Addr>,
    }

    fn unspecified_v6() -> Ipv6Addr {
        Ipv6Addr::UNSPECIFIED
    }

    fn default_port() -> u16 {
        crate::message::SERVER_PORT
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct WorkerPoolConfig {
        pub workers: usize,
        #[serde(rename = "queue-depth", default = "default_queue_depth")]
        pub queue_depth: usize,
        #[serde(rename = "deadline-ms", default = "default_deadline_ms")]
        pub deadline_ms: u64,
    }

    impl WorkerPoolConfig {
        /// §4.6's default: a work queue sized to 4x the worker count,
        /// used when the config omits `queue-depth` entirely.
        pub fn effective_queue_depth(&self) -> usize {
            if self.queue_depth == 0 {
                4 * self.workers
            } else {
                self.queue_depth
            }
        }
    }

    fn default_queue_depth() -> usize {
        0
    }

    fn default_deadline_ms() -> u64 {
        1000
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct StatisticsConfig {
        #[serde(rename = "sink-address", default)]
        pub sink_address: Option<String>,
    }

    #[derive(Debug, Clone, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct ControlSocketConfig {
        pub path: String,
        #[serde(default)]
        pub mode: Option<u32>,
    }

    /// a node in the declared filter/handler tree, deserialized
    /// directly from configuration. `filter` is flattened so a node's
    /// YAML reads as `{kind: subnet-match, network: ..., handlers: [...],
    /// children: [...]}`.
    #[derive(Debug, Clone, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct FilterNodeConfig {
        #[serde(flatten)]
        pub filter: FilterConfig,
        #[serde(default)]
        pub handlers: Vec<HandlerSectionConfig>,
        #[serde(default)]
        pub children: Vec<FilterNodeConfig>,
    }

    /// configuration-facing mirror of [`crate::filter::Filter`].
    #[derive(Debug, Clone, Deserialize)]
    #[serde(tag = "kind", rename_all = "kebab-case")]
    pub enum FilterConfig {
        AlwaysMatch,
        Not {
            filter: Box<FilterConfig>,
        },
        MarkedWith {
            tag: String,
        },
        SubnetMatch {
            network: Ipv6Addr,
            #[serde(rename = "prefix-len")]
            prefix_len: u8,
        },
        InterfaceMatch {
            name: String,
        },
        DuidMatch {
            duid: Duid,
        },
        RemoteIdMatch {
            #[serde(rename = "enterprise-number")]
            enterprise_number: u32,
        },
        SubscriberIdMatch {
            #[serde(deserialize_with = "deserialize_hex")]
            id: Vec<u8>,
        },
    }

    fn deserialize_hex<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }

    /// one handler attachment: a registered factory name plus its
    /// parameters, handed to the matching [`super::HandlerFactory`]
    /// verbatim.
    #[derive(Debug, Clone, Deserialize)]
    pub struct HandlerSectionConfig {
        pub kind: String,
        #[serde(default)]
        pub params: serde_yaml::Value,
    }

    /// parse a [`ServerConfig`] from a YAML document.
    pub fn from_str(input: &str) -> Result<ServerConfig, ConfigError> {
        serde_yaml::from_str(input).map_err(ConfigError::from)
    }
}

use tree::{FilterConfig, FilterNodeConfig, HandlerSectionConfig, ServerConfig};

/// resolves a configured handler `kind` to a constructor. Registered
/// once at startup; duplicate registration under the same kind is a
/// fatal `ConfigError` (mirroring §4.2's rule for option codes).
pub type HandlerFactory = fn(&serde_yaml::Value) -> Result<Arc<dyn Handler>, ConfigError>;

/// the set of handler kinds a configuration's `pipeline` section may
/// reference.
#[derive(Default)]
pub struct HandlerFactoryRegistry {
    factories: HashMap<&'static str, HandlerFactory>,
}

impl HandlerFactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// the handlers named in §4.10 that configuration can select:
    /// `static-address-pool` and `echo-client-id`. The mandatory
    /// built-ins (server-id, response-type, ...) are not here — they
    /// are not configurable, and [`PipelineBuilder::build`] attaches
    /// them unconditionally.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register("static-address-pool", build_static_address_pool)
            .expect("builtin factory names are unique");
        registry
            .register("echo-client-id", build_echo_client_id)
            .expect("builtin factory names are unique");
        registry
    }

    pub fn register(&mut self, kind: &'static str, factory: HandlerFactory) -> Result<(), ConfigError> {
        if self.factories.contains_key(kind) {
            return Err(ConfigError::HandlerConstruction {
                kind: kind.to_string(),
                message: "a factory is already registered for this kind".to_string(),
            });
        }
        self.factories.insert(kind, factory);
        Ok(())
    }

    fn build(&self, section: &HandlerSectionConfig) -> Result<Arc<dyn Handler>, ConfigError> {
        let factory = self
            .factories
            .get(section.kind.as_str())
            .ok_or_else(|| ConfigError::UnknownHandlerKind(section.kind.clone()))?;
        factory(&section.params)
    }
}

#[derive(Debug, Deserialize)]
struct StaticAddressPoolParams {
    pool: Vec<Ipv6Addr>,
    #[serde(rename = "preferred-life")]
    preferred_life: u32,
    #[serde(rename = "valid-life")]
    valid_life: u32,
}

fn build_static_address_pool(params: &serde_yaml::Value) -> Result<Arc<dyn Handler>, ConfigError> {
    let params: StaticAddressPoolParams = serde_yaml::from_value(params.clone())?;
    Ok(Arc::new(builtin::StaticAddressPoolHandler::new(
        params.pool,
        params.preferred_life,
        params.valid_life,
    )))
}

fn build_echo_client_id(_params: &serde_yaml::Value) -> Result<Arc<dyn Handler>, ConfigError> {
    Ok(Arc::new(builtin::EchoClientIdHandler))
}

fn build_filter(config: &FilterConfig) -> Result<Filter, ConfigError> {
    Ok(match config {
        FilterConfig::AlwaysMatch => Filter::AlwaysMatch,
        FilterConfig::Not { filter } => Filter::Not(Box::new(build_filter(filter)?)),
        FilterConfig::MarkedWith { tag } => Filter::MarkedWith(tag.clone()),
        FilterConfig::SubnetMatch { network, prefix_len } => {
            let net = Ipv6Net::new(*network, *prefix_len).map_err(|source| ConfigError::InvalidSubnet {
                network: *network,
                prefix_len: *prefix_len,
                source,
            })?;
            Filter::SubnetMatch(net)
        }
        FilterConfig::InterfaceMatch { name } => Filter::InterfaceMatch(name.clone()),
        FilterConfig::DuidMatch { duid } => Filter::DuidMatch(duid.clone()),
        FilterConfig::RemoteIdMatch { enterprise_number } => Filter::RemoteIdMatch {
            enterprise_number: *enterprise_number,
        },
        FilterConfig::SubscriberIdMatch { id } => Filter::SubscriberIdMatch(id.clone()),
    })
}

fn build_node(config: &FilterNodeConfig, factories: &HandlerFactoryRegistry) -> Result<FilterNode, ConfigError> {
    let mut node = FilterNode::new(build_filter(&config.filter)?);
    for section in &config.handlers {
        node.handlers.push(factories.build(section)?);
    }
    for child in &config.children {
        node.children.push(build_node(child, factories)?);
    }
    Ok(node)
}

/// turns a [`ServerConfig`] into a frozen registry and a linearized
/// pipeline. The mandatory built-in handlers from §4.10 are attached to
/// a synthetic root node ahead of the configured `pipeline` tree; their
/// fixed precedence values (see `handler::builtin`) place them correctly
/// relative to configured handlers regardless of tree position, since
/// `Pipeline::new` sorts each phase by precedence.
pub struct PipelineBuilder {
    factories: HandlerFactoryRegistry,
}

impl PipelineBuilder {
    pub fn new(factories: HandlerFactoryRegistry) -> Self {
        PipelineBuilder { factories }
    }

    pub fn build(
        &self,
        config: &ServerConfig,
        dropped_direct_client: Arc<std::sync::atomic::AtomicU64>,
    ) -> Result<(Arc<OptionRegistry>, Pipeline), ConfigError> {
        let registry = Arc::new(OptionRegistryBuilder::with_builtin_options().freeze());

        let mut root = FilterNode::new(Filter::AlwaysMatch);
        root.handlers.push(Arc::new(builtin::RejectDirectClientMessagesHandler {
            dropped_counter: dropped_direct_client,
        }));
        root.handlers.push(Arc::new(builtin::ResponseTypeHandler));
        root.handlers.push(Arc::new(builtin::RapidCommitHandler));
        root.handlers.push(Arc::new(builtin::IaStatusHandler));
        root.handlers.push(Arc::new(builtin::StripUnsolicitedHandler));
        root.handlers.push(Arc::new(builtin::RelayFramingHandler));
        root.handlers.push(Arc::new(builtin::ServerIdHandler {
            server_id: config.server_id.clone(),
        }));

        for node_config in &config.pipeline {
            root.children.push(build_node(node_config, &self.factories)?);
        }

        let entries = linearize(&root);
        let pipeline = Pipeline::new(registry.clone(), entries);
        Ok((registry, pipeline))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
server-id:
  Ll:
    htype: 1
    link_layer: [0, 17, 34, 51, 68, 85]
listener:
  address: "::"
  port: 547
  multicast-join: ["ff02::1:2"]
worker-pool:
  workers: 4
  queue-depth: 16
  deadline-ms: 1000
statistics:
  sink-address: null
control-socket:
  path: /tmp/dhcv6d.sock
pipeline:
  - kind: always-match
    handlers:
      - kind: echo-client-id
    children:
      - kind: subnet-match
        network: "2001:db8::"
        prefix-len: 32
        handlers:
          - kind: static-address-pool
            params:
              pool: ["2001:db8::1", "2001:db8::2"]
              preferred-life: 3600
              valid-life: 7200
"#;

    #[test]
    fn sample_config_parses() {
        let config = tree::from_str(SAMPLE).unwrap();
        assert_eq!(config.worker_pool.workers, 4);
        assert_eq!(config.pipeline.len(), 1);
        assert_eq!(config.pipeline[0].children.len(), 1);
    }

    #[test]
    fn unknown_top_level_section_is_rejected() {
        let bad = format!("{SAMPLE}\nbogus-section: {{}}\n");
        let err = tree::from_str(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn builder_produces_a_pipeline_with_mandatory_handlers() {
        let config = tree::from_str(SAMPLE).unwrap();
        let builder = PipelineBuilder::new(HandlerFactoryRegistry::with_builtins());
        let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let (_registry, _pipeline) = builder.build(&config, counter).unwrap();
    }

    #[test]
    fn unregistered_handler_kind_is_a_config_error() {
        let config_str = SAMPLE.replace("static-address-pool", "nonexistent-handler");
        let config = tree::from_str(&config_str).unwrap();
        let builder = PipelineBuilder::new(HandlerFactoryRegistry::with_builtins());
        let counter = Arc::new(std::sync::atomic::AtomicU64::new(0));
        let err = builder.build(&config, counter).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownHandlerKind(_)));
    }
}
