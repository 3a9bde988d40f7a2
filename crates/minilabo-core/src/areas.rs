//! Configuration areas and their defaults
//!
//! Each area is a named JSON document persisted to its own file. The
//! registry maps an area name to the thunk that builds its default
//! document; registering a new area is one [`AreaRegistry::register`] call.

use serde_json::{json, Map, Value};

/// Builds the default document of an area
pub type DefaultsFn = fn() -> Value;

/// Areas every device knows about, in registration order
pub const BUILTIN_AREAS: &[&str] = &[
    "general", "network", "io", "dmm", "scope", "funcgen", "math",
];

/// A registered area
#[derive(Debug, Clone)]
pub struct AreaDef {
    pub name: String,
    pub defaults: DefaultsFn,
}

/// Registry of known areas
#[derive(Debug, Clone, Default)]
pub struct AreaRegistry {
    areas: Vec<AreaDef>,
}

impl AreaRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The seven areas of the instrument with their factory defaults
    pub fn builtin() -> Self {
        Self::new()
            .register("general", general_defaults)
            .register("network", network_defaults)
            .register("io", io_defaults)
            .register("dmm", dmm_defaults)
            .register("scope", empty_document)
            .register("funcgen", empty_document)
            .register("math", empty_document)
    }

    /// Add an area, or replace the defaults of an existing one
    pub fn register(mut self, name: &str, defaults: DefaultsFn) -> Self {
        match self.areas.iter_mut().find(|def| def.name == name) {
            Some(def) => def.defaults = defaults,
            None => self.areas.push(AreaDef {
                name: name.to_string(),
                defaults,
            }),
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.areas.iter().any(|def| def.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AreaDef> {
        self.areas.iter()
    }

    pub fn len(&self) -> usize {
        self.areas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.areas.is_empty()
    }

    /// Default document for `name`; unregistered names get an empty object
    pub fn defaults_for(&self, name: &str) -> Value {
        self.areas
            .iter()
            .find(|def| def.name == name)
            .map(|def| (def.defaults)())
            .unwrap_or_else(empty_document)
    }
}

/// `{}`
pub fn empty_document() -> Value {
    Value::Object(Map::new())
}

fn general_defaults() -> Value {
    json!({
        "pin": 1234,
        "version": 1,
        "ui": ["dmm", "scope", "funcgen", "io"],
    })
}

fn network_defaults() -> Value {
    json!({
        "mode": "ap",
        "ap": {
            "enabled": true,
            "ssid": "MiniLabo",
            "password": "12345678",
        },
        "sta": {
            "enabled": false,
            "ssid": "",
            "password": "",
        },
        "udp_enabled": false,
        "udp_port": 50000,
        "udp_dest": "255.255.255.255",
        "udp_dest_port": 50000,
        "udp_emit": false,
    })
}

fn io_defaults() -> Value {
    json!({
        "devices": [{
            "id": "IO_A0",
            "type": "adc",
            "driver": "a0",
            "bits": 10,
            "vref": 1.0,
            "ratio": 3.3,
        }],
    })
}

fn dmm_defaults() -> Value {
    json!({
        "channels": [{
            "name": "CH1",
            "source": "IO_A0",
            "mode": "UDC",
            "decimals": 3,
            "filter_window": 16,
        }],
    })
}
