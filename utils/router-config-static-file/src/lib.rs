/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/


//! Router configurations loaded from a static JSON5 file.
//!
//! The file holds a `routers` array of router configurations and an optional `provider` block
//! with reload settings. Configurations added or removed at runtime are kept in memory until
//! [`RouterConfigStaticFile::save`] writes them back.

use entity_router::{
    ConfigurationEvent, ConfigurationProfile, ProviderSettings, RouterConfiguration,
};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::{self, canonicalize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const COMPONENT: &str = "router_config_static_file";

const CONFIGURATION_EVENT_CAPACITY: usize = 64;

const STATIC_FILE_LOADED: &str = "static_file_loaded";
const STATIC_FILE_RELOADED: &str = "static_file_reloaded";
const STATIC_FILE_MISSING: &str = "static_file_missing";

#[derive(Debug)]
pub enum ConfigurationFileError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, message: String },
    Encode(serde_json::Error),
}

impl Display for ConfigurationFileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationFileError::Io { path, source } => {
                write!(f, "unable to access {}: {source}", path.display())
            }
            ConfigurationFileError::Parse { path, message } => {
                write!(f, "unable to parse {}: {message}", path.display())
            }
            ConfigurationFileError::Encode(err) => {
                write!(f, "unable to encode router configurations: {err}")
            }
        }
    }
}

impl Error for ConfigurationFileError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigurationFileError::Io { source, .. } => Some(source),
            ConfigurationFileError::Parse { .. } => None,
            ConfigurationFileError::Encode(err) => Some(err),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RouterConfigDocument {
    #[serde(default)]
    routers: Vec<RouterConfiguration>,
    #[serde(default)]
    provider: Option<ProviderSettings>,
}

/// [`ConfigurationProfile`] backed by a JSON5 file.
pub struct RouterConfigStaticFile {
    static_file: PathBuf,
    configurations: RwLock<Vec<RouterConfiguration>>,
    settings: RwLock<ProviderSettings>,
    events: broadcast::Sender<ConfigurationEvent>,
}

impl RouterConfigStaticFile {
    pub fn new(static_file: impl Into<PathBuf>) -> Result<Self, ConfigurationFileError> {
        let static_file = static_file.into();
        let document = read_document(&static_file)?;
        let (events, _) = broadcast::channel(CONFIGURATION_EVENT_CAPACITY);

        info!(
            event = STATIC_FILE_LOADED,
            component = COMPONENT,
            path = %static_file.display(),
            routers = document.routers.len(),
            "router configurations loaded"
        );

        Ok(Self {
            static_file,
            configurations: RwLock::new(document.routers),
            settings: RwLock::new(document.provider.unwrap_or_default()),
            events,
        })
    }

    pub fn path(&self) -> &Path {
        &self.static_file
    }

    /// Provider settings from the file's `provider` block, or the defaults.
    pub fn provider_settings(&self) -> ProviderSettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-reads the file and publishes `Removed` for dropped ids and `Added` for new or changed
    /// configurations. The current set is kept when the file cannot be read.
    pub fn reload(&self) -> Result<(), ConfigurationFileError> {
        let document = read_document(&self.static_file)?;

        let previous = {
            let mut guard = self
                .configurations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, document.routers.clone())
        };
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) =
            document.provider.unwrap_or_default();

        for removed in previous
            .iter()
            .filter(|old| !document.routers.iter().any(|new| new.id == old.id))
        {
            let _ = self
                .events
                .send(ConfigurationEvent::Removed(removed.id.clone()));
        }
        for changed in document
            .routers
            .iter()
            .filter(|new| !previous.contains(new))
        {
            let _ = self
                .events
                .send(ConfigurationEvent::Added(changed.id.clone()));
        }

        debug!(
            event = STATIC_FILE_RELOADED,
            component = COMPONENT,
            routers = document.routers.len(),
            "router configurations reloaded"
        );
        Ok(())
    }

    /// Writes the current configurations back to the file as JSON (a JSON5 subset).
    pub fn save(&self) -> Result<(), ConfigurationFileError> {
        let document = RouterConfigDocument {
            routers: self.routers(),
            provider: Some(self.provider_settings()),
        };
        let contents =
            serde_json::to_string_pretty(&document).map_err(ConfigurationFileError::Encode)?;
        fs::write(&self.static_file, contents).map_err(|source| ConfigurationFileError::Io {
            path: self.static_file.clone(),
            source,
        })
    }
}

impl ConfigurationProfile for RouterConfigStaticFile {
    fn routers(&self) -> Vec<RouterConfiguration> {
        self.configurations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn add(&self, configuration: RouterConfiguration) {
        let id = configuration.id.clone();
        {
            let mut guard = self
                .configurations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            match guard.iter_mut().find(|existing| existing.id == id) {
                Some(existing) => *existing = configuration,
                None => guard.push(configuration),
            }
        }
        let _ = self.events.send(ConfigurationEvent::Added(id));
    }

    fn remove(&self, router_id: &str) -> bool {
        let removed = {
            let mut guard = self
                .configurations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let before = guard.len();
            guard.retain(|existing| existing.id != router_id);
            guard.len() != before
        };
        if removed {
            let _ = self
                .events
                .send(ConfigurationEvent::Removed(router_id.to_string()));
        }
        removed
    }

    fn subscribe(&self) -> broadcast::Receiver<ConfigurationEvent> {
        self.events.subscribe()
    }
}

fn read_document(static_file: &Path) -> Result<RouterConfigDocument, ConfigurationFileError> {
    let path = canonicalize(static_file).map_err(|source| {
        warn!(
            event = STATIC_FILE_MISSING,
            component = COMPONENT,
            path = %static_file.display(),
            err = %source,
            "router configuration file not found"
        );
        ConfigurationFileError::Io {
            path: static_file.to_path_buf(),
            source,
        }
    })?;

    let data = fs::read_to_string(&path).map_err(|source| ConfigurationFileError::Io {
        path: path.clone(),
        source,
    })?;

    json5::from_str(&data).map_err(|err| ConfigurationFileError::Parse {
        path,
        message: err.to_string(),
    })
}
