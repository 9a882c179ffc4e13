// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Keyed cross-plugin capability slots (`spec.md` §4.1, "Services").
//!
//! A `ServiceKey<T>` is how one plugin exposes a typed capability (e.g. a
//! link-URL validator) that another plugin can look up without either of
//! them depending on the other's concrete module.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

pub struct ServiceKey<T: Send + Sync + 'static> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Send + Sync + 'static> ServiceKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }
}

impl<T: Send + Sync + 'static> Clone for ServiceKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: Send + Sync + 'static> Copy for ServiceKey<T> {}

#[derive(Default)]
pub struct ServiceRegistry {
    services: HashMap<(&'static str, TypeId), Arc<dyn Any + Send + Sync>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Send + Sync + 'static>(&mut self, key: ServiceKey<T>, value: Arc<T>) {
        self.services.insert((key.name, TypeId::of::<T>()), value);
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: ServiceKey<T>) -> Option<Arc<T>> {
        self.services
            .get(&(key.name, TypeId::of::<T>()))
            .and_then(|v| v.clone().downcast::<T>().ok())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    struct LinkValidator {
        allow_all: bool,
    }

    impl LinkValidator {
        fn is_valid(&self, _url: &str) -> bool {
            self.allow_all
        }
    }

    #[test]
    fn register_and_retrieve_a_service() {
        static KEY: ServiceKey<LinkValidator> = ServiceKey::new("link-validator");
        let mut registry = ServiceRegistry::new();
        registry.register(KEY, Arc::new(LinkValidator { allow_all: true }));
        let svc = registry.get(KEY).unwrap();
        assert!(svc.is_valid("https://example.com"));
    }

    #[test]
    fn missing_service_is_none() {
        static KEY: ServiceKey<LinkValidator> = ServiceKey::new("link-validator");
        let registry = ServiceRegistry::new();
        assert!(registry.get(KEY).is_none());
    }
}
