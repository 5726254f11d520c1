// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Noderr Protocol Foundation
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::ScopeId;
use crate::error::{EngineError, EngineResult};

/// Per-scope leases guaranteeing at most one in-flight cycle per scope
#[derive(Debug, Default)]
pub struct ScopeLeases {
    leases: DashMap<ScopeId, Arc<Mutex<()>>>,
}

/// Held for the duration of a cycle; dropping it releases the scope
#[derive(Debug)]
pub struct ScopeLease {
    scope_id: ScopeId,
    _guard: OwnedMutexGuard<()>,
}

impl ScopeLease {
    pub fn scope_id(&self) -> &ScopeId {
        &self.scope_id
    }
}

impl ScopeLeases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lease for `scope_id` without waiting
    pub fn try_acquire(&self, scope_id: &str) -> EngineResult<ScopeLease> {
        let lock = self
            .leases
            .entry(scope_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = lock
            .try_lock_owned()
            .map_err(|_| EngineError::ScopeBusy(scope_id.to_string()))?;

        Ok(ScopeLease {
            scope_id: scope_id.to_string(),
            _guard: guard,
        })
    }

    pub fn is_held(&self, scope_id: &str) -> bool {
        self.leases
            .get(scope_id)
            .map_or(false, |lock| lock.try_lock().is_err())
    }
}
