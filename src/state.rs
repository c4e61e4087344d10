// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{Clock, SystemClock, TokenVerifier};

#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<TokenVerifier>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self {
            verifier,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the wall clock, e.g. with a fixed one in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}
