/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Per-booking access credential generation.

use uuid::Uuid;

/// Deployment namespace and access password minted for one booking.
///
/// Both values are derived from independent v4 UUIDs. The namespace keeps
/// only the first 8 hex characters so it stays usable as a DNS label prefix;
/// the password keeps all 32.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCredentials {
    pub namespace: String,
    pub password: String,
}

impl AccessCredentials {
    /// Mints a fresh namespace/password pair.
    pub fn generate() -> Self {
        let namespace = Uuid::new_v4().simple().to_string()[..8].to_string();
        let password = Uuid::new_v4().simple().to_string();
        Self {
            namespace,
            password,
        }
    }
}
