// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Catalog Vault.
//
// Catalog Vault is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Catalog Vault is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Catalog Vault. If not, see <https://www.gnu.org/licenses/>.

//! Per-operation timeouts for store calls.

use crate::{ProjectError, ProjectResult};
use std::future::Future;
use std::time::Duration;

/// Run `future` with `timeout`; elapsed time becomes [`ProjectError::Timeout`].
pub(crate) async fn bounded<T, E, F>(
    timeout: Duration,
    operation: impl Into<String>,
    future: F,
) -> ProjectResult<T>
where
    F: Future<Output = Result<T, E>>,
    E: Into<ProjectError>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(ProjectError::Timeout {
            operation: operation.into(),
            timeout,
        }),
    }
}
